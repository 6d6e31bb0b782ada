//! The [`Effect`] trait invoked by the realtime chain.
//!
//! ## Design Decisions
//!
//! - **Buffer-in-place**: effects mutate the interleaved sample buffer
//!   directly. Mutation is the only channel for audio output, so there is
//!   no separate return path to get wrong.
//!
//! - **`&self` processing**: effects are value-immutable after load
//!   (parameters are baked into the source file), which lets the chain
//!   share them as `Arc<dyn Effect>` between the UI thread and the audio
//!   thread without further locking.
//!
//! - **Explicit onset context**: the onset snapshot is read once per
//!   buffer by the chain and passed in, rather than exposed through
//!   process-wide mutable state, which keeps effects testable in
//!   isolation.

use crate::OnsetContext;

/// A single effect in the processing chain.
///
/// # Real-Time Safety
///
/// `process` is called on the audio thread. Implementations must not
/// allocate, lock, or perform I/O.
///
/// # Example
///
/// ```rust
/// use pedalera_core::{Effect, OnsetContext};
///
/// struct Gain(f32);
///
/// impl Effect for Gain {
///     fn name(&self) -> &str {
///         "gain"
///     }
///
///     fn process(&self, samples: &mut [f32], _ctx: &OnsetContext) {
///         for s in samples.iter_mut() {
///             *s *= self.0;
///         }
///     }
/// }
/// ```
pub trait Effect: Send + Sync {
    /// Display name of the effect; unique within a registry.
    fn name(&self) -> &str;

    /// Process one buffer of interleaved samples in place.
    ///
    /// `ctx` is the onset snapshot taken at the start of the current
    /// callback; effects that do not react to onsets simply ignore it.
    fn process(&self, samples: &mut [f32], ctx: &OnsetContext);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offset(f32);

    impl Effect for Offset {
        fn name(&self) -> &str {
            "offset"
        }

        fn process(&self, samples: &mut [f32], _ctx: &OnsetContext) {
            for s in samples.iter_mut() {
                *s += self.0;
            }
        }
    }

    #[test]
    fn effects_mutate_in_place() {
        let effect = Offset(0.25);
        let mut buf = [0.0f32; 4];
        effect.process(&mut buf, &OnsetContext::default());
        assert_eq!(buf, [0.25; 4]);
    }

    #[test]
    fn trait_is_object_safe() {
        let boxed: Box<dyn Effect> = Box::new(Offset(1.0));
        assert_eq!(boxed.name(), "offset");
    }
}
