//! The rhythm strip: four beats of the grid with hit markers and playhead.

use std::time::{Duration, Instant};

use pedalera_core::Subdivision;

/// Beats rendered across the strip.
const BEATS_TO_SHOW: usize = 4;

/// How long a hit marker stays lit.
const HIT_MARKER_DECAY: Duration = Duration::from_millis(500);

pub struct RhythmViz {
    pub bpm: f64,
    pub subdivision: Subdivision,
    phase: f64,
    beat_count: i64,
    hit_markers: Vec<(usize, Instant)>,
    width: u16,
}

impl RhythmViz {
    pub fn new(bpm: f64, subdivision: Subdivision) -> Self {
        Self {
            bpm,
            subdivision,
            phase: 0.0,
            beat_count: 0,
            hit_markers: Vec::new(),
            width: 80,
        }
    }

    /// Refresh from the rhythm engine on the UI tick.
    pub fn update(&mut self, bpm: f64, subdivision: Subdivision, phase: f64, beat_count: i64) {
        self.bpm = bpm;
        self.subdivision = subdivision;
        self.phase = phase;
        self.beat_count = beat_count;

        let now = Instant::now();
        self.hit_markers
            .retain(|(_, at)| now.duration_since(*at) < HIT_MARKER_DECAY);
    }

    /// The beat index the playhead currently renders in.
    pub fn beat_in_display(&self) -> usize {
        (self.beat_count.max(0) as usize) % BEATS_TO_SHOW
    }

    /// Light the marker for a quantized onset.
    pub fn add_hit_marker(&mut self, beat_in_display: usize, slot_in_beat: usize) {
        let global_slot = beat_in_display * self.subdivision.slots() as usize + slot_in_beat;
        self.hit_markers.push((global_slot, Instant::now()));
    }

    pub fn set_width(&mut self, width: u16) {
        self.width = width;
    }

    /// Render the strip as text lines.
    pub fn lines(&self) -> Vec<String> {
        if self.width < 40 {
            return Vec::new();
        }

        let slots_per_beat = self.subdivision.slots() as usize;
        let total_slots = BEATS_TO_SHOW * slots_per_beat;

        let header = format!(
            " BPM: {:<3.0}  [{}]  TAP:[t]  +/-:[,/.]  Sub:[[/]]",
            self.bpm,
            self.subdivision.label()
        );

        let mut grid = String::with_capacity(total_slots + 4);
        grid.push(' ');
        for beat in 0..BEATS_TO_SHOW {
            for slot in 0..slots_per_beat {
                let global_slot = beat * slots_per_beat + slot;
                if slot == 0 {
                    grid.push('|');
                } else if self.is_slot_hit(global_slot) {
                    grid.push('!');
                } else {
                    grid.push('.');
                }
            }
        }
        grid.push('|');

        let mut slot_in_beat = (self.phase * slots_per_beat as f64) as usize;
        if slot_in_beat >= slots_per_beat {
            slot_in_beat = slots_per_beat - 1;
        }
        let playhead_pos = self.beat_in_display() * slots_per_beat + slot_in_beat;

        let mut playhead = String::with_capacity(total_slots + 4);
        playhead.push(' ');
        for i in 0..=total_slots {
            playhead.push(if i == playhead_pos { '^' } else { ' ' });
        }

        vec![header, grid, playhead]
    }

    fn is_slot_hit(&self, global_slot: usize) -> bool {
        self.hit_markers.iter().any(|(slot, _)| *slot == global_slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_one_cell_per_slot_plus_final_bar() {
        let mut viz = RhythmViz::new(120.0, Subdivision::Sub8);
        viz.update(120.0, Subdivision::Sub8, 0.0, 0);

        let lines = viz.lines();
        assert_eq!(lines.len(), 3);
        // Leading space + 32 slots + trailing '|'.
        assert_eq!(lines[1].chars().count(), 1 + 4 * 8 + 1);
        assert_eq!(lines[1].matches('|').count(), 5);
    }

    #[test]
    fn hit_markers_light_and_expire() {
        let mut viz = RhythmViz::new(120.0, Subdivision::Sub8);
        viz.add_hit_marker(1, 3);
        assert!(viz.lines()[1].contains('!'));

        // An update past the decay window clears the marker.
        std::thread::sleep(HIT_MARKER_DECAY + Duration::from_millis(20));
        viz.update(120.0, Subdivision::Sub8, 0.0, 0);
        assert!(!viz.lines()[1].contains('!'));
    }

    #[test]
    fn playhead_tracks_phase() {
        let mut viz = RhythmViz::new(120.0, Subdivision::Sub4);
        viz.update(120.0, Subdivision::Sub4, 0.99, 0);
        let playhead = &viz.lines()[2];
        // Phase near the beat end lands in the last slot of beat 0.
        assert_eq!(playhead.find('^'), Some(1 + 3));
    }

    #[test]
    fn narrow_terminal_renders_nothing() {
        let mut viz = RhythmViz::new(120.0, Subdivision::Sub8);
        viz.set_width(20);
        assert!(viz.lines().is_empty());
    }
}
