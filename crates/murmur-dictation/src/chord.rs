//! Key-chord detection over a raw stream of press/release events.
//!
//! The detector tracks which keys are currently down and derives "chord
//! held" from that set: the chord is held while at least one key from each
//! of its two modifier groups is down. Transitions are edge-triggered -
//! exactly one [`ChordTransition::Engaged`] when the predicate flips on and
//! one [`ChordTransition::Released`] when it flips off, no matter how many
//! repeat or unrelated events arrive in between.

use std::collections::HashSet;

/// evdev codes for the left and right Control keys.
pub const CTRL_CODES: [u16; 2] = [29, 97];

/// evdev codes for the left and right Alt keys.
pub const ALT_CODES: [u16; 2] = [56, 100];

/// Edge-triggered chord state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordTransition {
    /// The chord just became fully held (0 -> 1 edge).
    Engaged,
    /// The chord just stopped being fully held (1 -> 0 edge).
    Released,
}

/// The key combination that triggers recording: one key from each group
/// must be down simultaneously.
#[derive(Debug, Clone)]
pub struct Chord {
    group_a: HashSet<u16>,
    group_b: HashSet<u16>,
}

impl Default for Chord {
    /// Ctrl+Alt, accepting either side's variant of each modifier.
    fn default() -> Self {
        Self::new(CTRL_CODES, ALT_CODES)
    }
}

impl Chord {
    pub fn new(
        group_a: impl IntoIterator<Item = u16>,
        group_b: impl IntoIterator<Item = u16>,
    ) -> Self {
        Self {
            group_a: group_a.into_iter().collect(),
            group_b: group_b.into_iter().collect(),
        }
    }

    fn is_satisfied(&self, held: &HashSet<u16>) -> bool {
        held.iter().any(|k| self.group_a.contains(k))
            && held.iter().any(|k| self.group_b.contains(k))
    }
}

/// Tracks held keys and emits chord edges.
///
/// "Chord held" is always computed from the held-set, never stored, so it
/// cannot drift out of sync with the keys actually down.
#[derive(Debug, Clone)]
pub struct ChordDetector {
    chord: Chord,
    held: HashSet<u16>,
}

impl Default for ChordDetector {
    fn default() -> Self {
        Self::new(Chord::default())
    }
}

impl ChordDetector {
    pub fn new(chord: Chord) -> Self {
        Self {
            chord,
            held: HashSet::new(),
        }
    }

    /// Whether the chord is currently fully held.
    pub fn is_held(&self) -> bool {
        self.chord.is_satisfied(&self.held)
    }

    /// Feed one key event; returns a transition only on a chord edge.
    ///
    /// A release of a key never observed as pressed is tolerated
    /// (remove-if-present). Duplicate presses of an already-held key
    /// produce no edge.
    pub fn on_key_event(&mut self, code: u16, pressed: bool) -> Option<ChordTransition> {
        let was_held = self.is_held();

        if pressed {
            self.held.insert(code);
        } else {
            self.held.remove(&code);
        }

        match (was_held, self.is_held()) {
            (false, true) => Some(ChordTransition::Engaged),
            (true, false) => Some(ChordTransition::Released),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
