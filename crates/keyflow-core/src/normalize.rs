// Keyflow Input Normalizer
// Converts raw device records into logical key events and batches
// pointer motion until a synchronization boundary

use log::{debug, warn};

use crate::event::{KeyEvent, RawEvent, EV_KEY, EV_MSC, EV_SYN};
use crate::modifier::ModifierTracker;
use crate::{Key, KeyAction};

/// Pointer-motion events accumulated between synchronization markers.
///
/// Motion is never forwarded individually; it is flushed as one
/// complete group terminated by a single sync marker, so translated
/// key output never interleaves with a partial motion update.
#[derive(Debug, Clone, Default)]
pub struct MotionBatch {
    events: Vec<RawEvent>,
}

impl MotionBatch {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    pub fn push(&mut self, event: RawEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drain the batch: the buffered motion followed by one sync
    /// marker, or None when nothing is buffered.
    pub fn flush(&mut self) -> Option<Vec<RawEvent>> {
        if self.events.is_empty() {
            return None;
        }
        let mut events = std::mem::take(&mut self.events);
        events.push(RawEvent::SYNC);
        Some(events)
    }
}

/// Result of feeding one raw event to the normalizer
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Event consumed with nothing to do downstream
    Nothing,
    /// A logical key event ready for rule dispatch
    Key(KeyEvent),
    /// A completed motion group to forward as-is
    Motion(Vec<RawEvent>),
}

/// Per-session input normalizer.
///
/// Owns the held-modifier state and the motion batch for one physical
/// input device.
#[derive(Debug, Default)]
pub struct Normalizer {
    mods: ModifierTracker,
    motion: MotionBatch,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            mods: ModifierTracker::new(),
            motion: MotionBatch::new(),
        }
    }

    /// Feed one raw event. Modifier keys update the tracker and
    /// produce nothing; motion accumulates until the next sync
    /// boundary; other key events become logical key events carrying
    /// the modifier snapshot.
    pub fn feed(&mut self, raw: RawEvent) -> Normalized {
        match raw.event_type {
            EV_MSC => Normalized::Nothing,
            _ if raw.is_motion() => {
                self.motion.push(raw);
                Normalized::Nothing
            }
            EV_KEY => {
                let key = Key(raw.code);
                if self.mods.observe(key, raw.value) {
                    return Normalized::Nothing;
                }
                match KeyAction::from_i32(raw.value) {
                    Some(KeyAction::Repeat) => {
                        debug!("Dropping key repeat for {}", key);
                        Normalized::Nothing
                    }
                    Some(action) => {
                        Normalized::Key(KeyEvent::new(key, action, self.mods.snapshot()))
                    }
                    None => {
                        warn!("Unhandled key value {} for {}", raw.value, key);
                        Normalized::Nothing
                    }
                }
            }
            EV_SYN => match self.motion.flush() {
                Some(events) => Normalized::Motion(events),
                None => Normalized::Nothing,
            },
            other => {
                warn!("Unhandled event type {:#x}: {}", other, raw);
                Normalized::Nothing
            }
        }
    }

    /// Bitmask snapshot of the currently held modifiers
    pub fn modifiers(&self) -> crate::modifier::Modifiers {
        self.mods.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EV_ABS, EV_REL};
    use crate::modifier::Modifiers;

    const REL_X: u16 = 0x00;
    const REL_Y: u16 = 0x01;

    #[test]
    fn test_plain_key_event() {
        let mut norm = Normalizer::new();
        let result = norm.feed(RawEvent::new(EV_KEY, 30, 1));
        assert_eq!(
            result,
            Normalized::Key(KeyEvent::down(Key(30), Modifiers::NONE))
        );
    }

    #[test]
    fn test_modifier_keys_are_swallowed() {
        let mut norm = Normalizer::new();
        assert_eq!(norm.feed(RawEvent::new(EV_KEY, 29, 1)), Normalized::Nothing);
        assert_eq!(
            norm.feed(RawEvent::new(EV_KEY, 25, 1)),
            Normalized::Key(KeyEvent::down(Key(25), Modifiers::CTRL))
        );
        assert_eq!(norm.feed(RawEvent::new(EV_KEY, 29, 0)), Normalized::Nothing);
        assert_eq!(
            norm.feed(RawEvent::new(EV_KEY, 25, 0)),
            Normalized::Key(KeyEvent::up(Key(25), Modifiers::NONE))
        );
    }

    #[test]
    fn test_modifier_snapshot_combines() {
        let mut norm = Normalizer::new();
        norm.feed(RawEvent::new(EV_KEY, 29, 1)); // LEFTCTRL
        norm.feed(RawEvent::new(EV_KEY, 54, 1)); // RIGHTSHIFT
        let result = norm.feed(RawEvent::new(EV_KEY, 25, 1));
        assert_eq!(
            result,
            Normalized::Key(KeyEvent::down(Key(25), Modifiers::CTRL | Modifiers::SHIFT))
        );
    }

    #[test]
    fn test_misc_events_discarded() {
        let mut norm = Normalizer::new();
        assert_eq!(
            norm.feed(RawEvent::new(EV_MSC, 4, 0x7001e)),
            Normalized::Nothing
        );
    }

    #[test]
    fn test_key_repeat_dropped() {
        let mut norm = Normalizer::new();
        norm.feed(RawEvent::new(EV_KEY, 30, 1));
        assert_eq!(norm.feed(RawEvent::new(EV_KEY, 30, 2)), Normalized::Nothing);
    }

    #[test]
    fn test_motion_batched_until_sync() {
        let mut norm = Normalizer::new();
        assert_eq!(
            norm.feed(RawEvent::new(EV_REL, REL_X, 5)),
            Normalized::Nothing
        );
        assert_eq!(
            norm.feed(RawEvent::new(EV_REL, REL_Y, -3)),
            Normalized::Nothing
        );
        let result = norm.feed(RawEvent::SYNC);
        assert_eq!(
            result,
            Normalized::Motion(vec![
                RawEvent::new(EV_REL, REL_X, 5),
                RawEvent::new(EV_REL, REL_Y, -3),
                RawEvent::SYNC,
            ])
        );
    }

    #[test]
    fn test_abs_motion_batched_too() {
        let mut norm = Normalizer::new();
        norm.feed(RawEvent::new(EV_ABS, 0, 100));
        let result = norm.feed(RawEvent::SYNC);
        assert_eq!(
            result,
            Normalized::Motion(vec![RawEvent::new(EV_ABS, 0, 100), RawEvent::SYNC])
        );
    }

    #[test]
    fn test_sync_without_motion_is_quiet() {
        let mut norm = Normalizer::new();
        assert_eq!(norm.feed(RawEvent::SYNC), Normalized::Nothing);
    }

    #[test]
    fn test_motion_not_split_across_flushes() {
        let mut norm = Normalizer::new();
        norm.feed(RawEvent::new(EV_REL, REL_X, 1));
        norm.feed(RawEvent::SYNC);
        // Second sync with an empty batch produces nothing more
        assert_eq!(norm.feed(RawEvent::SYNC), Normalized::Nothing);
    }
}
