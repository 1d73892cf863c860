// Keyflow Event Types
// Raw device protocol records and normalized logical key events

use std::fmt;

use smallvec::SmallVec;

use crate::modifier::{Modifiers, KEY_LEFTALT, KEY_LEFTCTRL, KEY_LEFTSHIFT};
use crate::{Key, KeyAction};

/// EV_SYN event type (synchronization marker)
pub const EV_SYN: u16 = 0x00;
/// EV_KEY event type (key and button state changes)
pub const EV_KEY: u16 = 0x01;
/// EV_REL event type (relative pointer motion)
pub const EV_REL: u16 = 0x02;
/// EV_ABS event type (absolute pointer motion)
pub const EV_ABS: u16 = 0x03;
/// EV_MSC event type (miscellaneous, e.g. scan codes)
pub const EV_MSC: u16 = 0x04;

/// A single low-level device protocol record, exactly as produced by
/// the input hardware (or synthesized for the output device).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    /// The zero/zero/zero synchronization marker delimiting a logically
    /// atomic group of events.
    pub const SYNC: RawEvent = RawEvent {
        event_type: EV_SYN,
        code: 0,
        value: 0,
    };

    pub fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
        }
    }

    /// A key press (value 1) or release (value 0) record
    pub fn key(key: Key, action: KeyAction) -> Self {
        Self::new(EV_KEY, key.code(), action.to_i32())
    }

    pub fn is_sync(&self) -> bool {
        self.event_type == EV_SYN && self.code == 0 && self.value == 0
    }

    pub fn is_key(&self) -> bool {
        self.event_type == EV_KEY
    }

    pub fn is_motion(&self) -> bool {
        self.event_type == EV_REL || self.event_type == EV_ABS
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sync() {
            return write!(f, "SYN");
        }
        match self.event_type {
            EV_KEY => write!(f, "{}={}", Key(self.code), self.value),
            other => write!(f, "type={:#x} code={} value={}", other, self.code, self.value),
        }
    }
}

impl From<evdev::InputEvent> for RawEvent {
    fn from(event: evdev::InputEvent) -> Self {
        Self {
            event_type: event.event_type().0,
            code: event.code(),
            value: event.value(),
        }
    }
}

impl From<RawEvent> for evdev::InputEvent {
    fn from(event: RawEvent) -> Self {
        evdev::InputEvent::new(evdev::EventType(event.event_type), event.code, event.value)
    }
}

/// A normalized key press/release annotated with the modifier bitmask
/// active at the instant of the event.
///
/// Its `Display` rendering is the canonical signature used as the
/// rule-lookup key: `[Ctrl-][Alt-][Shift-]<SYMBOL>-<down|up>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    key: Key,
    action: KeyAction,
    mods: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, action: KeyAction, mods: Modifiers) -> Self {
        Self { key, action, mods }
    }

    pub fn down(key: Key, mods: Modifiers) -> Self {
        Self::new(key, KeyAction::Press, mods)
    }

    pub fn up(key: Key, mods: Modifiers) -> Self {
        Self::new(key, KeyAction::Release, mods)
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn action(&self) -> KeyAction {
        self.action
    }

    pub fn modifiers(&self) -> Modifiers {
        self.mods
    }

    pub fn is_down(&self) -> bool {
        self.action.just_pressed()
    }

    /// Expand this logical event into the exact raw event sequence.
    ///
    /// A key-down with modifiers brackets the key event: Ctrl, Alt,
    /// Shift pressed before it and released in mirror order after it.
    /// A key-up emits only the bare up event; the real device already
    /// released the physical modifiers. One sync marker terminates
    /// either form.
    pub fn to_raw_events(&self) -> SmallVec<[RawEvent; 8]> {
        let mut res = SmallVec::new();
        if self.is_down() {
            if self.mods.has_ctrl() {
                res.push(RawEvent::key(KEY_LEFTCTRL, KeyAction::Press));
            }
            if self.mods.has_alt() {
                res.push(RawEvent::key(KEY_LEFTALT, KeyAction::Press));
            }
            if self.mods.has_shift() {
                res.push(RawEvent::key(KEY_LEFTSHIFT, KeyAction::Press));
            }
            res.push(RawEvent::key(self.key, KeyAction::Press));
            if self.mods.has_shift() {
                res.push(RawEvent::key(KEY_LEFTSHIFT, KeyAction::Release));
            }
            if self.mods.has_alt() {
                res.push(RawEvent::key(KEY_LEFTALT, KeyAction::Release));
            }
            if self.mods.has_ctrl() {
                res.push(RawEvent::key(KEY_LEFTCTRL, KeyAction::Release));
            }
        } else {
            res.push(RawEvent::key(self.key, KeyAction::Release));
        }
        res.push(RawEvent::SYNC);
        res
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = if self.is_down() { "down" } else { "up" };
        write!(f, "{}{}-{}", self.mods, self.key, suffix)
    }
}
