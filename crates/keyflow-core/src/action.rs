use std::fmt;

/// Represents the action state of a key event.
///
/// From `evtest` output, the "magic numbers" for assignment to enums:
///   0 == 'released'
///   1 == 'pressed'
///   2 == 'repeated'
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum KeyAction {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl KeyAction {
    /// Returns true only if this is a PRESS event (not REPEAT)
    pub fn just_pressed(self) -> bool {
        matches!(self, KeyAction::Press)
    }

    /// Returns true if this is a RELEASE event
    pub fn is_released(self) -> bool {
        matches!(self, KeyAction::Release)
    }

    /// Returns true if this is a REPEAT event
    pub fn is_repeat(self) -> bool {
        matches!(self, KeyAction::Repeat)
    }

    /// Create KeyAction from i32 value (from evdev)
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyAction::Release),
            1 => Some(KeyAction::Press),
            2 => Some(KeyAction::Repeat),
            _ => None,
        }
    }

    /// Convert KeyAction to its i32 representation
    pub fn to_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAction::Release => write!(f, "release"),
            KeyAction::Press => write!(f, "press"),
            KeyAction::Repeat => write!(f, "repeat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_properties() {
        assert!(KeyAction::Press.just_pressed());
        assert!(!KeyAction::Press.is_released());
        assert!(!KeyAction::Press.is_repeat());

        assert!(!KeyAction::Repeat.just_pressed());
        assert!(!KeyAction::Repeat.is_released());
        assert!(KeyAction::Repeat.is_repeat());

        assert!(!KeyAction::Release.just_pressed());
        assert!(KeyAction::Release.is_released());
        assert!(!KeyAction::Release.is_repeat());
    }

    #[test]
    fn test_action_from_i32() {
        assert_eq!(KeyAction::from_i32(0), Some(KeyAction::Release));
        assert_eq!(KeyAction::from_i32(1), Some(KeyAction::Press));
        assert_eq!(KeyAction::from_i32(2), Some(KeyAction::Repeat));
        assert_eq!(KeyAction::from_i32(3), None);
    }

    #[test]
    fn test_action_to_i32() {
        assert_eq!(KeyAction::Release.to_i32(), 0);
        assert_eq!(KeyAction::Press.to_i32(), 1);
        assert_eq!(KeyAction::Repeat.to_i32(), 2);
    }
}
