// Keyflow uinput Output Layer
// Creates the virtual device and replays the engine's output on it

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, InputEvent, RelativeAxisType};

use crate::event::RawEvent;

/// Error types for uinput operations
#[derive(Debug, thiserror::Error)]
pub enum UInputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event: {0}")]
    WriteError(String),
}

/// Virtual uinput device for translated output.
///
/// Registers all key and button codes plus the relative pointer axes,
/// so both synthesized key events and forwarded motion groups can be
/// replayed on it.
pub struct VirtualOutput {
    device: VirtualDevice,
}

impl VirtualOutput {
    /// Create the virtual device under the given name
    pub fn new(name: &str) -> Result<Self, UInputError> {
        let mut keys = AttributeSet::new();
        // All key and button codes, including the BTN_ range
        for code in 0..0x300u16 {
            keys.insert(evdev::Key::new(code));
        }

        let mut axes = AttributeSet::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);
        axes.insert(RelativeAxisType::REL_HWHEEL);

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?
            .name(name)
            .with_keys(&keys)
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?
            .with_relative_axes(&axes)
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?;

        Ok(Self { device })
    }

    /// Replay an output sequence in the given order.
    ///
    /// The sequence already carries its sync markers; nothing is
    /// reordered or batched across calls, since down/up ordering and
    /// sync boundaries are semantically load-bearing.
    pub fn write_events(&mut self, events: &[RawEvent]) -> Result<(), UInputError> {
        if events.is_empty() {
            return Ok(());
        }
        let raw: Vec<InputEvent> = events.iter().map(|&e| e.into()).collect();
        self.device
            .emit(&raw)
            .map_err(|e: std::io::Error| UInputError::WriteError(e.to_string()))
    }
}
