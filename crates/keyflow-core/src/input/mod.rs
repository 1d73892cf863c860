// Keyflow Input Layer
// Device discovery and the raw device reader

mod discover;
mod reader;

pub use discover::{list_devices, matches_device_filter, DeviceError, DeviceInfo};
pub use reader::{DeviceReader, PolledEvent};

/// Name prefix of the virtual output device; devices carrying it are
/// never captured, preventing a feedback loop.
pub const VIRTUAL_DEVICE_PREFIX: &str = "Keyflow (virtual)";
