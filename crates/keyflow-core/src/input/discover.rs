// Keyflow Device Discovery
// Enumerates input devices and matches them against the filter list

use super::VIRTUAL_DEVICE_PREFIX;

/// Errors from device discovery and capture
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("No device filter configured; use --device or the settings file")]
    NoFilter,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Device information for listing devices
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Device index
    pub index: usize,
    /// Device name
    pub name: String,
    /// Device path (if available)
    pub path: Option<String>,
}

/// Check whether a device should be captured.
///
/// A device matches when any filter entry is a substring of its name
/// or equals its path. The virtual output device never matches.
pub fn matches_device_filter(name: &str, path: &str, filters: &[String]) -> bool {
    if name.starts_with(VIRTUAL_DEVICE_PREFIX) {
        return false;
    }
    filters
        .iter()
        .any(|filter| name.contains(filter.as_str()) || path == filter.as_str())
}

/// List all input devices, for the --list-devices CLI flag.
pub fn list_devices() -> Result<Vec<DeviceInfo>, DeviceError> {
    let mut infos = Vec::new();

    for (index, (path, device)) in evdev::enumerate().enumerate() {
        infos.push(DeviceInfo {
            index,
            name: device.name().unwrap_or("Unknown").to_string(),
            path: path.to_str().map(|s| s.to_string()),
        });
    }

    if infos.is_empty() {
        return Err(DeviceError::NotFound("No input devices found".to_string()));
    }

    Ok(infos)
}

/// Find the devices matching the filter list.
pub(super) fn find_devices(filters: &[String]) -> Result<Vec<evdev::Device>, DeviceError> {
    if filters.is_empty() {
        return Err(DeviceError::NoFilter);
    }

    let mut matched = Vec::new();
    for (path, device) in evdev::enumerate() {
        let name = device.name().unwrap_or("Unknown");
        let device_path = path.to_str().unwrap_or_default();
        if matches_device_filter(name, device_path, filters) {
            matched.push(device);
        }
    }

    if matched.is_empty() {
        return Err(DeviceError::NotFound(format!(
            "No input devices matching {:?}",
            filters
        )));
    }

    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_name_substring() {
        let filters = vec!["HID 05a4:9881".to_string()];
        assert!(matches_device_filter(
            "HID 05a4:9881",
            "/dev/input/event3",
            &filters
        ));
        assert!(matches_device_filter(
            "HID 05a4:9881 Consumer Control",
            "/dev/input/event4",
            &filters
        ));
        assert!(!matches_device_filter(
            "AT Translated Set 2 keyboard",
            "/dev/input/event0",
            &filters
        ));
    }

    #[test]
    fn test_filter_matches_exact_path() {
        let filters = vec!["/dev/input/event7".to_string()];
        assert!(matches_device_filter("Whatever", "/dev/input/event7", &filters));
        assert!(!matches_device_filter("Whatever", "/dev/input/event8", &filters));
    }

    #[test]
    fn test_virtual_device_never_matches() {
        let filters = vec!["Keyflow".to_string()];
        assert!(!matches_device_filter(
            "Keyflow (virtual) Output",
            "/dev/input/event9",
            &filters
        ));
    }

    #[test]
    fn test_empty_filter_rejected() {
        assert!(matches!(find_devices(&[]), Err(DeviceError::NoFilter)));
    }
}
