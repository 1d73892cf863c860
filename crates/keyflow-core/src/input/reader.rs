// Keyflow Raw Device Reader
// Polls captured devices and delivers records in device order

use std::os::unix::io::AsRawFd;

use evdev::Device;

use super::discover::{find_devices, DeviceError};
use crate::event::RawEvent;

/// One raw event tagged with its source device.
///
/// The index selects the engine instance for that device; records from
/// different devices are never interleaved within one fetch.
#[derive(Debug, Clone, Copy)]
pub struct PolledEvent {
    /// Index into the reader's device list
    pub device_index: usize,
    /// The raw protocol record
    pub event: RawEvent,
}

/// Reader over the captured input devices.
///
/// Grabs the devices so no other client receives their events, polls
/// them with poll(2) and fetches pending records. Devices are
/// ungrabbed on drop, including during panic unwinding; a grabbed
/// device with no live reader would leave the hardware unusable.
pub struct DeviceReader {
    devices: Vec<Device>,
    poll_fds: Vec<libc::pollfd>,
    grabbed: bool,
}

impl DeviceReader {
    /// Open the devices matching the filter list without grabbing them
    pub fn open(filters: &[String]) -> Result<Self, DeviceError> {
        let devices = find_devices(filters)?;
        let poll_fds = Self::create_poll_fds(&devices);
        Ok(Self {
            devices,
            poll_fds,
            grabbed: false,
        })
    }

    /// Open and grab the devices matching the filter list.
    ///
    /// This is the normal operating mode: translated output comes from
    /// the virtual device, so the physical devices must be silenced.
    pub fn open_grabbed(filters: &[String]) -> Result<Self, DeviceError> {
        let mut devices = find_devices(filters)?;

        // A previous instance may have crashed while holding the grab;
        // ungrab first so we start from a clean state.
        for device in &mut devices {
            let _ = device.ungrab();
        }
        for device in &mut devices {
            device.grab()?;
        }

        let poll_fds = Self::create_poll_fds(&devices);
        Ok(Self {
            devices,
            poll_fds,
            grabbed: true,
        })
    }

    fn create_poll_fds(devices: &[Device]) -> Vec<libc::pollfd> {
        devices
            .iter()
            .map(|d| libc::pollfd {
                fd: d.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect()
    }

    /// Ungrab all devices (called on shutdown)
    pub fn ungrab_all(&mut self) {
        if self.grabbed {
            for device in &mut self.devices {
                let _ = device.ungrab();
            }
            self.grabbed = false;
        }
    }

    /// Names of the captured devices, in index order
    pub fn device_names(&self) -> Vec<String> {
        self.devices
            .iter()
            .map(|d| d.name().unwrap_or("Unknown").to_string())
            .collect()
    }

    /// Number of captured devices
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Wait up to `timeout_ms` for events and fetch everything pending.
    ///
    /// Returns an empty vector on timeout or EINTR; per-device record
    /// order is preserved and devices are drained one at a time.
    pub fn poll_events(&mut self, timeout_ms: i32) -> Result<Vec<PolledEvent>, DeviceError> {
        let mut events = Vec::new();

        let poll_result = unsafe {
            libc::poll(
                self.poll_fds.as_mut_ptr(),
                self.poll_fds.len() as libc::nfds_t,
                timeout_ms,
            )
        };

        if poll_result < 0 {
            let err = std::io::Error::last_os_error();
            // EINTR just means a signal arrived (e.g. Ctrl+C); treat it
            // like a timeout and let the caller check its running flag.
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(events);
            }
            return Err(DeviceError::Io(err));
        }

        if poll_result == 0 {
            return Ok(events);
        }

        for (device_index, device) in self.devices.iter_mut().enumerate() {
            if self.poll_fds[device_index].revents & libc::POLLIN != 0 {
                if let Ok(device_events) = device.fetch_events() {
                    for event in device_events {
                        events.push(PolledEvent {
                            device_index,
                            event: RawEvent::from(event),
                        });
                    }
                }
            }
        }

        Ok(events)
    }
}

impl Drop for DeviceReader {
    fn drop(&mut self) {
        self.ungrab_all();
    }
}
