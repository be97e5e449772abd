//! Host platform abstraction.
//!
//! Discovery and the conceal transform talk to the operating system only
//! through the traits defined here:
//! - [`HostPlatform`] owns the global state: namespace aliases, opening
//!   devices, drive letters and labels
//! - [`DeviceHandle`] is an open device: byte I/O plus the structured
//!   queries used by the probe
//!
//! Platform primitives return `std::io::Error` so the raw OS error code
//! reaches the caller untouched.

#[cfg(unix)]
pub mod unix;
#[cfg(windows)]
mod windows;

use crate::device::{DevicePath, DiskGeometry, DriveIndex, PartitionInfo};
use std::io::{self, Read, Seek, Write};
use std::time::Duration;

#[cfg(windows)]
pub use self::windows::{WindowsDevice, WindowsHost};

/// An open raw device.
pub trait DeviceHandle: Read + Write + Seek {
    /// Extended partition information (MBR or GPT).
    fn partition_info_ex(&self) -> io::Result<PartitionInfo>;

    /// Legacy, MBR-only partition information.
    fn partition_info(&self) -> io::Result<PartitionInfo>;

    /// Raw device length in bytes.
    fn length_info(&self) -> io::Result<u64>;

    /// Whether the volume is managed by the dynamic-volume layer.
    fn is_dynamic(&self) -> io::Result<bool>;

    /// Drive geometry.
    fn geometry(&self) -> io::Result<DiskGeometry>;

    /// Full partition layout, at most `max_entries` entries.
    fn drive_layout(&self, max_entries: usize) -> io::Result<Vec<PartitionInfo>>;
}

/// Operating-system services needed by discovery and the transform.
pub trait HostPlatform {
    /// Handle type produced by the open calls.
    type Device: DeviceHandle;

    /// Create a global alias `name` pointing at the raw `target` path.
    fn define_alias(&self, name: &str, target: &str) -> io::Result<()>;

    /// Remove an alias created by [`HostPlatform::define_alias`].
    fn remove_alias(&self, name: &str, target: &str) -> io::Result<()>;

    /// Path under which an alias can be opened with ordinary I/O.
    fn alias_open_path(&self, name: &str) -> String {
        format!(r"\\.\{}", name)
    }

    /// Open for shared reading. Used by enumeration.
    fn open_shared_read(&self, path: &str) -> io::Result<Self::Device>;

    /// Single attempt at an exclusive, write-through read/write open.
    fn open_exclusive(&self, path: &str) -> io::Result<Self::Device>;

    /// Geometry of a physical drive, queried without opening its partitions.
    fn physical_drive_geometry(&self, drive: DriveIndex) -> io::Result<DiskGeometry>;

    /// Drive letter whose symbolic link resolves to `path`.
    fn drive_letter_of(&self, path: &DevicePath) -> Option<char>;

    /// Volume label of a mounted drive letter.
    fn volume_label(&self, letter: char) -> Option<String>;

    /// Drive letter of the running system, upper-case.
    fn system_drive_letter(&self) -> Option<char>;

    /// Whether the host can answer dynamic-volume queries.
    fn supports_dynamic_volumes(&self) -> bool;

    /// Identity used to keep aliases of concurrent processes apart.
    fn process_id(&self) -> u32 {
        std::process::id()
    }

    /// Whether an open failed only because someone else holds the device.
    fn is_contention(&self, err: &io::Error) -> bool {
        is_contention(err)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Classify an open error as transient lock contention.
pub fn is_contention(err: &io::Error) -> bool {
    #[cfg(windows)]
    {
        use ::windows::Win32::Foundation::{ERROR_LOCK_VIOLATION, ERROR_SHARING_VIOLATION};
        matches!(
            err.raw_os_error(),
            Some(code) if code == ERROR_SHARING_VIOLATION.0 as i32
                || code == ERROR_LOCK_VIOLATION.0 as i32
        )
    }
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(libc::EBUSY)
    }
    #[cfg(not(any(windows, unix)))]
    {
        err.kind() == io::ErrorKind::WouldBlock
    }
}
