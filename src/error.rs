//! Error types for device discovery and the conceal transform.

use thiserror::Error;

/// Result type alias for conceal-drive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Hint shown next to access and I/O failures on a selected volume.
pub const ACCESS_HINT: &str = "Make sure that the selected volume exists, that it is not being used \
by the system or applications, that you have read/write permission for the volume, and that it \
is not write-protected.";

/// Errors that can occur while enumerating or transforming devices.
#[derive(Error, Debug)]
pub enum Error {
    /// The host refused to create a namespace alias for a raw device path.
    #[error("Cannot create device alias {alias} for {target}: {source}")]
    AliasCreationFailed {
        alias: String,
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Exclusive open gave up, either after exhausting retries or on a
    /// non-contention failure.
    #[error("Cannot access device {path} after {attempts} attempt(s): {source}")]
    DeviceUnavailable {
        path: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// No query could determine the device size.
    #[error("Cannot obtain information about the device: {source}")]
    ProbeFailed {
        #[source]
        source: std::io::Error,
    },

    /// I/O error while reading, seeking or querying a device.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing the masked window failed; the original bytes were written back.
    /// Carries the error of the failed write, not of the recovery writes.
    #[error("Write failed, original data restored: {0}")]
    WriteRolledBack(#[source] std::io::Error),

    /// The device name is not a recognized raw device path.
    #[error("Device name invalid: {0}")]
    InvalidDevicePath(String),

    /// The transform only runs on partitions and dynamic volumes.
    #[error("Not a partition: {0}")]
    NotAPartition(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation not supported on this platform.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// The underlying platform I/O error, if this error wraps one.
    pub fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            Error::AliasCreationFailed { source, .. }
            | Error::DeviceUnavailable { source, .. }
            | Error::ProbeFailed { source } => Some(source),
            Error::Io(e) | Error::WriteRolledBack(e) => Some(e),
            _ => None,
        }
    }

    /// Raw platform error code (Win32 error or errno), if one is available.
    pub fn os_error_code(&self) -> Option<i32> {
        self.io_source().and_then(|e| e.raw_os_error())
    }

    /// User-facing hint for failures that usually come from the device being
    /// busy, protected or inaccessible.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::DeviceUnavailable { .. } | Error::Io(_) | Error::WriteRolledBack(_) => {
                Some(ACCESS_HINT)
            }
            _ => None,
        }
    }
}
