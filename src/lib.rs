//! Conceal Drive
//!
//! Discovers the physical drives, partitions and dynamic volumes of a host
//! and applies a reversible mask to the boot area of a selected volume, so
//! the operating system and applications no longer recognize its filesystem.
//! Running the mask a second time restores the volume.
//!
//! # Features
//!
//! - **Topology scan**: whole disks, their partitions and dynamic volumes,
//!   with sizes, drive letters, labels and the system volume marked
//! - **Exclusive access**: write-through opens with bounded retry on contention
//! - **Reversible conceal**: XOR of the leading 8 KiB window, with rollback
//!   when the write fails
//! - **CLI Interface**: `list` and `conceal` commands
//!
//! # Architecture
//!
//! ```text
//! raw path → alias (access) → open → probe / layout (discovery) → Device tree
//!                                  → read window → mask → write (conceal)
//! ```
//!
//! All operating-system calls go through [`host::HostPlatform`], so the scan
//! and the transform run unchanged against an in-memory host in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(windows)]
//! # fn demo() -> conceal_drive::Result<()> {
//! use conceal_drive::host::WindowsHost;
//! use conceal_drive::{conceal_partition, RetryPolicy, TopologyBuilder};
//!
//! let host = WindowsHost::new();
//! for device in TopologyBuilder::new(&host).enumerate() {
//!     println!("{} {}", device.path, device.size);
//! }
//!
//! let outcome = conceal_partition(&host, r"\Device\Harddisk1\Partition1", &RetryPolicy::default())?;
//! println!("{}", outcome.message());
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod conceal;
pub mod config;
pub mod device;
pub mod discovery;
pub mod error;
pub mod host;

pub use conceal::{conceal, conceal_partition, ConcealOutcome, FilesystemKind, Verdict};
pub use config::{RetryPolicy, ScanConfig};
pub use device::{Device, DeviceKind, DevicePath};
pub use discovery::{DeviceInfo, TopologyBuilder};
pub use error::{Error, Result};
