//! Device data model: typed indices, canonical raw paths and the device tree.

mod path;
mod types;

pub use path::{DevicePath, DriveIndex, PartitionIndex, VolumeIndex};
pub use types::{
    Device, DeviceKind, DiskGeometry, DriveLetter, MediaType, PartitionInfo, PartitionStyle,
    PARTITION_ENTRY_UNUSED,
};
