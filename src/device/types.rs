//! Device tree and the raw values reported by device queries.

use super::path::{DevicePath, DriveIndex, PartitionIndex, VolumeIndex};
use serde::Serialize;
use std::fmt;

/// MBR partition type of an unused descriptor.
pub const PARTITION_ENTRY_UNUSED: u8 = 0x00;

/// A drive letter assigned by the host, rendered as `C:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DriveLetter(pub char);

impl fmt::Display for DriveLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.0)
    }
}

/// Partitioning scheme reported for a device or layout entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum PartitionStyle {
    /// No partition table.
    Raw,
    /// MBR entry with its type byte and boot indicator.
    Mbr {
        partition_type: u8,
        boot_indicator: bool,
    },
    Gpt,
}

impl PartitionStyle {
    /// An MBR descriptor that describes no partition.
    pub fn is_unused_mbr(&self) -> bool {
        matches!(
            self,
            PartitionStyle::Mbr {
                partition_type: PARTITION_ENTRY_UNUSED,
                ..
            }
        )
    }

    pub fn is_bootable(&self) -> bool {
        matches!(
            self,
            PartitionStyle::Mbr {
                boot_indicator: true,
                ..
            }
        )
    }
}

/// Partition information, as returned for a single device or per entry of a
/// drive layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionInfo {
    pub style: PartitionStyle,
    pub number: PartitionIndex,
    pub starting_offset: u64,
    pub length: u64,
}

/// Media type reported by the geometry query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaType {
    Unknown,
    /// One of the fixed-size floppy formats.
    Floppy,
    Removable,
    Fixed,
    Other(i32),
}

impl MediaType {
    /// Map the platform's raw media type code.
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => MediaType::Unknown,
            1..=10 | 13..=25 => MediaType::Floppy,
            11 => MediaType::Removable,
            12 => MediaType::Fixed,
            other => MediaType::Other(other),
        }
    }
}

/// Classic cylinder/head/sector geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskGeometry {
    pub cylinders: u64,
    pub media_type: MediaType,
    pub tracks_per_cylinder: u32,
    pub sectors_per_track: u32,
    pub bytes_per_sector: u32,
}

impl DiskGeometry {
    /// A geometry reporting zero bytes per sector is not usable.
    pub fn is_valid(&self) -> bool {
        self.bytes_per_sector != 0
    }

    /// Capacity implied by the geometry.
    pub fn size(&self) -> u64 {
        self.cylinders
            .saturating_mul(u64::from(self.bytes_per_sector))
            .saturating_mul(u64::from(self.sectors_per_track))
            .saturating_mul(u64::from(self.tracks_per_cylinder))
    }
}

/// What a [`Device`] entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceKind {
    /// An entire physical drive. `virtual_partition` is set when a
    /// driver-synthesized partition 1 spanning the whole drive was folded in.
    WholeDisk {
        drive: DriveIndex,
        virtual_partition: bool,
    },
    Partition {
        drive: DriveIndex,
        partition: PartitionIndex,
    },
    DynamicVolume { volume: VolumeIndex },
}

/// One discovered drive, partition or dynamic volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Raw path, unique within one enumeration pass.
    pub path: DevicePath,
    pub kind: DeviceKind,
    /// Size in bytes; 0 when unknown.
    pub size: u64,
    pub style: PartitionStyle,
    pub removable: bool,
    pub floppy: bool,
    pub contains_system: bool,
    pub mount_point: Option<DriveLetter>,
    pub label: Option<String>,
    /// Partitions of a whole-disk entry, in layout order.
    pub children: Vec<Device>,
}

impl Device {
    fn with_kind(path: DevicePath, kind: DeviceKind, size: u64) -> Self {
        Self {
            path,
            kind,
            size,
            style: PartitionStyle::Raw,
            removable: false,
            floppy: false,
            contains_system: false,
            mount_point: None,
            label: None,
            children: Vec::new(),
        }
    }

    /// Create a whole-disk entry.
    pub fn whole_disk(drive: DriveIndex, size: u64) -> Self {
        Self::with_kind(
            DevicePath::WholeDisk(drive),
            DeviceKind::WholeDisk {
                drive,
                virtual_partition: false,
            },
            size,
        )
    }

    /// Create a partition entry.
    pub fn partition(drive: DriveIndex, partition: PartitionIndex, size: u64) -> Self {
        Self::with_kind(
            DevicePath::Partition { drive, partition },
            DeviceKind::Partition { drive, partition },
            size,
        )
    }

    /// Create a dynamic volume entry.
    pub fn dynamic_volume(volume: VolumeIndex, size: u64) -> Self {
        Self::with_kind(
            DevicePath::DynamicVolume(volume),
            DeviceKind::DynamicVolume { volume },
            size,
        )
    }

    /// Partitions and dynamic volumes can be selected for the transform.
    pub fn is_partition(&self) -> bool {
        !matches!(self.kind, DeviceKind::WholeDisk { .. })
    }

    pub fn is_virtual_partition(&self) -> bool {
        matches!(
            self.kind,
            DeviceKind::WholeDisk {
                virtual_partition: true,
                ..
            }
        )
    }

    pub fn is_dynamic_volume(&self) -> bool {
        matches!(self.kind, DeviceKind::DynamicVolume { .. })
    }

    pub fn is_bootable(&self) -> bool {
        self.style.is_bootable()
    }

    /// Absorb a driver-synthesized partition 1 that spans the whole drive.
    ///
    /// The disk takes over the partition's path, mount point and label and
    /// is flagged as a virtual partition. Has no effect on non-disk entries.
    pub fn fold_virtual_partition(&mut self, partition: Device) {
        if let DeviceKind::WholeDisk {
            virtual_partition, ..
        } = &mut self.kind
        {
            *virtual_partition = true;
            self.path = partition.path;
            self.mount_point = partition.mount_point;
            self.label = partition.label;
            self.contains_system |= partition.contains_system;
        }
    }

    /// Whether a device listing should show this entry.
    ///
    /// Whole disks and dynamic volumes of unknown size are hidden, except
    /// floppies and whole disks whose first partition has a known size.
    /// Regular partitions are always listed.
    pub fn is_listed(&self) -> bool {
        match self.kind {
            DeviceKind::Partition { .. } => true,
            DeviceKind::DynamicVolume { .. } => self.floppy || self.size != 0,
            DeviceKind::WholeDisk { .. } => {
                self.floppy
                    || self.size != 0
                    || self.children.first().map_or(false, |first| first.size != 0)
            }
        }
    }

    /// Grouping label of the device column.
    pub fn group_label(&self) -> String {
        match self.kind {
            DeviceKind::WholeDisk { drive, .. } if !self.floppy => {
                let mut label = if self.removable {
                    format!("Removable Disk {}", drive)
                } else {
                    format!("Harddisk {}", drive)
                };
                if !self.children.is_empty() {
                    label.push(':');
                }
                label
            }
            _ => self.path.to_string(),
        }
    }
}
