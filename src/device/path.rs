//! Canonical kernel-namespace device paths.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const HARDDISK_PREFIX: &str = r"\Device\Harddisk";
const VOLUME_PREFIX: &str = r"\Device\HarddiskVolume";
const PARTITION_SEPARATOR: &str = r"\Partition";
const UNASSIGNED_PARTITION: &str = "??";

/// Index of a physical drive (`\Device\Harddisk<N>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DriveIndex(pub u32);

/// Platform-assigned partition number within a drive. Zero means the
/// platform has not assigned a number yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PartitionIndex(pub u32);

/// Index of a volume managed by the host logical-volume layer
/// (`\Device\HarddiskVolume<N>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VolumeIndex(pub u32);

impl PartitionIndex {
    /// Partition number 1, the one a driver synthesizes for media without a
    /// partition table.
    pub const FIRST: PartitionIndex = PartitionIndex(1);

    /// Whether the platform assigned a number to this partition.
    pub fn is_assigned(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for DriveIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PartitionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_assigned() {
            write!(f, "{}", self.0)
        } else {
            f.write_str(UNASSIGNED_PARTITION)
        }
    }
}

impl fmt::Display for VolumeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw device path in one of the three canonical forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevicePath {
    /// `\Device\Harddisk<N>\Partition0`
    WholeDisk(DriveIndex),
    /// `\Device\Harddisk<N>\Partition<M>`, `Partition??` when unassigned.
    Partition {
        drive: DriveIndex,
        partition: PartitionIndex,
    },
    /// `\Device\HarddiskVolume<N>`
    DynamicVolume(VolumeIndex),
}

impl DevicePath {
    /// Parse a device name typed by a user.
    ///
    /// The `\Device\Harddisk` prefix is matched case-insensitively.
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = || Error::InvalidDevicePath(path.to_string());

        if path.len() <= HARDDISK_PREFIX.len() || !starts_with_ignore_case(path, HARDDISK_PREFIX) {
            return Err(invalid());
        }

        if starts_with_ignore_case(path, VOLUME_PREFIX) {
            let number = path[VOLUME_PREFIX.len()..]
                .parse::<u32>()
                .map_err(|_| invalid())?;
            return Ok(DevicePath::DynamicVolume(VolumeIndex(number)));
        }

        let rest = &path[HARDDISK_PREFIX.len()..];
        let split = rest.find('\\').ok_or_else(invalid)?;
        let (drive, tail) = rest.split_at(split);
        let drive = drive.parse::<u32>().map_err(|_| invalid())?;

        if !starts_with_ignore_case(tail, PARTITION_SEPARATOR) {
            return Err(invalid());
        }
        let number = &tail[PARTITION_SEPARATOR.len()..];

        let partition = if number == UNASSIGNED_PARTITION {
            PartitionIndex(0)
        } else {
            match number.parse::<u32>().map_err(|_| invalid())? {
                0 => return Ok(DevicePath::WholeDisk(DriveIndex(drive))),
                n => PartitionIndex(n),
            }
        };

        Ok(DevicePath::Partition {
            drive: DriveIndex(drive),
            partition,
        })
    }

    /// Physical drive this path lives on, if any.
    pub fn drive(&self) -> Option<DriveIndex> {
        match self {
            DevicePath::WholeDisk(drive) | DevicePath::Partition { drive, .. } => Some(*drive),
            DevicePath::DynamicVolume(_) => None,
        }
    }

    /// Whether the path addresses an entire physical drive.
    pub fn is_whole_disk(&self) -> bool {
        matches!(self, DevicePath::WholeDisk(_))
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePath::WholeDisk(drive) => {
                write!(f, "{}{}{}0", HARDDISK_PREFIX, drive, PARTITION_SEPARATOR)
            }
            DevicePath::Partition { drive, partition } => {
                write!(f, "{}{}{}{}", HARDDISK_PREFIX, drive, PARTITION_SEPARATOR, partition)
            }
            DevicePath::DynamicVolume(volume) => write!(f, "{}{}", VOLUME_PREFIX, volume),
        }
    }
}

impl FromStr for DevicePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DevicePath::parse(s)
    }
}

impl Serialize for DevicePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
