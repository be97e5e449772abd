//! In-memory host used by the integration tests.
//!
//! Devices are keyed by their raw path. Opening goes through the alias table
//! exactly like on a real host, so unbalanced alias handling shows up in the
//! counters.

#![allow(dead_code)]

use conceal_drive::device::{
    DevicePath, DiskGeometry, DriveIndex, MediaType, PartitionIndex, PartitionInfo,
    PartitionStyle,
};
use conceal_drive::host::{DeviceHandle, HostPlatform};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::rc::Rc;
use std::time::Duration;

pub const PROCESS_ID: u32 = 777;
pub const BUSY: i32 = 32;
pub const ACCESS_DENIED: i32 = 5;
pub const NOT_FOUND: i32 = 2;
/// Code of the first injected write failure.
pub const WRITE_FAULT: i32 = 23;
/// Code of every later injected write failure.
pub const RETRY_WRITE_FAULT: i32 = 1117;

/// One raw device known to the fake host.
#[derive(Default)]
pub struct Target {
    pub data: RefCell<Vec<u8>>,
    pub partition_info_ex: Option<PartitionInfo>,
    pub partition_info: Option<PartitionInfo>,
    pub length: Option<u64>,
    pub dynamic: Option<bool>,
    pub geometry: Option<DiskGeometry>,
    pub layout: Option<Vec<PartitionInfo>>,
    /// Every open fails with this code.
    pub open_error: Option<i32>,
    /// Number of exclusive opens refused as busy before one succeeds.
    pub busy_opens: Cell<u32>,
    /// Number of write calls that fail after writing half of the buffer.
    pub write_failures: Cell<u32>,
    pub failed_writes: Cell<u32>,
}

#[derive(Default)]
pub struct FakeHost {
    pub targets: HashMap<String, Rc<Target>>,
    pub physical_geometry: HashMap<u32, DiskGeometry>,
    pub letters: HashMap<String, char>,
    pub labels: HashMap<char, String>,
    pub system_letter: Option<char>,
    pub dynamic_supported: bool,
    /// Raw paths for which alias creation is refused.
    pub refused_aliases: HashSet<String>,

    pub aliases: RefCell<HashMap<String, String>>,
    pub alias_names: RefCell<Vec<String>>,
    pub created: Cell<u32>,
    pub removed: Cell<u32>,
    pub exclusive_opens: Cell<u32>,
    pub sleeps: RefCell<Vec<Duration>>,
}

pub fn mbr(number: u32, starting_offset: u64, length: u64, partition_type: u8) -> PartitionInfo {
    PartitionInfo {
        style: PartitionStyle::Mbr {
            partition_type,
            boot_indicator: false,
        },
        number: PartitionIndex(number),
        starting_offset,
        length,
    }
}

/// Geometry whose capacity is `bytes` rounded down to 512-byte sectors.
pub fn geometry(media_type: MediaType, bytes: u64) -> DiskGeometry {
    DiskGeometry {
        cylinders: bytes / 512,
        media_type,
        tracks_per_cylinder: 1,
        sectors_per_track: 1,
        bytes_per_sector: 512,
    }
}

pub fn whole_disk_path(drive: u32) -> String {
    DevicePath::WholeDisk(DriveIndex(drive)).to_string()
}

pub fn partition_path(drive: u32, partition: u32) -> String {
    format!(r"\Device\Harddisk{}\Partition{}", drive, partition)
}

pub fn volume_path(volume: u32) -> String {
    format!(r"\Device\HarddiskVolume{}", volume)
}

/// First bytes of an NTFS boot sector followed by a recognizable pattern.
pub fn ntfs_image(len: usize) -> Vec<u8> {
    let mut data: Vec<u8> = (0..len).map(|i| (i % 253) as u8).collect();
    data[..8].copy_from_slice(&[0xEB, 0x52, 0x90, b'N', b'T', b'F', b'S', b' ']);
    data
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fixed disk answering the extended query and the layout query.
    pub fn add_disk(&mut self, drive: u32, size: u64, layout: Vec<PartitionInfo>) -> Rc<Target> {
        self.add_target(
            whole_disk_path(drive),
            Target {
                partition_info_ex: Some(PartitionInfo {
                    style: PartitionStyle::Raw,
                    number: PartitionIndex(0),
                    starting_offset: 0,
                    length: size,
                }),
                geometry: Some(geometry(MediaType::Fixed, size)),
                layout: Some(layout),
                ..Default::default()
            },
        )
    }

    /// Add an openable partition holding `data`.
    pub fn add_partition(&mut self, drive: u32, partition: u32, data: Vec<u8>) -> Rc<Target> {
        let size = data.len() as u64;
        self.add_target(
            partition_path(drive, partition),
            Target {
                partition_info_ex: Some(mbr(partition, 1 << 20, size, 0x07)),
                geometry: Some(geometry(MediaType::Fixed, size)),
                data: RefCell::new(data),
                ..Default::default()
            },
        )
    }

    pub fn add_dynamic_volume(&mut self, volume: u32, size: u64, dynamic: bool) -> Rc<Target> {
        self.add_target(
            volume_path(volume),
            Target {
                length: Some(size),
                dynamic: Some(dynamic),
                ..Default::default()
            },
        )
    }

    pub fn add_target(&mut self, path: String, target: Target) -> Rc<Target> {
        let target = Rc::new(target);
        self.targets.insert(path, Rc::clone(&target));
        target
    }

    pub fn mount(&mut self, raw_path: String, letter: char, label: &str) {
        self.letters.insert(raw_path, letter);
        if !label.is_empty() {
            self.labels.insert(letter, label.to_string());
        }
    }

    pub fn live_aliases(&self) -> usize {
        self.aliases.borrow().len()
    }

    fn open(&self, path: &str) -> io::Result<FakeDevice> {
        let name = path
            .strip_prefix(r"\\.\")
            .ok_or_else(|| io::Error::from_raw_os_error(NOT_FOUND))?;
        let raw = self
            .aliases
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::from_raw_os_error(NOT_FOUND))?;
        let target = self
            .targets
            .get(&raw)
            .cloned()
            .ok_or_else(|| io::Error::from_raw_os_error(NOT_FOUND))?;
        if let Some(code) = target.open_error {
            return Err(io::Error::from_raw_os_error(code));
        }
        Ok(FakeDevice { target, pos: 0 })
    }
}

impl HostPlatform for FakeHost {
    type Device = FakeDevice;

    fn define_alias(&self, name: &str, target: &str) -> io::Result<()> {
        if self.refused_aliases.contains(target) {
            return Err(io::Error::from_raw_os_error(ACCESS_DENIED));
        }
        self.aliases
            .borrow_mut()
            .insert(name.to_string(), target.to_string());
        self.alias_names.borrow_mut().push(name.to_string());
        self.created.set(self.created.get() + 1);
        Ok(())
    }

    fn remove_alias(&self, name: &str, target: &str) -> io::Result<()> {
        let mut aliases = self.aliases.borrow_mut();
        match aliases.get(name) {
            Some(existing) if existing == target => {
                aliases.remove(name);
                self.removed.set(self.removed.get() + 1);
                Ok(())
            }
            _ => Err(io::Error::from_raw_os_error(NOT_FOUND)),
        }
    }

    fn open_shared_read(&self, path: &str) -> io::Result<FakeDevice> {
        self.open(path)
    }

    fn open_exclusive(&self, path: &str) -> io::Result<FakeDevice> {
        self.exclusive_opens.set(self.exclusive_opens.get() + 1);
        let device = self.open(path)?;
        let busy = device.target.busy_opens.get();
        if busy > 0 {
            device.target.busy_opens.set(busy - 1);
            return Err(io::Error::from_raw_os_error(BUSY));
        }
        Ok(device)
    }

    fn physical_drive_geometry(&self, drive: DriveIndex) -> io::Result<DiskGeometry> {
        self.physical_geometry
            .get(&drive.0)
            .copied()
            .ok_or_else(|| io::Error::from_raw_os_error(NOT_FOUND))
    }

    fn drive_letter_of(&self, path: &DevicePath) -> Option<char> {
        self.letters.get(&path.to_string()).copied()
    }

    fn volume_label(&self, letter: char) -> Option<String> {
        self.labels.get(&letter).cloned()
    }

    fn system_drive_letter(&self) -> Option<char> {
        self.system_letter
    }

    fn supports_dynamic_volumes(&self) -> bool {
        self.dynamic_supported
    }

    fn process_id(&self) -> u32 {
        PROCESS_ID
    }

    fn is_contention(&self, err: &io::Error) -> bool {
        err.raw_os_error() == Some(BUSY)
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

pub struct FakeDevice {
    target: Rc<Target>,
    pos: u64,
}

fn unsupported<T>() -> io::Result<T> {
    Err(io::Error::from_raw_os_error(1))
}

impl DeviceHandle for FakeDevice {
    fn partition_info_ex(&self) -> io::Result<PartitionInfo> {
        self.target.partition_info_ex.map_or_else(unsupported, Ok)
    }

    fn partition_info(&self) -> io::Result<PartitionInfo> {
        self.target.partition_info.map_or_else(unsupported, Ok)
    }

    fn length_info(&self) -> io::Result<u64> {
        self.target.length.map_or_else(unsupported, Ok)
    }

    fn is_dynamic(&self) -> io::Result<bool> {
        self.target.dynamic.map_or_else(unsupported, Ok)
    }

    fn geometry(&self) -> io::Result<DiskGeometry> {
        self.target.geometry.map_or_else(unsupported, Ok)
    }

    fn drive_layout(&self, max_entries: usize) -> io::Result<Vec<PartitionInfo>> {
        match &self.target.layout {
            Some(layout) => Ok(layout.iter().take(max_entries).copied().collect()),
            None => unsupported(),
        }
    }
}

impl Read for FakeDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.target.data.borrow();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for FakeDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let failures = self.target.write_failures.get();
        if failures > 0 {
            self.target.write_failures.set(failures - 1);
            self.write_through(&buf[..buf.len() / 2]);
            let failed = self.target.failed_writes.get();
            self.target.failed_writes.set(failed + 1);
            let code = if failed == 0 {
                WRITE_FAULT
            } else {
                RETRY_WRITE_FAULT
            };
            return Err(io::Error::from_raw_os_error(code));
        }
        Ok(self.write_through(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FakeDevice {
    fn write_through(&mut self, buf: &[u8]) -> usize {
        let mut data = self.target.data.borrow_mut();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        data[start..start + n].copy_from_slice(&buf[..n]);
        self.pos += n as u64;
        n
    }
}

impl Seek for FakeDevice {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.target.data.borrow().len() as i64;
        let next = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => len + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if next < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "negative seek"));
        }
        self.pos = next as u64;
        Ok(self.pos)
    }
}
