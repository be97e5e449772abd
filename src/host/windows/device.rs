//! Open raw device on Windows: byte I/O through `std::fs::File`, structured
//! queries through `DeviceIoControl`.

use crate::device::{DiskGeometry, MediaType, PartitionIndex, PartitionInfo, PartitionStyle};
use crate::host::DeviceHandle;
use std::ffi::c_void;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::mem::size_of;
use std::os::windows::io::AsRawHandle;

use windows::Win32::Foundation::HANDLE;
use windows::Win32::System::Ioctl::{
    DISK_GEOMETRY, DRIVE_LAYOUT_INFORMATION_EX, GET_LENGTH_INFORMATION,
    IOCTL_DISK_GET_DRIVE_GEOMETRY, IOCTL_DISK_GET_DRIVE_LAYOUT_EX, IOCTL_DISK_GET_LENGTH_INFO,
    IOCTL_DISK_GET_PARTITION_INFO, IOCTL_DISK_GET_PARTITION_INFO_EX, PARTITION_INFORMATION,
    PARTITION_INFORMATION_EX, PARTITION_STYLE_GPT, PARTITION_STYLE_MBR,
};
use windows::Win32::System::IO::DeviceIoControl;

/// `CTL_CODE(IOCTL_VOLUME_BASE, 18, METHOD_BUFFERED, FILE_ANY_ACCESS)`
const IOCTL_VOLUME_IS_DYNAMIC: u32 = (0x56 << 16) | (18 << 2);

/// A raw device opened through a namespace alias.
pub struct WindowsDevice {
    file: File,
}

impl WindowsDevice {
    pub(super) fn new(file: File) -> Self {
        Self { file }
    }

    fn handle(&self) -> HANDLE {
        HANDLE(self.file.as_raw_handle() as isize)
    }

    /// Issue an output-only control code into `out`, returning the byte count.
    fn ioctl_into(&self, code: u32, out: *mut c_void, out_len: usize) -> io::Result<usize> {
        let mut returned = 0u32;
        unsafe {
            DeviceIoControl(
                self.handle(),
                code,
                None,
                0,
                Some(out),
                out_len as u32,
                Some(&mut returned),
                None,
            )
        }
        .map_err(|_| io::Error::last_os_error())?;
        Ok(returned as usize)
    }

    fn ioctl<T>(&self, code: u32) -> io::Result<T> {
        let mut out: T = unsafe { std::mem::zeroed() };
        self.ioctl_into(code, &mut out as *mut T as *mut c_void, size_of::<T>())?;
        Ok(out)
    }
}

fn partition_from_ex(pi: &PARTITION_INFORMATION_EX) -> PartitionInfo {
    let style = if pi.PartitionStyle == PARTITION_STYLE_MBR {
        let mbr = unsafe { pi.Anonymous.Mbr };
        PartitionStyle::Mbr {
            partition_type: mbr.PartitionType,
            boot_indicator: mbr.BootIndicator.0 != 0,
        }
    } else if pi.PartitionStyle == PARTITION_STYLE_GPT {
        PartitionStyle::Gpt
    } else {
        PartitionStyle::Raw
    };

    PartitionInfo {
        style,
        number: PartitionIndex(pi.PartitionNumber),
        starting_offset: pi.StartingOffset.max(0) as u64,
        length: pi.PartitionLength.max(0) as u64,
    }
}

impl DeviceHandle for WindowsDevice {
    fn partition_info_ex(&self) -> io::Result<PartitionInfo> {
        let pi: PARTITION_INFORMATION_EX = self.ioctl(IOCTL_DISK_GET_PARTITION_INFO_EX)?;
        Ok(partition_from_ex(&pi))
    }

    fn partition_info(&self) -> io::Result<PartitionInfo> {
        let pi: PARTITION_INFORMATION = self.ioctl(IOCTL_DISK_GET_PARTITION_INFO)?;
        Ok(PartitionInfo {
            style: PartitionStyle::Mbr {
                partition_type: pi.PartitionType,
                boot_indicator: pi.BootIndicator.0 != 0,
            },
            number: PartitionIndex(pi.PartitionNumber),
            starting_offset: pi.StartingOffset.max(0) as u64,
            length: pi.PartitionLength.max(0) as u64,
        })
    }

    fn length_info(&self) -> io::Result<u64> {
        let info: GET_LENGTH_INFORMATION = self.ioctl(IOCTL_DISK_GET_LENGTH_INFO)?;
        Ok(info.Length.max(0) as u64)
    }

    fn is_dynamic(&self) -> io::Result<bool> {
        let flag: u8 = self.ioctl(IOCTL_VOLUME_IS_DYNAMIC)?;
        Ok(flag != 0)
    }

    fn geometry(&self) -> io::Result<DiskGeometry> {
        let mut g: DISK_GEOMETRY = unsafe { std::mem::zeroed() };
        let returned = self.ioctl_into(
            IOCTL_DISK_GET_DRIVE_GEOMETRY,
            &mut g as *mut DISK_GEOMETRY as *mut c_void,
            size_of::<DISK_GEOMETRY>(),
        )?;
        if returned != size_of::<DISK_GEOMETRY>() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "short drive geometry",
            ));
        }
        Ok(geometry_from_raw(&g))
    }

    fn drive_layout(&self, max_entries: usize) -> io::Result<Vec<PartitionInfo>> {
        let bytes = size_of::<DRIVE_LAYOUT_INFORMATION_EX>()
            + max_entries * size_of::<PARTITION_INFORMATION_EX>();
        // u64 backing keeps the buffer aligned for the layout structures
        let mut buffer = vec![0u64; bytes.div_ceil(size_of::<u64>())];
        self.ioctl_into(
            IOCTL_DISK_GET_DRIVE_LAYOUT_EX,
            buffer.as_mut_ptr() as *mut c_void,
            buffer.len() * size_of::<u64>(),
        )?;

        let layout = buffer.as_ptr() as *const DRIVE_LAYOUT_INFORMATION_EX;
        let count = unsafe { (*layout).PartitionCount } as usize;
        let count = count.min(max_entries);
        let first = unsafe { std::ptr::addr_of!((*layout).PartitionEntry) }
            as *const PARTITION_INFORMATION_EX;

        Ok((0..count)
            .map(|i| unsafe { partition_from_ex(&*first.add(i)) })
            .collect())
    }
}

pub(super) fn geometry_from_raw(g: &DISK_GEOMETRY) -> DiskGeometry {
    DiskGeometry {
        cylinders: g.Cylinders.max(0) as u64,
        media_type: MediaType::from_raw(g.MediaType.0),
        tracks_per_cylinder: g.TracksPerCylinder,
        sectors_per_track: g.SectorsPerTrack,
        bytes_per_sector: g.BytesPerSector,
    }
}

impl Read for WindowsDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for WindowsDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for WindowsDevice {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
