//! Win32 host: DOS-device aliases, device opens, drive letters and labels.

mod device;

pub use device::WindowsDevice;

use crate::device::{DevicePath, DiskGeometry, DriveIndex};
use crate::host::HostPlatform;
use std::ffi::{c_void, OsStr};
use std::fs::{File, OpenOptions};
use std::io;
use std::mem::size_of;
use std::os::windows::fs::OpenOptionsExt;
use std::os::windows::io::AsRawHandle;
use std::os::windows::ffi::OsStrExt;
use std::sync::OnceLock;

use windows::core::PCWSTR;
use windows::Win32::Foundation::HANDLE;
use windows::Win32::Storage::FileSystem::{
    DefineDosDeviceW, GetLogicalDrives, GetVolumeInformationW, QueryDosDeviceW,
    DDD_EXACT_MATCH_ON_REMOVE, DDD_RAW_TARGET_PATH, DDD_REMOVE_DEFINITION,
    FILE_FLAG_WRITE_THROUGH, FILE_SHARE_READ, FILE_SHARE_WRITE,
};
use windows::Win32::System::Ioctl::{
    DISK_GEOMETRY, IOCTL_DISK_GET_DRIVE_GEOMETRY, IOCTL_STORAGE_GET_DEVICE_NUMBER,
    STORAGE_DEVICE_NUMBER,
};
use windows::Win32::System::SystemInformation::{
    GetSystemDirectoryW, GetVersionExW, OSVERSIONINFOW,
};
use windows::Win32::System::IO::DeviceIoControl;

fn wide(s: &str) -> Vec<u16> {
    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

fn logical_drive_letters() -> Vec<char> {
    let mask = unsafe { GetLogicalDrives() };
    ('A'..='Z')
        .enumerate()
        .filter(|(idx, _)| mask & (1u32 << idx) != 0)
        .map(|(_, letter)| letter)
        .collect()
}

/// Target of the `X:` DOS device, e.g. `\Device\HarddiskVolume3`.
fn dos_device_target(letter: char) -> Option<String> {
    let name = wide(&format!("{}:", letter));
    let mut buf = [0u16; 1024];
    let len = unsafe { QueryDosDeviceW(PCWSTR(name.as_ptr()), Some(&mut buf)) };
    if len == 0 {
        None
    } else {
        Some(from_wide(&buf[..len as usize]))
    }
}

/// Drive and partition numbers backing the volume mounted at `X:`.
fn storage_device_number(letter: char) -> Option<(u32, u32)> {
    let file = OpenOptions::new()
        .access_mode(0)
        .share_mode(FILE_SHARE_READ.0 | FILE_SHARE_WRITE.0)
        .open(format!(r"\\.\{}:", letter))
        .ok()?;
    let number: STORAGE_DEVICE_NUMBER = query(&file, IOCTL_STORAGE_GET_DEVICE_NUMBER).ok()?;
    Some((number.DeviceNumber, number.PartitionNumber))
}

fn query<T>(file: &File, code: u32) -> io::Result<T> {
    let mut out: T = unsafe { std::mem::zeroed() };
    let mut returned = 0u32;
    unsafe {
        DeviceIoControl(
            HANDLE(file.as_raw_handle() as isize),
            code,
            None,
            0,
            Some(&mut out as *mut T as *mut c_void),
            size_of::<T>() as u32,
            Some(&mut returned),
            None,
        )
    }
    .map_err(|_| io::Error::last_os_error())?;
    Ok(out)
}

/// Host services backed by the Win32 API.
#[derive(Debug, Default)]
pub struct WindowsHost {
    _private: (),
}

impl WindowsHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Major version 6 introduced the dynamic-volume query.
    fn os_major_version() -> u32 {
        static MAJOR: OnceLock<u32> = OnceLock::new();
        *MAJOR.get_or_init(|| {
            let mut info = OSVERSIONINFOW {
                dwOSVersionInfoSize: size_of::<OSVERSIONINFOW>() as u32,
                ..Default::default()
            };
            match unsafe { GetVersionExW(&mut info) } {
                Ok(()) => info.dwMajorVersion,
                Err(_) => 0,
            }
        })
    }
}

impl HostPlatform for WindowsHost {
    type Device = WindowsDevice;

    fn define_alias(&self, name: &str, target: &str) -> io::Result<()> {
        let name = wide(name);
        let target = wide(target);
        unsafe {
            DefineDosDeviceW(
                DDD_RAW_TARGET_PATH,
                PCWSTR(name.as_ptr()),
                PCWSTR(target.as_ptr()),
            )
        }
        .map_err(|_| io::Error::last_os_error())
    }

    fn remove_alias(&self, name: &str, target: &str) -> io::Result<()> {
        let name = wide(name);
        let target = wide(target);
        unsafe {
            DefineDosDeviceW(
                DDD_REMOVE_DEFINITION | DDD_RAW_TARGET_PATH | DDD_EXACT_MATCH_ON_REMOVE,
                PCWSTR(name.as_ptr()),
                PCWSTR(target.as_ptr()),
            )
        }
        .map_err(|_| io::Error::last_os_error())
    }

    fn open_shared_read(&self, path: &str) -> io::Result<WindowsDevice> {
        let file = OpenOptions::new()
            .read(true)
            .share_mode(FILE_SHARE_READ.0)
            .open(path)?;
        Ok(WindowsDevice::new(file))
    }

    fn open_exclusive(&self, path: &str) -> io::Result<WindowsDevice> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .share_mode(0)
            .custom_flags(FILE_FLAG_WRITE_THROUGH.0)
            .open(path)?;
        Ok(WindowsDevice::new(file))
    }

    fn physical_drive_geometry(&self, drive: DriveIndex) -> io::Result<DiskGeometry> {
        let file = OpenOptions::new()
            .access_mode(0)
            .open(format!(r"\\.\PhysicalDrive{}", drive))?;
        let geometry: DISK_GEOMETRY = query(&file, IOCTL_DISK_GET_DRIVE_GEOMETRY)?;
        Ok(device::geometry_from_raw(&geometry))
    }

    fn drive_letter_of(&self, path: &DevicePath) -> Option<char> {
        let raw = path.to_string();
        logical_drive_letters().into_iter().find(|&letter| match path {
            DevicePath::DynamicVolume(_) => dos_device_target(letter)
                .map_or(false, |target| target.eq_ignore_ascii_case(&raw)),
            DevicePath::Partition { drive, partition } if partition.is_assigned() => {
                storage_device_number(letter) == Some((drive.0, partition.0))
            }
            _ => false,
        })
    }

    fn volume_label(&self, letter: char) -> Option<String> {
        let root = wide(&format!("{}:\\", letter));
        let mut name = [0u16; 64];
        unsafe {
            GetVolumeInformationW(
                PCWSTR(root.as_ptr()),
                Some(&mut name),
                None,
                None,
                None,
                None,
            )
        }
        .ok()?;
        let label = from_wide(&name).trim().to_string();
        if label.is_empty() {
            None
        } else {
            Some(label)
        }
    }

    fn system_drive_letter(&self) -> Option<char> {
        let mut buf = [0u16; 260];
        let len = unsafe { GetSystemDirectoryW(Some(&mut buf)) } as usize;
        if len == 0 {
            return None;
        }
        from_wide(&buf[..len])
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
    }

    fn supports_dynamic_volumes(&self) -> bool {
        Self::os_major_version() >= 6
    }
}
