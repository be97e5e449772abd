//! Boot-sector signatures and the reversible window mask.

use crate::config::CONCEAL_CONSTANT;
use serde::Serialize;
use std::fmt;

/// Filesystems recognized by the first eight bytes of their boot sector
/// (jump instruction plus OEM name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FilesystemKind {
    Ntfs,
    Fat16,
    Fat32,
    ExFat,
}

impl FilesystemKind {
    pub const ALL: [FilesystemKind; 4] = [
        FilesystemKind::Ntfs,
        FilesystemKind::Fat16,
        FilesystemKind::Fat32,
        FilesystemKind::ExFat,
    ];

    /// Leading eight bytes read as a big-endian integer.
    pub const fn signature(self) -> u64 {
        match self {
            FilesystemKind::Ntfs => 0xEB52_904E_5446_5320,
            FilesystemKind::Fat16 => 0xEB3C_904D_5344_4F53,
            FilesystemKind::Fat32 => 0xEB58_904D_5344_4F53,
            FilesystemKind::ExFat => 0xEB76_9045_5846_4154,
        }
    }
}

impl fmt::Display for FilesystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilesystemKind::Ntfs => "NTFS",
            FilesystemKind::Fat16 => "FAT16",
            FilesystemKind::Fat32 => "FAT32",
            FilesystemKind::ExFat => "exFAT",
        };
        f.write_str(name)
    }
}

/// Identify the filesystem whose signature starts `window`.
pub fn detect_filesystem(window: &[u8]) -> Option<FilesystemKind> {
    let head: [u8; 8] = window.get(..8)?.try_into().ok()?;
    let value = u64::from_be_bytes(head);
    FilesystemKind::ALL
        .into_iter()
        .find(|kind| kind.signature() == value)
}

pub fn has_filesystem(window: &[u8]) -> bool {
    detect_filesystem(window).is_some()
}

/// XOR every byte with the conceal constant. Applying it twice restores the
/// original bytes.
pub fn xor_mask(window: &mut [u8]) {
    for byte in window.iter_mut() {
        *byte ^= CONCEAL_CONSTANT;
    }
}
