//! Exclusive raw access to block devices and image files on Unix.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Single attempt at an exclusive, write-through read/write open.
///
/// `O_EXCL` on a block device fails with `EBUSY` while the device is
/// mounted or held open exclusively by someone else; on a regular file it
/// has no effect. `O_SYNC` makes every write reach the device before
/// returning.
pub fn open_exclusive(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_EXCL | libc::O_SYNC)
        .open(path)
}
