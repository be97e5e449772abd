//! The reversible conceal transform on the leading window of a volume.
//!
//! The window is masked in memory and written back in one piece. If that
//! write fails, the original bytes are written back until the device
//! accepts them; a half-masked boot area is worse than blocking.

use crate::config::{CONCEAL_WINDOW_SIZE, ROLLBACK_RETRY_DELAY};
use crate::error::{Error, Result};
use serde::Serialize;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::time::Duration;

use super::signature::{detect_filesystem, xor_mask, FilesystemKind};

/// Filesystem signatures seen before and after the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConcealOutcome {
    pub had_filesystem_before: bool,
    pub has_filesystem_now: bool,
    /// Filesystem recognized before the transform.
    pub filesystem_before: Option<FilesystemKind>,
    /// Filesystem recognized in the written window.
    pub filesystem_now: Option<FilesystemKind>,
}

/// What a successful transform amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// A recognizable filesystem was masked.
    Concealed,
    /// A masked filesystem became recognizable again.
    Restored,
    /// Neither side carried a known signature.
    Applied,
}

impl ConcealOutcome {
    fn new(before: Option<FilesystemKind>, now: Option<FilesystemKind>) -> Self {
        Self {
            had_filesystem_before: before.is_some(),
            has_filesystem_now: now.is_some(),
            filesystem_before: before,
            filesystem_now: now,
        }
    }

    pub fn verdict(&self) -> Verdict {
        if self.had_filesystem_before {
            Verdict::Concealed
        } else if self.has_filesystem_now {
            Verdict::Restored
        } else {
            Verdict::Applied
        }
    }

    /// User-facing success message.
    pub fn message(&self) -> &'static str {
        match self.verdict() {
            Verdict::Concealed => "XOR applied successfully. The drive filesystem has been concealed.",
            Verdict::Restored => "XOR applied successfully. The drive filesystem has been restored.",
            Verdict::Applied => "XOR applied successfully.",
        }
    }
}

/// Mask the leading window of `device`, which must be opened exclusively
/// with write-through semantics.
pub fn conceal<D: Read + Write + Seek + ?Sized>(device: &mut D) -> Result<ConcealOutcome> {
    conceal_with(device, std::thread::sleep)
}

/// Like [`conceal`], with the pause between rollback writes supplied by the
/// caller.
///
/// A failed read or seek aborts before anything is written. A failed write
/// blocks until the original bytes are back on the device, then returns
/// [`Error::WriteRolledBack`] carrying the error of the failed write.
pub fn conceal_with<D, S>(device: &mut D, mut sleep: S) -> Result<ConcealOutcome>
where
    D: Read + Write + Seek + ?Sized,
    S: FnMut(Duration),
{
    let mut window = vec![0u8; CONCEAL_WINDOW_SIZE];
    device.seek(SeekFrom::Start(0))?;
    device.read_exact(&mut window)?;

    let before = detect_filesystem(&window);
    xor_mask(&mut window);

    if let Err(original) = write_window(device, &window) {
        tracing::warn!(error = %original, "conceal write failed, restoring original bytes");
        xor_mask(&mut window);

        let mut attempts = 0u64;
        loop {
            sleep(ROLLBACK_RETRY_DELAY);
            attempts += 1;
            match write_window(device, &window) {
                Ok(()) => break,
                Err(e) => tracing::trace!(attempts, error = %e, "restore write failed"),
            }
        }

        tracing::info!(attempts, "original bytes restored");
        return Err(Error::WriteRolledBack(original));
    }

    let now = detect_filesystem(&window);
    tracing::debug!(?before, ?now, "window masked");
    Ok(ConcealOutcome::new(before, now))
}

fn write_window<D: Write + Seek + ?Sized>(device: &mut D, window: &[u8]) -> io::Result<()> {
    device.seek(SeekFrom::Start(0))?;
    device.write_all(window)?;
    device.flush()
}
