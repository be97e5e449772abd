//! End-to-end conceal of one user-selected volume.

use crate::access::{open_exclusive, resolve, Disambiguator};
use crate::config::RetryPolicy;
use crate::device::DevicePath;
use crate::error::{Error, Result};
use crate::host::{DeviceHandle, HostPlatform};

use super::transform::{conceal_with, ConcealOutcome};

/// Conceal (or restore) the partition or dynamic volume named by `device`.
///
/// The name must be a raw partition or dynamic-volume path. The volume is
/// reached through a temporary alias, opened exclusively with `policy` and
/// checked with a geometry query before the window is touched. The alias is
/// removed on every path out of this function.
pub fn conceal_partition<H: HostPlatform + ?Sized>(
    host: &H,
    device: &str,
    policy: &RetryPolicy,
) -> Result<ConcealOutcome> {
    policy.validate().map_err(Error::InvalidConfig)?;

    let path = DevicePath::parse(device.trim())?;
    if path.is_whole_disk() {
        return Err(Error::NotAPartition(path.to_string()));
    }

    let alias = resolve(host, &path, Disambiguator::APPLY)?;
    let mut handle = open_exclusive(host, alias.path(), policy)?;

    let geometry = handle.geometry()?;
    tracing::debug!(
        %path,
        bytes_per_sector = geometry.bytes_per_sector,
        "volume opened exclusively"
    );

    let outcome = conceal_with(&mut handle, |delay| host.sleep(delay))?;
    tracing::info!(%path, verdict = ?outcome.verdict(), "conceal finished");
    Ok(outcome)
}

/// Conceal the leading window of a block device or image file.
///
/// The file is opened read/write with `O_EXCL | O_SYNC`; a busy block
/// device is retried according to `policy`.
#[cfg(unix)]
pub fn conceal_file(path: &std::path::Path, policy: &RetryPolicy) -> Result<ConcealOutcome> {
    use crate::access::retry_open;
    use crate::host::{is_contention, unix};

    policy.validate().map_err(Error::InvalidConfig)?;

    let shown = path.display().to_string();
    let mut file = retry_open(
        &shown,
        policy,
        || unix::open_exclusive(path),
        is_contention,
        std::thread::sleep,
    )?;

    let outcome = super::transform::conceal(&mut file)?;
    tracing::info!(path = %shown, verdict = ?outcome.verdict(), "conceal finished");
    Ok(outcome)
}
