//! Turning kernel-namespace device paths into openable paths.
//!
//! A raw path such as `\Device\Harddisk0\Partition1` cannot be opened by
//! ordinary file I/O. A temporary, host-global DOS-device alias pointing at
//! it can. Aliases are named after the process id and a caller-supplied
//! counter, so concurrent processes and concurrent scans with disjoint
//! counters never collide.

use crate::config::{ALIAS_PREFIX, APPLY_ALIAS_COUNTER, MAX_HOST_PARTITION_NUMBER};
use crate::device::{DevicePath, DriveIndex, VolumeIndex};
use crate::error::{Error, Result};
use crate::host::HostPlatform;

/// Counter that keeps aliases of one process apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Disambiguator(pub u32);

impl Disambiguator {
    /// Counter used by the conceal operation.
    pub const APPLY: Disambiguator = Disambiguator(APPLY_ALIAS_COUNTER);

    pub fn for_drive(drive: DriveIndex) -> Self {
        Disambiguator(drive.0 + 1)
    }

    pub fn for_dynamic_volume(volume: VolumeIndex) -> Self {
        Disambiguator((volume.0 + 1) * MAX_HOST_PARTITION_NUMBER)
    }
}

/// Alias name for a process id and counter.
pub fn alias_name(process_id: u32, disambiguator: Disambiguator) -> String {
    format!("{}{}_{}", ALIAS_PREFIX, process_id, disambiguator.0)
}

/// A live namespace alias. The alias is removed when the guard is dropped,
/// on every exit path.
#[must_use = "the alias is removed as soon as the guard is dropped"]
pub struct DosAlias<'h, H: HostPlatform + ?Sized> {
    host: &'h H,
    name: String,
    target: String,
    open_path: String,
    released: bool,
}

impl<'h, H: HostPlatform + ?Sized> DosAlias<'h, H> {
    /// Path usable by the host's open calls.
    pub fn path(&self) -> &str {
        &self.open_path
    }

    /// Alias name as registered with the host.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw path the alias points at.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Remove the alias now and report the outcome.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.host
            .remove_alias(&self.name, &self.target)
            .map_err(Error::Io)
    }
}

impl<H: HostPlatform + ?Sized> Drop for DosAlias<'_, H> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.host.remove_alias(&self.name, &self.target) {
            tracing::debug!(alias = %self.name, error = %e, "failed to remove device alias");
        }
    }
}

/// Create an alias for `raw_path` and return a guard owning it.
pub fn resolve<'h, H: HostPlatform + ?Sized>(
    host: &'h H,
    raw_path: &DevicePath,
    disambiguator: Disambiguator,
) -> Result<DosAlias<'h, H>> {
    let name = alias_name(host.process_id(), disambiguator);
    let target = raw_path.to_string();

    host.define_alias(&name, &target)
        .map_err(|source| Error::AliasCreationFailed {
            alias: name.clone(),
            target: target.clone(),
            source,
        })?;

    let open_path = host.alias_open_path(&name);
    Ok(DosAlias {
        host,
        name,
        target,
        open_path,
        released: false,
    })
}
