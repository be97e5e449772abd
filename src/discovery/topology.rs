//! Enumeration of physical drives, their partitions and dynamic volumes.

use crate::access::{resolve, Disambiguator};
use crate::config::ScanConfig;
use crate::device::{
    Device, DevicePath, DiskGeometry, DriveIndex, DriveLetter, MediaType, PartitionIndex,
    PartitionInfo, VolumeIndex,
};
use crate::error::{Error, Result};
use crate::host::{DeviceHandle, HostPlatform};

use super::probe::probe;

/// Builds a snapshot of the host's storage topology.
///
/// Every index is handled strictly serially: each one creates and removes a
/// host-global alias, and aliases of one process are only kept apart by the
/// per-index counter.
pub struct TopologyBuilder<'h, H: HostPlatform + ?Sized> {
    host: &'h H,
    config: ScanConfig,
}

impl<'h, H: HostPlatform + ?Sized> TopologyBuilder<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self {
            host,
            config: ScanConfig::default(),
        }
    }

    /// Use custom scan bounds.
    pub fn with_config(mut self, config: ScanConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidConfig)?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Enumerate all devices.
    ///
    /// Each whole disk is followed by its unfolded partitions, then come the
    /// dynamic volumes. A drive or volume that cannot be opened or sized is
    /// left out; an empty result means nothing was found.
    pub fn enumerate(&self) -> Vec<Device> {
        let system = self
            .host
            .system_drive_letter()
            .map(|c| c.to_ascii_uppercase());
        let mut devices = Vec::new();

        for n in 0..self.config.max_drive_number {
            if let Some(disk) = self.scan_drive(DriveIndex(n), system) {
                let partitions = disk.children.clone();
                devices.push(disk);
                devices.extend(partitions);
            }
        }

        if self.config.scan_dynamic_volumes && self.host.supports_dynamic_volumes() {
            for n in 0..self.config.max_dynamic_volume_number {
                if let Some(volume) = self.scan_dynamic_volume(VolumeIndex(n), system) {
                    devices.push(volume);
                }
            }
        }

        tracing::debug!(count = devices.len(), "enumeration finished");
        devices
    }

    /// Scan one physical drive: size, removability, mount point and layout.
    ///
    /// `None` only when the drive cannot be aliased or opened.
    pub fn scan_drive(&self, drive: DriveIndex, system: Option<char>) -> Option<Device> {
        let path = DevicePath::WholeDisk(drive);
        let alias = match resolve(self.host, &path, Disambiguator::for_drive(drive)) {
            Ok(alias) => alias,
            Err(e) => {
                tracing::trace!(%path, error = %e, "skipping drive");
                return None;
            }
        };
        // Declared after the alias so it is closed before the alias goes away.
        let handle = match self.host.open_shared_read(alias.path()) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::trace!(%path, error = %e, "skipping drive");
                return None;
            }
        };

        let geometry = self.geometry(&handle, drive);
        let probed = probe(&handle, false);

        // An opened drive is always kept; an unsized one still gets its layout read.
        let size = match (&probed, geometry) {
            (Ok(info), _) if info.size != 0 => info.size,
            (_, Some(geometry)) => geometry.size(),
            (Ok(_), None) => 0,
            (Err(e), None) => {
                tracing::debug!(%path, error = %e, "cannot size drive");
                0
            }
        };

        let mut disk = Device::whole_disk(drive, size);
        if let Ok(info) = probed {
            disk.style = info.style;
        }
        if let Some(geometry) = geometry {
            disk.removable = geometry.media_type == MediaType::Removable;
            disk.floppy = geometry.media_type == MediaType::Floppy;
        }
        self.enrich(&mut disk, system);

        match handle.drive_layout(self.config.max_layout_entries) {
            Ok(layout) => self.attach_partitions(&mut disk, &layout, system),
            Err(e) => tracing::debug!(%path, error = %e, "no drive layout"),
        }

        tracing::debug!(
            %path,
            size = disk.size,
            partitions = disk.children.len(),
            virtual_partition = disk.is_virtual_partition(),
            "found drive"
        );
        Some(disk)
    }

    /// Scan one dynamic volume. Volumes not managed by the dynamic-volume
    /// layer are left out.
    pub fn scan_dynamic_volume(&self, volume: VolumeIndex, system: Option<char>) -> Option<Device> {
        let path = DevicePath::DynamicVolume(volume);
        let alias = resolve(
            self.host,
            &path,
            Disambiguator::for_dynamic_volume(volume),
        )
        .ok()?;
        let handle = self.host.open_shared_read(alias.path()).ok()?;

        let info = match probe(&handle, true) {
            Ok(info) if info.is_dynamic => info,
            _ => return None,
        };

        let mut device = Device::dynamic_volume(volume, info.size);
        device.style = info.style;
        self.enrich(&mut device, system);

        tracing::debug!(%path, size = device.size, "found dynamic volume");
        Some(device)
    }

    fn geometry(&self, handle: &H::Device, drive: DriveIndex) -> Option<DiskGeometry> {
        handle
            .geometry()
            .or_else(|_| self.host.physical_drive_geometry(drive))
            .ok()
    }

    /// Resolve mount point and label, and mark the system volume.
    fn enrich(&self, device: &mut Device, system: Option<char>) {
        let Some(letter) = self.host.drive_letter_of(&device.path) else {
            return;
        };
        let letter = letter.to_ascii_uppercase();
        device.mount_point = Some(DriveLetter(letter));
        device.label = self.host.volume_label(letter);
        if system == Some(letter) {
            device.contains_system = true;
        }
    }

    /// Turn layout entries into children of `disk`, folding a driver-synthesized
    /// partition 1 that spans the whole drive.
    fn attach_partitions(&self, disk: &mut Device, layout: &[PartitionInfo], system: Option<char>) {
        let Some(drive) = disk.path.drive() else {
            return;
        };

        for entry in layout {
            if entry.style.is_unused_mbr() {
                continue;
            }

            let mut partition = Device::partition(drive, entry.number, entry.length);
            partition.style = entry.style;
            if entry.number.is_assigned() {
                self.enrich(&mut partition, system);
            }

            if entry.number == PartitionIndex::FIRST && entry.length == disk.size {
                disk.fold_virtual_partition(partition);
                break;
            }

            partition.removable = disk.removable;
            disk.contains_system |= partition.contains_system;
            disk.children.push(partition);
        }
    }
}
