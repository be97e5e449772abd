//! Configuration constants and types for device discovery and concealment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest sector size a volume is expected to use.
pub const MAX_VOLUME_SECTOR_SIZE: usize = 4096;

/// Size of the leading window that gets masked (two maximum-size sectors).
pub const CONCEAL_WINDOW_SIZE: usize = 2 * MAX_VOLUME_SECTOR_SIZE;

/// Every byte of the window is XORed with this value.
pub const CONCEAL_CONSTANT: u8 = 0xFF;

/// Exclusive access is usually granted after a few tries.
pub const EXCL_ACCESS_MAX_AUTO_RETRIES: u32 = 500;

/// Delay before each exclusive-open retry.
pub const EXCL_ACCESS_AUTO_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Delay between corrective writes after a failed conceal write.
pub const ROLLBACK_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Physical drive indices probed during enumeration.
pub const MAX_HOST_DRIVE_NUMBER: u32 = 64;

/// Spacing between alias counters of consecutive dynamic volumes.
pub const MAX_HOST_PARTITION_NUMBER: u32 = 32;

/// Dynamic volume indices probed during enumeration.
pub const MAX_DYNAMIC_VOLUME_NUMBER: u32 = 256;

/// Capacity of the drive layout query buffer, in partition entries.
pub const MAX_LAYOUT_ENTRIES: usize = 128;

/// Prefix of the temporary namespace aliases.
pub const ALIAS_PREFIX: &str = "concealdrivevc";

/// Alias counter used when opening a volume for the conceal transform.
/// Lies above every counter used by enumeration of physical drives.
pub const APPLY_ALIAS_COUNTER: u32 = 65 * 33;

/// Bounded retry policy for exclusive opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of open attempts, including the first.
    pub max_attempts: u32,

    /// Sleep before every attempt after the first.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: EXCL_ACCESS_MAX_AUTO_RETRIES,
            delay: EXCL_ACCESS_AUTO_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Validate the policy.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("Retry count must be at least 1".to_string());
        }
        if self.delay > Duration::from_secs(10) {
            return Err("Retry delay must not exceed 10 seconds".to_string());
        }
        Ok(())
    }
}

/// Bounds of one enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Physical drives `0..max_drive_number` are probed.
    pub max_drive_number: u32,

    /// Dynamic volumes `0..max_dynamic_volume_number` are probed.
    pub max_dynamic_volume_number: u32,

    /// Partition entries requested from the layout query.
    pub max_layout_entries: usize,

    /// Scan dynamic volumes when the host supports them.
    pub scan_dynamic_volumes: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_drive_number: MAX_HOST_DRIVE_NUMBER,
            max_dynamic_volume_number: MAX_DYNAMIC_VOLUME_NUMBER,
            max_layout_entries: MAX_LAYOUT_ENTRIES,
            scan_dynamic_volumes: true,
        }
    }
}

impl ScanConfig {
    /// Validate the configuration.
    ///
    /// The index bounds cannot be raised past the defaults. Drive alias
    /// counters are `index + 1` and stay below [`APPLY_ALIAS_COUNTER`];
    /// volume counters are multiples of 32, which [`APPLY_ALIAS_COUNTER`] is
    /// not. Drive and volume counters may coincide: the scan releases each
    /// alias before creating the next.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_drive_number > MAX_HOST_DRIVE_NUMBER {
            return Err(format!(
                "Drive count must not exceed {}",
                MAX_HOST_DRIVE_NUMBER
            ));
        }
        if self.max_dynamic_volume_number > MAX_DYNAMIC_VOLUME_NUMBER {
            return Err(format!(
                "Dynamic volume count must not exceed {}",
                MAX_DYNAMIC_VOLUME_NUMBER
            ));
        }
        if self.max_layout_entries == 0 || self.max_layout_entries > MAX_LAYOUT_ENTRIES {
            return Err(format!(
                "Layout entry count must be between 1 and {}",
                MAX_LAYOUT_ENTRIES
            ));
        }
        Ok(())
    }
}
