//! Size and partition-style probe with graceful degradation.
//!
//! Not every device class answers every query on every host version, so the
//! probe walks an ordered list of strategies and keeps the first answer.

use crate::device::PartitionStyle;
use crate::error::{Error, Result};
use crate::host::DeviceHandle;
use serde::Serialize;
use std::io;

/// One way of asking a device for its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeStrategy {
    /// Extended partition information (MBR or GPT).
    PartitionInfoEx,
    /// Legacy partition information; always reports an MBR style.
    PartitionInfo,
    /// Raw length only; the style is left unknown.
    LengthInfo,
}

impl ProbeStrategy {
    /// Default order, richest answer first.
    pub const ALL: [ProbeStrategy; 3] = [
        ProbeStrategy::PartitionInfoEx,
        ProbeStrategy::PartitionInfo,
        ProbeStrategy::LengthInfo,
    ];

    fn run<D: DeviceHandle + ?Sized>(self, handle: &D) -> io::Result<(u64, PartitionStyle)> {
        match self {
            ProbeStrategy::PartitionInfoEx => handle
                .partition_info_ex()
                .map(|info| (info.length, info.style)),
            ProbeStrategy::PartitionInfo => handle
                .partition_info()
                .map(|info| (info.length, info.style)),
            ProbeStrategy::LengthInfo => handle
                .length_info()
                .map(|length| (length, PartitionStyle::Raw)),
        }
    }
}

/// What the probe learned about a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Size in bytes.
    pub size: u64,
    pub style: PartitionStyle,
    /// Always false when the host cannot answer the dynamic-volume query.
    pub is_dynamic: bool,
}

/// Probe `handle` with the default strategy order.
pub fn probe<D: DeviceHandle + ?Sized>(handle: &D, dynamic_supported: bool) -> Result<DeviceInfo> {
    probe_with(handle, &ProbeStrategy::ALL, dynamic_supported)
}

/// Probe `handle` trying `strategies` in order.
///
/// Fails with [`Error::ProbeFailed`] carrying the last query error only when
/// every strategy failed. The dynamic-volume flag is queried after a
/// successful strategy and only when `dynamic_supported`; a failed flag query
/// leaves it false.
pub fn probe_with<D: DeviceHandle + ?Sized>(
    handle: &D,
    strategies: &[ProbeStrategy],
    dynamic_supported: bool,
) -> Result<DeviceInfo> {
    let mut last_error = None;

    for &strategy in strategies {
        match strategy.run(handle) {
            Ok((size, style)) => {
                let is_dynamic = dynamic_supported && handle.is_dynamic().unwrap_or(false);
                tracing::trace!(?strategy, size, is_dynamic, "device probed");
                return Ok(DeviceInfo {
                    size,
                    style,
                    is_dynamic,
                });
            }
            Err(e) => {
                tracing::trace!(?strategy, error = %e, "probe strategy failed");
                last_error = Some(e);
            }
        }
    }

    Err(Error::ProbeFailed {
        source: last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "no probe strategy")),
    })
}
