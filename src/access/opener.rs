//! Exclusive, write-through device opens with bounded retry.
//!
//! Background services often hold a volume for a moment; exclusive access
//! is usually granted within a few dozen attempts.

use crate::config::RetryPolicy;
use crate::error::{Error, Result};
use crate::host::HostPlatform;
use std::io;
use std::time::Duration;

/// Open `path` exclusively through the host, retrying on contention.
pub fn open_exclusive<H: HostPlatform + ?Sized>(
    host: &H,
    path: &str,
    policy: &RetryPolicy,
) -> Result<H::Device> {
    retry_open(
        path,
        policy,
        || host.open_exclusive(path),
        |err| host.is_contention(err),
        |delay| host.sleep(delay),
    )
}

/// Retry loop shared by every exclusive open.
///
/// Runs at most `policy.max_attempts` attempts and sleeps `policy.delay`
/// before each attempt after the first. Stops at the first success, or at
/// the first failure that is not contention. The last platform error is
/// kept in [`Error::DeviceUnavailable`].
pub fn retry_open<T, A, C, S>(
    path: &str,
    policy: &RetryPolicy,
    mut attempt: A,
    is_contention: C,
    mut sleep: S,
) -> Result<T>
where
    A: FnMut() -> io::Result<T>,
    C: Fn(&io::Error) -> bool,
    S: FnMut(Duration),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if attempts > 1 {
            sleep(policy.delay);
        }

        match attempt() {
            Ok(device) => {
                if attempts > 1 {
                    tracing::debug!(path, attempts, "exclusive access granted after retry");
                }
                return Ok(device);
            }
            Err(e) if attempts < max_attempts && is_contention(&e) => {
                tracing::trace!(path, attempts, error = %e, "device busy, retrying");
            }
            Err(source) => {
                return Err(Error::DeviceUnavailable {
                    path: path.to_string(),
                    attempts,
                    source,
                })
            }
        }
    }
}
