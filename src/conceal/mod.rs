//! Filesystem concealment: signature detection, the reversible mask and the
//! end-to-end operation on a selected volume.

mod session;
mod signature;
mod transform;

#[cfg(unix)]
pub use session::conceal_file;
pub use session::conceal_partition;
pub use signature::{detect_filesystem, has_filesystem, xor_mask, FilesystemKind};
pub use transform::{conceal, conceal_with, ConcealOutcome, Verdict};
