//! Device discovery: the degrading size probe and the topology scan.

mod probe;
mod topology;

pub use probe::{probe, probe_with, DeviceInfo, ProbeStrategy};
pub use topology::TopologyBuilder;
