//! Device parameter model: per-family operating parameters, capability
//! hooks and the compiled-in identification registry

pub mod families;
pub mod registry;
pub mod types;

pub use registry::lookup;
pub use types::{DeviceConfig, DeviceFlags, DeviceOps, JedecId};
