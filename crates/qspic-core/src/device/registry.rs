//! Compiled-in device identification registry
//!
//! Autodetection reads the JEDEC id of whatever is wired to a
//! controller and binds the first table entry whose masked triple
//! matches. Table order is part of the driver's behavior: entries with
//! masked (family-wide) densities can shadow later, more specific ones,
//! and no overlap detection is performed.

use crate::device::families;
use crate::device::types::{DeviceConfig, JedecId};

/// The identification table, scanned in order
pub static DEVICE_TABLE: &[&DeviceConfig] = &[
    &families::AT25SL128A,
    &families::W25Q256JW,
    &families::W25Q128FV,
    &families::APS6404,
];

/// Find the first table entry matching a read-back JEDEC id
///
/// Each entry's density mask is applied to `id.density` before the
/// comparison. Returns `None` when no entry matches.
pub fn lookup(id: JedecId) -> Option<&'static DeviceConfig> {
    DEVICE_TABLE.iter().copied().find(|cfg| cfg.matches(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_exact_triple() {
        let cfg = lookup(JedecId {
            manufacturer: 0xEF,
            device_type: 0x40,
            density: 0x18,
        })
        .unwrap();
        assert!(core::ptr::eq(cfg, &families::W25Q128FV));
    }

    #[test]
    fn test_lookup_applies_density_mask() {
        // 0x46 & 0xE0 == 0x40, the APS6404 family density
        let cfg = lookup(JedecId {
            manufacturer: 0x0D,
            device_type: 0x5D,
            density: 0x46,
        })
        .unwrap();
        assert!(cfg.is_ram());
    }

    #[test]
    fn test_lookup_unknown_id() {
        assert!(lookup(JedecId {
            manufacturer: 0xAA,
            device_type: 0xBB,
            density: 0xCC,
        })
        .is_none());
        // Same manufacturer, wrong density
        assert!(lookup(JedecId {
            manufacturer: 0xEF,
            device_type: 0x40,
            density: 0x17,
        })
        .is_none());
    }

    #[test]
    fn test_lookup_returns_first_match() {
        for (i, cfg) in DEVICE_TABLE.iter().enumerate() {
            let id = JedecId {
                manufacturer: cfg.manufacturer_id,
                device_type: cfg.device_type,
                density: cfg.density,
            };
            let found = lookup(id).unwrap();
            let first = DEVICE_TABLE
                .iter()
                .position(|c| c.matches(id))
                .unwrap();
            assert!(first <= i);
            assert!(core::ptr::eq(found, DEVICE_TABLE[first]));
        }
    }
}
