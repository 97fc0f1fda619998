//! Device parameter definitions

use bitflags::bitflags;

use crate::bus::{AddrSize, BreakSize, QspiBus, WrapLength};
use crate::clock::SysClk;

/// The three identification bytes returned by the JEDEC id command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JedecId {
    /// Manufacturer id (first byte)
    pub manufacturer: u8,
    /// Device type (second byte)
    pub device_type: u8,
    /// Density (third byte)
    pub density: u8,
}

bitflags! {
    /// Per-device capability flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceFlags: u8 {
        /// Device is pseudo-static RAM, not flash
        const RAM = 1 << 0;
        /// Device operates in QPI mode (opcodes on all four wires)
        const QPI = 1 << 1;
        /// Page-program address phase is sent quad-framed
        const QUAD_PROGRAM_ADDR = 1 << 2;
        /// Device supports continuous read, where the opcode is sent
        /// only once and must be broken before a fresh command
        const CONTINUOUS_READ = 1 << 3;
    }
}

/// Per-family capability hooks, selected at bind time
///
/// One implementation exists per supported device family; the registry
/// entry carries it as a trait object so heterogeneous families share
/// one table.
pub trait DeviceOps: Sync {
    /// Device-specific setup, run inside a manual-mode window right
    /// after binding (and again on wake-up under a power-off policy)
    fn initialize(&self, bus: &mut dyn QspiBus);

    /// Dummy bytes the read instruction needs at the given clock
    fn dummy_bytes(&self, _clk: SysClk) -> u8 {
        2
    }

    /// Device-side reconfiguration after a system clock change
    fn sys_clk_cfg(&self, _bus: &mut dyn QspiBus, _clk: SysClk) {}
}

/// Operating parameters of one device family
///
/// Instances are compiled-in constants; exactly one is bound per
/// controller after detection and stays bound until re-detection. The
/// field set is a stable data contract: reordering or repurposing
/// fields invalidates every device table built against it.
pub struct DeviceConfig {
    /// JEDEC manufacturer id
    pub manufacturer_id: u8,
    /// JEDEC device type
    pub device_type: u8,
    /// JEDEC density byte, after masking
    pub density: u8,
    /// Mask applied to the read-back density before comparison; 0xFF
    /// compares all bits
    pub density_mask: u8,

    /// Capability flags
    pub flags: DeviceFlags,
    /// Native address width
    pub address_size: AddrSize,
    /// Device capacity in bits
    pub size_bits: u32,
    /// Break sequence length for this device
    pub break_size: BreakSize,

    /// Fast read opcode used by the auto-mode read instruction
    pub fast_read_opcode: u8,
    /// Page program opcode (write opcode for RAM devices)
    pub page_program_opcode: u8,
    /// Page program opcode when the device is in QPI mode
    pub page_qpi_program_opcode: u8,
    /// Opcode that puts the device into QPI mode
    pub enter_qpi_opcode: u8,
    /// Sector erase opcode
    pub erase_opcode: u8,
    /// Erase suspend opcode
    pub erase_suspend_opcode: u8,
    /// Erase resume opcode
    pub erase_resume_opcode: u8,
    /// Opcode polled for program/erase progress
    pub status_opcode: u8,
    /// Bit position of the busy flag in the polled status byte
    pub busy_pos: u8,
    /// Level of the busy flag that means "in progress"
    pub busy_high: bool,
    /// Continuous-read mode byte sent after the address
    pub extra_byte: u8,

    /// Time to enter power-down after the command, in microseconds
    pub power_down_delay_us: u16,
    /// Time to leave power-down after the release command
    pub release_power_down_delay_us: u16,
    /// Time from power application to first command
    pub power_up_delay_us: u16,
    /// Minimum delay after an erase-suspend command
    pub suspend_delay_us: u8,
    /// Minimum delay after an erase-resume command
    pub resume_delay_us: u8,
    /// Time from reset command to first command
    pub reset_delay_us: u32,
    /// Minimum chip-select idle time between reads, nanoseconds
    pub read_cs_idle_ns: u8,
    /// Minimum chip-select idle time after erase-class commands
    pub erase_cs_idle_ns: u8,

    /// Wrapping burst capability (RAM devices)
    pub burst_len: WrapLength,
    /// Maximum chip-select active time, microseconds; 0 = unlimited
    /// (RAM devices)
    pub cs_active_max_us: u8,

    /// Family capability hooks
    pub ops: &'static dyn DeviceOps,
}

impl DeviceConfig {
    /// Device capacity in bytes
    pub const fn size_bytes(&self) -> u32 {
        self.size_bits / 8
    }

    /// Whether this entry matches a read-back JEDEC id, applying this
    /// entry's density mask before the comparison
    pub fn matches(&self, id: JedecId) -> bool {
        self.manufacturer_id == id.manufacturer
            && self.device_type == id.device_type
            && self.density == (id.density & self.density_mask)
    }

    /// Whether the device is RAM rather than flash
    pub fn is_ram(&self) -> bool {
        self.flags.contains(DeviceFlags::RAM)
    }
}

impl core::fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("manufacturer_id", &self.manufacturer_id)
            .field("device_type", &self.device_type)
            .field("density", &self.density)
            .field("flags", &self.flags)
            .field("size_bits", &self.size_bits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::families;

    #[test]
    fn test_size_bytes() {
        assert_eq!(families::W25Q128FV.size_bytes(), 16 * 1024 * 1024);
        assert_eq!(families::APS6404.size_bytes(), 8 * 1024 * 1024);
    }

    #[test]
    fn test_density_mask_comparison() {
        let id = JedecId {
            manufacturer: 0x0D,
            device_type: 0x5D,
            density: 0x46,
        };
        // PSRAM entries only compare the family bits of the density
        assert!(families::APS6404.matches(id));

        let exact = JedecId {
            manufacturer: 0xEF,
            device_type: 0x40,
            density: 0x18,
        };
        assert!(families::W25Q128FV.matches(exact));
        assert!(!families::W25Q128FV.matches(JedecId {
            density: 0x19,
            ..exact
        }));
    }
}
