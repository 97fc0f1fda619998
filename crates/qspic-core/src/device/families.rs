//! Supported device families
//!
//! One `DeviceOps` implementation and one or more `DeviceConfig`
//! entries per family. Registry order is defined in
//! [`registry`](super::registry).

use crate::bus::{AddrSize, BreakSize, QspiBus, WrapLength};
use crate::clock::{self, SysClk};
use crate::device::types::{DeviceConfig, DeviceFlags, DeviceOps};
use crate::opcodes;
use crate::protocol;

/// One megabit, the unit of the JEDEC capacity ladder
const MBIT: u32 = 1024 * 1024;

/// Read Status Register 2 (Winbond and Adesto share the layout)
const READ_STATUS2: u8 = 0x35;
/// Write Status Register 2
const WRITE_STATUS2: u8 = 0x31;
/// Quad-enable bit in Status Register 2
const STATUS2_QE_MASK: u8 = 1 << 1;

/// Set the quad-enable bit in status register 2 if it is not already set
fn enable_quad_mode(bus: &mut dyn QspiBus) {
    let mut status = 0u8;
    protocol::transact(bus, &[READ_STATUS2], core::slice::from_mut(&mut status));
    if status & STATUS2_QE_MASK == 0 {
        protocol::write_enable(bus);
        protocol::write_cmd(bus, &[WRITE_STATUS2, status | STATUS2_QE_MASK]);
        while protocol::is_busy(bus) {}
    }
}

// ---------------------------------------------------------------------------
// Winbond W25Q
// ---------------------------------------------------------------------------

/// Winbond JEDEC manufacturer id
pub const WINBOND_ID: u8 = 0xEF;

const W25Q_SUSPEND: u8 = 0x75;
const W25Q_RESUME: u8 = 0x7A;
const W25Q_READ_STATUS3: u8 = 0x15;
const W25Q_ENTER_4B_ADDR: u8 = 0xB7;
/// 24- vs 32-bit address mode flag in Status Register 3
const W25Q_STATUS3_ADDR_MODE_MASK: u8 = 1 << 0;

const W25Q_POWER_DOWN_DELAY_US: u16 = 3;
const W25Q_RELEASE_POWER_DOWN_DELAY_US: u16 = 3;
const W25Q_POWER_UP_DELAY_US: u16 = 10;

/// Capability hooks shared by the 24-bit-address W25Q parts
pub struct W25qOps;

impl DeviceOps for W25qOps {
    fn initialize(&self, bus: &mut dyn QspiBus) {
        enable_quad_mode(bus);
    }
}

/// Capability hooks for the 256 Mbit W25Q256JW (32-bit addressing)
pub struct W25q256Ops;

impl W25q256Ops {
    /// Switch the device into 4-byte address mode unless already there
    fn enter_4byte_addr_mode(&self, bus: &mut dyn QspiBus) {
        let mut status = 0u8;
        protocol::transact(bus, &[W25Q_READ_STATUS3], core::slice::from_mut(&mut status));
        if status & W25Q_STATUS3_ADDR_MODE_MASK == 0 {
            protocol::write_cmd(bus, &[W25Q_ENTER_4B_ADDR]);
        }
        while protocol::is_busy(bus) {}
    }
}

impl DeviceOps for W25q256Ops {
    fn initialize(&self, bus: &mut dyn QspiBus) {
        enable_quad_mode(bus);
        self.enter_4byte_addr_mode(bus);
    }

    fn dummy_bytes(&self, _clk: SysClk) -> u8 {
        2
    }
}

/// Winbond W25Q128FV, 128 Mbit, 24-bit addressing
pub static W25Q128FV: DeviceConfig = DeviceConfig {
    manufacturer_id: WINBOND_ID,
    device_type: 0x40,
    density: 0x18,
    density_mask: 0xFF,
    flags: DeviceFlags::CONTINUOUS_READ,
    address_size: AddrSize::Addr24,
    size_bits: 128 * MBIT,
    break_size: BreakSize::One,
    fast_read_opcode: opcodes::FAST_READ_QUAD,
    page_program_opcode: opcodes::QUAD_PAGE_PROGRAM,
    page_qpi_program_opcode: opcodes::QPI_PAGE_PROGRAM,
    enter_qpi_opcode: opcodes::ENTER_QPI_MODE,
    erase_opcode: opcodes::SECTOR_ERASE,
    erase_suspend_opcode: W25Q_SUSPEND,
    erase_resume_opcode: W25Q_RESUME,
    status_opcode: opcodes::RDSR,
    busy_pos: opcodes::STATUS_BUSY_BIT,
    busy_high: true,
    extra_byte: 0xA0,
    power_down_delay_us: W25Q_POWER_DOWN_DELAY_US,
    release_power_down_delay_us: W25Q_RELEASE_POWER_DOWN_DELAY_US,
    power_up_delay_us: W25Q_POWER_UP_DELAY_US,
    suspend_delay_us: 100,
    resume_delay_us: 1,
    reset_delay_us: 30,
    read_cs_idle_ns: 50,
    erase_cs_idle_ns: 50,
    burst_len: WrapLength::None,
    cs_active_max_us: 0,
    ops: &W25qOps,
};

/// Winbond W25Q256JW, 256 Mbit, 32-bit addressing
pub static W25Q256JW: DeviceConfig = DeviceConfig {
    manufacturer_id: WINBOND_ID,
    device_type: 0x80,
    density: 0x19,
    density_mask: 0xFF,
    flags: DeviceFlags::CONTINUOUS_READ,
    address_size: AddrSize::Addr32,
    size_bits: 256 * MBIT,
    // All 32-bit-address devices need the two-byte break form
    break_size: BreakSize::Two,
    fast_read_opcode: opcodes::FAST_READ_QUAD,
    page_program_opcode: opcodes::QUAD_PAGE_PROGRAM,
    page_qpi_program_opcode: opcodes::QPI_PAGE_PROGRAM,
    enter_qpi_opcode: opcodes::ENTER_QPI_MODE,
    erase_opcode: opcodes::SECTOR_ERASE,
    erase_suspend_opcode: W25Q_SUSPEND,
    erase_resume_opcode: W25Q_RESUME,
    status_opcode: opcodes::RDSR,
    busy_pos: opcodes::STATUS_BUSY_BIT,
    busy_high: true,
    extra_byte: 0xA0,
    power_down_delay_us: W25Q_POWER_DOWN_DELAY_US,
    release_power_down_delay_us: W25Q_RELEASE_POWER_DOWN_DELAY_US,
    power_up_delay_us: W25Q_POWER_UP_DELAY_US,
    suspend_delay_us: 100,
    resume_delay_us: 1,
    reset_delay_us: 30,
    read_cs_idle_ns: 50,
    erase_cs_idle_ns: 50,
    burst_len: WrapLength::None,
    cs_active_max_us: 0,
    ops: &W25q256Ops,
};

// ---------------------------------------------------------------------------
// Adesto/Renesas AT25SL
// ---------------------------------------------------------------------------

/// Adesto JEDEC manufacturer id
pub const ADESTO_ID: u8 = 0x1F;

const AT25SL_SUSPEND: u8 = 0x75;
const AT25SL_RESUME: u8 = 0x7A;
/// Quad page program with quad-framed address (1-4-4)
const AT25SL_QUAD_PAGE_PROGRAM: u8 = 0x33;

/// Capability hooks for the AT25SL family
pub struct At25slOps;

impl DeviceOps for At25slOps {
    fn initialize(&self, bus: &mut dyn QspiBus) {
        enable_quad_mode(bus);
    }
}

/// Adesto AT25SL128A, 128 Mbit, 24-bit addressing
pub static AT25SL128A: DeviceConfig = DeviceConfig {
    manufacturer_id: ADESTO_ID,
    device_type: 0x42,
    density: 0x18,
    density_mask: 0xFF,
    flags: DeviceFlags::CONTINUOUS_READ.union(DeviceFlags::QUAD_PROGRAM_ADDR),
    address_size: AddrSize::Addr24,
    size_bits: 128 * MBIT,
    break_size: BreakSize::One,
    fast_read_opcode: opcodes::FAST_READ_QUAD,
    page_program_opcode: AT25SL_QUAD_PAGE_PROGRAM,
    page_qpi_program_opcode: opcodes::QPI_PAGE_PROGRAM,
    enter_qpi_opcode: opcodes::ENTER_QPI_MODE,
    erase_opcode: opcodes::SECTOR_ERASE,
    erase_suspend_opcode: AT25SL_SUSPEND,
    erase_resume_opcode: AT25SL_RESUME,
    status_opcode: opcodes::RDSR,
    busy_pos: opcodes::STATUS_BUSY_BIT,
    busy_high: true,
    extra_byte: 0xA0,
    power_down_delay_us: 3,
    release_power_down_delay_us: 3,
    power_up_delay_us: 10_000,
    suspend_delay_us: 30,
    resume_delay_us: 1,
    reset_delay_us: 30,
    read_cs_idle_ns: 100,
    erase_cs_idle_ns: 100,
    burst_len: WrapLength::None,
    cs_active_max_us: 0,
    ops: &At25slOps,
};

// ---------------------------------------------------------------------------
// AP Memory PSRAM
// ---------------------------------------------------------------------------

/// AP Memory JEDEC manufacturer id
pub const APMEMORY_ID: u8 = 0x0D;

/// Enter quad (QPI) mode
const APM_ENTER_QUAD: u8 = 0x35;
/// Density byte carries the family in the top three bits only
const APM_DENSITY_MASK: u8 = 0xE0;

/// Capability hooks for AP Memory pseudo-static RAMs
pub struct ApsPsramOps;

impl DeviceOps for ApsPsramOps {
    fn initialize(&self, bus: &mut dyn QspiBus) {
        protocol::write_cmd(bus, &[opcodes::RESET_ENABLE]);
        protocol::write_cmd(bus, &[opcodes::RESET]);
    }

    fn sys_clk_cfg(&self, bus: &mut dyn QspiBus, clk: SysClk) {
        // tCEM is a wall-clock limit; rescale it to the new controller clock
        let cycles = clock::us_to_cs_cycles(APS6404.cs_active_max_us, clk.freq_hz(), bus.divider());
        bus.set_cs_active_max(cycles);
    }
}

/// AP Memory APS6404, 64 Mbit QPI pseudo-static RAM
pub static APS6404: DeviceConfig = DeviceConfig {
    manufacturer_id: APMEMORY_ID,
    device_type: 0x5D,
    density: 0x40,
    density_mask: APM_DENSITY_MASK,
    flags: DeviceFlags::RAM.union(DeviceFlags::QPI),
    address_size: AddrSize::Addr24,
    size_bits: 64 * MBIT,
    break_size: BreakSize::One,
    fast_read_opcode: opcodes::FAST_READ_QUAD,
    page_program_opcode: opcodes::RAM_WRITE_QUAD,
    page_qpi_program_opcode: opcodes::QPI_PAGE_PROGRAM,
    enter_qpi_opcode: APM_ENTER_QUAD,
    erase_opcode: 0,
    erase_suspend_opcode: 0,
    erase_resume_opcode: 0,
    status_opcode: opcodes::RDSR,
    busy_pos: opcodes::STATUS_BUSY_BIT,
    busy_high: true,
    extra_byte: 0x00,
    power_down_delay_us: 0,
    release_power_down_delay_us: 0,
    power_up_delay_us: 150,
    suspend_delay_us: 0,
    resume_delay_us: 0,
    reset_delay_us: 50,
    read_cs_idle_ns: 18,
    erase_cs_idle_ns: 18,
    burst_len: WrapLength::None,
    cs_active_max_us: 2,
    ops: &ApsPsramOps,
};
