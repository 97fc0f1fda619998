//! Manual-mode command sequences shared by the engines
//!
//! Every function here assumes the controller is inside a manual-mode
//! window (auto mode off, single-wire framing unless stated otherwise)
//! and leaves chip select deasserted. Polling loops are intentionally
//! unbounded: yielding could schedule code that lives in the very flash
//! being commanded, and a device that never clears busy is a hardware
//! fault, not a recoverable condition.

use crate::bus::{BreakSize, QspiBus};
use crate::device::DeviceConfig;
use crate::opcodes;

/// Write a short command, as one chip-select window
pub(crate) fn write_cmd<B: QspiBus + ?Sized>(bus: &mut B, cmd: &[u8]) {
    bus.cs_enable();
    for &byte in cmd {
        bus.write8(byte);
    }
    bus.cs_disable();
}

/// Write a command then read back, in one chip-select window
pub(crate) fn transact<B: QspiBus + ?Sized>(bus: &mut B, cmd: &[u8], response: &mut [u8]) {
    bus.cs_enable();
    for &byte in cmd {
        bus.write8(byte);
    }
    for byte in response.iter_mut() {
        *byte = bus.read8();
    }
    bus.cs_disable();
}

/// Read status register 1
pub(crate) fn read_status<B: QspiBus + ?Sized>(bus: &mut B) -> u8 {
    let mut status = 0u8;
    transact(bus, &[opcodes::RDSR], core::slice::from_mut(&mut status));
    status
}

/// Whether the device reports write-in-progress
pub(crate) fn is_busy<B: QspiBus + ?Sized>(bus: &mut B) -> bool {
    read_status(bus) & opcodes::STATUS_BUSY_MASK != 0
}

/// Set the write-enable latch
///
/// The latch must be set before every program, erase or status write.
/// The command is repeated until the device reports the latch set with
/// busy clear; a device that never latches blocks forever.
pub(crate) fn write_enable<B: QspiBus + ?Sized>(bus: &mut B) {
    loop {
        write_cmd(bus, &[opcodes::WREN]);
        let mut status = read_status(bus);
        while status & opcodes::STATUS_BUSY_MASK != 0 {
            status = read_status(bus);
        }
        if status & opcodes::STATUS_WEL_MASK != 0 {
            return;
        }
    }
}

/// Whether an erase or program is still in progress, using the bound
/// device's status opcode and busy-bit description
pub(crate) fn program_in_progress<B: QspiBus + ?Sized>(bus: &mut B, dev: &DeviceConfig) -> bool {
    let mut status = 0u8;
    transact(bus, &[dev.status_opcode], core::slice::from_mut(&mut status));
    (status & (1 << dev.busy_pos) != 0) == dev.busy_high
}

/// Force the device out of continuous-read mode so the next transfer is
/// interpreted as a fresh instruction
pub(crate) fn reset_continuous_mode<B: QspiBus + ?Sized>(bus: &mut B, size: BreakSize) {
    bus.cs_enable();
    bus.write8(opcodes::EXIT_CONTINUOUS_MODE);
    if size == BreakSize::Two {
        bus.write8(opcodes::EXIT_CONTINUOUS_MODE);
    }
    bus.cs_disable();
}
