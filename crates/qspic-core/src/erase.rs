//! Sector and chip erase engines
//!
//! Sector erase runs under one of two strategies, both compiled in and
//! selected at construction: the controller's autonomous erase engine
//! (which suspends the erase to serve reads) or a fully manual opcode
//! sequence. Either way the call is synchronous: it returns once the
//! device reports the erase finished.

use crate::addr::ControllerId;
use crate::bus::{AddrSize, EraseStatus, QspiBus};
use crate::device::DeviceConfig;
use crate::driver::{ErasePolicy, QspiDriver};
use crate::mode::{self, ManualWindow};
use crate::opcodes;
use crate::protocol;

/// Smallest erasable unit
pub const SECTOR_SIZE: u32 = 4096;

/// Issue the erase opcode and address, then poll to completion
fn erase_sector_cmd<B: QspiBus + ?Sized>(
    bus: &mut B,
    dev: &DeviceConfig,
    addr_size: AddrSize,
    offset: u32,
) {
    protocol::write_enable(bus);

    bus.cs_enable();
    if addr_size == AddrSize::Addr32 {
        bus.write8(dev.erase_opcode);
        bus.write32(offset.swap_bytes());
    } else {
        bus.write32(dev.erase_opcode as u32 | (offset.swap_bytes() & 0xFFFF_FF00));
    }
    bus.cs_disable();

    while protocol::program_in_progress(bus, dev) {}
}

impl<B: QspiBus> QspiDriver<B> {
    /// Erase the sector containing flat address `a`
    ///
    /// Blocks until the device reports the erase complete, regardless
    /// of the configured erase strategy. The sector must be
    /// address-valid.
    pub fn erase_sector(&mut self, a: u32) {
        let (id, offset) = self.resolve(a, SECTOR_SIZE);
        let quad_enabled = self.cfg.quad_enabled;
        let policy = self.cfg.erase_policy;
        let dev = self.slot(id).device.unwrap();
        let addr_size = self.effective_addr_size(dev);

        let bus = &mut self.slot_mut(id).bus;
        mode::wait_writable(bus, dev, quad_enabled);

        match policy {
            ErasePolicy::Auto => {
                bus.trigger_erase(offset);
                while bus.erase_status() != EraseStatus::Idle {}
            }
            ErasePolicy::Manual => {
                let mut window = ManualWindow::open(bus, dev, quad_enabled);
                mode::enter_qpi(&mut *window, dev, quad_enabled);
                erase_sector_cmd(&mut *window, dev, addr_size, offset);
            }
        }
    }

    /// Erase the whole device on one controller
    ///
    /// Returns false without any bus activity when the controller is
    /// absent or bound to a RAM device.
    pub fn erase_chip_by_id(&mut self, id: ControllerId) -> bool {
        let quad_enabled = self.cfg.quad_enabled;
        let Some(dev) = self.slot(id).device else {
            return false;
        };
        if dev.is_ram() {
            return false;
        }

        let bus = &mut self.slot_mut(id).bus;
        let mut window = ManualWindow::open(bus, dev, quad_enabled);

        protocol::write_cmd(&mut *window, &[opcodes::WREN]);
        protocol::write_cmd(&mut *window, &[opcodes::CHIP_ERASE]);

        // Poll with chip select held; the device streams its status
        window.cs_enable();
        window.write8(opcodes::RDSR);
        while window.read8() & opcodes::STATUS_BUSY_MASK != 0 {}
        window.cs_disable();

        true
    }

    /// Erase every present flash device, skipping RAM and absent
    /// controllers
    pub fn erase_chip(&mut self) {
        for id in ControllerId::ALL {
            let _ = self.erase_chip_by_id(id);
        }
    }
}
