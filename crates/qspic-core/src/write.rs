//! Page program engine
//!
//! Flash pages are 256 bytes; a single call never crosses a page
//! boundary and is additionally clamped by the configured maximum
//! transfer size, which bounds how long interrupts stay masked. The
//! caller re-invokes with the remainder.

use crate::bus::{AddrSize, BusMode, QspiBus};
use crate::device::{DeviceConfig, DeviceFlags};
use crate::driver::QspiDriver;
use crate::mode::{self, ManualWindow};
use crate::protocol;

/// Flash page size; program operations wrap at this boundary
pub const PAGE_SIZE: usize = 256;

/// Clamp a program length to the page containing `offset` and to the
/// configured maximum transfer size
fn clamp_len(offset: u32, len: usize, max_write: usize) -> usize {
    let len = len.min(max_write);
    len.min(PAGE_SIZE - (offset as usize & (PAGE_SIZE - 1)))
}

/// Send the program opcode and address with the framing the bound
/// device expects, leaving the bus in the data-phase framing
fn send_program_header<B: QspiBus + ?Sized>(
    bus: &mut B,
    dev: &DeviceConfig,
    addr_size: AddrSize,
    offset: u32,
    quad_enabled: bool,
) {
    let quad_addr = dev.flags.contains(DeviceFlags::QUAD_PROGRAM_ADDR);

    if dev.flags.contains(DeviceFlags::QPI) {
        // QPI devices take opcode, address and data on all four wires
        if addr_size == AddrSize::Addr32 {
            bus.write8(dev.page_qpi_program_opcode);
            bus.write32(offset.swap_bytes());
        } else {
            bus.write32(dev.page_qpi_program_opcode as u32 | (offset.swap_bytes() & 0xFFFF_FF00));
        }
    } else if addr_size == AddrSize::Addr32 {
        bus.write8(dev.page_program_opcode);
        if quad_addr {
            mode::set_quad(bus, quad_enabled);
        }
        bus.write32(offset.swap_bytes());
        if !quad_addr {
            mode::set_quad(bus, quad_enabled);
        }
    } else if quad_addr {
        bus.write8(dev.page_program_opcode);
        mode::set_quad(bus, quad_enabled);
        bus.write8((offset >> 16) as u8);
        bus.write16((offset as u16).swap_bytes());
    } else {
        bus.write32(dev.page_program_opcode as u32 | (offset.swap_bytes() & 0xFFFF_FF00));
        mode::set_quad(bus, quad_enabled);
    }
}

/// Program up to one page inside an open manual-mode window
///
/// Returns the number of bytes accepted by the device.
fn program_page<B: QspiBus>(
    bus: &mut B,
    dev: &DeviceConfig,
    addr_size: AddrSize,
    offset: u32,
    data: &[u8],
    max_write: usize,
    quad_enabled: bool,
) -> usize {
    protocol::write_enable(bus);

    let len = clamp_len(offset, data.len(), max_write);
    let data = &data[..len];

    bus.cs_enable();
    send_program_header(bus, dev, addr_size, offset, quad_enabled);

    // Word-wise fast path for the bulk, byte-wise tail
    let mut chunks = data.chunks_exact(4);
    for word in &mut chunks {
        bus.write32(u32::from_le_bytes(word.try_into().unwrap()));
    }
    for &byte in chunks.remainder() {
        bus.write8(byte);
    }

    bus.cs_disable();

    if !dev.flags.contains(DeviceFlags::QPI) && quad_enabled {
        bus.set_bus_mode(BusMode::Single);
    }

    len
}

impl<B: QspiBus> QspiDriver<B> {
    /// Program `data` at flat address `a`, without crossing the page
    /// boundary
    ///
    /// Blocks until the device is idle, programs as much of `data` as
    /// fits in the page containing `a` (at most the configured maximum
    /// write size), waits for completion and returns the number of
    /// bytes written; the caller issues further calls for the rest.
    ///
    /// Programming can only clear bits; erase first to set any.
    ///
    /// The whole range must be address-valid, `data` must not be empty,
    /// and `data` must not alias this controller's memory-mapped window
    /// (unchecked: the window is unreadable during the operation).
    pub fn write_page(&mut self, a: u32, data: &[u8]) -> usize {
        let (id, offset) = self.resolve(a, data.len() as u32);
        let quad_enabled = self.cfg.quad_enabled;
        let max_write = self.cfg.max_write_size;
        let dev = self.slot(id).device.unwrap();
        let addr_size = self.effective_addr_size(dev);

        let bus = &mut self.slot_mut(id).bus;
        mode::wait_writable(bus, dev, quad_enabled);

        let mut window = ManualWindow::open(bus, dev, quad_enabled);
        let written = program_page(
            &mut *window,
            dev,
            addr_size,
            offset,
            data,
            max_write,
            quad_enabled,
        );
        while protocol::program_in_progress(&mut *window, dev) {}

        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_stops_at_page_boundary() {
        assert_eq!(clamp_len(0x1F0, 32, 128), 16);
        assert_eq!(clamp_len(0x200, 16, 128), 16);
        assert_eq!(clamp_len(0x00, 300, 512), 256);
    }

    #[test]
    fn test_clamp_respects_max_write_size() {
        assert_eq!(clamp_len(0x00, 256, 128), 128);
        assert_eq!(clamp_len(0xFF, 128, 128), 1);
    }
}
