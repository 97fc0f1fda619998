//! Auto/manual mode transitions
//!
//! Code executes from the memory behind these controllers, so the
//! driver may only run with a controller out of auto mode while
//! interrupts are masked, and every entry into manual mode must be
//! paired with an exit before control escapes. [`ManualWindow`] makes
//! that pairing mechanical: construction masks interrupts and enters
//! manual mode, and drop restores both on every exit path.

use core::ops::{Deref, DerefMut};

use critical_section::RestoreState;

use crate::bus::{AccessMode, BusMode, QspiBus};
use crate::device::{DeviceConfig, DeviceFlags};
use crate::protocol;

/// Switch manual framing to quad, when quad operation is configured in
pub(crate) fn set_quad<B: QspiBus + ?Sized>(bus: &mut B, quad_enabled: bool) {
    if quad_enabled {
        bus.set_bus_mode(BusMode::Quad);
    }
}

/// Leave auto mode and make the device ready for fresh instructions
///
/// Precondition: the caller has masked interrupts. Framing is forced to
/// single-wire, and devices holding a continuous-read stream open get
/// the break sequence so the next transfer starts an instruction.
pub(crate) fn enter_manual<B: QspiBus + ?Sized>(bus: &mut B, dev: &DeviceConfig) {
    bus.set_access_mode(AccessMode::Manual);
    bus.set_bus_mode(BusMode::Single);
    if dev.flags.contains(DeviceFlags::CONTINUOUS_READ) {
        protocol::reset_continuous_mode(bus, dev.break_size);
    }
}

/// Put a QPI-mode device back into QPI operation
pub(crate) fn enter_qpi<B: QspiBus + ?Sized>(bus: &mut B, dev: &DeviceConfig, quad_enabled: bool) {
    if dev.flags.contains(DeviceFlags::QPI) {
        bus.cs_enable();
        bus.write8(dev.enter_qpi_opcode);
        bus.cs_disable();
        set_quad(bus, quad_enabled);
    }
}

/// Restore auto mode and the steady-state framing
pub(crate) fn exit_manual<B: QspiBus + ?Sized>(bus: &mut B, dev: &DeviceConfig, quad_enabled: bool) {
    enter_qpi(bus, dev, quad_enabled);
    set_quad(bus, quad_enabled);
    bus.set_access_mode(AccessMode::Auto);
}

/// Scoped manual-mode window: interrupts masked, auto mode off
///
/// Dereferences to the bus so command sequences run through the window
/// itself, making it impossible to issue manual transfers outside one.
pub(crate) struct ManualWindow<'a, B: QspiBus> {
    bus: &'a mut B,
    dev: &'static DeviceConfig,
    quad_enabled: bool,
    restore: RestoreState,
}

impl<'a, B: QspiBus> ManualWindow<'a, B> {
    pub(crate) fn open(bus: &'a mut B, dev: &'static DeviceConfig, quad_enabled: bool) -> Self {
        // SAFETY: released exactly once, in Drop.
        let restore = unsafe { critical_section::acquire() };
        enter_manual(bus, dev);
        ManualWindow {
            bus,
            dev,
            quad_enabled,
            restore,
        }
    }
}

impl<B: QspiBus> Drop for ManualWindow<'_, B> {
    fn drop(&mut self) {
        exit_manual(self.bus, self.dev, self.quad_enabled);
        // SAFETY: acquired in open(), restoring the saved state.
        unsafe { critical_section::release(self.restore) };
    }
}

impl<B: QspiBus> Deref for ManualWindow<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.bus
    }
}

impl<B: QspiBus> DerefMut for ManualWindow<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.bus
    }
}

/// One bracketed check of whether the device can accept a command
pub(crate) fn is_writable<B: QspiBus>(
    bus: &mut B,
    dev: &'static DeviceConfig,
    quad_enabled: bool,
) -> bool {
    let mut window = ManualWindow::open(bus, dev, quad_enabled);
    !protocol::is_busy(&mut *window)
}

/// Block until the device can accept a command
///
/// Each probe is a full manual-mode window, so auto-mode reads (and the
/// code running from them) make progress between probes.
pub(crate) fn wait_writable<B: QspiBus>(bus: &mut B, dev: &'static DeviceConfig, quad_enabled: bool) {
    while !is_writable(bus, dev, quad_enabled) {}
}
