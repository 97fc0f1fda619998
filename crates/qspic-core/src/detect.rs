//! Device detection and controller initialization
//!
//! Runs once at boot. Each controller is clocked up and probed (or
//! statically bound), the hardware auto-mode instruction tables are
//! programmed from the bound device's parameters, and the resulting
//! register configuration is snapshotted for power-up restore.
//! Controllers that yield no usable device are marked absent and their
//! clock gated; every later request against their window is rejected by
//! address validation.

use log::{debug, info, warn};

use crate::addr::ControllerId;
use crate::bus::{
    AccessMode, AddrSize, BreakSequence, BreakSize, BusMode, ClkDiv, EraseInstruction, QspiBus,
    ReadInstruction, StatusInstruction, SuspendResumeInstruction, WriteEnableInstruction,
    WriteInstruction,
};
use crate::clock::{self, SysClk};
use crate::device::{registry, DeviceConfig, DeviceFlags, JedecId};
use crate::driver::{DetectPolicy, QspiDriver};
use crate::error::{Error, Result};
use crate::mode::{self, ManualWindow};
use crate::opcodes;
use crate::protocol;

/// Reset settle time used while the device is still unknown
const AUTODETECT_RESET_DELAY_US: u32 = 12_000;

/// Bus-idle clocks before the controller may start an autonomous erase
const ERASE_QUIET_CYCLES: u8 = 15;
/// Clocks between an erase-class instruction and the first status read
const STATUS_READ_DELAY: u8 = 20;
/// Clocks between suspend/resume and the next status read
const SUSPEND_RESUME_DELAY: u8 = 7;

/// Full device reset covering every state the device may have been left
/// in: power-down, continuous read (one- and two-byte break forms), and
/// QPI mode (the reset pair is repeated quad-framed)
fn reset_device<B: QspiBus>(bus: &mut B, quad_enabled: bool, settle_us: u32) {
    bus.set_bus_mode(BusMode::Single);
    protocol::write_cmd(bus, &[opcodes::RELEASE_POWER_DOWN]);

    protocol::reset_continuous_mode(bus, BreakSize::One);
    protocol::reset_continuous_mode(bus, BreakSize::Two);

    protocol::write_cmd(bus, &[opcodes::RESET_ENABLE]);
    protocol::write_cmd(bus, &[opcodes::RESET]);

    // A device already in QPI mode ignores single-framed commands, so
    // repeat the reset pair quad-framed; a device that just reset
    // ignores the repetition
    mode::set_quad(bus, quad_enabled);
    protocol::write_cmd(bus, &[opcodes::RESET_ENABLE]);
    protocol::write_cmd(bus, &[opcodes::RESET]);
    bus.set_bus_mode(BusMode::Single);

    bus.delay_us(settle_us);
}

/// Reset the device and read its JEDEC identification
///
/// `alt` selects the 4-byte command form some devices require. Returns
/// `None` when the first byte reads as the erased/absent pattern.
fn read_jedec<B: QspiBus>(
    bus: &mut B,
    quad_enabled: bool,
    alt: bool,
    settle_us: u32,
) -> Option<JedecId> {
    bus.set_access_mode(AccessMode::Manual);
    reset_device(bus, quad_enabled, settle_us);

    let mut buf = [0u8; 3];
    if alt {
        protocol::transact(bus, &[opcodes::READ_JEDEC_ID, 0, 0, 0], &mut buf);
    } else {
        protocol::transact(bus, &[opcodes::READ_JEDEC_ID], &mut buf);
    }

    bus.set_access_mode(AccessMode::Auto);

    let found = buf[0] != 0xFF && buf[0] != 0x00;
    found.then_some(JedecId {
        manufacturer: buf[0],
        device_type: buf[1],
        density: buf[2],
    })
}

/// Probe the controller and match the registry, retrying with the
/// alternate identification command before giving up
fn probe_registry<B: QspiBus>(bus: &mut B, quad_enabled: bool) -> Result<&'static DeviceConfig> {
    if let Some(id) = read_jedec(bus, quad_enabled, false, AUTODETECT_RESET_DELAY_US) {
        debug!(
            "jedec id {:02X} {:02X} {:02X}",
            id.manufacturer, id.device_type, id.density
        );
        if let Some(dev) = registry::lookup(id) {
            return Ok(dev);
        }
    }

    let id = read_jedec(bus, quad_enabled, true, AUTODETECT_RESET_DELAY_US)
        .ok_or(Error::NoJedecResponse)?;
    registry::lookup(id).ok_or_else(|| {
        warn!(
            "unmatched jedec id {:02X} {:02X} {:02X}",
            id.manufacturer, id.device_type, id.density
        );
        Error::UnknownJedecId
    })
}

/// JEDEC read with the standard command, falling back to the 4-byte form
fn read_jedec_with_fallback<B: QspiBus>(
    bus: &mut B,
    quad_enabled: bool,
    settle_us: u32,
) -> Option<JedecId> {
    read_jedec(bus, quad_enabled, false, settle_us)
        .or_else(|| read_jedec(bus, quad_enabled, true, settle_us))
}

/// Program the hardware auto-mode instruction tables from the bound
/// device's parameters
fn program_auto_instructions<B: QspiBus + ?Sized>(
    bus: &mut B,
    dev: &DeviceConfig,
    addr_size: AddrSize,
    sys_clk: SysClk,
) {
    let freq = sys_clk.freq_hz();
    let mode = if dev.flags.contains(DeviceFlags::QPI) {
        BusMode::Quad
    } else {
        BusMode::Single
    };

    let read_cs_idle = clock::ns_to_cycles(dev.read_cs_idle_ns, freq);
    let erase_cs_idle = clock::ns_to_cycles(dev.erase_cs_idle_ns, freq);

    bus.set_read_instruction(&ReadInstruction {
        opcode: dev.fast_read_opcode,
        send_once: dev.flags.contains(DeviceFlags::CONTINUOUS_READ),
        dummy_bytes: dev.ops.dummy_bytes(sys_clk),
        inst_phase: mode,
        addr_phase: BusMode::Quad,
        dummy_phase: BusMode::Quad,
        data_phase: BusMode::Quad,
    });

    bus.set_status_instruction(&StatusInstruction {
        opcode: dev.status_opcode,
        inst_phase: mode,
        data_phase: mode,
        busy_pos: dev.busy_pos,
        busy_high: dev.busy_high,
        read_delay: STATUS_READ_DELAY,
    });

    bus.set_erase_instruction(&EraseInstruction {
        opcode: dev.erase_opcode,
        inst_phase: mode,
        addr_phase: mode,
        quiet_cycles: ERASE_QUIET_CYCLES,
    });

    bus.set_write_enable_instruction(&WriteEnableInstruction {
        opcode: opcodes::WREN,
        inst_phase: mode,
    });

    bus.set_suspend_resume_instruction(&SuspendResumeInstruction {
        suspend_opcode: dev.erase_suspend_opcode,
        suspend_phase: mode,
        resume_opcode: dev.erase_resume_opcode,
        resume_phase: mode,
        min_delay: SUSPEND_RESUME_DELAY,
    });

    if dev.is_ram() {
        // RAM is written by the controller itself in auto mode
        bus.set_write_instruction(&WriteInstruction {
            opcode: dev.page_program_opcode,
            inst_phase: mode,
            addr_phase: BusMode::Quad,
            data_phase: BusMode::Quad,
        });
        bus.set_sram_mode(true);
        if dev.cs_active_max_us != 0 {
            let cycles =
                clock::us_to_cs_cycles(dev.cs_active_max_us, freq, bus.divider());
            bus.set_cs_active_max(cycles);
        }
        bus.set_burst_length(dev.burst_len);
    } else {
        // Flash is written in manual mode; make sure a stale write
        // instruction can never fire, and arm the break sequence the
        // controller sends when interrupting a continuous read
        bus.clear_write_instruction();
        bus.set_break_sequence(&BreakSequence {
            value: 0xFFFF,
            phase: BusMode::Single,
            size: dev.break_size,
        });
    }

    bus.set_extra_byte(dev.extra_byte, BusMode::Quad);
    bus.set_address_size(addr_size);

    bus.set_min_cs_high(read_cs_idle);
    bus.set_min_erase_cs_high(erase_cs_idle);
}

impl<B: QspiBus> QspiDriver<B> {
    /// Probe and initialize both controllers
    ///
    /// Detection failures are not errors: the affected controller is
    /// marked absent, its clock gated, and address validation rejects
    /// its window from then on.
    ///
    /// RAM devices are only supported on the second controller; binding
    /// one to the first is a configuration bug and asserts.
    pub fn init(&mut self, sys_clk: SysClk) {
        self.sys_clk = sys_clk;
        let cfg = self.cfg;

        for id in ControllerId::ALL {
            let slot = &mut self.ctrl[id.index()];
            slot.device = None;

            let policy = cfg.detect[id.index()];
            if matches!(policy, DetectPolicy::Unused) {
                continue;
            }

            slot.bus.clock_enable();
            slot.bus.set_access_mode(AccessMode::Manual);
            slot.bus.cs_enable();
            slot.bus.cs_disable();
            slot.bus.init(AddrSize::Addr24);
            slot.bus.set_divider(ClkDiv::Div1);
            slot.bus.set_read_pipe_delay(clock::read_pipe_delay(sys_clk));
            slot.bus.set_access_mode(AccessMode::Auto);

            let bound = match policy {
                DetectPolicy::Unused => unreachable!(),
                DetectPolicy::Autodetect => probe_registry(&mut slot.bus, cfg.quad_enabled),
                DetectPolicy::Static { config, verify } => {
                    if verify {
                        match read_jedec_with_fallback(
                            &mut slot.bus,
                            cfg.quad_enabled,
                            config.reset_delay_us,
                        ) {
                            Some(jedec) if config.matches(jedec) => Ok(config),
                            Some(_) => Err(Error::JedecIdMismatch),
                            None => Err(Error::NoJedecResponse),
                        }
                    } else {
                        Ok(config)
                    }
                }
            };

            let dev = match bound {
                Ok(dev) => dev,
                Err(err) => {
                    info!("QSPIC{}: {}", id.index() + 1, err);
                    slot.bus.clock_disable();
                    continue;
                }
            };

            // Only the second controller supports RAM devices
            assert!(id != ControllerId::Qspic1 || !dev.is_ram());

            let addr_size = if cfg.force_24bit {
                AddrSize::Addr24
            } else {
                dev.address_size
            };

            {
                let mut window = ManualWindow::open(&mut slot.bus, dev, cfg.quad_enabled);
                dev.ops.initialize(&mut *window);
                program_auto_instructions(&mut *window, dev, addr_size, sys_clk);
            }

            slot.saved = slot.bus.save_config();
            slot.device = Some(dev);

            info!(
                "QSPIC{}: bound {:02X} {:02X} {:02X}, {} KiB {}",
                id.index() + 1,
                dev.manufacturer_id,
                dev.device_type,
                dev.density,
                dev.size_bytes() / 1024,
                if dev.is_ram() { "RAM" } else { "flash" }
            );
        }
    }
}
