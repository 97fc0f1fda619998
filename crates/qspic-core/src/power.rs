//! Power transitions and system clock reconfiguration
//!
//! Both sequences run with interrupts masked end to end: the devices
//! pass through manual mode, and code may be executing from them.
//! Neither may interleave with any other operation on the same
//! controller; the embedder's power manager is the only expected
//! caller.

use log::debug;

use crate::addr::ControllerId;
use crate::bus::{AccessMode, BusMode, QspiBus};
use crate::clock::{self, SysClk};
use crate::driver::{DetectPolicy, PowerPolicy, QspiDriver};
use crate::mode;
use crate::opcodes;
use crate::protocol;

impl<B: QspiBus> QspiDriver<B> {
    /// Prepare every device for system power-down and gate the
    /// controller clocks
    ///
    /// Flash devices are taken out of continuous read (some cannot
    /// enter standby while it is active) and, under the power-down
    /// policy, sent to deep power-down. RAM devices keep their state
    /// and are left alone.
    pub fn power_down(&mut self) {
        let cfg = self.cfg;

        critical_section::with(|_| {
            for id in ControllerId::ALL {
                let slot = &mut self.ctrl[id.index()];
                let Some(dev) = slot.device else {
                    continue;
                };
                if dev.is_ram() {
                    continue;
                }

                mode::enter_manual(&mut slot.bus, dev);
                if cfg.power_policy == PowerPolicy::PowerDown {
                    protocol::write_cmd(&mut slot.bus, &[opcodes::ENTER_POWER_DOWN]);
                }
                mode::exit_manual(&mut slot.bus, dev, cfg.quad_enabled);
            }

            for id in ControllerId::ALL {
                if !matches!(cfg.detect[id.index()], DetectPolicy::Unused) {
                    self.ctrl[id.index()].bus.clock_disable();
                }
            }
        });

        debug!("controllers powered down");
    }

    /// Restore every present controller after system power-up
    ///
    /// The register snapshot taken at initialization is written back
    /// verbatim, then the device itself is brought back: RAM devices
    /// (and flash that was never powered down) just leave manual mode;
    /// powered-down flash gets the release sequence and its settle
    /// delays; powered-off flash is fully re-initialized unless the
    /// controller hardware already did so before the CPU resumed.
    pub fn power_up(&mut self) {
        let cfg = self.cfg;

        critical_section::with(|_| {
            for id in ControllerId::ALL {
                let slot = &mut self.ctrl[id.index()];
                let Some(dev) = slot.device else {
                    continue;
                };

                slot.bus.clock_enable();
                slot.bus.restore_config(&slot.saved);

                if dev.is_ram() {
                    // RAM kept its state; re-enter QPI and go back to
                    // auto without a break sequence
                    slot.bus.set_access_mode(AccessMode::Manual);
                    slot.bus.set_bus_mode(BusMode::Single);
                    mode::exit_manual(&mut slot.bus, dev, cfg.quad_enabled);
                } else if cfg.power_policy == PowerPolicy::PowerDown {
                    slot.bus.delay_us(dev.power_down_delay_us as u32);
                    // The device is asleep and would ignore a break
                    // sequence; release it with the bare command
                    slot.bus.set_access_mode(AccessMode::Manual);
                    slot.bus.set_bus_mode(BusMode::Single);
                    protocol::write_cmd(&mut slot.bus, &[opcodes::RELEASE_POWER_DOWN]);
                    mode::exit_manual(&mut slot.bus, dev, cfg.quad_enabled);
                    slot.bus.delay_us(dev.release_power_down_delay_us as u32);
                } else if !slot.bus.hw_init_enabled() {
                    if cfg.power_policy == PowerPolicy::PowerOff {
                        slot.bus.delay_us(dev.power_up_delay_us as u32);
                        mode::enter_manual(&mut slot.bus, dev);
                        dev.ops.initialize(&mut slot.bus);
                        mode::exit_manual(&mut slot.bus, dev, cfg.quad_enabled);
                    } else {
                        mode::exit_manual(&mut slot.bus, dev, cfg.quad_enabled);
                    }
                }
            }
        });

        debug!("controllers powered up");
    }

    /// Reapply every clock-derived setting after a system clock change
    ///
    /// Must not interleave with any other operation on the driver.
    pub fn sys_clock_cfg(&mut self, clk: SysClk) {
        self.sys_clk = clk;
        let freq = clk.freq_hz();

        for id in ControllerId::ALL {
            let slot = &mut self.ctrl[id.index()];
            let Some(dev) = slot.device else {
                continue;
            };

            slot.bus.set_divider(clock::divider_for(clk));

            // The device hook may pass through manual mode, during
            // which the memory is unreadable
            critical_section::with(|_| {
                dev.ops.sys_clk_cfg(&mut slot.bus, clk);
            });

            slot.bus.set_read_pipe_delay(clock::read_pipe_delay(clk));
            slot.bus
                .set_min_cs_high(clock::ns_to_cycles(dev.read_cs_idle_ns, freq));
            slot.bus
                .set_min_erase_cs_high(clock::ns_to_cycles(dev.erase_cs_idle_ns, freq));
        }
    }
}
