//! Driver context and public entry points
//!
//! A [`QspiDriver`] owns both controllers' bus instances and runtime
//! state. Nothing lives in statics: the embedder creates the context
//! once at boot, calls [`QspiDriver::init`], and keeps the value in
//! memory that survives low-power states so the saved register
//! snapshots are available on wake-up.
//!
//! The driver assumes a single flow of control per controller; callers
//! running from more than one task must serialize access externally.

use crate::addr::{self, ControllerId};
use crate::bus::{AddrSize, QspiBus, RegSnapshot};
use crate::clock::SysClk;
use crate::device::{DeviceConfig, JedecId};

/// How a controller's device binding is established at init
#[derive(Debug, Clone, Copy)]
pub enum DetectPolicy {
    /// Controller is not populated; it is marked absent without any bus
    /// activity
    Unused,
    /// Probe the JEDEC id and match it against the compiled-in registry
    Autodetect,
    /// Bind a fixed device description
    Static {
        /// The device description to bind
        config: &'static DeviceConfig,
        /// Cross-check the JEDEC id anyway and force the controller
        /// absent on mismatch
        verify: bool,
    },
}

/// How sector erases are carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErasePolicy {
    /// Use the controller's autonomous erase engine; reads during the
    /// erase are served via suspend/resume
    Auto,
    /// Issue the erase opcode manually inside a manual-mode window
    Manual,
}

/// What happens to flash devices across system power transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerPolicy {
    /// Devices stay powered; power transitions only gate clocks
    Active,
    /// Devices are put into deep power-down and released on wake-up
    PowerDown,
    /// Device power is removed entirely; full re-initialization runs on
    /// wake-up
    PowerOff,
}

/// Driver-wide configuration, resolved once at construction
///
/// Both erase strategies and both detection paths stay compiled in;
/// the configuration only selects between them.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    /// Per-controller detection policy
    pub detect: [DetectPolicy; 2],
    /// Erase strategy
    pub erase_policy: ErasePolicy,
    /// Use quad framing where the device supports it
    pub quad_enabled: bool,
    /// Force 24-bit addressing on 32-bit-capable devices
    pub force_24bit: bool,
    /// Upper bound on bytes written per call, bounding the time spent
    /// with interrupts masked
    pub max_write_size: usize,
    /// Power transition policy
    pub power_policy: PowerPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            detect: [DetectPolicy::Autodetect, DetectPolicy::Autodetect],
            erase_policy: ErasePolicy::Auto,
            quad_enabled: true,
            force_24bit: false,
            max_write_size: 128,
            power_policy: PowerPolicy::Active,
        }
    }
}

/// Per-controller runtime state
pub(crate) struct Controller<B> {
    pub(crate) bus: B,
    /// Bound device; `None` marks the controller absent
    pub(crate) device: Option<&'static DeviceConfig>,
    /// Register snapshot restored verbatim on power-up
    pub(crate) saved: RegSnapshot,
}

/// Driver context owning both physical controllers
pub struct QspiDriver<B: QspiBus> {
    pub(crate) ctrl: [Controller<B>; 2],
    pub(crate) cfg: DriverConfig,
    pub(crate) sys_clk: SysClk,
}

impl<B: QspiBus> QspiDriver<B> {
    /// Create the driver context; no bus activity until [`init`]
    ///
    /// [`init`]: QspiDriver::init
    pub fn new(bus1: B, bus2: B, cfg: DriverConfig) -> Self {
        QspiDriver {
            ctrl: [
                Controller {
                    bus: bus1,
                    device: None,
                    saved: RegSnapshot::default(),
                },
                Controller {
                    bus: bus2,
                    device: None,
                    saved: RegSnapshot::default(),
                },
            ],
            cfg,
            sys_clk: SysClk::Xtal32M,
        }
    }

    pub(crate) fn slot(&self, id: ControllerId) -> &Controller<B> {
        &self.ctrl[id.index()]
    }

    pub(crate) fn slot_mut(&mut self, id: ControllerId) -> &mut Controller<B> {
        &mut self.ctrl[id.index()]
    }

    /// Address size actually used on the bus, honoring the 24-bit
    /// override for 32-bit-capable devices
    pub(crate) fn effective_addr_size(&self, dev: &DeviceConfig) -> AddrSize {
        if self.cfg.force_24bit {
            AddrSize::Addr24
        } else {
            dev.address_size
        }
    }

    /// Shared access to a controller's bus, for inspection
    pub fn bus(&self, id: ControllerId) -> &B {
        &self.slot(id).bus
    }

    /// System clock the controller timings are currently scaled to
    pub fn sys_clk(&self) -> SysClk {
        self.sys_clk
    }

    /// Whether a device is bound to this controller
    pub fn is_present(&self, id: ControllerId) -> bool {
        self.slot(id).device.is_some()
    }

    /// Whether the bound device is RAM; false for absent controllers
    pub fn is_ram_device(&self, id: ControllerId) -> bool {
        self.slot(id).device.is_some_and(|dev| dev.is_ram())
    }

    /// Capacity of the bound device in bytes
    pub fn device_size(&self, id: ControllerId) -> Option<u32> {
        self.slot(id).device.map(|dev| dev.size_bytes())
    }

    /// Identification triple of the bound device
    pub fn jedec_config(&self, id: ControllerId) -> Option<JedecId> {
        self.slot(id).device.map(|dev| JedecId {
            manufacturer: dev.manufacturer_id,
            device_type: dev.device_type,
            density: dev.density,
        })
    }

    /// Whether `a` falls inside a present controller's window and
    /// within its bound device's capacity
    pub fn is_valid_addr(&self, a: u32) -> bool {
        let Some(id) = addr::covering_controller(a) else {
            return false;
        };
        let Some(dev) = self.slot(id).device else {
            return false;
        };
        // Device capacities are declared in bits
        addr::zero_based(a) as u64 * 8 < dev.size_bits as u64
    }

    /// Map a flat address range onto its controller and zero-based
    /// device offset
    ///
    /// Panics when `size` is zero or the range is not valid; callers
    /// are expected to have validated user-supplied addresses.
    pub(crate) fn resolve(&self, a: u32, size: u32) -> (ControllerId, u32) {
        assert!(size > 0);
        assert!(
            self.is_valid_addr(a + size - 1),
            "address range 0x{:08X}+{} not mapped",
            a,
            size
        );
        let id = addr::covering_controller(a).unwrap();
        (id, addr::zero_based(a))
    }

    /// Read through the memory-mapped auto-mode window
    ///
    /// The whole range must be valid. Returns the number of bytes read,
    /// always `buf.len()`.
    pub fn read(&mut self, a: u32, buf: &mut [u8]) -> usize {
        let (id, offset) = self.resolve(a, buf.len() as u32);
        self.slot_mut(id).bus.read_mapped(offset, buf);
        buf.len()
    }
}
