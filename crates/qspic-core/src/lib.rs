//! qspic-core - Dual-controller QSPI auto-mode memory driver
//!
//! This crate drives external QSPI flash and PSRAM devices behind a
//! memory-mapped controller that normally runs in hardware "auto" mode,
//! where code and data fetches need no firmware intervention. Firmware
//! that wants to program, erase or power-cycle the device must take the
//! controller through a short manual-mode window, during which the
//! memory is *not* readable - including by the CPU fetching its own
//! instructions. Every such window therefore runs with interrupts
//! masked and is strictly paired: whoever enters manual mode leaves it
//! again on every exit path.
//!
//! The crate is `no_std` and hardware-agnostic: all register access goes
//! through the [`bus::QspiBus`] trait, implemented once per physical
//! controller (and by `qspic-sim` for host-side tests).
//!
//! # Example
//!
//! ```ignore
//! use qspic_core::{clock::SysClk, driver::{DriverConfig, QspiDriver}};
//!
//! let mut drv = QspiDriver::new(bus1, bus2, DriverConfig::default());
//! drv.init(SysClk::Xtal32M);
//! if drv.is_present(ControllerId::Qspic1) {
//!     let written = drv.write_page(addr, &data);
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod addr;
pub mod bus;
pub mod clock;
pub mod device;
pub mod driver;
pub mod error;
pub mod opcodes;

mod detect;
mod erase;
mod mode;
mod power;
mod protocol;
mod write;

pub use addr::ControllerId;
pub use error::{Error, Result};
