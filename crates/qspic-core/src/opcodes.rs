//! Common serial flash command opcodes
//!
//! Commands are issued in single-wire framing unless a device is in QPI
//! mode; mode-specific opcodes are noted. Vendor-specific opcodes live
//! next to the device family that uses them (`device::families`).

/// Write Status Register 1
pub const WRSR: u8 = 0x01;
/// Write Disable
pub const WRDI: u8 = 0x04;
/// Read Status Register 1
pub const RDSR: u8 = 0x05;
/// Write Enable
pub const WREN: u8 = 0x06;
/// Sector Erase (4 KiB)
pub const SECTOR_ERASE: u8 = 0x20;
/// Quad Page Program (1-1-4)
pub const QUAD_PAGE_PROGRAM: u8 = 0x32;
/// Page Program as issued in QPI mode (4-4-4)
pub const QPI_PAGE_PROGRAM: u8 = 0x02;
/// Block Erase (32 KiB)
pub const BLOCK_ERASE: u8 = 0x52;
/// Chip Erase
pub const CHIP_ERASE: u8 = 0xC7;
/// Fast Read Quad I/O (1-4-4)
pub const FAST_READ_QUAD: u8 = 0xEB;
/// Read JEDEC identification
pub const READ_JEDEC_ID: u8 = 0x9F;
/// Continuous-read break byte; also exits QPI mode when sent quad-framed
pub const EXIT_CONTINUOUS_MODE: u8 = 0xFF;
/// Release from Power-Down
pub const RELEASE_POWER_DOWN: u8 = 0xAB;
/// Enter Power-Down
pub const ENTER_POWER_DOWN: u8 = 0xB9;

/// Fast Read Quad I/O with 4-byte address
pub const FAST_READ_QUAD_4B: u8 = 0xEC;
/// Sector Erase with 4-byte address
pub const SECTOR_ERASE_4B: u8 = 0x21;
/// Quad Page Program with 4-byte address
pub const QUAD_PAGE_PROGRAM_4B: u8 = 0x34;

/// Enter QPI mode (issued in single-wire framing)
pub const ENTER_QPI_MODE: u8 = 0x38;

/// Device reset, first half (reset enable)
pub const RESET_ENABLE: u8 = 0x66;
/// Device reset, second half
pub const RESET: u8 = 0x99;

/// PSRAM linear write
pub const RAM_WRITE: u8 = 0x02;
/// PSRAM quad write
pub const RAM_WRITE_QUAD: u8 = 0x38;

/// Busy / write-in-progress bit position in Status Register 1
pub const STATUS_BUSY_BIT: u8 = 0;
/// Busy / write-in-progress mask
pub const STATUS_BUSY_MASK: u8 = 1 << STATUS_BUSY_BIT;
/// Write-enable-latch bit position in Status Register 1
pub const STATUS_WEL_BIT: u8 = 1;
/// Write-enable-latch mask
pub const STATUS_WEL_MASK: u8 = 1 << STATUS_WEL_BIT;
