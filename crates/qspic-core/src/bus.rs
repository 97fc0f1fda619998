//! QSPI controller register-transfer contract
//!
//! The driver core never touches hardware registers directly; every
//! register-level operation goes through [`QspiBus`], implemented once
//! per physical controller instance. The manual transfer primitives
//! (`cs_*`, `write*`, `read8`) are only valid inside a manual-mode
//! window with chip select asserted; the instruction-table setters
//! program behavior that takes effect while the controller serves
//! memory-mapped accesses in auto mode.

/// Wire framing of a bus phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    /// One data line (classic SPI)
    Single,
    /// Two data lines
    Dual,
    /// Four data lines
    Quad,
}

/// Controller access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Firmware issues individual transfers (memory is unreadable)
    Manual,
    /// Hardware serves memory-mapped reads autonomously
    Auto,
}

/// Device address width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrSize {
    /// 24-bit addressing (devices up to 128 Mbit)
    Addr24,
    /// 32-bit addressing
    Addr32,
}

/// Length of the continuous-read break sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakSize {
    /// Single 0xFF byte
    One,
    /// Two 0xFF bytes (required by all 32-bit-address devices)
    Two,
}

/// Controller clock divider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClkDiv {
    /// Divide by 1
    Div1,
    /// Divide by 2
    Div2,
    /// Divide by 4
    Div4,
    /// Divide by 8
    Div8,
}

impl ClkDiv {
    /// Division ratio as an integer
    pub const fn ratio(self) -> u32 {
        match self {
            ClkDiv::Div1 => 1,
            ClkDiv::Div2 => 2,
            ClkDiv::Div4 => 4,
            ClkDiv::Div8 => 8,
        }
    }
}

/// Wrapping burst length implemented by a RAM device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapLength {
    /// No wrapping burst support
    None,
    /// 4-byte wrapping burst
    Wrap4,
    /// 8-byte wrapping burst
    Wrap8,
    /// 16-byte wrapping burst
    Wrap16,
    /// 32-byte wrapping burst
    Wrap32,
    /// 64-byte wrapping burst
    Wrap64,
}

/// State of the controller's autonomous erase engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseStatus {
    /// No erase in progress
    Idle,
    /// Erase requested but not yet started
    Pending,
    /// Erase running in the device
    Running,
    /// Erase suspended to serve a read
    Suspended,
    /// Erase finishing up
    Finishing,
}

/// Auto-mode read instruction slot
#[derive(Debug, Clone, Copy)]
pub struct ReadInstruction {
    /// Read opcode
    pub opcode: u8,
    /// Send the opcode only on the first access (continuous read)
    pub send_once: bool,
    /// Dummy bytes between address and data (0..=4)
    pub dummy_bytes: u8,
    /// Framing of the instruction phase
    pub inst_phase: BusMode,
    /// Framing of the address phase
    pub addr_phase: BusMode,
    /// Framing of the dummy phase
    pub dummy_phase: BusMode,
    /// Framing of the data phase
    pub data_phase: BusMode,
}

/// Auto-mode busy-status read instruction slot
#[derive(Debug, Clone, Copy)]
pub struct StatusInstruction {
    /// Status read opcode
    pub opcode: u8,
    /// Framing of the instruction phase
    pub inst_phase: BusMode,
    /// Framing of the receive phase
    pub data_phase: BusMode,
    /// Bit position of the busy flag in the status byte (0..=7)
    pub busy_pos: u8,
    /// Level of the busy bit that means "busy"
    pub busy_high: bool,
    /// Minimum controller clocks between an erase-class instruction and
    /// the first status read (0 = immediately)
    pub read_delay: u8,
}

/// Auto-mode erase instruction slot
#[derive(Debug, Clone, Copy)]
pub struct EraseInstruction {
    /// Erase opcode
    pub opcode: u8,
    /// Framing of the instruction phase
    pub inst_phase: BusMode,
    /// Framing of the address phase
    pub addr_phase: BusMode,
    /// Bus-idle clocks required before the controller may start an
    /// erase or erase-resume on its own
    pub quiet_cycles: u8,
}

/// Auto-mode write-enable instruction slot
#[derive(Debug, Clone, Copy)]
pub struct WriteEnableInstruction {
    /// Write-enable opcode
    pub opcode: u8,
    /// Framing of the instruction phase
    pub inst_phase: BusMode,
}

/// Auto-mode erase suspend/resume instruction pair
#[derive(Debug, Clone, Copy)]
pub struct SuspendResumeInstruction {
    /// Erase-suspend opcode
    pub suspend_opcode: u8,
    /// Framing of the suspend instruction
    pub suspend_phase: BusMode,
    /// Erase-resume opcode
    pub resume_opcode: u8,
    /// Framing of the resume instruction
    pub resume_phase: BusMode,
    /// Minimum controller clocks between suspend/resume and the next
    /// status read
    pub min_delay: u8,
}

/// Auto-mode write instruction slot (RAM devices only)
#[derive(Debug, Clone, Copy)]
pub struct WriteInstruction {
    /// Write opcode
    pub opcode: u8,
    /// Framing of the instruction phase
    pub inst_phase: BusMode,
    /// Framing of the address phase
    pub addr_phase: BusMode,
    /// Framing of the data phase
    pub data_phase: BusMode,
}

/// Continuous-read break sequence sent by the controller before
/// auto-mode instructions when the device holds the read stream open
#[derive(Debug, Clone, Copy)]
pub struct BreakSequence {
    /// Sequence value, most significant byte first on the wire
    pub value: u16,
    /// Framing of the sequence
    pub phase: BusMode,
    /// One or two bytes
    pub size: BreakSize,
}

/// Snapshot of the nine controller configuration registers
///
/// Captured after every successful (re)initialization and written back
/// verbatim on power-up. The field set is a stable contract with the
/// hardware layer; changing it invalidates every saved snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegSnapshot {
    /// Control / mode register
    pub ctrl_mode: u32,
    /// Auto-mode read (burst) command register, low half
    pub burst_cmd_a: u32,
    /// Auto-mode read (burst) command register, high half
    pub burst_cmd_b: u32,
    /// Auto-mode erase command register, low half
    pub erase_cmd_a: u32,
    /// Auto-mode erase command register, high half
    pub erase_cmd_b: u32,
    /// Auto-mode status read command register
    pub status_cmd: u32,
    /// General purpose / pad control register
    pub gp: u32,
    /// Auto-mode write command register
    pub auto_write_cmd: u32,
    /// Wrapping burst length register
    pub burst_len: u32,
}

/// Register-transfer contract of one physical QSPI controller
///
/// Implementors wrap the memory-mapped register block of a single
/// controller instance; this is the one place direct register access is
/// irreducible and stays out of this crate. All methods are infallible:
/// register writes cannot fail, and polling primitives report state
/// rather than errors.
pub trait QspiBus {
    /// One-time base configuration: SPI mode 0 (idle-low clock),
    /// positive sampling edge, and the given address size
    fn init(&mut self, addr_size: AddrSize);

    /// Assert chip select (manual mode only)
    fn cs_enable(&mut self);
    /// Deassert chip select (manual mode only)
    fn cs_disable(&mut self);

    /// Transfer one byte (manual mode, chip select asserted)
    fn write8(&mut self, value: u8);
    /// Transfer two bytes, least significant first
    fn write16(&mut self, value: u16);
    /// Transfer four bytes, least significant first
    fn write32(&mut self, value: u32);
    /// Read one byte (manual mode, chip select asserted)
    fn read8(&mut self) -> u8;

    /// Select the wire framing used for manual transfers
    fn set_bus_mode(&mut self, mode: BusMode);
    /// Switch between manual and auto access mode, effective immediately
    fn set_access_mode(&mut self, mode: AccessMode);

    /// Program the auto-mode read instruction
    fn set_read_instruction(&mut self, instr: &ReadInstruction);
    /// Program the auto-mode busy-status read instruction
    fn set_status_instruction(&mut self, instr: &StatusInstruction);
    /// Program the auto-mode erase instruction
    fn set_erase_instruction(&mut self, instr: &EraseInstruction);
    /// Program the auto-mode write-enable instruction
    fn set_write_enable_instruction(&mut self, instr: &WriteEnableInstruction);
    /// Program the auto-mode erase suspend/resume pair
    fn set_suspend_resume_instruction(&mut self, instr: &SuspendResumeInstruction);
    /// Program the auto-mode write instruction (RAM devices)
    fn set_write_instruction(&mut self, instr: &WriteInstruction);
    /// Disable the auto-mode write instruction (flash devices)
    fn clear_write_instruction(&mut self);
    /// Program the continuous-read break sequence
    fn set_break_sequence(&mut self, seq: &BreakSequence);
    /// Program the continuous-read "stay in this mode" extra byte
    fn set_extra_byte(&mut self, value: u8, phase: BusMode);
    /// Select the device address size
    fn set_address_size(&mut self, size: AddrSize);
    /// Program the wrapping burst length (RAM devices)
    fn set_burst_length(&mut self, len: WrapLength);
    /// Enable or disable the controller's SRAM access protocol
    fn set_sram_mode(&mut self, enable: bool);
    /// Limit how long chip select may stay asserted, in controller
    /// clock cycles; 0 disables the limit (RAM devices)
    fn set_cs_active_max(&mut self, cycles: u16);
    /// Minimum chip-select high time between reads, in clock cycles
    fn set_min_cs_high(&mut self, cycles: u8);
    /// Minimum chip-select high time after erase-class commands
    fn set_min_erase_cs_high(&mut self, cycles: u8);

    /// Kick the controller's autonomous erase of the sector containing
    /// `offset` (auto mode)
    fn trigger_erase(&mut self, offset: u32);
    /// State of the autonomous erase engine (auto mode)
    fn erase_status(&mut self) -> EraseStatus;

    /// Ungate the controller bus clock
    fn clock_enable(&mut self);
    /// Gate the controller bus clock
    fn clock_disable(&mut self);
    /// Program the controller clock divider
    fn set_divider(&mut self, div: ClkDiv);
    /// Current controller clock divider
    fn divider(&self) -> ClkDiv;
    /// Program the read sampling pipeline delay and enable the pipe
    fn set_read_pipe_delay(&mut self, cycles: u8);

    /// Whether the controller performs its own device initialization on
    /// wake-up, before the CPU resumes
    fn hw_init_enabled(&self) -> bool;

    /// Capture the nine configuration registers
    fn save_config(&self) -> RegSnapshot;
    /// Write back a previously captured register snapshot verbatim
    fn restore_config(&mut self, snapshot: &RegSnapshot);

    /// Copy from the memory-mapped window at `offset` (auto mode)
    fn read_mapped(&mut self, offset: u32, buf: &mut [u8]);

    /// Busy-wait for the given number of microseconds
    fn delay_us(&mut self, us: u32);
}
