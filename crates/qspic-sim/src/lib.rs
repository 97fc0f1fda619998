//! qspic-sim - In-memory QSPI controller and device emulation
//!
//! Implements [`QspiBus`] over a byte-array device model so the driver
//! can be exercised on the host, without hardware. The model covers
//! what the driver actually issues: JEDEC identification (standard and
//! 4-byte command forms), write enable, page program with AND
//! semantics, sector and chip erase, power-down/release, device reset,
//! QPI entry and the auto-mode instruction tables.
//!
//! Contract violations (transfers outside a manual window, mapped reads
//! in manual mode, transfers with the clock gated) panic, so driver
//! bugs surface as test failures rather than silent misbehavior.

use qspic_core::bus::{
    AccessMode, AddrSize, BreakSequence, BusMode, ClkDiv, EraseInstruction, EraseStatus, QspiBus,
    ReadInstruction, RegSnapshot, StatusInstruction, SuspendResumeInstruction,
    WriteEnableInstruction, WriteInstruction, WrapLength,
};

const STATUS_BUSY: u8 = 1 << 0;
const STATUS_WEL: u8 = 1 << 1;

const SECTOR_SIZE: usize = 4096;
const PAGE_SIZE: usize = 256;

/// What is wired to the emulated controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceKind {
    /// Nothing answers; reads float high
    Absent,
    /// NOR flash: erase to 0xFF, programming clears bits
    Flash,
    /// Pseudo-static RAM: plain overwriting stores, no erase
    Psram,
}

/// Emulated controller plus attached memory device
pub struct SimBus {
    kind: DeviceKind,
    jedec: [u8; 3],
    /// Answer only the 4-byte identification command form
    alt_jedec_only: bool,
    mem: Vec<u8>,

    // Device state
    status: u8,
    status2: u8,
    powered_down: bool,
    qpi: bool,
    addr4: bool,
    reset_armed: bool,
    /// Busy status reads to report after each program/erase
    busy_polls: u32,
    busy_left: u32,

    // Controller state
    cs: bool,
    access: AccessMode,
    bus_mode: BusMode,
    clock_on: bool,
    div: ClkDiv,
    regs: RegSnapshot,
    cs_active_max: u16,
    erase_polls_left: u32,

    // Current chip-select transaction
    tx: Vec<u8>,
    read_pos: usize,

    /// Manual transfer count, for asserting "no bus activity"
    pub transfers: u64,
    /// Accumulated delay time
    pub delays_us: u64,
}

impl SimBus {
    fn new(kind: DeviceKind, jedec: [u8; 3], size: usize) -> Self {
        let fill = if kind == DeviceKind::Flash { 0xFF } else { 0x00 };
        SimBus {
            kind,
            jedec,
            alt_jedec_only: false,
            mem: vec![fill; size],
            status: 0,
            status2: 0,
            powered_down: false,
            qpi: false,
            addr4: false,
            reset_armed: false,
            busy_polls: 0,
            busy_left: 0,
            cs: false,
            access: AccessMode::Manual,
            bus_mode: BusMode::Single,
            clock_on: false,
            div: ClkDiv::Div1,
            regs: RegSnapshot::default(),
            cs_active_max: 0,
            erase_polls_left: 0,
            tx: Vec::new(),
            read_pos: 0,
            transfers: 0,
            delays_us: 0,
        }
    }

    /// A NOR flash of the given size behind the controller
    pub fn flash(jedec: [u8; 3], size: usize) -> Self {
        Self::new(DeviceKind::Flash, jedec, size)
    }

    /// A pseudo-static RAM behind the controller
    pub fn psram(jedec: [u8; 3], size: usize) -> Self {
        Self::new(DeviceKind::Psram, jedec, size)
    }

    /// An unpopulated controller
    pub fn absent() -> Self {
        Self::new(DeviceKind::Absent, [0; 3], 0)
    }

    /// Make the device answer only the 4-byte identification command;
    /// the standard command reads back as erased
    pub fn with_alt_jedec_only(mut self) -> Self {
        self.alt_jedec_only = true;
        self
    }

    /// Report busy for `n` status reads after every program/erase, to
    /// exercise the polling loops
    pub fn with_busy_polls(mut self, n: u32) -> Self {
        self.busy_polls = n;
        self
    }

    /// Device memory contents
    pub fn mem(&self) -> &[u8] {
        &self.mem
    }

    /// Mutable device memory, for seeding test patterns
    pub fn mem_mut(&mut self) -> &mut [u8] {
        &mut self.mem
    }

    /// Current access mode
    pub fn access_mode(&self) -> AccessMode {
        self.access
    }

    /// Current manual-transfer framing
    pub fn bus_mode(&self) -> BusMode {
        self.bus_mode
    }

    /// Whether the controller clock is ungated
    pub fn clock_enabled(&self) -> bool {
        self.clock_on
    }

    /// Whether the device is in deep power-down
    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Whether the device is in QPI mode
    pub fn in_qpi(&self) -> bool {
        self.qpi
    }

    /// Programmed chip-select active limit, in cycles
    pub fn cs_active_max(&self) -> u16 {
        self.cs_active_max
    }

    fn push(&mut self, byte: u8) {
        assert!(self.clock_on, "transfer with controller clock gated");
        assert!(self.access == AccessMode::Manual, "transfer in auto mode");
        assert!(self.cs, "transfer without chip select");
        self.transfers += 1;
        self.tx.push(byte);
    }

    fn status_read(&mut self) -> u8 {
        let busy = if self.busy_left > 0 {
            self.busy_left -= 1;
            STATUS_BUSY
        } else {
            0
        };
        (self.status & !STATUS_BUSY) | busy
    }

    fn response_byte(&mut self, idx: usize) -> u8 {
        if self.kind == DeviceKind::Absent || self.powered_down || self.tx.is_empty() {
            return 0xFF;
        }
        match self.tx[0] {
            0x9F if self.alt_jedec_only && self.tx.len() == 1 => 0x00,
            0x9F => self.jedec[idx % 3],
            0x05 => self.status_read(),
            0x35 if self.kind == DeviceKind::Flash => self.status2,
            0x15 => self.addr4 as u8,
            0xAB => 0x15,
            _ => 0xFF,
        }
    }

    fn parse_addr(&self, bytes: &[u8]) -> usize {
        bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize)
    }

    fn program(&mut self, addr_len: usize, body: &[u8]) {
        if body.len() <= addr_len {
            return;
        }
        if self.kind == DeviceKind::Flash && self.status & STATUS_WEL == 0 {
            return;
        }
        let addr = self.parse_addr(&body[..addr_len]);
        let data = &body[addr_len..];
        for (i, &byte) in data.iter().enumerate() {
            // Programming wraps within the 256-byte page, like the part
            let a = (addr & !(PAGE_SIZE - 1)) | ((addr + i) & (PAGE_SIZE - 1));
            if a < self.mem.len() {
                if self.kind == DeviceKind::Flash {
                    self.mem[a] &= byte;
                } else {
                    self.mem[a] = byte;
                }
            }
        }
        self.status &= !STATUS_WEL;
        self.busy_left = self.busy_polls;
    }

    fn erase_sector_at(&mut self, addr: usize) {
        if self.status & STATUS_WEL == 0 {
            return;
        }
        self.wipe_sector(addr);
        self.status &= !STATUS_WEL;
        self.busy_left = self.busy_polls;
    }

    fn wipe_sector(&mut self, addr: usize) {
        let start = addr & !(SECTOR_SIZE - 1);
        let end = (start + SECTOR_SIZE).min(self.mem.len());
        if start < self.mem.len() {
            self.mem[start..end].fill(0xFF);
        }
    }

    fn exec(&mut self) {
        let tx = core::mem::take(&mut self.tx);
        if tx.is_empty() || self.kind == DeviceKind::Absent {
            return;
        }
        if self.powered_down {
            if tx[0] == 0xAB {
                self.powered_down = false;
            }
            return;
        }

        let op = tx[0];
        match op {
            0x06 => self.status |= STATUS_WEL,
            0x04 => self.status &= !STATUS_WEL,
            0xB9 => self.powered_down = true,
            0xAB => {}
            0x66 => self.reset_armed = true,
            0x99 if self.reset_armed => {
                self.qpi = false;
                self.addr4 = false;
                self.status = 0;
                self.busy_left = 0;
            }
            0xFF => self.qpi = false,
            0xB7 => self.addr4 = true,
            0x31 if tx.len() >= 2 => self.status2 = tx[1],
            0x35 if self.kind == DeviceKind::Psram && tx.len() == 1 => self.qpi = true,
            0x38 if tx.len() == 1 => self.qpi = true,
            0x02 | 0x32 | 0x33 | 0x38 => {
                let addr_len = if self.addr4 { 4 } else { 3 };
                self.program(addr_len, &tx[1..]);
            }
            0x34 => self.program(4, &tx[1..]),
            0x20 => {
                let addr_len = if self.addr4 { 4 } else { 3 };
                if tx.len() > addr_len {
                    let addr = self.parse_addr(&tx[1..1 + addr_len]);
                    self.erase_sector_at(addr);
                }
            }
            0x21 if tx.len() > 4 => {
                let addr = self.parse_addr(&tx[1..5]);
                self.erase_sector_at(addr);
            }
            0xC7 => {
                if self.status & STATUS_WEL != 0 {
                    self.mem.fill(0xFF);
                    self.status &= !STATUS_WEL;
                    self.busy_left = self.busy_polls;
                }
            }
            _ => {}
        }
        if op != 0x66 {
            self.reset_armed = false;
        }
    }

    fn mode_bits(mode: BusMode) -> u32 {
        match mode {
            BusMode::Single => 0,
            BusMode::Dual => 1,
            BusMode::Quad => 2,
        }
    }
}

impl QspiBus for SimBus {
    fn init(&mut self, addr_size: AddrSize) {
        self.regs.ctrl_mode =
            (self.regs.ctrl_mode & !(1 << 2)) | (((addr_size == AddrSize::Addr32) as u32) << 2);
    }

    fn cs_enable(&mut self) {
        assert!(self.access == AccessMode::Manual, "chip select in auto mode");
        self.cs = true;
        self.tx.clear();
        self.read_pos = 0;
    }

    fn cs_disable(&mut self) {
        self.cs = false;
        self.exec();
    }

    fn write8(&mut self, value: u8) {
        self.push(value);
    }

    fn write16(&mut self, value: u16) {
        for byte in value.to_le_bytes() {
            self.push(byte);
        }
    }

    fn write32(&mut self, value: u32) {
        for byte in value.to_le_bytes() {
            self.push(byte);
        }
    }

    fn read8(&mut self) -> u8 {
        assert!(self.clock_on, "read with controller clock gated");
        assert!(self.cs, "read without chip select");
        self.transfers += 1;
        let byte = self.response_byte(self.read_pos);
        self.read_pos += 1;
        byte
    }

    fn set_bus_mode(&mut self, mode: BusMode) {
        self.bus_mode = mode;
        self.regs.ctrl_mode = (self.regs.ctrl_mode & !(3 << 3)) | (Self::mode_bits(mode) << 3);
    }

    fn set_access_mode(&mut self, mode: AccessMode) {
        self.access = mode;
        self.regs.ctrl_mode =
            (self.regs.ctrl_mode & !1) | ((mode == AccessMode::Auto) as u32);
    }

    fn set_read_instruction(&mut self, instr: &ReadInstruction) {
        self.regs.burst_cmd_a = instr.opcode as u32
            | (Self::mode_bits(instr.inst_phase) << 8)
            | (Self::mode_bits(instr.addr_phase) << 10)
            | (Self::mode_bits(instr.dummy_phase) << 12)
            | (Self::mode_bits(instr.data_phase) << 14)
            | ((instr.dummy_bytes as u32) << 16)
            | ((instr.send_once as u32) << 20);
    }

    fn set_status_instruction(&mut self, instr: &StatusInstruction) {
        self.regs.status_cmd = instr.opcode as u32
            | ((instr.busy_pos as u32) << 8)
            | ((instr.busy_high as u32) << 11)
            | (Self::mode_bits(instr.inst_phase) << 12)
            | (Self::mode_bits(instr.data_phase) << 14)
            | ((instr.read_delay as u32) << 16);
    }

    fn set_erase_instruction(&mut self, instr: &EraseInstruction) {
        self.regs.erase_cmd_a = instr.opcode as u32
            | (Self::mode_bits(instr.inst_phase) << 8)
            | (Self::mode_bits(instr.addr_phase) << 10)
            | ((instr.quiet_cycles as u32) << 16);
    }

    fn set_write_enable_instruction(&mut self, instr: &WriteEnableInstruction) {
        self.regs.erase_cmd_b = (self.regs.erase_cmd_b & !0x3FF)
            | instr.opcode as u32
            | (Self::mode_bits(instr.inst_phase) << 8);
    }

    fn set_suspend_resume_instruction(&mut self, instr: &SuspendResumeInstruction) {
        self.regs.erase_cmd_b = (self.regs.erase_cmd_b & 0x3FF)
            | ((instr.suspend_opcode as u32) << 10)
            | ((instr.resume_opcode as u32) << 18)
            | ((instr.min_delay as u32) << 26);
    }

    fn set_write_instruction(&mut self, instr: &WriteInstruction) {
        self.regs.auto_write_cmd = instr.opcode as u32
            | (Self::mode_bits(instr.inst_phase) << 8)
            | (Self::mode_bits(instr.addr_phase) << 10)
            | (Self::mode_bits(instr.data_phase) << 12)
            | 1 << 31;
    }

    fn clear_write_instruction(&mut self) {
        self.regs.auto_write_cmd = 0;
    }

    fn set_break_sequence(&mut self, seq: &BreakSequence) {
        self.regs.gp = (self.regs.gp & 0xFFFF) | ((seq.value as u32) << 16);
    }

    fn set_extra_byte(&mut self, value: u8, phase: BusMode) {
        self.regs.gp =
            (self.regs.gp & !0xFFFF) | value as u32 | (Self::mode_bits(phase) << 8);
    }

    fn set_address_size(&mut self, size: AddrSize) {
        self.init(size);
    }

    fn set_burst_length(&mut self, len: WrapLength) {
        self.regs.burst_len = (self.regs.burst_len & !0xFF) | len as u32;
    }

    fn set_sram_mode(&mut self, enable: bool) {
        self.regs.ctrl_mode = (self.regs.ctrl_mode & !(1 << 5)) | ((enable as u32) << 5);
    }

    fn set_cs_active_max(&mut self, cycles: u16) {
        self.cs_active_max = cycles;
        self.regs.burst_len = (self.regs.burst_len & 0xFF) | ((cycles as u32) << 8);
    }

    fn set_min_cs_high(&mut self, cycles: u8) {
        self.regs.burst_cmd_b = (self.regs.burst_cmd_b & !0xFF) | cycles as u32;
    }

    fn set_min_erase_cs_high(&mut self, cycles: u8) {
        self.regs.burst_cmd_b =
            (self.regs.burst_cmd_b & !0xFF00) | ((cycles as u32) << 8);
    }

    fn trigger_erase(&mut self, offset: u32) {
        assert!(self.access == AccessMode::Auto, "hardware erase in manual mode");
        assert!(self.clock_on);
        self.wipe_sector(offset as usize);
        self.erase_polls_left = self.busy_polls;
    }

    fn erase_status(&mut self) -> EraseStatus {
        if self.erase_polls_left > 0 {
            self.erase_polls_left -= 1;
            EraseStatus::Running
        } else {
            EraseStatus::Idle
        }
    }

    fn clock_enable(&mut self) {
        self.clock_on = true;
    }

    fn clock_disable(&mut self) {
        self.clock_on = false;
    }

    fn set_divider(&mut self, div: ClkDiv) {
        self.div = div;
    }

    fn divider(&self) -> ClkDiv {
        self.div
    }

    fn set_read_pipe_delay(&mut self, cycles: u8) {
        self.regs.ctrl_mode = (self.regs.ctrl_mode & !0xFF00) | ((cycles as u32) << 8);
    }

    fn hw_init_enabled(&self) -> bool {
        false
    }

    fn save_config(&self) -> RegSnapshot {
        self.regs
    }

    fn restore_config(&mut self, snapshot: &RegSnapshot) {
        self.regs = *snapshot;
    }

    fn read_mapped(&mut self, offset: u32, buf: &mut [u8]) {
        assert!(self.access == AccessMode::Auto, "mapped read in manual mode");
        assert!(self.clock_on, "mapped read with controller clock gated");
        let start = offset as usize;
        buf.copy_from_slice(&self.mem[start..start + buf.len()]);
    }

    fn delay_us(&mut self, us: u32) {
        self.delays_us += us as u64;
    }
}
