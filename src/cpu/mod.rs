use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::cpu_bus::CpuBus;
use crate::{debug_flags, CpuError};

mod addressing;
mod instructions;
pub mod opcodes;


pub use addressing::Operand;
use opcodes::{AddressingMode, Instruction, Opcode};

pub const STACK_BASE: u16 = 0x0100;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const CARRY = 0b00000001;
        const ZERO = 0b00000010;
        const INTERRUPT_DISABLE = 0b00000100;
        const DECIMAL = 0b00001000;
        const BREAK = 0b00010000;
        const UNUSED = 0b00100000;
        const OVERFLOW = 0b01000000;
        const NEGATIVE = 0b10000000;
    }
}

/// Per-machine switches for the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuConfig {
    /// Honor the D flag in ADC/SBC. The NES 2A03 has the BCD circuitry cut.
    pub decimal_mode: bool,
    /// Emit a `log::trace!` record for every executed instruction.
    pub trace: bool,
}

impl CpuConfig {
    pub const fn nmos() -> Self {
        CpuConfig {
            decimal_mode: true,
            trace: false,
        }
    }

    pub const fn ricoh_2a03() -> Self {
        CpuConfig {
            decimal_mode: false,
            trace: false,
        }
    }

    /// NMOS defaults overridden by `CPU_NO_DECIMAL` and `CPU_TRACE`/`DEBUG_TRACE`.
    pub fn from_env() -> Self {
        CpuConfig {
            decimal_mode: !debug_flags::no_decimal(),
            trace: debug_flags::trace(),
        }
    }
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self::nmos()
    }
}

/// What a single `step` executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// Address the opcode was fetched from.
    pub pc: u16,
    pub opcode: u8,
    /// Raw operand as consumed by the resolver, before indexing or indirection.
    pub operand: u16,
    pub instruction: Instruction,
    pub mode: AddressingMode,
}

impl StepResult {
    pub fn is_illegal(&self) -> bool {
        self.instruction == Instruction::Invalid
    }

    pub fn illegal_opcode(&self) -> Result<(), CpuError> {
        if self.is_illegal() {
            return Err(CpuError::IllegalOpcode {
                opcode: self.opcode,
                pc: self.pc,
            });
        }
        Ok(())
    }
}

pub struct Cpu {
    pub a: u8,   // Accumulator
    pub x: u8,   // X register
    pub y: u8,   // Y register
    pub sp: u8,  // Stack pointer
    pub pc: u16, // Program counter
    pub status: StatusFlags,
    pub(crate) config: CpuConfig,
}

impl Cpu {
    pub fn new() -> Self {
        Self::with_config(CpuConfig::default())
    }

    pub fn with_config(config: CpuConfig) -> Self {
        Cpu {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: StatusFlags::UNUSED | StatusFlags::INTERRUPT_DISABLE,
            config,
        }
    }

    pub fn config(&self) -> CpuConfig {
        self.config
    }

    pub fn set_config(&mut self, config: CpuConfig) {
        self.config = config;
    }

    pub fn reset(&mut self, bus: &mut dyn CpuBus) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.status = StatusFlags::UNUSED | StatusFlags::INTERRUPT_DISABLE;
        self.pc = bus.read_u16(RESET_VECTOR);

        log::debug!("CPU reset: PC=${:04X}", self.pc);
    }

    /// Runs one fetch, decode, resolve and execute cycle.
    pub fn step(&mut self, bus: &mut dyn CpuBus) -> StepResult {
        let pc = self.pc;
        let opcode = self.read_byte(bus);
        let Opcode { instruction, mode } = opcodes::decode(opcode);
        let operand = self.resolve(bus, mode);

        let result = StepResult {
            pc,
            opcode,
            operand,
            instruction,
            mode,
        };

        if self.config.trace {
            log::trace!(
                "{:04X}  {:02X}  {} {:?} ${:04X}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
                pc,
                opcode,
                instruction.mnemonic(),
                mode,
                operand,
                self.a,
                self.x,
                self.y,
                self.status_byte(),
                self.sp
            );
        }

        if result.is_illegal() {
            log::warn!("Illegal opcode 0x{:02X} at PC: 0x{:04X}", opcode, pc);
        } else {
            self.execute(bus, instruction, mode, operand);
        }

        result
    }

    /// Packed status register; the unused bit always reads as 1.
    pub fn status_byte(&self) -> u8 {
        (self.status | StatusFlags::UNUSED).bits()
    }

    /// Loads a packed status. B only exists on the stack copy, so it is
    /// dropped; U always reads as set.
    pub fn set_status_byte(&mut self, value: u8) {
        self.status = StatusFlags::from_bits_truncate(value & !StatusFlags::BREAK.bits())
            | StatusFlags::UNUSED;
    }

    fn read_byte(&mut self, bus: &mut dyn CpuBus) -> u8 {
        let byte = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    fn read_word(&mut self, bus: &mut dyn CpuBus) -> u16 {
        let low = self.read_byte(bus) as u16;
        let high = self.read_byte(bus) as u16;
        (high << 8) | low
    }

    fn push(&mut self, bus: &mut dyn CpuBus, value: u8) {
        let addr = STACK_BASE | self.sp as u16;
        bus.write(addr, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pull(&mut self, bus: &mut dyn CpuBus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        let addr = STACK_BASE | self.sp as u16;
        bus.read(addr)
    }

    fn push_word(&mut self, bus: &mut dyn CpuBus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    fn pull_word(&mut self, bus: &mut dyn CpuBus) -> u16 {
        let low = self.pull(bus) as u16;
        let high = self.pull(bus) as u16;
        (high << 8) | low
    }

    fn set_zero_negative_flags(&mut self, value: u8) {
        self.status.set(StatusFlags::ZERO, value == 0);
        self.status.set(StatusFlags::NEGATIVE, value & 0x80 != 0);
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
