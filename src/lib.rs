//! NMOS 6502 execution core.
//!
//! The crate interprets 6502 machine code against a flat 64KB address space:
//! a total opcode table, an operand resolver, the 56 documented instructions
//! and a fetch-decode-execute driver. Memory is owned by the caller and lent to
//! the CPU through the [`CpuBus`] trait on every call.
//!
//! ```
//! use mos6502_core::{Cpu, Memory};
//!
//! let mut memory = Memory::new();
//! memory.write(0xFFFC, 0x00);
//! memory.write(0xFFFD, 0x80);
//! memory.load(0x8000, &[0xA9, 0x42]); // LDA #$42
//!
//! let mut cpu = Cpu::new();
//! cpu.reset(&mut memory);
//! let step = cpu.step(&mut memory);
//!
//! assert_eq!(step.instruction.mnemonic(), "LDA");
//! assert_eq!(cpu.a, 0x42);
//! ```

pub mod cpu;
pub mod cpu_bus;
pub mod debug_flags;
pub mod memory;
pub mod savestate;

pub use cpu::opcodes::{decode, AddressingMode, Instruction, Opcode, OPCODE_TABLE};
pub use cpu::{Cpu, CpuConfig, Operand, StatusFlags, StepResult};
pub use cpu_bus::CpuBus;
pub use memory::Memory;
pub use savestate::{CpuSnapshot, SaveState, SaveStateError};

/// Errors reported by the core and its memory helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpuError {
    /// An undefined opcode was fetched. Execution state is otherwise untouched.
    IllegalOpcode { opcode: u8, pc: u16 },
    /// A memory image longer than the 64KB address space.
    ImageTooLarge(usize),
}

impl std::fmt::Display for CpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CpuError::IllegalOpcode { opcode, pc } => {
                write!(f, "illegal opcode 0x{:02X} at PC 0x{:04X}", opcode, pc)
            }
            CpuError::ImageTooLarge(len) => {
                write!(f, "memory image is {} bytes, limit is 65536", len)
            }
        }
    }
}

impl std::error::Error for CpuError {}
