//! Operand consumption and effective-address computation.
//!
//! Resolving happens in two phases. [`Cpu::resolve`] only knows operand widths:
//! it consumes the bytes after the opcode and hands back the raw value. The
//! instruction handlers then turn that raw value into an address or literal
//! with [`Cpu::operand_address`] and friends, which need the index registers.

use super::opcodes::AddressingMode;
use super::Cpu;
use crate::cpu_bus::CpuBus;

/// Location a read-modify-write instruction operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Accumulator,
    Memory(u16),
}

impl Cpu {
    /// Consumes the operand bytes of `mode` at PC and returns them unmodified.
    pub(super) fn resolve(&mut self, bus: &mut dyn CpuBus, mode: AddressingMode) -> u16 {
        match mode.operand_len() {
            0 => 0,
            1 => self.read_byte(bus) as u16,
            _ => self.read_word(bus),
        }
    }

    /// Effective address for `mode`. Modes without one yield `operand` unchanged.
    pub(super) fn operand_address(
        &self,
        bus: &mut dyn CpuBus,
        mode: AddressingMode,
        operand: u16,
    ) -> u16 {
        match mode {
            AddressingMode::ZeroPage => operand & 0x00FF,
            AddressingMode::ZeroPageX => self.get_zero_page_indexed_addr(operand, self.x),
            AddressingMode::ZeroPageY => self.get_zero_page_indexed_addr(operand, self.y),
            AddressingMode::Relative => self.pc.wrapping_add(operand as u8 as i8 as u16),
            AddressingMode::Absolute => operand,
            AddressingMode::AbsoluteX => operand.wrapping_add(self.x as u16),
            AddressingMode::AbsoluteY => operand.wrapping_add(self.y as u16),
            AddressingMode::Indirect => self.get_indirect_addr(bus, operand),
            AddressingMode::IndirectX => self.get_indexed_indirect_addr(bus, operand),
            AddressingMode::IndirectY => self.get_indirect_indexed_addr(bus, operand),
            AddressingMode::Implicit
            | AddressingMode::Accumulator
            | AddressingMode::Immediate
            | AddressingMode::Invalid => operand,
        }
    }

    /// Value an instruction consumes: the literal, the accumulator, or memory.
    pub(super) fn read_operand(
        &mut self,
        bus: &mut dyn CpuBus,
        mode: AddressingMode,
        operand: u16,
    ) -> u8 {
        match mode {
            AddressingMode::Immediate => operand as u8,
            AddressingMode::Accumulator => self.a,
            _ => {
                let addr = self.operand_address(bus, mode, operand);
                bus.read(addr)
            }
        }
    }

    pub(super) fn rmw_target(
        &self,
        bus: &mut dyn CpuBus,
        mode: AddressingMode,
        operand: u16,
    ) -> Operand {
        match mode {
            AddressingMode::Accumulator => Operand::Accumulator,
            _ => Operand::Memory(self.operand_address(bus, mode, operand)),
        }
    }

    pub(super) fn load(&self, bus: &mut dyn CpuBus, target: Operand) -> u8 {
        match target {
            Operand::Accumulator => self.a,
            Operand::Memory(addr) => bus.read(addr),
        }
    }

    pub(super) fn store(&mut self, bus: &mut dyn CpuBus, target: Operand, value: u8) {
        match target {
            Operand::Accumulator => self.a = value,
            Operand::Memory(addr) => bus.write(addr, value),
        }
    }

    fn get_zero_page_indexed_addr(&self, operand: u16, index: u8) -> u16 {
        (operand as u8).wrapping_add(index) as u16
    }

    // JMP ($xxFF) fetches the high byte from $xx00, not the next page.
    fn get_indirect_addr(&self, bus: &mut dyn CpuBus, pointer: u16) -> u16 {
        let low = bus.read(pointer) as u16;
        let high_addr = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
        let high = bus.read(high_addr) as u16;
        (high << 8) | low
    }

    fn get_indexed_indirect_addr(&self, bus: &mut dyn CpuBus, operand: u16) -> u16 {
        let pointer = (operand as u8).wrapping_add(self.x);
        read_zero_page_word(bus, pointer)
    }

    fn get_indirect_indexed_addr(&self, bus: &mut dyn CpuBus, operand: u16) -> u16 {
        let base = read_zero_page_word(bus, operand as u8);
        base.wrapping_add(self.y as u16)
    }
}

fn read_zero_page_word(bus: &mut dyn CpuBus, pointer: u8) -> u16 {
    let low = bus.read(pointer as u16) as u16;
    let high = bus.read(pointer.wrapping_add(1) as u16) as u16;
    (high << 8) | low
}
