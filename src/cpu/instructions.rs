use super::opcodes::{AddressingMode, Instruction};
use super::{Cpu, StatusFlags, IRQ_VECTOR};
use crate::cpu_bus::CpuBus;

impl Cpu {
    pub(super) fn execute(
        &mut self,
        bus: &mut dyn CpuBus,
        instruction: Instruction,
        mode: AddressingMode,
        operand: u16,
    ) {
        match instruction {
            // Load / store
            Instruction::Lda => {
                self.a = self.read_operand(bus, mode, operand);
                self.set_zero_negative_flags(self.a);
            }
            Instruction::Ldx => {
                self.x = self.read_operand(bus, mode, operand);
                self.set_zero_negative_flags(self.x);
            }
            Instruction::Ldy => {
                self.y = self.read_operand(bus, mode, operand);
                self.set_zero_negative_flags(self.y);
            }
            Instruction::Sta => self.store_register(bus, mode, operand, self.a),
            Instruction::Stx => self.store_register(bus, mode, operand, self.x),
            Instruction::Sty => self.store_register(bus, mode, operand, self.y),

            // Transfers
            Instruction::Tax => {
                self.x = self.a;
                self.set_zero_negative_flags(self.x);
            }
            Instruction::Tay => {
                self.y = self.a;
                self.set_zero_negative_flags(self.y);
            }
            Instruction::Tsx => {
                self.x = self.sp;
                self.set_zero_negative_flags(self.x);
            }
            Instruction::Txa => {
                self.a = self.x;
                self.set_zero_negative_flags(self.a);
            }
            Instruction::Txs => self.sp = self.x,
            Instruction::Tya => {
                self.a = self.y;
                self.set_zero_negative_flags(self.a);
            }

            // Arithmetic and logic
            Instruction::Adc => {
                let value = self.read_operand(bus, mode, operand);
                self.adc(value);
            }
            Instruction::Sbc => {
                let value = self.read_operand(bus, mode, operand);
                self.sbc(value);
            }
            Instruction::And => {
                let value = self.read_operand(bus, mode, operand);
                self.a &= value;
                self.set_zero_negative_flags(self.a);
            }
            Instruction::Ora => {
                let value = self.read_operand(bus, mode, operand);
                self.a |= value;
                self.set_zero_negative_flags(self.a);
            }
            Instruction::Eor => {
                let value = self.read_operand(bus, mode, operand);
                self.a ^= value;
                self.set_zero_negative_flags(self.a);
            }
            Instruction::Bit => {
                let value = self.read_operand(bus, mode, operand);
                self.bit(value);
            }
            Instruction::Cmp => {
                let value = self.read_operand(bus, mode, operand);
                self.compare(self.a, value);
            }
            Instruction::Cpx => {
                let value = self.read_operand(bus, mode, operand);
                self.compare(self.x, value);
            }
            Instruction::Cpy => {
                let value = self.read_operand(bus, mode, operand);
                self.compare(self.y, value);
            }

            // Shifts and rotates
            Instruction::Asl => self.read_modify_write(bus, mode, operand, Cpu::asl),
            Instruction::Lsr => self.read_modify_write(bus, mode, operand, Cpu::lsr),
            Instruction::Rol => self.read_modify_write(bus, mode, operand, Cpu::rol),
            Instruction::Ror => self.read_modify_write(bus, mode, operand, Cpu::ror),

            // Increments and decrements
            Instruction::Inc => {
                self.read_modify_write(bus, mode, operand, |cpu, value| {
                    let result = value.wrapping_add(1);
                    cpu.set_zero_negative_flags(result);
                    result
                });
            }
            Instruction::Dec => {
                self.read_modify_write(bus, mode, operand, |cpu, value| {
                    let result = value.wrapping_sub(1);
                    cpu.set_zero_negative_flags(result);
                    result
                });
            }
            Instruction::Inx => {
                self.x = self.x.wrapping_add(1);
                self.set_zero_negative_flags(self.x);
            }
            Instruction::Iny => {
                self.y = self.y.wrapping_add(1);
                self.set_zero_negative_flags(self.y);
            }
            Instruction::Dex => {
                self.x = self.x.wrapping_sub(1);
                self.set_zero_negative_flags(self.x);
            }
            Instruction::Dey => {
                self.y = self.y.wrapping_sub(1);
                self.set_zero_negative_flags(self.y);
            }

            // Branches
            Instruction::Bcc => self.branch(bus, mode, operand, StatusFlags::CARRY, false),
            Instruction::Bcs => self.branch(bus, mode, operand, StatusFlags::CARRY, true),
            Instruction::Bne => self.branch(bus, mode, operand, StatusFlags::ZERO, false),
            Instruction::Beq => self.branch(bus, mode, operand, StatusFlags::ZERO, true),
            Instruction::Bpl => self.branch(bus, mode, operand, StatusFlags::NEGATIVE, false),
            Instruction::Bmi => self.branch(bus, mode, operand, StatusFlags::NEGATIVE, true),
            Instruction::Bvc => self.branch(bus, mode, operand, StatusFlags::OVERFLOW, false),
            Instruction::Bvs => self.branch(bus, mode, operand, StatusFlags::OVERFLOW, true),

            // Jumps and subroutines
            Instruction::Jmp => self.pc = self.operand_address(bus, mode, operand),
            Instruction::Jsr => self.jsr(bus, operand),
            Instruction::Rts => self.pc = self.pull_word(bus).wrapping_add(1),
            Instruction::Brk => self.brk(bus),
            Instruction::Rti => {
                let status = self.pull(bus);
                self.set_status_byte(status);
                self.pc = self.pull_word(bus);
            }

            // Stack
            Instruction::Pha => self.push(bus, self.a),
            Instruction::Php => {
                let status = self.status_byte() | StatusFlags::BREAK.bits();
                self.push(bus, status);
            }
            Instruction::Pla => {
                self.a = self.pull(bus);
                self.set_zero_negative_flags(self.a);
            }
            Instruction::Plp => {
                let status = self.pull(bus);
                self.set_status_byte(status);
            }

            // Flags
            Instruction::Clc => self.status.remove(StatusFlags::CARRY),
            Instruction::Cld => self.status.remove(StatusFlags::DECIMAL),
            Instruction::Cli => self.status.remove(StatusFlags::INTERRUPT_DISABLE),
            Instruction::Clv => self.status.remove(StatusFlags::OVERFLOW),
            Instruction::Sec => self.status.insert(StatusFlags::CARRY),
            Instruction::Sed => self.status.insert(StatusFlags::DECIMAL),
            Instruction::Sei => self.status.insert(StatusFlags::INTERRUPT_DISABLE),

            Instruction::Nop | Instruction::Invalid => {}
        }
    }

    fn store_register(&self, bus: &mut dyn CpuBus, mode: AddressingMode, operand: u16, value: u8) {
        let addr = self.operand_address(bus, mode, operand);
        bus.write(addr, value);
    }

    fn read_modify_write<F>(
        &mut self,
        bus: &mut dyn CpuBus,
        mode: AddressingMode,
        operand: u16,
        op: F,
    ) where
        F: FnOnce(&mut Cpu, u8) -> u8,
    {
        let target = self.rmw_target(bus, mode, operand);
        let value = self.load(bus, target);
        let result = op(self, value);
        self.store(bus, target, result);
    }

    // Taken when `flag` matches `when_set`.
    fn branch(
        &mut self,
        bus: &mut dyn CpuBus,
        mode: AddressingMode,
        operand: u16,
        flag: StatusFlags,
        when_set: bool,
    ) {
        if self.status.contains(flag) == when_set {
            self.pc = self.operand_address(bus, mode, operand);
        }
    }

    fn jsr(&mut self, bus: &mut dyn CpuBus, target: u16) {
        // PC is past the operand; the pushed address is the operand's last byte.
        let return_addr = self.pc.wrapping_sub(1);
        self.push_word(bus, return_addr);
        self.pc = target;
    }

    fn brk(&mut self, bus: &mut dyn CpuBus) {
        // BRK carries a padding byte, so the return address skips it.
        let return_pc = self.pc.wrapping_add(1);
        self.push_word(bus, return_pc);

        let status_with_break = self.status_byte() | StatusFlags::BREAK.bits();
        self.push(bus, status_with_break);

        self.status.insert(StatusFlags::INTERRUPT_DISABLE);
        self.pc = bus.read_u16(IRQ_VECTOR);
    }

    fn carry_in(&self) -> u8 {
        if self.status.contains(StatusFlags::CARRY) {
            1
        } else {
            0
        }
    }

    fn decimal_active(&self) -> bool {
        self.config.decimal_mode && self.status.contains(StatusFlags::DECIMAL)
    }

    fn adc(&mut self, value: u8) {
        if self.decimal_active() {
            self.adc_decimal(value);
        } else {
            self.adc_binary(value);
        }
    }

    fn adc_binary(&mut self, value: u8) {
        let result = self.a as u16 + value as u16 + self.carry_in() as u16;
        let result8 = result as u8;

        self.status.set(StatusFlags::CARRY, result > 0xFF);
        self.status.set(
            StatusFlags::OVERFLOW,
            (self.a ^ result8) & (value ^ result8) & 0x80 != 0,
        );

        self.a = result8;
        self.set_zero_negative_flags(self.a);
    }

    // NMOS behavior: Z follows the binary sum, N and V the sum after the
    // low-nibble adjust, C the fully adjusted result.
    fn adc_decimal(&mut self, value: u8) {
        let a = self.a as u16;
        let v = value as u16;
        let carry = self.carry_in() as u16;

        let binary = (a + v + carry) as u8;

        let mut low = (a & 0x0F) + (v & 0x0F) + carry;
        if low > 0x09 {
            low = ((low + 0x06) & 0x0F) + 0x10;
        }
        let mut sum = (a & 0xF0) + (v & 0xF0) + low;
        let intermediate = sum as u8;

        self.status.set(StatusFlags::ZERO, binary == 0);
        self.status.set(StatusFlags::NEGATIVE, intermediate & 0x80 != 0);
        self.status.set(
            StatusFlags::OVERFLOW,
            (self.a ^ intermediate) & (value ^ intermediate) & 0x80 != 0,
        );

        if sum >= 0xA0 {
            sum += 0x60;
        }
        self.status.set(StatusFlags::CARRY, sum > 0xFF);
        self.a = sum as u8;
    }

    fn sbc(&mut self, value: u8) {
        if self.decimal_active() {
            self.sbc_decimal(value);
        } else {
            // SBC is equivalent to ADC with the complement of the value
            self.adc_binary(!value);
        }
    }

    // Flags come from the binary subtraction; only the result is adjusted.
    fn sbc_decimal(&mut self, value: u8) {
        let a = self.a as i16;
        let v = value as i16;
        let borrow = 1 - self.carry_in() as i16;

        let mut low = (a & 0x0F) - (v & 0x0F) - borrow;
        if low < 0 {
            low = ((low - 0x06) & 0x0F) - 0x10;
        }
        let mut diff = (a & 0xF0) - (v & 0xF0) + low;
        if diff < 0 {
            diff -= 0x60;
        }

        self.adc_binary(!value);
        self.a = diff as u8;
    }

    fn bit(&mut self, value: u8) {
        self.status.set(StatusFlags::ZERO, self.a & value == 0);
        self.status.set(StatusFlags::NEGATIVE, value & 0x80 != 0);
        self.status.set(StatusFlags::OVERFLOW, value & 0x40 != 0);
    }

    fn compare(&mut self, reg: u8, value: u8) {
        let result = reg.wrapping_sub(value);
        self.status.set(StatusFlags::CARRY, reg >= value);
        self.status.set(StatusFlags::ZERO, reg == value);
        self.status.set(StatusFlags::NEGATIVE, result & 0x80 != 0);
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.status.set(StatusFlags::CARRY, value & 0x80 != 0);
        let result = value << 1;
        self.set_zero_negative_flags(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.status.set(StatusFlags::CARRY, value & 0x01 != 0);
        let result = value >> 1;
        self.set_zero_negative_flags(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry = self.carry_in();
        self.status.set(StatusFlags::CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry;
        self.set_zero_negative_flags(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry = self.carry_in();
        self.status.set(StatusFlags::CARRY, value & 0x01 != 0);
        let result = (value >> 1) | (carry << 7);
        self.set_zero_negative_flags(result);
        result
    }
}
