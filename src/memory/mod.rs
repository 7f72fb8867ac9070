use crate::CpuError;
use crate::cpu_bus::CpuBus;

pub const MEMORY_SIZE: usize = 0x10000;

/// Flat 64KB address space. Every 16-bit address maps to one byte.
pub struct Memory {
    pub(crate) ram: Box<[u8; MEMORY_SIZE]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            ram: Box::new([0; MEMORY_SIZE]),
        }
    }

    /// Builds a memory whose low addresses hold `image`; the rest is zeroed.
    pub fn from_image(image: &[u8]) -> Result<Self, CpuError> {
        if image.len() > MEMORY_SIZE {
            return Err(CpuError::ImageTooLarge(image.len()));
        }
        let mut memory = Memory::new();
        memory.ram[..image.len()].copy_from_slice(image);
        Ok(memory)
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        self.ram[addr as usize] = data;
    }

    /// Copies `bytes` starting at `start`, wrapping past 0xFFFF back to 0x0000.
    pub fn load(&mut self, start: u16, bytes: &[u8]) {
        let mut addr = start;
        for &byte in bytes {
            self.ram[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.ram[..]
    }

    // Save state methods
    pub fn get_ram(&self) -> Vec<u8> {
        self.ram.to_vec()
    }

    pub fn set_ram(&mut self, ram: &[u8; MEMORY_SIZE]) {
        self.ram.copy_from_slice(ram);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBus for Memory {
    fn read(&mut self, addr: u16) -> u8 {
        Memory::read(self, addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        Memory::write(self, addr, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_address_round_trips() {
        let mut memory = Memory::new();
        memory.write(0x0000, 0x11);
        memory.write(0xFFFF, 0x22);
        assert_eq!(memory.read(0x0000), 0x11);
        assert_eq!(memory.read(0xFFFF), 0x22);
    }

    #[test]
    fn test_load_wraps_at_top_of_memory() {
        let mut memory = Memory::new();
        memory.load(0xFFFE, &[0xAA, 0xBB, 0xCC]);
        assert_eq!(memory.read(0xFFFE), 0xAA);
        assert_eq!(memory.read(0xFFFF), 0xBB);
        assert_eq!(memory.read(0x0000), 0xCC);
    }

    #[test]
    fn test_from_image() {
        let memory = Memory::from_image(&[0xA9, 0x42]).unwrap();
        assert_eq!(memory.read(0x0000), 0xA9);
        assert_eq!(memory.read(0x0001), 0x42);
        assert_eq!(memory.read(0x0002), 0x00);

        let full = vec![0xEA; MEMORY_SIZE];
        assert!(Memory::from_image(&full).is_ok());

        let oversized = vec![0; MEMORY_SIZE + 1];
        assert!(matches!(
            Memory::from_image(&oversized),
            Err(CpuError::ImageTooLarge(len)) if len == MEMORY_SIZE + 1
        ));
    }

    #[test]
    fn test_get_set_ram() {
        let mut image = Box::new([0u8; MEMORY_SIZE]);
        image[0x0000] = 0x4C;
        image[0xFFFF] = 0x80;

        let mut memory = Memory::new();
        memory.write(0x1234, 0x55);
        memory.set_ram(&image);

        assert_eq!(memory.read(0x0000), 0x4C);
        assert_eq!(memory.read(0xFFFF), 0x80);
        assert_eq!(memory.read(0x1234), 0x00);
        assert_eq!(memory.get_ram(), image.to_vec());
    }

    #[test]
    fn test_bus_read_u16_wraps() {
        let mut memory = Memory::new();
        memory.write(0xFFFF, 0x34);
        memory.write(0x0000, 0x12);
        assert_eq!(CpuBus::read_u16(&mut memory, 0xFFFF), 0x1234);
    }
}
