use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::cpu::{Cpu, CpuConfig};
use crate::memory::{Memory, MEMORY_SIZE};

pub const SAVE_STATE_VERSION: u32 = 1;

#[derive(Debug)]
pub enum SaveStateError {
    Io(std::io::Error),
    Encode(bincode::Error),
    VersionMismatch { expected: u32, found: u32 },
    MemorySize(usize),
}

impl fmt::Display for SaveStateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SaveStateError::Io(err) => write!(f, "save state I/O failed: {}", err),
            SaveStateError::Encode(err) => write!(f, "save state encoding failed: {}", err),
            SaveStateError::VersionMismatch { expected, found } => write!(
                f,
                "save state version {} is not supported (expected {})",
                found, expected
            ),
            SaveStateError::MemorySize(len) => {
                write!(f, "save state memory is {} bytes, expected {}", len, MEMORY_SIZE)
            }
        }
    }
}

impl std::error::Error for SaveStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveStateError::Io(err) => Some(err),
            SaveStateError::Encode(err) => Some(&**err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaveStateError {
    fn from(err: std::io::Error) -> Self {
        SaveStateError::Io(err)
    }
}

impl From<bincode::Error> for SaveStateError {
    fn from(err: bincode::Error) -> Self {
        SaveStateError::Encode(err)
    }
}

/// Register file of a [`Cpu`]; the status register is kept as its raw byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub config: CpuConfig,
}

impl Cpu {
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc,
            status: self.status.bits(),
            config: self.config,
        }
    }

    pub fn restore(&mut self, snapshot: &CpuSnapshot) {
        self.a = snapshot.a;
        self.x = snapshot.x;
        self.y = snapshot.y;
        self.sp = snapshot.sp;
        self.pc = snapshot.pc;
        self.set_status_byte(snapshot.status);
        self.config = snapshot.config;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    pub cpu: CpuSnapshot,
    pub memory: Vec<u8>,
}

impl SaveState {
    pub fn capture(cpu: &Cpu, memory: &Memory) -> Self {
        SaveState {
            version: SAVE_STATE_VERSION,
            cpu: cpu.snapshot(),
            memory: memory.get_ram(),
        }
    }

    pub fn apply(&self, cpu: &mut Cpu, memory: &mut Memory) -> Result<(), SaveStateError> {
        self.validate()?;
        let ram: &[u8; MEMORY_SIZE] = self
            .memory
            .as_slice()
            .try_into()
            .map_err(|_| SaveStateError::MemorySize(self.memory.len()))?;
        cpu.restore(&self.cpu);
        memory.set_ram(ram);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveStateError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<SaveState, SaveStateError> {
        let state: SaveState = bincode::deserialize(data)?;
        state.validate()?;
        Ok(state)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveStateError> {
        let data = self.to_bytes()?;
        std::fs::write(path.as_ref(), data)?;
        log::info!("Save state written to: {}", path.as_ref().display());
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<SaveState, SaveStateError> {
        let data = std::fs::read(path.as_ref())?;
        let state = Self::from_bytes(&data)?;
        log::info!("Save state loaded from: {}", path.as_ref().display());
        Ok(state)
    }

    fn validate(&self) -> Result<(), SaveStateError> {
        if self.version != SAVE_STATE_VERSION {
            return Err(SaveStateError::VersionMismatch {
                expected: SAVE_STATE_VERSION,
                found: self.version,
            });
        }
        if self.memory.len() != MEMORY_SIZE {
            return Err(SaveStateError::MemorySize(self.memory.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::StatusFlags;

    fn running_machine() -> (Cpu, Memory) {
        let mut memory = Memory::new();
        memory.write(0xFFFC, 0x00);
        memory.write(0xFFFD, 0x80);
        // LDA #$42; LDX #$07; SED; PHA
        memory.load(0x8000, &[0xA9, 0x42, 0xA2, 0x07, 0xF8, 0x48]);
        let mut cpu = Cpu::new();
        cpu.reset(&mut memory);
        for _ in 0..4 {
            cpu.step(&mut memory);
        }
        (cpu, memory)
    }

    #[test]
    fn test_snapshot_restore() {
        let (cpu, _memory) = running_machine();
        let snapshot = cpu.snapshot();

        let mut fresh = Cpu::with_config(CpuConfig::ricoh_2a03());
        fresh.restore(&snapshot);

        assert_eq!(fresh.a, 0x42);
        assert_eq!(fresh.x, 0x07);
        assert_eq!(fresh.sp, 0xFC);
        assert_eq!(fresh.pc, 0x8006);
        assert!(fresh.status.contains(StatusFlags::DECIMAL));
        assert_eq!(fresh.config(), CpuConfig::nmos());
    }

    #[test]
    fn test_restore_drops_break_flag() {
        let (cpu, _memory) = running_machine();
        let mut snapshot = cpu.snapshot();
        snapshot.status = 0xFF;

        let mut restored = Cpu::new();
        restored.restore(&snapshot);

        assert!(!restored.status.contains(StatusFlags::BREAK));
        assert!(restored.status.contains(StatusFlags::UNUSED));
        assert_eq!(restored.status_byte(), 0xEF);

        snapshot.status = 0x10;
        restored.restore(&snapshot);
        assert_eq!(restored.status_byte(), 0x20);
    }

    #[test]
    fn test_bytes_round_trip() {
        let (cpu, memory) = running_machine();
        let bytes = SaveState::capture(&cpu, &memory).to_bytes().unwrap();

        let state = SaveState::from_bytes(&bytes).unwrap();
        let mut restored_cpu = Cpu::new();
        let mut restored_memory = Memory::new();
        state.apply(&mut restored_cpu, &mut restored_memory).unwrap();

        assert_eq!(restored_cpu.snapshot(), cpu.snapshot());
        assert_eq!(restored_memory.read(0x01FD), 0x42);
        assert_eq!(restored_memory.as_slice(), memory.as_slice());

        // Execution resumes identically.
        restored_memory.write(0x8006, 0xE8); // INX
        restored_cpu.step(&mut restored_memory);
        assert_eq!(restored_cpu.x, 0x08);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let (cpu, memory) = running_machine();
        let mut state = SaveState::capture(&cpu, &memory);
        state.version = 99;
        let bytes = state.to_bytes().unwrap();

        assert!(matches!(
            SaveState::from_bytes(&bytes),
            Err(SaveStateError::VersionMismatch { expected: 1, found: 99 })
        ));
    }

    #[test]
    fn test_rejects_truncated_memory() {
        let (cpu, memory) = running_machine();
        let mut state = SaveState::capture(&cpu, &memory);
        state.memory.truncate(0x100);

        let mut target_cpu = Cpu::new();
        let mut target_memory = Memory::new();
        assert!(matches!(
            state.apply(&mut target_cpu, &mut target_memory),
            Err(SaveStateError::MemorySize(0x100))
        ));
        assert_eq!(target_cpu.pc, 0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            SaveState::from_bytes(&[0x01, 0x02]),
            Err(SaveStateError::Encode(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let (cpu, memory) = running_machine();
        let path = std::env::temp_dir().join(format!(
            "mos6502-core-savestate-{}.bin",
            std::process::id()
        ));

        SaveState::capture(&cpu, &memory).save_to_file(&path).unwrap();
        let state = SaveState::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(state.cpu, cpu.snapshot());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("mos6502-core-no-such-savestate.bin");
        assert!(matches!(
            SaveState::load_from_file(&path),
            Err(SaveStateError::Io(_))
        ));
    }
}
