use std::fmt;
use std::ops::Range;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, KEY_COUNT, MAX_ROM_SIZE, MEMORY_SIZE, PROGRAM_START,
    SPRITE_SHEET, STACK_SIZE,
};
use crate::error::{Fault, LoadError};

/// A snapshot of the Chip-8 machine
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) doubles as the carry/borrow/collision flag
/// - (i) a 16-bit memory address register
///
/// Counter
/// - (pc) a 16-bit program counter, starting at 0x200
///
/// Pointer
/// - (sp) the next free slot of the stack (0..=16)
///
/// Timers
/// - 2 8-bit timers (delay & sound), counted down at 60Hz by whoever drives the machine
///
/// ## Memory
/// - 16 entry stack of return addresses
/// - 4096 bytes of addressable memory
///     - 0x000..0x050 holds the hex digit sprite sheet
///     - programs are loaded at 0x200
/// - 64x32 frame buffer, row major
///
/// ## Input
/// - pressed status of keys 0..F, written by the host
///
/// ## Status
/// - `current_opcode` is the last instruction fetched
/// - `fault` is set once, when the machine halts
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct State {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub stack: [u16; STACK_SIZE],
    pub memory: [u8; MEMORY_SIZE],
    pub keyboard: [bool; KEY_COUNT],
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub current_opcode: u16,
    pub fault: Option<Fault>,
}

/// The FrameBuffer is indexed as `y * DISPLAY_WIDTH + x`
pub type FrameBuffer = [bool; DISPLAY_WIDTH * DISPLAY_HEIGHT];

impl State {
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[..SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);

        State {
            v: [0; 16],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            stack: [0; STACK_SIZE],
            memory,
            keyboard: [false; KEY_COUNT],
            frame_buffer: [false; DISPLAY_WIDTH * DISPLAY_HEIGHT],
            draw_flag: false,
            current_opcode: 0,
            fault: None,
        }
    }

    /// Copy a program into memory at 0x200
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        if program.is_empty() {
            return Err(LoadError::Empty);
        }
        if program.len() > MAX_ROM_SIZE {
            return Err(LoadError::TooLarge {
                size: program.len(),
                max: MAX_ROM_SIZE,
            });
        }
        let start = usize::from(PROGRAM_START);
        self.memory[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    pub fn register(&self, x: usize) -> u8 {
        self.v[x]
    }

    pub fn register_mut(&mut self, x: usize) -> &mut u8 {
        &mut self.v[x]
    }

    /// VF = 1 if `flag` else 0
    pub fn set_flag(&mut self, flag: bool) {
        self.v[0xF] = u8::from(flag);
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.frame_buffer[y * DISPLAY_WIDTH + x]
    }

    pub fn is_halted(&self) -> bool {
        self.fault.is_some()
    }

    /// Reads the big-endian opcode at the pc.
    pub fn fetch(&self) -> Result<u16, Fault> {
        let bytes = &self.memory[self.memory_range(usize::from(self.pc), 2)?];
        Ok(u16::from(bytes[0]) << 8 | u16::from(bytes[1]))
    }

    /// The range `start..start + len` of memory, if all of it is addressable.
    pub(crate) fn memory_range(&self, start: usize, len: usize) -> Result<Range<usize>, Fault> {
        if len == 0 {
            return Ok(0..0);
        }
        if start + len > MEMORY_SIZE {
            return Err(Fault::AddressOutOfRange {
                address: start.max(MEMORY_SIZE),
                pc: self.pc,
            });
        }
        Ok(start..start + len)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// Register dump for the debugger
impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "opcode {:#06X}", self.current_opcode)?;
        for (row, registers) in self.v.chunks(8).enumerate() {
            for (n, value) in registers.iter().enumerate() {
                write!(f, "V{:X}={:02X} ", row * 8 + n, value)?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "I={:#05X} PC={:#05X} SP={} DT={} ST={}",
            self.i, self.pc, self.sp, self.delay_timer, self.sound_timer
        )
    }
}
