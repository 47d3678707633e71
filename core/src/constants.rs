/// Default CPU speed in instructions per second
pub const CLOCK_SPEED: u32 = 500;

/// Rate at which the delay and sound timers count down
pub const TIMER_SPEED: u32 = 60;

/// Number of past states kept around for rewinding (~2s at the default clock speed)
pub const MAX_SAVED_STATES: usize = 1000;

pub const MEMORY_SIZE: usize = 4096;
pub const STACK_SIZE: usize = 16;
pub const KEY_COUNT: usize = 16;

/// ROMs are loaded into memory starting at this address
pub const PROGRAM_START: u16 = 0x200;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Each glyph in the sprite sheet is 8 pixels wide and this many rows tall
pub const GLYPH_HEIGHT: u16 = 5;

/// # Sprite sheet
/// Hexadecimal digits 0..F, stored from address 0x000.
///
/// Each byte is one 8-pixel row of which only the high nibble is used, e.g. `2`:
/// ```text
/// 0xF0  ****
/// 0x10     *
/// 0xF0  ****
/// 0x80  *
/// 0xF0  ****
/// ```
pub const SPRITE_SHEET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
