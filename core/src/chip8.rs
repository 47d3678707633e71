use std::collections::VecDeque;
use std::io::Read;

use log::{debug, warn};

use crate::constants::{KEY_COUNT, MAX_ROM_SIZE, MAX_SAVED_STATES};
use crate::error::{Fault, LoadError};
use crate::instruction;
use crate::state::{FrameBuffer, State};

/// What the sound timer is doing after a timer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Silent,
    Playing,
    /// The sound timer just went from 1 to 0
    Stopped,
}

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - `previous_states` for rewinding
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing and rewinding the CPU
/// - advancing its timers
/// - taking its frame buffer for rendering by some display
pub struct Chip8 {
    state: State,
    previous_states: VecDeque<State>,
}

// TODO explore time/memory efficiency of more compact representations of past states (e.g. diffs)
impl Chip8 {
    pub fn new() -> Self {
        Chip8 {
            state: State::new(),
            previous_states: VecDeque::with_capacity(MAX_SAVED_STATES),
        }
    }

    /// Load a rom from a source file
    ///
    /// # Arguments
    /// * `reader` a file reader that contains a ROM
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<usize, LoadError> {
        // One byte past the limit is enough to tell that a ROM doesn't fit
        let mut program = Vec::with_capacity(MAX_ROM_SIZE + 1);
        reader
            .take(MAX_ROM_SIZE as u64 + 1)
            .read_to_end(&mut program)?;
        self.load_program(&program)?;
        Ok(program.len())
    }

    /// Load a rom that's already in memory
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.state.load_program(program)?;
        debug!("loaded {} byte program", program.len());
        Ok(())
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    pub fn fault(&self) -> Option<Fault> {
        self.state.fault
    }

    /// Returns the FrameBuffer if the display should be redrawn, clearing the draw flag
    pub fn take_frame(&mut self) -> Option<FrameBuffer> {
        if self.state.draw_flag {
            self.state.draw_flag = false;
            Some(self.state.frame_buffer)
        } else {
            None
        }
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the index of the key that was pressed (0x0..=0xF)
    pub fn key_press(&mut self, key: u8) {
        self.set_key(key, true);
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the index of the key that was released (0x0..=0xF)
    pub fn key_release(&mut self, key: u8) {
        self.set_key(key, false);
    }

    fn set_key(&mut self, key: u8, pressed: bool) {
        match self.state.keyboard.get_mut(usize::from(key)) {
            Some(status) => *status = pressed,
            None => warn!("ignoring key {:#X}; only {} keys exist", key, KEY_COUNT),
        }
    }

    /// Advances the CPU by a single instruction
    /// - saves the current state so it can be rewound to, unless nothing changed
    ///   (e.g. while waiting for a key)
    /// - halts on a fault, after which it only returns that fault
    pub fn step(&mut self) -> Result<(), Fault> {
        if let Some(fault) = self.state.fault {
            return Err(fault);
        }
        let previous = self.state;
        instruction::step(&mut self.state)?;
        let unchanged = State {
            current_opcode: previous.current_opcode,
            ..self.state
        } == previous;
        if !unchanged {
            self.save_state(previous);
        }
        Ok(())
    }

    /// Rewinds the CPU by a single instruction if possible
    /// - a halted machine stays halted
    /// - if there are previous_states, pops the last one and restores it
    pub fn rewind(&mut self) -> bool {
        if self.is_halted() {
            return false;
        }
        match self.previous_states.pop_front() {
            Some(state) => {
                self.state = State {
                    keyboard: self.state.keyboard,
                    draw_flag: true,
                    ..state
                };
                true
            }
            None => false,
        }
    }

    /// Puts a state in previous_states
    /// - if there are already MAX_SAVED_STATES saved then the oldest is dropped
    fn save_state(&mut self, state: State) {
        if self.previous_states.len() == MAX_SAVED_STATES {
            self.previous_states.pop_back();
        }
        self.previous_states.push_front(state);
    }

    /// Counts both timers down by one; call this at 60Hz regardless of clock speed
    pub fn advance_timers(&mut self) -> Tone {
        if self.state.delay_timer > 0 {
            self.state.delay_timer -= 1;
        }

        match self.state.sound_timer {
            0 => Tone::Silent,
            1 => {
                self.state.sound_timer = 0;
                Tone::Stopped
            }
            _ => {
                self.state.sound_timer -= 1;
                Tone::Playing
            }
        }
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
