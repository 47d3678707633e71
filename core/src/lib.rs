pub use chip8::{Chip8, Tone};
pub use constants::CLOCK_SPEED;
pub use error::{Fault, LoadError};
pub use opcode::Opcode;
pub use state::{FrameBuffer, State};

mod chip8;
pub mod constants;
mod error;
pub mod instruction;
mod opcode;
mod operations;
pub mod state;
