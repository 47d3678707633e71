use std::io;

use thiserror::Error;

/// An unrecoverable condition hit while executing an instruction.
///
/// Once a `Fault` is raised the VM is halted; no further instructions run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("unknown opcode {opcode:#06X} at {pc:#05X}")]
    UnknownOpcode { opcode: u16, pc: u16 },

    #[error("stack overflow calling a subroutine at {pc:#05X}")]
    StackOverflow { pc: u16 },

    #[error("return with an empty stack at {pc:#05X}")]
    StackUnderflow { pc: u16 },

    #[error("memory access at {address:#06X} is out of range (pc {pc:#05X})")]
    AddressOutOfRange { address: usize, pc: u16 },
}

/// Failure to get a ROM into memory before execution starts.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read ROM: {0}")]
    Io(#[from] io::Error),

    #[error("ROM is empty")]
    Empty,

    #[error("ROM is {size} bytes but at most {max} bytes fit in memory")]
    TooLarge { size: usize, max: usize },
}
