use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, GLYPH_HEIGHT, STACK_SIZE};
use crate::error::Fault;
use crate::opcode::Opcode;
use crate::state::State;

/// The pc of the next instruction, or of the one after it if `skip`
fn next(state: &State, skip: bool) -> u16 {
    if skip {
        state.pc + 0x4
    } else {
        state.pc + 0x2
    }
}

/// Keys outside of 0..F can't be pressed
fn key_pressed(state: &State, x: usize) -> bool {
    state
        .keyboard
        .get(usize::from(state.v[x]))
        .copied()
        .unwrap_or(false)
}

/// clear
pub fn cls(_op: u16, state: &State) -> Result<State, Fault> {
    Ok(State {
        pc: state.pc + 0x2,
        frame_buffer: [false; DISPLAY_WIDTH * DISPLAY_HEIGHT],
        draw_flag: true,
        ..*state
    })
}

/// PC = STACK.pop() + 2
pub fn ret(_op: u16, state: &State) -> Result<State, Fault> {
    let sp = state
        .sp
        .checked_sub(0x1)
        .ok_or(Fault::StackUnderflow { pc: state.pc })?;
    Ok(State {
        pc: state.stack[usize::from(sp)] + 0x2,
        sp,
        ..*state
    })
}

/// PC = nnn
pub fn jp(op: u16, state: &State) -> Result<State, Fault> {
    Ok(State {
        pc: op.nnn(),
        ..*state
    })
}

/// STACK.push(PC + 2); PC = nnn
pub fn call(op: u16, state: &State) -> Result<State, Fault> {
    if usize::from(state.sp) == STACK_SIZE {
        return Err(Fault::StackOverflow { pc: state.pc });
    }
    let mut stack = state.stack;
    stack[usize::from(state.sp)] = state.pc + 0x2;
    Ok(State {
        pc: op.nnn(),
        sp: state.sp + 0x1,
        stack,
        ..*state
    })
}

/// if Vx == nn then skip
pub fn se_imm(op: u16, state: &State) -> Result<State, Fault> {
    let pc = next(state, state.v[op.x()] == op.nn());
    Ok(State { pc, ..*state })
}

/// if Vx != nn then skip
pub fn sne_imm(op: u16, state: &State) -> Result<State, Fault> {
    let pc = next(state, state.v[op.x()] != op.nn());
    Ok(State { pc, ..*state })
}

/// if Vx == Vy then skip
pub fn se_reg(op: u16, state: &State) -> Result<State, Fault> {
    let pc = next(state, state.v[op.x()] == state.v[op.y()]);
    Ok(State { pc, ..*state })
}

/// if Vx != Vy then skip
pub fn sne_reg(op: u16, state: &State) -> Result<State, Fault> {
    let pc = next(state, state.v[op.x()] != state.v[op.y()]);
    Ok(State { pc, ..*state })
}

/// Vx = nn
pub fn ld_imm(op: u16, state: &State) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x()] = op.nn();
    Ok(State {
        pc: state.pc + 0x2,
        v,
        ..*state
    })
}

/// Vx += nn
/// Wraps around and leaves VF alone
pub fn add_imm(op: u16, state: &State) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x()] = v[op.x()].wrapping_add(op.nn());
    Ok(State {
        pc: state.pc + 0x2,
        v,
        ..*state
    })
}

/// Vx = Vy
pub fn ld_reg(op: u16, state: &State) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x()] = v[op.y()];
    Ok(State {
        pc: state.pc + 0x2,
        v,
        ..*state
    })
}

/// Vx |= Vy
pub fn or(op: u16, state: &State) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x()] |= v[op.y()];
    Ok(State {
        pc: state.pc + 0x2,
        v,
        ..*state
    })
}

/// Vx &= Vy
pub fn and(op: u16, state: &State) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x()] &= v[op.y()];
    Ok(State {
        pc: state.pc + 0x2,
        v,
        ..*state
    })
}

/// Vx ^= Vy
pub fn xor(op: u16, state: &State) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x()] ^= v[op.y()];
    Ok(State {
        pc: state.pc + 0x2,
        v,
        ..*state
    })
}

// The flag setting ALU operations compute from the operands as they were before
// the instruction, then write VF followed by Vx. With x == 0xF the result wins.

/// Vx += Vy; VF = carry
pub fn add_reg(op: u16, state: &State) -> Result<State, Fault> {
    let (sum, carry) = state.register(op.x()).overflowing_add(state.register(op.y()));
    let mut next = State {
        pc: state.pc + 0x2,
        ..*state
    };
    next.set_flag(carry);
    *next.register_mut(op.x()) = sum;
    Ok(next)
}

/// Vx -= Vy; VF = !borrow
pub fn sub(op: u16, state: &State) -> Result<State, Fault> {
    let (vx, vy) = (state.register(op.x()), state.register(op.y()));
    let mut next = State {
        pc: state.pc + 0x2,
        ..*state
    };
    next.set_flag(vx >= vy);
    *next.register_mut(op.x()) = vx.wrapping_sub(vy);
    Ok(next)
}

/// Vx >>= 1; VF = shifted out bit
pub fn shr(op: u16, state: &State) -> Result<State, Fault> {
    let vx = state.register(op.x());
    let mut next = State {
        pc: state.pc + 0x2,
        ..*state
    };
    next.set_flag(vx & 0x1 == 0x1);
    *next.register_mut(op.x()) = vx >> 1;
    Ok(next)
}

/// Vx = Vy - Vx; VF = !borrow
pub fn subn(op: u16, state: &State) -> Result<State, Fault> {
    let (vx, vy) = (state.register(op.x()), state.register(op.y()));
    let mut next = State {
        pc: state.pc + 0x2,
        ..*state
    };
    next.set_flag(vy >= vx);
    *next.register_mut(op.x()) = vy.wrapping_sub(vx);
    Ok(next)
}

/// Vx <<= 1; VF = shifted out bit
pub fn shl(op: u16, state: &State) -> Result<State, Fault> {
    let vx = state.register(op.x());
    let mut next = State {
        pc: state.pc + 0x2,
        ..*state
    };
    next.set_flag(vx & 0x80 == 0x80);
    *next.register_mut(op.x()) = vx << 1;
    Ok(next)
}

/// I = nnn
pub fn ld_index(op: u16, state: &State) -> Result<State, Fault> {
    Ok(State {
        pc: state.pc + 0x2,
        i: op.nnn(),
        ..*state
    })
}

/// PC = nnn + V0
pub fn jp_offset(op: u16, state: &State) -> Result<State, Fault> {
    Ok(State {
        pc: op.nnn() + u16::from(state.v[0x0]),
        ..*state
    })
}

/// Vx = random_byte & nn
pub fn rnd(op: u16, state: &State) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x()] = rand::random::<u8>() & op.nn();
    Ok(State {
        pc: state.pc + 0x2,
        v,
        ..*state
    })
}

/// draw_sprite(x=Vx y=Vy height=n)
/// XORs the n byte sprite at memory[I..I+n] onto the FrameBuffer at (Vx, Vy).
/// Sprites wrap around the edges of the screen rather than being clipped.
/// VF is set if any pixel gets turned off.
pub fn drw(op: u16, state: &State) -> Result<State, Fault> {
    let sprite = &state.memory[state.memory_range(usize::from(state.i), usize::from(op.n()))?];
    let mut next = State {
        pc: state.pc + 0x2,
        draw_flag: true,
        ..*state
    };

    // The flag is cleared before the coordinates are read
    next.set_flag(false);
    let origin_x = usize::from(next.register(op.x()));
    let origin_y = usize::from(next.register(op.y()));

    let mut collision = false;
    for (row, byte) in sprite.iter().enumerate() {
        let y = (origin_y + row) % DISPLAY_HEIGHT;
        for bit in 0..8 {
            if byte & (0x80u8 >> bit) == 0 {
                continue;
            }
            let x = (origin_x + bit) % DISPLAY_WIDTH;
            collision |= next.pixel(x, y);
            next.frame_buffer[y * DISPLAY_WIDTH + x] ^= true;
        }
    }
    next.set_flag(collision);

    Ok(next)
}

/// if pressed(Vx) then skip
pub fn skp(op: u16, state: &State) -> Result<State, Fault> {
    let pc = next(state, key_pressed(state, op.x()));
    Ok(State { pc, ..*state })
}

/// if !pressed(Vx) then skip
pub fn sknp(op: u16, state: &State) -> Result<State, Fault> {
    let pc = next(state, !key_pressed(state, op.x()));
    Ok(State { pc, ..*state })
}

/// Vx = DT
pub fn ld_delay(op: u16, state: &State) -> Result<State, Fault> {
    let mut v = state.v;
    v[op.x()] = state.delay_timer;
    Ok(State {
        pc: state.pc + 0x2,
        v,
        ..*state
    })
}

/// Vx = lowest pressed key
/// Without a pressed key the pc stays put, so this instruction runs again next step.
pub fn wait_key(op: u16, state: &State) -> Result<State, Fault> {
    match state.keyboard.iter().position(|&pressed| pressed) {
        Some(key) => {
            let mut v = state.v;
            v[op.x()] = key as u8;
            Ok(State {
                pc: state.pc + 0x2,
                v,
                ..*state
            })
        }
        None => Ok(*state),
    }
}

/// DT = Vx
pub fn set_delay(op: u16, state: &State) -> Result<State, Fault> {
    Ok(State {
        pc: state.pc + 0x2,
        delay_timer: state.v[op.x()],
        ..*state
    })
}

/// ST = Vx
pub fn set_sound(op: u16, state: &State) -> Result<State, Fault> {
    Ok(State {
        pc: state.pc + 0x2,
        sound_timer: state.v[op.x()],
        ..*state
    })
}

/// I += Vx
/// VF is not affected
pub fn add_index(op: u16, state: &State) -> Result<State, Fault> {
    Ok(State {
        pc: state.pc + 0x2,
        i: state.i.wrapping_add(u16::from(state.v[op.x()])),
        ..*state
    })
}

/// I = Vx * 5
/// Set I to the address of the sprite sheet glyph for the digit in Vx
pub fn ld_font(op: u16, state: &State) -> Result<State, Fault> {
    Ok(State {
        pc: state.pc + 0x2,
        i: u16::from(state.v[op.x()]) * GLYPH_HEIGHT,
        ..*state
    })
}

/// mem[I..I+3] = bcd(Vx)
/// Hundreds, tens and ones digits of Vx, most significant first
pub fn bcd(op: u16, state: &State) -> Result<State, Fault> {
    let value = state.v[op.x()];
    let digits = [value / 100, value / 10 % 10, value % 10];
    let mut memory = state.memory;
    memory[state.memory_range(usize::from(state.i), digits.len())?].copy_from_slice(&digits);
    Ok(State {
        pc: state.pc + 0x2,
        memory,
        ..*state
    })
}

/// mem[I..=I+x] = V0..=Vx
/// I itself is left unmodified
pub fn store(op: u16, state: &State) -> Result<State, Fault> {
    let range = state.memory_range(usize::from(state.i), op.x() + 1)?;
    let mut memory = state.memory;
    memory[range].copy_from_slice(&state.v[..=op.x()]);
    Ok(State {
        pc: state.pc + 0x2,
        memory,
        ..*state
    })
}

/// V0..=Vx = mem[I..=I+x]
/// I itself is left unmodified
pub fn load(op: u16, state: &State) -> Result<State, Fault> {
    let range = state.memory_range(usize::from(state.i), op.x() + 1)?;
    let mut v = state.v;
    v[..=op.x()].copy_from_slice(&state.memory[range]);
    Ok(State {
        pc: state.pc + 0x2,
        v,
        ..*state
    })
}
