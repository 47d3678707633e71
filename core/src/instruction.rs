use log::{trace, warn};

use crate::error::Fault;
use crate::opcode::Opcode;
use crate::operations::*;
use crate::state::State;

/// An instruction handler. Handlers own pc advancement: +2, +4 for a taken skip,
/// or an absolute address for jumps, calls and returns.
pub type Instruction = fn(op: u16, state: &State) -> Result<State, Fault>;

/// Selects the Instruction for an Opcode by its family and then, for families
/// that share a leading nibble, its sub-operation. Unknown opcodes yield `None`.
pub fn decode(op: u16) -> Option<Instruction> {
    let instruction: Instruction = match op.family() {
        0x0 => match op.nn() {
            0xE0 => cls,
            0xEE => ret,
            _ => return None,
        },
        0x1 => jp,
        0x2 => call,
        0x3 => se_imm,
        0x4 => sne_imm,
        0x5 => match op.n() {
            0x0 => se_reg,
            _ => return None,
        },
        0x6 => ld_imm,
        0x7 => add_imm,
        0x8 => match op.n() {
            0x0 => ld_reg,
            0x1 => or,
            0x2 => and,
            0x3 => xor,
            0x4 => add_reg,
            0x5 => sub,
            0x6 => shr,
            0x7 => subn,
            0xE => shl,
            _ => return None,
        },
        0x9 => match op.n() {
            0x0 => sne_reg,
            _ => return None,
        },
        0xA => ld_index,
        0xB => jp_offset,
        0xC => rnd,
        0xD => drw,
        0xE => match op.nn() {
            0x9E => skp,
            0xA1 => sknp,
            _ => return None,
        },
        0xF => match op.nn() {
            0x07 => ld_delay,
            0x0A => wait_key,
            0x15 => set_delay,
            0x18 => set_sound,
            0x1E => add_index,
            0x29 => ld_font,
            0x33 => bcd,
            0x55 => store,
            0x65 => load,
            _ => return None,
        },
        _ => return None,
    };
    Some(instruction)
}

/// Runs a single fetch-decode-execute cycle against `state`.
///
/// The new state is only committed if the instruction succeeds. Otherwise the
/// fault is recorded and the machine is halted; every later call returns that
/// same fault without executing anything.
pub fn step(state: &mut State) -> Result<(), Fault> {
    if let Some(fault) = state.fault {
        return Err(fault);
    }
    match execute(state) {
        Ok(next) => {
            *state = next;
            Ok(())
        }
        Err(fault) => {
            warn!("halting: {}", fault);
            state.fault = Some(fault);
            Err(fault)
        }
    }
}

fn execute(state: &mut State) -> Result<State, Fault> {
    let op = state.fetch()?;
    state.current_opcode = op;
    trace!(
        "{:04X} v{:02X?} i{:04X} pc{:04X}",
        op,
        state.v,
        state.i,
        state.pc
    );
    let instruction = decode(op).ok_or(Fault::UnknownOpcode {
        opcode: op,
        pc: state.pc,
    })?;
    instruction(op, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, MEMORY_SIZE};

    fn execute(op: u16, state: &State) -> State {
        let instruction = decode(op).expect("opcode should decode");
        instruction(op, state).expect("instruction should succeed")
    }

    fn fault(op: u16, state: &State) -> Fault {
        let instruction = decode(op).expect("opcode should decode");
        instruction(op, state).expect_err("instruction should fault")
    }

    #[test]
    fn test_unknown_opcodes_dont_decode() {
        for op in [0x0FFF, 0x0000, 0x00E1, 0x5121, 0x8128, 0x812F, 0x9121, 0xE19F, 0xF1FF] {
            assert!(decode(op).is_none(), "{:04X} decoded", op);
        }
    }

    #[test]
    fn test_00e0_cls() {
        let mut state = State::new();
        state.frame_buffer[0] = true;
        let state = execute(0x00E0, &state);
        assert!(state.frame_buffer.iter().all(|&pixel| !pixel));
        assert!(state.draw_flag);
        assert_eq!(state.pc, 0x202);
    }

    #[test]
    fn test_00e0_cls_twice() {
        let state = execute(0x00E0, &State::new());
        let state = State {
            draw_flag: false,
            ..state
        };
        let state = execute(0x00E0, &state);
        assert!(state.frame_buffer.iter().all(|&pixel| !pixel));
        assert!(state.draw_flag);
    }

    #[test]
    fn test_00ee_ret() {
        let mut state = State::new();
        state.sp = 0x1;
        state.stack[0x0] = 0x0ABC;
        let state = execute(0x00EE, &state);
        assert_eq!(state.sp, 0x0);
        assert_eq!(state.pc, 0x0ABC + 0x2);
    }

    #[test]
    fn test_00ee_ret_underflows() {
        let state = State::new();
        assert_eq!(fault(0x00EE, &state), Fault::StackUnderflow { pc: 0x200 });
    }

    #[test]
    fn test_1nnn_jp() {
        let state = execute(0x1ABC, &State::new());
        assert_eq!(state.pc, 0x0ABC);
    }

    #[test]
    fn test_2nnn_call() {
        let mut state = State::new();
        state.pc = 0x0ABC;
        let state = execute(0x2123, &state);
        assert_eq!(state.sp, 0x1);
        assert_eq!(state.stack[0x0], 0x0ABE);
        assert_eq!(state.pc, 0x0123);
    }

    #[test]
    fn test_2nnn_call_overflows() {
        let mut state = State::new();
        state.sp = 0x10;
        assert_eq!(fault(0x2123, &state), Fault::StackOverflow { pc: 0x200 });
    }

    #[test]
    fn test_2nnn_call_fills_stack() {
        let mut state = State::new();
        state.sp = 0xF;
        let state = execute(0x2123, &state);
        assert_eq!(state.sp, 0x10);
        assert_eq!(state.stack[0xF], 0x202);
    }

    #[test]
    fn test_3xnn_se_skips() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        let state = execute(0x3111, &state);
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_3xnn_se_doesntskip() {
        let state = execute(0x3111, &State::new());
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_4xnn_sne_skips() {
        let state = execute(0x4111, &State::new());
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_4xnn_sne_doesntskip() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        let state = execute(0x4111, &state);
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_5xy0_se_skips() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x11;
        let state = execute(0x5120, &state);
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_5xy0_se_doesntskip() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        let state = execute(0x5120, &state);
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_6xnn_ld() {
        for nn in 0..=0xFF {
            let state = execute(0x6000 | nn, &State::new());
            assert_eq!(u16::from(state.v[0x0]), nn);
            assert_eq!(state.pc, 0x202);
        }
    }

    #[test]
    fn test_7xnn_add() {
        let mut state = State::new();
        state.v[0x1] = 0x1;
        let state = execute(0x7122, &state);
        assert_eq!(state.v[0x1], 0x23);
    }

    #[test]
    fn test_7xnn_add_wraps_without_flag() {
        let mut state = State::new();
        state.v[0x1] = 0xFF;
        let state = execute(0x7102, &state);
        assert_eq!(state.v[0x1], 0x01);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy0_ld() {
        let mut state = State::new();
        state.v[0x2] = 0x1;
        let state = execute(0x8120, &state);
        assert_eq!(state.v[0x1], 0x1);
        assert_eq!(state.pc, 0x202);
    }

    #[test]
    fn test_8xy1_or() {
        let mut state = State::new();
        state.v[0x1] = 0x6;
        state.v[0x2] = 0x3;
        let state = execute(0x8121, &state);
        assert_eq!(state.v[0x1], 0x7);
    }

    #[test]
    fn test_8xy2_and() {
        let mut state = State::new();
        state.v[0x1] = 0x6;
        state.v[0x2] = 0x3;
        let state = execute(0x8122, &state);
        assert_eq!(state.v[0x1], 0x2);
    }

    #[test]
    fn test_8xy3_xor() {
        let mut state = State::new();
        state.v[0x1] = 0x6;
        state.v[0x2] = 0x3;
        let state = execute(0x8123, &state);
        assert_eq!(state.v[0x1], 0x5);
    }

    #[test]
    fn test_8xy4_add_nocarry() {
        let mut state = State::new();
        state.v[0x1] = 0xEE;
        state.v[0x2] = 0x11;
        let state = execute(0x8124, &state);
        assert_eq!(state.v[0x1], 0xFF);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy4_add_carry() {
        let mut state = State::new();
        state.v[0x0] = 0xFF;
        state.v[0x1] = 0x01;
        let state = execute(0x8014, &state);
        assert_eq!(state.v[0x0], 0x00);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_sub_noborrow() {
        let mut state = State::new();
        state.v[0x1] = 0x33;
        state.v[0x2] = 0x11;
        let state = execute(0x8125, &state);
        assert_eq!(state.v[0x1], 0x22);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_sub_equal_is_noborrow() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x11;
        let state = execute(0x8125, &state);
        assert_eq!(state.v[0x1], 0x0);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_sub_borrow() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x12;
        let state = execute(0x8125, &state);
        assert_eq!(state.v[0x1], 0xFF);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy6_shr_lsb() {
        let mut state = State::new();
        state.v[0x1] = 0x5;
        let state = execute(0x8106, &state);
        assert_eq!(state.v[0x1], 0x2);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy6_shr_nolsb() {
        let mut state = State::new();
        state.v[0x1] = 0x4;
        state.v[0xF] = 0x1;
        let state = execute(0x8106, &state);
        assert_eq!(state.v[0x1], 0x2);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy6_shr_ignores_vy() {
        let mut state = State::new();
        state.v[0x1] = 0x8;
        state.v[0x2] = 0xFF;
        let state = execute(0x8126, &state);
        assert_eq!(state.v[0x1], 0x4);
    }

    #[test]
    fn test_8xy7_subn_noborrow() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x33;
        let state = execute(0x8127, &state);
        assert_eq!(state.v[0x1], 0x22);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy7_subn_borrow() {
        let mut state = State::new();
        state.v[0x1] = 0x12;
        state.v[0x2] = 0x11;
        let state = execute(0x8127, &state);
        assert_eq!(state.v[0x1], 0xFF);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xye_shl_msb() {
        let mut state = State::new();
        state.v[0x1] = 0xFF;
        let state = execute(0x810E, &state);
        assert_eq!(state.v[0x1], 0xFE);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xye_shl_nomsb() {
        let mut state = State::new();
        state.v[0x1] = 0x4;
        let state = execute(0x810E, &state);
        assert_eq!(state.v[0x1], 0x8);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy4_into_vf_keeps_sum() {
        let mut state = State::new();
        state.v[0xF] = 0x02;
        state.v[0x1] = 0x03;
        let state = execute(0x8F14, &state);
        assert_eq!(state.v[0xF], 0x05);
    }

    #[test]
    fn test_8xy5_into_vf_keeps_difference() {
        let mut state = State::new();
        state.v[0xF] = 0x05;
        state.v[0x1] = 0x03;
        let state = execute(0x8F15, &state);
        assert_eq!(state.v[0xF], 0x02);
    }

    #[test]
    fn test_8xye_shl_into_vf_keeps_result() {
        let mut state = State::new();
        state.v[0xF] = 0x81;
        let state = execute(0x8F0E, &state);
        assert_eq!(state.v[0xF], 0x02);
    }

    #[test]
    fn test_9xy0_sne_skips() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        let state = execute(0x9120, &state);
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_9xy0_sne_doesntskip() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x11;
        let state = execute(0x9120, &state);
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_annn_ld() {
        let state = execute(0xAABC, &State::new());
        assert_eq!(state.i, 0xABC);
        assert_eq!(state.pc, 0x202);
    }

    #[test]
    fn test_bnnn_jp() {
        let mut state = State::new();
        state.v[0x0] = 0x2;
        let state = execute(0xBABC, &state);
        assert_eq!(state.pc, 0xABE);
    }

    #[test]
    fn test_cxnn_rnd_is_masked() {
        let mut state = State::new();
        for _ in 0..64 {
            state = execute(0xC10F, &state);
            assert_eq!(state.v[0x1] & 0xF0, 0x0);
        }
        let state = execute(0xC100, &state);
        assert_eq!(state.v[0x1], 0x0);
        assert_eq!(state.pc, 0x200 + 65 * 2);
    }

    #[test]
    fn test_dxyn_drw_draws() {
        let mut state = State::new();
        state.v[0x0] = 0x1;
        // Draw the 0x0 glyph with a 1x 1y offset
        let state = execute(0xD005, &state);
        let mut expected = [false; DISPLAY_WIDTH * DISPLAY_HEIGHT];
        for (y, row) in [
            [true, true, true, true],
            [true, false, false, true],
            [true, false, false, true],
            [true, false, false, true],
            [true, true, true, true],
        ]
        .iter()
        .enumerate()
        {
            let start = (y + 1) * DISPLAY_WIDTH + 1;
            expected[start..start + 4].copy_from_slice(row);
        }
        assert_eq!(state.frame_buffer, expected);
        assert_eq!(state.v[0xF], 0x0);
        assert!(state.draw_flag);
        assert_eq!(state.pc, 0x202);
    }

    #[test]
    fn test_dxyn_drw_collides() {
        let mut state = State::new();
        state.frame_buffer[0] = true;
        let state = execute(0xD001, &state);
        assert_eq!(state.v[0xF], 0x1);
        assert!(!state.pixel(0, 0));
    }

    #[test]
    fn test_dxyn_drw_xors() {
        let mut state = State::new();
        // 0 1 0 1 -> Set
        state.frame_buffer[2..6].copy_from_slice(&[false, true, false, true]);
        // 1 1 1 1 -> Draw xor (top row of the 0x0 glyph at x=2)
        state.v[0x1] = 0x2;
        let state = execute(0xD121, &state);
        assert_eq!(state.frame_buffer[2..6], [true, false, true, false]);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_dxyn_drw_wraps() {
        let mut state = State::new();
        state.v[0x1] = 62;
        state.v[0x2] = 31;
        // 0xF0 from the 0x0 glyph then 0x90
        let state = execute(0xD122, &state);
        assert!(state.pixel(62, 31));
        assert!(state.pixel(63, 31));
        assert!(state.pixel(0, 31));
        assert!(state.pixel(1, 31));
        assert!(state.pixel(62, 0));
        assert!(!state.pixel(63, 0));
        assert!(!state.pixel(0, 0));
        assert!(state.pixel(1, 0));
    }

    #[test]
    fn test_dxyn_drw_twice_restores() {
        let mut state = State::new();
        state.frame_buffer[3 * DISPLAY_WIDTH + 4] = true;
        state.v[0x1] = 0x3;
        state.v[0x2] = 0x2;
        state.i = 0x5 * 0x8;
        let before = state.frame_buffer;
        let once = execute(0xD125, &state);
        let twice = execute(0xD125, &once);
        assert_eq!(twice.frame_buffer, before);
        assert_eq!(twice.v[0xF], 0x1);
    }

    #[test]
    fn test_dxyn_drw_reads_past_memory() {
        let mut state = State::new();
        state.i = (MEMORY_SIZE - 2) as u16;
        assert_eq!(
            fault(0xD003, &state),
            Fault::AddressOutOfRange {
                address: MEMORY_SIZE,
                pc: 0x200
            }
        );
    }

    #[test]
    fn test_ex9e_skp_skips() {
        let mut state = State::new();
        state.keyboard[0xE] = true;
        state.v[0x1] = 0xE;
        let state = execute(0xE19E, &state);
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_ex9e_skp_doesntskip() {
        let state = execute(0xE19E, &State::new());
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_ex9e_skp_unknown_key_isnt_pressed() {
        let mut state = State::new();
        state.keyboard = [true; 16];
        state.v[0x1] = 0x10;
        let state = execute(0xE19E, &state);
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_exa1_sknp_skips() {
        let state = execute(0xE1A1, &State::new());
        assert_eq!(state.pc, 0x0204);
    }

    #[test]
    fn test_exa1_sknp_doesntskip() {
        let mut state = State::new();
        state.keyboard[0xE] = true;
        state.v[0x1] = 0xE;
        let state = execute(0xE1A1, &state);
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_fx07_ld() {
        let mut state = State::new();
        state.delay_timer = 0xF;
        let state = execute(0xF107, &state);
        assert_eq!(state.v[0x1], 0xF);
    }

    #[test]
    fn test_fx0a_ld_waits_for_key() {
        let state = State::new();
        let next = execute(0xF10A, &state);
        assert_eq!(next, state);
    }

    #[test]
    fn test_fx0a_ld_takes_lowest_key() {
        let mut state = State::new();
        state.keyboard[0xC] = true;
        state.keyboard[0x7] = true;
        let state = execute(0xF10A, &state);
        assert_eq!(state.v[0x1], 0x7);
        assert_eq!(state.pc, 0x202);
    }

    #[test]
    fn test_fx15_ld() {
        let mut state = State::new();
        state.v[0x1] = 0xF;
        let state = execute(0xF115, &state);
        assert_eq!(state.delay_timer, 0xF);
    }

    #[test]
    fn test_fx18_ld() {
        let mut state = State::new();
        state.v[0x1] = 0xF;
        let state = execute(0xF118, &state);
        assert_eq!(state.sound_timer, 0xF);
    }

    #[test]
    fn test_fx1e_add() {
        let mut state = State::new();
        state.i = 0x1;
        state.v[0x1] = 0x1;
        let state = execute(0xF11E, &state);
        assert_eq!(state.i, 0x2);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_fx29_ld() {
        let mut state = State::new();
        state.v[0x1] = 0x2;
        let state = execute(0xF129, &state);
        assert_eq!(state.i, 0xA);
    }

    #[test]
    fn test_fx33_bcd() {
        let mut state = State::new();
        state.v[0x1] = 157;
        state.i = 0x300;
        let state = execute(0xF133, &state);
        assert_eq!(state.memory[0x300..0x303], [0x1, 0x5, 0x7]);
        assert_eq!(state.i, 0x300);
    }

    #[test]
    fn test_fx33_bcd_past_memory() {
        let mut state = State::new();
        state.i = 0xFFE;
        assert_eq!(
            fault(0xF133, &state),
            Fault::AddressOutOfRange {
                address: 0x1000,
                pc: 0x200
            }
        );
    }

    #[test]
    fn test_fx55_ld() {
        let mut state = State::new();
        state.i = 0x300;
        state.v[0x0..0x5].copy_from_slice(&[0x1, 0x2, 0x3, 0x4, 0x5]);
        let state = execute(0xF455, &state);
        assert_eq!(state.memory[0x300..0x306], [0x1, 0x2, 0x3, 0x4, 0x5, 0x0]);
        assert_eq!(state.i, 0x300);
    }

    #[test]
    fn test_fx65_ld() {
        let mut state = State::new();
        state.i = 0x300;
        state.memory[0x300..0x306].copy_from_slice(&[0x1, 0x2, 0x3, 0x4, 0x5, 0x6]);
        let state = execute(0xF465, &state);
        assert_eq!(state.v[0x0..0x6], [0x1, 0x2, 0x3, 0x4, 0x5, 0x0]);
        assert_eq!(state.i, 0x300);
    }

    #[test]
    fn test_fx55_fx65_round_trip() {
        let mut state = State::new();
        state.i = 0x400;
        let registers = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x7F, 0x80, 0xFF];
        state.v[..8].copy_from_slice(&registers);
        let mut state = execute(0xF755, &state);
        state.v = [0; 16];
        let state = execute(0xF765, &state);
        assert_eq!(state.v[..8], registers);
    }

    #[test]
    fn test_step_records_fault_and_keeps_pc() {
        let mut state = State::new();
        state.memory[0x200..0x202].copy_from_slice(&[0x0F, 0xFF]);
        let unknown = Fault::UnknownOpcode {
            opcode: 0x0FFF,
            pc: 0x200,
        };
        assert_eq!(step(&mut state), Err(unknown));
        assert!(state.is_halted());
        assert_eq!(state.pc, 0x200);
        assert_eq!(state.current_opcode, 0x0FFF);
    }

    #[test]
    fn test_step_does_nothing_once_halted() {
        let mut state = State::new();
        state.memory[0x200..0x204].copy_from_slice(&[0x0F, 0xFF, 0x00, 0xE0]);
        let fault = step(&mut state).unwrap_err();
        // even a valid instruction at pc stays unexecuted
        state.pc = 0x202;
        let halted = state;
        assert_eq!(step(&mut state), Err(fault));
        assert_eq!(state, halted);
    }

    #[test]
    fn test_step_past_end_of_memory_halts() {
        let mut state = State::new();
        state.memory[0x200..0x202].copy_from_slice(&[0x1F, 0xFF]);
        step(&mut state).unwrap();
        assert_eq!(state.pc, 0xFFF);
        assert!(matches!(
            step(&mut state),
            Err(Fault::AddressOutOfRange { address: 0x1000, .. })
        ));
        assert!(state.is_halted());
    }
}
