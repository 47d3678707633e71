use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use log::{debug, error, info};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;

use chip8_core::constants::TIMER_SPEED;
use chip8_core::{Chip8, Tone};
use chip8_display::Display;

use crate::keymap::keymap;

pub struct Options {
    /// Instructions per second
    pub clock_speed: u32,
    pub scale: u32,
    /// Single step on Return instead of running freely
    pub debug: bool,
}

/// Fires once every `interval` of wall clock time
struct Timer {
    interval: Duration,
    last_tick: Instant,
}

impl Timer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: Instant::now(),
        }
    }

    fn tick(&mut self) -> bool {
        if self.last_tick.elapsed() >= self.interval {
            self.last_tick += self.interval;
            true
        } else {
            false
        }
    }
}

pub fn run(rom: &Path, options: Options) -> anyhow::Result<()> {
    let mut chip8: Chip8 = Chip8::new();

    // Load ROM
    let file = File::open(rom).with_context(|| format!("unable to open {}", rom.display()))?;
    let mut reader = BufReader::new(file);
    let size = chip8
        .load_rom(&mut reader)
        .with_context(|| format!("unable to load {}", rom.display()))?;
    info!("loaded {} ({} bytes)", rom.display(), size);

    // Get SDL2 context
    let sdl: sdl2::Sdl = sdl2::init().map_err(anyhow::Error::msg)?;
    let mut display: Display = Display::new(&sdl, options.scale)?;
    let mut events = sdl.event_pump().map_err(anyhow::Error::msg)?;

    // Set initial timing
    let cycle_time = Duration::from_secs(1) / options.clock_speed.max(1);
    let mut last_cycle: Instant = Instant::now();
    let mut timers = Timer::new(Duration::from_secs(1) / TIMER_SPEED);

    // Whether or not the clock speed should be respected
    let mut fast_forward: bool = false;
    // Whether the game's state should be cycled forwards or backwards
    let mut rewind: bool = false;
    // Whether the debugger has been asked for the next instruction
    let mut single_step: bool = false;

    'event: loop {
        // If the draw flag is set, unset it and render the current frame
        if let Some(frame) = chip8.take_frame() {
            display.render(&frame)?;
        }

        // Handle input
        for event in events.poll_iter() {
            match event {
                Event::Quit { .. } => break 'event,
                Event::KeyDown {
                    keycode: Some(key), ..
                } => match (key, keymap(key)) {
                    (_, Some(kc)) => chip8.key_press(kc),
                    (Keycode::Space, _) => fast_forward = true,
                    (Keycode::Escape, _) => rewind = true,
                    (Keycode::Return, _) => single_step = true,
                    _ => continue,
                },
                Event::KeyUp {
                    keycode: Some(key), ..
                } => match (key, keymap(key)) {
                    (_, Some(kc)) => chip8.key_release(kc),
                    (Keycode::Space, _) => fast_forward = false,
                    (Keycode::Escape, _) => rewind = false,
                    _ => continue,
                },
                _ => continue,
            };
        }

        // Update state
        if rewind {
            if chip8.rewind() && options.debug {
                info!("rewound\n{}", chip8.state());
            }
            // The debugger rewinds one instruction per press
            rewind = rewind && !options.debug;
        } else if !options.debug || single_step {
            if let Err(fault) = chip8.step() {
                error!("halted\n{}", chip8.state());
                return Err(fault.into());
            }
            if options.debug {
                info!("\n{}", chip8.state());
            }
            single_step = false;
        }

        // Catch up on every 60Hz period that passed, however long this pass took
        while timers.tick() {
            if chip8.advance_timers() == Tone::Stopped {
                debug!("sound timer expired");
            }
        }

        // Handle timing
        let current_time = Instant::now();
        let elapsed_cycle_time = current_time - last_cycle;
        if !fast_forward && cycle_time > elapsed_cycle_time {
            std::thread::sleep(cycle_time - elapsed_cycle_time);
        }
        last_cycle = Instant::now();
    }

    info!("exiting");
    Ok(())
}
