use std::path::PathBuf;

use clap::Parser;

use chip8_core::CLOCK_SPEED;

mod keymap;
mod run;

/// Run a Chip-8 ROM
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    /// Instructions per second
    #[arg(short, long, default_value_t = CLOCK_SPEED)]
    clock: u32,

    /// Size of a Chip-8 pixel on screen
    #[arg(short, long, default_value_t = 10)]
    scale: u32,

    /// Execute one instruction per press of Return and log the registers after each
    #[arg(short, long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    run::run(
        &args.rom,
        run::Options {
            clock_speed: args.clock,
            scale: args.scale,
            debug: args.debug,
        },
    )
}
