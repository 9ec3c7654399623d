use std::{path::PathBuf, process};

use c8interp::{
    display::{GFX_HEIGHT, GFX_WIDTH},
    emulator::{Emulator, EmulatorConfig, DEFAULT_FRAME_RATE, MAX_FRAME_RATE},
    Machine, MachineConfig,
};
use clap::Parser;
use winit::{dpi::LogicalSize, event::Event, event_loop::EventLoop, window::WindowBuilder};

const MAX_SCALE: i64 = 64;

#[derive(Debug, Parser)]
#[command(name = "c8interp")]
#[command(about = "Run a CHIP-8 program")]
struct Args {
    /// Program image, loaded verbatim at 0x200
    rom: PathBuf,

    /// Instructions executed per frame
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    cycles_per_frame: u32,

    #[arg(long, default_value_t = DEFAULT_FRAME_RATE, value_parser = clap::value_parser!(u64).range(1..=MAX_FRAME_RATE))]
    frame_rate: u64,

    /// Window pixels per CHIP-8 pixel
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u32).range(1..=MAX_SCALE))]
    scale: u32,

    #[arg(long)]
    mute: bool,
}

fn fail(message: String) -> ! {
    log::error!("{}", message);
    eprintln!("c8interp: {}", message);
    process::exit(1)
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let rom = std::fs::read(&args.rom)
        .unwrap_or_else(|err| fail(format!("could not read {}: {}", args.rom.display(), err)));
    let machine = Machine::new(
        &rom,
        MachineConfig {
            cycles_per_tick: args.cycles_per_frame,
        },
    )
    .unwrap_or_else(|err| fail(err.to_string()));
    log::info!("loaded {} ({} bytes)", args.rom.display(), rom.len());

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("CHIP-8 Emulator")
        .with_inner_size(LogicalSize::new(
            GFX_WIDTH as u32 * args.scale,
            GFX_HEIGHT as u32 * args.scale,
        ))
        .build(&event_loop)
        .unwrap_or_else(|err| fail(format!("could not open window: {}", err)));

    let config = EmulatorConfig {
        frame_rate: args.frame_rate,
        mute: args.mute,
    };
    let mut emulator = Emulator::new(&window, machine, config)
        .unwrap_or_else(|err| fail(format!("could not start renderer: {}", err)));

    event_loop.run(move |event, _, control_flow| {
        let flow_change = match event {
            Event::WindowEvent {
                window_id, event, ..
            } if window_id == window.id() => emulator.handle_window_event(event),
            Event::MainEventsCleared => emulator.handle_update(&window),
            Event::RedrawRequested(_) => emulator.handle_redraw(),
            Event::LoopDestroyed => {
                let code = emulator.exit_code();
                if code != 0 {
                    process::exit(code);
                }
                None
            }
            _ => None,
        };

        if let Some(new_control_flow) = flow_change {
            *control_flow = new_control_flow;
        }
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Args;

    #[test]
    fn defaults_apply() {
        let args = Args::try_parse_from(["c8interp", "game.ch8"]).unwrap();
        assert_eq!(args.cycles_per_frame, 1);
        assert_eq!(args.frame_rate, 60);
        assert_eq!(args.scale, 16);
        assert!(!args.mute);
    }

    #[test]
    fn frame_rate_is_bounded() {
        assert!(Args::try_parse_from(["c8interp", "game.ch8", "--frame-rate", "0"]).is_err());
        assert!(Args::try_parse_from(["c8interp", "game.ch8", "--frame-rate", "4294967296"]).is_err());
        let args = Args::try_parse_from(["c8interp", "game.ch8", "--frame-rate", "1000"]).unwrap();
        assert_eq!(args.frame_rate, 1000);
    }

    #[test]
    fn scale_is_bounded() {
        assert!(Args::try_parse_from(["c8interp", "game.ch8", "--scale", "0"]).is_err());
        assert!(Args::try_parse_from(["c8interp", "game.ch8", "--scale", "67108865"]).is_err());
        let args = Args::try_parse_from(["c8interp", "game.ch8", "--scale", "64"]).unwrap();
        assert_eq!(args.scale, 64);
    }
}
