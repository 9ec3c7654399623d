pub mod beeper;
pub mod display;
pub mod emulator;
pub mod error;
pub mod keypad;
pub mod machine;
pub mod memory;
pub mod opcode;
pub mod renderer;
pub mod timer;
pub mod timing;
pub mod vm;

pub use error::Chip8Error;
pub use machine::{HostSignal, Machine, MachineConfig, RunState};
