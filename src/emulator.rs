use std::path::Path;

use winit::{
    event::{ElementState, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::ControlFlow,
    window::Window,
};

use crate::{
    beeper::Beeper,
    keypad::KeypadState,
    machine::{HostSignal, Machine, RunState},
    renderer::{Renderer, RendererError},
    timing::Timing,
};

// Instructions per frame presets, F1 - F4
const CYCLES_REFERENCE: u32 = 1;
const CYCLES_NORMAL: u32 = 8;
const CYCLES_FAST: u32 = 16;
const CYCLES_MAX: u32 = 32;

// Frames per second
pub const DEFAULT_FRAME_RATE: u64 = 60;
pub const MAX_FRAME_RATE: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub frame_rate: u64,
    pub mute: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            mute: false,
        }
    }
}

/// Host side of the run loop: feeds window input to the machine and presents
/// its framebuffer and sound signal.
pub struct Emulator {
    renderer: Renderer,
    beeper: Beeper,
    machine: Machine,
    keypad: KeypadState,
    timing: Timing,
    pause_held: bool,
    present_failed: bool,
}

impl Emulator {
    pub fn new(
        window: &Window,
        machine: Machine,
        config: EmulatorConfig,
    ) -> Result<Self, RendererError> {
        let mut renderer = pollster::block_on(Renderer::new(window))?;
        renderer.write_framebuffer(machine.framebuffer());

        let mut beeper = Beeper::new();
        if config.mute {
            log::info!("audio muted");
        } else if let Err(err) = beeper.start_stream() {
            log::warn!("could not open audio output: {}", err);
        }
        if !beeper.is_streaming() {
            log::info!("running without sound");
        }

        Ok(Self {
            renderer,
            beeper,
            machine,
            keypad: KeypadState::new(),
            timing: Timing::new(config.frame_rate),
            pause_held: false,
            present_failed: false,
        })
    }

    /// Process exit code once the loop is over.
    pub fn exit_code(&self) -> i32 {
        if self.present_failed {
            1
        } else {
            self.machine.exit_code()
        }
    }

    pub fn handle_window_event(&mut self, event: WindowEvent) -> Option<ControlFlow> {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("window closed");
                self.machine.handle_signal(HostSignal::Quit);
            }
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state: element_state,
                        virtual_keycode: Some(keycode),
                        ..
                    },
                ..
            } => match element_state {
                ElementState::Pressed => self.on_key_pressed(keycode),
                ElementState::Released => self.on_key_released(keycode),
            },
            WindowEvent::DroppedFile(path_buf) => self.reload(&path_buf),
            WindowEvent::Resized(physical_size) => self.renderer.on_resize(physical_size),
            WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                self.renderer.on_resize(*new_inner_size)
            }
            _ => (),
        };

        self.exit_if_halted()
    }

    pub fn handle_update(&mut self, window: &Window) -> Option<ControlFlow> {
        if let Some(flow) = self.exit_if_halted() {
            return Some(flow);
        }

        if self.timing.should_tick() {
            // Faults are recorded by the machine and surface via exit_code
            let _ = self.machine.tick(&self.keypad);
            let running = self.machine.state() == RunState::Running;
            self.beeper
                .set_beeper_active(running && self.machine.sound_active());
            window.request_redraw();
            self.timing.mark_tick()
        }

        self.timing.try_sleep();

        self.exit_if_halted()
    }

    pub fn handle_redraw(&mut self) -> Option<ControlFlow> {
        if let Some(modification_data) = self.machine.pop_display_modifications() {
            self.renderer.write_display_modifications(modification_data);
        }
        if let Err(err) = self.renderer.on_redraw() {
            log::error!("presentation failed: {}", err);
            self.present_failed = true;
            return Some(ControlFlow::Exit);
        }

        None
    }

    fn exit_if_halted(&self) -> Option<ControlFlow> {
        if self.machine.state() == RunState::Halted {
            Some(ControlFlow::Exit)
        } else {
            None
        }
    }

    fn reload(&mut self, path: &Path) {
        let rom = match std::fs::read(path) {
            Ok(rom) => rom,
            Err(err) => {
                log::error!("could not read {}: {}", path.display(), err);
                return;
            }
        };

        match Machine::new(&rom, self.machine.config()) {
            Ok(machine) => {
                log::info!("loaded {} ({} bytes)", path.display(), rom.len());
                self.machine = machine;
                self.keypad = KeypadState::new();
                self.renderer.write_framebuffer(self.machine.framebuffer());
            }
            Err(err) => log::error!("keeping current program: {}", err),
        }
    }

    fn on_key_pressed(&mut self, keycode: VirtualKeyCode) {
        if let Some(key_idx) = map_key(keycode) {
            self.keypad.state[key_idx as usize] = true;
            return;
        }

        match keycode {
            VirtualKeyCode::Escape => self.machine.handle_signal(HostSignal::Quit),
            // Held keys repeat; toggle once per press
            VirtualKeyCode::P if !self.pause_held => {
                self.pause_held = true;
                self.machine.handle_signal(HostSignal::TogglePause)
            }
            _ => self.adjust_cycles(keycode),
        }
    }

    fn on_key_released(&mut self, keycode: VirtualKeyCode) {
        if let Some(key_idx) = map_key(keycode) {
            self.keypad.state[key_idx as usize] = false;
        } else if keycode == VirtualKeyCode::P {
            self.pause_held = false;
        }
    }

    fn adjust_cycles(&mut self, keycode: VirtualKeyCode) {
        if let Some(cycles) = map_cycles_preset(keycode) {
            self.machine.set_cycles_per_tick(cycles)
        }
    }
}

fn map_cycles_preset(keycode: VirtualKeyCode) -> Option<u32> {
    match keycode {
        VirtualKeyCode::F1 => Some(CYCLES_REFERENCE),
        VirtualKeyCode::F2 => Some(CYCLES_NORMAL),
        VirtualKeyCode::F3 => Some(CYCLES_FAST),
        VirtualKeyCode::F4 => Some(CYCLES_MAX),
        _ => None,
    }
}

fn map_key(scancode: VirtualKeyCode) -> Option<u8> {
    match scancode {
        VirtualKeyCode::Key1 => Some(1),
        VirtualKeyCode::Key2 => Some(2),
        VirtualKeyCode::Key3 => Some(3),
        VirtualKeyCode::Key4 => Some(0xC),

        VirtualKeyCode::Q => Some(4),
        VirtualKeyCode::W => Some(5),
        VirtualKeyCode::E => Some(6),
        VirtualKeyCode::R => Some(0xD),

        VirtualKeyCode::A => Some(7),
        VirtualKeyCode::S => Some(8),
        VirtualKeyCode::D => Some(9),
        VirtualKeyCode::F => Some(0xE),

        VirtualKeyCode::Z => Some(0xA),
        VirtualKeyCode::X => Some(0),
        VirtualKeyCode::C => Some(0xB),
        VirtualKeyCode::V => Some(0xF),

        _ => None,
    }
}
