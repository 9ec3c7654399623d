use crate::display::{Framebuffer, ModificationData};
use crate::error::Chip8Error;
use crate::keypad::KeypadState;
use crate::vm::VM;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    /// Terminal. Nothing executes once halted.
    Halted,
}

/// Discrete requests from the host that change the run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    Quit,
    TogglePause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Instructions executed per tick. Timers step once per tick regardless.
    pub cycles_per_tick: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self { cycles_per_tick: 1 }
    }
}

/// A loaded program together with the state that decides whether it runs.
pub struct Machine {
    vm: VM,
    state: RunState,
    config: MachineConfig,
    fault: Option<Chip8Error>,
}

impl Machine {
    pub fn new(rom_data: &[u8], config: MachineConfig) -> Result<Self, Chip8Error> {
        Ok(Self::from_vm(VM::new(rom_data)?, config))
    }

    pub fn from_vm(vm: VM, config: MachineConfig) -> Self {
        Self {
            vm,
            state: RunState::Running,
            config,
            fault: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> MachineConfig {
        self.config
    }

    pub fn set_cycles_per_tick(&mut self, cycles_per_tick: u32) {
        self.config.cycles_per_tick = cycles_per_tick.max(1);
        log::info!("running {} cycles per tick", self.config.cycles_per_tick);
    }

    pub fn handle_signal(&mut self, signal: HostSignal) {
        let next = match (signal, self.state) {
            (HostSignal::Quit, _) => RunState::Halted,
            (HostSignal::TogglePause, RunState::Running) => RunState::Paused,
            (HostSignal::TogglePause, RunState::Paused) => RunState::Running,
            (HostSignal::TogglePause, RunState::Halted) => RunState::Halted,
        };

        if next != self.state {
            log::info!("{:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Advances the machine by one host tick. An executor fault halts the
    /// machine and is handed back to the host.
    pub fn tick(&mut self, keypad: &KeypadState) -> Result<(), Chip8Error> {
        if self.state != RunState::Running {
            return Ok(());
        }

        for _ in 0..self.config.cycles_per_tick {
            if let Err(err) = self.vm.step(keypad) {
                log::error!(
                    "halting at {:#05x}: {}",
                    self.vm.program_counter(),
                    err
                );
                self.state = RunState::Halted;
                self.fault = Some(err.clone());
                return Err(err);
            }
        }
        self.vm.tick_timers();

        Ok(())
    }

    /// The executor fault that halted the machine, if any.
    pub fn fault(&self) -> Option<&Chip8Error> {
        self.fault.as_ref()
    }

    /// Process exit status for a finished run: 1 after a fault, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.fault.is_some() {
            1
        } else {
            0
        }
    }

    /// True exactly while the sound timer is nonzero.
    pub fn sound_active(&self) -> bool {
        self.vm.is_beeper_active()
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        self.vm.display()
    }

    pub fn pop_display_modifications(&mut self) -> Option<ModificationData> {
        self.vm.pop_display_modifications()
    }

    pub fn vm(&self) -> &VM {
        &self.vm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::STACK_SIZE;

    // LD V0, 0x01; ADD V0, 0x01; JP 0x202
    const COUNTER_ROM: [u8; 6] = [0x60, 0x01, 0x70, 0x01, 0x12, 0x02];

    fn machine(rom: &[u8], cycles_per_tick: u32) -> Machine {
        Machine::from_vm(
            VM::with_seed(rom, 1).expect("ROM fits"),
            MachineConfig { cycles_per_tick },
        )
    }

    #[test]
    fn starts_running() {
        let machine = machine(&COUNTER_ROM, 1);
        assert_eq!(machine.state(), RunState::Running);
        assert_eq!(machine.vm().program_counter(), 0x200);
    }

    #[test]
    fn oversized_rom_is_rejected_before_construction() {
        let rom = vec![0; 4096];
        assert!(matches!(
            Machine::new(&rom, MachineConfig::default()),
            Err(Chip8Error::RomTooLarge { size: 4096, .. })
        ));
    }

    #[test]
    fn running_tick_executes_one_instruction_and_steps_timers() {
        // LD V1, 0x03; LD ST, V1
        let mut machine = machine(&[0x61, 0x03, 0xF1, 0x18], 1);
        let keypad = KeypadState::new();

        machine.tick(&keypad).unwrap();
        assert_eq!(machine.vm().program_counter(), 0x202);
        assert_eq!(machine.vm().registers()[0x1], 0x3);

        machine.tick(&keypad).unwrap();
        // Set to 3, then decremented in the same tick
        assert_eq!(machine.vm().timers().sound, 2);
        assert!(machine.sound_active());
    }

    #[test]
    fn cycles_per_tick_decouples_execution_from_timers() {
        // LD V1, 0x05; LD DT, V1; then a tight loop
        let mut machine = machine(&[0x61, 0x05, 0xF1, 0x15, 0x12, 0x04], 10);
        machine.tick(&KeypadState::new()).unwrap();

        assert_eq!(machine.vm().timers().delay, 4);
        assert_eq!(machine.vm().program_counter(), 0x204);
    }

    #[test]
    fn pause_suspends_execution_and_timers() {
        let mut machine = machine(&COUNTER_ROM, 1);
        let keypad = KeypadState::new();
        machine.tick(&keypad).unwrap();
        machine.tick(&keypad).unwrap();

        let registers = *machine.vm().registers();
        let pc = machine.vm().program_counter();
        let memory = machine.vm().memory().bytes().to_vec();
        let display = machine.framebuffer().packed().to_vec();
        let timers = machine.vm().timers();

        machine.handle_signal(HostSignal::TogglePause);
        assert_eq!(machine.state(), RunState::Paused);
        for _ in 0..5 {
            machine.tick(&keypad).unwrap();
        }
        machine.handle_signal(HostSignal::TogglePause);
        assert_eq!(machine.state(), RunState::Running);

        assert_eq!(machine.vm().registers(), &registers);
        assert_eq!(machine.vm().program_counter(), pc);
        assert_eq!(machine.vm().memory().bytes(), &memory[..]);
        assert_eq!(machine.framebuffer().packed(), &display[..]);
        assert_eq!(machine.vm().timers(), timers);

        // JP 0x202; ADD V0, 0x01
        machine.tick(&keypad).unwrap();
        machine.tick(&keypad).unwrap();
        assert_eq!(machine.vm().registers()[0x0], registers[0x0] + 1);
    }

    #[test]
    fn quit_halts_from_any_state() {
        let mut running = machine(&COUNTER_ROM, 1);
        running.handle_signal(HostSignal::Quit);
        assert_eq!(running.state(), RunState::Halted);

        let mut paused = machine(&COUNTER_ROM, 1);
        paused.handle_signal(HostSignal::TogglePause);
        paused.handle_signal(HostSignal::Quit);
        assert_eq!(paused.state(), RunState::Halted);
    }

    #[test]
    fn halted_is_terminal() {
        let mut machine = machine(&COUNTER_ROM, 1);
        machine.handle_signal(HostSignal::Quit);
        machine.handle_signal(HostSignal::TogglePause);
        assert_eq!(machine.state(), RunState::Halted);

        machine.tick(&KeypadState::new()).unwrap();
        assert_eq!(machine.vm().program_counter(), 0x200);
    }

    #[test]
    fn stack_underflow_halts_machine() {
        let mut machine = machine(&[0x00, 0xEE], 1);

        assert_eq!(
            machine.tick(&KeypadState::new()),
            Err(Chip8Error::StackUnderflow)
        );
        assert_eq!(machine.state(), RunState::Halted);
    }

    #[test]
    fn stack_overflow_halts_machine() {
        // CALL 0x200, forever
        let mut machine = machine(&[0x22, 0x00], 1);
        let keypad = KeypadState::new();
        for _ in 0..STACK_SIZE {
            machine.tick(&keypad).unwrap();
        }

        assert_eq!(
            machine.tick(&keypad),
            Err(Chip8Error::StackOverflow { depth: STACK_SIZE })
        );
        assert_eq!(machine.state(), RunState::Halted);
        assert_eq!(machine.vm().stack_depth(), STACK_SIZE);
    }

    #[test]
    fn quit_exits_cleanly_and_faults_exit_with_one() {
        let mut quit = machine(&COUNTER_ROM, 1);
        quit.tick(&KeypadState::new()).unwrap();
        quit.handle_signal(HostSignal::Quit);
        assert_eq!(quit.state(), RunState::Halted);
        assert_eq!(quit.fault(), None);
        assert_eq!(quit.exit_code(), 0);

        let mut faulted = machine(&[0x00, 0xEE], 1);
        assert_eq!(faulted.exit_code(), 0);
        assert!(faulted.tick(&KeypadState::new()).is_err());
        assert_eq!(faulted.fault(), Some(&Chip8Error::StackUnderflow));
        assert_eq!(faulted.exit_code(), 1);

        // Quitting after a fault keeps the failure status
        faulted.handle_signal(HostSignal::Quit);
        assert_eq!(faulted.exit_code(), 1);
    }

    #[test]
    fn cycles_per_tick_has_a_floor_of_one() {
        let mut machine = machine(&COUNTER_ROM, 1);
        machine.set_cycles_per_tick(0);
        assert_eq!(machine.config().cycles_per_tick, 1);
    }
}
