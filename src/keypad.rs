// Input
pub const KEYPAD_SIZE: usize = 16;

/// Logical key state for keys 0x0 - 0xF, as supplied by the host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeypadState {
    pub state: [bool; KEYPAD_SIZE],
}

impl KeypadState {
    pub fn new() -> Self {
        Self {
            state: [false; KEYPAD_SIZE],
        }
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        self.state[(key & 0xF) as usize]
    }

    pub fn first_pressed(&self) -> Option<u8> {
        self.state
            .iter()
            .position(|pressed| *pressed)
            .map(|key| key as u8)
    }
}
