use crate::error::Chip8Error;

// Memory region sizes
pub const MEM_SIZE: usize = 4096;
const MEM_SIZE_FONT: usize = 0x50;
pub const MEM_SIZE_PROGRAM: usize = MEM_SIZE - MEM_REGION_PROGRAM as usize;

// Memory region starting addresses
pub const MEM_REGION_FONT: u16 = 0x050;
pub const MEM_REGION_PROGRAM: u16 = 0x200;

const FONT_SPRITE_SIZE: u16 = 5;

// Stack
pub const STACK_SIZE: usize = 12;

// Fontset
const FONTSET: [u8; MEM_SIZE_FONT] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

pub struct Memory {
    memory: [u8; MEM_SIZE],
}

/// Return address stack. `depth` counts the valid entries of `stack`.
pub struct Stack {
    stack: [u16; STACK_SIZE],
    depth: usize,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            memory: [0; MEM_SIZE],
        }
    }

    /// Zeroes memory, then places the fontset and `rom_data` at their regions.
    /// The previous contents are left untouched if the ROM does not fit.
    pub fn load(&mut self, rom_data: &[u8]) -> Result<(), Chip8Error> {
        if rom_data.len() > MEM_SIZE_PROGRAM {
            return Err(Chip8Error::RomTooLarge {
                size: rom_data.len(),
                max: MEM_SIZE_PROGRAM,
            });
        }

        self.memory = [0; MEM_SIZE];
        self.write_region(MEM_REGION_FONT as usize, &FONTSET);
        self.write_region(MEM_REGION_PROGRAM as usize, rom_data);
        log::debug!(
            "loaded {} program bytes at {:#05x}",
            rom_data.len(),
            MEM_REGION_PROGRAM
        );
        Ok(())
    }

    pub fn get_font_sprite_location(&self, digit: u8) -> u16 {
        MEM_REGION_FONT + FONT_SPRITE_SIZE * (digit & 0xF) as u16
    }

    /// Stores `value`, unless `address` falls below the program region,
    /// which is read-only once a program is loaded.
    pub fn set8(&mut self, address: u16, value: u8) {
        let address = wrap(address);
        if address < MEM_REGION_PROGRAM as usize {
            log::warn!(
                "dropped write of {:#04x} to reserved address {:#05x}",
                value,
                address
            );
            return;
        }
        self.memory[address] = value;
    }

    pub fn get8(&self, address: u16) -> u8 {
        self.memory[wrap(address)]
    }

    pub fn bytes(&self) -> &[u8] {
        &self.memory
    }

    pub fn get16(&self, address: u16) -> u16 {
        // Big endian
        (self.get8(address) as u16) << 8 | self.get8(address.wrapping_add(1)) as u16
    }

    fn write_region(&mut self, start: usize, data: &[u8]) {
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn wrap(address: u16) -> usize {
    address as usize % MEM_SIZE
}

impl Stack {
    pub fn new() -> Self {
        Self {
            stack: [0; STACK_SIZE],
            depth: 0,
        }
    }

    pub fn push(&mut self, value: u16) -> Result<(), Chip8Error> {
        let slot = self
            .stack
            .get_mut(self.depth)
            .ok_or(Chip8Error::StackOverflow { depth: self.depth })?;
        *slot = value;
        self.depth += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, Chip8Error> {
        if self.depth == 0 {
            return Err(Chip8Error::StackUnderflow);
        }
        self.depth -= 1;
        Ok(self.stack[self.depth])
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_places_font_and_program() {
        let mut memory = Memory::new();
        memory.load(&[0x12, 0x34, 0x56]).expect("ROM fits");

        assert_eq!(memory.get8(MEM_REGION_FONT), 0xF0);
        assert_eq!(memory.get8(MEM_REGION_FONT + 0x4F), 0x80);
        assert_eq!(memory.get16(MEM_REGION_PROGRAM), 0x1234);
        assert_eq!(memory.get8(MEM_REGION_PROGRAM + 2), 0x56);
        assert_eq!(memory.get8(MEM_REGION_PROGRAM + 3), 0x00);
        assert_eq!(memory.get8(0x000), 0x00);
    }

    #[test]
    fn load_accepts_exactly_full_program_region() {
        let mut memory = Memory::new();
        let rom = vec![0xAB; MEM_SIZE_PROGRAM];
        assert!(memory.load(&rom).is_ok());
        assert_eq!(memory.get8((MEM_SIZE - 1) as u16), 0xAB);
    }

    #[test]
    fn load_rejects_oversized_rom() {
        let mut memory = Memory::new();
        memory.load(&[0x11]).unwrap();
        let rom = vec![0; MEM_SIZE_PROGRAM + 1];

        assert_eq!(
            memory.load(&rom),
            Err(Chip8Error::RomTooLarge {
                size: MEM_SIZE_PROGRAM + 1,
                max: MEM_SIZE_PROGRAM
            })
        );
        // Previous program survives
        assert_eq!(memory.get8(MEM_REGION_PROGRAM), 0x11);
    }

    #[test]
    fn writes_below_program_region_are_dropped() {
        let mut memory = Memory::new();
        memory.load(&[]).unwrap();

        memory.set8(MEM_REGION_FONT, 0x00);
        memory.set8(0x1FF, 0xAA);
        memory.set8(0x200, 0xBB);

        assert_eq!(memory.get8(MEM_REGION_FONT), 0xF0);
        assert_eq!(memory.get8(0x1FF), 0x00);
        assert_eq!(memory.get8(0x200), 0xBB);
    }

    #[test]
    fn addresses_wrap_around_memory_size() {
        let mut memory = Memory::new();
        memory.load(&[0x77]).unwrap();
        memory.set8(0xFFF, 0x66);

        assert_eq!(memory.get8(0x1200), 0x77);
        assert_eq!(memory.get16(0xFFF), 0x6600);
    }

    #[test]
    fn font_sprite_location() {
        let memory = Memory::new();
        assert_eq!(memory.get_font_sprite_location(0x0), 0x050);
        assert_eq!(memory.get_font_sprite_location(0xA), 0x050 + 50);
        assert_eq!(memory.get_font_sprite_location(0x1F), 0x050 + 75);
    }

    #[test]
    fn stack_push_pop() {
        let mut stack = Stack::new();
        stack.push(0x202).unwrap();
        stack.push(0x304).unwrap();
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.pop(), Ok(0x304));
        assert_eq!(stack.pop(), Ok(0x202));
        assert_eq!(stack.pop(), Err(Chip8Error::StackUnderflow));
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn stack_overflow_is_reported() {
        let mut stack = Stack::new();
        for i in 0..STACK_SIZE {
            stack.push(i as u16).unwrap();
        }
        assert_eq!(
            stack.push(0xFFF),
            Err(Chip8Error::StackOverflow { depth: STACK_SIZE })
        );
        assert_eq!(stack.depth(), STACK_SIZE);
        assert_eq!(stack.pop(), Ok((STACK_SIZE - 1) as u16));
    }
}
