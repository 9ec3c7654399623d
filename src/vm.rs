use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::display::{Framebuffer, ModificationData};
use crate::error::Chip8Error;
use crate::keypad::KeypadState;
use crate::memory::{Memory, Stack, MEM_REGION_PROGRAM};
use crate::opcode::{fetch_and_decode, OpCode, INSTRUCTION_SIZE};
use crate::timer::Timers;

// Registers
pub const REGISTER_NUM: usize = 16;
/// VF doubles as the carry / borrow / collision flag.
pub const FLAG_REGISTER: usize = 0xF;

const SPRITE_MAX_ROWS: usize = 15;

pub struct VM {
    memory: Memory,
    registers: [u8; REGISTER_NUM],
    index_register: u16,
    program_counter: u16,
    timers: Timers,
    stack: Stack,
    display: Framebuffer,
    //
    rng: StdRng,
}

/// How the program counter moves once an instruction has run. The counter
/// already points past the instruction when this is applied.
#[derive(Debug, PartialEq)]
enum InstructionResult {
    Next,
    Skip,
    Jump(u16),
    // Run the same instruction again on the next cycle
    Wait,
}

impl VM {
    // Pub

    pub fn new(rom_data: &[u8]) -> Result<Self, Chip8Error> {
        Self::with_rng(rom_data, StdRng::from_entropy())
    }

    pub fn with_seed(rom_data: &[u8], seed: u64) -> Result<Self, Chip8Error> {
        Self::with_rng(rom_data, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rom_data: &[u8], rng: StdRng) -> Result<Self, Chip8Error> {
        let mut memory = Memory::new();
        memory.load(rom_data)?;

        Ok(VM {
            memory,
            registers: [0; REGISTER_NUM],
            index_register: 0,
            program_counter: MEM_REGION_PROGRAM,
            timers: Timers::new(),
            stack: Stack::new(),
            display: Framebuffer::new(),
            rng,
        })
    }

    /// Runs one fetch-decode-execute cycle.
    pub fn step(&mut self, keypad: &KeypadState) -> Result<(), Chip8Error> {
        let (instruction, next_pc) = fetch_and_decode(&self.memory, self.program_counter);
        let opcode = instruction.opcode();
        log::trace!(
            "{:#05x}: {:#06x} {:?}",
            self.program_counter,
            instruction.raw,
            opcode
        );

        self.program_counter = next_pc;
        self.execute(opcode, keypad)
    }

    pub fn tick_timers(&mut self) {
        self.timers.tick();
    }

    pub fn is_beeper_active(&self) -> bool {
        self.timers.sound_active()
    }

    pub fn pop_display_modifications(&mut self) -> Option<ModificationData> {
        self.display.pop_modifications()
    }

    pub fn display(&self) -> &Framebuffer {
        &self.display
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn registers(&self) -> &[u8; REGISTER_NUM] {
        &self.registers
    }

    pub fn index_register(&self) -> u16 {
        self.index_register
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn timers(&self) -> Timers {
        self.timers
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    // Priv

    fn execute(&mut self, opcode: OpCode, keypad: &KeypadState) -> Result<(), Chip8Error> {
        use OpCode::*;
        let result = match opcode {
            Sys(addr) => self.sys(addr),
            Cls => self.cls(),
            Ret => self.ret()?,
            Jp(addr) => self.jp(addr),
            Call(addr) => self.call(addr)?,
            SeVb(x, byte) => self.sevb(x.into(), byte),
            SneVb(x, byte) => self.snevb(x.into(), byte),
            SeVv(x, y) => self.sevv(x.into(), y.into()),
            LdVb(x, byte) => self.ldvb(x.into(), byte),
            AddVb(x, byte) => self.addvb(x.into(), byte),
            LdVv(x, y) => self.ldvv(x.into(), y.into()),
            OrVv(x, y) => self.orvv(x.into(), y.into()),
            AndVv(x, y) => self.andvv(x.into(), y.into()),
            XorVv(x, y) => self.xorvv(x.into(), y.into()),
            AddVv(x, y) => self.addvv(x.into(), y.into()),
            SubVv(x, y) => self.subvv(x.into(), y.into()),
            ShrV(x) => self.shrv(x.into()),
            SubnVv(x, y) => self.subnvv(x.into(), y.into()),
            ShlV(x) => self.shlv(x.into()),
            SneVv(x, y) => self.snevv(x.into(), y.into()),
            LdIa(addr) => self.ldia(addr),
            JpV0a(addr) => self.jpv0a(addr),
            RndVb(x, byte) => self.rndvb(x.into(), byte),
            DrwVvn(x, y, nibble) => self.drwvvn(x.into(), y.into(), nibble),
            SkpV(x) => self.skpv(x.into(), keypad),
            SknpV(x) => self.sknpv(x.into(), keypad),
            LdVDt(x) => self.ldvdt(x.into()),
            LdVK(x) => self.ldvk(x.into(), keypad),
            LdDtV(x) => self.lddtv(x.into()),
            LdStV(x) => self.ldstv(x.into()),
            AddIV(x) => self.addiv(x.into()),
            LdFV(x) => self.ldfv(x.into()),
            LdBV(x) => self.ldbv(x.into()),
            LdIV(x) => self.ldiv(x.into()),
            LdVI(x) => self.ldvi(x.into()),
            Unknown(raw) => self.unknown(raw),
        };

        match result {
            InstructionResult::Next => (),
            InstructionResult::Skip => {
                self.program_counter = self.program_counter.wrapping_add(INSTRUCTION_SIZE)
            }
            InstructionResult::Jump(addr) => self.program_counter = addr,
            InstructionResult::Wait => {
                self.program_counter = self.program_counter.wrapping_sub(INSTRUCTION_SIZE)
            }
        }

        Ok(())
    }

    #[inline]
    fn skip_if(condition: bool) -> InstructionResult {
        if condition {
            InstructionResult::Skip
        } else {
            InstructionResult::Next
        }
    }

    #[inline]
    fn sys(&self, _addr: u16) -> InstructionResult {
        // 0nnn - SYS addr
        // NOP on modern interpreters
        InstructionResult::Next
    }

    #[inline]
    fn unknown(&self, raw: u16) -> InstructionResult {
        log::debug!("skipping unknown opcode {:#06x}", raw);
        InstructionResult::Next
    }

    #[inline]
    fn cls(&mut self) -> InstructionResult {
        // 00E0 - CLS
        self.display.clear();
        InstructionResult::Next
    }

    #[inline]
    fn ret(&mut self) -> Result<InstructionResult, Chip8Error> {
        // 00EE - RET
        Ok(InstructionResult::Jump(self.stack.pop()?))
    }

    #[inline]
    fn jp(&self, addr: u16) -> InstructionResult {
        // 1nnn - JP addr
        InstructionResult::Jump(addr)
    }

    #[inline]
    fn call(&mut self, addr: u16) -> Result<InstructionResult, Chip8Error> {
        // 2nnn - CALL addr
        // The counter was advanced on fetch, so this is the return address.
        self.stack.push(self.program_counter)?;
        Ok(InstructionResult::Jump(addr))
    }

    #[inline]
    fn sevb(&self, vx_idx: usize, byte: u8) -> InstructionResult {
        // 3xkk - SE Vx, byte
        Self::skip_if(self.registers[vx_idx] == byte)
    }

    #[inline]
    fn snevb(&self, vx_idx: usize, byte: u8) -> InstructionResult {
        // 4xkk - SNE Vx, byte
        Self::skip_if(self.registers[vx_idx] != byte)
    }

    #[inline]
    fn sevv(&self, vx_idx: usize, vy_idx: usize) -> InstructionResult {
        // 5xy0 - SE Vx, Vy
        Self::skip_if(self.registers[vx_idx] == self.registers[vy_idx])
    }

    #[inline]
    fn ldvb(&mut self, vx_idx: usize, byte: u8) -> InstructionResult {
        // 6xkk - LD Vx, byte
        self.registers[vx_idx] = byte;
        InstructionResult::Next
    }

    #[inline]
    fn addvb(&mut self, vx_idx: usize, byte: u8) -> InstructionResult {
        // 7xkk - ADD Vx, byte
        // No carry flag.
        self.registers[vx_idx] = self.registers[vx_idx].wrapping_add(byte);
        InstructionResult::Next
    }

    #[inline]
    fn ldvv(&mut self, vx_idx: usize, vy_idx: usize) -> InstructionResult {
        // 8xy0 - LD Vx, Vy
        self.registers[vx_idx] = self.registers[vy_idx];
        InstructionResult::Next
    }

    #[inline]
    fn orvv(&mut self, vx_idx: usize, vy_idx: usize) -> InstructionResult {
        // 8xy1 - OR Vx, Vy
        self.registers[vx_idx] |= self.registers[vy_idx];
        InstructionResult::Next
    }

    #[inline]
    fn andvv(&mut self, vx_idx: usize, vy_idx: usize) -> InstructionResult {
        // 8xy2 - AND Vx, Vy
        self.registers[vx_idx] &= self.registers[vy_idx];
        InstructionResult::Next
    }

    #[inline]
    fn xorvv(&mut self, vx_idx: usize, vy_idx: usize) -> InstructionResult {
        // 8xy3 - XOR Vx, Vy
        self.registers[vx_idx] ^= self.registers[vy_idx];
        InstructionResult::Next
    }

    // Flag-producing arithmetic writes VF after the result, so VF holds the
    // flag even when it is also the destination.

    #[inline]
    fn addvv(&mut self, vx_idx: usize, vy_idx: usize) -> InstructionResult {
        // 8xy4 - ADD Vx, Vy
        // Set Vx = Vx + Vy, set VF = carry.
        let (result, carry) = self.registers[vx_idx].overflowing_add(self.registers[vy_idx]);
        self.registers[vx_idx] = result;
        self.registers[FLAG_REGISTER] = carry as u8;
        InstructionResult::Next
    }

    #[inline]
    fn subvv(&mut self, vx_idx: usize, vy_idx: usize) -> InstructionResult {
        // 8xy5 - SUB Vx, Vy
        // Set Vx = Vx - Vy, set VF = NOT borrow.
        let (result, borrow) = self.registers[vx_idx].overflowing_sub(self.registers[vy_idx]);
        self.registers[vx_idx] = result;
        self.registers[FLAG_REGISTER] = !borrow as u8;
        InstructionResult::Next
    }

    #[inline]
    fn shrv(&mut self, vx_idx: usize) -> InstructionResult {
        // 8xy6 - SHR Vx {, Vy}
        let shifted_out = self.registers[vx_idx] & 1;
        self.registers[vx_idx] >>= 1;
        self.registers[FLAG_REGISTER] = shifted_out;
        InstructionResult::Next
    }

    #[inline]
    fn subnvv(&mut self, vx_idx: usize, vy_idx: usize) -> InstructionResult {
        // 8xy7 - SUBN Vx, Vy
        // Set Vx = Vy - Vx, set VF = NOT borrow.
        let (result, borrow) = self.registers[vy_idx].overflowing_sub(self.registers[vx_idx]);
        self.registers[vx_idx] = result;
        self.registers[FLAG_REGISTER] = !borrow as u8;
        InstructionResult::Next
    }

    #[inline]
    fn shlv(&mut self, vx_idx: usize) -> InstructionResult {
        // 8xyE - SHL Vx {, Vy}
        let shifted_out = self.registers[vx_idx] >> 7;
        self.registers[vx_idx] <<= 1;
        self.registers[FLAG_REGISTER] = shifted_out;
        InstructionResult::Next
    }

    #[inline]
    fn snevv(&self, vx_idx: usize, vy_idx: usize) -> InstructionResult {
        // 9xy0 - SNE Vx, Vy
        Self::skip_if(self.registers[vx_idx] != self.registers[vy_idx])
    }

    #[inline]
    fn ldia(&mut self, addr: u16) -> InstructionResult {
        // Annn - LD I, addr
        self.index_register = addr;
        InstructionResult::Next
    }

    #[inline]
    fn jpv0a(&self, addr: u16) -> InstructionResult {
        // Bnnn - JP V0, addr
        InstructionResult::Jump((addr + self.registers[0x0] as u16) & 0x0FFF)
    }

    #[inline]
    fn rndvb(&mut self, vx_idx: usize, byte: u8) -> InstructionResult {
        // Cxkk - RND Vx, byte
        self.registers[vx_idx] = self.rng.gen::<u8>() & byte;
        InstructionResult::Next
    }

    #[inline]
    fn drwvvn(&mut self, vx_idx: usize, vy_idx: usize, nibble: u8) -> InstructionResult {
        // Dxyn - DRW Vx, Vy, nibble
        let (x, y) = (self.registers[vx_idx], self.registers[vy_idx]);
        self.registers[FLAG_REGISTER] = 0;

        let rows = nibble as usize;
        let mut sprite = [0u8; SPRITE_MAX_ROWS];
        for (offset, row) in sprite.iter_mut().enumerate().take(rows) {
            *row = self
                .memory
                .get8(self.index_register.wrapping_add(offset as u16));
        }

        if self.display.draw_sprite(x, y, &sprite[..rows]) {
            self.registers[FLAG_REGISTER] = 1;
        }
        InstructionResult::Next
    }

    #[inline]
    fn skpv(&self, vx_idx: usize, keypad: &KeypadState) -> InstructionResult {
        // Ex9E - SKP Vx
        Self::skip_if(keypad.is_pressed(self.registers[vx_idx]))
    }

    #[inline]
    fn sknpv(&self, vx_idx: usize, keypad: &KeypadState) -> InstructionResult {
        // ExA1 - SKNP Vx
        Self::skip_if(!keypad.is_pressed(self.registers[vx_idx]))
    }

    #[inline]
    fn ldvdt(&mut self, vx_idx: usize) -> InstructionResult {
        // Fx07 - LD Vx, DT
        self.registers[vx_idx] = self.timers.delay;
        InstructionResult::Next
    }

    #[inline]
    fn ldvk(&mut self, vx_idx: usize, keypad: &KeypadState) -> InstructionResult {
        // Fx0A - LD Vx, K
        // Wait for a key press, store the value of the key in Vx.
        match keypad.first_pressed() {
            Some(key) => {
                self.registers[vx_idx] = key;
                InstructionResult::Next
            }
            None => InstructionResult::Wait,
        }
    }

    #[inline]
    fn lddtv(&mut self, vx_idx: usize) -> InstructionResult {
        // Fx15 - LD DT, Vx
        self.timers.delay = self.registers[vx_idx];
        InstructionResult::Next
    }

    #[inline]
    fn ldstv(&mut self, vx_idx: usize) -> InstructionResult {
        // Fx18 - LD ST, Vx
        self.timers.sound = self.registers[vx_idx];
        InstructionResult::Next
    }

    #[inline]
    fn addiv(&mut self, vx_idx: usize) -> InstructionResult {
        // Fx1E - ADD I, Vx
        self.index_register = self
            .index_register
            .wrapping_add(self.registers[vx_idx] as u16);
        InstructionResult::Next
    }

    #[inline]
    fn ldfv(&mut self, vx_idx: usize) -> InstructionResult {
        // Fx29 - LD F, Vx
        // Set I = location of sprite for digit Vx.
        self.index_register = self
            .memory
            .get_font_sprite_location(self.registers[vx_idx]);
        InstructionResult::Next
    }

    #[inline]
    fn ldbv(&mut self, vx_idx: usize) -> InstructionResult {
        // Fx33 - LD B, Vx
        // Store BCD representation of Vx in memory locations I, I+1, and I+2.
        let value = self.registers[vx_idx];
        let digits = [value / 100, (value / 10) % 10, value % 10];
        for (offset, digit) in digits.iter().enumerate() {
            self.memory
                .set8(self.index_register.wrapping_add(offset as u16), *digit);
        }
        InstructionResult::Next
    }

    #[inline]
    fn ldiv(&mut self, vx_idx: usize) -> InstructionResult {
        // Fx55 - LD [I], Vx
        // Store registers V0 through Vx in memory starting at location I.
        for i in 0..=vx_idx {
            self.memory
                .set8(self.index_register.wrapping_add(i as u16), self.registers[i]);
        }
        InstructionResult::Next
    }

    #[inline]
    fn ldvi(&mut self, vx_idx: usize) -> InstructionResult {
        // Fx65 - LD Vx, [I]
        // Read registers V0 through Vx from memory starting at location I.
        for i in 0..=vx_idx {
            self.registers[i] = self.memory.get8(self.index_register.wrapping_add(i as u16));
        }
        InstructionResult::Next
    }
}
