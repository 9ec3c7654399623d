use crate::memory::Memory;

pub const INSTRUCTION_SIZE: u16 = 2;

/*
    As per (http://devernay.free.fr/hacks/chip8/C8TECH10.HTM):
    '''
        nnn or addr - A 12-bit value, the lowest 12 bits of the instruction
        n or nibble - A 4-bit value, the lowest 4 bits of the instruction
        x - A 4-bit value, the lower 4 bits of the high byte of the instruction
        y - A 4-bit value, the upper 4 bits of the low byte of the instruction
        kk or byte - An 8-bit value, the lowest 8 bits of the instruction
    '''

    This codebase refers to the last 12 bits of an opcode
    as "addr", to the last 8 bits as "byte", and to the top 4 bits
    as "family"
*/

/// One fetched word together with every field sliced out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub raw: u16,
    pub family: u8,
    pub x: u8,
    pub y: u8,
    pub nibble: u8,
    pub byte: u8,
    pub addr: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Sys(u16),
    Cls,
    Ret,
    Jp(u16),
    Call(u16),
    SeVb(u8, u8),
    SneVb(u8, u8),
    SeVv(u8, u8),
    LdVb(u8, u8),
    AddVb(u8, u8),
    LdVv(u8, u8),
    OrVv(u8, u8),
    AndVv(u8, u8),
    XorVv(u8, u8),
    AddVv(u8, u8),
    SubVv(u8, u8),
    ShrV(u8),
    SubnVv(u8, u8),
    ShlV(u8),
    SneVv(u8, u8),
    LdIa(u16),
    JpV0a(u16),
    RndVb(u8, u8),
    DrwVvn(u8, u8, u8),
    SkpV(u8),
    SknpV(u8),
    LdVDt(u8),
    LdVK(u8),
    LdDtV(u8),
    LdStV(u8),
    AddIV(u8),
    LdFV(u8),
    LdBV(u8),
    LdIV(u8),
    LdVI(u8),
    /// Anything outside the instruction set. Executes as a no-op.
    Unknown(u16),
}

impl Instruction {
    pub fn new(raw: u16) -> Self {
        Self {
            raw,
            family: ((raw & 0xF000) >> 12) as u8,
            x: ((raw & 0x0F00) >> 8) as u8,
            y: ((raw & 0x00F0) >> 4) as u8,
            nibble: (raw & 0x000F) as u8,
            byte: (raw & 0x00FF) as u8,
            addr: raw & 0x0FFF,
        }
    }

    pub fn opcode(&self) -> OpCode {
        use OpCode::*;

        let Self {
            raw,
            x,
            y,
            byte,
            addr,
            nibble,
            ..
        } = *self;

        match (self.family, x, y, nibble) {
            // The 0 family is told apart by its low byte alone
            (0x0, _, 0xE, 0x0) => Cls,
            (0x0, _, 0xE, 0xE) => Ret,
            (0x0, _, _, _) => Sys(addr),
            (0x1, _, _, _) => Jp(addr),
            (0x2, _, _, _) => Call(addr),
            (0x3, _, _, _) => SeVb(x, byte),
            (0x4, _, _, _) => SneVb(x, byte),
            (0x5, _, _, 0x0) => SeVv(x, y),
            (0x6, _, _, _) => LdVb(x, byte),
            (0x7, _, _, _) => AddVb(x, byte),
            (0x8, _, _, 0x0) => LdVv(x, y),
            (0x8, _, _, 0x1) => OrVv(x, y),
            (0x8, _, _, 0x2) => AndVv(x, y),
            (0x8, _, _, 0x3) => XorVv(x, y),
            (0x8, _, _, 0x4) => AddVv(x, y),
            (0x8, _, _, 0x5) => SubVv(x, y),
            (0x8, _, _, 0x6) => ShrV(x),
            (0x8, _, _, 0x7) => SubnVv(x, y),
            (0x8, _, _, 0xE) => ShlV(x),
            (0x9, _, _, 0x0) => SneVv(x, y),
            (0xA, _, _, _) => LdIa(addr),
            (0xB, _, _, _) => JpV0a(addr),
            (0xC, _, _, _) => RndVb(x, byte),
            (0xD, _, _, _) => DrwVvn(x, y, nibble),
            (0xE, _, 0x9, 0xE) => SkpV(x),
            (0xE, _, 0xA, 0x1) => SknpV(x),
            (0xF, _, 0x0, 0x7) => LdVDt(x),
            (0xF, _, 0x0, 0xA) => LdVK(x),
            (0xF, _, 0x1, 0x5) => LdDtV(x),
            (0xF, _, 0x1, 0x8) => LdStV(x),
            (0xF, _, 0x1, 0xE) => AddIV(x),
            (0xF, _, 0x2, 0x9) => LdFV(x),
            (0xF, _, 0x3, 0x3) => LdBV(x),
            (0xF, _, 0x5, 0x5) => LdIV(x),
            (0xF, _, 0x6, 0x5) => LdVI(x),
            _ => Unknown(raw),
        }
    }
}

/// Reads the big endian word at `pc`. The returned program counter always
/// points past the fetched instruction; control flow overrides it afterwards.
pub fn fetch_and_decode(memory: &Memory, pc: u16) -> (Instruction, u16) {
    let instruction = Instruction::new(memory.get16(pc));
    (instruction, pc.wrapping_add(INSTRUCTION_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_reference_subset() {
        use OpCode::*;

        assert_eq!(Instruction::new(0x00E0).opcode(), Cls);
        assert_eq!(Instruction::new(0x00EE).opcode(), Ret);
        assert_eq!(Instruction::new(0x1ABC).opcode(), Jp(0xABC));
        assert_eq!(Instruction::new(0x2300).opcode(), Call(0x300));
        assert_eq!(Instruction::new(0x3A42).opcode(), SeVb(0xA, 0x42));
        assert_eq!(Instruction::new(0x6B07).opcode(), LdVb(0xB, 0x07));
        assert_eq!(Instruction::new(0x7CFF).opcode(), AddVb(0xC, 0xFF));
        assert_eq!(Instruction::new(0xA123).opcode(), LdIa(0x123));
        assert_eq!(Instruction::new(0xD125).opcode(), DrwVvn(0x1, 0x2, 0x5));
    }

    #[test]
    fn decodes_extended_set() {
        use OpCode::*;

        assert_eq!(Instruction::new(0x0123).opcode(), Sys(0x123));
        assert_eq!(Instruction::new(0x03E0).opcode(), Cls);
        assert_eq!(Instruction::new(0x0FEE).opcode(), Ret);
        assert_eq!(Instruction::new(0x8126).opcode(), ShrV(0x1));
        assert_eq!(Instruction::new(0x812E).opcode(), ShlV(0x1));
        assert_eq!(Instruction::new(0xB200).opcode(), JpV0a(0x200));
        assert_eq!(Instruction::new(0xE59E).opcode(), SkpV(0x5));
        assert_eq!(Instruction::new(0xE5A1).opcode(), SknpV(0x5));
        assert_eq!(Instruction::new(0xF30A).opcode(), LdVK(0x3));
        assert_eq!(Instruction::new(0xF329).opcode(), LdFV(0x3));
        assert_eq!(Instruction::new(0xF365).opcode(), LdVI(0x3));
    }

    #[test]
    fn unrecognised_words_decode_to_unknown() {
        for raw in [0x5121, 0x8128, 0x912F, 0xE100, 0xF1FF, 0xFFFF] {
            assert_eq!(Instruction::new(raw).opcode(), OpCode::Unknown(raw));
        }
    }

    #[test]
    fn fetch_reads_big_endian_and_advances() {
        let mut memory = Memory::new();
        memory.load(&[0x23, 0x00, 0x00, 0xEE]).unwrap();

        let (instruction, next_pc) = fetch_and_decode(&memory, 0x200);
        assert_eq!(instruction.raw, 0x2300);
        assert_eq!(next_pc, 0x202);

        let (instruction, next_pc) = fetch_and_decode(&memory, next_pc);
        assert_eq!(instruction.opcode(), OpCode::Ret);
        assert_eq!(next_pc, 0x204);
    }

    proptest! {
        #[test]
        fn field_slicing_proptest(word in any::<u16>()) {
            let instruction = Instruction::new(word);
            prop_assert_eq!(instruction.raw, word);
            prop_assert_eq!(instruction.addr, word & 0x0FFF);
            prop_assert_eq!(instruction.byte as u16, word & 0x00FF);
            prop_assert_eq!(instruction.nibble as u16, word & 0x000F);
            prop_assert_eq!(instruction.family as u16, (word >> 12) & 0xF);
            prop_assert_eq!(instruction.x as u16, (word >> 8) & 0xF);
            prop_assert_eq!(instruction.y as u16, (word >> 4) & 0xF);
        }

        #[test]
        fn fetch_always_advances_by_one_instruction(pc in 0x200u16..0xFFE) {
            let memory = Memory::new();
            let (_, next_pc) = fetch_and_decode(&memory, pc);
            prop_assert_eq!(next_pc, pc + INSTRUCTION_SIZE);
        }
    }
}
