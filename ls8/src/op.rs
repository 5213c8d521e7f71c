// Copyright (C) 2024 Ethan Uppal. All rights reserved.

use std::fmt;

use enum_tags::enum_tags;
use paste::paste;
use static_assertions::const_assert_eq;

use crate::arch::{Immediate, RawOpCode, Register, Word};

//  +--------------------------------------------------------+
//  | Opcode layout: `AABCDDDD`                              |
//  +--------------------------------------------------------+
//  | AA   | number of operand bytes that follow (0-2)       |
//  | B    | the operation is performed by the ALU           |
//  | C    | the instruction sets the program counter itself |
//  | DDDD | instruction identifier                          |
//  +--------------------------------------------------------+

pub const OPERAND_COUNT_SHIFT: u32 = 6;
pub const ALU_BIT: RawOpCode = 0b0010_0000;
pub const SETS_PC_BIT: RawOpCode = 0b0001_0000;
pub const IDENTIFIER_MASK: RawOpCode = 0b0000_1111;

/// Number of operand bytes following `opcode`.
pub const fn operand_count(opcode: RawOpCode) -> usize {
    (opcode >> OPERAND_COUNT_SHIFT) as usize
}

/// Whether `opcode` is an ALU operation.
pub const fn is_alu(opcode: RawOpCode) -> bool {
    opcode & ALU_BIT != 0
}

/// Whether the handler for `opcode` is responsible for the program counter.
pub const fn sets_pc(opcode: RawOpCode) -> bool {
    opcode & SETS_PC_BIT != 0
}

/// Size in bytes of an instruction starting with `opcode`.
pub const fn instruction_length(opcode: RawOpCode) -> usize {
    1 + operand_count(opcode)
}

/// An LS-8 instruction. Register operands are not validated here, that is
/// left to the register file.
#[enum_tags(public, repr(RawOpCode))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// `Self::Nop` has no effect.
    Nop = 0b0000_0000,
    /// `Self::Hlt` stops the machine.
    Hlt = 0b0000_0001,
    /// `Self::Ret` pops the return address into the program counter.
    Ret = 0b0001_0001,
    /// `Self::Iret` returns from an interrupt handler. Interrupts are not
    /// modeled, so this does nothing.
    Iret = 0b0001_0011,
    /// `Self::Push(a)` decrements the stack pointer and stores `a` at the new
    /// top of the stack.
    Push(Register) = 0b0100_0101,
    /// `Self::Pop(a)` loads the top of the stack into `a` and increments the
    /// stack pointer.
    Pop(Register) = 0b0100_0110,
    /// `Self::Prn(a)` prints the value of `a` in decimal.
    Prn(Register) = 0b0100_0111,
    /// `Self::Pra(a)` prints the character whose code is the value of `a`.
    Pra(Register) = 0b0100_1000,
    /// `Self::Call(a)` pushes the address of the next instruction and jumps
    /// to the address in `a`.
    Call(Register) = 0b0101_0000,
    /// `Self::Int(a)` raises the interrupt numbered by `a`. Interrupts are
    /// not modeled, so this does nothing.
    Int(Register) = 0b0101_0010,
    /// `Self::Jmp(a)` jumps to the address in `a`.
    Jmp(Register) = 0b0101_0100,
    /// `Self::Jeq(a)` jumps to the address in `a` if the equal flag is set.
    Jeq(Register) = 0b0101_0101,
    /// `Self::Jne(a)` jumps to the address in `a` if the equal flag is clear.
    Jne(Register) = 0b0101_0110,
    /// `Self::Jgt(a)` jumps to the address in `a` if the greater-than flag is
    /// set.
    Jgt(Register) = 0b0101_0111,
    /// `Self::Jlt(a)` jumps to the address in `a` if the less-than flag is
    /// set.
    Jlt(Register) = 0b0101_1000,
    /// `Self::Jle(a)` jumps to the address in `a` if either the less-than or
    /// the equal flag is set.
    Jle(Register) = 0b0101_1001,
    /// `Self::Jge(a)` jumps to the address in `a` if either the greater-than
    /// or the equal flag is set.
    Jge(Register) = 0b0101_1010,
    Inc(Register) = 0b0110_0101,
    Dec(Register) = 0b0110_0110,
    Not(Register) = 0b0110_1001,
    /// `Self::Ldi(a, i)` loads `i` into `a`.
    Ldi(Register, Immediate) = 0b1000_0010,
    /// `Self::Ld(a, b)` loads the memory at the address in `b` into `a`.
    Ld(Register, Register) = 0b1000_0011,
    /// `Self::St(a, b)` stores `b` in memory at the address in `a`.
    St(Register, Register) = 0b1000_0100,
    Add(Register, Register) = 0b1010_0000,
    Sub(Register, Register) = 0b1010_0001,
    Mul(Register, Register) = 0b1010_0010,
    Div(Register, Register) = 0b1010_0011,
    Mod(Register, Register) = 0b1010_0100,
    /// `Self::Cmp(a, b)` compares `a` with `b` and sets the flags.
    Cmp(Register, Register) = 0b1010_0111,
    And(Register, Register) = 0b1010_1000,
    Or(Register, Register) = 0b1010_1010,
    Xor(Register, Register) = 0b1010_1011,
    Shl(Register, Register) = 0b1010_1100,
    Shr(Register, Register) = 0b1010_1101,
}

macro_rules! one {
    ($arg:ident) => {
        1
    };
}

/// Generates [`Op::decode`] and [`Op::encode_into`] from a list of variants,
/// where each field is bound to the first (`$a`) or second (`$b`) operand
/// byte. Every opcode's operand count is checked against its fields.
macro_rules! opcode_table {
    (
        $ir:ident, $a:ident, $b:ident;
        $($name:ident $(($($arg:ident),*))?),* $(,)?
    ) => {
        paste! {
            $(
                const_assert_eq!(
                    operand_count(Op::[<$name:upper _TAG>]),
                    0 $($(+ one!($arg))*)?
                );
            )*

            impl Op {
                /// Decodes the operation with opcode `ir`, given the two bytes
                /// that follow it in memory.
                pub fn decode(
                    $ir: RawOpCode,
                    $a: Word,
                    $b: Word,
                ) -> Option<Self> {
                    let _ = ($a, $b);
                    match $ir {
                        $(
                            Self::[<$name:upper _TAG>] => {
                                Some(Self::$name $(($($arg),*))?)
                            }
                        )*
                        _ => None,
                    }
                }

                /// Appends the bytes of this operation to `stream`.
                pub fn encode_into(&self, stream: &mut Vec<Word>) {
                    stream.push(self.tag());
                    match *self {
                        $(
                            Self::$name $(($($arg),*))? => {
                                $($(stream.push($arg);)*)?
                            }
                        )*
                    }
                }
            }
        }
    };
}

opcode_table! {
    ir, a, b;
    Nop, Hlt, Ret, Iret,
    Push(a), Pop(a), Prn(a), Pra(a),
    Call(a), Int(a),
    Jmp(a), Jeq(a), Jne(a), Jgt(a), Jlt(a), Jle(a), Jge(a),
    Inc(a), Dec(a), Not(a),
    Ldi(a, b), Ld(a, b), St(a, b),
    Add(a, b), Sub(a, b), Mul(a, b), Div(a, b), Mod(a, b), Cmp(a, b),
    And(a, b), Or(a, b), Xor(a, b), Shl(a, b), Shr(a, b),
}

impl Op {
    pub const fn opcode(&self) -> RawOpCode {
        self.tag()
    }

    /// Size in bytes of this operation once encoded.
    pub const fn size(&self) -> usize {
        instruction_length(self.opcode())
    }

    /// Encodes this operation on its own.
    pub fn encode(&self) -> Vec<Word> {
        let mut bytes = Vec::with_capacity(self.size());
        self.encode_into(&mut bytes);
        bytes
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.encode();
        f.write_str(self.mnemonic())?;
        match (self, &bytes[1..]) {
            (Self::Ldi(..), [register, value]) => {
                write!(f, " R{},{}", register, value)
            }
            (_, [register]) => write!(f, " R{}", register),
            (_, [first, second]) => write!(f, " R{},R{}", first, second),
            _ => Ok(()),
        }
    }
}
