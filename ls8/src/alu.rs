// Copyright (C) 2024 Ethan Uppal. All rights reserved.

use std::{cmp::Ordering, fmt};

use bitflags::bitflags;
use num_traits::{
    CheckedDiv, CheckedRem, CheckedShl, CheckedShr, PrimInt, WrappingAdd,
    WrappingMul, WrappingSub,
};
use static_assertions::const_assert_eq;

use crate::op::{Op, IDENTIFIER_MASK};

bitflags! {
    /// The `FL` register, laid out as `0b00000LGE`.
    ///
    /// Only [`AluOp::Cmp`] writes it, and it always writes all three bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Flags: u8 {
        /// The operands were equal.
        const EQUAL = 1 << 0;
        /// The first operand was greater than the second.
        const GREATER = 1 << 1;
        /// The first operand was less than the second.
        const LESS = 1 << 2;
    }
}

impl Flags {
    /// The flags describing `ordering` of the first operand relative to the
    /// second.
    pub const fn from_ordering(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Self::LESS,
            Ordering::Equal => Self::EQUAL,
            Ordering::Greater => Self::GREATER,
        }
    }
}

/// An ALU operation. The discriminant is the identifier in the low four bits
/// of the operation's opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AluOp {
    Add = 0x0,
    Sub = 0x1,
    Mul = 0x2,
    Div = 0x3,
    Mod = 0x4,
    Inc = 0x5,
    Dec = 0x6,
    Cmp = 0x7,
    And = 0x8,
    Not = 0x9,
    Or = 0xA,
    Xor = 0xB,
    Shl = 0xC,
    Shr = 0xD,
}

const_assert_eq!(Op::ADD_TAG & IDENTIFIER_MASK, AluOp::Add as u8);
const_assert_eq!(Op::SUB_TAG & IDENTIFIER_MASK, AluOp::Sub as u8);
const_assert_eq!(Op::MUL_TAG & IDENTIFIER_MASK, AluOp::Mul as u8);
const_assert_eq!(Op::DIV_TAG & IDENTIFIER_MASK, AluOp::Div as u8);
const_assert_eq!(Op::MOD_TAG & IDENTIFIER_MASK, AluOp::Mod as u8);
const_assert_eq!(Op::INC_TAG & IDENTIFIER_MASK, AluOp::Inc as u8);
const_assert_eq!(Op::DEC_TAG & IDENTIFIER_MASK, AluOp::Dec as u8);
const_assert_eq!(Op::CMP_TAG & IDENTIFIER_MASK, AluOp::Cmp as u8);
const_assert_eq!(Op::AND_TAG & IDENTIFIER_MASK, AluOp::And as u8);
const_assert_eq!(Op::NOT_TAG & IDENTIFIER_MASK, AluOp::Not as u8);
const_assert_eq!(Op::OR_TAG & IDENTIFIER_MASK, AluOp::Or as u8);
const_assert_eq!(Op::XOR_TAG & IDENTIFIER_MASK, AluOp::Xor as u8);
const_assert_eq!(Op::SHL_TAG & IDENTIFIER_MASK, AluOp::Shl as u8);
const_assert_eq!(Op::SHR_TAG & IDENTIFIER_MASK, AluOp::Shr as u8);

impl AluOp {
    /// The operation named by the low four bits of an ALU opcode, if any.
    pub const fn from_identifier(identifier: u8) -> Option<Self> {
        Some(match identifier & IDENTIFIER_MASK {
            0x0 => Self::Add,
            0x1 => Self::Sub,
            0x2 => Self::Mul,
            0x3 => Self::Div,
            0x4 => Self::Mod,
            0x5 => Self::Inc,
            0x6 => Self::Dec,
            0x7 => Self::Cmp,
            0x8 => Self::And,
            0x9 => Self::Not,
            0xA => Self::Or,
            0xB => Self::Xor,
            0xC => Self::Shl,
            0xD => Self::Shr,
            _ => return None,
        })
    }

    /// Whether the operation reads a second register.
    pub const fn is_binary(self) -> bool {
        !matches!(self, Self::Inc | Self::Dec | Self::Not)
    }
}

/// What an ALU operation produces: either a new value for its first
/// register, or new flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOutput<W> {
    Value(W),
    Flags(Flags),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluError {
    DivisionByZero,
}

impl fmt::Display for AluError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivisionByZero => f.write_str("division by zero"),
        }
    }
}

impl std::error::Error for AluError {}

/// Applies `op` to `first` and `second`. Unary operations ignore `second`.
///
/// Arithmetic wraps at the width of `W`, division truncates, and shifting by
/// the width of `W` or more produces zero.
pub fn apply<
    W: PrimInt
        + WrappingAdd
        + WrappingSub
        + WrappingMul
        + CheckedDiv
        + CheckedRem
        + CheckedShl
        + CheckedShr,
>(
    op: AluOp,
    first: W,
    second: W,
) -> Result<AluOutput<W>, AluError> {
    let value = match op {
        AluOp::Add => first.wrapping_add(&second),
        AluOp::Sub => first.wrapping_sub(&second),
        AluOp::Mul => first.wrapping_mul(&second),
        AluOp::Div => first
            .checked_div(&second)
            .ok_or(AluError::DivisionByZero)?,
        AluOp::Mod => first
            .checked_rem(&second)
            .ok_or(AluError::DivisionByZero)?,
        AluOp::Inc => first.wrapping_add(&W::one()),
        AluOp::Dec => first.wrapping_sub(&W::one()),
        AluOp::Cmp => {
            return Ok(AluOutput::Flags(Flags::from_ordering(
                first.cmp(&second),
            )))
        }
        AluOp::And => first & second,
        AluOp::Not => !first,
        AluOp::Or => first | second,
        AluOp::Xor => first ^ second,
        AluOp::Shl => first
            .checked_shl(shift_amount(second))
            .unwrap_or_else(W::zero),
        AluOp::Shr => first
            .checked_shr(shift_amount(second))
            .unwrap_or_else(W::zero),
    };
    Ok(AluOutput::Value(value))
}

fn shift_amount<W: PrimInt>(amount: W) -> u32 {
    amount.to_u32().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use crate::{
        alu::{apply, AluError, AluOp, AluOutput, Flags},
        arch::Word,
    };

    const SAMPLES: [Word; 8] = [0, 1, 2, 7, 100, 127, 128, 255];

    fn value(op: AluOp, first: Word, second: Word) -> Word {
        match apply(op, first, second) {
            Ok(AluOutput::Value(value)) => value,
            other => panic!("expected a value from {:?}, got {:?}", op, other),
        }
    }

    #[test]
    fn arithmetic_wraps_modulo_256() {
        for x in SAMPLES {
            for y in SAMPLES {
                let (wide_x, wide_y) = (x as u32, y as u32);
                assert_eq!((wide_x + wide_y) % 256, value(AluOp::Add, x, y) as u32);
                assert_eq!(
                    (wide_x + 256 - wide_y) % 256,
                    value(AluOp::Sub, x, y) as u32
                );
                assert_eq!((wide_x * wide_y) % 256, value(AluOp::Mul, x, y) as u32);
            }
            assert_eq!(((x as u32 + 1) % 256) as Word, value(AluOp::Inc, x, 0));
            assert_eq!(
                ((x as u32 + 255) % 256) as Word,
                value(AluOp::Dec, x, 0)
            );
        }
    }

    #[test]
    fn division_truncates() {
        assert_eq!(3, value(AluOp::Div, 10, 3));
        assert_eq!(1, value(AluOp::Mod, 10, 3));
        assert_eq!(0, value(AluOp::Div, 2, 255));
        assert_eq!(
            Err(AluError::DivisionByZero),
            apply(AluOp::Div, 10 as Word, 0)
        );
        assert_eq!(
            Err(AluError::DivisionByZero),
            apply(AluOp::Mod, 10 as Word, 0)
        );
    }

    #[test]
    fn bitwise_operations() {
        assert_eq!(0b1000, value(AluOp::And, 0b1100, 0b1010));
        assert_eq!(0b1110, value(AluOp::Or, 0b1100, 0b1010));
        assert_eq!(0b0110, value(AluOp::Xor, 0b1100, 0b1010));
        assert_eq!(0b1111_0000, value(AluOp::Not, 0b0000_1111, 0));
        assert_eq!(0b1010_0000, value(AluOp::Shl, 0b0101_0000, 1));
        assert_eq!(0b0010_1000, value(AluOp::Shr, 0b0101_0000, 1));
        assert_eq!(0, value(AluOp::Shl, 0xFF, 8));
        assert_eq!(0, value(AluOp::Shr, 0xFF, 200));
    }

    #[test]
    fn compare_sets_exactly_one_flag() {
        for x in SAMPLES {
            for y in SAMPLES {
                let flags = match apply(AluOp::Cmp, x, y) {
                    Ok(AluOutput::Flags(flags)) => flags,
                    other => panic!("expected flags, got {:?}", other),
                };
                assert_eq!(1, flags.bits().count_ones());
                assert_eq!(x == y, flags.contains(Flags::EQUAL));
                assert_eq!(x < y, flags.contains(Flags::LESS));
                assert_eq!(x > y, flags.contains(Flags::GREATER));
            }
        }
    }

    #[test]
    fn compare_is_unsigned() {
        assert_eq!(
            Ok(AluOutput::Flags(Flags::GREATER)),
            apply(AluOp::Cmp, 0x80 as Word, 0x01)
        );
        assert_eq!(Flags::LESS, Flags::from_ordering(Ordering::Less));
    }

    #[test]
    fn identifiers_name_operations() {
        assert_eq!(Some(AluOp::Add), AluOp::from_identifier(0x0));
        assert_eq!(Some(AluOp::Shr), AluOp::from_identifier(0xD));
        assert_eq!(Some(AluOp::Inc), AluOp::from_identifier(0b1010_0101));
        assert_eq!(None, AluOp::from_identifier(0xE));
        assert_eq!(None, AluOp::from_identifier(0xF));
    }

    #[test]
    fn unary_operations_are_marked() {
        assert!(!AluOp::Inc.is_binary());
        assert!(!AluOp::Not.is_binary());
        assert!(AluOp::Cmp.is_binary());
    }
}
