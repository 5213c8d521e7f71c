// Copyright (C) 2024 Ethan Uppal. All rights reserved.

use static_assertions::const_assert;

/// Width of a register, a memory cell, and an instruction byte.
pub type Word = u8;
pub type Address = u8;
pub type Register = u8;
pub type Immediate = u8;

/// Smallest sized integer type that can fit an op code.
pub type RawOpCode = u8;

pub const MEMORY_SIZE: usize = 256;
const_assert!(MEMORY_SIZE == 1 << Address::BITS);

pub const REGISTER_COUNT: usize = 8;
const_assert!(REGISTER_COUNT <= 1 << Register::BITS);

/// Register reserved as the stack pointer.
pub const STACK_POINTER: Register = 7;
const_assert!((STACK_POINTER as usize) < REGISTER_COUNT);

/// Initial value of the stack pointer. The stack grows downward from here.
pub const STACK_START: Address = 0xF4;
const_assert!((STACK_START as usize) < MEMORY_SIZE);
