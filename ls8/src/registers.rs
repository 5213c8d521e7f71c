// Copyright (C) 2024 Ethan Uppal. All rights reserved.

use crate::arch::{Register, Word, REGISTER_COUNT, STACK_POINTER, STACK_START};

/// `R0` through `R7`. `R7` holds the stack pointer.
#[derive(Clone)]
pub struct Registers {
    values: [Word; REGISTER_COUNT],
}

/// A register index past `R7`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidRegister(pub Register);

impl Default for Registers {
    fn default() -> Self {
        let mut values = [0; REGISTER_COUNT];
        values[STACK_POINTER as usize] = STACK_START;
        Self { values }
    }
}

impl Registers {
    pub fn get(&self, register: Register) -> Result<Word, InvalidRegister> {
        self.values
            .get(register as usize)
            .copied()
            .ok_or(InvalidRegister(register))
    }

    pub fn set(
        &mut self,
        register: Register,
        value: Word,
    ) -> Result<(), InvalidRegister> {
        let slot = self
            .values
            .get_mut(register as usize)
            .ok_or(InvalidRegister(register))?;
        *slot = value;
        Ok(())
    }

    pub fn stack_pointer(&self) -> Word {
        self.values[STACK_POINTER as usize]
    }

    pub fn set_stack_pointer(&mut self, value: Word) {
        self.values[STACK_POINTER as usize] = value;
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.values
    }
}
