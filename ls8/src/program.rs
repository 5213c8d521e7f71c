// Copyright (C) 2024 Ethan Uppal. All rights reserved.

use std::fmt;

use crate::{
    arch::{Word, MEMORY_SIZE},
    op::{instruction_length, Op},
};

/// Marks the rest of a line in a program listing as a comment.
pub const COMMENT: char = '#';

#[derive(Debug, PartialEq, Eq)]
pub enum ProgramError {
    /// Line `line` (counting from one) is not an eight-bit binary literal.
    InvalidLiteral { line: usize, text: String },
    TooLarge { size: usize },
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLiteral { line, text } => write!(
                f,
                "line {}: `{}` is not an eight-bit binary number",
                line, text
            ),
            Self::TooLarge { size } => write!(
                f,
                "program is {} bytes but memory only holds {}",
                size, MEMORY_SIZE
            ),
        }
    }
}

impl std::error::Error for ProgramError {}

pub struct EncodedProgram {
    pub body: Vec<Word>,
}

impl EncodedProgram {
    /// Reads a listing with one binary byte per line, such as `10000010`.
    /// Everything after a `#` is ignored, as are blank lines. A `0b` prefix
    /// and `_` separators are accepted; signs are not.
    pub fn parse(source: &str) -> Result<Self, ProgramError> {
        let mut body = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let text = line.split(COMMENT).next().unwrap_or_default().trim();
            if text.is_empty() {
                continue;
            }

            let invalid = || ProgramError::InvalidLiteral {
                line: index + 1,
                text: text.to_string(),
            };
            let digits = text.strip_prefix("0b").unwrap_or(text).replace('_', "");
            // `from_str_radix` would also take a leading sign
            if !digits.bytes().all(|digit| digit == b'0' || digit == b'1') {
                return Err(invalid());
            }
            let byte = Word::from_str_radix(&digits, 2).map_err(|_| invalid())?;
            body.push(byte);
        }

        if body.len() > MEMORY_SIZE {
            return Err(ProgramError::TooLarge { size: body.len() });
        }
        Ok(Self { body })
    }

    /// Decodes the program from address zero, one instruction after
    /// another. A byte that is not an opcode is returned as `Err` and
    /// decoding resumes at the next byte.
    pub fn decode(&self) -> Vec<(usize, Result<Op, Word>)> {
        let operand = |address: usize| {
            self.body.get(address).copied().unwrap_or_default()
        };

        let mut decoded = Vec::new();
        let mut address = 0;
        while address < self.body.len() {
            let ir = self.body[address];
            match Op::decode(ir, operand(address + 1), operand(address + 2)) {
                Some(op) => {
                    decoded.push((address, Ok(op)));
                    address += instruction_length(ir);
                }
                None => {
                    decoded.push((address, Err(ir)));
                    address += 1;
                }
            }
        }
        decoded
    }

    /// Writes the program back out as a listing, commenting each
    /// instruction with its assembly.
    pub fn listing(&self) -> String {
        let mut listing = String::new();
        for (address, op) in self.decode() {
            let end = match op {
                Ok(op) => (address + op.size()).min(self.body.len()),
                Err(_) => address + 1,
            };
            for (offset, byte) in self.body[address..end].iter().enumerate() {
                listing.push_str(&format!("{:08b}", byte));
                if offset == 0 {
                    match op {
                        Ok(op) => listing.push_str(&format!(
                            " {} {:02X}: {}",
                            COMMENT, address, op
                        )),
                        Err(_) => listing.push_str(&format!(
                            " {} {:02X}: data",
                            COMMENT, address
                        )),
                    }
                }
                listing.push('\n');
            }
        }
        listing
    }
}

pub struct DecodedProgram {
    pub body: Vec<Op>,
}

impl DecodedProgram {
    pub fn encode(&self) -> EncodedProgram {
        let mut body = Vec::new();
        for op in &self.body {
            op.encode_into(&mut body);
        }
        EncodedProgram { body }
    }
}
