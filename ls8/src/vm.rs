// Copyright (C) 2024 Ethan Uppal. All rights reserved.

use std::{fmt, io, io::Write};

use crate::{
    alu::{self, AluError, AluOp, AluOutput, Flags},
    arch::{Address, RawOpCode, Register, Word, MEMORY_SIZE},
    memory::Memory,
    op::{instruction_length, is_alu, sets_pc, Op},
    registers::{InvalidRegister, Registers},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Running,
    Halted,
}

#[derive(Debug)]
pub enum VMError {
    /// No instruction has this opcode.
    UnknownOpcode { opcode: RawOpCode, pc: Address },
    /// The opcode is marked as an ALU operation, but its low four bits name
    /// no operation of the ALU.
    UnsupportedOperation { opcode: RawOpCode, pc: Address },
    /// An operand named a register past `R7`.
    InvalidRegister(Register),
    DivisionByZero,
    ProgramTooLarge(usize),
    StepLimitExceeded(u64),
    Output(io::Error),
}

pub type VMResult = Result<(), VMError>;

impl fmt::Display for VMError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode { opcode, pc } => {
                write!(f, "unknown opcode {:08b} at address {:#04x}", opcode, pc)
            }
            Self::UnsupportedOperation { opcode, pc } => write!(
                f,
                "unsupported ALU operation {:08b} at address {:#04x}",
                opcode, pc
            ),
            Self::InvalidRegister(register) => {
                write!(f, "no such register R{}", register)
            }
            Self::DivisionByZero => f.write_str("division by zero"),
            Self::ProgramTooLarge(size) => write!(
                f,
                "program is {} bytes but memory only holds {}",
                size, MEMORY_SIZE
            ),
            Self::StepLimitExceeded(limit) => {
                write!(f, "program did not halt within {} steps", limit)
            }
            Self::Output(error) => write!(f, "failed to write output: {}", error),
        }
    }
}

impl std::error::Error for VMError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Output(error) => Some(error),
            _ => None,
        }
    }
}

impl From<InvalidRegister> for VMError {
    fn from(value: InvalidRegister) -> Self {
        VMError::InvalidRegister(value.0)
    }
}

impl From<AluError> for VMError {
    fn from(value: AluError) -> Self {
        match value {
            AluError::DivisionByZero => VMError::DivisionByZero,
        }
    }
}

impl From<io::Error> for VMError {
    fn from(value: io::Error) -> Self {
        VMError::Output(value)
    }
}

/// An LS-8 machine writing `PRN` and `PRA` output to `W`.
pub struct VM<W: Write> {
    memory: Memory,
    registers: Registers,
    flags: Flags,
    pc: Address,
    state: State,
    steps: u64,
    max_steps: Option<u64>,
    output: W,
}

impl<W: Write> VM<W> {
    pub fn new(output: W) -> Self {
        Self {
            memory: Memory::default(),
            registers: Registers::default(),
            flags: Flags::empty(),
            pc: 0,
            state: State::Running,
            steps: 0,
            max_steps: None,
            output,
        }
    }

    /// Creates a [`VM`] with `image` loaded at address zero.
    pub fn from_image(image: &[Word], output: W) -> Result<Self, VMError> {
        let mut vm = Self::new(output);
        vm.load(image)?;
        Ok(vm)
    }

    /// Loads `image` at address zero and resets the machine.
    pub fn load(&mut self, image: &[Word]) -> VMResult {
        self.memory
            .load(image)
            .ok_or(VMError::ProgramTooLarge(image.len()))?;
        self.registers = Registers::default();
        self.flags = Flags::empty();
        self.pc = 0;
        self.state = State::Running;
        self.steps = 0;
        log::debug!("loaded {} byte program", image.len());
        Ok(())
    }

    /// Makes [`VM::step`] fail once `limit` instructions have run. `None`
    /// removes the limit.
    pub fn set_max_steps(&mut self, limit: Option<u64>) {
        self.max_steps = limit;
    }

    /// Runs the [`VM`] until it halts.
    pub fn run(&mut self) -> VMResult {
        while self.state == State::Running {
            self.step()?;
        }
        log::debug!("halted after {} steps", self.steps);
        Ok(())
    }

    /// Executes the instruction at the program counter. Does nothing once
    /// halted.
    pub fn step(&mut self) -> VMResult {
        if self.state == State::Halted {
            return Ok(());
        }
        if let Some(limit) = self.max_steps {
            if self.steps >= limit {
                return Err(VMError::StepLimitExceeded(limit));
            }
        }
        self.steps += 1;
        log::trace!("{}", self.trace());

        let (ir, a, b) = self.fetch();
        let op = self.decode(ir, a, b)?;

        if op == Op::Hlt {
            self.state = State::Halted;
            return Ok(());
        }

        self.execute(op)?;

        if !sets_pc(ir) {
            self.advance(ir);
        }
        Ok(())
    }

    /// Reads the opcode and both operand slots, whether or not the
    /// instruction uses them.
    fn fetch(&self) -> (RawOpCode, Word, Word) {
        (
            self.memory.read(self.pc),
            self.memory.read(self.pc.wrapping_add(1)),
            self.memory.read(self.pc.wrapping_add(2)),
        )
    }

    fn decode(&self, ir: RawOpCode, a: Word, b: Word) -> Result<Op, VMError> {
        Op::decode(ir, a, b).ok_or(if is_alu(ir)
            && AluOp::from_identifier(ir).is_none()
        {
            VMError::UnsupportedOperation {
                opcode: ir,
                pc: self.pc,
            }
        } else {
            VMError::UnknownOpcode {
                opcode: ir,
                pc: self.pc,
            }
        })
    }

    fn execute(&mut self, op: Op) -> VMResult {
        match op {
            Op::Nop | Op::Hlt => {}
            Op::Ldi(to, value) => self.registers.set(to, value)?,
            Op::Ld(to, from) => {
                let address = self.registers.get(from)?;
                self.registers.set(to, self.memory.read(address))?;
            }
            Op::St(to, from) => {
                let address = self.registers.get(to)?;
                let value = self.registers.get(from)?;
                self.memory.write(address, value);
            }
            Op::Prn(register) => {
                writeln!(self.output, "{}", self.registers.get(register)?)?
            }
            Op::Pra(register) => {
                let value = self.registers.get(register)?;
                write!(self.output, "{}", value as char)?;
            }
            Op::Push(register) => {
                let value = self.registers.get(register)?;
                self.push(value);
            }
            Op::Pop(register) => {
                // the stack pointer moves before the destination is checked
                let value = self.pop();
                self.registers.set(register, value)?;
            }
            Op::Call(register) => {
                let target = self.registers.get(register)?;
                self.push(self.pc.wrapping_add(2));
                self.pc = target;
            }
            Op::Ret => self.pc = self.pop(),
            Op::Jmp(register) => self.pc = self.registers.get(register)?,
            Op::Jeq(register) => {
                self.jump_if(self.flags.contains(Flags::EQUAL), register, op)?
            }
            Op::Jne(register) => {
                self.jump_if(!self.flags.contains(Flags::EQUAL), register, op)?
            }
            Op::Jgt(register) => {
                self.jump_if(self.flags.contains(Flags::GREATER), register, op)?
            }
            Op::Jlt(register) => {
                self.jump_if(self.flags.contains(Flags::LESS), register, op)?
            }
            Op::Jge(register) => self.jump_if(
                self.flags.intersects(Flags::GREATER | Flags::EQUAL),
                register,
                op,
            )?,
            Op::Jle(register) => self.jump_if(
                self.flags.intersects(Flags::LESS | Flags::EQUAL),
                register,
                op,
            )?,
            Op::Int(_) | Op::Iret => {
                log::warn!("interrupts are not supported, ignoring `{}`", op);
                self.advance(op.opcode());
            }
            Op::Add(a, b) => self.alu(AluOp::Add, a, b)?,
            Op::Sub(a, b) => self.alu(AluOp::Sub, a, b)?,
            Op::Mul(a, b) => self.alu(AluOp::Mul, a, b)?,
            Op::Div(a, b) => self.alu(AluOp::Div, a, b)?,
            Op::Mod(a, b) => self.alu(AluOp::Mod, a, b)?,
            Op::Cmp(a, b) => self.alu(AluOp::Cmp, a, b)?,
            Op::And(a, b) => self.alu(AluOp::And, a, b)?,
            Op::Or(a, b) => self.alu(AluOp::Or, a, b)?,
            Op::Xor(a, b) => self.alu(AluOp::Xor, a, b)?,
            Op::Shl(a, b) => self.alu(AluOp::Shl, a, b)?,
            Op::Shr(a, b) => self.alu(AluOp::Shr, a, b)?,
            Op::Inc(a) => self.alu(AluOp::Inc, a, a)?,
            Op::Dec(a) => self.alu(AluOp::Dec, a, a)?,
            Op::Not(a) => self.alu(AluOp::Not, a, a)?,
        }
        Ok(())
    }

    fn alu(&mut self, op: AluOp, a: Register, b: Register) -> VMResult {
        let first = self.registers.get(a)?;
        let second = if op.is_binary() {
            self.registers.get(b)?
        } else {
            0
        };
        match alu::apply(op, first, second)? {
            AluOutput::Value(value) => self.registers.set(a, value)?,
            AluOutput::Flags(flags) => self.flags = flags,
        }
        Ok(())
    }

    fn jump_if(
        &mut self,
        condition: bool,
        register: Register,
        op: Op,
    ) -> VMResult {
        if condition {
            self.pc = self.registers.get(register)?;
        } else {
            self.advance(op.opcode());
        }
        Ok(())
    }

    fn advance(&mut self, opcode: RawOpCode) {
        self.pc = self.pc.wrapping_add(instruction_length(opcode) as Address);
    }

    fn push(&mut self, value: Word) {
        let top = self.registers.stack_pointer().wrapping_sub(1);
        self.registers.set_stack_pointer(top);
        self.memory.write(top, value);
    }

    fn pop(&mut self) -> Word {
        let top = self.registers.stack_pointer();
        self.registers.set_stack_pointer(top.wrapping_add(1));
        self.memory.read(top)
    }

    /// One line describing the machine before the next instruction:
    /// `TRACE: PC | FL | IR A B | R0 .. R7`.
    pub fn trace(&self) -> String {
        let (ir, a, b) = self.fetch();
        let mut line = format!(
            "TRACE: {:02X} | {:02X} | {:02X} {:02X} {:02X} |",
            self.pc,
            self.flags.bits(),
            ir,
            a,
            b
        );
        for value in self.registers.as_slice() {
            line.push_str(&format!(" {:02X}", value));
        }
        line
    }

    pub fn pc(&self) -> Address {
        self.pc
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == State::Halted
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
