//! P-machine runtime.
//!
//! Executes the instruction sequence produced by [`crate::gen`] against a
//! bounded evaluation stack. Activation records are four slots of
//! bookkeeping (functional value, static link, dynamic link, return
//! address) followed by the frame's variables, which is why variable
//! slot numbers start at 4. Block entry reserves only the bookkeeping
//! slots; the frame grows to cover a variable the first time it is
//! stored. `base` walks static links to reach the frame of an enclosing
//! declaration level.

use std::fmt;
use std::io::{self, BufRead, Write};

use crate::code::Code;
use crate::isa::{Instruction, Opcode};

/// Highest stack cell the machine may touch.
pub const MAX_STACK_HEIGHT: usize = 2000;

#[derive(Debug)]
pub enum VmError {
    StackOverflow,
    /// A load or store reached outside the live stack.
    InvalidAddress,
    /// `pc` left the instruction sequence without halting.
    PcOutOfRange(usize),
    DivideByZero,
    /// `read` got something that is not an integer.
    BadInput(String),
    Io(io::Error),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::StackOverflow => write!(f, "stack overflow"),
            VmError::InvalidAddress => write!(f, "stack address out of range"),
            VmError::PcOutOfRange(pc) => write!(f, "program counter {} out of range", pc),
            VmError::DivideByZero => write!(f, "division by zero"),
            VmError::BadInput(text) => write!(f, "invalid input '{}': expected an integer", text),
            VmError::Io(err) => write!(f, "i/o error: {}", err),
        }
    }
}

impl std::error::Error for VmError {}

impl From<io::Error> for VmError {
    fn from(err: io::Error) -> Self {
        VmError::Io(err)
    }
}

pub struct Vm<'c> {
    code: &'c [Instruction],
    /// 1-indexed evaluation stack; cell 0 is never used.
    stack: Vec<i64>,
    pc: usize,
    bp: usize,
    sp: usize,
    halted: bool,
}

impl<'c> Vm<'c> {
    pub fn new(code: &'c Code) -> Self {
        Self {
            code: code.instructions(),
            stack: vec![0; MAX_STACK_HEIGHT + 1],
            pc: 0,
            bp: 1,
            sp: 0,
            halted: false,
        }
    }

    /// Run to halt, pulling `read` values from `input` and printing
    /// `write` values to `output`, one per line.
    pub fn run(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Result<(), VmError> {
        while !self.halted {
            self.step(input, output)?;
        }
        Ok(())
    }

    fn step(
        &mut self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<(), VmError> {
        let ins = *self
            .code
            .get(self.pc)
            .ok_or(VmError::PcOutOfRange(self.pc))?;
        self.pc += 1;

        match ins.op {
            Opcode::Lit => self.push(ins.m)?,
            Opcode::Jpc => {
                if self.pop()? == 0 {
                    self.pc = ins.m as usize;
                }
            }
            Opcode::Lod => {
                let addr = self.base(ins.l)? + ins.m as usize;
                let value = self.load(addr)?;
                self.push(value)?;
            }
            Opcode::Sto => {
                let addr = self.base(ins.l)? + ins.m as usize;
                let value = self.pop()?;
                self.store(addr, value)?;
                // Variable slots sit past the four-slot frame preamble the
                // generator reserves; a store above the stack top claims
                // the slot so later pushes cannot clobber it.
                if addr > self.sp {
                    self.sp = addr;
                }
            }
            Opcode::Cal => {
                if self.sp + 4 > MAX_STACK_HEIGHT {
                    return Err(VmError::StackOverflow);
                }
                let static_link = self.base(ins.l)? as i64;
                self.store(self.sp + 1, 0)?; // functional value
                self.store(self.sp + 2, static_link)?;
                self.store(self.sp + 3, self.bp as i64)?;
                self.store(self.sp + 4, self.pc as i64)?;
                self.bp = self.sp + 1;
                self.pc = ins.m as usize;
            }
            Opcode::Inc => {
                let grown = self.sp as i64 + ins.m;
                if grown < 0 || grown as usize > MAX_STACK_HEIGHT {
                    return Err(VmError::StackOverflow);
                }
                self.sp = grown as usize;
            }
            Opcode::Jmp => self.pc = ins.m as usize,
            Opcode::Rtn => {
                self.sp = self.bp - 1;
                self.pc = self.load(self.sp + 4)? as usize;
                self.bp = self.load(self.sp + 3)? as usize;
                // Returning with no caller frame ends the program.
                if self.bp == 0 {
                    self.halted = true;
                }
            }
            Opcode::SioWrite => {
                let value = self.pop()?;
                writeln!(output, "{}", value)?;
            }
            Opcode::SioRead => {
                let mut line = String::new();
                input.read_line(&mut line)?;
                let text = line.trim();
                let value = text
                    .parse::<i64>()
                    .map_err(|_| VmError::BadInput(text.to_string()))?;
                self.push(value)?;
            }
            Opcode::SioHalt => self.halted = true,
            Opcode::Neg => {
                let value = self.pop()?;
                self.push(value.wrapping_neg())?;
            }
            Opcode::Add => self.binary(|a, b| Ok(a.wrapping_add(b)))?,
            Opcode::Sub => self.binary(|a, b| Ok(a.wrapping_sub(b)))?,
            Opcode::Mul => self.binary(|a, b| Ok(a.wrapping_mul(b)))?,
            Opcode::Div => self.binary(|a, b| {
                if b == 0 {
                    Err(VmError::DivideByZero)
                } else {
                    Ok(a.wrapping_div(b))
                }
            })?,
            Opcode::Odd => {
                let value = self.pop()?;
                self.push(value & 1)?;
            }
            Opcode::Eql => self.binary(|a, b| Ok((a == b) as i64))?,
            Opcode::Neq => self.binary(|a, b| Ok((a != b) as i64))?,
            Opcode::Lss => self.binary(|a, b| Ok((a < b) as i64))?,
            Opcode::Leq => self.binary(|a, b| Ok((a <= b) as i64))?,
            Opcode::Gtr => self.binary(|a, b| Ok((a > b) as i64))?,
            Opcode::Geq => self.binary(|a, b| Ok((a >= b) as i64))?,
        }
        Ok(())
    }

    /// Frame base of the declaration `l` static levels out.
    fn base(&self, l: i32) -> Result<usize, VmError> {
        let mut b = self.bp;
        for _ in 0..l {
            b = self.load(b + 1)? as usize;
        }
        Ok(b)
    }

    fn push(&mut self, value: i64) -> Result<(), VmError> {
        if self.sp >= MAX_STACK_HEIGHT {
            return Err(VmError::StackOverflow);
        }
        self.sp += 1;
        self.stack[self.sp] = value;
        Ok(())
    }

    fn pop(&mut self) -> Result<i64, VmError> {
        if self.sp == 0 {
            return Err(VmError::InvalidAddress);
        }
        let value = self.stack[self.sp];
        self.sp -= 1;
        Ok(value)
    }

    fn binary(&mut self, f: impl FnOnce(i64, i64) -> Result<i64, VmError>) -> Result<(), VmError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = f(a, b)?;
        self.push(result)
    }

    fn load(&self, addr: usize) -> Result<i64, VmError> {
        self.stack.get(addr).copied().ok_or(VmError::InvalidAddress)
    }

    fn store(&mut self, addr: usize, value: i64) -> Result<(), VmError> {
        match self.stack.get_mut(addr) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(VmError::InvalidAddress),
        }
    }
}
