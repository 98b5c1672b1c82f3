use std::fmt;
use std::io::{self, Write};

use crate::error::GenError;
use crate::isa::{Instruction, Opcode};

/// Most instructions one generation run may emit.
pub const MAX_CODE_LEN: usize = 500;

/// The bounded instruction vector.
///
/// Indices are dense and assigned in emission order starting at 0.
/// Already-emitted instructions are never removed, but their `m` field
/// may be rewritten once to resolve a forward jump.
#[derive(Default, Debug)]
pub struct Code {
    instructions: Vec<Instruction>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one instruction, returning its index.
    pub fn emit(&mut self, op: Opcode, r: i32, l: i32, m: i64) -> Result<usize, GenError> {
        if self.instructions.len() >= MAX_CODE_LEN {
            return Err(GenError::CodeOverflow);
        }
        self.instructions.push(Instruction::new(op, r, l, m));
        Ok(self.instructions.len() - 1)
    }

    /// Rewrite the `m` field of an already-emitted instruction.
    pub fn patch(&mut self, index: usize, m: i64) {
        self.instructions[index].m = m;
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Write the listing in the loader format, one instruction per line.
    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        for ins in &self.instructions {
            writeln!(w, "{}", ins)?;
        }
        Ok(())
    }

    /// Human-oriented listing with indices and mnemonics.
    pub fn disassemble(&self) -> String {
        use fmt::Write as _;
        let mut out = String::new();
        for (i, ins) in self.instructions.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:04}  {:<9} {} {} {}",
                i,
                ins.op.mnemonic(),
                ins.r,
                ins.l,
                ins.m
            );
        }
        out
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ins in &self.instructions {
            writeln!(f, "{}", ins)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_returns_dense_indices() {
        let mut code = Code::new();
        assert_eq!(code.emit(Opcode::Jmp, 0, 0, 0).unwrap(), 0);
        assert_eq!(code.emit(Opcode::Inc, 0, 0, 4).unwrap(), 1);
        assert_eq!(code.emit(Opcode::Rtn, 0, 0, 0).unwrap(), 2);
        assert_eq!(code.len(), 3);
    }

    #[test]
    fn test_patch_rewrites_m_only() {
        let mut code = Code::new();
        let jump = code.emit(Opcode::Jmp, 0, 0, 0).unwrap();
        code.emit(Opcode::Inc, 0, 0, 4).unwrap();
        code.patch(jump, 1);
        let patched = code.get(jump).unwrap();
        assert_eq!(patched.op, Opcode::Jmp);
        assert_eq!(patched.m, 1);
    }

    #[test]
    fn test_capacity_overflow() {
        let mut code = Code::new();
        for _ in 0..MAX_CODE_LEN {
            code.emit(Opcode::Lit, 0, 0, 0).unwrap();
        }
        assert_eq!(
            code.emit(Opcode::Lit, 0, 0, 0),
            Err(GenError::CodeOverflow)
        );
        assert_eq!(code.len(), MAX_CODE_LEN);
    }

    #[test]
    fn test_display_is_loader_format() {
        let mut code = Code::new();
        code.emit(Opcode::Lit, 0, 0, 42).unwrap();
        code.emit(Opcode::SioHalt, 0, 0, 3).unwrap();
        assert_eq!(code.to_string(), "1 0 0 42\n11 0 0 3\n");
    }

    #[test]
    fn test_write_to_matches_display() {
        let mut code = Code::new();
        code.emit(Opcode::Lit, 0, 0, 7).unwrap();
        let mut buf = Vec::new();
        code.write_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), code.to_string());
    }

    #[test]
    fn test_disassemble() {
        let mut code = Code::new();
        code.emit(Opcode::SioHalt, 0, 0, 3).unwrap();
        let listing = code.disassemble();
        assert!(listing.contains("SIO_HALT"));
        assert!(listing.starts_with("0000"));
    }
}
