//! Single-pass code generation.
//!
//! One recursive-descent routine per non-terminal. The routines share a
//! token cursor, the symbol table, and the instruction vector through the
//! generator; forward control flow (if/else, while, block entry) is
//! emitted as a placeholder jump whose target is patched in place once
//! the following code length is known. Expressions emit in postfix
//! order, which is exactly the evaluation order of the stack machine.

use crate::code::Code;
use crate::cursor::Cursor;
use crate::error::GenError;
use crate::isa::Opcode;
use crate::symtab::{Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::token::Token;

/// Bookkeeping slots at the base of every activation record; the first
/// variable of a frame therefore lives in slot 4.
const FRAME_HEADER: i64 = 4;

/// Generate P-machine code for a full token stream.
///
/// The first error aborts the whole run; no partial code survives.
pub fn generate(tokens: &[Token]) -> Result<Code, GenError> {
    Generator::new(tokens).program()
}

struct Generator<'t> {
    cursor: Cursor<'t>,
    table: SymbolTable,
    code: Code,
    /// Current nesting depth; 0 in the outermost block.
    level: u32,
    /// Procedure whose body is being generated, `None` at top level.
    scope: Option<SymbolId>,
}

impl<'t> Generator<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self {
            cursor: Cursor::new(tokens),
            table: SymbolTable::new(),
            code: Code::new(),
            level: 0,
            scope: None,
        }
    }

    // --- Productions ---

    /// Program = Block "." with the halt appended after a successful block.
    fn program(mut self) -> Result<Code, GenError> {
        self.block()?;
        if !self.eat(&Token::Period) {
            return Err(GenError::PeriodExpected);
        }
        self.code.emit(Opcode::SioHalt, 0, 0, 3)?;
        Ok(self.code)
    }

    /// Block = [ ConstDecl ] [ VarDecl ] { ProcDecl } Statement
    ///
    /// The leading jump skips over nested procedure bodies so that
    /// falling through (or a `CAL`) reaches this block's own frame setup.
    fn block(&mut self) -> Result<(), GenError> {
        let skip = self.code.emit(Opcode::Jmp, 0, 0, 0)?;
        let mut slot = FRAME_HEADER;
        if self.at(&Token::Const) {
            self.const_decl()?;
        }
        if self.at(&Token::Var) {
            self.var_decl(&mut slot)?;
        }
        while self.at(&Token::Procedure) {
            self.proc_decl()?;
        }
        let body = self.code.len();
        self.code.patch(skip, body as i64);
        if let Some(owner) = self.scope {
            // Calls emitted from here on land directly on the frame setup;
            // earlier calls (mutual recursion) bounce through the jump.
            self.table.set_proc_address(owner, body);
        }
        self.code.emit(Opcode::Inc, 0, 0, FRAME_HEADER)?;
        self.statement()?;
        self.code.emit(Opcode::Rtn, 0, 0, 0)?;
        Ok(())
    }

    /// ConstDecl = "const" ident "=" number { "," ident "=" number } ";"
    fn const_decl(&mut self) -> Result<(), GenError> {
        self.advance(); // const
        loop {
            let name = self.ident().ok_or(GenError::IdentExpected)?;
            if !self.eat(&Token::Eql) {
                return Err(GenError::EqualExpected);
            }
            let value = self.number()?;
            self.declare(name, SymbolKind::Const { value });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        if !self.eat(&Token::Semicolon) {
            return Err(GenError::SemicolonExpected);
        }
        Ok(())
    }

    /// VarDecl = "var" ident { "," ident } ";"
    fn var_decl(&mut self, slot: &mut i64) -> Result<(), GenError> {
        self.advance(); // var
        loop {
            let name = self.ident().ok_or(GenError::IdentExpected)?;
            self.declare(name, SymbolKind::Var { address: *slot });
            *slot += 1;
            self.code.emit(Opcode::Inc, 0, 0, 1)?;
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        if !self.eat(&Token::Semicolon) {
            return Err(GenError::SemicolonExpected);
        }
        Ok(())
    }

    /// ProcDecl = "procedure" ident ";" Block ";"
    fn proc_decl(&mut self) -> Result<(), GenError> {
        self.advance(); // procedure
        let name = self.ident().ok_or(GenError::IdentExpected)?;
        let address = self.code.len();
        let id = self.declare(name, SymbolKind::Proc { address });
        if !self.eat(&Token::Semicolon) {
            return Err(GenError::SemicolonExpected);
        }
        let enclosing = self.scope;
        self.scope = Some(id);
        self.level += 1;
        self.block()?;
        self.level -= 1;
        self.scope = enclosing;
        if !self.eat(&Token::Semicolon) {
            return Err(GenError::SemicolonExpected);
        }
        Ok(())
    }

    /// Statement dispatch; an unmatched leading token is the empty
    /// statement and succeeds without consuming anything.
    fn statement(&mut self) -> Result<(), GenError> {
        match self.cursor.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                self.assignment(&name)
            }
            Token::Call => self.call_statement(),
            Token::Begin => self.compound(),
            Token::If => self.if_statement(),
            Token::While => self.while_statement(),
            Token::Read => self.read_statement(),
            Token::Write => self.write_statement(),
            _ => Ok(()),
        }
    }

    /// ident ":=" Expression, storing through the resolved slot.
    fn assignment(&mut self, name: &str) -> Result<(), GenError> {
        let sym = self
            .table
            .lookup(name, self.scope)
            .ok_or(GenError::Undeclared)?;
        let (l, address) = match sym.kind {
            SymbolKind::Var { address } => ((self.level - sym.level) as i32, address),
            _ => return Err(GenError::NotAVariable),
        };
        if !self.eat(&Token::Becomes) {
            return Err(GenError::BecomesExpected);
        }
        self.expression()?;
        self.code.emit(Opcode::Sto, 0, l, address)?;
        Ok(())
    }

    fn call_statement(&mut self) -> Result<(), GenError> {
        self.advance(); // call
        let name = self.ident().ok_or(GenError::CallIdentExpected)?;
        let sym = self
            .table
            .lookup(&name, self.scope)
            .ok_or(GenError::Undeclared)?;
        let (l, address) = match sym.kind {
            SymbolKind::Proc { address } => ((self.level - sym.level) as i32, address),
            _ => return Err(GenError::NotAProcedure),
        };
        self.code.emit(Opcode::Cal, 0, l, address as i64)?;
        Ok(())
    }

    /// "begin" Statement { ";" Statement } "end"
    fn compound(&mut self) -> Result<(), GenError> {
        self.advance(); // begin
        self.statement()?;
        while self.eat(&Token::Semicolon) {
            self.statement()?;
        }
        if !self.eat(&Token::End) {
            return Err(GenError::EndExpected);
        }
        Ok(())
    }

    /// "if" Condition "then" Statement [ "else" Statement ]
    ///
    /// The conditional jump targets the else branch (or the join when
    /// there is none); the jump closing the then branch targets one past
    /// the else branch.
    fn if_statement(&mut self) -> Result<(), GenError> {
        self.advance(); // if
        self.condition()?;
        if !self.eat(&Token::Then) {
            return Err(GenError::ThenExpected);
        }
        let branch = self.code.emit(Opcode::Jpc, 0, 0, 0)?;
        self.statement()?;
        if self.at(&Token::Else) {
            let exit = self.code.emit(Opcode::Jmp, 0, 0, 0)?;
            self.advance();
            self.code.patch(branch, self.code.len() as i64);
            self.statement()?;
            self.code.patch(exit, self.code.len() as i64);
        } else {
            self.code.patch(branch, self.code.len() as i64);
        }
        Ok(())
    }

    /// "while" Condition "do" Statement
    fn while_statement(&mut self) -> Result<(), GenError> {
        self.advance(); // while
        let top = self.code.len();
        self.condition()?;
        let exit = self.code.emit(Opcode::Jpc, 0, 0, 0)?;
        if !self.eat(&Token::Do) {
            return Err(GenError::DoExpected);
        }
        self.statement()?;
        self.code.emit(Opcode::Jmp, 0, 0, top as i64)?;
        self.code.patch(exit, self.code.len() as i64);
        Ok(())
    }

    /// "read" ident: the read pushes, the store pops into the variable.
    fn read_statement(&mut self) -> Result<(), GenError> {
        self.advance(); // read
        self.code.emit(Opcode::SioRead, 0, 0, 2)?;
        let name = self.ident().ok_or(GenError::IoIdentExpected)?;
        let sym = self
            .table
            .lookup(&name, self.scope)
            .ok_or(GenError::Undeclared)?;
        let (l, address) = match sym.kind {
            SymbolKind::Var { address } => ((self.level - sym.level) as i32, address),
            _ => return Err(GenError::NotAVariable),
        };
        self.code.emit(Opcode::Sto, 0, l, address)?;
        Ok(())
    }

    /// "write" ident resolves like a factor: constants are folded into
    /// a literal push, variables are loaded, procedures are rejected.
    fn write_statement(&mut self) -> Result<(), GenError> {
        self.advance(); // write
        let name = self.ident().ok_or(GenError::IoIdentExpected)?;
        let sym = self
            .table
            .lookup(&name, self.scope)
            .ok_or(GenError::Undeclared)?;
        match sym.kind {
            SymbolKind::Const { value } => {
                self.code.emit(Opcode::Lit, 0, 0, value)?;
            }
            SymbolKind::Var { address } => {
                let l = (self.level - sym.level) as i32;
                self.code.emit(Opcode::Lod, 0, l, address)?;
            }
            SymbolKind::Proc { .. } => return Err(GenError::ProcInExpression),
        }
        self.code.emit(Opcode::SioWrite, 0, 0, 1)?;
        Ok(())
    }

    /// Condition = "odd" Expression | Expression RelOp Expression
    ///
    /// Both operands are emitted before the relational opcode, keeping
    /// the postfix discipline of the expression grammar.
    fn condition(&mut self) -> Result<(), GenError> {
        if self.at(&Token::Odd) {
            self.advance();
            self.expression()?;
            self.code.emit(Opcode::Odd, 0, 0, 0)?;
            return Ok(());
        }
        self.expression()?;
        let op = relation(self.cursor.peek()).ok_or(GenError::RelOpExpected)?;
        self.advance();
        self.expression()?;
        self.code.emit(op, 0, 0, 0)?;
        Ok(())
    }

    /// Expression = [ "+" | "-" ] Term { ("+"|"-") Term }
    fn expression(&mut self) -> Result<(), GenError> {
        let negate = match self.cursor.peek() {
            Token::Plus => {
                self.advance();
                false
            }
            Token::Minus => {
                self.advance();
                true
            }
            _ => false,
        };
        self.term()?;
        if negate {
            self.code.emit(Opcode::Neg, 0, 0, 0)?;
        }
        loop {
            let op = match self.cursor.peek() {
                Token::Plus => Opcode::Add,
                Token::Minus => Opcode::Sub,
                _ => break,
            };
            self.advance();
            self.term()?;
            self.code.emit(op, 0, 0, 0)?;
        }
        Ok(())
    }

    /// Term = Factor { ("*"|"/") Factor }
    fn term(&mut self) -> Result<(), GenError> {
        self.factor()?;
        loop {
            let op = match self.cursor.peek() {
                Token::Star => Opcode::Mul,
                Token::Slash => Opcode::Div,
                _ => break,
            };
            self.advance();
            self.factor()?;
            self.code.emit(op, 0, 0, 0)?;
        }
        Ok(())
    }

    /// Factor = ident | number | "(" Expression ")"
    fn factor(&mut self) -> Result<(), GenError> {
        match self.cursor.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                let sym = self
                    .table
                    .lookup(&name, self.scope)
                    .ok_or(GenError::Undeclared)?;
                match sym.kind {
                    SymbolKind::Const { value } => {
                        self.code.emit(Opcode::Lit, 0, 0, value)?;
                    }
                    SymbolKind::Var { address } => {
                        let l = (self.level - sym.level) as i32;
                        self.code.emit(Opcode::Lod, 0, l, address)?;
                    }
                    SymbolKind::Proc { .. } => return Err(GenError::ProcInExpression),
                }
            }
            Token::Number(_) => {
                let value = self.number()?;
                self.code.emit(Opcode::Lit, 0, 0, value)?;
            }
            Token::LParen => {
                self.advance();
                self.expression()?;
                if !self.eat(&Token::RParen) {
                    return Err(GenError::RParenExpected);
                }
            }
            _ => return Err(GenError::BadFactor),
        }
        Ok(())
    }

    // --- Utility methods ---

    fn at(&self, token: &Token) -> bool {
        self.cursor.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.cursor.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        self.cursor.advance();
    }

    fn ident(&mut self) -> Option<String> {
        match self.cursor.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.cursor.advance();
                Some(name)
            }
            _ => None,
        }
    }

    fn number(&mut self) -> Result<i64, GenError> {
        let text = match self.cursor.peek() {
            Token::Number(text) => text.clone(),
            _ => return Err(GenError::NumberExpected),
        };
        self.cursor.advance();
        text.parse::<i64>().map_err(|_| GenError::NumberTooLarge)
    }

    fn declare(&mut self, name: String, kind: SymbolKind) -> SymbolId {
        self.table.insert(Symbol {
            name,
            kind,
            level: self.level,
            scope: self.scope,
        })
    }
}

fn relation(token: &Token) -> Option<Opcode> {
    match token {
        Token::Eql => Some(Opcode::Eql),
        Token::Neq => Some(Opcode::Neq),
        Token::Lss => Some(Opcode::Lss),
        Token::Leq => Some(Opcode::Leq),
        Token::Gtr => Some(Opcode::Gtr),
        Token::Geq => Some(Opcode::Geq),
        _ => None,
    }
}
