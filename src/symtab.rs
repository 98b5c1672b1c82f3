/// Handle to a symbol in the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymbolId(usize);

#[derive(Clone, Debug, PartialEq)]
pub enum SymbolKind {
    /// A named constant, folded into `LIT` at every use site.
    Const { value: i64 },
    /// A variable with its data-frame slot number.
    Var { address: i64 },
    /// A procedure with its entry instruction index.
    Proc { address: usize },
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Nesting depth at the point of declaration; 0 is global.
    pub level: u32,
    /// The enclosing procedure, or `None` at the global scope.
    pub scope: Option<SymbolId>,
}

/// Append-only symbol table.
///
/// Nothing is removed on scope exit; visibility is decided entirely by
/// the scope back-references. Insertion is unconditional; redeclaration
/// is not detected, the most recent declaration simply wins on lookup.
#[derive(Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.push(symbol);
        SymbolId(self.symbols.len() - 1)
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    /// Find the most recently declared `name` visible from `scope`: its
    /// declaring scope must be `scope` itself or one of its enclosing
    /// scopes.
    pub fn lookup(&self, name: &str, scope: Option<SymbolId>) -> Option<&Symbol> {
        self.symbols
            .iter()
            .rev()
            .find(|sym| sym.name == name && self.encloses(sym.scope, scope))
    }

    /// Rewrite a procedure's entry address once its body placement is known.
    pub fn set_proc_address(&mut self, id: SymbolId, address: usize) {
        if let SymbolKind::Proc { address: a } = &mut self.symbols[id.0].kind {
            *a = address;
        }
    }

    /// Whether `outer` is `inner` or one of the scopes enclosing `inner`.
    fn encloses(&self, outer: Option<SymbolId>, inner: Option<SymbolId>) -> bool {
        let mut walk = inner;
        loop {
            if walk == outer {
                return true;
            }
            match walk {
                Some(id) => walk = self.symbols[id.0].scope,
                None => return false,
            }
        }
    }
}
