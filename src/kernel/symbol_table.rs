use std::collections::HashMap;

use crate::kernel::atom::Atom;
use crate::kernel::clause::Clause;
use crate::kernel::literal::Literal;
use crate::kernel::parser::{self, ParseError};
use crate::kernel::symbol::Symbol;
use crate::kernel::term::Term;

/// The SymbolTable is a mapping between symbol names and the Symbols the prover works with.
/// Every symbol has a fixed arity, set when it is first added.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    /// For symbol i, names[i] is its name.
    names: Vec<String>,

    /// For symbol i, arities[i] is its arity.
    arities: Vec<usize>,

    /// The name -> Symbol lookup direction.
    name_to_symbol: HashMap<String, Symbol>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        let mut table = SymbolTable {
            names: vec![],
            arities: vec![],
            name_to_symbol: HashMap::new(),
        };
        let eq = table.push("=", 2);
        debug_assert_eq!(eq, Symbol::EQUALITY);
        table
    }

    fn push(&mut self, name: &str, arity: usize) -> Symbol {
        let symbol = Symbol(self.names.len() as u32);
        self.names.push(name.to_string());
        self.arities.push(arity);
        self.name_to_symbol.insert(name.to_string(), symbol);
        symbol
    }

    /// Assigns a symbol to this name if it doesn't already have one.
    /// A known name must be used with the arity it was first added with.
    pub fn add(&mut self, name: &str, arity: usize) -> Result<Symbol, ParseError> {
        if let Some(&symbol) = self.name_to_symbol.get(name) {
            let expected = self.arity(symbol);
            if expected != arity {
                return Err(ParseError::ArityMismatch {
                    name: name.to_string(),
                    expected,
                    found: arity,
                });
            }
            return Ok(symbol);
        }
        Ok(self.push(name, arity))
    }

    pub fn get_symbol(&self, name: &str) -> Option<Symbol> {
        self.name_to_symbol.get(name).copied()
    }

    pub fn name(&self, symbol: Symbol) -> &str {
        &self.names[symbol.0 as usize]
    }

    pub fn arity(&self, symbol: Symbol) -> usize {
        self.arities[symbol.0 as usize]
    }

    /// The number of symbols, including equality.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        // Equality is always present.
        false
    }

    pub fn parse_clause(&mut self, s: &str) -> Result<Clause, ParseError> {
        parser::parse_clause(s, self)
    }

    pub fn parse_literal(&mut self, s: &str) -> Result<Literal, ParseError> {
        parser::parse_literal(s, self)
    }

    /// Parses a clause, panicking on bad input. For tests and tooling.
    pub fn make_clause(&mut self, s: &str) -> Clause {
        match self.parse_clause(s) {
            Ok(clause) => clause,
            Err(e) => panic!("failed to parse clause '{}': {}", s, e),
        }
    }

    pub fn make_literal(&mut self, s: &str) -> Literal {
        match self.parse_literal(s) {
            Ok(literal) => literal,
            Err(e) => panic!("failed to parse literal '{}': {}", s, e),
        }
    }

    /// Formats a term with symbol names rather than ids.
    pub fn format_term(&self, term: &Term) -> String {
        let head = match term.get_head_atom() {
            Atom::Variable(i) => format!("x{}", i),
            Atom::Symbol(s) => self.name(*s).to_string(),
        };
        if term.num_args() == 0 {
            return head;
        }
        let args: Vec<String> = term.iter_args().map(|arg| self.format_term(arg)).collect();
        format!("{}({})", head, args.join(", "))
    }

    pub fn format_literal(&self, literal: &Literal) -> String {
        if literal.is_equality() {
            let op = if literal.positive { "=" } else { "!=" };
            let args = literal.args();
            return format!(
                "{} {} {}",
                self.format_term(&args[0]),
                op,
                self.format_term(&args[1])
            );
        }
        let atom = self.format_term(&literal.atom);
        if literal.positive {
            atom
        } else {
            format!("not {}", atom)
        }
    }

    pub fn format_clause(&self, clause: &Clause) -> String {
        if clause.is_empty() {
            return "<empty>".to_string();
        }
        clause
            .iter()
            .map(|lit| self.format_literal(lit))
            .collect::<Vec<_>>()
            .join(" or ")
    }
}
