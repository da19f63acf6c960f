pub mod atom;
pub mod clause;
pub mod flat_term;
pub mod literal;
pub mod parser;
pub mod subsumption;
pub mod symbol;
pub mod symbol_table;
pub mod term;
pub mod variable_map;
