//! NLQ front end: template recognition, column resolution and lowering to IR

pub mod ast;
mod clauses;
pub mod joins;
mod modifiers;
mod parser;
mod predicates;
pub mod resolver;
mod to_ir;

pub use ast::*;
pub use joins::JoinPlanner;
pub use parser::parse;
pub use resolver::{ColumnResolver, ResolverKind, SubstringResolver, TokenResolver};
pub use to_ir::Context;
