pub mod ast;
pub mod builder;
pub mod dialect;
pub mod error;
pub mod parser;
pub mod renderer;

pub use builder::select::SelectBuilder;
pub use dialect::{Dialect, Postgres, escape_identifier, escape_literal};
pub use error::SqlSyntaxError;
pub use parser::parse_select;
pub use renderer::{Render, Renderer};
