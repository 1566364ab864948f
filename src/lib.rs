//! argspec - declarative argument specs compiled into an argv parser.
//!
//! A spec (block text or JSON) describing positional arguments, flags and
//! one level of subcommands is compiled once into an immutable
//! [`ProgramSpec`]. [`parse_args`] then walks an argument vector against it,
//! producing typed [`Value`]s and the help text for the active scope.

pub mod help;
pub mod output;
pub mod parser;
pub mod registry;
pub mod schema;
pub mod text;
pub mod token;
pub mod value;

pub use help::{generate_help, generate_usage};
pub use output::{
    render_error_script, render_exports, render_help_script, render_json, RenderError,
};
pub use parser::{parse_args, Matches, ParseError, ParseFailure, ParseResult};
pub use schema::{
    short_key, ArgumentDef, CommandSpec, FlagDef, ProgramSpec, SpecDocument, SpecError,
};
pub use value::{Value, ValueError, ValueType};
