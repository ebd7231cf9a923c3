//! xrandr report parsing and command invocation

mod command;
mod lexer;
mod parser;
mod token;
pub mod types;

#[cfg(test)]
pub mod fixtures;

pub use command::{ApplyAction, ApplyCommand, DisplayServer, ModeSelection, XrandrCli};
pub use parser::{parse_report, parse_snapshot, ParseError};
pub use types::{Position, Reflection, Rotation, Snapshot};
