//! 终端层：crossterm 渲染（console）与行输入源（prompt）

pub mod console;
pub mod prompt;

pub use console::Console;
pub use prompt::{confirm, InputSource, ScriptedInput, TerminalInput};
