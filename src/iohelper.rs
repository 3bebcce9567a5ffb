/**
 * Helper functions for terminal input and output.
 */
use std::io::Write;

use colored::*;
use rustyline::error::ReadlineError;

use super::common::{DrillError, Result};


#[macro_export]
macro_rules! my_println {
    ($($arg:tt)*) => (
        writeln!(std::io::stdout(), $($arg)*).map_err($crate::common::DrillError::Io)
    );
}

#[macro_export]
macro_rules! my_print {
    ($($arg:tt)*) => (
        write!(std::io::stdout(), $($arg)*).map_err($crate::common::DrillError::Io)
    );
}


/// Display a prompt and read a line from standard input until the user enters a line
/// with at least one non-whitespace character, which is returned trimmed. Ctrl+D gives
/// `Ok(None)` and Ctrl+C gives `Err(DrillError::ReadlineInterrupted)`.
pub fn prompt(message: &str) -> Result<Option<String>> {
    let mut rl = rustyline::DefaultEditor::new()?;
    loop {
        match rl.readline(message) {
            Ok(response) => {
                let response = response.trim();
                if !response.is_empty() {
                    return Ok(Some(response.to_string()));
                }
            }
            Err(ReadlineError::Interrupted) => {
                return Err(DrillError::ReadlineInterrupted);
            }
            Err(ReadlineError::Eof) => {
                return Ok(None);
            }
            Err(e) => {
                return Err(DrillError::Readline(e));
            }
        }
    }
}


/// Print `message` to standard output, breaking lines according to the current width
/// of the terminal. Prepend `prefix` to the first line and indent all subsequent lines
/// by its length.
pub fn prettyprint(message: &str, prefix: Option<&str>) -> Result<()> {
    prettyprint_colored(message, prefix, None, None)
}


pub fn prettyprint_colored(
    message: &str,
    prefix: Option<&str>,
    message_color: Option<Color>,
    prefix_color: Option<Color>,
) -> Result<()> {
    let prefix = prefix.unwrap_or("");
    let width = textwrap::termwidth().saturating_sub(prefix.len()).max(20);
    let mut lines = textwrap::wrap_iter(message, width);

    if let Some(first_line) = lines.next() {
        let colored_prefix = color_optional(prefix, prefix_color);
        let colored_line = color_optional(&first_line, message_color);
        my_println!("{}{}", colored_prefix, colored_line)?;
    }

    let indent = " ".repeat(prefix.len());
    for line in lines {
        let colored_line = color_optional(&line, message_color);
        my_println!("{}{}", indent, colored_line)?;
    }
    Ok(())
}


fn color_optional(text: &str, color: Option<Color>) -> ColoredString {
    if let Some(color) = color {
        text.color(color)
    } else {
        text.normal()
    }
}
