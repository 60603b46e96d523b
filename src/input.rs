//! Sources of command lines for the read-eval loop.

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, Write};

/// Something the shell can read command lines from.
pub trait LineReader {
    /// Shows `prompt` and reads one line, without its line terminator.
    ///
    /// Returns `Ok(None)` once the input is exhausted.
    fn read_line(&mut self, prompt: &str, out: &mut dyn Write) -> Result<Option<String>>;
}

/// Interactive line editing on a terminal. History is never recorded.
impl LineReader for DefaultEditor {
    fn read_line(&mut self, prompt: &str, out: &mut dyn Write) -> Result<Option<String>> {
        // rustyline draws the prompt itself, so flush whatever we have written first.
        out.flush()?;
        match self.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof) => Ok(None),
            // Ctrl-C drops the partial line and asks again.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(err) => Err(err.into()),
        }
    }
}

/// Reads lines from any buffered reader, printing the prompt to the output stream.
///
/// Used when no line editor is available and in tests.
pub struct PromptedReader<R> {
    input: R,
}

impl<R: BufRead> PromptedReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> LineReader for PromptedReader<R> {
    fn read_line(&mut self, prompt: &str, out: &mut dyn Write) -> Result<Option<String>> {
        write!(out, "{prompt}")?;
        out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompted_reader_yields_lines_then_none() {
        let mut reader = PromptedReader::new(Cursor::new("echo a\r\npwd\nlast"));
        let mut out = Vec::new();

        assert_eq!(reader.read_line("$ ", &mut out).unwrap().as_deref(), Some("echo a"));
        assert_eq!(reader.read_line("$ ", &mut out).unwrap().as_deref(), Some("pwd"));
        assert_eq!(reader.read_line("$ ", &mut out).unwrap().as_deref(), Some("last"));
        assert_eq!(reader.read_line("$ ", &mut out).unwrap(), None);
        assert_eq!(String::from_utf8(out).unwrap(), "$ $ $ $ ");
    }

    #[test]
    fn test_prompted_reader_reports_invalid_utf8() {
        let mut reader = PromptedReader::new(Cursor::new(b"\xff\xfe\nok\n".to_vec()));
        let mut out = Vec::new();

        assert!(reader.read_line("$ ", &mut out).is_err());
        assert_eq!(reader.read_line("$ ", &mut out).unwrap().as_deref(), Some("ok"));
    }
}
