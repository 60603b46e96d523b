//! Lexical analysis of a single command line.
//!
//! The lexer splits a line into arguments, removing quotes and resolving
//! backslash escapes along the way. It never fails: an unterminated quote
//! absorbs the rest of the line, and a trailing backslash is kept literally.

/// Characters that keep their escaping meaning after a backslash inside double quotes.
const DOUBLE_QUOTE_SPECIALS: [char; 4] = ['\\', '$', '"', '\n'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Normal,
    InSingleQuote,
    InDoubleQuote,
}

struct LexingFSM<'a> {
    input: std::str::Chars<'a>,
    state: LexingState,
    /// The previous character was a backslash with escaping power.
    escaped: bool,
    buffer: String,
    out: Vec<String>,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a str) -> Self {
        LexingFSM {
            input: line.chars(),
            state: LexingState::Normal,
            escaped: false,
            buffer: String::new(),
            out: Vec::new(),
        }
    }

    /// Runs the machine over the whole input and returns the collected arguments.
    fn make_tokens(mut self) -> Vec<String> {
        while let Some(ch) = self.input.next() {
            if self.escaped {
                self.handle_escaped(ch);
                continue;
            }
            match self.state {
                LexingState::Normal => self.handle_normal(ch),
                LexingState::InSingleQuote => self.handle_single_quote(ch),
                LexingState::InDoubleQuote => self.handle_double_quote(ch),
            }
        }

        // A dangling backslash has nothing left to escape.
        if self.escaped {
            self.buffer.push('\\');
        }
        self.finish_argument();
        self.out
    }

    fn handle_escaped(&mut self, ch: char) {
        if self.state == LexingState::InDoubleQuote && !DOUBLE_QUOTE_SPECIALS.contains(&ch) {
            self.buffer.push('\\');
        }
        self.buffer.push(ch);
        self.escaped = false;
    }

    fn handle_normal(&mut self, ch: char) {
        match ch {
            '\\' => self.escaped = true,
            '\'' => self.state = LexingState::InSingleQuote,
            '"' => self.state = LexingState::InDoubleQuote,
            ' ' => self.finish_argument(),
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::Normal,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '\\' => self.escaped = true,
            '"' => self.state = LexingState::Normal,
            c => self.buffer.push(c),
        }
    }

    fn finish_argument(&mut self) {
        if !self.buffer.is_empty() {
            self.out.push(std::mem::take(&mut self.buffer));
        }
    }
}

/// Splits a command line into its arguments.
///
/// Only a plain space separates arguments; runs of spaces never produce
/// empty arguments. Single quotes make everything literal, double quotes
/// keep backslash escapes for `\`, `$`, `"` and newline only.
///
/// ```
/// use myshell::split_into_tokens;
/// assert_eq!(split_into_tokens("echo 'a  b' c\\ d"), ["echo", "a  b", "c d"]);
/// ```
pub fn split_into_tokens(line: &str) -> Vec<String> {
    LexingFSM::new(line).make_tokens()
}
