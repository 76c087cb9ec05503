//! Confirmation providers consulted before a file is modified.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// Decides whether a fix may be applied.
pub trait Confirm {
    /// Asks `question`; returns true only on an explicit yes.
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// Only a case-insensitive "y" counts as yes.
pub fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Asks on `output` and reads a line from `input`. Empty input and EOF mean no.
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl PromptConfirm<StdinLock<'static>, Stdout> {
    /// Prompts on the process's terminal.
    pub fn terminal() -> Self {
        PromptConfirm::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        PromptConfirm { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        write!(self.output, "{question} [y/N]: ")?;
        self.output.flush()?;
        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            writeln!(self.output)?;
            return Ok(false);
        }
        Ok(is_yes(&answer))
    }
}

/// Accepts every fix without asking. Used by `--yes`.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _question: &str) -> io::Result<bool> {
        Ok(true)
    }
}
