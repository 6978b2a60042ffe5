use anyhow::{Context, Result, bail};
use std::io::{BufRead, Write};

/// Blocking line-based conversation with the annotator.
pub trait Prompter {
    /// Show `prompt` and wait for one line; the trailing newline is removed.
    /// End of input is an error: the annotator has left the session.
    fn ask(&mut self, prompt: &str) -> Result<String>;

    /// Show a line of information.
    fn say(&mut self, line: &str) -> Result<()>;
}

/// Prompter over any reader/writer pair, stdin/stdout in the binary.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("failed to read answer")?;
        if read == 0 {
            bail!("input closed");
        }

        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }
}
