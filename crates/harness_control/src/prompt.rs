use std::io::{self, BufRead, Write};

#[cfg(any(feature = "testing", test))]
use mockall::automock;

#[cfg(test)]
#[path = "prompt_test.rs"]
mod prompt_test;

/// Asks `question` on `output` and reads a `y`/`N` answer from `input`. Anything but `y` or `yes`
/// is a refusal.
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> io::Result<bool> {
    write!(output, "{question} (y/N): ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Decides whether destructive operations go ahead.
#[cfg_attr(any(feature = "testing", test), automock)]
pub trait Confirmer: Send + Sync {
    fn confirm(&self, question: &str) -> io::Result<bool>;
}

/// Prompts on the terminal.
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, question: &str) -> io::Result<bool> {
        confirm(&mut io::stdin().lock(), &mut io::stdout().lock(), question)
    }
}

/// Answers yes without asking, for `--yes`.
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&self, _question: &str) -> io::Result<bool> {
        Ok(true)
    }
}
