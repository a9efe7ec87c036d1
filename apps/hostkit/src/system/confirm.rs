//! Interactive confirmation on the terminal.

use hostkit_core::Confirmer;
use std::io::{BufRead, Write};

/// Asks on stderr and reads the answer from stdin. Anything but yes is no.
///
/// stdout stays reserved for command output, which may be a JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirmer;

/// Interpret a typed answer.
#[must_use]
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Write the prompt, then read one answer line.
pub fn ask(prompt: &str, out: &mut dyn Write, input: &mut dyn BufRead) -> bool {
    if write!(out, "{} [y/N] ", prompt).and_then(|()| out.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => is_yes(&answer),
    }
}

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        ask(prompt, &mut std::io::stderr().lock(), &mut std::io::stdin().lock())
    }
}
