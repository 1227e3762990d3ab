//! Operator confirmation for destructive actions.
use std::fmt::Debug;
use std::io::{self, BufRead as _, IsTerminal as _, Write as _};

/// Answer to a confirmation question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The operator (or `--yes`) approved.
    Approved,
    /// The operator said no.
    Declined,
    /// Nobody can be asked (no terminal on stdin).
    Unavailable,
}

impl Confirmation {
    /// Whether the action may proceed.
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Source of operator answers.
pub trait Prompt: Send + Sync + Debug {
    /// Ask a yes/no question.
    fn confirm(&self, question: &str) -> Confirmation;

    /// Show `prompt` and read one line of input, trimmed.
    ///
    /// Returns `None` at end of input.
    fn read_line(&self, prompt: &str) -> Option<String>;
}

/// [`Prompt`] reading from the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt {
    assume_yes: bool,
}

impl StdinPrompt {
    /// Create a prompt; with `assume_yes` every question is approved unasked.
    #[must_use]
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

/// Interpret a typed answer; anything but `y`/`yes` declines.
fn parse_answer(input: &str) -> Confirmation {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Confirmation::Approved,
        _ => Confirmation::Declined,
    }
}

impl Prompt for StdinPrompt {
    fn confirm(&self, question: &str) -> Confirmation {
        if self.assume_yes {
            return Confirmation::Approved;
        }
        if !io::stdin().is_terminal() {
            return Confirmation::Unavailable;
        }
        self.read_line(&format!("{question} [y/N]: "))
            .map_or(Confirmation::Unavailable, |answer| parse_answer(&answer))
    }

    #[allow(clippy::print_stdout)]
    fn read_line(&self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        io::stdout().flush().ok()?;
        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(input.trim().to_string()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_helpers::ScriptedPrompt;
    use super::*;

    #[test]
    fn yes_variants_approve() {
        assert_eq!(parse_answer("y\n"), Confirmation::Approved);
        assert_eq!(parse_answer(" YES "), Confirmation::Approved);
    }

    #[test]
    fn anything_else_declines() {
        assert_eq!(parse_answer(""), Confirmation::Declined);
        assert_eq!(parse_answer("n"), Confirmation::Declined);
        assert_eq!(parse_answer("yep"), Confirmation::Declined);
    }

    #[test]
    fn assume_yes_approves_without_asking() {
        assert_eq!(
            StdinPrompt::new(true).confirm("repair?"),
            Confirmation::Approved
        );
    }

    #[test]
    fn scripted_prompt_records_questions() {
        let prompt = ScriptedPrompt::always(Confirmation::Declined);
        assert_eq!(prompt.confirm("unmount?"), Confirmation::Declined);
        assert_eq!(prompt.asked(), vec!["unmount?".to_string()]);
        assert!(!Confirmation::Unavailable.is_approved());
    }

    #[test]
    fn scripted_lines_run_out() {
        let prompt = ScriptedPrompt::always(Confirmation::Approved).with_lines(&["1"]);
        assert_eq!(prompt.read_line("> ").as_deref(), Some("1"));
        assert_eq!(prompt.read_line("> "), None);
    }
}
