use crate::logging;
use anyhow::{Context, Result};
use std::io::{self, Write};

/// Interpret a yes/no answer: empty picks the default, `y`/`yes` (any
/// case) is affirmative, anything else declines.
pub fn parse_answer(input: &str, default_yes: bool) -> bool {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return default_yes;
    }
    matches!(normalized.as_str(), "y" | "yes")
}

/// Ask a yes/no question on stdin, showing which answer is the default.
pub fn confirm(question: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    print!("{question} ({hint}): ");
    io::stdout().flush().context("cannot flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("cannot read from stdin")?;
    Ok(parse_answer(&line, default_yes))
}

/// How much existing state the bootstrapper should throw away before
/// starting the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanMode {
    /// Keep containers' data as-is; migrations run non-destructively.
    KeepData,
    /// Reset the database through a fresh migration, volumes untouched.
    FreshDatabase,
    /// Prune all docker volumes for a completely new environment.
    PruneVolumes,
}

impl CleanMode {
    /// Whether migrations should run as `migrate:fresh`.
    pub fn fresh_migrate(self) -> bool {
        !matches!(self, CleanMode::KeepData)
    }

    /// Parse a menu answer; empty selects the default, anything not in
    /// 1..=3 is invalid.
    pub fn parse(input: &str) -> Option<CleanMode> {
        match input.trim() {
            "" | "1" => Some(CleanMode::KeepData),
            "2" => Some(CleanMode::FreshDatabase),
            "3" => Some(CleanMode::PruneVolumes),
            _ => None,
        }
    }
}

/// Present the bootstrapper's cleanup menu. Invalid input falls back to
/// keeping all data, with a warning.
pub fn choose_clean_mode() -> Result<CleanMode> {
    logging::section("Cleanup options");
    println!("1. Keep all data (recommended to continue development)");
    println!("2. Reset only the database data (keeps docker volumes)");
    println!("3. Wipe all docker volumes (completely fresh environment)");
    print!("Select an option (1-3) [1]: ");
    io::stdout().flush().context("cannot flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("cannot read from stdin")?;

    match CleanMode::parse(&line) {
        Some(mode) => Ok(mode),
        None => {
            logging::warning("Invalid option, keeping all data.");
            Ok(CleanMode::KeepData)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_answer_takes_the_default() {
        assert!(parse_answer("", true));
        assert!(parse_answer("  \n", true));
        assert!(!parse_answer("", false));
    }

    #[test]
    fn affirmative_tokens_are_case_insensitive() {
        for input in ["y", "Y", "yes", "YES", " Yes \n"] {
            assert!(parse_answer(input, false), "{input:?} should confirm");
        }
    }

    #[test]
    fn anything_else_declines() {
        for input in ["n", "no", "q", "yep", "sure", "1"] {
            assert!(!parse_answer(input, true), "{input:?} should decline");
        }
    }

    #[test]
    fn clean_mode_defaults_to_keeping_data() {
        assert_eq!(CleanMode::parse(""), Some(CleanMode::KeepData));
        assert_eq!(CleanMode::parse("1\n"), Some(CleanMode::KeepData));
        assert_eq!(CleanMode::parse("2"), Some(CleanMode::FreshDatabase));
        assert_eq!(CleanMode::parse("3"), Some(CleanMode::PruneVolumes));
        assert_eq!(CleanMode::parse("4"), None);
        assert_eq!(CleanMode::parse("all"), None);
    }

    #[test]
    fn only_keep_data_skips_fresh_migrations() {
        assert!(!CleanMode::KeepData.fresh_migrate());
        assert!(CleanMode::FreshDatabase.fresh_migrate());
        assert!(CleanMode::PruneVolumes.fresh_migrate());
    }
}
