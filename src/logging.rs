use chrono::Local;
use crossterm::style::Stylize;

/// Severity of an operator-facing log line. Presentation (color, tag,
/// timestamp) lives here so workflow code only states level + message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Success => "SUCCESS",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }
}

/// Plain (uncolored) rendering of a log line, without the timestamp.
pub fn format_line(level: Level, msg: &str) -> String {
    format!("[{}] {msg}", level.label())
}

fn colored_tag(level: Level) -> crossterm::style::StyledContent<String> {
    let tag = format!("[{}]", level.label());
    match level {
        Level::Info => tag.blue(),
        Level::Success => tag.green(),
        Level::Warning => tag.yellow(),
        Level::Error => tag.red(),
    }
}

pub fn log(level: Level, msg: impl std::fmt::Display) {
    let ts = Local::now().format("%H:%M:%S").to_string();
    println!("{} {} {msg}", ts.dark_grey(), colored_tag(level));
}

pub fn info(msg: impl std::fmt::Display) {
    log(Level::Info, msg);
}

pub fn success(msg: impl std::fmt::Display) {
    log(Level::Success, msg);
}

pub fn warning(msg: impl std::fmt::Display) {
    log(Level::Warning, msg);
}

pub fn error(msg: impl std::fmt::Display) {
    log(Level::Error, msg);
}

/// Framed title printed once at program start.
pub fn banner(title: &str) {
    let line = "=".repeat(45);
    println!("{}", line.clone().cyan());
    println!("{}", format!("      {title}").cyan());
    println!("{}", line.cyan());
}

/// Lighter frame for mid-run sections (summaries, option menus).
pub fn section(title: &str) {
    let line = "=".repeat(37);
    println!("{}", line.clone().yellow());
    println!("{}", format!("      {title}").yellow());
    println!("{}", line.yellow());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_levels() {
        assert_eq!(Level::Info.label(), "INFO");
        assert_eq!(Level::Success.label(), "SUCCESS");
        assert_eq!(Level::Warning.label(), "WARNING");
        assert_eq!(Level::Error.label(), "ERROR");
    }

    #[test]
    fn format_line_puts_tag_first() {
        assert_eq!(format_line(Level::Warning, "disk low"), "[WARNING] disk low");
    }
}
