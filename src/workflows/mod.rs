//! The three operator pipelines. Each is a fixed sequence of external
//! commands with user prompts at the destructive or optional steps.

pub mod clean;
pub mod setup;
pub mod test_run;
