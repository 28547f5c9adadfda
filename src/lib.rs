//! Shared plumbing for the three operator binaries (`mgw-setup`,
//! `mgw-clean`, `mgw-test`) that drive the multi-gateway docker compose
//! stack. Everything here is sequential shell-out orchestration: detect
//! the compose CLI, run commands, patch `.env` files, ask questions and
//! wait for containers to come up.

pub mod compose;
pub mod config;
pub mod envfile;
pub mod logging;
pub mod poll;
pub mod prompt;
pub mod runner;
pub mod workflows;
