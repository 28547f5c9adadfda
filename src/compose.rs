use crate::config::Config;
use crate::logging;
use crate::runner::Cmd;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Which flavor of the compose CLI answered the version probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeVariant {
    /// Standalone `docker-compose` binary.
    Legacy,
    /// `docker compose` plugin subcommand.
    Plugin,
}

/// Precedence rule: the legacy binary wins when both respond, the plugin
/// is the fallback, and neither means compose is not installed.
pub fn select(legacy_ok: bool, plugin_ok: bool) -> Option<ComposeVariant> {
    if legacy_ok {
        Some(ComposeVariant::Legacy)
    } else if plugin_ok {
        Some(ComposeVariant::Plugin)
    } else {
        None
    }
}

/// Handle on the detected compose CLI, pinned to the project root so
/// every invocation sees the project's `docker-compose.yml`.
#[derive(Debug, Clone)]
pub struct Compose {
    variant: ComposeVariant,
    docker_bin: String,
    cwd: PathBuf,
}

impl Compose {
    pub async fn detect(cfg: &Config) -> Result<Self> {
        let legacy_ok = Cmd::new("docker-compose")
            .arg("--version")
            .output()
            .await
            .map(|o| o.success())
            .unwrap_or(false);
        let plugin_ok = Cmd::new(&cfg.docker_bin)
            .args(["compose", "version"])
            .output()
            .await
            .map(|o| o.success())
            .unwrap_or(false);

        let variant = select(legacy_ok, plugin_ok).ok_or_else(|| {
            anyhow!("docker compose not found; install the compose plugin or the docker-compose binary")
        })?;

        Ok(Compose {
            variant,
            docker_bin: cfg.docker_bin.clone(),
            cwd: cfg.root.clone(),
        })
    }

    pub fn variant(&self) -> ComposeVariant {
        self.variant
    }

    pub fn display(&self) -> &'static str {
        match self.variant {
            ComposeVariant::Legacy => "docker-compose",
            ComposeVariant::Plugin => "docker compose",
        }
    }

    /// Base compose invocation: `docker-compose <args>` or
    /// `docker compose <args>`, run from the project root.
    pub fn cmd<I, S>(&self, args: I) -> Cmd
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base = match self.variant {
            ComposeVariant::Legacy => Cmd::new("docker-compose"),
            ComposeVariant::Plugin => Cmd::new(&self.docker_bin).arg("compose"),
        };
        base.current_dir(&self.cwd).args(args)
    }

    /// `compose exec -T [-e KEY=VAL ...] <service> <args...>`. Env pairs
    /// are injected as `-e` flags so they reach the container process,
    /// not just the compose client.
    pub fn exec<I, S>(&self, service: &str, envs: &[(String, String)], args: I) -> Cmd
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut full: Vec<String> = vec!["exec".to_string(), "-T".to_string()];
        for (key, value) in envs {
            full.push("-e".to_string());
            full.push(format!("{key}={value}"));
        }
        full.push(service.to_string());
        full.extend(args.into_iter().map(Into::into));
        self.cmd(full)
    }

    /// Services currently in the `running` state.
    pub async fn running_services(&self) -> Result<Vec<String>> {
        let out = self
            .cmd(["ps", "--services", "--filter", "status=running"])
            .output()
            .await?;
        Ok(out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Print the container status table. The plugin emits machine-readable
    /// JSON we can decode and align; the legacy binary falls back to its
    /// own plain `ps` output.
    pub async fn show_status(&self) -> Result<()> {
        if self.variant == ComposeVariant::Plugin {
            if let Ok(out) = self.cmd(["ps", "--format", "json"]).output().await {
                if out.success() {
                    let services = parse_ps_output(&out.stdout);
                    if !services.is_empty() {
                        for svc in services {
                            logging::info(format!(
                                "{:<12} {:<10} {}",
                                svc.service, svc.state, svc.status
                            ));
                        }
                        return Ok(());
                    }
                }
            }
        }
        self.cmd(["ps"]).run().await
    }
}

/// One service row from `compose ps --format json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceStatus {
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Status", default)]
    pub status: String,
}

/// Compose has emitted both a single JSON array and one object per line
/// depending on version; accept either.
pub fn parse_ps_output(raw: &str) -> Vec<ServiceStatus> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).unwrap_or_default();
    }
    trimmed
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|l| serde_json::from_str::<ServiceStatus>(l).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_binary_wins_when_both_probe_ok() {
        assert_eq!(select(true, true), Some(ComposeVariant::Legacy));
        assert_eq!(select(true, false), Some(ComposeVariant::Legacy));
    }

    #[test]
    fn plugin_is_the_fallback() {
        assert_eq!(select(false, true), Some(ComposeVariant::Plugin));
    }

    #[test]
    fn neither_probe_means_not_installed() {
        assert_eq!(select(false, false), None);
    }

    #[test]
    fn ps_output_decodes_line_delimited_json() {
        let raw = r#"{"Service":"app","State":"running","Status":"Up 2 minutes"}
{"Service":"db","State":"running","Status":"Up 2 minutes (healthy)"}"#;
        let rows = parse_ps_output(raw);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].service, "app");
        assert_eq!(rows[1].status, "Up 2 minutes (healthy)");
    }

    #[test]
    fn ps_output_decodes_array_form() {
        let raw = r#"[{"Service":"db","State":"running","Status":"Up"}]"#;
        let rows = parse_ps_output(raw);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state, "running");
    }

    #[test]
    fn ps_output_tolerates_garbage() {
        assert!(parse_ps_output("").is_empty());
        assert!(parse_ps_output("not json at all").is_empty());
    }
}
