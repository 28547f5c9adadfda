use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding the Laravel application, relative to the project root.
pub const APP_DIR_NAME: &str = "multigateway-app";

/// Resolved paths and tunables shared by the three workflows. Built once
/// at startup and passed everywhere, so no step depends on whatever the
/// current working directory happens to be.
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub app_dir: PathBuf,
    pub docker_bin: String,

    pub app_service: String,
    pub db_service: String,
    pub db_test_service: String,
    pub gateway_services: Vec<String>,

    pub app_url: String,

    pub db_warmup: Duration,
    pub gateway_warmup: Duration,
    pub startup_settle: Duration,
    pub readiness_attempts: u32,
    pub readiness_delay: Duration,
}

impl Config {
    /// Locate the project root from the current directory and resolve
    /// everything relative to it.
    pub fn locate() -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot resolve the current directory")?;
        Ok(Self::resolve(find_project_root(&cwd)))
    }

    pub fn resolve(root: PathBuf) -> Self {
        let app_dir = root.join(APP_DIR_NAME);
        Config {
            root,
            app_dir,
            docker_bin: resolve_docker_binary(),
            app_service: "app".to_string(),
            db_service: "db".to_string(),
            db_test_service: "db_test".to_string(),
            gateway_services: vec!["gateway1".to_string(), "gateway2".to_string()],
            app_url: "http://localhost:8000".to_string(),
            db_warmup: Duration::from_secs(10),
            gateway_warmup: Duration::from_secs(5),
            startup_settle: Duration::from_secs(5),
            readiness_attempts: 15,
            readiness_delay: Duration::from_secs(8),
        }
    }

    pub fn root_env(&self) -> PathBuf {
        self.root.join(".env")
    }

    pub fn root_env_example(&self) -> PathBuf {
        self.root.join(".env.example")
    }

    pub fn app_env(&self) -> PathBuf {
        self.app_dir.join(".env")
    }

    pub fn app_env_example(&self) -> PathBuf {
        self.app_dir.join(".env.example")
    }

    pub fn env_testing(&self) -> PathBuf {
        self.root.join(".env.testing")
    }

    pub fn nginx_conf(&self) -> PathBuf {
        self.root.join("docker").join("nginx").join("conf.d").join("app.conf")
    }

    pub fn vendor_dir(&self) -> PathBuf {
        self.app_dir.join("vendor")
    }

    /// Laravel cache directories emptied by the cleaner. The directories
    /// themselves (and their `.gitignore` markers) are kept.
    pub fn cache_dirs(&self) -> Vec<PathBuf> {
        [
            "bootstrap/cache",
            "storage/framework/cache/data",
            "storage/framework/sessions",
            "storage/framework/views",
        ]
        .iter()
        .map(|rel| self.app_dir.join(rel))
        .collect()
    }
}

pub fn resolve_docker_binary() -> String {
    std::env::var("DOCKER_BIN").unwrap_or_else(|_| "docker".to_string())
}

/// Walk up from `start_dir` until a `docker-compose.yml` is found. A
/// directory containing the application checkout is kept as a fallback,
/// and the start directory is the last resort.
pub fn find_project_root(start_dir: &Path) -> PathBuf {
    let mut dir = start_dir.to_path_buf();
    let mut fallback: Option<PathBuf> = None;

    for _ in 0..12 {
        if dir.join("docker-compose.yml").exists() {
            return dir;
        }
        if dir.join(APP_DIR_NAME).exists() && fallback.is_none() {
            fallback = Some(dir.clone());
        }

        match dir.parent() {
            Some(parent) if parent != dir => dir = parent.to_path_buf(),
            _ => break,
        }
    }

    fallback.unwrap_or_else(|| start_dir.to_path_buf())
}
