use crate::compose::Compose;
use crate::config::Config;
use crate::envfile;
use crate::logging;
use anyhow::{bail, Result};
use tokio::time::sleep;

const TEST_DB_NAME: &str = "multigateway_test";
const TEST_DB_USER: &str = "multigateway_test";
const TEST_DB_PASSWORD: &str = "test_password";
const DEFAULT_ROOT_DB_PASSWORD: &str = "root_password";

/// Env overrides aimed at the dedicated test database, injected into the
/// migration and test commands inside the app container.
fn test_db_env(cfg: &Config) -> Vec<(String, String)> {
    vec![
        ("DB_CONNECTION".to_string(), "mysql".to_string()),
        ("DB_HOST".to_string(), cfg.db_test_service.clone()),
        ("DB_DATABASE".to_string(), TEST_DB_NAME.to_string()),
        ("DB_USERNAME".to_string(), TEST_DB_USER.to_string()),
        ("DB_PASSWORD".to_string(), TEST_DB_PASSWORD.to_string()),
    ]
}

/// Run the application test suite against a freshly provisioned and
/// seeded test database. Returns the test command's exit code, which the
/// binary propagates verbatim.
pub async fn run(cfg: &Config, test_args: &[String]) -> Result<i32> {
    logging::banner("Running tests against a pre-seeded database");

    let compose = Compose::detect(cfg).await?;

    if !cfg.env_testing().is_file() {
        bail!(".env.testing not found at {}", cfg.env_testing().display());
    }

    ensure_app_running(cfg, &compose).await?;
    provision_test_database(cfg, &compose).await?;
    prepare_laravel_environment(cfg, &compose).await?;

    let mut overrides = test_db_env(cfg);
    migrate_test_database(cfg, &compose, &overrides).await?;

    // Seeders look for this flag when running under the test harness.
    overrides.push(("RUN_SEEDS_FOR_TESTS".to_string(), "true".to_string()));

    logging::info("Running the test suite...");
    let mut args: Vec<String> = vec!["php".to_string(), "artisan".to_string(), "test".to_string()];
    args.extend(test_args.iter().cloned());
    let code = compose
        .exec(&cfg.app_service, &overrides, args)
        .status()
        .await?;

    println!();
    if code == 0 {
        logging::success("All tests passed!");
    } else {
        logging::error("Some tests failed, check the output above.");
    }
    Ok(code)
}

async fn ensure_app_running(cfg: &Config, compose: &Compose) -> Result<()> {
    let services = compose.running_services().await?;
    if !services.iter().any(|s| s == &cfg.app_service) {
        logging::warning("Application container is not running, starting it...");
        compose.cmd(["up", "-d"]).run().await?;
        logging::success("Containers started.");
        sleep(cfg.startup_settle).await;
    }
    Ok(())
}

/// Create the test database and its user on the test database service.
/// All statements are idempotent, so reruns are harmless.
async fn provision_test_database(cfg: &Config, compose: &Compose) -> Result<()> {
    logging::info("Provisioning the test database...");

    let root_vars = envfile::read_vars(&cfg.root_env())?;
    let root_password = root_vars
        .get("MYSQL_ROOT_PASSWORD")
        .cloned()
        .unwrap_or_else(|| DEFAULT_ROOT_DB_PASSWORD.to_string());
    let password_flag = format!("-p{root_password}");

    let statements = [
        format!("CREATE DATABASE IF NOT EXISTS {TEST_DB_NAME};"),
        format!(
            "CREATE USER IF NOT EXISTS '{TEST_DB_USER}'@'%' IDENTIFIED BY '{TEST_DB_PASSWORD}';"
        ),
        format!("GRANT ALL PRIVILEGES ON {TEST_DB_NAME}.* TO '{TEST_DB_USER}'@'%';"),
        "FLUSH PRIVILEGES;".to_string(),
    ];

    for sql in &statements {
        compose
            .exec(
                &cfg.db_test_service,
                &[],
                ["mysql", "-u", "root", password_flag.as_str(), "-e", sql.as_str()],
            )
            .run()
            .await?;
    }

    logging::success("Test database ready.");
    Ok(())
}

async fn prepare_laravel_environment(cfg: &Config, compose: &Compose) -> Result<()> {
    logging::info("Clearing caches and preparing the test environment...");
    for step in ["config:clear", "route:clear", "cache:clear"] {
        compose
            .exec(&cfg.app_service, &[], ["php", "artisan", step])
            .run()
            .await?;
    }
    Ok(())
}

async fn migrate_test_database(
    cfg: &Config,
    compose: &Compose,
    overrides: &[(String, String)],
) -> Result<()> {
    logging::info("Running migrations and seeders on the test database...");
    compose
        .exec(
            &cfg.app_service,
            overrides,
            ["php", "artisan", "migrate:fresh", "--seed", "--env=testing"],
        )
        .run()
        .await?;
    logging::success("Test database migrated and seeded!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn override_set_targets_the_test_service() {
        let cfg = Config::resolve(PathBuf::from("/srv/mgw"));
        let envs = test_db_env(&cfg);
        assert_eq!(envs.len(), 5);
        assert!(envs.contains(&("DB_HOST".to_string(), "db_test".to_string())));
        assert!(envs.contains(&("DB_DATABASE".to_string(), TEST_DB_NAME.to_string())));
        assert!(envs.contains(&("DB_PASSWORD".to_string(), TEST_DB_PASSWORD.to_string())));
    }
}
