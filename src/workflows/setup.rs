use crate::compose::Compose;
use crate::config::Config;
use crate::envfile;
use crate::logging;
use crate::poll;
use crate::prompt::{self, CleanMode};
use crate::runner::Cmd;
use anyhow::{bail, Context, Result};
use std::fs;
use tokio::time::sleep;

/// Reverse-proxy config written once under docker/nginx/conf.d and never
/// touched again.
const NGINX_APP_CONF: &str = r#"server {
    listen 80;
    index index.php index.html;
    error_log  /var/log/nginx/error.log;
    access_log /var/log/nginx/access.log;
    root /var/www/html/public;
    location ~ \.php$ {
        try_files $uri =404;
        fastcgi_split_path_info ^(.+\.php)(/.+)$;
        fastcgi_pass app:9000;
        fastcgi_index index.php;
        include fastcgi_params;
        fastcgi_param SCRIPT_FILENAME $document_root$fastcgi_script_name;
        fastcgi_param PATH_INFO $fastcgi_path_info;
    }
    location / {
        try_files $uri $uri/ /index.php?$query_string;
        gzip_static on;
    }
}
"#;

/// End-to-end environment bootstrap: config files, container start order,
/// readiness wait, then the in-container Laravel setup steps.
pub async fn run(cfg: &Config) -> Result<()> {
    logging::banner("Multi-Gateway Payment System Setup Tool");

    logging::info("Checking system requirements...");
    ensure_docker(cfg).await?;
    let compose = Compose::detect(cfg).await?;
    logging::success(format!("Using command: {}", compose.display()));

    ensure_app_directory(cfg).await?;
    materialize_env_files(cfg)?;

    let root_vars = envfile::read_vars(&cfg.root_env())?;
    logging::info("Syncing environment variables...");
    envfile::sync_app_env(&root_vars, &cfg.app_env())?;

    write_nginx_conf(cfg)?;
    stop_existing_containers(&compose).await?;

    let mode = prompt::choose_clean_mode()?;
    apply_clean_mode(cfg, mode).await?;

    start_stack(cfg, &compose).await?;

    logging::info("Checking container status...");
    compose.show_status().await?;

    if !wait_for_app(cfg, &compose).await {
        logging::error("Could not verify the application is running.");
        logging::error(format!(
            "Check the logs with: {} logs {}",
            compose.display(),
            cfg.app_service
        ));
        bail!("application container never became ready");
    }

    logging::info("Installing composer dependencies...");
    compose
        .exec(&cfg.app_service, &[], ["composer", "install", "--no-interaction"])
        .run()
        .await?;

    ensure_app_key(cfg, &compose).await?;
    run_migrations(cfg, &compose, mode.fresh_migrate()).await?;
    optimize(cfg, &compose).await?;
    check_http(cfg).await;

    print_summary(cfg, &compose);
    Ok(())
}

async fn ensure_docker(cfg: &Config) -> Result<()> {
    let probe = Cmd::new(&cfg.docker_bin).arg("--version").output().await;
    if !probe.map(|o| o.success()).unwrap_or(false) {
        bail!("docker not found; install docker before continuing");
    }
    Ok(())
}

/// Make sure the Laravel checkout exists; on a blank machine create it
/// with composer when available.
async fn ensure_app_directory(cfg: &Config) -> Result<()> {
    let name = cfg
        .app_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("multigateway-app");

    if cfg.app_dir.exists() {
        logging::info(format!("Application directory `{name}` already exists."));
        return Ok(());
    }

    logging::info(format!("Application directory `{name}` not found, creating it..."));
    fs::create_dir_all(&cfg.app_dir)
        .with_context(|| format!("cannot create {}", cfg.app_dir.display()))?;

    let composer_ok = Cmd::new("composer")
        .arg("--version")
        .output()
        .await
        .map(|o| o.success())
        .unwrap_or(false);

    if composer_ok {
        logging::info("Creating a fresh Laravel project...");
        let code = Cmd::new("composer")
            .args(["create-project", "laravel/laravel", name])
            .current_dir(&cfg.root)
            .status()
            .await?;
        if code == 0 {
            logging::success("Laravel project created.");
        } else {
            logging::warning("composer create-project failed; install Laravel manually before the containers start.");
        }
    } else {
        logging::warning(
            "composer is not installed; the directory was created but Laravel must be installed manually.",
        );
        logging::info(format!(
            "Run `composer create-project laravel/laravel {name}` from the project root."
        ));
    }
    Ok(())
}

/// Create the root and application `.env` files when absent, preferring
/// the respective `.env.example` templates.
fn materialize_env_files(cfg: &Config) -> Result<()> {
    logging::info("Configuring environment...");

    let root_env = cfg.root_env();
    if root_env.exists() {
        logging::info(".env already exists at the project root.");
    } else if cfg.root_env_example().exists() {
        logging::info("Creating .env from .env.example...");
        fs::copy(cfg.root_env_example(), &root_env)
            .with_context(|| format!("cannot copy .env.example to {}", root_env.display()))?;
        logging::success(".env created.");
    } else {
        logging::warning(".env.example not found at the project root, writing the default .env...");
        fs::write(&root_env, envfile::DEFAULT_ROOT_ENV)
            .with_context(|| format!("cannot write {}", root_env.display()))?;
        logging::success("Default .env written.");
    }

    logging::info("Configuring the Laravel environment...");
    let app_env = cfg.app_env();
    if app_env.exists() {
        logging::info("Application .env already exists.");
        return Ok(());
    }

    if cfg.app_env_example().exists() {
        logging::info("Creating the application .env from its .env.example...");
        fs::copy(cfg.app_env_example(), &app_env)
            .with_context(|| format!("cannot copy to {}", app_env.display()))?;
    } else if root_env.exists() {
        logging::info("Copying the root .env into the application directory...");
        fs::copy(&root_env, &app_env)
            .with_context(|| format!("cannot copy to {}", app_env.display()))?;
    } else {
        bail!(
            "no .env source available for the application (expected {} or {})",
            cfg.app_env_example().display(),
            root_env.display()
        );
    }
    logging::success("Application .env configured.");
    Ok(())
}

fn write_nginx_conf(cfg: &Config) -> Result<()> {
    let conf = cfg.nginx_conf();
    if conf.exists() {
        return Ok(());
    }
    logging::info("Creating the nginx configuration...");
    if let Some(dir) = conf.parent() {
        fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    fs::write(&conf, NGINX_APP_CONF).with_context(|| format!("cannot write {}", conf.display()))?;
    logging::success("Nginx configuration created.");
    Ok(())
}

async fn stop_existing_containers(compose: &Compose) -> Result<()> {
    logging::info("Checking for existing containers...");
    let out = compose.cmd(["ps", "-q"]).output().await?;
    if out.success() && !out.stdout.trim().is_empty() {
        logging::warning("Existing containers found, stopping them first...");
        compose.cmd(["down"]).run().await?;
        logging::success("Containers stopped.");
    }
    Ok(())
}

async fn apply_clean_mode(cfg: &Config, mode: CleanMode) -> Result<()> {
    match mode {
        CleanMode::KeepData => logging::info("Keeping all existing data."),
        CleanMode::FreshDatabase => logging::info("Resetting only the database data."),
        CleanMode::PruneVolumes => {
            logging::warning("Wiping all docker volumes...");
            Cmd::new(&cfg.docker_bin)
                .args(["volume", "prune", "-f"])
                .current_dir(&cfg.root)
                .run()
                .await?;
            logging::success("Volumes wiped.");
        }
    }
    Ok(())
}

/// Dependency-ordered start: the database warms up before the gateways,
/// and both before the application expects to reach them.
async fn start_stack(cfg: &Config, compose: &Compose) -> Result<()> {
    logging::info("Building container images...");
    compose.cmd(["build"]).run().await?;

    logging::info("Starting the database...");
    compose.cmd(["up", "-d", cfg.db_service.as_str()]).run().await?;
    logging::info("Waiting for the database to initialize...");
    sleep(cfg.db_warmup).await;

    logging::info("Starting the payment gateways...");
    let mut args: Vec<String> = vec!["up".to_string(), "-d".to_string()];
    args.extend(cfg.gateway_services.iter().cloned());
    compose.cmd(args).run().await?;
    logging::info("Waiting for the gateways to initialize...");
    sleep(cfg.gateway_warmup).await;

    logging::info("Starting the remaining services...");
    compose.cmd(["up", "-d"]).run().await?;
    Ok(())
}

/// Poll `php -v` inside the app container until it answers.
async fn wait_for_app(cfg: &Config, compose: &Compose) -> bool {
    let total = cfg.readiness_attempts;
    poll::wait_until_ready(total, cfg.readiness_delay, |attempt| async move {
        logging::info(format!(
            "Checking the Laravel application... (attempt {attempt} of {total})"
        ));
        let probe = compose
            .exec(&cfg.app_service, &[], ["php", "-v"])
            .output()
            .await;
        match probe {
            Ok(out) if out.success() => {
                logging::success("Application is up!");
                true
            }
            _ => {
                if attempt < total {
                    logging::warning("Application is not ready yet, waiting...");
                }
                false
            }
        }
    })
    .await
}

/// Keep an existing APP_KEY, generate one only when the container reports
/// none.
async fn ensure_app_key(cfg: &Config, compose: &Compose) -> Result<()> {
    logging::info("Checking the application key...");
    let out = compose
        .exec(&cfg.app_service, &[], ["php", "-r", "echo env('APP_KEY');"])
        .output()
        .await?;

    if out.success() && !out.stdout.trim().is_empty() {
        logging::success("Application key already exists, keeping it.");
    } else {
        logging::info("Generating a new application key...");
        compose
            .exec(&cfg.app_service, &[], ["php", "artisan", "key:generate", "--force"])
            .run()
            .await?;
        logging::success("New application key generated.");
    }
    Ok(())
}

async fn run_migrations(cfg: &Config, compose: &Compose, fresh: bool) -> Result<()> {
    if fresh {
        logging::info("Resetting the database and running migrations...");
        compose
            .exec(
                &cfg.app_service,
                &[],
                ["php", "artisan", "migrate:fresh", "--seed", "--force"],
            )
            .run()
            .await?;
    } else {
        logging::info("Running migrations without resetting the database...");
        let out = compose
            .exec(
                &cfg.app_service,
                &[],
                ["php", "artisan", "migrate", "--seed", "--force"],
            )
            .output()
            .await?;
        if !out.success() {
            // Tables may already exist from a previous run.
            logging::warning("Migrations reported a failure, continuing with the existing schema.");
        }
    }
    Ok(())
}

async fn optimize(cfg: &Config, compose: &Compose) -> Result<()> {
    logging::info("Optimizing the application...");
    for step in ["optimize", "view:clear", "cache:clear", "config:clear"] {
        compose
            .exec(&cfg.app_service, &[], ["php", "artisan", step])
            .run()
            .await?;
    }
    Ok(())
}

/// HTTP reachability is advisory: an unreachable app after a clean boot
/// is worth a warning, not an abort.
async fn check_http(cfg: &Config) {
    logging::info("Checking that the application answers over HTTP...");
    let out = Cmd::new("curl")
        .args(["-s", "-o", "/dev/null", "-w", "%{http_code}"])
        .arg(&cfg.app_url)
        .output()
        .await;

    match out {
        Ok(o) if o.success() && o.stdout.trim() == "200" => {
            logging::success(format!("Application is reachable at {}", cfg.app_url));
        }
        _ => {
            logging::warning(format!(
                "Could not confirm the application is reachable, try {} manually.",
                cfg.app_url
            ));
        }
    }
}

fn print_summary(cfg: &Config, compose: &Compose) {
    println!();
    logging::success("Setup finished successfully!");
    println!();

    logging::section("System information");
    println!("Your Laravel application is running at:");
    println!("- Web application: {}", cfg.app_url);
    println!("- API: {}/api", cfg.app_url);
    println!("- Database: localhost:3306 (from a database client)");
    println!("- Gateway 1: http://localhost:3001");
    println!("- Gateway 2: http://localhost:3002");
    println!();

    logging::section("Seeded test users");
    println!("Admin:   admin@example.com / password");
    println!("Finance: finance@example.com / password");
    println!("Manager: manager@example.com / password");
    println!("User:    user@example.com / password");
    println!();

    logging::section("Useful commands");
    println!("Container status:");
    println!("  {} ps", compose.display());
    println!();
    println!("Application logs:");
    println!("  {} logs -f {}", compose.display(), cfg.app_service);
    println!();
    println!("Shell inside the app container:");
    println!("  {} exec {} bash", compose.display(), cfg.app_service);
    println!();
    println!("Run the test suite:");
    println!("  mgw-test");
    println!();
    println!("Stop the containers:");
    println!("  {} down", compose.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(root: &std::path::Path) -> Config {
        Config::resolve(root.to_path_buf())
    }

    #[test]
    fn nginx_conf_written_once_with_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = test_config(tmp.path());

        write_nginx_conf(&cfg).unwrap();
        let written = std::fs::read_to_string(cfg.nginx_conf()).unwrap();
        assert!(written.contains("fastcgi_pass app:9000;"));
        assert!(written.contains("root /var/www/html/public;"));

        // A second run must leave an edited file alone.
        std::fs::write(cfg.nginx_conf(), "# customized\n").unwrap();
        write_nginx_conf(&cfg).unwrap();
        assert_eq!(std::fs::read_to_string(cfg.nginx_conf()).unwrap(), "# customized\n");
    }

    #[test]
    fn first_run_creates_both_env_files_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = test_config(tmp.path());
        std::fs::create_dir_all(&cfg.app_dir).unwrap();

        materialize_env_files(&cfg).unwrap();

        let root = std::fs::read_to_string(cfg.root_env()).unwrap();
        assert_eq!(root, envfile::DEFAULT_ROOT_ENV);
        // The app .env starts as a copy of the root file.
        assert_eq!(std::fs::read_to_string(cfg.app_env()).unwrap(), root);
    }

    #[test]
    fn env_example_takes_precedence_over_the_default_template() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = test_config(tmp.path());
        std::fs::create_dir_all(&cfg.app_dir).unwrap();
        std::fs::write(cfg.root_env_example(), "DB_HOST=example-host\n").unwrap();

        materialize_env_files(&cfg).unwrap();

        assert_eq!(
            std::fs::read_to_string(cfg.root_env()).unwrap(),
            "DB_HOST=example-host\n"
        );
    }

    #[test]
    fn existing_env_files_are_left_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = test_config(tmp.path());
        std::fs::create_dir_all(&cfg.app_dir).unwrap();
        std::fs::write(cfg.root_env(), "DB_HOST=mine\n").unwrap();
        std::fs::write(cfg.app_env(), "DB_HOST=app-mine\n").unwrap();

        materialize_env_files(&cfg).unwrap();

        assert_eq!(std::fs::read_to_string(cfg.root_env()).unwrap(), "DB_HOST=mine\n");
        assert_eq!(std::fs::read_to_string(cfg.app_env()).unwrap(), "DB_HOST=app-mine\n");
    }

    #[test]
    fn app_env_example_wins_over_the_root_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = test_config(tmp.path());
        std::fs::create_dir_all(&cfg.app_dir).unwrap();
        std::fs::write(cfg.root_env(), "DB_HOST=root-host\n").unwrap();
        std::fs::write(cfg.app_env_example(), "DB_HOST=app-template\n").unwrap();

        materialize_env_files(&cfg).unwrap();

        assert_eq!(
            std::fs::read_to_string(cfg.app_env()).unwrap(),
            "DB_HOST=app-template\n"
        );
    }
}
