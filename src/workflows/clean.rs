use crate::compose::Compose;
use crate::config::Config;
use crate::logging;
use crate::prompt;
use crate::runner::Cmd;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Tear down the project's docker resources and optionally the local
/// Laravel caches and composer vendor tree. Declining the first prompt
/// exits cleanly without touching anything.
pub async fn run(cfg: &Config) -> Result<()> {
    logging::banner("Docker System Cleanup Tool");

    let compose = Compose::detect(cfg).await?;
    logging::success(format!("Using command: {}", compose.display()));

    logging::warning("This will:");
    println!("1. Stop every running container of the project");
    println!("2. Remove the project's containers, networks and volumes");
    println!("3. Remove dangling docker volumes");
    println!("4. Optionally prune unused images and local caches");
    println!();

    if !prompt::confirm("Are you sure you want to continue?", true)? {
        logging::warning("Operation cancelled by the user.");
        return Ok(());
    }

    logging::info("Stopping the project's containers...");
    compose.cmd(["down", "--remove-orphans"]).run().await?;
    logging::success("Containers stopped.");

    logging::info("Removing the project's resources...");
    compose.cmd(["down", "-v", "--remove-orphans"]).run().await?;
    logging::success("Project resources removed.");

    remove_dangling_volumes(cfg).await?;

    if prompt::confirm("Also remove every unused docker image?", false)? {
        logging::info("Pruning unused images...");
        Cmd::new(&cfg.docker_bin)
            .args(["image", "prune", "-af"])
            .run()
            .await?;
        logging::success("Unused images removed.");
    } else {
        logging::info("Keeping unused images.");
    }

    if prompt::confirm(
        "Clear the Laravel cache files (bootstrap/cache, storage/framework)?",
        false,
    )? {
        clean_laravel_cache(cfg)?;
    }

    if prompt::confirm("Remove the composer vendor directory?", false)? {
        clean_vendor_directory(cfg)?;
    }

    logging::info("Current disk usage:");
    let _ = Cmd::new("df")
        .args(["-h", "."])
        .current_dir(&cfg.root)
        .status()
        .await;

    println!();
    logging::success("Cleanup finished successfully!");
    println!();
    logging::section("Next steps");
    println!("To rebuild the environment, run:");
    println!("  mgw-setup");
    Ok(())
}

async fn remove_dangling_volumes(cfg: &Config) -> Result<()> {
    logging::info("Removing dangling volumes...");
    let listed = Cmd::new(&cfg.docker_bin)
        .args(["volume", "ls", "-qf", "dangling=true"])
        .output()
        .await?;

    let ids: Vec<&str> = listed
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if !ids.is_empty() {
        let removed = Cmd::new(&cfg.docker_bin)
            .args(["volume", "rm"])
            .args(ids)
            .output()
            .await?;
        if !removed.success() {
            logging::warning("Some volumes could not be removed (possibly still in use).");
        }
    }
    logging::success("Dangling volumes removed.");
    Ok(())
}

/// Empty the framework cache directories, keeping the directories and
/// their `.gitignore` markers in place.
fn clean_laravel_cache(cfg: &Config) -> Result<()> {
    logging::info("Clearing Laravel cache files...");
    for dir in cfg.cache_dirs() {
        if dir.exists() {
            empty_directory(&dir)?;
        }
    }
    logging::success("Laravel cache files removed.");
    Ok(())
}

fn empty_directory(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("cannot remove {}", path.display()))?;
        } else {
            let keep = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(".gitignore"))
                .unwrap_or(false);
            if !keep {
                fs::remove_file(&path)
                    .with_context(|| format!("cannot remove {}", path.display()))?;
            }
        }
    }
    Ok(())
}

fn clean_vendor_directory(cfg: &Config) -> Result<()> {
    logging::info("Removing the vendor directory...");
    let vendor = cfg.vendor_dir();
    if vendor.exists() {
        fs::remove_dir_all(&vendor)
            .with_context(|| format!("cannot remove {}", vendor.display()))?;
    }
    logging::success("Vendor directory removed.");
    Ok(())
}
