use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Keys mirrored from the root `.env` into the application `.env`, with
/// the value used when the root file does not define them. Order matters:
/// missing keys are appended to the application file in this order.
pub const SYNCED_KEYS: &[(&str, &str)] = &[
    ("DB_CONNECTION", "mysql"),
    ("DB_HOST", "db"),
    ("DB_PORT", "3306"),
    ("DB_DATABASE", "multigateway-db"),
    ("DB_USERNAME", "multigateway"),
    ("DB_PASSWORD", "multigateway_password"),
    ("GATEWAY1_URL", "http://gateway1:3001"),
    ("GATEWAY1_EMAIL", "dev@betalent.tech"),
    ("GATEWAY1_TOKEN", "FEC9BB078BF338F464F96B48089EB498"),
    ("GATEWAY2_URL", "http://gateway2:3002"),
    ("GATEWAY2_AUTH_TOKEN", "tk_f2198cc671b5289fa856"),
    ("GATEWAY2_AUTH_SECRET", "3d15e8ed6131446ea7e3456728b1211f"),
];

/// Root `.env` written on first run when no `.env.example` exists.
pub const DEFAULT_ROOT_ENV: &str = "\
DB_CONNECTION=mysql
DB_HOST=db
DB_PORT=3306

MYSQL_DATABASE=multigateway-db
MYSQL_USER=multigateway
MYSQL_PASSWORD=multigateway_password
MYSQL_ROOT_PASSWORD=root_password

GATEWAY1_URL=http://gateway1:3001
GATEWAY2_URL=http://gateway2:3002
GATEWAY1_EMAIL=dev@betalent.tech
GATEWAY1_TOKEN=FEC9BB078BF338F464F96B48089EB498
GATEWAY2_AUTH_TOKEN=tk_f2198cc671b5289fa856
GATEWAY2_AUTH_SECRET=3d15e8ed6131446ea7e3456728b1211f
";

/// Replace the first `key=` line in place, or append one. Every other
/// line keeps its position; a key is never duplicated.
pub fn upsert(contents: &str, key: &str, value: &str) -> String {
    let prefix = format!("{key}=");
    let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();

    let mut replaced = false;
    for line in lines.iter_mut() {
        if line.starts_with(&prefix) {
            *line = format!("{key}={value}");
            replaced = true;
            break;
        }
    }
    if !replaced {
        lines.push(format!("{key}={value}"));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Read-modify-write a single key. A missing file is treated as empty,
/// so the write creates it.
pub fn set_var(path: &Path, key: &str, value: &str) -> Result<()> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("cannot read {}", path.display())),
    };
    fs::write(path, upsert(&contents, key, value))
        .with_context(|| format!("cannot write {}", path.display()))
}

/// Parse an env file into a map. A missing file yields an empty map.
pub fn read_vars(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    for item in iter {
        let (key, value) = item.with_context(|| format!("malformed line in {}", path.display()))?;
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Push the recognized keys into the application `.env`, preferring the
/// root file's value and falling back to the documented default.
pub fn sync_app_env(root_vars: &HashMap<String, String>, app_env: &Path) -> Result<()> {
    for (key, fallback) in SYNCED_KEYS {
        let value = root_vars.get(*key).map(String::as_str).unwrap_or(fallback);
        set_var(app_env, key, value)?;
        crate::logging::info(format!("set {key}={value} in {}", app_env.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_appends_missing_key() {
        let out = upsert("APP_NAME=demo\nAPP_DEBUG=true\n", "DB_HOST", "db");
        assert_eq!(out, "APP_NAME=demo\nAPP_DEBUG=true\nDB_HOST=db\n");
    }

    #[test]
    fn upsert_replaces_in_place_and_keeps_order() {
        let input = "APP_NAME=demo\nDB_HOST=127.0.0.1\nAPP_DEBUG=true\n";
        let out = upsert(input, "DB_HOST", "db");
        assert_eq!(out, "APP_NAME=demo\nDB_HOST=db\nAPP_DEBUG=true\n");
    }

    #[test]
    fn upsert_never_duplicates() {
        let once = upsert("", "DB_PORT", "3306");
        let twice = upsert(&once, "DB_PORT", "3307");
        assert_eq!(twice, "DB_PORT=3307\n");
    }

    #[test]
    fn upsert_does_not_touch_prefix_matches() {
        // DB_HOST must not match DB_HOSTNAME.
        let out = upsert("DB_HOSTNAME=other\n", "DB_HOST", "db");
        assert_eq!(out, "DB_HOSTNAME=other\nDB_HOST=db\n");
    }

    #[test]
    fn set_var_creates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".env");
        set_var(&path, "DB_HOST", "db").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "DB_HOST=db\n");
    }

    #[test]
    fn read_vars_parses_pairs_and_skips_comments() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".env");
        std::fs::write(&path, "# local overrides\nDB_HOST=db\nDB_PORT=3306\n").unwrap();
        let vars = read_vars(&path).unwrap();
        assert_eq!(vars.get("DB_HOST").unwrap(), "db");
        assert_eq!(vars.get("DB_PORT").unwrap(), "3306");
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn sync_fills_defaults_for_missing_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let app_env = tmp.path().join(".env");
        std::fs::write(&app_env, "APP_NAME=multigateway\n").unwrap();

        sync_app_env(&HashMap::new(), &app_env).unwrap();

        let written = std::fs::read_to_string(&app_env).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "APP_NAME=multigateway");
        // Appended in table order, with the documented defaults.
        assert_eq!(lines[1], "DB_CONNECTION=mysql");
        assert_eq!(lines[2], "DB_HOST=db");
        assert!(lines.contains(&"GATEWAY1_TOKEN=FEC9BB078BF338F464F96B48089EB498"));
        assert_eq!(lines.len(), 1 + SYNCED_KEYS.len());
    }

    #[test]
    fn sync_prefers_root_values() {
        let tmp = tempfile::tempdir().unwrap();
        let app_env = tmp.path().join(".env");
        std::fs::write(&app_env, "DB_HOST=old-host\n").unwrap();

        let mut root = HashMap::new();
        root.insert("DB_HOST".to_string(), "db.internal".to_string());
        sync_app_env(&root, &app_env).unwrap();

        let written = std::fs::read_to_string(&app_env).unwrap();
        assert!(written.starts_with("DB_HOST=db.internal\n"));
        assert_eq!(written.lines().filter(|l| l.starts_with("DB_HOST=")).count(), 1);
    }

    #[test]
    fn default_root_env_lists_documented_values() {
        assert!(DEFAULT_ROOT_ENV.starts_with("DB_CONNECTION=mysql\n"));
        assert!(DEFAULT_ROOT_ENV.contains("MYSQL_ROOT_PASSWORD=root_password\n"));
        assert!(DEFAULT_ROOT_ENV.contains("GATEWAY1_TOKEN=FEC9BB078BF338F464F96B48089EB498\n"));
        assert!(DEFAULT_ROOT_ENV.ends_with("GATEWAY2_AUTH_SECRET=3d15e8ed6131446ea7e3456728b1211f\n"));
    }
}
