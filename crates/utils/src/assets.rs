use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
const ASSET_DIR_ENV: &str = "TASK_CHECKER_ASSET_DIR";

/// Directory holding `config.json` and the default SQLite database.
///
/// Creation failures are logged rather than fatal: the caller finds out when
/// it tries to open a file inside the directory.
pub fn asset_dir() -> std::path::PathBuf {
    if let Ok(override_dir) = std::env::var(ASSET_DIR_ENV) {
        let override_dir = override_dir.trim();
        if !override_dir.is_empty() {
            let path = std::path::PathBuf::from(override_dir);
            ensure_dir(&path);
            return path;
        }
    }

    let path = if cfg!(debug_assertions) {
        std::path::PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        ProjectDirs::from("dev", "task-checker", "task-checker")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| std::path::PathBuf::from(".task-checker"))
    };

    ensure_dir(&path);
    path
}

pub fn config_path() -> std::path::PathBuf {
    asset_dir().join("config.json")
}

pub fn database_path() -> std::path::PathBuf {
    asset_dir().join("db.sqlite")
}

fn ensure_dir(path: &std::path::Path) {
    if path.exists() {
        return;
    }
    if let Err(err) = std::fs::create_dir_all(path) {
        tracing::warn!(path = %path.display(), error = %err, "Failed to create asset directory");
    }
}
