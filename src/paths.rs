use std::env;
use std::fs;
use std::path::PathBuf;

const WORKSPACE_FILE: &str = "default.workspace";

/// Resolves the workspace file: explicit flag, then `TIMETALLY_DATA`, then
/// the platform data directory.
pub fn resolve_workspace_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return absolutize(path);
    }

    if let Some(path) = env::var_os("TIMETALLY_DATA") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return absolutize(path);
        }
    }

    data_dir().join(WORKSPACE_FILE)
}

fn data_dir() -> PathBuf {
    if let Some(path) = env::var_os("TIMETALLY_DATA_DIR") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(path) = env::var_os("LOCALAPPDATA") {
            return PathBuf::from(path).join("timetally");
        }
    }

    if let Some(path) = env::var_os("XDG_DATA_HOME") {
        return PathBuf::from(path).join("timetally");
    }

    if let Some(path) = env::var_os("HOME") {
        return PathBuf::from(path)
            .join(".local")
            .join("share")
            .join("timetally");
    }

    PathBuf::from(".timetally")
}

fn absolutize(path: PathBuf) -> PathBuf {
    let path = if path.is_absolute() {
        path
    } else if let Ok(cwd) = env::current_dir() {
        cwd.join(path)
    } else {
        path
    };

    if path.exists() {
        fs::canonicalize(&path).unwrap_or(path)
    } else {
        path
    }
}
