use std::{
    env, fs,
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("HOME environment variable is not set")]
    HomeMissing,
    #[error("APPDATA environment variable is not set")]
    AppDataMissing,
    #[error("home_dir must be an absolute path (after ~ expansion): {0}")]
    AbsoluteRequired(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve the server home directory.
///
/// A provided path may start with `~` (expanded against the user home) and
/// must be absolute after expansion. When no path is provided the platform
/// default is used: `%APPDATA%/<default_subdir>` on Windows,
/// `$HOME/<default_subdir>` elsewhere. With `create` the directory is
/// created if missing.
pub fn resolve_home_dir(
    config_home: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match config_home {
        Some(raw) => {
            let expanded = if let Some(stripped) = raw.strip_prefix("~/") {
                user_home()?.join(stripped)
            } else if raw == "~" {
                user_home()?
            } else {
                PathBuf::from(raw)
            };
            if !expanded.is_absolute() {
                return Err(HomeDirError::AbsoluteRequired(
                    expanded.to_string_lossy().into(),
                ));
            }
            expanded
        }
        None => default_base()?.join(default_subdir),
    };

    if create {
        fs::create_dir_all(&path)?;
    }
    Ok(path)
}

fn user_home() -> Result<PathBuf, HomeDirError> {
    #[cfg(target_os = "windows")]
    {
        env::var("USERPROFILE")
            .or_else(|_| env::var("HOME"))
            .map(PathBuf::from)
            .map_err(|_| HomeDirError::HomeMissing)
    }
    #[cfg(not(target_os = "windows"))]
    {
        env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| HomeDirError::HomeMissing)
    }
}

fn default_base() -> Result<PathBuf, HomeDirError> {
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .map(PathBuf::from)
            .map_err(|_| HomeDirError::AppDataMissing)
    }
    #[cfg(not(target_os = "windows"))]
    {
        env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| HomeDirError::HomeMissing)
    }
}

/// Resolve a log file path; relative paths land under `base_dir`.
pub fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn tilde_expands_against_home() {
        let _env = crate::env_guard();
        let tmp = tempdir().unwrap();
        let old_home = env::var_os("HOME");
        env::set_var("HOME", tmp.path());
        let resolved = resolve_home_dir(Some("~/scaffold".into()), ".api-scaffold", false);
        match old_home {
            Some(home) => env::set_var("HOME", home),
            None => env::remove_var("HOME"),
        }
        let resolved = resolved.unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("scaffold"));
    }

    #[test]
    fn relative_path_is_rejected() {
        let err = resolve_home_dir(Some("relative/path".into()), ".api-scaffold", false)
            .unwrap_err();
        assert!(matches!(err, HomeDirError::AbsoluteRequired(_)));
    }

    #[test]
    fn absolute_path_is_kept_and_created() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("custom");
        let resolved = resolve_home_dir(
            Some(target.to_string_lossy().to_string()),
            ".api-scaffold",
            true,
        )
        .unwrap();
        assert_eq!(resolved, target);
        assert!(resolved.exists());
    }

    #[test]
    fn relative_log_paths_land_under_base() {
        let base = Path::new("/srv/app");
        assert_eq!(
            resolve_log_path("logs/api.log", base),
            PathBuf::from("/srv/app/logs/api.log")
        );
        assert_eq!(
            resolve_log_path("/var/log/api.log", base),
            PathBuf::from("/var/log/api.log")
        );
    }
}
