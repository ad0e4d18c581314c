use std::path::{Path, PathBuf};

/// Expand a leading `~` to the user's home directory.
///
/// Paths without the prefix, or when no home directory is known, are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Ensure `dir` exists, creating intermediate directories.
pub fn ensure_dir(dir: &Path) -> Result<(), String> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paths_are_untouched() {
        assert_eq!(expand_home(Path::new("data")), PathBuf::from("data"));
        assert_eq!(expand_home(Path::new("/srv/bot")), PathBuf::from("/srv/bot"));
    }

    #[test]
    fn test_tilde_is_expanded() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/arcadia")), home.join("arcadia"));
        }
    }
}
