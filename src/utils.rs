//! Shared utility functions for database paths and usernames.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Gets the cross-platform default database path.
///
/// Returns the path as `{data_dir}/quorum/forum.db` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn get_database_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("quorum").join("forum.db"))
}

/// Ensures the parent directory of the database file exists.
///
/// Creates the directory structure if it doesn't exist using `create_dir_all`.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}

/// Turns a display name into a URL-safe username.
///
/// # Rules
///
/// - Lowercased
/// - Every run of non-alphanumeric characters becomes a single hyphen
/// - No leading or trailing hyphens
///
/// # Examples
///
/// ```
/// use quorum::utils::slugify;
///
/// assert_eq!(slugify("Ada Lovelace"), "ada-lovelace");
/// assert_eq!(slugify("  --Grace__Hopper!! "), "grace-hopper");
/// assert_eq!(slugify("C++"), "c");
/// ```
#[must_use]
pub fn slugify(input: &str) -> String {
    input
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn get_database_path_returns_valid_path() {
        let path = get_database_path();
        assert!(path.is_ok());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("quorum"));
        assert!(path.to_string_lossy().contains("forum.db"));
    }

    #[test]
    fn ensure_database_directory_creates_parents() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("deeper").join("forum.db");

        ensure_database_directory(&db_path).expect("directory creation should succeed");

        assert!(db_path.parent().unwrap().is_dir());
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("machine   learning"), "machine-learning");
        assert_eq!(slugify("a.b_c-d"), "a-b-c-d");
    }

    #[test]
    fn slugify_keeps_digits() {
        assert_eq!(slugify("User 42"), "user-42");
    }

    #[test]
    fn slugify_of_symbols_is_empty() {
        assert_eq!(slugify("!!!"), "");
    }
}
