//! Filesystem glue for uploaded files

use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Reserved device names on Windows
const WINDOWS_DEVICE_FILES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static regex"))
}

/// Check whether a filename carries one of the allowed extensions
///
/// The extension is whatever follows the last `.`, compared case-insensitively.
pub fn allowed_file(filename: &str, allowed: &BTreeSet<String>) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => allowed.contains(&ext.to_lowercase()),
        None => false,
    }
}

/// Reduce a user-supplied filename to a form that is safe to join onto a directory
///
/// The result contains only ASCII letters, digits, `_`, `.` and `-`, never starts or ends
/// with `.`/`_`, and may be empty.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename.chars().filter(char::is_ascii).collect();
    let ascii = ascii.replace(['/', '\\'], " ");
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let mut cleaned = unsafe_chars()
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string();

    let stem = cleaned.split('.').next().unwrap_or("").to_uppercase();
    if !cleaned.is_empty() && WINDOWS_DEVICE_FILES.contains(&stem.as_str()) {
        cleaned = format!("_{}", cleaned);
    }

    cleaned
}

/// Create the upload directory if it does not exist yet
pub async fn create_upload_folder(path: &Path) -> Result<()> {
    if !tokio::fs::try_exists(path).await? {
        tracing::info!("Creating upload folder {}", path.display());
    }
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

/// Save an uploaded file under `dir` using its sanitized name and return the path
pub async fn save_file(dir: &Path, filename: &str, data: &[u8]) -> Result<PathBuf> {
    let safe_name = secure_filename(filename);
    if safe_name.is_empty() {
        return Err(Error::file_parse(filename, "Filename has no usable characters"));
    }

    let path = dir.join(&safe_name);
    tokio::fs::write(&path, data).await?;

    tracing::debug!("Saved upload '{}' to {}", filename, path.display());
    Ok(path)
}
