use log::{debug, warn};
use std::path::PathBuf;

/// Expand glob patterns into the log files that currently exist
///
/// Supports `*`, `?` and character classes. A pattern that fails to parse,
/// or uses the recursive `**` form, is skipped. Directories and entries that
/// cannot be read are skipped too. Matches from different patterns are
/// concatenated in pattern order; a file matched twice appears twice.
pub fn enumerate_log_files<S: AsRef<str>>(patterns: &[S]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        if pattern.contains("**") {
            debug!("Skipping recursive log path pattern: {}", pattern);
            continue;
        }

        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                debug!("Skipping invalid log path pattern '{}': {}", pattern, e);
                continue;
            }
        };

        let before = files.len();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(path) => debug!("Skipping non-file match: {}", path.display()),
                Err(e) => warn!("Cannot read log path match: {}", e),
            }
        }
        debug!(
            "Pattern '{}' matched {} file(s)",
            pattern,
            files.len() - before
        );
    }

    files
}
