use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{Config, RecordingConfig};

/// File name prefix for session dumps: session_{unix_ts}.wav
const DUMP_PREFIX: &str = "session_";

/// Path for a new session dump named after the current time
///
/// # Errors
/// Returns error if the debug directory path cannot be expanded
pub fn dump_path(config: &RecordingConfig) -> Result<PathBuf> {
    let dir = Config::expand_path(&config.debug_dir)?;
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    Ok(dir.join(format!("{DUMP_PREFIX}{timestamp}.wav")))
}

/// Delete session dumps that are too old or beyond the count limit
///
/// Returns the number of files deleted. Individual deletion failures are
/// logged but don't stop the sweep.
///
/// # Errors
/// Returns error if the directory listing fails
pub fn cleanup_old_recordings(config: &RecordingConfig) -> Result<usize> {
    let debug_dir = Config::expand_path(&config.debug_dir)?;
    sweep(&debug_dir, config.retention_days, config.max_count)
}

fn sweep(debug_dir: &Path, retention_days: u64, max_count: usize) -> Result<usize> {
    if !debug_dir.exists() {
        tracing::debug!("recording directory does not exist, skipping cleanup");
        return Ok(0);
    }

    // Collect dumps with the timestamp baked into their names
    let mut recordings: Vec<(PathBuf, u64)> = fs::read_dir(debug_dir)
        .context("failed to read recording directory")?
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            if !path.is_file() {
                return None;
            }

            let filename = path.file_name()?.to_str()?;
            let timestamp: u64 = filename
                .strip_prefix(DUMP_PREFIX)?
                .strip_suffix(".wav")?
                .parse()
                .ok()?;

            Some((path, timestamp))
        })
        .collect();

    if recordings.is_empty() {
        return Ok(0);
    }

    // Newest first; everything past max_count goes regardless of age
    recordings.sort_by(|a, b| b.1.cmp(&a.1));

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let cutoff = now.saturating_sub(retention_days * 24 * 60 * 60);

    let mut deleted = 0;
    for (index, (path, timestamp)) in recordings.iter().enumerate() {
        let expired = *timestamp < cutoff;
        let over_count = index >= max_count;
        if !expired && !over_count {
            continue;
        }

        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(
                    "deleted recording {:?} (expired: {}, over count: {})",
                    path,
                    expired,
                    over_count
                );
                deleted += 1;
            }
            Err(e) => tracing::warn!("failed to delete recording {:?}: {}", path, e),
        }
    }

    if deleted > 0 {
        tracing::info!("recording cleanup deleted {} file(s)", deleted);
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scribe-cleanup-{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(dir: &Path, timestamp: u64) {
        fs::write(dir.join(format!("session_{timestamp}.wav")), b"riff").unwrap();
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[test]
    fn test_sweep_missing_dir_is_noop() {
        let deleted = sweep(Path::new("/nonexistent/scribe-cleanup"), 7, 20).unwrap();
        assert_eq!(deleted, 0);
    }

    #[test]
    fn test_sweep_keeps_recent_files() {
        let dir = temp_dir("recent");
        let now = now_secs();
        touch(&dir, now);
        touch(&dir, now - 60);

        let deleted = sweep(&dir, 7, 20).unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_sweep_deletes_expired_files() {
        let dir = temp_dir("expired");
        let now = now_secs();
        touch(&dir, now);
        touch(&dir, now - 30 * 24 * 60 * 60);

        let deleted = sweep(&dir, 7, 20).unwrap();
        assert_eq!(deleted, 1);
        assert!(dir.join(format!("session_{now}.wav")).exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_sweep_enforces_max_count() {
        let dir = temp_dir("count");
        let now = now_secs();
        for i in 0..5 {
            touch(&dir, now - i);
        }

        let deleted = sweep(&dir, 7, 2).unwrap();
        assert_eq!(deleted, 3);
        // The two newest survive
        assert!(dir.join(format!("session_{now}.wav")).exists());
        assert!(dir.join(format!("session_{}.wav", now - 1)).exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_sweep_ignores_unrelated_files() {
        let dir = temp_dir("unrelated");
        fs::write(dir.join("notes.txt"), b"keep me").unwrap();
        fs::write(dir.join("session_notanumber.wav"), b"keep me too").unwrap();

        let deleted = sweep(&dir, 0, 0).unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_dump_path_uses_prefix() {
        let config = RecordingConfig {
            save_debug_wav: true,
            debug_dir: "/tmp/scribe-dumps".to_owned(),
            retention_days: 7,
            max_count: 20,
        };
        let path = dump_path(&config).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(DUMP_PREFIX));
        assert!(name.ends_with(".wav"));
    }
}
