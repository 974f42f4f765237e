//! Append-only in-memory chat/event log; flush-to-file on demand and on
//! shutdown (SPEC_FULL.md §4.H).

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatLogError {
    #[error("failed to create chat log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write chat log to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
pub struct ChatLog {
    lines: Vec<String>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `[<timestamp>] <content>` using the configured timestamp
    /// format.
    pub fn append(&mut self, now: chrono::DateTime<chrono::Utc>, format: &str, content: &str) {
        self.lines.push(format!("[{}] {}", now.format(format), content));
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Writes the buffer to `<dir>/<timestamp>.txt` and empties it.
    /// `timestamp` names the file; the directory is created if missing.
    pub async fn flush(&mut self, dir: &Path, timestamp: &str) -> Result<(), ChatLogError> {
        if self.lines.is_empty() {
            return Ok(());
        }
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| ChatLogError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;

        let path = dir.join(format!("{timestamp}.txt"));
        let mut contents = self.lines.join("\n");
        contents.push('\n');

        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| ChatLogError::Write {
                path: path.clone(),
                source,
            })?;

        self.lines.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap()
    }

    #[test]
    fn append_formats_timestamp_and_content() {
        let mut log = ChatLog::new();
        log.append(fixed_time(), "%Y-%m-%d", "* alice joined the game");
        assert_eq!(log.len(), 1);
        assert!(log.is_empty() == false);
    }

    #[tokio::test]
    async fn flush_writes_file_and_empties_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ChatLog::new();
        log.append(fixed_time(), "%Y-%m-%d %H:%M:%S", "* alice joined the game");
        log.append(fixed_time(), "%Y-%m-%d %H:%M:%S", "alice: hello");

        log.flush(dir.path(), "20260728-120000").await.unwrap();
        assert!(log.is_empty());

        let contents = tokio::fs::read_to_string(dir.path().join("20260728-120000.txt"))
            .await
            .unwrap();
        assert!(contents.contains("alice joined the game"));
        assert!(contents.contains("alice: hello"));
        assert!(contents.ends_with('\n'));
    }

    #[tokio::test]
    async fn flush_of_empty_log_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ChatLog::new();
        log.flush(dir.path(), "empty").await.unwrap();
        assert!(!dir.path().join("empty.txt").exists());
    }
}
