// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Destinations for consumed game logs.

use crate::routing::GameLog;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::{io, path::PathBuf};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::debug;

pub const DEFAULT_LOG_FILE: &str = "game.log";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn write_log(&self, entry: &GameLog) -> io::Result<()>;
}

/// Appends one line per entry to a file.
pub struct FileLogSink {
    path: PathBuf,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileLogSink { path: path.into() }
    }
}

impl Default for FileLogSink {
    fn default() -> Self {
        FileLogSink::new(DEFAULT_LOG_FILE)
    }
}

pub(crate) fn format_entry(entry: &GameLog) -> String {
    format!(
        "{} {}: {}\n",
        entry.current_time.to_rfc3339(),
        entry.username,
        entry.message
    )
}

#[async_trait]
impl LogSink for FileLogSink {
    async fn write_log(&self, entry: &GameLog) -> io::Result<()> {
        debug!(path = %self.path.display(), "writing game log");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(format_entry(entry).as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(message: &str) -> GameLog {
        GameLog {
            current_time: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            message: message.to_owned(),
            username: "alice".to_owned(),
        }
    }

    #[tokio::test]
    async fn appends_entries_as_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.log");
        let sink = FileLogSink::new(&path);

        sink.write_log(&entry("first")).await.unwrap();
        sink.write_log(&entry("second")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "2025-01-02T03:04:05+00:00 alice: first\n2025-01-02T03:04:05+00:00 alice: second\n"
        );
    }

    #[tokio::test]
    async fn reports_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileLogSink::new(dir.path().join("missing").join("game.log"));

        assert!(sink.write_log(&entry("lost")).await.is_err());
    }
}
