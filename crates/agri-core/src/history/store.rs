//! Chat history persistence using one JSON file per session

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::llm::{ChatMessage, Role};
use crate::Result;

/// Default persistence cap applied by [`HistoryStore::trim`] callers
pub const DEFAULT_MAX_MESSAGES: usize = 20;

/// File-backed history store
///
/// Each session lives at `<data_dir>/<stem>.json` as a pretty-printed JSON
/// array of `{role, content}` objects, where the stem is the percent-encoded
/// session id (plain ids like `s1` or a UUID map to themselves). Writes replace the whole file and
/// are not atomic; there is no locking between concurrent writers of the same
/// session (last write wins).
#[derive(Debug, Clone)]
pub struct HistoryStore {
    data_dir: PathBuf,
}

impl HistoryStore {
    /// Create a store rooted at `data_dir`, creating the directory if absent
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// Directory holding the session files
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of a session's file; always a direct child of `data_dir`
    fn file_path(&self, session_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", file_stem(session_id)))
    }

    /// Load a session's history.
    ///
    /// Absent, unreadable or malformed files all yield an empty history.
    pub fn load(&self, session_id: &str) -> Vec<ChatMessage> {
        let path = self.file_path(session_id);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read history {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(history) => history,
            Err(e) => {
                warn!("Treating corrupt history {} as empty: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Overwrite a session's history
    pub fn save(&self, session_id: &str, history: &[ChatMessage]) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let json = serde_json::to_string_pretty(history)?;
        fs::write(self.file_path(session_id), json)?;
        Ok(())
    }

    /// Append one message (load, push, save)
    pub fn append(&self, session_id: &str, role: Role, content: impl Into<String>) -> Result<()> {
        let mut history = self.load(session_id);
        history.push(ChatMessage::new(role, content));
        self.save(session_id, &history)
    }

    /// Keep only the most recent `max_messages` entries
    pub fn trim(&self, session_id: &str, max_messages: usize) -> Result<()> {
        let history = self.load(session_id);
        if history.len() > max_messages {
            debug!(
                "Trimming session {} from {} to {} messages",
                session_id,
                history.len(),
                max_messages
            );
            self.save(session_id, &history[history.len() - max_messages..])?;
        }
        Ok(())
    }

    /// Delete a session's history; no-op if it doesn't exist
    pub fn clear(&self, session_id: &str) -> Result<()> {
        match fs::remove_file(self.file_path(session_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Percent-encode a session id into a file name stem.
///
/// Separators and every other reserved byte are escaped, and a leading `.` is
/// escaped too, so no id can name a parent directory or a hidden file.
fn file_stem(session_id: &str) -> String {
    let encoded = urlencoding::encode(session_id);
    if encoded.starts_with('.') {
        format!("%2E{}", &encoded[1..])
    } else {
        encoded.into_owned()
    }
}
