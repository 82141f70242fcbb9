//! File-backed Session Store.
//!
//! One JSON-lines file per conversation under the configured store path: a
//! header record followed by one record per message. Appends are flushed and
//! synced before returning, and a per-conversation async mutex serializes
//! concurrent appends so records never interleave or truncate each other.
//! Feedback updates rewrite the file via a temp-and-rename under the same
//! lock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use crate::domain::conversation::{
    Conversation, ConversationSummary, Feedback, Message,
};
use crate::domain::foundation::{ConversationId, DomainError, MessageId, Timestamp};
use crate::ports::SessionStore;

/// First line of every conversation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HeaderRecord {
    conversation_id: ConversationId,
    created_at: Timestamp,
}

/// File-backed store for conversations.
#[derive(Debug)]
pub struct FileSessionStore {
    base_path: PathBuf,
    /// Per-conversation append ordering locks.
    locks: RwLock<HashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl FileSessionStore {
    /// Creates a store rooted at the given directory.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            locks: RwLock::new(HashMap::new()),
        }
    }

    fn conversation_path(&self, id: &ConversationId) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", id))
    }

    async fn lock_for(&self, id: &ConversationId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.write().await;
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    async fn ensure_base_dir(&self) -> Result<(), DomainError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(DomainError::storage_unavailable)
    }

    async fn read_file(
        &self,
        id: &ConversationId,
    ) -> Result<(HeaderRecord, Vec<Message>), DomainError> {
        let path = self.conversation_path(id);
        let contents = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DomainError::conversation_not_found(id));
            }
            Err(e) => return Err(DomainError::storage_unavailable(e)),
        };
        parse_conversation_file(&contents)
    }

    async fn write_file(
        &self,
        id: &ConversationId,
        header: &HeaderRecord,
        messages: &[Message],
    ) -> Result<(), DomainError> {
        let path = self.conversation_path(id);
        let tmp_path = self.base_path.join(format!("{}.jsonl.tmp", id));

        let mut contents = encode_line(header)?;
        for message in messages {
            contents.push_str(&encode_line(message)?);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .await
            .map_err(DomainError::storage_unavailable)?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(DomainError::storage_unavailable)?;
        file.sync_all()
            .await
            .map_err(DomainError::storage_unavailable)?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(DomainError::storage_unavailable)
    }
}

fn encode_line<T: Serialize>(record: &T) -> Result<String, DomainError> {
    let mut line = serde_json::to_string(record).map_err(DomainError::storage_unavailable)?;
    line.push('\n');
    Ok(line)
}

fn parse_conversation_file(contents: &str) -> Result<(HeaderRecord, Vec<Message>), DomainError> {
    let mut lines = contents.lines().filter(|l| !l.trim().is_empty());
    let header_line = lines
        .next()
        .ok_or_else(|| DomainError::storage_unavailable("empty conversation file"))?;
    let header: HeaderRecord = serde_json::from_str(header_line)
        .map_err(|e| DomainError::storage_unavailable(format!("corrupt header: {}", e)))?;

    let mut messages = Vec::new();
    for line in lines {
        let message: Message = serde_json::from_str(line)
            .map_err(|e| DomainError::storage_unavailable(format!("corrupt record: {}", e)))?;
        messages.push(message);
    }
    Ok((header, messages))
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create_conversation(&self) -> Result<ConversationId, DomainError> {
        self.ensure_base_dir().await?;
        let id = ConversationId::generate();
        let lock = self.lock_for(&id).await;
        let _guard = lock.lock().await;

        let header = HeaderRecord {
            conversation_id: id.clone(),
            created_at: Timestamp::now(),
        };
        let path = self.conversation_path(&id);
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
            .await
            .map_err(DomainError::storage_unavailable)?;
        file.write_all(encode_line(&header)?.as_bytes())
            .await
            .map_err(DomainError::storage_unavailable)?;
        file.sync_all()
            .await
            .map_err(DomainError::storage_unavailable)?;
        Ok(id)
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        message: Message,
    ) -> Result<(), DomainError> {
        let lock = self.lock_for(conversation_id).await;
        let _guard = lock.lock().await;

        let path = self.conversation_path(conversation_id);
        let mut file = match OpenOptions::new().append(true).open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DomainError::conversation_not_found(conversation_id));
            }
            Err(e) => return Err(DomainError::storage_unavailable(e)),
        };
        file.write_all(encode_line(&message)?.as_bytes())
            .await
            .map_err(DomainError::storage_unavailable)?;
        // Durable before the call returns.
        file.sync_all()
            .await
            .map_err(DomainError::storage_unavailable)
    }

    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, DomainError> {
        let (_, messages) = self.read_file(conversation_id).await?;
        Ok(messages)
    }

    async fn record_feedback(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        feedback: Feedback,
    ) -> Result<(), DomainError> {
        let lock = self.lock_for(conversation_id).await;
        let _guard = lock.lock().await;

        let (header, messages) = self.read_file(conversation_id).await?;
        let mut conversation = Conversation::from_parts(
            header.conversation_id.clone(),
            header.created_at,
            messages,
        );
        conversation.record_feedback(message_id, feedback)?;
        self.write_file(conversation_id, &header, conversation.messages())
            .await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ConversationSummary>, DomainError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DomainError::storage_unavailable(e)),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(DomainError::storage_unavailable)?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let contents = match fs::read_to_string(&path).await {
                Ok(c) => c,
                Err(_) => continue,
            };
            if let Ok((header, messages)) = parse_conversation_file(&contents) {
                let conversation = Conversation::from_parts(
                    header.conversation_id,
                    header.created_at,
                    messages,
                );
                summaries.push(conversation.summary());
            }
        }
        summaries.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        summaries.truncate(limit);
        Ok(summaries)
    }
}
