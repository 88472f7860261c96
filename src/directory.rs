//! User directory used to resolve an inbound phone number to a person.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DirectoryStats {
    pub tickets: usize,
    pub users: usize,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// First record whose stored `phone` equals a candidate, tried in candidate order
    /// against a single view of the directory.
    async fn find_by_phones(
        &self,
        candidates: &[String],
    ) -> Result<Option<UserRecord>, AppError>;

    async fn stats(&self) -> Result<DirectoryStats, AppError>;
}

fn first_match<'a>(users: &'a [UserRecord], candidates: &[String]) -> Option<&'a UserRecord> {
    candidates
        .iter()
        .find_map(|candidate| users.iter().find(|user| &user.phone == candidate))
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryDocument {
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default)]
    tickets: Vec<Value>,
}

/// Directory backed by a JSON document that is re-read on every access.
#[derive(Debug, Clone)]
pub struct JsonFileDirectory {
    path: PathBuf,
}

impl JsonFileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<DirectoryDocument, AppError> {
        let raw = tokio::fs::read(&self.path).await.map_err(|err| {
            AppError::unavailable(
                "directory_unreadable",
                format!("failed to read {}: {err}", self.path.display()),
            )
        })?;

        serde_json::from_slice(&raw).map_err(|err| {
            AppError::internal(format!(
                "failed to parse user directory {}: {err}",
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl UserDirectory for JsonFileDirectory {
    async fn find_by_phones(
        &self,
        candidates: &[String],
    ) -> Result<Option<UserRecord>, AppError> {
        let document = self.load().await?;
        Ok(first_match(&document.users, candidates).cloned())
    }

    async fn stats(&self) -> Result<DirectoryStats, AppError> {
        let document = self.load().await?;
        Ok(DirectoryStats {
            tickets: document.tickets.len(),
            users: document.users.len(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: Vec<UserRecord>,
    tickets: usize,
}

impl InMemoryDirectory {
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self { users, tickets: 0 }
    }

    pub fn with_tickets(mut self, tickets: usize) -> Self {
        self.tickets = tickets;
        self
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_phones(
        &self,
        candidates: &[String],
    ) -> Result<Option<UserRecord>, AppError> {
        Ok(first_match(&self.users, candidates).cloned())
    }

    async fn stats(&self) -> Result<DirectoryStats, AppError> {
        Ok(DirectoryStats {
            tickets: self.tickets,
            users: self.users.len(),
        })
    }
}
