//! Display-name lookups for users and listings
//!
//! User profiles and listing metadata live outside the chat subsystem. The
//! conversation index only needs their display names, so it talks to them
//! through the `Directory` trait. A missing entry is not an error: callers
//! fall back to a placeholder label.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// Source of display names owned by external collaborators
#[async_trait]
pub trait Directory: Send + Sync {
    /// Display name of a user, `None` if the user no longer exists
    async fn user_display_name(&self, user_id: &str) -> Option<String>;

    /// Title of a listing, `None` if the listing no longer exists
    async fn listing_name(&self, listing_id: &str) -> Option<String>;
}

/// On-disk form of a static directory
#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    users: HashMap<String, String>,
    #[serde(default)]
    listings: HashMap<String, String>,
}

/// In-memory directory, filled programmatically or from a JSON file
#[derive(Debug, Default)]
pub struct StaticDirectory {
    users: RwLock<HashMap<String, String>>,
    listings: RwLock<HashMap<String, String>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{"users": {id: name}, "listings": {id: title}}`
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read directory file {}", path.display()))?;

        let file: DirectoryFile =
            serde_json::from_str(&raw).context("Failed to parse directory file")?;

        info!(
            "Loaded directory with {} users and {} listings",
            file.users.len(),
            file.listings.len()
        );

        Ok(Self {
            users: RwLock::new(file.users),
            listings: RwLock::new(file.listings),
        })
    }

    pub async fn insert_user(&self, user_id: impl Into<String>, name: impl Into<String>) {
        self.users.write().await.insert(user_id.into(), name.into());
    }

    pub async fn insert_listing(&self, listing_id: impl Into<String>, title: impl Into<String>) {
        self.listings
            .write()
            .await
            .insert(listing_id.into(), title.into());
    }

    pub async fn remove_user(&self, user_id: &str) {
        self.users.write().await.remove(user_id);
    }

    pub async fn remove_listing(&self, listing_id: &str) {
        self.listings.write().await.remove(listing_id);
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn user_display_name(&self, user_id: &str) -> Option<String> {
        self.users.read().await.get(user_id).cloned()
    }

    async fn listing_name(&self, listing_id: &str) -> Option<String> {
        self.listings.read().await.get(listing_id).cloned()
    }
}
