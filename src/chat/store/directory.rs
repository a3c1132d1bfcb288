//! User directory and the flat search list.

use tracing::{debug, info, warn};

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{SEARCH_LIST_PATH, normalize};
use crate::chat::core::records::{SearchEntry, User, UserRecord};
use crate::chat::store::core::{ChatStore, require_email};

/// Outcome of [`ChatStore::backfill_search_list`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// User records inspected.
    pub scanned: usize,
    /// Normalized ids appended to the search list.
    pub added: Vec<String>,
}

impl ChatStore {
    /// Whether a directory entry exists for `email`.
    ///
    /// # Errors
    /// Returns `Transport` if the backend cannot be reached; absence is `Ok(false)`.
    pub async fn user_exists(&self, email: &str) -> ChatResult<bool> {
        let id = normalize(email);
        let exists = self.documents.get(id.record_path()).await?.is_some();
        debug!(user = %id, exists, "checked user existence");
        Ok(exists)
    }

    /// Register `user`: directory entry first, then the search list.
    ///
    /// An existing directory entry only gets its names replaced; its
    /// conversations and unknown fields are kept, so retrying after
    /// `PartialWriteFailure` loses nothing. The search list is read, extended and written back whole; two
    /// registrations racing on it can lose one entry, which
    /// [`Self::backfill_search_list`] restores.
    ///
    /// # Errors
    /// Returns `Transport` if the directory write fails and
    /// `PartialWriteFailure` if only the search list update fails.
    pub async fn insert_user(&self, user: &User) -> ChatResult<()> {
        require_email(&user.email_address)?;
        let id = user.normalized_id();

        let record = match self.user_record(&id).await? {
            Some(mut existing) => {
                existing.apply_user(user);
                existing
            }
            None => UserRecord::for_user(user),
        };
        self.write(id.record_path(), &record).await?;
        debug!(user = %id, "directory entry written");

        match self.append_search_entry(user.search_entry()).await {
            Ok(()) => {
                info!(user = %id, "registered user");
                Ok(())
            }
            Err(ChatError::Transport(source)) => {
                warn!(user = %id, error = %source, "search list update failed after directory write");
                Err(ChatError::PartialWriteFailure {
                    normalized_id: id.as_str().to_string(),
                    source,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Every entry of the search list; empty when the list was never written.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached or the list is malformed.
    pub async fn get_all_users(&self) -> ChatResult<Vec<SearchEntry>> {
        Ok(self
            .read::<Vec<SearchEntry>>(SEARCH_LIST_PATH)
            .await?
            .unwrap_or_default())
    }

    /// Entries whose full name or any word of it starts with `query`, ignoring case.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached or the list is malformed.
    pub async fn search_users(&self, query: &str) -> ChatResult<Vec<SearchEntry>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let users = self.get_all_users().await?;
        Ok(users
            .into_iter()
            .filter(|entry| {
                let name = entry.name.to_lowercase();
                name.starts_with(&needle)
                    || name.split_whitespace().any(|word| word.starts_with(&needle))
            })
            .collect())
    }

    /// Append every user record missing from the search list.
    ///
    /// Safe to run repeatedly; a second run adds nothing.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    pub async fn backfill_search_list(&self) -> ChatResult<BackfillReport> {
        let mut listed = self.get_all_users().await?;
        let mut report = BackfillReport::default();

        for path in self.documents.list_paths().await? {
            if path == SEARCH_LIST_PATH {
                continue;
            }
            let Some(value) = self.documents.get(&path).await? else {
                continue;
            };
            if value.get("first-name").is_none() || value.get("messages").is_some() {
                continue;
            }
            let record: UserRecord = match serde_json::from_value(value) {
                Ok(record) => record,
                Err(err) => {
                    warn!(path = %path, error = %err, "skipping malformed user record");
                    continue;
                }
            };
            report.scanned += 1;

            if listed.iter().any(|entry| entry.email == path) {
                continue;
            }
            listed.push(SearchEntry {
                name: record.display_name(),
                email: path.clone(),
            });
            report.added.push(path);
        }

        if !report.added.is_empty() {
            self.write(SEARCH_LIST_PATH, &listed).await?;
        }
        info!(
            scanned = report.scanned,
            added = report.added.len(),
            "search list backfill finished"
        );
        Ok(report)
    }

    async fn append_search_entry(&self, entry: SearchEntry) -> ChatResult<()> {
        let mut users = self.get_all_users().await?;
        if users.iter().any(|existing| existing.email == entry.email) {
            debug!(user = %entry.email, "already in search list");
            return Ok(());
        }
        users.push(entry);
        self.write(SEARCH_LIST_PATH, &users).await
    }
}
