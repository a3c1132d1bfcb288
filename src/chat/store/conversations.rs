//! Conversation summaries and message logs.

use tracing::{debug, info, warn};

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{ConversationId, NormalizedId, normalize};
use crate::chat::core::kinds::KindTag;
use crate::chat::core::records::{
    ConversationSummary, MessageLog, MessageRecord, OutgoingMessage, UserRecord,
};
use crate::chat::store::core::{ChatStore, CreationStage, require_email};

impl ChatStore {
    /// Start a conversation: summary in the sender's record, then the message log.
    ///
    /// The summary append is a read-modify-write of the sender's whole record,
    /// so two sessions of the same user creating conversations at once keep
    /// only the last write. A summary whose id is already present is not
    /// appended again, which makes a full retry safe.
    ///
    /// # Errors
    /// - `UserRecordMissing` if the sender has no directory entry.
    /// - `Transport` if the record cannot be read or written.
    /// - `LogInitializationFailed` if the summary was written but the log was
    ///   not; call [`Self::initialize_message_log`] to finish.
    pub async fn create_conversation(
        &self,
        current_user_email: &str,
        other_user_email: &str,
        display_name: &str,
        first_message: &OutgoingMessage,
    ) -> ChatResult<ConversationId> {
        require_email(current_user_email)?;
        let sender = normalize(current_user_email);
        let conversation_id = ConversationId::for_first_message(&first_message.message_id);
        let mut stage = CreationStage::NotStarted;
        debug!(conversation = %conversation_id, %stage, "creating conversation");

        let result = self
            .run_creation(
                &sender,
                &conversation_id,
                other_user_email,
                display_name,
                first_message,
                &mut stage,
            )
            .await;

        match result {
            Ok(()) => {
                stage = CreationStage::Done;
                info!(conversation = %conversation_id, user = %sender, %stage, "conversation created");
                Ok(conversation_id)
            }
            Err(err) => {
                warn!(
                    conversation = %conversation_id,
                    user = %sender,
                    reached = %stage,
                    stage = %CreationStage::Failed,
                    error = %err,
                    "conversation creation failed"
                );
                Err(err)
            }
        }
    }

    async fn run_creation(
        &self,
        sender: &NormalizedId,
        conversation_id: &ConversationId,
        other_user_email: &str,
        display_name: &str,
        first_message: &OutgoingMessage,
        stage: &mut CreationStage,
    ) -> ChatResult<()> {
        let mut record = self
            .user_record(sender)
            .await?
            .ok_or_else(|| ChatError::UserRecordMissing(sender.as_str().to_string()))?;
        *stage = CreationStage::UserRecordFetched;
        debug!(conversation = %conversation_id, stage = %*stage, "sender record loaded");

        if record.summary_mut(conversation_id).is_none() {
            let summary = ConversationSummary {
                id: conversation_id.as_str().to_string(),
                other_user_email: other_user_email.to_string(),
                name: display_name.to_string(),
                latest_message: first_message.latest_message(&self.config.dates)?,
            };
            record.conversations.get_or_insert_with(Vec::new).push(summary);
            self.write(sender.record_path(), &record).await?;
        } else {
            debug!(conversation = %conversation_id, "summary already present");
        }
        *stage = CreationStage::SummaryAppended;
        debug!(conversation = %conversation_id, stage = %*stage, "summary stored");

        self.write_first_message(sender, conversation_id, display_name, first_message)
            .await?;
        *stage = CreationStage::LogInitialized;
        debug!(conversation = %conversation_id, stage = %*stage, "message log initialized");
        Ok(())
    }

    /// Create the log of the conversation opened by `first_message`.
    ///
    /// Only writes when no log exists. A log that already starts with
    /// `first_message` is left as is, together with any later messages, so
    /// this can be retried after `LogInitializationFailed` at any time.
    ///
    /// # Errors
    /// - `LogInitializationFailed` if the log cannot be read or written.
    /// - `MessageIdCollision` if the log starts with a different message.
    pub async fn initialize_message_log(
        &self,
        current_user_email: &str,
        display_name: &str,
        first_message: &OutgoingMessage,
    ) -> ChatResult<ConversationId> {
        require_email(current_user_email)?;
        let sender = normalize(current_user_email);
        let conversation_id = ConversationId::for_first_message(&first_message.message_id);
        self.write_first_message(&sender, &conversation_id, display_name, first_message)
            .await?;
        info!(conversation = %conversation_id, "message log initialized");
        Ok(conversation_id)
    }

    async fn write_first_message(
        &self,
        sender: &NormalizedId,
        conversation_id: &ConversationId,
        display_name: &str,
        first_message: &OutgoingMessage,
    ) -> ChatResult<()> {
        let record = self.message_record(sender, display_name, first_message)?;
        match self.ensure_log(conversation_id, record).await {
            Err(ChatError::Transport(source)) => Err(ChatError::LogInitializationFailed {
                conversation_id: conversation_id.as_str().to_string(),
                source,
            }),
            other => other,
        }
    }

    async fn ensure_log(
        &self,
        conversation_id: &ConversationId,
        first: MessageRecord,
    ) -> ChatResult<()> {
        let existing: Option<MessageLog> = self.read(conversation_id.log_path()).await?;
        let opening = existing
            .as_ref()
            .and_then(|log| log.messages.first())
            .map(|logged| logged.same_message(&first));

        match opening {
            Some(true) => {
                debug!(conversation = %conversation_id, "message log already initialized");
                Ok(())
            }
            Some(false) => Err(ChatError::MessageIdCollision {
                conversation_id: conversation_id.as_str().to_string(),
                message_id: first.id,
            }),
            None => {
                let log = MessageLog {
                    messages: vec![first],
                };
                self.write(conversation_id.log_path(), &log).await
            }
        }
    }

    /// Append `message` to a conversation and refresh the sender's summary.
    ///
    /// A message already logged with the same content is not appended twice,
    /// so after `StaleSummary` the same call can be repeated to finish the
    /// refresh.
    ///
    /// # Errors
    /// - `NotFound` if the conversation has no log.
    /// - `Transport` if the log cannot be read or written.
    /// - `MessageIdCollision` if another message is logged under the same id;
    ///   nothing is written.
    /// - `StaleSummary` if the log was updated but the summary was not.
    pub async fn send_message(
        &self,
        current_user_email: &str,
        conversation_id: &ConversationId,
        display_name: &str,
        message: &OutgoingMessage,
    ) -> ChatResult<()> {
        require_email(current_user_email)?;
        let sender = normalize(current_user_email);

        let mut log: MessageLog = self
            .read(conversation_id.log_path())
            .await?
            .ok_or_else(|| ChatError::NotFound(conversation_id.as_str().to_string()))?;

        let record = self.message_record(&sender, display_name, message)?;
        match log.find(&record.id).map(|logged| logged.same_message(&record)) {
            Some(true) => {
                debug!(conversation = %conversation_id, message = %record.id, "message already logged");
            }
            Some(false) => {
                warn!(conversation = %conversation_id, message = %record.id, "message id already used");
                return Err(ChatError::MessageIdCollision {
                    conversation_id: conversation_id.as_str().to_string(),
                    message_id: record.id,
                });
            }
            None => {
                log.messages.push(record);
                self.write(conversation_id.log_path(), &log).await?;
                debug!(conversation = %conversation_id, message = %message.message_id, "message appended");
            }
        }

        if let Err(err) = self
            .refresh_latest_message(&sender, conversation_id, message)
            .await
        {
            warn!(conversation = %conversation_id, error = %err, "summary left stale");
            return Err(ChatError::StaleSummary {
                conversation_id: conversation_id.as_str().to_string(),
                reason: err.to_string(),
            });
        }

        info!(conversation = %conversation_id, user = %sender, "message sent");
        Ok(())
    }

    async fn refresh_latest_message(
        &self,
        sender: &NormalizedId,
        conversation_id: &ConversationId,
        message: &OutgoingMessage,
    ) -> ChatResult<()> {
        let mut record: UserRecord = self
            .user_record(sender)
            .await?
            .ok_or_else(|| ChatError::UserRecordMissing(sender.as_str().to_string()))?;
        let latest = message.latest_message(&self.config.dates)?;
        let summary = record
            .summary_mut(conversation_id)
            .ok_or_else(|| ChatError::NotFound(format!("{sender}/{conversation_id}")))?;
        summary.latest_message = latest;
        self.write(sender.record_path(), &record).await
    }

    /// Summaries in `email`'s record, oldest first.
    ///
    /// # Errors
    /// Returns `UserRecordMissing` if `email` has no record, or a backend error.
    pub async fn get_all_conversations(&self, email: &str) -> ChatResult<Vec<ConversationSummary>> {
        let id = normalize(email);
        let record = self
            .user_record(&id)
            .await?
            .ok_or_else(|| ChatError::UserRecordMissing(id.as_str().to_string()))?;
        Ok(record.conversations.unwrap_or_default())
    }

    /// Messages of a conversation, oldest first.
    ///
    /// # Errors
    /// Returns `NotFound` if the conversation has no log, or a backend error.
    pub async fn get_all_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> ChatResult<Vec<MessageRecord>> {
        let log: MessageLog = self
            .read(conversation_id.log_path())
            .await?
            .ok_or_else(|| ChatError::NotFound(conversation_id.as_str().to_string()))?;
        Ok(log.messages)
    }

    fn message_record(
        &self,
        sender: &NormalizedId,
        display_name: &str,
        message: &OutgoingMessage,
    ) -> ChatResult<MessageRecord> {
        let tag = message.kind.kind_tag();
        if tag != KindTag::Text {
            debug!(message = %message.message_id, kind = %tag, "non-text content stored without text");
        }
        message.to_record(sender, display_name, &self.config.dates)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::chat::backend::document::DocumentBackend;
    use crate::chat::core::kinds::{MediaItem, MessageKind};
    use crate::chat::core::records::User;
    use crate::chat::store::core::test_support::{at, memory_store};

    const ALICE: &str = "alice@x.com";
    const BOB: &str = "bob@x.com";

    fn text(id: &str, hour: u32, body: &str) -> OutgoingMessage {
        OutgoingMessage::new(id, at(hour, 0, 0), MessageKind::Text(body.to_string()))
    }

    async fn registered_store() -> (
        ChatStore,
        std::sync::Arc<crate::chat::backend::memory::InMemoryDocumentBackend>,
    ) {
        let (store, documents, _) = memory_store();
        store
            .insert_user(&User::new("Alice", "Liddell", ALICE))
            .await
            .unwrap();
        (store, documents)
    }

    #[tokio::test]
    async fn text_conversation_writes_summary_and_log() {
        let (store, _) = registered_store().await;
        let first = text("m1", 9, "hello bob");

        let id = store
            .create_conversation(ALICE, BOB, "Bob", &first)
            .await
            .unwrap();
        assert_eq!(id.as_str(), "conversation_m1");

        let summaries = store.get_all_conversations(ALICE).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "conversation_m1");
        assert_eq!(summaries[0].other_user_email, BOB);
        assert_eq!(summaries[0].latest_message.message, "hello bob");
        assert!(!summaries[0].latest_message.is_read);

        let messages = store.get_all_messages(&id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello bob");
        assert_eq!(messages[0].kind, "text");
        assert_eq!(messages[0].sender_email, "alice-x-com");
        assert_eq!(messages[0].name, "Bob");
    }

    #[tokio::test]
    async fn stored_documents_match_wire_layout() {
        let (store, documents) = registered_store().await;
        store
            .create_conversation(ALICE, BOB, "Bob", &text("m1", 9, "hi"))
            .await
            .unwrap();

        let date = "Jan 1, 2024 at 9:00:00 AM +00:00";
        assert_eq!(
            documents.snapshot("alice-x-com"),
            Some(json!({
                "first-name": "Alice",
                "last-name": "Liddell",
                "conversations": [{
                    "id": "conversation_m1",
                    "other_user_email": BOB,
                    "name": "Bob",
                    "latest_message": { "date": date, "is_read": false, "message": "hi" }
                }]
            }))
        );
        assert_eq!(
            documents.snapshot("conversation_m1"),
            Some(json!({
                "messages": [{
                    "id": "m1",
                    "type": "text",
                    "content": "hi",
                    "date": date,
                    "sender_email": "alice-x-com",
                    "is_read": false,
                    "name": "Bob"
                }]
            }))
        );
    }

    #[tokio::test]
    async fn second_conversation_appends_summary() {
        let (store, _) = registered_store().await;
        store
            .create_conversation(ALICE, BOB, "Bob", &text("m1", 9, "one"))
            .await
            .unwrap();
        store
            .create_conversation(ALICE, "carol@x.com", "Carol", &text("m2", 10, "two"))
            .await
            .unwrap();

        let ids: Vec<String> = store
            .get_all_conversations(ALICE)
            .await
            .unwrap()
            .into_iter()
            .map(|summary| summary.id)
            .collect();
        assert_eq!(ids, vec!["conversation_m1", "conversation_m2"]);
    }

    #[tokio::test]
    async fn repeated_creation_is_idempotent() {
        let (store, _) = registered_store().await;
        let first = text("m1", 9, "hello");
        let id = store
            .create_conversation(ALICE, BOB, "Bob", &first)
            .await
            .unwrap();
        store
            .create_conversation(ALICE, BOB, "Bob", &first)
            .await
            .unwrap();

        assert_eq!(store.get_all_messages(&id).await.unwrap().len(), 1);
        assert_eq!(store.get_all_conversations(ALICE).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_sender_record_is_distinct() {
        let (store, documents, _) = memory_store();
        let err = store
            .create_conversation(ALICE, BOB, "Bob", &text("m1", 9, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::UserRecordMissing(ref id) if id == "alice-x-com"));
        assert_eq!(documents.snapshot("conversation_m1"), None);
    }

    #[tokio::test]
    async fn summary_write_failure_leaves_nothing() {
        let (store, documents) = registered_store().await;
        documents.fail_writes_to("alice-x-com");
        let err = store
            .create_conversation(ALICE, BOB, "Bob", &text("m1", 9, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
        assert_eq!(documents.snapshot("conversation_m1"), None);
    }

    #[tokio::test]
    async fn orphaned_summary_is_reported_and_recoverable() {
        let (store, documents) = registered_store().await;
        let first = text("m1", 9, "hi");
        documents.fail_writes_to("conversation_m1");

        let err = store
            .create_conversation(ALICE, BOB, "Bob", &first)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChatError::LogInitializationFailed { ref conversation_id, .. } if conversation_id == "conversation_m1"
        ));
        assert!(err.is_retry_safe());
        assert_eq!(store.get_all_conversations(ALICE).await.unwrap().len(), 1);

        documents.heal();
        let id = store
            .initialize_message_log(ALICE, "Bob", &first)
            .await
            .unwrap();
        store.initialize_message_log(ALICE, "Bob", &first).await.unwrap();

        assert_eq!(store.get_all_messages(&id).await.unwrap().len(), 1);
        assert_eq!(store.get_all_conversations(ALICE).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn photo_first_message_has_empty_preview() {
        let (store, _) = registered_store().await;
        let photo = OutgoingMessage::new(
            "m1",
            at(9, 0, 0),
            MessageKind::Photo(MediaItem {
                url: Some("https://cdn.example.com/images/p.png".to_string()),
                size: (640.0, 480.0),
            }),
        );
        let id = store
            .create_conversation(ALICE, BOB, "Bob", &photo)
            .await
            .unwrap();

        let summaries = store.get_all_conversations(ALICE).await.unwrap();
        assert_eq!(summaries[0].latest_message.message, "");
        let messages = store.get_all_messages(&id).await.unwrap();
        assert_eq!(messages[0].kind, "photo");
        assert_eq!(messages[0].content, "");
    }

    #[tokio::test]
    async fn send_appends_and_refreshes_summary() {
        let (store, _) = registered_store().await;
        let id = store
            .create_conversation(ALICE, BOB, "Bob", &text("m1", 9, "first"))
            .await
            .unwrap();

        store
            .send_message(ALICE, &id, "Bob", &text("m2", 10, "second"))
            .await
            .unwrap();

        let messages = store.get_all_messages(&id).await.unwrap();
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);

        let summaries = store.get_all_conversations(ALICE).await.unwrap();
        assert_eq!(summaries[0].latest_message.message, "second");
        assert_eq!(
            summaries[0].latest_message.date,
            "Jan 1, 2024 at 10:00:00 AM +00:00"
        );
    }

    #[tokio::test]
    async fn recreating_after_send_keeps_later_messages() {
        let (store, _) = registered_store().await;
        let first = text("m1", 9, "m1");
        let id = store
            .create_conversation(ALICE, BOB, "Bob", &first)
            .await
            .unwrap();
        store
            .send_message(ALICE, &id, "Bob", &text("m2", 10, "m2"))
            .await
            .unwrap();

        store
            .create_conversation(ALICE, BOB, "Bob", &first)
            .await
            .unwrap();
        assert_eq!(store.get_all_messages(&id).await.unwrap().len(), 2);

        store
            .send_message(ALICE, &id, "Bob", &text("m3", 11, "m3"))
            .await
            .unwrap();
        store.initialize_message_log(ALICE, "Bob", &first).await.unwrap();

        let contents: Vec<String> = store
            .get_all_messages(&id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn log_opened_by_another_message_is_kept() {
        let (store, documents) = registered_store().await;
        let id = store
            .create_conversation(ALICE, BOB, "Bob", &text("m1", 9, "hi"))
            .await
            .unwrap();
        let before = documents.snapshot(id.log_path());

        let err = store
            .initialize_message_log(ALICE, "Bob", &text("m1", 9, "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::MessageIdCollision { ref message_id, .. } if message_id == "m1"));
        assert_eq!(documents.snapshot(id.log_path()), before);
    }

    #[tokio::test]
    async fn colliding_id_with_other_content_is_rejected() {
        let (store, _) = registered_store().await;
        let id = store
            .create_conversation(ALICE, BOB, "Bob", &text("m0", 9, "first"))
            .await
            .unwrap();

        let dates = store.config().dates.clone();
        let sent = at(10, 0, 0);
        let one = OutgoingMessage::compose(
            ALICE,
            BOB,
            sent,
            MessageKind::Text("one".to_string()),
            &dates,
        )
        .unwrap();
        let two = OutgoingMessage::compose(
            ALICE,
            BOB,
            sent + chrono::Duration::milliseconds(300),
            MessageKind::Text("two".to_string()),
            &dates,
        )
        .unwrap();
        assert_eq!(one.message_id, two.message_id);

        store.send_message(ALICE, &id, "Bob", &one).await.unwrap();
        let err = store
            .send_message(ALICE, &id, "Bob", &two)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::MessageIdCollision { .. }));
        assert!(!err.is_retry_safe());

        let contents: Vec<String> = store
            .get_all_messages(&id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "one"]);
        assert_eq!(
            store.get_all_conversations(ALICE).await.unwrap()[0]
                .latest_message
                .message,
            "one"
        );

        store.send_message(ALICE, &id, "Bob", &one).await.unwrap();
        assert_eq!(store.get_all_messages(&id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn send_to_unknown_conversation_is_not_found() {
        let (store, _) = registered_store().await;
        let id = ConversationId::for_first_message("nope");
        assert!(matches!(
            store
                .send_message(ALICE, &id, "Bob", &text("m2", 10, "x"))
                .await,
            Err(ChatError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stale_summary_is_reported_then_repaired() {
        let (store, documents) = registered_store().await;
        let id = store
            .create_conversation(ALICE, BOB, "Bob", &text("m1", 9, "first"))
            .await
            .unwrap();
        let second = text("m2", 10, "second");

        documents.fail_writes_to("alice-x-com");
        let err = store
            .send_message(ALICE, &id, "Bob", &second)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::StaleSummary { .. }));
        assert_eq!(store.get_all_messages(&id).await.unwrap().len(), 2);
        assert_eq!(
            store.get_all_conversations(ALICE).await.unwrap()[0]
                .latest_message
                .message,
            "first"
        );

        documents.heal();
        store.send_message(ALICE, &id, "Bob", &second).await.unwrap();
        assert_eq!(store.get_all_messages(&id).await.unwrap().len(), 2);
        assert_eq!(
            store.get_all_conversations(ALICE).await.unwrap()[0]
                .latest_message
                .message,
            "second"
        );
    }

    #[tokio::test]
    async fn log_write_failure_on_send_is_transport() {
        let (store, documents) = registered_store().await;
        let id = store
            .create_conversation(ALICE, BOB, "Bob", &text("m1", 9, "first"))
            .await
            .unwrap();
        documents.fail_writes_to(id.log_path());

        assert!(matches!(
            store
                .send_message(ALICE, &id, "Bob", &text("m2", 10, "x"))
                .await,
            Err(ChatError::Transport(_))
        ));
        assert_eq!(
            store.get_all_conversations(ALICE).await.unwrap()[0]
                .latest_message
                .message,
            "first"
        );
    }

    #[tokio::test]
    async fn reads_distinguish_absence() {
        let (store, _) = registered_store().await;
        assert!(store.get_all_conversations(ALICE).await.unwrap().is_empty());
        assert!(matches!(
            store.get_all_conversations(BOB).await,
            Err(ChatError::UserRecordMissing(_))
        ));
        assert!(matches!(
            store
                .get_all_messages(&ConversationId::for_first_message("m9"))
                .await,
            Err(ChatError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn malformed_log_is_invalid_document() {
        let (store, documents) = registered_store().await;
        documents
            .set("conversation_m1", json!({ "messages": "oops" }))
            .await
            .unwrap();
        assert!(matches!(
            store
                .get_all_messages(&ConversationId::for_first_message("m1"))
                .await,
            Err(ChatError::InvalidDocument { .. })
        ));
    }
}
