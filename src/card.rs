//! Item card controller: the item on display, its projected fields and the
//! single field being edited.
//!
//! Every successful save or delete reloads the item through the store, so
//! the card always shows what the board holds.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::board::fields::{DisplayField, FILES_KEY, FieldMapper, STATUS_KEY};
use crate::board::models::{FileRef, Item};
use crate::board::query::{ColumnKind, ColumnValuePatch};
use crate::board::store::ItemStore;

/// The field currently being edited and its uncommitted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub key: String,
    pub value: String,
}

pub struct ItemCard {
    store: ItemStore,
    mapper: Arc<FieldMapper>,
    board_id: Option<String>,
    item_id: String,
    item: Option<Item>,
    editing: Option<PendingEdit>,
}

impl ItemCard {
    pub fn new(
        store: ItemStore,
        mapper: Arc<FieldMapper>,
        item_id: impl Into<String>,
        board_id: Option<String>,
    ) -> Self {
        Self {
            store,
            mapper,
            board_id: board_id.filter(|b| !b.is_empty()),
            item_id: item_id.into(),
            item: None,
            editing: None,
        }
    }

    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    pub fn board_id(&self) -> Option<&str> {
        self.board_id.as_deref()
    }

    /// Fetch the item. A failed fetch keeps whatever the card already holds.
    pub async fn load(&mut self) -> bool {
        match self.store.fetch(&self.item_id).await {
            Some(item) => {
                self.item = Some(item);
                true
            }
            None => false,
        }
    }

    pub async fn reload(&mut self) -> bool {
        self.load().await
    }

    pub fn display_fields(&self) -> Vec<DisplayField> {
        self.item
            .as_ref()
            .map(|item| self.mapper.project_display_fields(item))
            .unwrap_or_default()
    }

    pub fn field(&self, key: &str) -> Option<DisplayField> {
        self.display_fields().into_iter().find(|f| f.key == key)
    }

    pub fn status(&self) -> Option<String> {
        self.field(STATUS_KEY).map(|f| f.value)
    }

    /// Attachments of the files column that can be pushed to a drive.
    pub fn files(&self) -> Vec<FileRef> {
        let (Some(item), Some(title)) = (&self.item, self.mapper.field_map().title_for(FILES_KEY))
        else {
            return Vec::new();
        };
        self.mapper.file_refs(item, title)
    }

    pub fn pending(&self) -> Option<&PendingEdit> {
        self.editing.as_ref()
    }

    /// Start editing `key`, seeded with its current value. File fields and
    /// fields absent from the item can't be edited.
    pub fn begin_edit(&mut self, key: &str) -> bool {
        match self.field(key) {
            Some(field) if !field.is_file() => {
                self.editing = Some(PendingEdit {
                    key: field.key,
                    value: field.value,
                });
                true
            }
            _ => false,
        }
    }

    pub fn change(&mut self, text: impl Into<String>) {
        if let Some(edit) = self.editing.as_mut() {
            edit.value = text.into();
        }
    }

    /// End the edit, saving only when the text differs from the current
    /// value. Returns whether a save succeeded.
    pub async fn commit(&mut self) -> bool {
        let Some(edit) = self.editing.take() else {
            return false;
        };
        let current = self.field(&edit.key).map(|f| f.value).unwrap_or_default();
        if edit.value == current {
            debug!(key = %edit.key, "value unchanged, nothing to save");
            return false;
        }
        self.save_field(&edit.key, &edit.value).await
    }

    pub fn escape(&mut self) {
        self.editing = None;
    }

    pub async fn change_status(&mut self, label: &str) -> bool {
        self.save_field(STATUS_KEY, label).await
    }

    /// Write `value` to the column behind `key` using the column's inferred
    /// type, then reload. Nothing is sent without a board id or column id.
    #[instrument(skip(self, value), fields(item_id = %self.item_id))]
    pub async fn save_field(&mut self, key: &str, value: &str) -> bool {
        let Some(board_id) = self.board_id.clone() else {
            debug!("no board id, skipping save");
            return false;
        };
        let Some(field) = self.field(key) else {
            return false;
        };
        let Some(column_id) = field.column_id else {
            debug!(%key, "field has no column id, skipping save");
            return false;
        };

        let patch = ColumnValuePatch::single(column_id, ColumnKind::from(field.kind), value);
        let saved = self
            .store
            .update(&board_id, &self.item_id, &patch)
            .await
            .is_some();
        self.reload().await;
        saved
    }

    /// Delete the item. On success the card is emptied and reloaded, so it
    /// stays empty once the board no longer returns the item.
    #[instrument(skip(self), fields(item_id = %self.item_id))]
    pub async fn delete(&mut self) -> bool {
        if self.item.is_none() {
            return false;
        }
        let deleted = self.store.remove(&self.item_id).await;
        if deleted {
            self.editing = None;
            self.item = None;
            self.reload().await;
        }
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::api::ApiResponse;
    use crate::board::fields::FieldMap;
    use crate::board::testing::{MockPlatform, RecordingNotifier};
    use crate::ui::notify::NoticeKind;
    use serde_json::json;

    fn item_response(status: &str) -> ApiResponse {
        ApiResponse::with_data(json!({
            "items": [{
                "id": "42",
                "name": "Acme",
                "column_values": [
                    {"id": "status", "text": status, "column": {"id": "status", "title": "Status"}},
                    {"id": "text9", "text": "call back", "column": {"id": "text9", "title": "Notes"}},
                    {"id": "files", "text": "", "column": {"id": "files", "title": "Files"},
                     "files": [{"asset_id": 11, "name": "brief.pdf"}, {"name": "no-asset.txt"}]}
                ]
            }]
        }))
    }

    fn mutation_ok() -> ApiResponse {
        ApiResponse::with_data(json!({"change_multiple_column_values": {"id": "42"}}))
    }

    fn card_with(
        api: MockPlatform,
        board_id: Option<&str>,
    ) -> (ItemCard, Arc<MockPlatform>, Arc<RecordingNotifier>) {
        let api = Arc::new(api);
        let notifier = Arc::new(RecordingNotifier::default());
        let store = ItemStore::new(api.clone(), notifier.clone());
        let mapper = Arc::new(FieldMapper::new(FieldMap::default()));
        let card = ItemCard::new(store, mapper, "42", board_id.map(str::to_string));
        (card, api, notifier)
    }

    #[tokio::test]
    async fn load_projects_fields_in_mapping_order() {
        let (mut card, _, _) = card_with(MockPlatform::new().respond(item_response("Done")), Some("7"));
        assert!(card.load().await);
        let keys: Vec<_> = card.display_fields().into_iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["status", "files", "notes"]);
        assert_eq!(card.status().as_deref(), Some("Done"));
    }

    #[tokio::test]
    async fn empty_card_has_no_fields() {
        let (mut card, _, _) = card_with(MockPlatform::new(), Some("7"));
        assert!(!card.load().await);
        assert!(card.display_fields().is_empty());
        assert!(card.files().is_empty());
    }

    #[tokio::test]
    async fn files_lists_only_entries_with_asset_ids() {
        let (mut card, _, _) = card_with(MockPlatform::new().respond(item_response("Done")), Some("7"));
        card.load().await;
        let files = card.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].asset_id, "11");
        assert_eq!(files[0].name, "brief.pdf");
    }

    #[tokio::test]
    async fn file_fields_cannot_be_edited() {
        let (mut card, _, _) = card_with(MockPlatform::new().respond(item_response("Done")), Some("7"));
        card.load().await;
        assert!(!card.begin_edit("files"));
        assert!(card.pending().is_none());
        assert!(!card.begin_edit("driveLink"));
    }

    #[tokio::test]
    async fn commit_saves_changed_value_and_reloads() {
        let api = MockPlatform::new()
            .respond(item_response("Done"))
            .respond(mutation_ok())
            .respond(item_response("Done"));
        let (mut card, api, notifier) = card_with(api, Some("7"));
        card.load().await;

        assert!(card.begin_edit("notes"));
        assert_eq!(card.pending().map(|e| e.value.as_str()), Some("call back"));
        card.change("call Tuesday");
        assert!(card.commit().await);
        assert!(card.pending().is_none());

        let requests = api.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests[1].0.contains("change_multiple_column_values"));
        assert!(requests[1].0.contains("call Tuesday"));
        assert_eq!(notifier.count(NoticeKind::Success), 1);
    }

    #[tokio::test]
    async fn commit_with_unchanged_value_sends_nothing() {
        let (mut card, api, _) = card_with(MockPlatform::new().respond(item_response("Done")), Some("7"));
        card.load().await;
        card.begin_edit("notes");
        assert!(!card.commit().await);
        assert!(card.pending().is_none());
        assert_eq!(api.request_count(), 1);
    }

    #[tokio::test]
    async fn escape_discards_the_edit() {
        let (mut card, api, _) = card_with(MockPlatform::new().respond(item_response("Done")), Some("7"));
        card.load().await;
        card.begin_edit("notes");
        card.change("something else");
        card.escape();
        assert!(card.pending().is_none());
        assert!(!card.commit().await);
        assert_eq!(api.request_count(), 1);
    }

    #[tokio::test]
    async fn change_status_sends_label() {
        let api = MockPlatform::new()
            .respond(item_response("Working on it"))
            .respond(mutation_ok())
            .respond(item_response("Stuck"));
        let (mut card, api, _) = card_with(api, Some("7"));
        card.load().await;

        assert!(card.change_status("Stuck").await);
        assert_eq!(card.status().as_deref(), Some("Stuck"));
        let requests = api.requests.lock().unwrap();
        assert!(requests[1].0.contains(r#"\"label\":\"Stuck\""#));
    }

    #[tokio::test]
    async fn save_without_board_id_is_skipped() {
        let (mut card, api, _) = card_with(MockPlatform::new().respond(item_response("Done")), None);
        card.load().await;
        assert!(!card.change_status("Stuck").await);
        assert_eq!(api.request_count(), 1);
    }

    #[tokio::test]
    async fn delete_reloads_and_empties_card() {
        let api = MockPlatform::new()
            .respond(item_response("Done"))
            .respond(ApiResponse::with_data(json!({"delete_item": {"id": "42"}})))
            .respond(ApiResponse::with_data(json!({"items": []})));
        let (mut card, _, notifier) = card_with(api, Some("7"));
        card.load().await;

        assert!(card.delete().await);
        assert!(card.item().is_none());
        assert_eq!(notifier.texts(), vec!["Item deleted successfully."]);
    }

    #[tokio::test]
    async fn failed_reload_after_save_keeps_item() {
        let api = MockPlatform::new()
            .respond(item_response("Done"))
            .respond(mutation_ok())
            .respond(crate::board::testing::error_coded("InternalServerError"));
        let (mut card, api, _) = card_with(api, Some("7"));
        card.load().await;

        card.begin_edit("notes");
        card.change("call Tuesday");
        assert!(card.commit().await);
        assert_eq!(api.request_count(), 3);
        assert_eq!(card.item().map(|i| i.name.as_str()), Some("Acme"));
        assert_eq!(card.field("notes").map(|f| f.value).as_deref(), Some("call back"));
    }

    #[tokio::test]
    async fn failed_delete_keeps_item() {
        let api = MockPlatform::new()
            .respond(item_response("Done"))
            .respond(crate::board::testing::error_coded("InternalServerError"));
        let (mut card, api, notifier) = card_with(api, Some("7"));
        card.load().await;

        assert!(!card.delete().await);
        assert!(card.item().is_some());
        assert_eq!(api.request_count(), 2);
        assert_eq!(notifier.count(NoticeKind::Error), 1);
    }
}
