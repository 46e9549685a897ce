//! Item fetch/update/delete against the platform, with user notifications.
//!
//! Every operation makes exactly one attempt and resolves to a value: a
//! forbidden or empty result is "no data" and stays silent, any other error
//! is logged and shown as a generic notice.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::api::{ApiResponse, COMPLEXITY_ERROR_CODE, PlatformApi};
use super::models::Item;
use super::query::{self, ColumnValuePatch};
use crate::errors::PlatformError;
use crate::ui::notify::{Notice, Notifier};

const FETCH_FAILED: &str = "Item could not be fetched.";
const UPDATE_FAILED: &str = "Item could not be updated.";
const DELETE_FAILED: &str = "Item could not be deleted.";
const CREATE_FAILED: &str = "Item could not be created.";

/// Outcome classification shared by all operations.
enum Outcome {
    Ok(ApiResponse),
    Silent,
    Failed,
}

#[derive(Clone)]
pub struct ItemStore {
    api: Arc<dyn PlatformApi>,
    notifier: Arc<dyn Notifier>,
}

impl ItemStore {
    pub fn new(api: Arc<dyn PlatformApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, item_id: &str) -> Option<Item> {
        let result = self
            .api
            .execute(query::ITEM_QUERY, Some(json!({ "ids": [item_id] })))
            .await;

        // The read query tolerates complexity warnings; data is still usable.
        let resp = match classify(result, &[COMPLEXITY_ERROR_CODE]) {
            Outcome::Ok(resp) => resp,
            Outcome::Silent => return None,
            Outcome::Failed => {
                self.notifier.notify(Notice::error(FETCH_FAILED));
                return None;
            }
        };

        let first = resp
            .data_field("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())?
            .clone();

        match serde_json::from_value::<Item>(first) {
            Ok(item) => {
                debug!(columns = item.column_values.len(), "fetched item");
                Some(item)
            }
            Err(e) => {
                warn!(error = %e, "item payload did not decode");
                self.notifier.notify(Notice::error(FETCH_FAILED));
                None
            }
        }
    }

    /// Apply `patch` to an item. Returns the mutation's response fragment.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        board_id: &str,
        item_id: &str,
        patch: &ColumnValuePatch,
    ) -> Option<Value> {
        let mutation = query::update_item_mutation(board_id, item_id, patch);
        self.mutate(
            &mutation,
            "change_multiple_column_values",
            UPDATE_FAILED,
            "Item updated successfully.",
        )
        .await
    }

    /// Set the status column through the status-only mutation.
    #[instrument(skip(self))]
    pub async fn set_status(&self, board_id: &str, item_id: &str, label: &str) -> Option<Value> {
        let mutation = query::status_update_mutation(board_id, item_id, label);
        self.mutate(
            &mutation,
            "change_multiple_column_values",
            UPDATE_FAILED,
            "Item updated successfully.",
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, item_id: &str) -> bool {
        let mutation = query::delete_item_mutation(item_id);
        self.mutate(
            &mutation,
            "delete_item",
            DELETE_FAILED,
            "Item deleted successfully.",
        )
        .await
        .is_some()
    }

    /// Create an item in `group_id`. Returns the new item's id.
    #[instrument(skip(self, patch))]
    pub async fn create(
        &self,
        board_id: &str,
        group_id: &str,
        item_name: &str,
        patch: &ColumnValuePatch,
    ) -> Option<String> {
        let mutation = query::create_item_mutation(board_id, group_id, item_name, patch);
        let created = self
            .mutate(
                &mutation,
                "create_item",
                CREATE_FAILED,
                "Item created successfully.",
            )
            .await?;
        match created.get("id")? {
            Value::String(id) => Some(id.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    async fn mutate(
        &self,
        mutation: &str,
        field: &str,
        failure: &str,
        success: &str,
    ) -> Option<Value> {
        match classify(self.api.execute(mutation, None).await, &[]) {
            Outcome::Ok(resp) => {
                self.notifier.notify(Notice::success(success));
                // A mutation without a returned fragment still succeeded.
                Some(resp.data_field(field).cloned().unwrap_or(Value::Null))
            }
            Outcome::Silent => None,
            Outcome::Failed => {
                self.notifier.notify(Notice::error(failure));
                None
            }
        }
    }
}

fn classify(result: Result<ApiResponse, PlatformError>, tolerated: &[&str]) -> Outcome {
    match result {
        Ok(resp) if resp.is_forbidden() => {
            debug!("platform denied access");
            Outcome::Silent
        }
        Ok(resp) => {
            let code = resp
                .error_code()
                .filter(|code| !tolerated.contains(code))
                .map(str::to_string);
            match code {
                Some(code) => {
                    warn!(%code, detail = %resp.error_detail(), "platform returned an error");
                    Outcome::Failed
                }
                None => Outcome::Ok(resp),
            }
        }
        Err(e) if e.is_forbidden() => {
            debug!("platform denied access");
            Outcome::Silent
        }
        Err(e) => {
            warn!(error = %e, "platform request failed");
            Outcome::Failed
        }
    }
}
