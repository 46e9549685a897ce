//! Test doubles for the platform API and notifications.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::api::{ApiResponse, PlatformApi};
use crate::errors::PlatformError;
use crate::ui::notify::{Notice, NoticeKind, Notifier};

/// Replays queued responses and records every request.
#[derive(Default)]
pub struct MockPlatform {
    responses: Mutex<VecDeque<Result<ApiResponse, PlatformError>>>,
    pub requests: Mutex<Vec<(String, Option<Value>)>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: ApiResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail(self, error: PlatformError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_query(&self) -> Option<String> {
        self.requests.lock().unwrap().last().map(|(q, _)| q.clone())
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn execute(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<ApiResponse, PlatformError> {
        self.requests
            .lock()
            .unwrap()
            .push((query.to_string(), variables));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::default()))
    }
}

/// Collects notices instead of showing them.
#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }

    pub fn texts(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.text.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub fn forbidden() -> ApiResponse {
    ApiResponse {
        status_code: Some(403),
        error_code: Some("HTTP_403".into()),
        ..Default::default()
    }
}

pub fn error_coded(code: &str) -> ApiResponse {
    ApiResponse {
        error_code: Some(code.into()),
        error_message: Some("something went wrong".into()),
        ..Default::default()
    }
}
