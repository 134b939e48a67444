use async_trait::async_trait;
use reqwest::StatusCode;

use crate::errors::AppError;
use crate::models::{AccessLogEntry, UserProfile};

use super::{AccessLogStore, ApprovalDirectory};

/// Approval directory backed by the platform's profile endpoint.
pub struct HttpApprovalDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApprovalDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ApprovalDirectory for HttpApprovalDirectory {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), user_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::DirectoryError(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response
            .error_for_status()
            .map_err(|e| AppError::DirectoryError(e.to_string()))?;

        let profile = response
            .json::<UserProfile>()
            .await
            .map_err(|e| AppError::DirectoryError(e.to_string()))?;

        Ok(Some(profile))
    }
}

/// Access-log collaborator backed by the platform's access-log endpoint.
pub struct HttpAccessLogStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAccessLogStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AccessLogStore for HttpAccessLogStore {
    async fn record(&self, entry: &AccessLogEntry) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(entry)
            .send()
            .await
            .map_err(|e| AppError::AccessLogError(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| AppError::AccessLogError(e.to_string()))?;

        Ok(())
    }
}
