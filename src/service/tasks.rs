//! Task list API client
//!
//! Fetches a user's completed tasks from the provider on their behalf.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// A task list as returned by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct TaskList {
    pub id: u64,
    #[serde(default)]
    pub title: String,
}

/// A task as returned by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamTask {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    /// Calendar date ("2015-05-10") or RFC 3339 timestamp
    pub due_date: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Task list API client
pub struct TaskListClient {
    api_url: String,
    client_id: String,
    http_client: reqwest::Client,
}

impl TaskListClient {
    pub fn new(api_url: &str, client_id: &str, http_client: reqwest::Client) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            http_client,
        }
    }

    /// All of the user's lists
    pub async fn lists(&self, access_token: &str) -> Result<Vec<TaskList>, AppError> {
        self.get_json(access_token, "/lists", &[]).await
    }

    /// Completed tasks in a single list
    pub async fn completed_tasks_in_list(
        &self,
        access_token: &str,
        list_id: u64,
    ) -> Result<Vec<UpstreamTask>, AppError> {
        let list_id = list_id.to_string();
        self.get_json(
            access_token,
            "/tasks",
            &[("list_id", list_id.as_str()), ("completed", "true")],
        )
        .await
    }

    /// Completed tasks across every list
    pub async fn completed_tasks(&self, access_token: &str) -> Result<Vec<UpstreamTask>, AppError> {
        let lists = self.lists(access_token).await?;
        tracing::debug!(lists = lists.len(), "Fetched task lists");

        let mut tasks = Vec::new();
        for list in &lists {
            let mut in_list = self.completed_tasks_in_list(access_token, list.id).await?;
            tasks.append(&mut in_list);
        }

        Ok(tasks)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let response = self
            .http_client
            .get(format!("{}{}", self.api_url, path))
            .header("X-Access-Token", access_token)
            .header("X-Client-ID", &self.client_id)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("{path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!("{path}: status {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("{path}: invalid body: {e}")))
    }
}
