//! The remote client (§4.3): authenticated, read-only access to the remote task service.
//!
//! Adapted from the teacher's `client.rs`, which drives a CalDAV server with PROPFIND/REPORT
//! requests and parses the XML response bodies with `minidom`. This client drives a JSON REST
//! service with a bearer token instead, but keeps the same shape: a thin wrapper around one
//! `reqwest::Client`, one method per endpoint, errors surfaced through the crate's own error type
//! rather than propagated as `reqwest::Error`.

pub mod wire;

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;

use crate::config::Config;
use crate::entities::{Event, Label, Project, Section, Task};
use crate::error::WaypointError;
use crate::ids::TaskId;

use wire::{ActivityPage, WireLabel, WireProject, WireSection, WireTask};

/// Read-only access to the remote task service. Holds the one `reqwest::Client` the whole
/// process shares (connection pooling, not one client per call).
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: String,
    max_retries: u32,
    retry_backoff_base: Duration,
}

impl Client {
    pub fn new(config: &Config) -> Result<Self, WaypointError> {
        let http = reqwest::Client::builder()
            .timeout(config.remote_call_timeout)
            .build()
            .map_err(WaypointError::from)?;
        Ok(Self {
            http,
            base_url: config.remote_base_url.clone(),
            token: config.remote_token.clone(),
            max_retries: config.max_remote_retries,
            retry_backoff_base: config.remote_retry_backoff_base,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
    }

    fn should_retry(&self, attempt: u32, err: &WaypointError) -> bool {
        err.retryable() && attempt + 1 < self.max_retries
    }

    async fn backoff(&self, attempt: u32, err: &WaypointError) {
        let delay = self.retry_backoff_base * 2u32.pow(attempt);
        log::warn!("remote call failed ({err}), retrying in {delay:?}");
        tokio::time::sleep(delay).await;
    }

    /// Sends `request`, retrying transient failures ([`WaypointError::retryable`]) with
    /// exponential backoff up to `max_retries` attempts total (§4.3 "retry with backoff", §7).
    /// Every GET this client issues carries no body, so `try_clone` never fails.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, WaypointError> {
        let mut attempt = 0;
        loop {
            let attempt_request = request
                .try_clone()
                .expect("remote requests never stream a body");
            let result: Result<reqwest::Response, WaypointError> = async {
                let response = attempt_request.send().await?;
                Ok(response.error_for_status()?)
            }
            .await;

            match result {
                Ok(response) => return Ok(response),
                Err(err) if self.should_retry(attempt, &err) => {
                    self.backoff(attempt, &err).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn list_tasks(&self, config: &Config) -> Result<Vec<Task>, WaypointError> {
        let wire: Vec<WireTask> = self
            .send(self.request(reqwest::Method::GET, "/tasks"))
            .await?
            .json()
            .await?;
        wire.into_iter().map(|t| t.into_task(config)).collect()
    }

    /// Single-item remote fetch. Returns `Ok(None)` on 404 (§4.1 `get_from_api`): the id is too
    /// old or otherwise permanently gone, not an error worth surfacing. Retries transient
    /// failures the same way [`Client::send`] does; a 404 is terminal, never retried.
    pub async fn get_task(&self, id: &TaskId, config: &Config) -> Result<Option<Task>, WaypointError> {
        let mut attempt = 0;
        loop {
            let response = self
                .request(reqwest::Method::GET, &format!("/tasks/{id}"))
                .send()
                .await?;
            if response.status().as_u16() == 404 {
                return Ok(None);
            }
            match response.error_for_status() {
                Ok(response) => {
                    let wire: WireTask = response.json().await?;
                    return Ok(Some(wire.into_task(config)?));
                }
                Err(err) => {
                    let err = WaypointError::from(err);
                    if self.should_retry(attempt, &err) {
                        self.backoff(attempt, &err).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, WaypointError> {
        let wire: Vec<WireProject> = self
            .send(self.request(reqwest::Method::GET, "/projects"))
            .await?
            .json()
            .await?;
        Ok(wire.into_iter().map(Project::from).collect())
    }

    pub async fn list_sections(&self) -> Result<Vec<Section>, WaypointError> {
        let wire: Vec<WireSection> = self
            .send(self.request(reqwest::Method::GET, "/sections"))
            .await?
            .json()
            .await?;
        Ok(wire.into_iter().map(Section::from).collect())
    }

    pub async fn list_labels(&self) -> Result<Vec<Label>, WaypointError> {
        let wire: Vec<WireLabel> = self
            .send(self.request(reqwest::Method::GET, "/labels"))
            .await?
            .json()
            .await?;
        Ok(wire.into_iter().map(Label::from).collect())
    }

    /// Archived tasks for one project. Callers sleep [`Config::archive_fetch_delay`] between
    /// projects (§5) — that's the orchestrator's concern, not this method's.
    pub async fn list_archived_tasks_for_project(
        &self,
        project_id: &str,
        config: &Config,
    ) -> Result<Vec<Task>, WaypointError> {
        let wire: Vec<WireTask> = self
            .send(self.request(reqwest::Method::GET, &format!("/projects/{project_id}/archived_tasks")))
            .await?
            .json()
            .await?;
        wire.into_iter().map(|t| t.into_task(config)).collect()
    }

    /// Fetches one page of the activity log. `offset` steps by `limit` until the caller sees a
    /// short page (§4.2).
    pub async fn fetch_activity_page(
        &self,
        page: u32,
        limit: u32,
        offset: u32,
        config: &Config,
    ) -> Result<(Vec<Event>, u32), WaypointError> {
        let params: HashMap<&str, String> = HashMap::from([
            ("page", page.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ]);
        let page_body: ActivityPage = self
            .send(self.request(reqwest::Method::GET, "/activity").query(&params))
            .await?
            .json()
            .await?;
        let events = page_body
            .events
            .into_iter()
            .map(|e| e.into_event(config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((events, page_body.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new(&Config::for_tests()).unwrap()
    }

    #[test]
    fn should_retry_respects_max_retries_and_error_kind() {
        let client = client();
        let transient = WaypointError::RemoteServer("x".into());
        let fatal = WaypointError::Auth("x".into());

        assert!(client.should_retry(0, &transient));
        assert!(client.should_retry(client.max_retries - 2, &transient));
        assert!(!client.should_retry(client.max_retries - 1, &transient));
        assert!(!client.should_retry(0, &fatal));
    }
}

