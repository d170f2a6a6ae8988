//! PostgREST-style HTTP store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    EDITORS_TABLE, EditorPatch, EditorRow, JOBS_TABLE, JobPatch, JobRow, NOTES_TABLE, NoteRow,
    PROFILES_TABLE, ProfileRow, RecordStore, Session, SessionProvider, StoreError,
};

/// Error body returned by the REST layer.
#[derive(Debug, Deserialize)]
struct RestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "error_description", alias = "msg")]
    description: Option<String>,
}

/// Codes the REST layer uses for a table missing from its schema cache.
const MISSING_TABLE_CODES: &[&str] = &["42P01", "PGRST205"];

/// Client for a PostgREST endpoint with password authentication.
pub struct RestStore {
    http: Client,
    base_url: String,
    api_key: String,
    session: Arc<RwLock<Option<Session>>>,
}

impl RestStore {
    /// Create a new client for the given project URL and public API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_timeout(base_url, api_key, Duration::from_secs(30))
    }

    /// Like [`RestStore::new`], with a per-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the project URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticate with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), StoreError> {
        #[derive(Serialize)]
        struct PasswordGrant<'a> {
            email: &'a str,
            password: &'a str,
        }

        let session = self
            .token_request("password", &PasswordGrant { email, password })
            .await?;
        debug!(user = %session.user.id, "authenticated with store");

        *self.session.write().await = Some(session);
        Ok(())
    }

    /// Refresh the current session tokens.
    pub async fn refresh_session(&self) -> Result<(), StoreError> {
        #[derive(Serialize)]
        struct RefreshGrant {
            refresh_token: String,
        }

        let refresh_token = {
            let session = self.session.read().await;
            session
                .as_ref()
                .map(|s| s.refresh_token.clone())
                .ok_or_else(|| StoreError::Auth("no session to refresh".to_string()))?
        };

        let session = self
            .token_request("refresh_token", &RefreshGrant { refresh_token })
            .await?;
        debug!(user = %session.user.id, "refreshed session");

        *self.session.write().await = Some(session);
        Ok(())
    }

    /// Get the signed-in user id.
    pub async fn user_id(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.user.id.clone())
    }

    async fn token_request<B: Serialize>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<Session, StoreError> {
        let url = format!("{}/auth/v1/token", self.base_url);

        let response = self
            .http
            .post(&url)
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.map_err(|e| {
                StoreError::Auth(format!(
                    "{} grant failed ({}): failed to read response: {}",
                    grant_type, status, e
                ))
            })?;
            return Err(StoreError::Auth(format!(
                "{} grant failed ({}): {}",
                grant_type, status, text
            )));
        }

        Ok(response.json().await?)
    }

    /// Get the current access token.
    async fn access_token(&self) -> Result<String, StoreError> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or_else(|| StoreError::Auth("not authenticated".to_string()))
    }

    /// Try to refresh the session if possible.
    async fn try_refresh(&self) -> bool {
        match self.refresh_session().await {
            Ok(()) => {
                debug!("automatically refreshed expired session");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to auto-refresh session");
                false
            }
        }
    }

    /// Send one request against `table` and decode the JSON array it returns.
    ///
    /// Only idempotent reads are retried on transient errors; a failed write
    /// is surfaced immediately so the caller can reconcile.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Vec<T>, StoreError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let idempotent = method == Method::GET;

        // Initial attempt plus up to 3 retries
        let mut refreshed = false;
        let mut attempt = 0;
        loop {
            let token = self.access_token().await?;

            let mut request = self
                .http
                .request(method.clone(), &url)
                .header("apikey", &self.api_key)
                .header("Authorization", format!("Bearer {}", token))
                .query(query);
            if method != Method::GET {
                request = request.header("Prefer", "return=representation");
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(%method, table, "sending store request");
            let result = match request.send().await {
                Ok(response) => Self::handle_response(table, response).await,
                Err(e) => Err(StoreError::Http(e)),
            };

            match result {
                Ok(rows) => return Ok(rows),
                Err(ref e) if e.is_expired_token() && !refreshed => {
                    refreshed = true;
                    if self.try_refresh().await {
                        continue;
                    }
                    return result;
                }
                Err(ref e) if idempotent && e.is_transient() && attempt < 3 => {
                    let backoff_ms = 500 * (1 << attempt); // 500ms, 1s, 2s
                    debug!(
                        attempt = attempt + 1,
                        backoff_ms,
                        error = %e,
                        table,
                        "transient error reading table, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                    continue;
                }
                Err(_) => return result,
            }
        }
    }

    /// Map an HTTP response into rows or a store error.
    async fn handle_response<T: DeserializeOwned>(
        table: &str,
        response: reqwest::Response,
    ) -> Result<Vec<T>, StoreError> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.map_err(|e| {
                StoreError::InvalidResponse(format!(
                    "request failed ({}): failed to read response: {}",
                    status, e
                ))
            })?;

            let parsed = serde_json::from_str::<RestError>(&text).ok();
            let code = parsed.as_ref().and_then(|e| e.code.clone());

            if code
                .as_deref()
                .is_some_and(|c| MISSING_TABLE_CODES.contains(&c))
            {
                return Err(StoreError::Unavailable {
                    table: table.to_string(),
                });
            }

            let message = parsed
                .and_then(|e| e.message.or(e.description))
                .unwrap_or(text);
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Send a write and require that at least one row was touched.
    async fn write_matching(
        &self,
        method: Method,
        table: &str,
        column: &str,
        id: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<(), StoreError> {
        let rows: Vec<serde_json::Value> = self
            .execute(method, table, &[(column, eq(id))], body)
            .await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert<R: Serialize>(&self, table: &str, row: &R) -> Result<(), StoreError> {
        let body = serde_json::to_value(row)?;
        let _: Vec<serde_json::Value> = self.execute(Method::POST, table, &[], Some(&body)).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let _: Vec<serde_json::Value> = self
            .execute(Method::DELETE, table, &[("id", eq(id))], None)
            .await?;
        Ok(())
    }
}

/// PostgREST equality filter value.
fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl RecordStore for RestStore {
    #[tracing::instrument(skip(self))]
    async fn list_editors(&self, owner: &str) -> Result<Vec<EditorRow>, StoreError> {
        self.execute(
            Method::GET,
            EDITORS_TABLE,
            &[
                ("select", "*".to_string()),
                ("user_id", eq(owner)),
                ("order", "created_at.asc".to_string()),
            ],
            None,
        )
        .await
    }

    async fn insert_editor(&self, row: &EditorRow) -> Result<(), StoreError> {
        self.insert(EDITORS_TABLE, row).await
    }

    async fn update_editor(&self, id: &str, patch: &EditorPatch) -> Result<(), StoreError> {
        let body = serde_json::to_value(patch)?;
        self.write_matching(Method::PATCH, EDITORS_TABLE, "id", id, Some(&body))
            .await
    }

    async fn delete_editor(&self, id: &str) -> Result<(), StoreError> {
        self.delete(EDITORS_TABLE, id).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_jobs(&self, owner: &str) -> Result<Vec<JobRow>, StoreError> {
        self.execute(
            Method::GET,
            JOBS_TABLE,
            &[("select", "*".to_string()), ("user_id", eq(owner))],
            None,
        )
        .await
    }

    async fn insert_job(&self, row: &JobRow) -> Result<(), StoreError> {
        self.insert(JOBS_TABLE, row).await
    }

    async fn update_job(&self, id: &str, patch: &JobPatch) -> Result<(), StoreError> {
        let body = serde_json::to_value(patch)?;
        self.write_matching(Method::PATCH, JOBS_TABLE, "id", id, Some(&body))
            .await
    }

    async fn reassign_jobs(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let body = serde_json::json!({ "editor_id": to });
        let _: Vec<serde_json::Value> = self
            .execute(Method::PATCH, JOBS_TABLE, &[("editor_id", eq(from))], Some(&body))
            .await?;
        Ok(())
    }

    async fn delete_job(&self, id: &str) -> Result<(), StoreError> {
        // job_notes.job_id references jobs.id with ON DELETE CASCADE
        self.delete(JOBS_TABLE, id).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_notes(&self, owner: &str) -> Result<Vec<NoteRow>, StoreError> {
        self.execute(
            Method::GET,
            NOTES_TABLE,
            &[("select", "*".to_string()), ("user_id", eq(owner))],
            None,
        )
        .await
    }

    async fn find_note(&self, job_id: &str) -> Result<Option<NoteRow>, StoreError> {
        let rows: Vec<NoteRow> = self
            .execute(
                Method::GET,
                NOTES_TABLE,
                &[
                    ("select", "*".to_string()),
                    ("job_id", eq(job_id)),
                    ("limit", "1".to_string()),
                ],
                None,
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_note(&self, row: &NoteRow) -> Result<(), StoreError> {
        self.insert(NOTES_TABLE, row).await
    }

    async fn update_note(&self, job_id: &str, content: &str) -> Result<(), StoreError> {
        let body = serde_json::json!({
            "content": content,
            "updated_at": chrono::Utc::now(),
        });
        self.write_matching(Method::PATCH, NOTES_TABLE, "job_id", job_id, Some(&body))
            .await
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>, StoreError> {
        let rows: Vec<ProfileRow> = self
            .execute(
                Method::GET,
                PROFILES_TABLE,
                &[("select", "id,plan_type".to_string()), ("id", eq(user_id))],
                None,
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl SessionProvider for RestStore {
    async fn current_user(&self) -> Option<String> {
        self.user_id().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn logged_in(server: &MockServer) -> RestStore {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "user": { "id": "user-1", "email": "ops@example.com" }
            })))
            .mount(server)
            .await;

        let store = RestStore::new(server.uri(), "anon-key").unwrap();
        store.login("ops@example.com", "hunter2").await.unwrap();
        store
    }

    fn job_row() -> JobRow {
        JobRow {
            id: "job-1".to_string(),
            user_id: "user-1".to_string(),
            editor_id: "ed-1".to_string(),
            title: "Promo".to_string(),
            client_name: "Acme".to_string(),
            scheduled_date: 1,
            week_start: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            estimated_hours: 2.0,
            priority: "low".to_string(),
            status: "queued".to_string(),
            order: 0,
            notes: None,
            created_at: None,
        }
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let store = RestStore::new("https://project.example.com/", "key").unwrap();
        assert_eq!(store.base_url(), "https://project.example.com");
    }

    #[tokio::test]
    async fn test_user_without_session() {
        let store = RestStore::new("https://example.com", "key").unwrap();
        assert_eq!(store.current_user().await, None);
        let err = store.list_editors("user-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Auth(_)));
    }

    #[tokio::test]
    async fn test_login_sets_current_user() {
        let server = MockServer::start().await;
        let store = logged_in(&server).await;
        assert_eq!(store.current_user().await.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_login_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let store = RestStore::new(server.uri(), "anon-key").unwrap();
        let err = store.login("ops@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, StoreError::Auth(_)));
    }

    #[tokio::test]
    async fn test_list_editors_request_shape() {
        let server = MockServer::start().await;
        let store = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/editors"))
            .and(query_param("user_id", "eq.user-1"))
            .and(query_param("order", "created_at.asc"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "ed-1", "user_id": "user-1", "name": "Sam", "weekly_capacity": 40 }
            ])))
            .mount(&server)
            .await;

        let editors = store.list_editors("user-1").await.unwrap();
        assert_eq!(editors.len(), 1);
        assert_eq!(editors[0].name, "Sam");
        assert_eq!(editors[0].weekly_capacity, 40.0);
    }

    #[tokio::test]
    async fn test_insert_job_posts_row() {
        let server = MockServer::start().await;
        let store = logged_in(&server).await;
        let row = job_row();

        Mock::given(method("POST"))
            .and(path("/rest/v1/jobs"))
            .and(header("Prefer", "return=representation"))
            .and(body_json(serde_json::to_value(&row).unwrap()))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!([serde_json::to_value(&row).unwrap()])),
            )
            .expect(1)
            .mount(&server)
            .await;

        store.insert_job(&row).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_job_with_no_matching_row_is_not_found() {
        let server = MockServer::start().await;
        let store = logged_in(&server).await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/jobs"))
            .and(query_param("id", "eq.job-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let err = store
            .update_job("job-9", &JobPatch::order(2))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_table_maps_to_unavailable() {
        let server = MockServer::start().await;
        let store = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/job_notes"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": "PGRST205",
                "message": "Could not find the table 'public.job_notes' in the schema cache"
            })))
            .mount(&server)
            .await;

        let err = store.find_note("job-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { ref table } if table == "job_notes"));
    }

    #[tokio::test]
    async fn test_read_timeout_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "user": { "id": "user-1" }
            })))
            .mount(&server)
            .await;
        let store =
            RestStore::with_timeout(server.uri(), "anon-key", Duration::from_millis(200)).unwrap();
        store.login("ops@example.com", "hunter2").await.unwrap();

        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_json(serde_json::json!([])),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "user-1", "plan_type": "pro" }
            ])))
            .mount(&server)
            .await;

        let profile = store.get_profile("user-1").await.unwrap().unwrap();
        assert_eq!(profile.plan_type, "pro");
    }

    #[tokio::test]
    async fn test_write_timeout_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "user": { "id": "user-1" }
            })))
            .mount(&server)
            .await;
        let store =
            RestStore::with_timeout(server.uri(), "anon-key", Duration::from_millis(200)).unwrap();
        store.login("ops@example.com", "hunter2").await.unwrap();

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/jobs"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .expect(1)
            .mount(&server)
            .await;

        let err = store
            .update_job("job-1", &JobPatch::order(0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Http(ref e) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_write_errors_are_not_retried() {
        let server = MockServer::start().await;
        let store = logged_in(&server).await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/jobs"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "message": "upstream unavailable"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = store
            .update_job("job-1", &JobPatch::order(0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_once() {
        let server = MockServer::start().await;
        let store = logged_in(&server).await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-2",
                "refresh_token": "refresh-2",
                "user": { "id": "user-1" }
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(header("Authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "code": "PGRST301",
                "message": "JWT expired"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(header("Authorization", "Bearer access-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "user-1", "plan_type": "pro" }
            ])))
            .mount(&server)
            .await;

        let profile = store.get_profile("user-1").await.unwrap().unwrap();
        assert_eq!(profile.plan_type, "pro");
    }
}
