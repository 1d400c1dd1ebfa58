//! Client for the remote user-directory API that segments and attributes
//! are mirrored from.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use treewright_core::AttributeInput;

use crate::error::RemoteError;

const SERVICE: &str = "directory";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct UsersMeta {
    pub total_users: i64,
    pub max_page_size: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DirectoryUser {
    #[serde(default)]
    pub segments: Vec<String>,
}

/// Response of both the paged listing and the changes feed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UsersPage {
    #[serde(default)]
    pub items: Vec<DirectoryUser>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AttributeRef {
    pub id: String,
}

#[derive(Clone)]
pub struct DirectoryClient {
    client: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("base_url", &self.base_url)
            .field("bearer_token", &"***")
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    pub fn new(base_url: &str, bearer_token: String) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RemoteError::ClientInit(e.to_string()))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned(), bearer_token })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.bearer_token)
            .query(query)
            .send()
            .await
            .map_err(|source| RemoteError::Http { service: SERVICE, source })?;

        let status = response.status();
        if !status.is_success() {
            let message = status.canonical_reason().unwrap_or("unexpected status").to_owned();
            tracing::warn!(path, status = status.as_u16(), "directory request failed");
            return Err(RemoteError::HttpStatus { service: SERVICE, code: status.as_u16(), message });
        }
        response.json::<T>().await.map_err(|e| RemoteError::InvalidResponse {
            service: SERVICE,
            message: format!("{path}: {e}"),
        })
    }

    pub async fn users_meta(&self) -> Result<UsersMeta, RemoteError> {
        self.get("/v1/users/meta", &[]).await
    }

    pub async fn users_page(&self, limit: i64, offset: i64) -> Result<UsersPage, RemoteError> {
        self.get("/v1/users", &[("limit", limit.to_string()), ("offset", offset.to_string())]).await
    }

    /// Users whose segment membership changed after `since`.
    pub async fn users_changes(&self, since: DateTime<Utc>) -> Result<UsersPage, RemoteError> {
        self.get("/v1/users/changes", &[("since", format_since(since))]).await
    }

    pub async fn attribute_ids(&self) -> Result<Vec<AttributeRef>, RemoteError> {
        self.get("/v1/attributes", &[]).await
    }

    pub async fn attribute(&self, id: &str) -> Result<AttributeInput, RemoteError> {
        self.get(&format!("/v1/attributes/{id}"), &[]).await
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub(crate) fn format_since(since: DateTime<Utc>) -> String {
    since.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn since_uses_millisecond_utc() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(format_since(at), "2025-03-01T12:30:05.000Z");
    }

    #[tokio::test]
    async fn pages_carry_bearer_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users"))
            .and(query_param("limit", "50"))
            .and(query_param("offset", "100"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"segments": ["vip", "churned"]}, {"id": "u2"}]
            })))
            .mount(&server)
            .await;

        let client = DirectoryClient::new(&server.uri(), "secret".into()).unwrap();
        let page = client.users_page(50, 100).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].segments, vec!["vip", "churned"]);
        assert!(page.items[1].segments.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/meta"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = DirectoryClient::new(&server.uri(), "bad".into()).unwrap();
        let err = client.users_meta().await.unwrap_err();
        assert!(matches!(err, RemoteError::HttpStatus { code: 401, .. }));
    }

    #[tokio::test]
    async fn attribute_detail_parses_sparse_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/attributes/age"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "age", "name": "Age", "type": "number", "ops": [">", "<"], "min": 0, "max": 120
            })))
            .mount(&server)
            .await;

        let client = DirectoryClient::new(&server.uri(), "t".into()).unwrap();
        let attr = client.attribute("age").await.unwrap();
        assert_eq!(attr.max, Some(120.0));
        assert!(attr.enum_values.is_none());
    }
}
