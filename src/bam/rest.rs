//! BAM legacy REST API (`/Services/REST/v1`) client.
//!
//! ## API Reference
//!
//! - Login: GET `/login?username=...&password=...`, answers
//!   `"Session Token-> BAMAuthToken: <token> <- for User : <user>"`
//! - Subsequent calls send `Authorization: BAMAuthToken: <token>`
//! - Update: PUT `/update` with an `APIEntity` JSON body
//! - Delete: DELETE `/delete?objectId=...`

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::bam::client::{BamClient, Connector};
use crate::bam::entity::{ApiEntity, ObjectType};
use crate::config::BamConfig;
use crate::error::BamError;

/// Path of the REST service below the BAM host.
const REST_PATH: &str = "/Services/REST/v1";

/// Default HTTP timeout for BAM API requests.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

const TOKEN_MARKER: &str = "BAMAuthToken:";

/// Connects to BAM over HTTPS.
#[derive(Debug, Clone)]
pub struct RestConnector {
    timeout: Duration,
}

impl RestConnector {
    /// Create a connector using the default HTTP timeout.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Set the HTTP timeout applied to every BAM request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for RestConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for RestConnector {
    async fn connect(&self, config: &BamConfig) -> Result<Box<dyn BamClient>, BamError> {
        let http = Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()
            .map_err(|source| BamError::Http {
                operation: "Login",
                source,
            })?;

        let base_url = api_base_url(&config.endpoint);
        debug!(endpoint = %base_url, username = %config.username, "Logging in to BlueCat");

        let response = send(
            "Login",
            http.get(format!("{}/login", base_url)).query(&[
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
            ]),
        )
        .await
        .map_err(|err| match err {
            BamError::Api { status, message, .. } => {
                BamError::Login(format!("HTTP {}: {}", status, message))
            }
            other => other,
        })?;

        let text = serde_json::from_str::<String>(&response).unwrap_or(response);
        let token = extract_token(&text)
            .ok_or_else(|| BamError::Login("response did not contain a BAMAuthToken".to_string()))?;

        Ok(Box::new(RestClient {
            http,
            base_url,
            authorization: format!("{} {}", TOKEN_MARKER, token),
        }))
    }
}

/// A logged-in REST session.
pub struct RestClient {
    http: Client,
    base_url: String,
    authorization: String,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("authorization", &"<REDACTED>")
            .finish()
    }
}

impl RestClient {
    fn get(&self, method: &str) -> RequestBuilder {
        self.request(reqwest::Method::GET, method)
    }

    fn request(&self, verb: reqwest::Method, method: &str) -> RequestBuilder {
        self.http
            .request(verb, format!("{}/{}", self.base_url, method))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
    }

    async fn json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, BamError> {
        let body = send(operation, request).await?;
        serde_json::from_str(&body).map_err(|e| BamError::decode(operation, e.to_string()))
    }

    async fn entity(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<ApiEntity, BamError> {
        let entity: Option<ApiEntity> = self.json(operation, request).await?;
        Ok(entity.unwrap_or_default())
    }
}

#[async_trait]
impl BamClient for RestClient {
    async fn get_entity_by_id(&self, id: i64) -> Result<ApiEntity, BamError> {
        self.entity(
            "GetEntityById",
            self.get("getEntityById").query(&[("id", id)]),
        )
        .await
    }

    async fn get_ip_ranged_by_ip(
        &self,
        container_id: i64,
        object_type: &str,
        address: &str,
    ) -> Result<ApiEntity, BamError> {
        self.entity(
            "GetIPRangedByIP",
            self.get("getIPRangedByIP").query(&[
                ("containerId", container_id.to_string()),
                ("type", object_type.to_string()),
                ("address", address.to_string()),
            ]),
        )
        .await
    }

    async fn get_parent(&self, id: i64) -> Result<ApiEntity, BamError> {
        self.entity(
            "GetParent",
            self.get("getParent").query(&[("entityId", id)]),
        )
        .await
    }

    async fn get_next_available_ip4_network(
        &self,
        parent_id: i64,
        size: i64,
        is_larger_allowed: bool,
        auto_create: bool,
    ) -> Result<i64, BamError> {
        self.json(
            "GetNextAvailableIP4Network",
            self.get("getNextAvailableIP4Network").query(&[
                ("parentId", parent_id.to_string()),
                ("size", size.to_string()),
                ("isLargerAllowed", is_larger_allowed.to_string()),
                ("autoCreate", auto_create.to_string()),
            ]),
        )
        .await
    }

    async fn update(&self, entity: &ApiEntity) -> Result<(), BamError> {
        send(
            "Update",
            self.request(reqwest::Method::PUT, "update").json(entity),
        )
        .await
        .map(drop)
    }

    async fn delete(&self, object_id: i64) -> Result<(), BamError> {
        send(
            "Delete",
            self.request(reqwest::Method::DELETE, "delete")
                .query(&[("objectId", object_id)]),
        )
        .await
        .map(drop)
    }

    async fn get_entities(
        &self,
        parent_id: i64,
        object_type: ObjectType,
        start: u64,
        count: u64,
    ) -> Result<Vec<ApiEntity>, BamError> {
        let entities: Option<Vec<ApiEntity>> = self
            .json(
                "GetEntities",
                self.get("getEntities").query(&[
                    ("parentId", parent_id.to_string()),
                    ("type", object_type.to_string()),
                    ("start", start.to_string()),
                    ("count", count.to_string()),
                ]),
            )
            .await?;
        Ok(entities.unwrap_or_default())
    }

    async fn logout(&self) -> Result<(), BamError> {
        send("Logout", self.get("logout")).await.map(drop)
    }
}

/// Send a request and return the body text of a successful response.
async fn send(operation: &'static str, request: RequestBuilder) -> Result<String, BamError> {
    let response = request
        .send()
        .await
        .map_err(|source| BamError::Http { operation, source })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| BamError::Http { operation, source })?;

    if !status.is_success() {
        return Err(BamError::api(operation, status.as_u16(), body.trim()));
    }

    Ok(body)
}

/// Build the REST base URL from a configured endpoint.
///
/// The endpoint may be a bare host name (HTTPS is assumed) or a full URL.
pub fn api_base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        format!("{}{}", endpoint, REST_PATH)
    } else {
        format!("https://{}{}", endpoint, REST_PATH)
    }
}

/// Pull the session token out of the login response text.
pub fn extract_token(login_response: &str) -> Option<&str> {
    let start = login_response.find(TOKEN_MARKER)? + TOKEN_MARKER.len();
    let token = login_response[start..].split_whitespace().next()?;
    if token == "<-" {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token() {
        let response = "Session Token-> BAMAuthToken: 8sJsMTUzNDI4NzQ0Njk0MTphZG1pbg== <- for User : admin";
        assert_eq!(
            extract_token(response),
            Some("8sJsMTUzNDI4NzQ0Njk0MTphZG1pbg==")
        );
    }

    #[test]
    fn test_extract_token_missing() {
        assert_eq!(extract_token("Invalid username or password"), None);
        assert_eq!(extract_token("Session Token-> BAMAuthToken: <- for User"), None);
    }

    #[test]
    fn test_api_base_url_from_host() {
        assert_eq!(
            api_base_url("bam.example.com"),
            "https://bam.example.com/Services/REST/v1"
        );
    }

    #[test]
    fn test_api_base_url_keeps_scheme() {
        assert_eq!(
            api_base_url("http://10.0.0.5:8080/"),
            "http://10.0.0.5:8080/Services/REST/v1"
        );
    }

    #[test]
    fn test_rest_client_debug_redacts_token() {
        let client = RestClient {
            http: Client::new(),
            base_url: api_base_url("bam.example.com"),
            authorization: "BAMAuthToken: secret-token".to_string(),
        };
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<REDACTED>"));
    }
}
