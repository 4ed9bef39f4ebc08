//! HTTP client for the registry API

use crate::cli::error::{CliError, CliResult};
use agentry::core::accounts::Registration;
use agentry::http::handlers::download::CHECKSUM_HEADER;
use agentry::http::models::{
    AddMemberRequest, CreateOrgRequest, CreateTokenRequest, MeResponse, PublishBody,
    PublishResponse, RegisterRequest,
};
use agentry::{ApiToken, IssuedToken, Organization, PackageSummary, VersionDescriptor};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// API client for an agentry registry
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

/// Response envelope shared by every JSON endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// Downloaded bytes plus the checksum header, if any
#[derive(Debug)]
pub struct Download {
    pub content: Vec<u8>,
    pub checksum_header: Option<String>,
}

fn api_error(status: u16, error: Option<ErrorBody>, fallback: String) -> CliError {
    match error {
        Some(error) => {
            let message = match error.details {
                Some(details) if !details.is_null() => format!("{} ({})", error.message, details),
                _ => error.message,
            };
            CliError::Api {
                status,
                code: error.code,
                message,
            }
        }
        None => CliError::Api {
            status,
            code: "HTTP_ERROR".to_string(),
            message: fallback,
        },
    }
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, token: Option<String>) -> CliResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(format!("agentry-cli/{}", agentry::VERSION))
            .build()
            .map_err(|e| CliError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> CliResult<RequestBuilder> {
        match &self.token {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(CliError::NotAuthenticated(self.base_url.clone())),
        }
    }

    /// Unwrap the envelope, turning error envelopes into `CliError::Api`
    async fn read_envelope<T: DeserializeOwned>(response: Response) -> CliResult<T> {
        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<Envelope<T>>(&body) {
            Ok(envelope) if status.is_success() && envelope.success => {
                envelope.data.ok_or_else(|| {
                    CliError::Network("Registry response contained no data".to_string())
                })
            }
            Ok(envelope) => Err(api_error(
                status.as_u16(),
                envelope.error,
                status.to_string(),
            )),
            Err(e) if status.is_success() => Err(CliError::Network(format!(
                "Failed to parse registry response: {}",
                e
            ))),
            Err(_) => Err(Self::error_from_body(status.as_u16(), &body)),
        }
    }

    /// For endpoints that answer with a bare status code
    async fn expect_success(response: Response) -> CliResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await?;
        Err(Self::error_from_body(status.as_u16(), &body))
    }

    fn error_from_body(status: u16, body: &[u8]) -> CliError {
        #[derive(Deserialize)]
        struct ErrorOnly {
            error: Option<ErrorBody>,
        }

        match serde_json::from_slice::<ErrorOnly>(body) {
            Ok(parsed) => api_error(status, parsed.error, format!("HTTP {}", status)),
            Err(_) => api_error(status, None, String::from_utf8_lossy(body).into_owned()),
        }
    }

    /// POST /api/users
    pub async fn register(&self, email: &str, username: &str) -> CliResult<Registration> {
        let body = RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
        };
        let response = self
            .client
            .post(self.url("/api/users"))
            .json(&body)
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    /// GET /api/me
    pub async fn whoami(&self) -> CliResult<MeResponse> {
        let request = self.authorized(self.client.get(self.url("/api/me")))?;
        Self::read_envelope(request.send().await?).await
    }

    pub async fn create_token(&self, label: Option<String>) -> CliResult<IssuedToken> {
        let request = self.authorized(self.client.post(self.url("/api/tokens")))?;
        let response = request.json(&CreateTokenRequest { label }).send().await?;
        Self::read_envelope(response).await
    }

    pub async fn list_tokens(&self) -> CliResult<Vec<ApiToken>> {
        let request = self.authorized(self.client.get(self.url("/api/tokens")))?;
        Self::read_envelope(request.send().await?).await
    }

    pub async fn revoke_token(&self, token_id: &str) -> CliResult<()> {
        let url = self.url(&format!("/api/tokens/{}", token_id));
        let request = self.authorized(self.client.delete(url))?;
        Self::expect_success(request.send().await?).await
    }

    pub async fn create_org(&self, name: &str) -> CliResult<Organization> {
        let request = self.authorized(self.client.post(self.url("/api/orgs")))?;
        let body = CreateOrgRequest {
            name: name.to_string(),
        };
        Self::read_envelope(request.json(&body).send().await?).await
    }

    pub async fn add_member(&self, org: &str, username: &str, role: Option<String>) -> CliResult<()> {
        let url = self.url(&format!("/api/orgs/{}/members", org));
        let request = self.authorized(self.client.post(url))?;
        let body = AddMemberRequest {
            username: username.to_string(),
            role,
        };
        Self::expect_success(request.json(&body).send().await?).await
    }

    pub async fn list_packages(&self, org: &str) -> CliResult<Vec<PackageSummary>> {
        let url = self.url(&format!("/api/orgs/{}/packages", org));
        Self::read_envelope(self.client.get(url).send().await?).await
    }

    /// POST /api/packages
    pub async fn publish(&self, body: &PublishBody) -> CliResult<PublishResponse> {
        let request = self.authorized(self.client.post(self.url("/api/packages")))?;
        Self::read_envelope(request.json(body).send().await?).await
    }

    /// Latest version when `version` is `None`
    pub async fn resolve(
        &self,
        org: &str,
        package: &str,
        version: Option<&str>,
    ) -> CliResult<VersionDescriptor> {
        let path = match version {
            Some(version) => format!("/api/packages/{}/{}/versions/{}", org, package, version),
            None => format!("/api/packages/{}/{}", org, package),
        };
        Self::read_envelope(self.client.get(self.url(&path)).send().await?).await
    }

    pub async fn list_versions(&self, org: &str, package: &str) -> CliResult<Vec<VersionDescriptor>> {
        let url = self.url(&format!("/api/packages/{}/{}/versions", org, package));
        Self::read_envelope(self.client.get(url).send().await?).await
    }

    /// Fetch a descriptor's `download_url`; the URL is absolute
    pub async fn download(&self, download_url: &str) -> CliResult<Download> {
        let response = self.client.get(download_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(Self::error_from_body(status.as_u16(), &body));
        }

        let checksum_header = response
            .headers()
            .get(CHECKSUM_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_ascii_lowercase());
        let content = response.bytes().await?.to_vec();

        Ok(Download {
            content,
            checksum_header,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_error_envelope_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/orgs"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "success": false,
                "data": null,
                "error": {"code": "CONFLICT", "message": "Organization 'acme' already exists", "details": null}
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Some("ab".repeat(32))).unwrap();
        match client.create_org("acme").await {
            Err(CliError::Api {
                status,
                code,
                message,
            }) => {
                assert_eq!(status, 409);
                assert_eq!(code, "CONFLICT");
                assert!(message.contains("already exists"));
            }
            other => panic!("expected API error, got {:?}", other.map(|o| o.name)),
        }
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let server = MockServer::start().await;
        let token = "ab".repeat(32);
        Mock::given(method("DELETE"))
            .and(path("/api/tokens/42"))
            .and(header("authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Some(token)).unwrap();
        client.revoke_token("42").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_request() {
        let client = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        assert!(matches!(
            client.whoami().await,
            Err(CliError::NotAuthenticated(_))
        ));
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orgs/acme/packages"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), None).unwrap();
        match client.list_packages("acme").await {
            Err(CliError::Api { status, message, .. }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("expected API error, got {:?}", other.is_ok()),
        }
    }
}
