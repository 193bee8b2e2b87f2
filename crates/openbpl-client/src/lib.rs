use std::time::Duration;

use anyhow::Context;
use openbpl_types::api::{Envelope, HealthInfo, StatusInfo};
use openbpl_types::domain::threat::Threat;
use openbpl_types::domain::user::User;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

#[derive(Clone)]
pub struct OpenBplClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

/// Typed client for the OpenBPL read API.
#[derive(Clone)]
pub struct OpenBplClient {
    base: Url,
    client: reqwest::Client,
}

impl OpenBplClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<OpenBplClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(OpenBplClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<Option<T>> {
        let res = self.client.get(self.url(path)?).send().await?;
        tracing::debug!(path, status = %res.status(), "openbpl api response");
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let envelope: Envelope<T> = res.error_for_status()?.json().await?;
        let ok = envelope.is_success();
        match (ok, envelope.data, envelope.error) {
            (true, Some(data), _) => Ok(Some(data)),
            (_, _, err) => anyhow::bail!(
                "unexpected response for {path}: {}",
                err.unwrap_or_else(|| "missing data".into())
            ),
        }
    }

    async fn fetch_required<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        self.fetch(path)
            .await?
            .with_context(|| format!("{path} returned 404"))
    }

    pub async fn health(&self) -> anyhow::Result<HealthInfo> {
        self.fetch_required("health").await
    }

    pub async fn status(&self) -> anyhow::Result<StatusInfo> {
        self.fetch_required("api/v1/status").await
    }

    pub async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        self.fetch_required("api/v1/users").await
    }

    /// `Ok(None)` when the server has no such user.
    pub async fn get_user(&self, id: i64) -> anyhow::Result<Option<User>> {
        self.fetch(&format!("api/v1/users/{id}")).await
    }

    pub async fn list_threats(&self) -> anyhow::Result<Vec<Threat>> {
        self.fetch_required("api/v1/threats").await
    }

    pub async fn get_threat(&self, id: i64) -> anyhow::Result<Option<Threat>> {
        self.fetch(&format!("api/v1/threats/{id}")).await
    }
}

impl OpenBplClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<OpenBplClient> {
        if let Some(client) = self.client {
            return Ok(OpenBplClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(OpenBplClient {
            base: self.base,
            client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use openbpl_types::domain::threat::Severity;
    use openbpl_types::domain::user::UserRole;

    fn sample_user() -> User {
        User {
            id: 1,
            name: "Alice".into(),
            email: "alice@example.com".into(),
            role: UserRole::Analyst,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn get_and_list_users() {
        let server = MockServer::start();
        let user = sample_user();

        let get_mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/users/1");
            then.status(200)
                .json_body_obj(&Envelope::success(user.clone()));
        });
        let list_mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/users");
            then.status(200)
                .json_body_obj(&Envelope::success(vec![user.clone()]));
        });

        let client = OpenBplClient::new(&server.base_url()).unwrap();
        let fetched = client.get_user(1).await.unwrap().unwrap();
        assert_eq!(fetched, user);
        let listed = client.list_users().await.unwrap();
        assert_eq!(listed.len(), 1);

        get_mock.assert();
        list_mock.assert();
    }

    #[tokio::test]
    async fn not_found_is_none() {
        let server = MockServer::start();
        let missing = server.mock(|when, then| {
            when.method(GET).path("/api/v1/threats/9");
            then.status(404)
                .json_body_obj(&Envelope::<()>::error("threat not found"));
        });

        let client = OpenBplClient::new(&server.base_url()).unwrap();
        assert!(client.get_threat(9).await.unwrap().is_none());
        missing.assert();
    }

    #[tokio::test]
    async fn server_error_is_err() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/threats");
            then.status(500)
                .json_body_obj(&Envelope::<()>::error("internal server error"));
        });

        let client = OpenBplClient::new(&server.base_url()).unwrap();
        assert!(client.list_threats().await.is_err());
    }

    #[tokio::test]
    async fn against_live_server() {
        use openbpl_hex::application::query_service::QueryService;
        use openbpl_hex::inbound::http::{HttpServer, HttpServerConfig};
        use openbpl_repo::memory::{InMemoryThreatRepo, InMemoryUserRepo};

        let users = InMemoryUserRepo::new();
        users.insert(sample_user());
        let service = QueryService::new(users, InMemoryThreatRepo::new());
        let listening = HttpServer::new(service, HttpServerConfig::new("127.0.0.1:0"))
            .await
            .unwrap()
            .start()
            .await
            .unwrap();
        let client = OpenBplClient::new(&format!("http://{}/", listening.local_addr())).unwrap();

        assert!(client.health().await.unwrap().healthy);
        assert_eq!(client.status().await.unwrap().environment, "development");
        assert_eq!(client.get_user(1).await.unwrap().unwrap().name, "Alice");
        assert!(client.get_user(2).await.unwrap().is_none());
        assert!(client.list_threats().await.unwrap().is_empty());
        assert!(client.get_threat(1).await.unwrap().is_none());

        listening.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn sends_default_headers() {
        let server = MockServer::start();
        let threat = Threat {
            id: 3,
            title: "Spoofed sender domain".into(),
            classification: "phishing".into(),
            severity: Severity::Low,
            description: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/threats/3")
                .header("x-request-source", "integration");
            then.status(200)
                .json_body_obj(&Envelope::success(threat.clone()));
        });

        let client = OpenBplClient::builder(&server.base_url())
            .unwrap()
            .with_header("x-request-source", "integration")
            .unwrap()
            .with_timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let got = client.get_threat(3).await.unwrap().unwrap();
        assert_eq!(got.severity, Severity::Low);
        mock.assert();
    }
}
