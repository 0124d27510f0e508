//! HTTP transport for wire requests.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::query::WireRequest;

/// Executes a request against the service and returns the parsed JSON body.
///
/// Implementations own authentication, timeouts and the API version; they do
/// not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: WireRequest) -> Result<Value>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    /// Sent as basic auth with the fixed user name `apikey`.
    ApiKey(String),
    Basic { username: String, password: String },
}

pub struct HttpTransport {
    client: Client,
    base_url: Url,
    version: String,
    credentials: Credentials,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        version: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self> {
        Self::with_client(Client::new(), base_url, version, credentials)
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        version: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid service URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Service URL '{}' cannot carry a path",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            version: version.into(),
            credentials,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("Invalid value for header '{}': {}", name, e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Self::with_client(client, &config.url, config.version.clone(), config.credentials()?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn url_for(&self, request: &WireRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Service URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(request.path_segments());

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("version", &self.version);
            for (name, value) in &request.query {
                pairs.append_pair(name, value);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: WireRequest) -> Result<Value> {
        let url = self.url_for(&request)?;
        tracing::debug!("{} {}", request.method, url.path());

        let mut builder = self.client.request(request.method.clone(), url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        builder = match &self.credentials {
            Credentials::None => builder,
            Credentials::ApiKey(key) => builder.basic_auth("apikey", Some(key)),
            Credentials::Basic { username, password } => builder.basic_auth(username, Some(password)),
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    tracing::debug!("Failed to read {} error body: {}", status, e);
                    None
                }
            };
            return Err(Error::Service {
                status: status.as_u16(),
                message: service_message(body.as_deref(), status.canonical_reason()),
            });
        }

        Ok(response.json().await?)
    }
}

/// The service reports failures as `{"code": 404, "error": "..."}`; fall back
/// to the raw body, then to the status reason. `None` means the body could not
/// be read.
fn service_message(body: Option<&str>, reason: Option<&str>) -> String {
    let reason = reason.unwrap_or("unknown error");
    let Some(body) = body else {
        return format!("{} (response body unreadable)", reason);
    };

    let parsed = serde_json::from_str::<Value>(body).ok();
    let field = parsed.as_ref().and_then(|v| {
        v.get("error")
            .or_else(|| v.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });

    field
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryNoticesRequest, QueryRequest};

    #[test]
    fn test_url_keeps_base_path_and_adds_version() {
        let transport = HttpTransport::new(
            "https://gateway.example.com/discovery/api/",
            "2017-11-07",
            Credentials::None,
        )
        .unwrap();
        let wire = QueryRequest::new("system", "news-en").count(5).to_wire().unwrap();

        let url = transport.url_for(&wire).unwrap();
        assert_eq!(
            url.as_str(),
            "https://gateway.example.com/discovery/api/v1/environments/system/collections/news-en/query?version=2017-11-07"
        );
    }

    #[test]
    fn test_url_encodes_path_and_query() {
        let transport =
            HttpTransport::new("http://localhost:9000", "2017-11-07", Credentials::None).unwrap();
        let wire = QueryNoticesRequest::new("my env", "c/1")
            .query("notices.severity:\"error\"")
            .to_wire()
            .unwrap();

        let url = transport.url_for(&wire).unwrap();
        assert_eq!(url.path(), "/v1/environments/my%20env/collections/c%2F1/notices");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("version".to_string(), "2017-11-07".to_string()),
                ("query".to_string(), "notices.severity:\"error\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(
            HttpTransport::new("not a url", "v", Credentials::None),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            HttpTransport::new("mailto:someone@example.com", "v", Credentials::None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_service_message() {
        assert_eq!(
            service_message(
                Some(r#"{"code":404,"error":"Environment not found"}"#),
                Some("Not Found")
            ),
            "Environment not found"
        );
        assert_eq!(
            service_message(Some("upstream timeout"), Some("Bad Gateway")),
            "upstream timeout"
        );
        assert_eq!(service_message(Some("  "), Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(service_message(Some(""), None), "unknown error");
    }

    #[test]
    fn test_unreadable_body_is_reported() {
        assert_eq!(
            service_message(None, Some("Service Unavailable")),
            "Service Unavailable (response body unreadable)"
        );
        assert_eq!(service_message(None, None), "unknown error (response body unreadable)");
    }

    #[test]
    fn test_from_config() {
        let mut config = ServiceConfig::default();
        config.url = "http://localhost:9000/api".to_string();
        config.version = "2018-03-05".to_string();
        config.api_key = Some("secret".to_string());
        config
            .default_headers
            .insert("X-Watson-Learning-Opt-Out".to_string(), "true".to_string());

        let transport = HttpTransport::from_config(&config).unwrap();
        assert_eq!(transport.base_url().as_str(), "http://localhost:9000/api");
        assert_eq!(transport.version(), "2018-03-05");

        config.default_headers.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(
            HttpTransport::from_config(&config),
            Err(Error::Config(_))
        ));
    }
}
