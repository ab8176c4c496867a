use crate::error::UpstreamError;
use crate::models::{ClassifiedRecord, RawMessageRecord};
use crate::normalize::{parse_classified, parse_raw};
use crate::refresh::{ClassificationSource, RawMessageSource};
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Client, Method, Request};
use hyper_rustls::HttpsConnector;
use tracing::debug;

type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Webhooks may be plain http on a local network, so both schemes are allowed.
fn build_client() -> HttpsClient {
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder().build(connector)
}

/// POST `body` to `url` and return the response bytes on a 2xx status.
async fn post(
    client: &HttpsClient,
    source_name: &'static str,
    url: &str,
    body: String,
    bearer: Option<&str>,
) -> Result<Vec<u8>, UpstreamError> {
    let transport = |message: String| UpstreamError::Transport {
        source_name,
        message,
    };

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(url)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder
        .body(Body::from(body))
        .map_err(|e| transport(e.to_string()))?;

    let response = client
        .request(request)
        .await
        .map_err(|e| transport(e.to_string()))?;
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .map_err(|e| transport(e.to_string()))?;
    debug!(source_name, url, status = status.as_u16(), len = bytes.len(), "webhook response");

    if !status.is_success() {
        return Err(UpstreamError::Status {
            source_name,
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }
    Ok(bytes.to_vec())
}

/// Triggers the workflow's batch classification and reads its result.
#[derive(Clone)]
pub struct WebhookClassifier {
    client: HttpsClient,
    url: String,
}

impl WebhookClassifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ClassificationSource for WebhookClassifier {
    async fn fetch_classified(&self) -> Result<Vec<ClassifiedRecord>, UpstreamError> {
        let body = post(&self.client, "classification", &self.url, "{}".to_string(), None).await?;
        Ok(parse_classified(&body))
    }
}

/// Hands the mailbox access token to the sync workflow and reads back the
/// raw messages it pulled.
#[derive(Clone)]
pub struct WebhookSync {
    client: HttpsClient,
    url: String,
}

impl WebhookSync {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl RawMessageSource for WebhookSync {
    async fn fetch_raw(&self, credential: &str) -> Result<Vec<RawMessageRecord>, UpstreamError> {
        let payload = serde_json::json!({ "access_token": credential }).to_string();
        let body = post(&self.client, "raw_sync", &self.url, payload, Some(credential)).await?;
        Ok(parse_raw(&body))
    }
}
