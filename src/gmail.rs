use crate::error::UpstreamError;
use crate::models::RawMessageRecord;
use crate::refresh::RawMessageSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use google_gmail1::Gmail;
use google_gmail1::api::{Message, MessagePart};
use hyper::client::HttpConnector;
use hyper_rustls::HttpsConnector;
use tracing::{debug, warn};

/// Reads raw messages straight from the Gmail API using a bearer token,
/// instead of going through the sync workflow.
#[derive(Clone)]
pub struct GmailSource {
    label: String,
    max_results: u32,
    concurrency: usize,
}

impl GmailSource {
    pub fn new(label: impl Into<String>, max_results: u32, concurrency: usize) -> Self {
        Self {
            label: label.into(),
            max_results,
            concurrency: concurrency.max(1),
        }
    }

    fn hub(&self, credential: &str) -> Result<Gmail<HttpsConnector<HttpConnector>>, UpstreamError> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_only()
            .enable_http1()
            .build();
        Ok(Gmail::new(
            hyper::Client::builder().build(connector),
            credential.to_string(),
        ))
    }

    async fn list_ids(
        &self,
        hub: &Gmail<HttpsConnector<HttpConnector>>,
    ) -> Result<Vec<String>, UpstreamError> {
        let (_, message_list) = hub
            .users()
            .messages_list("me")
            .max_results(self.max_results)
            .add_label_ids(&self.label)
            .doit()
            .await
            .map_err(|e| UpstreamError::Gmail(format!("failed to list messages: {e}")))?;

        Ok(message_list
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.id)
            .collect())
    }

    async fn get_message(
        hub: &Gmail<HttpsConnector<HttpConnector>>,
        id: String,
    ) -> Result<Option<RawMessageRecord>, UpstreamError> {
        let (_, msg) = hub
            .users()
            .messages_get("me", &id)
            .format("full")
            .doit()
            .await
            .map_err(|e| UpstreamError::Gmail(format!("failed to get message {id}: {e}")))?;
        Ok(to_record(msg))
    }
}

#[async_trait]
impl RawMessageSource for GmailSource {
    async fn fetch_raw(&self, credential: &str) -> Result<Vec<RawMessageRecord>, UpstreamError> {
        let hub = self.hub(credential)?;
        let ids = self.list_ids(&hub).await?;
        debug!(label = %self.label, count = ids.len(), "listed gmail messages");

        let results: Vec<_> = stream::iter(ids)
            .map(|id| Self::get_message(&hub, id))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut records = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "skipping message"),
            }
        }
        Ok(records)
    }
}

/// `None` when Gmail returned no id or no internal date.
fn to_record(msg: Message) -> Option<RawMessageRecord> {
    let id = msg.id?;
    let received_at = msg.internal_date.and_then(DateTime::from_timestamp_millis)?;

    let mut sender = None;
    let mut subject = None;
    let mut created_at = None;
    let mut plain_text = None;

    if let Some(payload) = &msg.payload {
        for header in payload.headers.iter().flatten() {
            match header.name.as_deref() {
                Some("From") => sender = header.value.clone(),
                Some("Subject") => subject = header.value.clone(),
                Some("Date") => {
                    created_at = header
                        .value
                        .as_deref()
                        .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
                        .map(|dt| dt.with_timezone(&Utc));
                }
                _ => {}
            }
        }
        plain_text = extract_text_body(payload, "text/plain");
    }

    Some(RawMessageRecord {
        id,
        thread_id: msg.thread_id,
        sender,
        subject,
        received_at,
        created_at,
        plain_text,
    })
}

/// The client has already undone Gmail's base64url transport encoding, so
/// `data` is the part's own bytes. Non-UTF-8 charsets come through lossy.
fn decode_part_data(data: &[u8]) -> Option<String> {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => String::from_utf8_lossy(data).into_owned(),
    };
    (!text.is_empty()).then_some(text)
}

fn extract_text_body(part: &MessagePart, mime_type: &str) -> Option<String> {
    if part.mime_type.as_deref() == Some(mime_type) {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_ref()) {
            return decode_part_data(data);
        }
    }

    let joined: String = part
        .parts
        .iter()
        .flatten()
        .filter_map(|p| extract_text_body(p, mime_type))
        .collect();
    (!joined.is_empty()).then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use google_gmail1::api::{MessagePartBody, MessagePartHeader};

    fn header(name: &str, value: &str) -> MessagePartHeader {
        MessagePartHeader {
            name: Some(name.into()),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    fn text_part(mime: &str, data: &str) -> MessagePart {
        bytes_part(mime, data.as_bytes())
    }

    fn bytes_part(mime: &str, data: &[u8]) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.into()),
            body: Some(MessagePartBody {
                data: Some(data.to_vec()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn message_maps_headers_and_plain_body() {
        let msg = Message {
            id: Some("m1".into()),
            thread_id: Some("t1".into()),
            internal_date: Some(1_704_067_200_000),
            payload: Some(MessagePart {
                mime_type: Some("multipart/alternative".into()),
                headers: Some(vec![
                    header("From", "Brand <brand@x.com>"),
                    header("Subject", "Sponsorship"),
                    header("Date", "Mon, 1 Jan 2024 09:00:00 +0900"),
                ]),
                parts: Some(vec![
                    text_part("text/plain", "Collab offer inside"),
                    text_part("text/html", "<p>ignored</p>"),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let record = to_record(msg).unwrap();
        assert_eq!(record.id, "m1");
        assert_eq!(record.thread_id.as_deref(), Some("t1"));
        assert_eq!(record.sender.as_deref(), Some("Brand <brand@x.com>"));
        assert_eq!(record.plain_text.as_deref(), Some("Collab offer inside"));
        assert_eq!(
            record.received_at,
            DateTime::from_timestamp_millis(1_704_067_200_000).unwrap()
        );
        assert_eq!(
            record.created_at.map(|d| d.to_rfc3339()),
            Some("2024-01-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn short_alphanumeric_body_is_left_alone() {
        let part = text_part("text/plain", "OK");
        assert_eq!(extract_text_body(&part, "text/plain").as_deref(), Some("OK"));

        let looks_encoded = text_part("text/plain", "SGVsbG8");
        assert_eq!(
            extract_text_body(&looks_encoded, "text/plain").as_deref(),
            Some("SGVsbG8")
        );
    }

    #[test]
    fn nested_plain_parts_are_joined_and_invalid_utf8_is_lossy() {
        let part = MessagePart {
            mime_type: Some("multipart/mixed".into()),
            parts: Some(vec![
                text_part("text/plain", "first "),
                bytes_part("text/plain", b"caf\xe9"),
            ]),
            ..Default::default()
        };
        assert_eq!(
            extract_text_body(&part, "text/plain").as_deref(),
            Some("first caf\u{fffd}")
        );
    }

    #[test]
    fn message_without_date_is_dropped() {
        let msg = Message {
            id: Some("m1".into()),
            ..Default::default()
        };
        assert!(to_record(msg).is_none());
    }
}
