//! # Core API Client
//!
//! Authenticated submission-workflow operations against the ingest core API.
//! Responses are normalized into [`Resource`]s; a body without `_links` comes
//! back as `Ok(None)` and the caller decides what "not there" means.

use crate::clients::auth::{AuthError, Authenticator};
use crate::clients::transport::{HttpMethod, HttpRequest, HttpTransport, TransportError};
use crate::framework::{poll_until, FrameworkError, PollPolicy};
use crate::model::{FileDescriptor, Resource, ResourceError};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

pub const SUBMISSION_ENVELOPES_PATH: &str = "/submissionEnvelopes";

/// Errors surfaced by [`CoreClient`] and [`UploadClient`](crate::clients::UploadClient).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Framework(#[from] FrameworkError),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Client for the ingest core API.
#[derive(Clone)]
pub struct CoreClient {
    transport: Arc<dyn HttpTransport>,
    authenticator: Arc<dyn Authenticator>,
}

impl CoreClient {
    pub fn new(transport: Arc<dyn HttpTransport>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            transport,
            authenticator,
        }
    }

    /// Creates an empty submission envelope.
    #[instrument(skip(self))]
    pub async fn create_submission(&self, name: &str) -> Result<Option<Resource>, ClientError> {
        let body = self
            .send(HttpMethod::Post, SUBMISSION_ENVELOPES_PATH, Some(json!({})), name)
            .await?;
        Ok(parse_response(body))
    }

    /// POSTs a metadata document to a creation link taken from an earlier resource.
    #[instrument(skip(self, payload))]
    pub async fn create_metadata(
        &self,
        create_link: &str,
        payload: &Value,
        name: &str,
    ) -> Result<Option<Resource>, ClientError> {
        let body = self
            .send(HttpMethod::Post, create_link, Some(payload.clone()), name)
            .await?;
        Ok(parse_response(body))
    }

    /// PUTs a file reference onto a process.
    #[instrument(skip(self, file), fields(file = %file.file_name))]
    pub async fn add_output_file_to_process(
        &self,
        create_link: &str,
        file: &FileDescriptor,
        name: &str,
    ) -> Result<Option<Resource>, ClientError> {
        let body = self
            .send(HttpMethod::Put, create_link, Some(serde_json::to_value(file)?), name)
            .await?;
        Ok(parse_response(body))
    }

    /// POSTs a file descriptor to a submission's `files` link.
    #[instrument(skip(self, file), fields(file = %file.file_name))]
    pub async fn add_input_file(
        &self,
        files_link: &str,
        file: &FileDescriptor,
        name: &str,
    ) -> Result<Option<Resource>, ClientError> {
        let body = self
            .send(HttpMethod::Post, files_link, Some(serde_json::to_value(file)?), name)
            .await?;
        Ok(parse_response(body))
    }

    /// Fetches the current body of a resource.
    pub async fn get_json(&self, link: &str, name: &str) -> Result<Value, ClientError> {
        self.send(HttpMethod::Get, link, None, name).await
    }

    /// Polls a file until the server has assigned it a UUID and returns the
    /// accessioned body. Links play no part in readiness.
    #[instrument(skip(self))]
    pub async fn wait_for_accessioning(
        &self,
        file_link: &str,
        policy: PollPolicy,
    ) -> Result<Value, ClientError> {
        info!("Accessioning input file...");
        poll_until(policy, "file accession uuid", || async {
            let body = self
                .get_json(file_link, "retrieve file; wait for accessioning")
                .await?;
            Ok::<_, ClientError>(accession_uuid(&body).is_some().then_some(body))
        })
        .await
    }

    /// Polls a submission until its upload area has been provisioned and returns
    /// the area UUID.
    #[instrument(skip(self))]
    pub async fn wait_for_upload_area(
        &self,
        submission_link: &str,
        policy: PollPolicy,
    ) -> Result<String, ClientError> {
        poll_until(policy, "upload area uuid", || async {
            let body = self.get_json(submission_link, "get submission data").await?;
            Ok::<_, ClientError>(upload_area_uuid(&body).map(str::to_string))
        })
        .await
    }

    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<Value>,
        name: &str,
    ) -> Result<Value, ClientError> {
        // Fetched per request: the token manager may have refreshed it.
        let token = self.authenticator.get_token().await?;
        let mut request = HttpRequest::new(method, url, name).bearer(token);
        request.body = body;
        debug!(%method, url, "Sending request");
        Ok(self.transport.send(request).await?)
    }
}

/// A body with `_links` becomes a [`Resource`]; anything else is absence.
pub fn parse_response(body: Value) -> Option<Resource> {
    Resource::from_json(body)
}

/// `stagingDetails.stagingAreaUuid.uuid`, when fully populated and non-empty.
pub fn upload_area_uuid(submission: &Value) -> Option<&str> {
    submission
        .get("stagingDetails")?
        .get("stagingAreaUuid")?
        .get("uuid")?
        .as_str()
        .filter(|uuid| !uuid.is_empty())
}

/// The accession UUID of a file, given either as `"uuid": "..."` or as
/// `"uuid": {"uuid": "..."}`.
pub fn accession_uuid(file: &Value) -> Option<&str> {
    let uuid = file.get("uuid")?;
    uuid.as_str()
        .or_else(|| uuid.get("uuid").and_then(Value::as_str))
        .filter(|uuid| !uuid.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::auth::StaticTokenAuthenticator;
    use crate::framework::mock::MockTransport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Hands out a new token on every call.
    struct RotatingAuthenticator {
        issued: AtomicU32,
    }

    #[async_trait]
    impl Authenticator for RotatingAuthenticator {
        async fn get_token(&self) -> Result<String, AuthError> {
            Ok(format!("token-{}", self.issued.fetch_add(1, Ordering::SeqCst)))
        }

        async fn end_session(&self) {}
    }

    fn client(mock: &MockTransport) -> CoreClient {
        CoreClient::new(
            Arc::new(mock.clone()),
            Arc::new(StaticTokenAuthenticator::new("token")),
        )
    }

    #[tokio::test]
    async fn test_create_submission_parses_links() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Post, SUBMISSION_ENVELOPES_PATH)
            .return_json(json!({"_links": {"processes": {"href": "/p1"}, "self": {"href": "/s1"}}}));

        let submission = client(&mock)
            .create_submission("create analysis submission")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(submission.get_link("processes"), Ok("/p1"));
        let call = &mock.calls()[0];
        assert_eq!(call.body, Some(json!({})));
        assert_eq!(call.bearer_token.as_deref(), Some("token"));
        assert_eq!(call.name, "create analysis submission");
        mock.verify();
    }

    #[tokio::test]
    async fn test_response_without_links_is_absent_not_error() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Post, SUBMISSION_ENVELOPES_PATH)
            .return_json(json!({"error": "busy"}));

        let submission = client(&mock).create_submission("create new submission").await.unwrap();
        assert!(submission.is_none());
    }

    #[tokio::test]
    async fn test_token_is_fetched_for_every_request() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Put, "/f1").return_json(Value::Null);
        let client = CoreClient::new(
            Arc::new(mock.clone()),
            Arc::new(RotatingAuthenticator {
                issued: AtomicU32::new(0),
            }),
        );

        let file = FileDescriptor::sequence_file("ERR1630001.fastq.gz");
        for _ in 0..3 {
            let reference = client
                .add_output_file_to_process("/f1", &file, "add analysis output file")
                .await
                .unwrap();
            assert!(reference.is_none());
        }

        let tokens: Vec<_> = mock
            .calls()
            .into_iter()
            .map(|call| call.bearer_token.unwrap())
            .collect();
        assert_eq!(tokens, vec!["token-0", "token-1", "token-2"]);
        assert_eq!(mock.calls()[0].body, Some(serde_json::to_value(&file).unwrap()));
    }

    #[tokio::test]
    async fn test_transport_errors_propagate() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Post, "/p1").return_status(500);

        let result = client(&mock)
            .create_metadata("/p1", &json!({}), "create analysis process")
            .await;
        assert!(matches!(
            result,
            Err(ClientError::Transport(TransportError::Status { status: 500, .. }))
        ));
    }

    #[test]
    fn test_upload_area_uuid_requires_full_nesting() {
        assert_eq!(upload_area_uuid(&json!({})), None);
        assert_eq!(upload_area_uuid(&json!({"stagingDetails": null})), None);
        assert_eq!(upload_area_uuid(&json!({"stagingDetails": {}})), None);
        assert_eq!(
            upload_area_uuid(&json!({"stagingDetails": {"stagingAreaUuid": {}}})),
            None
        );
        assert_eq!(
            upload_area_uuid(&json!({"stagingDetails": {"stagingAreaUuid": {"uuid": ""}}})),
            None
        );
        assert_eq!(
            upload_area_uuid(&json!({"stagingDetails": {"stagingAreaUuid": {"uuid": "abc-123"}}})),
            Some("abc-123")
        );
    }

    #[test]
    fn test_accession_uuid_accepts_both_shapes() {
        assert_eq!(accession_uuid(&json!({"uuid": "u1"})), Some("u1"));
        assert_eq!(accession_uuid(&json!({"uuid": {"uuid": "u2"}})), Some("u2"));
        assert_eq!(accession_uuid(&json!({"uuid": null})), None);
        assert_eq!(accession_uuid(&json!({"uuid": ""})), None);
        assert_eq!(accession_uuid(&json!({})), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_area_poll_skips_partial_values() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Get, "/s1").return_json(json!({}));
        mock.expect(HttpMethod::Get, "/s1")
            .return_json(json!({"stagingDetails": {"stagingAreaUuid": null}}));
        mock.expect(HttpMethod::Get, "/s1")
            .return_json(json!({"stagingDetails": {"stagingAreaUuid": {"uuid": ""}}}));
        mock.expect(HttpMethod::Get, "/s1")
            .return_json(json!({"stagingDetails": {"stagingAreaUuid": {"uuid": "abc-123"}}}));

        let start = Instant::now();
        let uuid = client(&mock)
            .wait_for_upload_area("/s1", PollPolicy::UPLOAD_AREA)
            .await
            .unwrap();

        assert_eq!(uuid, "abc-123");
        assert_eq!(mock.count(HttpMethod::Get, "/s1"), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(9));
        mock.verify();
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_upload_area_poll_gives_up() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Get, "/s1").always().return_json(json!({}));

        let result = client(&mock)
            .wait_for_upload_area("/s1", PollPolicy::UPLOAD_AREA.with_max_attempts(Some(5)))
            .await;

        assert!(matches!(
            result,
            Err(ClientError::Framework(FrameworkError::PollExhausted { attempts: 5, .. }))
        ));
        assert_eq!(mock.count(HttpMethod::Get, "/s1"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accessioning_waits_for_uuid() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Get, "/files/1")
            .times(2)
            .return_json(json!({"uuid": null, "_links": {"self": {"href": "/files/1"}}}));
        mock.expect(HttpMethod::Get, "/files/1").return_json(json!({
            "uuid": {"uuid": "file-uuid"},
            "_links": {"self": {"href": "/files/1"}}
        }));

        let start = Instant::now();
        let file = client(&mock)
            .wait_for_accessioning("/files/1", PollPolicy::ACCESSIONING)
            .await
            .unwrap();

        assert_eq!(accession_uuid(&file), Some("file-uuid"));
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
        mock.verify();
    }

    #[tokio::test(start_paused = true)]
    async fn test_accessioned_file_without_links_is_ready() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Get, "/files/1")
            .always()
            .return_json(json!({"uuid": {"uuid": "file-uuid"}}));

        let start = Instant::now();
        let file = client(&mock)
            .wait_for_accessioning("/files/1", PollPolicy::ACCESSIONING.with_max_attempts(Some(20)))
            .await
            .unwrap();

        assert_eq!(file, json!({"uuid": {"uuid": "file-uuid"}}));
        assert_eq!(mock.count(HttpMethod::Get, "/files/1"), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
