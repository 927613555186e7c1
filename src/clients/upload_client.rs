//! Client for the file upload service.
//!
//! Upload calls carry no bearer token: the upload area UUID is the only
//! credential the service asks for.

use crate::clients::core_client::ClientError;
use crate::clients::transport::{HttpMethod, HttpRequest, HttpTransport};
use crate::model::{FileDescriptor, UploadDescriptor};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Clone)]
pub struct UploadClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl UploadClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/area/<uuid>/files`
    pub fn upload_url(&self, upload_area_uuid: &str) -> String {
        format!("{}/area/{}/files", self.base_url, upload_area_uuid)
    }

    pub async fn upload_file(
        &self,
        upload_url: &str,
        descriptor: &UploadDescriptor,
    ) -> Result<(), ClientError> {
        debug!(file = %descriptor.file_name, "Uploading file");
        let request = HttpRequest::new(HttpMethod::Put, upload_url, "upload file")
            .json(serde_json::to_value(descriptor)?);
        self.transport.send(request).await?;
        Ok(())
    }

    /// Uploads every file sequentially into the area, stopping at the first failure.
    /// Returns the number of files uploaded.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub async fn upload_files(
        &self,
        upload_area_uuid: &str,
        files: &[FileDescriptor],
    ) -> Result<usize, ClientError> {
        let upload_url = self.upload_url(upload_area_uuid);
        info!(%upload_url, "uploading dummy files");
        for file in files {
            self.upload_file(&upload_url, &file.upload_descriptor()).await?;
        }
        Ok(files.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockTransport;
    use crate::model::{Fixtures, UPLOAD_CONTENT_TYPE};
    use serde_json::{json, Value};

    #[test]
    fn test_upload_url_trims_trailing_slash() {
        let client = UploadClient::new(Arc::new(MockTransport::new()), "http://upload.test/v1/");
        assert_eq!(client.upload_url("abc-123"), "http://upload.test/v1/area/abc-123/files");
    }

    #[tokio::test]
    async fn test_upload_files_puts_every_descriptor_without_auth() {
        let mock = MockTransport::new();
        let url = "http://upload.test/v1/area/abc-123/files";
        mock.expect(HttpMethod::Put, url).times(30).return_json(Value::Null);

        let fixtures = Fixtures::with_analysis(json!({}));
        let client = UploadClient::new(Arc::new(mock.clone()), "http://upload.test/v1");
        let uploaded = client.upload_files("abc-123", &fixtures.output_files).await.unwrap();

        assert_eq!(uploaded, 30);
        let calls = mock.calls();
        assert!(calls.iter().all(|call| call.bearer_token.is_none()));
        assert_eq!(
            calls[0].body,
            Some(json!({"fileName": "ERR1630001.fastq.gz", "contentType": UPLOAD_CONTENT_TYPE}))
        );
        assert_eq!(calls[29].body.as_ref().unwrap()["fileName"], "ERR1630030.fastq.gz");
        mock.verify();
    }

    #[tokio::test]
    async fn test_upload_stops_at_first_failure() {
        let mock = MockTransport::new();
        let url = "http://upload.test/v1/area/abc-123/files";
        mock.expect(HttpMethod::Put, url).times(2).return_json(Value::Null);
        mock.expect(HttpMethod::Put, url).return_status(500);

        let fixtures = Fixtures::with_analysis(json!({}));
        let client = UploadClient::new(Arc::new(mock.clone()), "http://upload.test/v1");
        let result = client.upload_files("abc-123", &fixtures.output_files).await;

        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert_eq!(mock.calls().len(), 3);
    }
}
