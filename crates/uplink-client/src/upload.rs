//! One-shot multipart upload submission.

use crate::error::{ClientError, Result};
use tracing::{debug, warn};
use uplink_protocol::SID_FIELD;
use url::Url;

/// The file payload of an upload form.
#[derive(Debug, Clone)]
pub struct FileField {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileField {
    /// Build a file field, guessing the content type from the file name.
    pub fn new(field_name: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();
        Self {
            field_name: field_name.into(),
            file_name,
            content_type,
            bytes,
        }
    }
}

/// Transient aggregate of form fields plus the file payload. Created at
/// submit time, consumed by a single request, never retried.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub fields: Vec<(String, String)>,
    pub file: Option<FileField>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, file: FileField) -> Self {
        self.file = Some(file);
        self
    }
}

/// Issues the upload POST for a page session.
pub struct UploadCoordinator {
    http: reqwest::Client,
    endpoint: Url,
}

impl UploadCoordinator {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(ClientError::InvalidUrl(format!(
                "URL must use http:// or https:// scheme, got: {}",
                endpoint.scheme()
            )));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
        })
    }

    /// Upload endpoint as string.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Serialize the form plus exactly one `sid` field into a multipart body
    /// and POST it once. An empty `sid` is submitted as-is: the server just
    /// cannot correlate pushes back to the session.
    ///
    /// Returns the raw response body; it is pre-rendered content, not parsed
    /// here.
    pub async fn submit(&self, form: UploadForm, sid: &str) -> Result<String> {
        if sid.is_empty() {
            warn!("submitting without a channel identifier; progress pushes will not arrive");
        }

        let mut multipart =
            reqwest::multipart::Form::new().text(SID_FIELD.to_string(), sid.to_string());
        for (name, value) in form.fields {
            // Exactly one sid part per request; a caller-supplied one would
            // shadow the live channel identifier on the server side.
            if name == SID_FIELD {
                warn!(%value, "dropping caller-supplied sid field");
                continue;
            }
            multipart = multipart.text(name, value);
        }
        if let Some(file) = form.file {
            debug!(
                file_name = %file.file_name,
                bytes = file.bytes.len(),
                "attaching file payload"
            );
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.content_type)?;
            multipart = multipart.part(file.field_name, part);
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(multipart)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}
