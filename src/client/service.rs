//! The five remote operations of the document service.
//!
//! Each method performs exactly one exchange through the [`Transport`] and
//! turns the answer into a typed value or a stage-tagged [`MemoError`]:
//!
//! | Operation | Surface | Failure on non-2xx |
//! |-----------|---------|--------------------|
//! | [`ServiceClient::generate`]    | generation | `GenerationFailed` |
//! | [`ServiceClient::upload`]      | processing | `UploadFailed` |
//! | [`ServiceClient::protect`]     | processing | `ProtectionRequestFailed` |
//! | [`ServiceClient::poll_status`] | processing | `StatusCheckFailed` |
//! | [`ServiceClient::download`]    | processing | `DownloadFailed` |
//!
//! A 2xx answer missing the expected field is `MalformedResponse`.

use super::extract::{self, ExtractionRule};
use super::status::{StatusVocabulary, TaskReport, TaskStatus};
use super::transport::{OutboundBody, OutboundRequest, RawResponse, Transport};
use super::{DocumentHandle, TaskHandle};
use crate::config::{ServiceConfig, Surface};
use crate::error::{MemoError, Stage};
use crate::pipeline::encode;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const GENERATE_PATH: &str = "document-generation/api/GenerateDocumentBase64";
const UPLOAD_PATH: &str = "pdf-services/api/documents/upload";
const PROTECT_PATH: &str = "pdf-services/api/documents/security/pdf-protect";
const TASKS_PATH: &str = "pdf-services/api/tasks";
const DOCUMENTS_PATH: &str = "pdf-services/api/documents";

/// An action a reader of the protected PDF may perform without the owner
/// password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Print,
    PrintHighQuality,
    Copy,
    Modify,
    Annotate,
    FillForms,
    ExtractAccessibility,
    Assemble,
}

/// Granted permissions. `Print` is always present; everything else is denied
/// unless added with [`PermissionSet::allow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet(Vec<Permission>);

impl Default for PermissionSet {
    fn default() -> Self {
        Self::print_only()
    }
}

impl PermissionSet {
    pub fn print_only() -> Self {
        Self(vec![Permission::Print])
    }

    pub fn allow(mut self, permission: Permission) -> Self {
        if !self.0.contains(&permission) {
            self.0.push(permission);
            self.0.sort();
        }
        self
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn as_slice(&self) -> &[Permission] {
        &self.0
    }
}

/// Credentialed client for the generation and processing surfaces.
pub struct ServiceClient {
    generation: Surface,
    processing: Surface,
    transport: Arc<dyn Transport>,
    vocabulary: StatusVocabulary,
}

impl ServiceClient {
    pub fn new(config: &ServiceConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            generation: config.generation.clone(),
            processing: config.processing.clone(),
            transport,
            vocabulary: StatusVocabulary::default(),
        }
    }

    /// Replace the task-status vocabulary.
    pub fn with_vocabulary(mut self, vocabulary: StatusVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Render `template` with `values` and return the produced document.
    pub async fn generate(
        &self,
        template: &[u8],
        output_format: &str,
        values: &Value,
    ) -> Result<Vec<u8>, MemoError> {
        let body = json!({
            "outputFormat": output_format,
            "base64FileString": encode::encode_bytes(template),
            "documentValues": values,
        });
        let url = self.generation.endpoint(GENERATE_PATH);
        let request = authed(
            OutboundRequest::post(url, OutboundBody::Json(body)),
            &self.generation,
        )
        .header("Content-Type", "application/json");

        let response = self.exchange(Stage::Generation, request).await?;
        let json = parse_json(Stage::Generation, &response)?;
        let payload = required(Stage::Generation, extract::GENERATED_ARTIFACT, &json, &response)?;

        let bytes = encode::decode_payload(&payload).map_err(|e| {
            MemoError::malformed(
                Stage::Generation,
                format!("generated document is not valid base64: {e}"),
                &response.body,
            )
        })?;
        if bytes.is_empty() {
            return Err(MemoError::malformed(
                Stage::Generation,
                "generated document is empty",
                &response.body,
            ));
        }
        debug!("Generated {} byte {} document", bytes.len(), output_format);
        Ok(bytes)
    }

    /// Upload a document and return its handle.
    pub async fn upload(
        &self,
        artifact: Vec<u8>,
        suggested_name: &str,
    ) -> Result<DocumentHandle, MemoError> {
        let body = OutboundBody::Multipart {
            field: "file".into(),
            file_name: suggested_name.to_string(),
            content_type: "application/pdf".into(),
            bytes: artifact,
        };
        let request = authed(
            OutboundRequest::post(self.processing.endpoint(UPLOAD_PATH), body),
            &self.processing,
        );

        let response = self.exchange(Stage::Upload, request).await?;
        let json = parse_json(Stage::Upload, &response)?;
        let id = required(Stage::Upload, extract::UPLOADED_DOCUMENT, &json, &response)?;
        Ok(DocumentHandle::new(id))
    }

    /// Request asynchronous password protection of `document`.
    pub async fn protect(
        &self,
        document: &DocumentHandle,
        user_password: &str,
        owner_password: &str,
        permissions: &PermissionSet,
    ) -> Result<TaskHandle, MemoError> {
        let body = json!({
            "documentId": document.as_str(),
            "config": {
                "userPassword": user_password,
                "ownerPassword": owner_password,
                "permissions": permissions.as_slice(),
            },
        });
        let request = authed(
            OutboundRequest::post(self.processing.endpoint(PROTECT_PATH), OutboundBody::Json(body)),
            &self.processing,
        )
        .header("Content-Type", "application/json");

        let response = self.exchange(Stage::Protection, request).await?;
        let json = parse_json(Stage::Protection, &response)?;
        let id = required(Stage::Protection, extract::PROTECTION_TASK, &json, &response)?;
        Ok(TaskHandle::new(id))
    }

    /// Fetch and normalise the current state of `task`.
    pub async fn poll_status(&self, task: &TaskHandle) -> Result<TaskReport, MemoError> {
        let url = self.processing.endpoint(&format!(
            "{TASKS_PATH}/{}",
            urlencoding::encode(task.as_str())
        ));
        let request = authed(OutboundRequest::get(url), &self.processing);

        let response = self.exchange(Stage::Polling, request).await?;
        let json = parse_json(Stage::Polling, &response)?;
        let raw_status = required(Stage::Polling, extract::TASK_STATUS, &json, &response)?;
        let status = self.vocabulary.classify(&raw_status);
        if status == TaskStatus::Unknown {
            warn!("Task {}: unrecognised status '{}'", task, raw_status);
        }

        let result = if status == TaskStatus::Succeeded {
            let id = required(Stage::Polling, extract::TASK_RESULT, &json, &response)?;
            Some(DocumentHandle::new(id))
        } else {
            None
        };
        let detail = extract::first_match(extract::TASK_FAILURE_DETAIL, &json).map(|hit| hit.value);

        Ok(TaskReport {
            status,
            raw_status,
            result,
            detail,
        })
    }

    /// Download the content of `document`.
    pub async fn download(&self, document: &DocumentHandle) -> Result<Vec<u8>, MemoError> {
        let url = self.processing.endpoint(&format!(
            "{DOCUMENTS_PATH}/{}/download",
            urlencoding::encode(document.as_str())
        ));
        let request = authed(OutboundRequest::get(url), &self.processing);

        let response = self.exchange(Stage::Download, request).await?;
        if response.body.is_empty() {
            return Err(MemoError::malformed(
                Stage::Download,
                "downloaded document is empty",
                &response.body,
            ));
        }
        Ok(response.body)
    }

    /// Send `request`; anything but a 2xx answer becomes the stage's error.
    async fn exchange(
        &self,
        stage: Stage,
        request: OutboundRequest,
    ) -> Result<RawResponse, MemoError> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| MemoError::Transport {
                stage,
                detail: e.detail,
            })?;

        if !response.is_success() {
            warn!("{} stage: HTTP {}", stage, response.status);
            return Err(MemoError::http_failure(stage, response.status, &response.body));
        }
        Ok(response)
    }
}

fn authed(request: OutboundRequest, surface: &Surface) -> OutboundRequest {
    request
        .header("client_id", surface.credentials.client_id())
        .header("client_secret", surface.credentials.client_secret())
}

fn parse_json(stage: Stage, response: &RawResponse) -> Result<Value, MemoError> {
    response.json().map_err(|e| {
        MemoError::malformed(stage, format!("response is not JSON: {e}"), &response.body)
    })
}

fn required(
    stage: Stage,
    rules: &[ExtractionRule],
    json: &Value,
    response: &RawResponse,
) -> Result<String, MemoError> {
    match extract::first_match(rules, json) {
        Some(hit) => {
            debug!("{} stage: took '{}'", stage, hit.rule);
            Ok(hit.value)
        }
        None => Err(MemoError::malformed(
            stage,
            format!("expected one of: {}", extract::describe(rules)),
            &response.body,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_is_always_granted() {
        let set = PermissionSet::default();
        assert_eq!(set.as_slice(), &[Permission::Print]);

        let set = PermissionSet::print_only()
            .allow(Permission::Copy)
            .allow(Permission::Copy);
        assert!(set.contains(Permission::Print));
        assert_eq!(set.as_slice().len(), 2);
    }

    #[test]
    fn permissions_serialise_in_wire_format() {
        let set = PermissionSet::print_only().allow(Permission::FillForms);
        let wire = serde_json::to_value(set.as_slice()).unwrap();
        assert_eq!(wire, json!(["PRINT", "FILL_FORMS"]));
    }
}
