use std::sync::mpsc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use console_core::{
    DownloadRequest, FilterState, JobFile, JobId, NewJob, PageResponse, RetrievalJob,
};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::session::Session;
use crate::types::{ApiError, Blob, EngineEvent, FailureKind};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 200 * 1024 * 1024,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Server operations the console consumes.
#[async_trait::async_trait]
pub trait ConsoleApi: Send + Sync {
    /// Most recent jobs, at most `limit`.
    async fn list_jobs(&self, limit: usize) -> Result<Vec<RetrievalJob>, ApiError>;
    async fn create_job(&self, job: &NewJob) -> Result<(), ApiError>;
    async fn retry_job(&self, job_id: &JobId) -> Result<(), ApiError>;
    async fn cancel_job(&self, job_id: &JobId) -> Result<(), ApiError>;
    /// Individual files generated by a completed job.
    async fn list_job_files(&self, job_id: &JobId) -> Result<Vec<JobFile>, ApiError>;
    async fn list_documents(&self, filters: &FilterState) -> Result<PageResponse, ApiError>;
    async fn download(
        &self,
        request: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> Result<Blob, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    session: Session,
    settings: ApiSettings,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct BatchBody<'a> {
    ids: &'a [String],
    formato: &'a str,
}

#[derive(Serialize)]
struct SelectionBody<'a> {
    ids: &'a [String],
}

#[derive(Deserialize)]
struct JobFileListing {
    #[serde(default)]
    archivos: Vec<JobFile>,
}

impl ReqwestApi {
    pub fn new(session: Session, settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            session,
            settings,
            client,
        })
    }

    fn url_with_params(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<Url, ApiError> {
        let mut url = self.session.endpoint(segments)?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    fn post_json<T: Serialize + ?Sized>(&self, url: Url, body: &T) -> RequestBuilder {
        self.client.post(url).json(body)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let builder = match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = error_detail(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        let kind = if status == StatusCode::UNAUTHORIZED {
            FailureKind::Unauthorized
        } else {
            FailureKind::HttpStatus(status.as_u16())
        };
        Err(ApiError::new(kind, message))
    }

    /// Stream the body, refusing anything above `max_bytes`.
    async fn read_body(
        &self,
        response: Response,
        mut on_progress: impl FnMut(u64),
    ) -> Result<Bytes, ApiError> {
        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(max_bytes, content_len));
            }
        }

        let mut bytes = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(too_large(max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
            on_progress(bytes.len() as u64);
        }
        Ok(bytes.freeze())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.send(self.client.get(url)).await?;
        let body = self.read_body(response, |_| {}).await?;
        serde_json::from_slice(&body).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }

    /// Acknowledged POST with an empty JSON object; the reply body is ignored.
    async fn post_ack(&self, segments: &[&str]) -> Result<(), ApiError> {
        let url = self.session.endpoint(segments)?;
        self.send(self.post_json(url, &serde_json::json!({})))
            .await
            .map(|_| ())
    }

    fn download_builder(&self, request: &DownloadRequest) -> Result<RequestBuilder, ApiError> {
        let builder = match request {
            DownloadRequest::JobArchive { job_id, .. } => self.client.get(
                self.session
                    .endpoint(&["descargas", job_id.as_str(), "download"])?,
            ),
            DownloadRequest::JobSpreadsheet { job_id, .. } => self
                .client
                .get(self.session.endpoint(&["descargas", job_id.as_str(), "excel"])?),
            DownloadRequest::JobFile { file_id, .. } => self.client.get(
                self.session
                    .endpoint(&["descargas", "archivos", file_id.as_str(), "download"])?,
            ),
            DownloadRequest::Batch { ids, format } => self.post_json(
                self.session
                    .endpoint(&["comprobantes", "batch", "download"])?,
                &BatchBody {
                    ids,
                    formato: format.as_str(),
                },
            ),
            DownloadRequest::Selection { ids } => self.post_json(
                self.session
                    .endpoint(&["comprobantes", "export", "selection"])?,
                &SelectionBody { ids },
            ),
            DownloadRequest::Filtered { filters } => self.client.get(self.url_with_params(
                &["comprobantes", "export", "excel"],
                &filters.export_params(),
            )?),
            DownloadRequest::Document { id, file, .. } => self.client.get(
                self.session
                    .endpoint(&["comprobantes", id.as_str(), file.extension()])?,
            ),
        };
        Ok(builder)
    }
}

#[async_trait::async_trait]
impl ConsoleApi for ReqwestApi {
    async fn list_jobs(&self, limit: usize) -> Result<Vec<RetrievalJob>, ApiError> {
        let url = self.url_with_params(&["descargas"], &[("limit", limit.to_string())])?;
        self.get_json(url).await
    }

    async fn create_job(&self, job: &NewJob) -> Result<(), ApiError> {
        let url = self.session.endpoint(&["descargas"])?;
        self.send(self.post_json(url, job)).await.map(|_| ())
    }

    async fn retry_job(&self, job_id: &JobId) -> Result<(), ApiError> {
        self.post_ack(&["descargas", job_id.as_str(), "retry"]).await
    }

    async fn cancel_job(&self, job_id: &JobId) -> Result<(), ApiError> {
        self.post_ack(&["descargas", job_id.as_str(), "cancel"]).await
    }

    async fn list_job_files(&self, job_id: &JobId) -> Result<Vec<JobFile>, ApiError> {
        let url = self
            .session
            .endpoint(&["descargas", job_id.as_str(), "archivos"])?;
        let listing: JobFileListing = self.get_json(url).await?;
        Ok(listing.archivos)
    }

    async fn list_documents(&self, filters: &FilterState) -> Result<PageResponse, ApiError> {
        let url = self.url_with_params(&["comprobantes"], &filters.api_params())?;
        self.get_json(url).await
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> Result<Blob, ApiError> {
        let response = match self.send(self.download_builder(request)?).await {
            Ok(response) => response,
            Err(err) => return Err(explain_missing(request, err)),
        };
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let bytes = self
            .read_body(response, |bytes| {
                sink.emit(EngineEvent::DownloadProgress {
                    request: request.clone(),
                    bytes,
                })
            })
            .await?;
        Ok(Blob {
            bytes,
            content_type,
        })
    }
}

/// The server's `detail` field: a message, or a list of validation entries.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(entries) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

fn explain_missing(request: &DownloadRequest, err: ApiError) -> ApiError {
    match (request, &err.kind) {
        (DownloadRequest::JobSpreadsheet { .. }, FailureKind::HttpStatus(404)) => ApiError::new(
            FailureKind::HttpStatus(404),
            "Detailed spreadsheet not available for this job",
        ),
        _ => err,
    }
}

fn too_large(max_bytes: u64, actual: u64) -> ApiError {
    ApiError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
