//! reqwestによるAPIクライアント
//!
//! - POST /api/upload/documents   （multipart: files, document_type）
//! - GET  /api/documents/{id}
//! - GET  /api/annotations/{id}
//! - POST /api/annotations/{id}
//! - PATCH /api/documents/{id}

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use docdesk_common::{
    AnnotationPayload, StoredAnnotations, Tag, UploadItem, UploadResponse, Uploader,
};

use crate::error::{DocDeskError, Result};

const USER_AGENT: &str = concat!("docdesk/", env!("CARGO_PKG_VERSION"));

/// `GET /api/documents/{id}` のレスポンス
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub ocrresult: Option<String>,
    #[serde(default)]
    pub supplier_name_ocr: Option<String>,
}

impl DocumentRecord {
    pub fn text(&self) -> &str {
        self.ocrresult.as_deref().unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct AnnotationsEnvelope {
    #[serde(default)]
    annotations: serde_json::Value,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 1ファイルをアップロード
    pub async fn upload_document(
        &self,
        path: &std::path::Path,
        file_name: &str,
        document_type: &str,
    ) -> Result<UploadResponse> {
        let bytes = tokio::fs::read(path).await?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.as_ref())?;

        let form = Form::new()
            .part("files", part)
            .text("document_type", document_type.to_string());

        let url = self.url("/api/upload/documents");
        debug!("POST {} ({})", url, file_name);
        let response = self.client.post(&url).multipart(form).send().await?;
        let response = check_status(response).await?;

        Ok(response.json::<UploadResponse>().await?)
    }

    pub async fn fetch_document(&self, id: i64) -> Result<DocumentRecord> {
        let url = self.url(&format!("/api/documents/{}", id));
        debug!("GET {}", url);
        let response = check_status(self.client.get(&url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// 保存済みアノテーション。未保存（404）は空扱い
    pub async fn fetch_annotations(&self, id: i64) -> Result<StoredAnnotations> {
        let url = self.url(&format!("/api/annotations/{}", id));
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(StoredAnnotations::Tags(Vec::new()));
        }
        let envelope: AnnotationsEnvelope = check_status(response).await?.json().await?;
        Ok(StoredAnnotations::from_value(envelope.annotations))
    }

    /// タグ一覧を保存
    pub async fn save_annotations(&self, id: i64, tags: &[Tag]) -> Result<()> {
        let url = self.url(&format!("/api/annotations/{}", id));
        debug!("POST {} ({} tags)", url, tags.len());
        check_status(self.client.post(&url).json(tags).send().await?).await?;
        info!("saved {} tags for document {}", tags.len(), id);
        Ok(())
    }

    /// ドキュメント本体のフィールドを更新
    pub async fn update_document(&self, id: i64, payload: &AnnotationPayload) -> Result<()> {
        let url = self.url(&format!("/api/documents/{}", id));
        debug!("PATCH {}", url);
        check_status(self.client.patch(&url).json(payload).send().await?).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or(body);

    Err(DocDeskError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait(?Send)]
impl Uploader<PathBuf> for ApiClient {
    async fn upload_one(
        &self,
        item: &UploadItem<PathBuf>,
        shared_tag: &str,
    ) -> docdesk_common::Result<UploadResponse> {
        self.upload_document(&item.file, &item.name, shared_tag)
            .await
            .map_err(|e| docdesk_common::Error::Upload(e.to_string()))
    }
}
