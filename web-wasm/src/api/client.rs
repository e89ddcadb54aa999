//! fetchによるバックエンド連携
//!
//! CLIのreqwestクライアントと同じエンドポイントをブラウザから叩く。

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{File, FormData, Request, RequestInit, RequestMode, Response};

use docdesk_common::{
    AnnotationPayload, Error, Result, StoredAnnotations, Tag, UploadItem, UploadResponse, Uploader,
};

/// `GET /api/documents/{id}` の必要な部分
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DocumentView {
    pub id: i64,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub ocrresult: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
}

impl DocumentView {
    pub fn text(&self) -> String {
        self.ocrresult.clone().unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct AnnotationsEnvelope {
    #[serde(default)]
    annotations: serde_json::Value,
}

/// 同一オリジンのAPIを呼ぶクライアント
#[derive(Debug, Clone, Default)]
pub struct FetchClient {
    base_url: String,
}

impl FetchClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 1ファイルをアップロード（multipart: files, document_type）
    pub async fn upload_file(&self, file: &File, document_type: &str) -> Result<UploadResponse> {
        let form = FormData::new().map_err(js_error)?;
        form.append_with_blob_and_filename("files", file, &file.name())
            .map_err(js_error)?;
        form.append_with_str("document_type", document_type)
            .map_err(js_error)?;

        let resp = self
            .send("POST", &self.url("/api/upload/documents"), Some(&form.into()), false)
            .await?;
        read_json(check_status(resp).await?).await
    }

    pub async fn fetch_document(&self, id: i64) -> Result<DocumentView> {
        let resp = self
            .send("GET", &self.url(&format!("/api/documents/{}", id)), None, false)
            .await?;
        read_json(check_status(resp).await?).await
    }

    /// 保存済みアノテーション。未保存（404）は空扱い
    pub async fn fetch_annotations(&self, id: i64) -> Result<StoredAnnotations> {
        let resp = self
            .send("GET", &self.url(&format!("/api/annotations/{}", id)), None, false)
            .await?;
        if resp.status() == 404 {
            return Ok(StoredAnnotations::Tags(Vec::new()));
        }
        let envelope: AnnotationsEnvelope = read_json(check_status(resp).await?).await?;
        Ok(StoredAnnotations::from_value(envelope.annotations))
    }

    pub async fn save_annotations(&self, id: i64, tags: &[Tag]) -> Result<()> {
        let body = json_body(tags)?;
        let resp = self
            .send("POST", &self.url(&format!("/api/annotations/{}", id)), Some(&body), true)
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    pub async fn update_document(&self, id: i64, payload: &AnnotationPayload) -> Result<()> {
        let body = json_body(payload)?;
        let resp = self
            .send("PATCH", &self.url(&format!("/api/documents/{}", id)), Some(&body), true)
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn send(&self, method: &str, url: &str, body: Option<&JsValue>, json: bool) -> Result<Response> {
        let opts = RequestInit::new();
        opts.set_method(method);
        opts.set_mode(RequestMode::SameOrigin);
        if let Some(body) = body {
            opts.set_body(body);
        }

        let request = Request::new_with_str_and_init(url, &opts).map_err(js_error)?;
        if json {
            request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(js_error)?;
        }

        let window = web_sys::window().ok_or_else(|| Error::Http("window unavailable".into()))?;
        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_error)?;
        resp_value.dyn_into().map_err(js_error)
    }
}

#[async_trait(?Send)]
impl Uploader<File> for FetchClient {
    async fn upload_one(&self, item: &UploadItem<File>, shared_tag: &str) -> Result<UploadResponse> {
        self.upload_file(&item.file, shared_tag).await
    }
}

fn js_error(value: JsValue) -> Error {
    Error::Http(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
}

fn json_body<T: Serialize + ?Sized>(value: &T) -> Result<JsValue> {
    Ok(JsValue::from_str(&serde_json::to_string(value)?))
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let value = JsFuture::from(resp.json().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    serde_wasm_bindgen::from_value(value).map_err(|e| Error::Http(format!("JSON parse error: {}", e)))
}

/// エラー時は `detail` を取り出す
async fn check_status(resp: Response) -> Result<Response> {
    if resp.ok() {
        return Ok(resp);
    }

    let status = resp.status();
    let body = match resp.text() {
        Ok(promise) => JsFuture::from(promise)
            .await
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default(),
        Err(_) => String::new(),
    };
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or(body);

    Err(Error::Http(format!("{} {}", status, message)))
}
