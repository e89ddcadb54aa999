//! 共有型定義
//!
//! CLIとWeb(WASM)で共有される型:
//! - Tag / TagType: OCRテキスト上のラベル付き範囲
//! - UploadItem / UploadResponse / UploadResult: 一括アップロードの入出力

use serde::{Deserialize, Serialize};

/// タグ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagType {
    Oib,
    InvoiceNumber,
    DateInvoice,
    AmountTotal,
    SupplierName,
}

impl TagType {
    pub const ALL: [TagType; 5] = [
        TagType::Oib,
        TagType::InvoiceNumber,
        TagType::DateInvoice,
        TagType::AmountTotal,
        TagType::SupplierName,
    ];

    /// 画面表示用ラベル
    pub fn label(&self) -> &'static str {
        match self {
            TagType::Oib => "OIB (HR)",
            TagType::InvoiceNumber => "Broj računa",
            TagType::DateInvoice => "Datum računa",
            TagType::AmountTotal => "Iznos",
            TagType::SupplierName => "Naziv partnera/dobavljača",
        }
    }

    /// アノテーションAPIのフィールド名
    pub fn field_name(&self) -> &'static str {
        match self {
            TagType::Oib => "oib",
            TagType::InvoiceNumber => "invoice_number",
            TagType::DateInvoice => "date_invoice",
            TagType::AmountTotal => "amount",
            TagType::SupplierName => "supplier_name_ocr",
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, TagType::DateInvoice)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Oib => "OIB",
            TagType::InvoiceNumber => "INVOICE_NUMBER",
            TagType::DateInvoice => "DATE_INVOICE",
            TagType::AmountTotal => "AMOUNT_TOTAL",
            TagType::SupplierName => "SUPPLIER_NAME",
        }
    }
}

impl std::str::FromStr for TagType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_uppercase().replace('-', "_");
        TagType::ALL
            .into_iter()
            .find(|t| t.as_str() == key || t.field_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown tag type: {}. Use oib, invoice_number, date_invoice, amount_total or supplier_name",
                    s
                )
            })
    }
}

impl std::fmt::Display for TagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// テキスト上の文字範囲 `[start, end)`（char単位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharRange {
    pub start: usize,
    pub end: usize,
}

impl CharRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// OCRテキストに付けたタグ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "type")]
    pub tag_type: TagType,
    pub start: usize,
    pub end: usize,
    /// 作成時点の `text[start..end]`
    pub value: String,
}

impl Tag {
    pub fn range(&self) -> CharRange {
        CharRange::new(self.start, self.end)
    }

    /// 保存用に整形した値
    ///
    /// 日付は空白を除去し、`dd.mm.yyyy` には末尾の `.` を補う。
    /// それ以外は前後の空白を除去する。
    pub fn normalized_value(&self) -> String {
        if self.tag_type.is_date() {
            normalize_date(&self.value)
        } else {
            self.value.trim().to_string()
        }
    }
}

/// 日付文字列の整形（`01.02.2024` → `01.02.2024.`）
pub fn normalize_date(value: &str) -> String {
    lazy_static::lazy_static! {
        static ref FULL_DATE: regex::Regex = regex::Regex::new(r"^\d{2}\.\d{2}\.\d{4}\.$").unwrap();
        static ref BARE_DATE: regex::Regex = regex::Regex::new(r"^\d{2}\.\d{2}\.\d{4}$").unwrap();
    }

    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if FULL_DATE.is_match(&compact) {
        compact
    } else if BARE_DATE.is_match(&compact) {
        format!("{}.", compact)
    } else {
        compact
    }
}

/// アップロード対象ファイル
///
/// `file` はフロントエンド固有のハンドル（CLIではパス、Webでは `File`）。
#[derive(Debug, Clone)]
pub struct UploadItem<F> {
    pub file: F,
    pub name: String,
    pub size_bytes: u64,
}

impl<F> UploadItem<F> {
    pub fn new(file: F, name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            file,
            name: name.into(),
            size_bytes,
        }
    }

    /// 一覧表示用 "name (12.34 KB)"
    pub fn display_label(&self) -> String {
        format!("{} ({:.2} KB)", self.name, self.size_bytes as f64 / 1024.0)
    }
}

/// サーバーが返す処理ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum UploadStatus {
    Ok,
    Duplicate,
    Error,
}

impl From<String> for UploadStatus {
    fn from(value: String) -> Self {
        match value.to_uppercase().as_str() {
            "OK" => UploadStatus::Ok,
            "DUPLICATE" => UploadStatus::Duplicate,
            // FAILED や未知の値はエラー扱い
            _ => UploadStatus::Error,
        }
    }
}

/// 処理済みドキュメント1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    #[serde(default)]
    pub filename: String,
    pub status: UploadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_alert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessedDocument {
    pub fn new(filename: impl Into<String>, status: UploadStatus) -> Self {
        Self {
            filename: filename.into(),
            status,
            id: None,
            original_filename: None,
            validation_status: None,
            validation_alert: None,
            error: None,
        }
    }
}

/// アップロード1回分のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub processed: Vec<ProcessedDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn processed(processed: Vec<ProcessedDocument>) -> Self {
        Self {
            processed,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            processed: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
            || self
                .processed
                .iter()
                .any(|doc| doc.status == UploadStatus::Error)
    }
}

/// ファイルごとのアップロード結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub filename: String,
    pub response: UploadResponse,
}

impl UploadResult {
    /// 表示用のエラー理由（通信エラー → 文書ごとのエラー → ステータス）
    pub fn error_message(&self) -> String {
        self.response
            .error
            .clone()
            .or_else(|| self.response.processed.iter().find_map(|d| d.error.clone()))
            .unwrap_or_else(|| "ERROR".to_string())
    }
}
