//! タグとアノテーションAPIの相互変換

use serde::{Deserialize, Deserializer, Serialize};

use crate::tagger::char_slice;
use crate::types::{Tag, TagType};

/// `/api/annotations/{id}` のレコード
///
/// 各フィールドは文字列・数値・nullを受け付ける（旧形式の金額は数値）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationPayload {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub document_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub oib: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub date_invoice: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        alias = "amount_total",
        deserialize_with = "lenient_string"
    )]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub supplier_name_ocr: Option<String>,
}

/// 文字列はそのまま、数値・真偽値は文字列化、それ以外は `None`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// タグ付け画面で選べるドキュメント種別
pub const ANNOTATION_DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("FAKTURA", "Faktura"),
    ("IRA", "Izlazni račun (IRA)"),
    ("IZVOD", "Izvod"),
    ("UGOVOR", "Ugovor"),
    ("CESIJA", "Cesija"),
    ("IOS", "IOS"),
    ("KONTO_KARTICA", "Konto kartica"),
    ("OSTALO", "Ostalo"),
    ("NEPOZNATO", "Nepoznato"),
];

/// 未設定・未知の種別の扱い
pub const FALLBACK_DOCUMENT_TYPE: &str = "OSTALO";

/// 既知の種別キーに揃える。未知なら `OSTALO`
pub fn annotation_document_type(document_type: Option<&str>) -> &'static str {
    document_type
        .map(str::trim)
        .and_then(|kind| ANNOTATION_DOCUMENT_TYPES.iter().find(|(key, _)| *key == kind))
        .map(|(key, _)| *key)
        .unwrap_or(FALLBACK_DOCUMENT_TYPE)
}

/// 種別ごとに付けられるタグ
pub fn fields_for_type(document_type: &str) -> &'static [TagType] {
    use TagType::*;
    match annotation_document_type(Some(document_type)) {
        "FAKTURA" | "IRA" => &[SupplierName, AmountTotal, DateInvoice, InvoiceNumber, Oib],
        "IZVOD" => &[AmountTotal, DateInvoice, Oib],
        "UGOVOR" => &[SupplierName, DateInvoice, Oib],
        "CESIJA" | "IOS" | "KONTO_KARTICA" => &[SupplierName, DateInvoice],
        "NEPOZNATO" => &[],
        _ => &[Oib],
    }
}

impl AnnotationPayload {
    /// タグから組み立てる。同じ種別は後のタグが優先
    pub fn from_tags(tags: &[Tag]) -> Self {
        let mut payload = Self::default();
        for tag in tags {
            *payload.field_mut(tag.tag_type) = Some(tag.normalized_value());
        }
        payload
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    pub fn field(&self, tag_type: TagType) -> Option<&str> {
        match tag_type {
            TagType::Oib => self.oib.as_deref(),
            TagType::InvoiceNumber => self.invoice_number.as_deref(),
            TagType::DateInvoice => self.date_invoice.as_deref(),
            TagType::AmountTotal => self.amount.as_deref(),
            TagType::SupplierName => self.supplier_name_ocr.as_deref(),
        }
    }

    fn field_mut(&mut self, tag_type: TagType) -> &mut Option<String> {
        match tag_type {
            TagType::Oib => &mut self.oib,
            TagType::InvoiceNumber => &mut self.invoice_number,
            TagType::DateInvoice => &mut self.date_invoice,
            TagType::AmountTotal => &mut self.amount,
            TagType::SupplierName => &mut self.supplier_name_ocr,
        }
    }

    pub fn is_empty(&self) -> bool {
        TagType::ALL.iter().all(|t| self.field(*t).is_none())
    }
}

/// 保存済みアノテーションを初期タグに戻す
///
/// 値がテキスト中に最初に現れる位置をタグ範囲とする。見つからない値は捨てる。
pub fn tags_from_annotations(text: &str, payload: &AnnotationPayload) -> Vec<Tag> {
    let mut tags = Vec::new();

    for tag_type in TagType::ALL {
        let Some(value) = payload.field(tag_type).map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };

        let found = candidates(tag_type, value).iter().find_map(|c| find_char_range(text, c));
        match found {
            Some((start, end)) => tags.push(Tag {
                tag_type,
                start,
                end,
                value: char_slice(text, start, end).unwrap_or(value).to_string(),
            }),
            None => tracing::debug!("annotation {} not found in text: {:?}", tag_type, value),
        }
    }

    tags.sort_by_key(|t| t.start);
    tags
}

/// テキスト中で探す表記の候補
///
/// 日付は末尾の `.` を付けて保存されるため外した形も探す。
/// 数値で保存された金額は `125,00` の形も探す。
fn candidates(tag_type: TagType, value: &str) -> Vec<String> {
    let mut out = vec![value.to_string()];
    match tag_type {
        TagType::DateInvoice => {
            let bare = value.trim_end_matches('.');
            if bare != value && !bare.is_empty() {
                out.push(bare.to_string());
            }
        }
        TagType::AmountTotal => {
            if let Ok(amount) = value.parse::<f64>() {
                out.push(format!("{:.2}", amount).replace('.', ","));
                out.push(format!("{:.2}", amount));
            }
        }
        _ => {}
    }
    out
}

/// サーバーに保存されているアノテーション
///
/// 位置情報付きのタグ一覧か、フィールド名→値の旧形式のどちらか。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredAnnotations {
    Tags(Vec<Tag>),
    Fields(AnnotationPayload),
}

impl StoredAnnotations {
    /// `{"annotations": ...}` の中身を解釈する。解釈できなければ空
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Tags(Vec::new()),
            serde_json::Value::Array(_) => serde_json::from_value(value)
                .map(Self::Tags)
                .unwrap_or_else(|e| {
                    tracing::warn!("unrecognised annotation list: {}", e);
                    Self::Tags(Vec::new())
                }),
            other => serde_json::from_value(other)
                .map(Self::Fields)
                .unwrap_or_else(|e| {
                    tracing::warn!("unrecognised annotation record: {}", e);
                    Self::Fields(AnnotationPayload::default())
                }),
        }
    }

    /// 旧形式のレコードに保存されたドキュメント種別
    pub fn document_type(&self) -> Option<&str> {
        match self {
            Self::Tags(_) => None,
            Self::Fields(payload) => payload.document_type.as_deref(),
        }
    }

    /// テキストに対する初期タグ
    ///
    /// 位置付きタグはテキストと一致しないもの（別テキスト由来）を捨てる。
    pub fn into_tags(self, text: &str) -> Vec<Tag> {
        match self {
            Self::Tags(tags) => tags
                .into_iter()
                .filter(|t| t.end > t.start && char_slice(text, t.start, t.end) == Some(t.value.as_str()))
                .collect(),
            Self::Fields(payload) => tags_from_annotations(text, &payload),
        }
    }
}

/// 部分文字列の最初の出現位置（char単位）
pub fn find_char_range(text: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    let byte_start = text.find(needle)?;
    let start = text[..byte_start].chars().count();
    Some((start, start + needle.chars().count()))
}
