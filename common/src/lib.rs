//! docdesk Common Library
//!
//! CLIとWeb(WASM)で共有される型とクライアント側ロジック

pub mod types;
pub mod error;
pub mod notify;
pub mod tagger;
pub mod annotation;
pub mod batch;

pub use types::{
    CharRange, ProcessedDocument, Tag, TagType, UploadItem, UploadResponse, UploadResult,
    UploadStatus,
};
pub use error::{Error, Result};
pub use notify::{CollectingNotifier, NoticeLevel, Notifier, TracingNotifier};
pub use tagger::{
    compute_selection_range, render_highlighted, Highlights, OffsetTagger, Segment,
    SelectionPoint, SelectionSurface, TextSelection,
};
pub use annotation::{
    annotation_document_type, fields_for_type, tags_from_annotations, AnnotationPayload,
    StoredAnnotations, ANNOTATION_DOCUMENT_TYPES,
};
pub use batch::{
    BatchEvent, BatchRejected, BatchReport, BatchState, BatchUploadSequencer, Progress, Uploader,
};

/// 一括アップロードで選べるドキュメント種別
pub const DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("IRA", "Izlazni račun (IRA)"),
    ("ULAZNI", "Ulazni dokumenti (automatsko prepoznavanje)"),
];
