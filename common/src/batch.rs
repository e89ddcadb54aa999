//! 一括アップロード
//!
//! 固定されたファイル一覧を1件ずつ順番にアップロードする。
//! 状態遷移は `Idle -> Running -> Completed` のみ（キャンセルなし）。
//!
//! - 各アップロードの完了を待ってから次を開始する（並列実行しない）
//! - 1件の失敗は結果に記録して続行する
//! - 実行中の一覧変更（remove_file）は無視する
//!
//! 状態はRefCellで保持し、await中に借用を持ち越さない。
//! UIのイベントハンドラが実行中に呼ばれても安全に拒否できる。

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::notify::{Notifier, TracingNotifier};
use crate::types::{UploadItem, UploadResponse, UploadResult, UploadStatus};

/// 1ファイルをアップロードする外部処理
#[async_trait(?Send)]
pub trait Uploader<F> {
    async fn upload_one(&self, item: &UploadItem<F>, shared_tag: &str) -> Result<UploadResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
}

/// 進捗（"k / n"、kは1始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Obrađujem dokument {} od {}...", self.current, self.total)
    }
}

/// 開始条件を満たさない
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchRejected {
    #[error("Lista dokumenata je prazna")]
    EmptyFileList,

    #[error("Odaberite vrstu dokumenta")]
    MissingDocumentType,

    #[error("Upload je već pokrenut")]
    NotIdle,
}

/// 最終レポート
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<UploadResult>,
    pub duplicates: Vec<String>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> impl Iterator<Item = &UploadResult> {
        self.results.iter().filter(|r| r.response.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.failed().count()
    }
}

/// 進捗イベント
#[derive(Debug)]
pub enum BatchEvent<'a> {
    ItemStarted {
        index: usize,
        total: usize,
        name: &'a str,
    },
    ItemFinished {
        index: usize,
        total: usize,
        result: &'a UploadResult,
    },
    Completed {
        report: &'a BatchReport,
    },
}

type Listener = Box<dyn Fn(&BatchEvent<'_>)>;

struct Inner<F> {
    files: Vec<Rc<UploadItem<F>>>,
    state: BatchState,
    current_index: Option<usize>,
    results: Vec<UploadResult>,
    duplicates: Vec<String>,
}

pub struct BatchUploadSequencer<F, N = TracingNotifier> {
    inner: RefCell<Inner<F>>,
    listeners: RefCell<Vec<Listener>>,
    notifier: N,
}

impl<F> BatchUploadSequencer<F, TracingNotifier> {
    pub fn new(files: Vec<UploadItem<F>>) -> Self {
        Self::with_notifier(files, TracingNotifier)
    }
}

impl<F, N: Notifier> BatchUploadSequencer<F, N> {
    pub fn with_notifier(files: Vec<UploadItem<F>>, notifier: N) -> Self {
        Self {
            inner: RefCell::new(Inner {
                files: files.into_iter().map(Rc::new).collect(),
                state: BatchState::Idle,
                current_index: None,
                results: Vec::new(),
                duplicates: Vec::new(),
            }),
            listeners: RefCell::new(Vec::new()),
            notifier,
        }
    }

    /// 進捗リスナーを登録（リスナー内から登録しないこと）
    pub fn on_event(&self, listener: impl Fn(&BatchEvent<'_>) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    pub fn state(&self) -> BatchState {
        self.inner.borrow().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == BatchState::Running
    }

    /// 処理中のファイル番号。処理中でなければ `None`
    pub fn current_index(&self) -> Option<usize> {
        self.inner.borrow().current_index
    }

    pub fn progress(&self) -> Option<Progress> {
        let inner = self.inner.borrow();
        if inner.state != BatchState::Running {
            return None;
        }
        inner.current_index.map(|i| Progress {
            current: i + 1,
            total: inner.files.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn file_labels(&self) -> Vec<String> {
        self.inner
            .borrow()
            .files
            .iter()
            .map(|f| f.display_label())
            .collect()
    }

    pub fn results(&self) -> Vec<UploadResult> {
        self.inner.borrow().results.clone()
    }

    pub fn duplicates(&self) -> Vec<String> {
        self.inner.borrow().duplicates.clone()
    }

    /// 待機中のみ一覧から外す
    pub fn remove_file(&self, index: usize) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.state != BatchState::Idle {
            tracing::debug!("remove_file({}) ignored while {:?}", index, inner.state);
            return false;
        }
        if index >= inner.files.len() {
            return false;
        }
        let removed = inner.files.remove(index);
        tracing::debug!("removed {} from batch", removed.name);
        true
    }

    /// 一括アップロードを実行
    ///
    /// ファイルなし・種別未選択・実行済みの場合は警告して何もしない。
    pub async fn start<U>(&self, shared_tag: &str, uploader: &U) -> std::result::Result<BatchReport, BatchRejected>
    where
        U: Uploader<F> + ?Sized,
    {
        let total = match self.begin(shared_tag) {
            Ok(total) => total,
            Err(rejected) => {
                self.notifier.warn(&rejected.to_string());
                return Err(rejected);
            }
        };
        tracing::info!("batch upload started: {} files, type {}", total, shared_tag);

        for index in 0..total {
            let item = {
                let mut inner = self.inner.borrow_mut();
                inner.current_index = Some(index);
                Rc::clone(&inner.files[index])
            };
            self.emit(&BatchEvent::ItemStarted {
                index,
                total,
                name: &item.name,
            });

            let response = match uploader.upload_one(&item, shared_tag).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("upload of {} failed: {}", item.name, e);
                    UploadResponse::failed(e.to_string())
                }
            };

            let duplicates: Vec<String> = response
                .processed
                .iter()
                .filter(|doc| doc.status == UploadStatus::Duplicate)
                .map(|doc| {
                    if doc.filename.is_empty() {
                        item.name.clone()
                    } else {
                        doc.filename.clone()
                    }
                })
                .collect();

            for doc in &response.processed {
                if let Some(alert) = doc.validation_alert.as_deref() {
                    let name = doc
                        .original_filename
                        .as_deref()
                        .filter(|n| !n.is_empty())
                        .unwrap_or(if doc.filename.is_empty() { item.name.as_str() } else { doc.filename.as_str() });
                    self.notifier
                        .warn(&format!("Upozorenje za dokument {}: {}", name, alert));
                }
            }

            let result = UploadResult {
                filename: item.name.clone(),
                response,
            };
            {
                let mut inner = self.inner.borrow_mut();
                inner.duplicates.extend(duplicates);
                inner.results.push(result.clone());
            }
            self.emit(&BatchEvent::ItemFinished {
                index,
                total,
                result: &result,
            });
        }

        let report = {
            let mut inner = self.inner.borrow_mut();
            inner.state = BatchState::Completed;
            inner.current_index = None;
            BatchReport {
                results: inner.results.clone(),
                duplicates: inner.duplicates.clone(),
            }
        };
        tracing::info!(
            "batch upload finished: {} files, {} duplicates, {} errors",
            report.total(),
            report.duplicates.len(),
            report.error_count()
        );
        self.emit(&BatchEvent::Completed { report: &report });
        match report.error_count() {
            0 => self.notifier.success("✅ Upload uspješno završen!"),
            errors => self.notifier.error(&format!(
                "Upload završen s greškama: {} od {} dokumenata nije učitano",
                errors,
                report.total()
            )),
        }

        Ok(report)
    }

    fn begin(&self, shared_tag: &str) -> std::result::Result<usize, BatchRejected> {
        let mut inner = self.inner.borrow_mut();
        if inner.state != BatchState::Idle {
            return Err(BatchRejected::NotIdle);
        }
        if inner.files.is_empty() {
            return Err(BatchRejected::EmptyFileList);
        }
        if shared_tag.trim().is_empty() {
            return Err(BatchRejected::MissingDocumentType);
        }

        inner.state = BatchState::Running;
        inner.current_index = Some(0);
        inner.results.clear();
        inner.duplicates.clear();
        Ok(inner.files.len())
    }

    fn emit(&self, event: &BatchEvent<'_>) {
        for listener in self.listeners.borrow().iter() {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::notify::{CollectingNotifier, NoticeLevel};
    use crate::types::ProcessedDocument;
    use std::cell::Cell;

    fn items(names: &[&str]) -> Vec<UploadItem<String>> {
        names
            .iter()
            .map(|n| UploadItem::new(n.to_string(), *n, 1024))
            .collect()
    }

    /// 呼び出し順を記録するスタブ
    struct ScriptedUploader {
        log: RefCell<Vec<String>>,
        in_flight: Cell<bool>,
    }

    impl ScriptedUploader {
        fn new() -> Self {
            Self {
                log: RefCell::new(Vec::new()),
                in_flight: Cell::new(false),
            }
        }
    }

    #[async_trait(?Send)]
    impl Uploader<String> for ScriptedUploader {
        async fn upload_one(&self, item: &UploadItem<String>, shared_tag: &str) -> Result<UploadResponse> {
            assert!(!self.in_flight.get(), "uploads overlapped");
            self.in_flight.set(true);
            self.log.borrow_mut().push(format!("start {} {}", item.name, shared_tag));

            tokio::task::yield_now().await;

            self.log.borrow_mut().push(format!("end {}", item.name));
            self.in_flight.set(false);

            match item.name.as_str() {
                "a.pdf" => Ok(UploadResponse::processed(vec![ProcessedDocument::new("a.pdf", UploadStatus::Ok)])),
                "b.pdf" => Ok(UploadResponse::processed(vec![ProcessedDocument::new(
                    "b.pdf",
                    UploadStatus::Duplicate,
                )])),
                "c.pdf" => Ok(UploadResponse::failed("timeout")),
                _ => Err(Error::Upload("timeout".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_three_files_sequential() {
        let sequencer = BatchUploadSequencer::new(items(&["a.pdf", "b.pdf", "c.pdf"]));
        let uploader = ScriptedUploader::new();

        let report = sequencer.start("URA", &uploader).await.unwrap();

        assert_eq!(report.results.len(), 3);
        assert_eq!(report.duplicates, vec!["b.pdf".to_string()]);
        assert_eq!(report.results[2].response.error.as_deref(), Some("timeout"));
        assert_eq!(report.error_count(), 1);
        assert_eq!(sequencer.current_index(), None);
        assert_eq!(sequencer.state(), BatchState::Completed);
        assert_eq!(
            *uploader.log.borrow(),
            vec![
                "start a.pdf URA",
                "end a.pdf",
                "start b.pdf URA",
                "end b.pdf",
                "start c.pdf URA",
                "end c.pdf",
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_error_recorded_and_batch_continues() {
        let sequencer = BatchUploadSequencer::new(items(&["x.pdf", "a.pdf"]));
        let report = sequencer.start("URA", &ScriptedUploader::new()).await.unwrap();

        assert_eq!(report.results[0].response.error.as_deref(), Some("Upload error: timeout"));
        assert!(!report.results[1].response.is_error());
        assert_eq!(report.error_count(), 1);
    }

    #[tokio::test]
    async fn test_success_notice_only_without_errors() {
        let notifier = CollectingNotifier::new();
        let clean = BatchUploadSequencer::with_notifier(items(&["a.pdf", "b.pdf"]), &notifier);
        clean.start("URA", &ScriptedUploader::new()).await.unwrap();
        assert_eq!(notifier.count(NoticeLevel::Success), 1);
        assert_eq!(notifier.count(NoticeLevel::Error), 0);

        let notifier = CollectingNotifier::new();
        let failing = BatchUploadSequencer::with_notifier(items(&["x.pdf"]), &notifier);
        let report = failing.start("URA", &ScriptedUploader::new()).await.unwrap();

        assert_eq!(report.error_count(), 1);
        assert_eq!(notifier.count(NoticeLevel::Success), 0);
        assert_eq!(
            notifier.messages(NoticeLevel::Error),
            vec!["Upload završen s greškama: 1 od 1 dokumenata nije učitano".to_string()]
        );
    }

    #[tokio::test]
    async fn test_validation_alert_notified() {
        struct AlertingUploader;

        #[async_trait(?Send)]
        impl Uploader<String> for AlertingUploader {
            async fn upload_one(&self, item: &UploadItem<String>, _tag: &str) -> Result<UploadResponse> {
                let mut doc = ProcessedDocument::new(item.name.clone(), UploadStatus::Ok);
                if item.name == "bez-oiba.pdf" {
                    doc.original_filename = Some("Bez OIB-a.pdf".to_string());
                    doc.validation_alert =
                        Some("❌ OIB nije pronađen – potrebna ručna validacija dokumenta.".to_string());
                }
                Ok(UploadResponse::processed(vec![doc]))
            }
        }

        let notifier = CollectingNotifier::new();
        let sequencer = BatchUploadSequencer::with_notifier(items(&["a.pdf", "bez-oiba.pdf"]), &notifier);
        let report = sequencer.start("ULAZNI", &AlertingUploader).await.unwrap();

        assert_eq!(report.error_count(), 0);
        assert_eq!(
            notifier.messages(NoticeLevel::Warning),
            vec!["Upozorenje za dokument Bez OIB-a.pdf: ❌ OIB nije pronađen – potrebna ručna validacija dokumenta."
                .to_string()]
        );
        assert_eq!(notifier.count(NoticeLevel::Success), 1);
    }

    #[tokio::test]
    async fn test_results_in_submission_order() {
        let sequencer = BatchUploadSequencer::new(items(&["c.pdf", "a.pdf"]));
        let report = sequencer.start("ULAZNI", &ScriptedUploader::new()).await.unwrap();

        let names: Vec<&str> = report.results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["c.pdf", "a.pdf"]);
        assert_eq!(sequencer.results(), report.results);
    }

    #[tokio::test]
    async fn test_rejects_empty_list_and_blank_tag() {
        let notifier = CollectingNotifier::new();
        let uploader = ScriptedUploader::new();

        let empty = BatchUploadSequencer::with_notifier(items(&[]), &notifier);
        assert_eq!(empty.start("URA", &uploader).await, Err(BatchRejected::EmptyFileList));
        assert_eq!(empty.state(), BatchState::Idle);

        let untagged = BatchUploadSequencer::with_notifier(items(&["a.pdf"]), &notifier);
        assert_eq!(untagged.start("", &uploader).await, Err(BatchRejected::MissingDocumentType));
        assert_eq!(untagged.start("   ", &uploader).await, Err(BatchRejected::MissingDocumentType));
        assert_eq!(untagged.state(), BatchState::Idle);

        assert!(uploader.log.borrow().is_empty());
        assert_eq!(notifier.count(NoticeLevel::Warning), 3);
    }

    #[tokio::test]
    async fn test_second_start_rejected() {
        let sequencer = BatchUploadSequencer::new(items(&["a.pdf"]));
        let uploader = ScriptedUploader::new();

        sequencer.start("URA", &uploader).await.unwrap();
        assert_eq!(sequencer.start("URA", &uploader).await, Err(BatchRejected::NotIdle));
        assert_eq!(uploader.log.borrow().len(), 2);
    }

    #[test]
    fn test_remove_file_while_idle() {
        let sequencer = BatchUploadSequencer::new(items(&["a.pdf", "b.pdf"]));

        assert!(!sequencer.remove_file(7));
        assert!(sequencer.remove_file(0));
        assert_eq!(sequencer.file_labels(), vec!["b.pdf (1.00 KB)".to_string()]);
    }

    /// アップロード中に一覧を操作しようとするスタブ
    struct MeddlingUploader {
        sequencer: RefCell<Option<Rc<BatchUploadSequencer<String>>>>,
        calls: Cell<usize>,
        progress: RefCell<Vec<Option<Progress>>>,
    }

    #[async_trait(?Send)]
    impl Uploader<String> for MeddlingUploader {
        async fn upload_one(&self, _item: &UploadItem<String>, _shared_tag: &str) -> Result<UploadResponse> {
            self.calls.set(self.calls.get() + 1);
            if let Some(sequencer) = self.sequencer.borrow().as_ref() {
                assert!(!sequencer.remove_file(0));
                self.progress.borrow_mut().push(sequencer.progress());
            }
            Ok(UploadResponse::default())
        }
    }

    #[tokio::test]
    async fn test_remove_file_ignored_while_running() {
        let sequencer = Rc::new(BatchUploadSequencer::new(items(&["a.pdf", "b.pdf", "c.pdf"])));
        let uploader = MeddlingUploader {
            sequencer: RefCell::new(Some(Rc::clone(&sequencer))),
            calls: Cell::new(0),
            progress: RefCell::new(Vec::new()),
        };

        let report = sequencer.start("URA", &uploader).await.unwrap();

        assert_eq!(uploader.calls.get(), 3);
        assert_eq!(report.total(), 3);
        assert_eq!(sequencer.len(), 3);
        assert_eq!(
            *uploader.progress.borrow(),
            vec![
                Some(Progress { current: 1, total: 3 }),
                Some(Progress { current: 2, total: 3 }),
                Some(Progress { current: 3, total: 3 }),
            ]
        );
        assert_eq!(sequencer.progress(), None);

        // 完了後も変更不可
        assert!(!sequencer.remove_file(0));
        uploader.sequencer.borrow_mut().take();
    }

    #[tokio::test]
    async fn test_events_emitted_in_order() {
        let sequencer = BatchUploadSequencer::new(items(&["a.pdf", "b.pdf"]));
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        sequencer.on_event(move |event| {
            let line = match event {
                BatchEvent::ItemStarted { index, total, name } => format!("started {}/{} {}", index + 1, total, name),
                BatchEvent::ItemFinished { result, .. } => format!("finished {}", result.filename),
                BatchEvent::Completed { report } => format!("completed {}", report.total()),
            };
            sink.borrow_mut().push(line);
        });

        sequencer.start("IRA", &ScriptedUploader::new()).await.unwrap();

        assert_eq!(
            *events.borrow(),
            vec![
                "started 1/2 a.pdf",
                "finished a.pdf",
                "started 2/2 b.pdf",
                "finished b.pdf",
                "completed 2",
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_without_filename_uses_item_name() {
        struct NamelessDuplicate;

        #[async_trait(?Send)]
        impl Uploader<String> for NamelessDuplicate {
            async fn upload_one(&self, _item: &UploadItem<String>, _tag: &str) -> Result<UploadResponse> {
                Ok(UploadResponse::processed(vec![ProcessedDocument::new("", UploadStatus::Duplicate)]))
            }
        }

        let sequencer = BatchUploadSequencer::new(items(&["scan.pdf"]));
        let report = sequencer.start("URA", &NamelessDuplicate).await.unwrap();
        assert_eq!(report.duplicates, vec!["scan.pdf".to_string()]);
    }

    #[test]
    fn test_progress_display() {
        let progress = Progress { current: 2, total: 5 };
        assert_eq!(progress.to_string(), "Obrađujem dokument 2 od 5...");
        assert!((progress.ratio() - 0.4).abs() < f32::EPSILON);
    }
}
