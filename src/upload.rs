//! 一括アップロードコマンド

use std::path::{Path, PathBuf};

use docdesk_common::{BatchEvent, BatchReport, BatchUploadSequencer, Notifier, UploadItem, Uploader};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::error::{DocDeskError, Result};

/// ファイルを順番にアップロードしてレポートを返す
pub async fn run_batch<U, N>(
    items: Vec<UploadItem<PathBuf>>,
    document_type: &str,
    uploader: &U,
    notifier: N,
    show_progress: bool,
) -> Result<BatchReport>
where
    U: Uploader<PathBuf> + ?Sized,
    N: Notifier,
{
    let sequencer = BatchUploadSequencer::with_notifier(items, notifier);

    if show_progress {
        let pb = ProgressBar::new(sequencer.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| DocDeskError::Config(e.to_string()))?
                .progress_chars("=>-"),
        );
        sequencer.on_event(move |event| match event {
            BatchEvent::ItemStarted { index, total, name } => {
                pb.set_message(format!("Obrađujem dokument {} od {}: {}", index + 1, total, name));
            }
            BatchEvent::ItemFinished { .. } => pb.inc(1),
            BatchEvent::Completed { .. } => pb.finish_and_clear(),
        });
    }

    sequencer
        .start(document_type, uploader)
        .await
        .map_err(|rejected| DocDeskError::InvalidArgument(rejected.to_string()))
}

#[derive(Serialize)]
struct SavedReport<'a> {
    generated_at: String,
    document_type: &'a str,
    #[serde(flatten)]
    report: &'a BatchReport,
}

/// レポートを作成日時・種別付きのJSONで保存
pub fn save_report(report: &BatchReport, document_type: &str, path: &Path) -> Result<()> {
    let saved = SavedReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        document_type,
        report,
    };
    let json = serde_json::to_string_pretty(&saved)?;
    std::fs::write(path, json)?;
    Ok(())
}
