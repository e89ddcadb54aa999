//! 端末出力
//!
//! ハイライト表示・タグ一覧・アップロードレポート・通知

use console::{style, Color};
use docdesk_common::{BatchReport, NoticeLevel, Notifier, Segment, Tag, TagType};

use crate::config::Config;

/// 標準エラーへ出す通知
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        let line = match level {
            NoticeLevel::Info => style(message.to_string()),
            NoticeLevel::Success => style(message.to_string()).green(),
            NoticeLevel::Warning => style(message.to_string()).yellow(),
            NoticeLevel::Error => style(message.to_string()).red().bold(),
        };
        eprintln!("{}", line);
    }
}

fn tag_color(tag_type: TagType) -> Color {
    match tag_type {
        TagType::Oib => Color::Cyan,
        TagType::InvoiceNumber => Color::Magenta,
        TagType::DateInvoice => Color::Yellow,
        TagType::AmountTotal => Color::Green,
        TagType::SupplierName => Color::Blue,
    }
}

/// タグ部分を `[...]` で囲み、種別ごとに色付けする
pub fn render_segments<'a>(segments: impl Iterator<Item = Segment<'a>>, colors: bool) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment.tag_type {
            Some(tag_type) => {
                let styled = style(format!("[{}]", segment.text))
                    .fg(tag_color(tag_type))
                    .bold()
                    .force_styling(colors);
                out.push_str(&styled.to_string());
            }
            None => out.push_str(segment.text),
        }
    }
    out
}

pub fn format_tag_list(tags: &[Tag]) -> Vec<String> {
    tags.iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                "  {:>2}. {:<15} {:>5}..{:<5} {}",
                i,
                t.tag_type.as_str(),
                t.start,
                t.end,
                t.value
            )
        })
        .collect()
}

pub fn format_report(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![
        "Izvještaj uploada:".to_string(),
        format!("  Ukupno dokumenata: {}", report.total()),
        "  Duplikati preskočeni:".to_string(),
    ];

    if report.duplicates.is_empty() {
        lines.push("    Nema duplikata".to_string());
    } else {
        lines.extend(report.duplicates.iter().map(|d| format!("    - {}", d)));
    }

    let failed: Vec<String> = report
        .failed()
        .map(|r| format!("    - {}: {}", r.filename, r.error_message()))
        .collect();
    if !failed.is_empty() {
        lines.push(format!("  Greške: {}", failed.len()));
        lines.extend(failed);
    }

    lines
}

/// 保存済みの設定。環境変数などで上書きされた値は別行で示す
pub fn format_config(stored: &Config, effective: &Config) -> Vec<String> {
    let mut lines = vec![
        "Postavke:".to_string(),
        format!("  Poslužitelj: {}", stored.server_url),
    ];
    if effective.server_url != stored.server_url {
        lines.push(format!("  (za ovo pokretanje: {})", effective.server_url));
    }
    lines.push(format!("  Vremensko ograničenje: {} s", stored.timeout_seconds));
    lines.push(format!(
        "  Zadana vrsta dokumenta: {}",
        stored.default_document_type.as_deref().unwrap_or("nije postavljeno")
    ));
    lines
}
