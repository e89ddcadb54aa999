use clap::{Parser, Subcommand};
use docdesk_common::{CharRange, TagType};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docdesk")]
#[command(about = "OCR文書のタグ付け・一括アップロードクライアント", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// サーバーURL（設定ファイルより優先）
    #[arg(long, global = true)]
    pub server: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// ドキュメントを1件ずつ順番にアップロード
    Upload {
        /// ファイルまたはフォルダ
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 全ファイル共通のドキュメント種別 (IRA/ULAZNI)
        #[arg(short = 't', long)]
        document_type: Option<String>,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,

        /// 結果レポートをJSONで保存
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// OCRテキストにタグを付ける
    Tag {
        /// ドキュメントID
        #[arg(required = true)]
        document_id: i64,

        /// OCRテキストをファイルから読む（省略時はサーバーから取得）
        #[arg(long)]
        text: Option<PathBuf>,

        /// 範囲指定でタグ追加 (例: oib=5..16)
        #[arg(short, long)]
        add: Vec<TagSpec>,

        /// 最初に一致した文字列にタグ追加 (例: invoice_number=17/2024)
        #[arg(short, long)]
        find: Vec<FindSpec>,

        /// 指定番号のタグを削除
        #[arg(long)]
        remove: Vec<usize>,

        /// 保存済みタグを読み込まない
        #[arg(long)]
        fresh: bool,

        /// サーバーへ保存
        #[arg(long)]
        save: bool,

        /// 保存時に設定するドキュメント種別
        #[arg(long)]
        document_type: Option<String>,

        /// タグをJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 設定を表示/編集
    Config {
        /// サーバーURLを設定
        #[arg(long)]
        set_server: Option<String>,

        /// タイムアウト（秒）を設定
        #[arg(long)]
        set_timeout: Option<u64>,

        /// 既定のドキュメント種別を設定
        #[arg(long)]
        set_document_type: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// `TYPE=START..END`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagSpec {
    pub tag_type: TagType,
    pub range: CharRange,
}

impl std::str::FromStr for TagSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref TAG_SPEC_RE: regex::Regex =
                regex::Regex::new(r"^\s*([A-Za-z_\-]+)\s*=\s*(\d+)\s*\.\.\s*(\d+)\s*$").unwrap();
        }

        let caps = TAG_SPEC_RE
            .captures(s)
            .ok_or_else(|| format!("Invalid tag: {}. Use TYPE=START..END", s))?;
        let tag_type: TagType = caps[1].parse()?;
        let start: usize = caps[2].parse().map_err(|e| format!("{}", e))?;
        let end: usize = caps[3].parse().map_err(|e| format!("{}", e))?;

        Ok(TagSpec {
            tag_type,
            range: CharRange::new(start, end),
        })
    }
}

/// `TYPE=text`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FindSpec {
    pub tag_type: TagType,
    pub needle: String,
}

impl std::str::FromStr for FindSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, needle) = s
            .split_once('=')
            .ok_or_else(|| format!("Invalid search: {}. Use TYPE=text", s))?;
        if needle.is_empty() {
            return Err(format!("Empty search text: {}", s));
        }

        Ok(FindSpec {
            tag_type: kind.parse()?,
            needle: needle.to_string(),
        })
    }
}
