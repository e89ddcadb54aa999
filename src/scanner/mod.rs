//! アップロード対象ファイルの収集

use crate::error::{DocDeskError, Result};
use docdesk_common::UploadItem;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "tif", "tiff"];

fn is_document_extension(ext: &str) -> bool {
    DOCUMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .map(|ext| is_document_extension(&ext.to_string_lossy()))
        .unwrap_or(false)
}

fn to_item(path: &Path) -> Result<UploadItem<PathBuf>> {
    let size = std::fs::metadata(path)?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(UploadItem::new(path.to_path_buf(), name, size))
}

/// フォルダ直下（recursive指定時は配下全て）のドキュメントをファイル名順で取得
pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<UploadItem<PathBuf>>> {
    if !folder.is_dir() {
        return Err(DocDeskError::FileNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut paths: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_document(p))
        .collect();

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    paths.iter().map(|p| to_item(p)).collect()
}

/// コマンドライン引数のパスを展開
///
/// ファイルは指定順、フォルダは中身をファイル名順で並べる。
/// 明示的に指定されたファイルは拡張子に関係なく含める。
pub fn collect_files(inputs: &[PathBuf], recursive: bool) -> Result<Vec<UploadItem<PathBuf>>> {
    let mut items = Vec::new();

    for input in inputs {
        if input.is_dir() {
            items.extend(scan_folder(input, recursive)?);
        } else if input.is_file() {
            items.push(to_item(input)?);
        } else {
            return Err(DocDeskError::FileNotFound(input.display().to_string()));
        }
    }

    Ok(items)
}
