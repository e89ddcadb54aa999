//! タグ付けコマンド

use docdesk_common::annotation::find_char_range;
use docdesk_common::{CharRange, Notifier, OffsetTagger};

use crate::cli::{FindSpec, TagSpec};

/// コマンドラインから指定された編集
#[derive(Debug, Clone, Default)]
pub struct TagEdits {
    pub remove: Vec<usize>,
    pub add: Vec<TagSpec>,
    pub find: Vec<FindSpec>,
}

impl TagEdits {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty() && self.find.is_empty()
    }
}

/// 削除 → 範囲追加 → 検索追加 の順に適用し、追加できた件数を返す
///
/// 削除番号は適用前の一覧に対するもの。
pub fn apply_edits<N: Notifier>(tagger: &mut OffsetTagger<N>, edits: &TagEdits) -> usize {
    let mut remove = edits.remove.clone();
    remove.sort_unstable_by(|a, b| b.cmp(a));
    remove.dedup();
    for index in remove {
        if tagger.remove_tag(index).is_none() {
            tracing::warn!("no tag at index {}", index);
        }
    }

    let mut added = 0;
    for spec in &edits.add {
        if tagger.add_tag(spec.tag_type, Some(spec.range)).is_some() {
            added += 1;
        }
    }

    for spec in &edits.find {
        let range = find_char_range(tagger.text(), &spec.needle).map(|(s, e)| CharRange::new(s, e));
        if range.is_none() {
            tagger
                .notifier()
                .warn(&format!("Tekst \"{}\" nije pronađen u OCR prikazu", spec.needle));
            continue;
        }
        if tagger.add_tag(spec.tag_type, range).is_some() {
            added += 1;
        }
    }

    added
}
