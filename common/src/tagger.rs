//! OCRテキストのタグ付け
//!
//! 読み取り専用テキスト上の選択範囲を文字オフセット `[start, end)` に変換し、
//! ラベル付き範囲（Tag）を保持してハイライト表示用のセグメント列を生成する。
//!
//! 座標系はルート要素内の全テキストセグメントを連結した文字列（マークアップを含まない）。
//! 選択位置は (セグメント番号, セグメント内オフセット) で与えられ、
//! 先行する全セグメントの文字数を足し込んで絶対オフセットを求める。

use crate::notify::{Notifier, TracingNotifier};
use crate::types::{CharRange, Tag, TagType};

const SELECT_TEXT_WARNING: &str = "❗ Selektirajte tekst u OCR prikazu!";

/// 選択の端点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPoint {
    /// テキストセグメント番号（文書順）
    pub segment: usize,
    /// セグメント内の文字オフセット
    pub offset: usize,
}

impl SelectionPoint {
    pub fn new(segment: usize, offset: usize) -> Self {
        Self { segment, offset }
    }
}

/// UI上の選択（anchorがfocusより後ろでもよい）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSelection {
    pub anchor: SelectionPoint,
    pub focus: SelectionPoint,
}

impl TextSelection {
    pub fn new(anchor: SelectionPoint, focus: SelectionPoint) -> Self {
        Self { anchor, focus }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// 選択を提供する描画面（DOM、端末など）
pub trait SelectionSurface {
    /// ルート内のテキストセグメント（文書順）
    fn text_segments(&self) -> Vec<String>;

    /// 現在の選択。ルート外の選択は範囲外の端点として返してよい
    fn selection(&self) -> Option<TextSelection>;

    fn clear_selection(&mut self);
}

/// 選択範囲を文字オフセットに変換
///
/// 選択なし・空選択・ルート外の端点では `None`。
pub fn compute_selection_range<S: AsRef<str>>(
    segments: &[S],
    selection: Option<&TextSelection>,
) -> Option<CharRange> {
    let selection = selection?;
    let anchor = absolute_offset(segments, selection.anchor)?;
    let focus = absolute_offset(segments, selection.focus)?;

    let (start, end) = if anchor <= focus {
        (anchor, focus)
    } else {
        (focus, anchor)
    };

    if end <= start {
        return None;
    }

    Some(CharRange::new(start, end))
}

fn absolute_offset<S: AsRef<str>>(segments: &[S], point: SelectionPoint) -> Option<usize> {
    let target = segments.get(point.segment)?;
    if point.offset > target.as_ref().chars().count() {
        return None;
    }

    let preceding: usize = segments[..point.segment]
        .iter()
        .map(|s| s.as_ref().chars().count())
        .sum();

    Some(preceding + point.offset)
}

/// 文字オフセットでスライス
pub fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if end < start {
        return None;
    }

    let mut boundaries = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));

    let begin = boundaries.nth(start)?;
    let finish = if end == start {
        begin
    } else {
        boundaries.nth(end - start - 1)?
    };

    Some(&text[begin..finish])
}

/// ハイライト表示の1区間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub tag_type: Option<TagType>,
}

impl<'a> Segment<'a> {
    pub fn is_tag(&self) -> bool {
        self.tag_type.is_some()
    }
}

/// ハイライトセグメント列
///
/// 遅延評価のイテレータ。タグが変わったら作り直す。
#[derive(Debug, Clone)]
pub struct Highlights<'a> {
    text: &'a str,
    char_len: usize,
    tags: Vec<&'a Tag>,
    next_tag: usize,
    cursor: usize,
    pending: Option<Segment<'a>>,
}

impl<'a> Iterator for Highlights<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(segment) = self.pending.take() {
            return Some(segment);
        }

        while let Some(tag) = self.tags.get(self.next_tag).copied() {
            self.next_tag += 1;

            // 重なったタグは未処理部分だけを描画する（重なりの見た目は未定義）
            let start = tag.start.max(self.cursor).min(self.char_len);
            let end = tag.end.min(self.char_len);
            if end <= start {
                continue;
            }

            let tagged = Segment {
                text: char_slice(self.text, start, end).unwrap_or_default(),
                tag_type: Some(tag.tag_type),
            };
            let gap_start = self.cursor;
            self.cursor = end;

            if start > gap_start {
                self.pending = Some(tagged);
                return Some(Segment {
                    text: char_slice(self.text, gap_start, start).unwrap_or_default(),
                    tag_type: None,
                });
            }
            return Some(tagged);
        }

        if self.cursor < self.char_len {
            let rest = char_slice(self.text, self.cursor, self.char_len).unwrap_or_default();
            self.cursor = self.char_len;
            return Some(Segment {
                text: rest,
                tag_type: None,
            });
        }

        None
    }
}

/// テキストをタグ位置で区切る
///
/// タグは `start` 昇順（同値は元の順序）で並べ替える。
pub fn render_highlighted<'a>(text: &'a str, tags: &'a [Tag]) -> Highlights<'a> {
    let mut sorted: Vec<&Tag> = tags.iter().collect();
    sorted.sort_by_key(|t| t.start);

    Highlights {
        text,
        char_len: text.chars().count(),
        tags: sorted,
        next_tag: 0,
        cursor: 0,
        pending: None,
    }
}

/// タグ付け状態
pub struct OffsetTagger<N = TracingNotifier> {
    text: String,
    tags: Vec<Tag>,
    notifier: N,
}

impl OffsetTagger<TracingNotifier> {
    pub fn with_text(text: impl Into<String>, initial_tags: Vec<Tag>) -> Self {
        Self::new(text, initial_tags, TracingNotifier)
    }
}

impl<N: Notifier> OffsetTagger<N> {
    pub fn new(text: impl Into<String>, initial_tags: Vec<Tag>, notifier: N) -> Self {
        Self {
            text: text.into(),
            tags: initial_tags,
            notifier,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// タグなし（保存ボタン無効）
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// 別ドキュメントへ切り替え（テキストとタグを丸ごと置換）
    pub fn reset(&mut self, text: impl Into<String>, initial_tags: Vec<Tag>) {
        self.text = text.into();
        self.tags = initial_tags;
        tracing::debug!("tagger reset: {} initial tags", self.tags.len());
    }

    /// タグを追加
    ///
    /// 範囲なし・空範囲・テキスト外の範囲は警告して何もしない。
    pub fn add_tag(&mut self, tag_type: TagType, range: Option<CharRange>) -> Option<&Tag> {
        let Some(range) = range.filter(|r| !r.is_empty()) else {
            self.notifier.warn(SELECT_TEXT_WARNING);
            return None;
        };

        let Some(value) = char_slice(&self.text, range.start, range.end) else {
            tracing::debug!("range {}..{} is outside the text", range.start, range.end);
            self.notifier.warn(SELECT_TEXT_WARNING);
            return None;
        };

        let tag = Tag {
            tag_type,
            start: range.start,
            end: range.end,
            value: value.to_string(),
        };
        tracing::debug!("tag added: {} {}..{} {:?}", tag.tag_type, tag.start, tag.end, tag.value);
        self.tags.push(tag);
        self.tags.last()
    }

    /// 現在の選択にタグを付け、成功したら選択を解除する
    pub fn tag_selection<S>(&mut self, tag_type: TagType, surface: &mut S) -> Option<&Tag>
    where
        S: SelectionSurface + ?Sized,
    {
        let segments = surface.text_segments();
        let selection = surface.selection();
        let range = compute_selection_range(&segments, selection.as_ref());

        if self.add_tag(tag_type, range).is_none() {
            return None;
        }

        surface.clear_selection();
        self.tags.last()
    }

    /// 範囲外は何もしない
    pub fn remove_tag(&mut self, index: usize) -> Option<Tag> {
        if index >= self.tags.len() {
            return None;
        }
        Some(self.tags.remove(index))
    }

    /// 指定種別以外のタグを外し、外した件数を返す
    pub fn retain_types(&mut self, allowed: &[TagType]) -> usize {
        let before = self.tags.len();
        self.tags.retain(|t| allowed.contains(&t.tag_type));
        before - self.tags.len()
    }

    pub fn highlights(&self) -> Highlights<'_> {
        render_highlighted(&self.text, &self.tags)
    }

    /// 保存処理へタグを渡す。タグがなければ呼ばない
    pub fn save<F, T>(&self, on_save: F) -> Option<T>
    where
        F: FnOnce(&[Tag]) -> T,
    {
        if self.is_empty() {
            return None;
        }
        Some(on_save(&self.tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{CollectingNotifier, NoticeLevel};

    fn tag(tag_type: TagType, text: &str, start: usize, end: usize) -> Tag {
        Tag {
            tag_type,
            start,
            end,
            value: char_slice(text, start, end).unwrap().to_string(),
        }
    }

    fn collect(text: &str, tags: &[Tag]) -> Vec<(String, Option<TagType>)> {
        render_highlighted(text, tags)
            .map(|s| (s.text.to_string(), s.tag_type))
            .collect()
    }

    struct FakeSurface {
        segments: Vec<String>,
        selection: Option<TextSelection>,
    }

    impl SelectionSurface for FakeSurface {
        fn text_segments(&self) -> Vec<String> {
            self.segments.clone()
        }

        fn selection(&self) -> Option<TextSelection> {
            self.selection
        }

        fn clear_selection(&mut self) {
            self.selection = None;
        }
    }

    // =============================================
    // compute_selection_range
    // =============================================

    #[test]
    fn test_selection_across_segments() {
        let segments = ["abc", "def", "ghij"];
        let selection = TextSelection::new(SelectionPoint::new(1, 1), SelectionPoint::new(2, 2));

        let range = compute_selection_range(&segments, Some(&selection)).unwrap();
        assert_eq!(range, CharRange::new(4, 8));
        assert_eq!(char_slice("abcdefghij", range.start, range.end), Some("efgh"));
    }

    #[test]
    fn test_selection_backwards() {
        let segments = ["abc", "def"];
        let selection = TextSelection::new(SelectionPoint::new(1, 2), SelectionPoint::new(0, 1));

        let range = compute_selection_range(&segments, Some(&selection)).unwrap();
        assert_eq!(range, CharRange::new(1, 5));
    }

    #[test]
    fn test_selection_none_or_collapsed() {
        let segments = ["abc"];
        assert_eq!(compute_selection_range(&segments, None), None);

        let collapsed = TextSelection::new(SelectionPoint::new(0, 2), SelectionPoint::new(0, 2));
        assert!(collapsed.is_collapsed());
        assert_eq!(compute_selection_range(&segments, Some(&collapsed)), None);
    }

    #[test]
    fn test_selection_outside_root() {
        let segments = ["abc", "def"];

        let foreign_segment = TextSelection::new(SelectionPoint::new(5, 0), SelectionPoint::new(0, 1));
        assert_eq!(compute_selection_range(&segments, Some(&foreign_segment)), None);

        let past_end = TextSelection::new(SelectionPoint::new(0, 1), SelectionPoint::new(1, 4));
        assert_eq!(compute_selection_range(&segments, Some(&past_end)), None);
    }

    #[test]
    fn test_selection_multibyte_chars() {
        let segments = ["Račun ", "br. ", "čćž"];
        let selection = TextSelection::new(SelectionPoint::new(0, 1), SelectionPoint::new(2, 2));
        let text: String = segments.concat();

        let range = compute_selection_range(&segments, Some(&selection)).unwrap();
        assert_eq!(char_slice(&text, range.start, range.end), Some("ačun br. čć"));
    }

    /// 全ての非空選択で 0 <= start < end <= len かつスライスが選択文字列に一致
    #[test]
    fn test_selection_property_all_points() {
        let segments = ["ab", "", "cde", "f"];
        let text: String = segments.concat();
        let len = text.chars().count();

        let points: Vec<(SelectionPoint, usize)> = segments
            .iter()
            .enumerate()
            .flat_map(|(i, s)| {
                let before: usize = segments[..i].iter().map(|s| s.chars().count()).sum();
                (0..=s.chars().count()).map(move |o| (SelectionPoint::new(i, o), before + o))
            })
            .collect();

        for &(anchor, a) in &points {
            for &(focus, f) in &points {
                let selection = TextSelection::new(anchor, focus);
                let range = compute_selection_range(&segments, Some(&selection));
                if a == f {
                    assert_eq!(range, None);
                    continue;
                }
                let range = range.expect("non-empty selection");
                assert!(range.start < range.end && range.end <= len);
                let expected: String = text.chars().skip(a.min(f)).take(a.abs_diff(f)).collect();
                assert_eq!(char_slice(&text, range.start, range.end), Some(expected.as_str()));
            }
        }
    }

    // =============================================
    // render_highlighted
    // =============================================

    #[test]
    fn test_render_two_tags() {
        let text = "abcdefghij";
        let tags = vec![
            tag(TagType::Oib, text, 0, 3),
            tag(TagType::AmountTotal, text, 5, 8),
        ];

        let segments = collect(text, &tags);
        assert_eq!(
            segments,
            vec![
                ("abc".to_string(), Some(TagType::Oib)),
                ("de".to_string(), None),
                ("fgh".to_string(), Some(TagType::AmountTotal)),
                ("ij".to_string(), None),
            ]
        );

        let joined: String = segments.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_render_sorts_by_start() {
        let text = "abcdefghij";
        let tags = vec![
            tag(TagType::AmountTotal, text, 5, 8),
            tag(TagType::Oib, text, 1, 3),
        ];

        let segments = collect(text, &tags);
        assert_eq!(segments[0], ("a".to_string(), None));
        assert_eq!(segments[1], ("bc".to_string(), Some(TagType::Oib)));
        assert_eq!(segments[3], ("fgh".to_string(), Some(TagType::AmountTotal)));
    }

    #[test]
    fn test_render_no_tags_and_empty_text() {
        assert_eq!(collect("abc", &[]), vec![("abc".to_string(), None)]);
        assert!(collect("", &[]).is_empty());
    }

    #[test]
    fn test_render_tag_to_end() {
        let text = "abc";
        let tags = vec![tag(TagType::Oib, text, 1, 3)];
        assert_eq!(
            collect(text, &tags),
            vec![("a".to_string(), None), ("bc".to_string(), Some(TagType::Oib))]
        );
    }

    #[test]
    fn test_render_overlap_never_repeats_text() {
        let text = "abcdefghij";
        let tags = vec![
            tag(TagType::Oib, text, 0, 5),
            tag(TagType::InvoiceNumber, text, 3, 7),
            tag(TagType::DateInvoice, text, 1, 2),
        ];

        let joined: String = render_highlighted(text, &tags).map(|s| s.text).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_render_is_restartable() {
        let text = "abcdefghij";
        let tags = vec![tag(TagType::Oib, text, 2, 4)];
        let highlights = render_highlighted(text, &tags);

        let first: Vec<_> = highlights.clone().collect();
        let second: Vec<_> = highlights.collect();
        assert_eq!(first, second);
    }

    // =============================================
    // OffsetTagger
    // =============================================

    #[test]
    fn test_add_tag_sets_value() {
        let notifier = CollectingNotifier::new();
        let mut tagger = OffsetTagger::new("OIB: 12345678901", vec![], &notifier);

        let added = tagger.add_tag(TagType::Oib, Some(CharRange::new(5, 16))).cloned();
        assert_eq!(added.unwrap().value, "12345678901");
        assert_eq!(tagger.len(), 1);
        assert_eq!(notifier.count(NoticeLevel::Warning), 0);
    }

    #[test]
    fn test_add_tag_rejects_missing_or_empty_range() {
        let notifier = CollectingNotifier::new();
        let mut tagger = OffsetTagger::new("abcdef", vec![], &notifier);

        assert!(tagger.add_tag(TagType::Oib, None).is_none());
        assert!(tagger.add_tag(TagType::Oib, Some(CharRange::new(2, 2))).is_none());
        assert!(tagger.add_tag(TagType::Oib, Some(CharRange::new(4, 99))).is_none());

        assert!(tagger.is_empty());
        assert_eq!(notifier.count(NoticeLevel::Warning), 3);
    }

    #[test]
    fn test_tag_selection_clears_selection() {
        let notifier = CollectingNotifier::new();
        let mut tagger = OffsetTagger::new("Broj: R-2024-17", vec![], &notifier);
        let mut surface = FakeSurface {
            segments: vec!["Broj: ".to_string(), "R-2024-17".to_string()],
            selection: Some(TextSelection::new(SelectionPoint::new(1, 0), SelectionPoint::new(1, 9))),
        };

        let value = tagger
            .tag_selection(TagType::InvoiceNumber, &mut surface)
            .map(|t| t.value.clone());
        assert_eq!(value.as_deref(), Some("R-2024-17"));
        assert!(surface.selection.is_none());

        // 同じ選択を再利用できない
        assert!(tagger.tag_selection(TagType::Oib, &mut surface).is_none());
        assert_eq!(tagger.len(), 1);
        assert_eq!(notifier.count(NoticeLevel::Warning), 1);
    }

    #[test]
    fn test_remove_tag_out_of_range() {
        let text = "abcdef";
        let mut tagger = OffsetTagger::with_text(text, vec![tag(TagType::Oib, text, 0, 2)]);

        assert!(tagger.remove_tag(5).is_none());
        assert_eq!(tagger.len(), 1);
        assert!(tagger.remove_tag(0).is_some());
        assert!(tagger.is_empty());
    }

    #[test]
    fn test_remove_then_readd_restores_rendering() {
        let text = "abcdefghij";
        let mut tagger = OffsetTagger::with_text(
            text,
            vec![tag(TagType::Oib, text, 0, 3), tag(TagType::AmountTotal, text, 5, 8)],
        );
        let before: Vec<_> = tagger.highlights().map(|s| (s.text.to_string(), s.tag_type)).collect();

        let removed = tagger.remove_tag(0).unwrap();
        assert_ne!(
            tagger.highlights().map(|s| (s.text.to_string(), s.tag_type)).collect::<Vec<_>>(),
            before
        );

        tagger.add_tag(removed.tag_type, Some(removed.range()));
        let after: Vec<_> = tagger.highlights().map(|s| (s.text.to_string(), s.tag_type)).collect();
        assert_eq!(after, before);
    }

    #[test]
    fn test_reset_on_text_change() {
        let text = "first document 123";
        let mut tagger = OffsetTagger::with_text(text, vec![tag(TagType::Oib, text, 15, 18)]);

        tagger.reset("second", vec![]);
        assert!(tagger.is_empty());
        assert_eq!(tagger.text(), "second");
        assert_eq!(tagger.highlights().count(), 1);

        let replacement = tag(TagType::SupplierName, "second", 0, 6);
        tagger.reset("second", vec![replacement.clone()]);
        assert_eq!(tagger.tags(), &[replacement]);
    }

    #[test]
    fn test_save_only_with_tags() {
        let text = "abc";
        let mut tagger = OffsetTagger::with_text(text, vec![]);
        assert_eq!(tagger.save(|tags| tags.len()), None);

        tagger.add_tag(TagType::Oib, Some(CharRange::new(0, 3)));
        assert_eq!(tagger.save(|tags| tags.len()), Some(1));
    }

    #[test]
    fn test_retain_types() {
        let text = "OIB 12345678901 iznos 125,00";
        let mut tagger = OffsetTagger::with_text(
            text,
            vec![tag(TagType::Oib, text, 4, 15), tag(TagType::AmountTotal, text, 22, 28)],
        );

        assert_eq!(tagger.retain_types(&[TagType::Oib, TagType::DateInvoice]), 1);
        assert_eq!(tagger.len(), 1);
        assert_eq!(tagger.tags()[0].value, "12345678901");
        assert_eq!(tagger.retain_types(&[]), 1);
        assert!(tagger.is_empty());
    }

    #[test]
    fn test_char_slice_bounds() {
        assert_eq!(char_slice("ščž", 1, 3), Some("čž"));
        assert_eq!(char_slice("abc", 3, 3), Some(""));
        assert_eq!(char_slice("abc", 2, 4), None);
        assert_eq!(char_slice("abc", 2, 1), None);
    }
}
