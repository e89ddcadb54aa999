//! DOMの選択範囲をテキストセグメント座標へ変換
//!
//! ルート要素配下のテキストノードを文書順に並べたものをセグメントとする。
//! DOMのオフセットはUTF-16単位なので文字単位に直す。

use docdesk_common::{SelectionPoint, SelectionSurface, TextSelection};
use web_sys::{Node, Selection};

pub struct DomSelectionSurface {
    root: Node,
    nodes: Vec<Node>,
}

impl DomSelectionSurface {
    pub fn new(root: Node) -> Self {
        let mut nodes = Vec::new();
        collect_text_nodes(&root, &mut nodes);
        Self { root, nodes }
    }

    fn dom_selection() -> Option<Selection> {
        web_sys::window()?.get_selection().ok().flatten()
    }

    /// DOMの境界点 (node, offset) をセグメント座標へ。ルート外は `None`
    fn point(&self, node: &Node, offset: u32) -> Option<SelectionPoint> {
        if !self.root.contains(Some(node)) {
            return None;
        }

        if node.node_type() == Node::TEXT_NODE {
            let index = self.nodes.iter().position(|n| n.is_same_node(Some(node)))?;
            let text = node.text_content().unwrap_or_default();
            return Some(SelectionPoint::new(index, utf16_to_char_offset(&text, offset as usize)));
        }

        // 要素内の境界: offset番目の子の直前
        let following = match node.child_nodes().item(offset) {
            Some(child) => self.nodes.iter().position(|n| {
                n.is_same_node(Some(&child)) || is_following(&child, n)
            }),
            None => self
                .nodes
                .iter()
                .position(|n| !node.contains(Some(n)) && is_following(node, n)),
        };

        match following {
            Some(index) => Some(SelectionPoint::new(index, 0)),
            None => {
                let last = self.nodes.len().checked_sub(1)?;
                let text = self.nodes[last].text_content().unwrap_or_default();
                Some(SelectionPoint::new(last, text.chars().count()))
            }
        }
    }
}

impl SelectionSurface for DomSelectionSurface {
    fn text_segments(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|n| n.text_content().unwrap_or_default())
            .collect()
    }

    fn selection(&self) -> Option<TextSelection> {
        let selection = Self::dom_selection()?;
        if selection.range_count() == 0 {
            return None;
        }

        let anchor = self.point(&selection.anchor_node()?, selection.anchor_offset())?;
        let focus = self.point(&selection.focus_node()?, selection.focus_offset())?;
        Some(TextSelection::new(anchor, focus))
    }

    fn clear_selection(&mut self) {
        if let Some(selection) = Self::dom_selection() {
            let _ = selection.remove_all_ranges();
        }
    }
}

fn collect_text_nodes(node: &Node, out: &mut Vec<Node>) {
    let children = node.child_nodes();
    for i in 0..children.length() {
        let Some(child) = children.item(i) else { continue };
        if child.node_type() == Node::TEXT_NODE {
            out.push(child);
        } else {
            collect_text_nodes(&child, out);
        }
    }
}

fn is_following(reference: &Node, other: &Node) -> bool {
    reference.compare_document_position(other) & Node::DOCUMENT_POSITION_FOLLOWING != 0
}

/// UTF-16オフセットを文字オフセットへ（サロゲートの途中は次の文字境界）
pub fn utf16_to_char_offset(text: &str, units: usize) -> usize {
    let mut consumed = 0;
    for (index, c) in text.chars().enumerate() {
        if consumed >= units {
            return index;
        }
        consumed += c.len_utf16();
    }
    text.chars().count()
}
