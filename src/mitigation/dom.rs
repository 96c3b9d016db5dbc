//! Arena document model the mitigation controller searches and mutates.
//!
//! Production adapters back this with the live page; tests build fixtures
//! directly. The search walk mirrors what the browser would have matched:
//! document order, script/style/hidden subtrees excluded,
//! ASCII-case-insensitive comparison (cheap and not locale-sensitive).

use tracing::debug;

pub type NodeId = usize;

// Subtrees whose text never participates in matching.
const SKIPPED_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Tag used for the injected highlight element.
pub const HIGHLIGHT_TAG: &str = "mark";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        tag: String,
        hidden: bool,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Location of a matched range inside one text node. Byte offsets, always on
/// char boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMatch {
    pub node: NodeId,
    pub start: usize,
    pub len: usize,
}

#[derive(Debug)]
pub struct DocumentModel {
    nodes: Vec<Node>,
}

impl Default for DocumentModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentModel {
    /// An empty document: a single visible `body` root.
    pub fn new() -> Self {
        let mut doc = DocumentModel { nodes: Vec::new() };
        doc.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element {
                tag: "body".to_string(),
                hidden: false,
                attrs: Vec::new(),
            },
        });
        doc
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.append(
            parent,
            NodeKind::Element {
                tag: tag.to_string(),
                hidden: false,
                attrs: Vec::new(),
            },
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append(parent, NodeKind::Text(text.to_string()))
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            if let NodeKind::Element { hidden: h, .. } = &mut node.kind {
                *h = hidden;
            }
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            if let NodeKind::Element { attrs, .. } = &mut node.kind {
                attrs.retain(|(n, _)| n != name);
                attrs.push((name.to_string(), value.to_string()));
            }
        }
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    /// First case-insensitive occurrence of `needle` in the document's
    /// visible text, in document order. Empty needles never match.
    pub fn find_text(&self, needle: &str) -> Option<TextMatch> {
        if needle.is_empty() {
            return None;
        }
        self.search(self.root(), needle)
    }

    fn search(&self, id: NodeId, needle: &str) -> Option<TextMatch> {
        let node = self.nodes.get(id)?;
        match &node.kind {
            NodeKind::Text(text) => find_ascii_ci(text, needle).map(|start| TextMatch {
                node: id,
                start,
                len: needle.len(),
            }),
            NodeKind::Element { tag, hidden, .. } => {
                if *hidden || SKIPPED_TAGS.contains(&tag.as_str()) {
                    return None;
                }
                node.children
                    .iter()
                    .find_map(|&child| self.search(child, needle))
            }
        }
    }

    /// Wraps a matched range in a highlight element, splitting the text node
    /// into before / `<mark>` / after. Returns the mark's id, or `None` when
    /// the match no longer describes the document (node churn is non-fatal).
    pub fn highlight(&mut self, m: TextMatch, color: &str) -> Option<NodeId> {
        let (parent, text) = {
            let node = self.nodes.get(m.node)?;
            let NodeKind::Text(text) = &node.kind else {
                return None;
            };
            (node.parent?, text.clone())
        };

        let end = m.start.checked_add(m.len)?;
        if end > text.len() || !text.is_char_boundary(m.start) || !text.is_char_boundary(end) {
            debug!(event = "sttf_highlight_stale_match", node = m.node);
            return None;
        }

        let before = text[..m.start].to_string();
        let matched = text[m.start..end].to_string();
        let after = text[end..].to_string();

        let mark = self.push_detached(NodeKind::Element {
            tag: HIGHLIGHT_TAG.to_string(),
            hidden: false,
            attrs: vec![("style".to_string(), format!("background-color: {color}"))],
        });
        let mark_text = self.push_detached(NodeKind::Text(matched));
        self.attach(mark_text, mark);
        self.nodes[mark].children.push(mark_text);

        let mut replacement = Vec::with_capacity(3);
        if !before.is_empty() {
            let id = self.push_detached(NodeKind::Text(before));
            self.attach(id, parent);
            replacement.push(id);
        }
        self.attach(mark, parent);
        replacement.push(mark);
        if !after.is_empty() {
            let id = self.push_detached(NodeKind::Text(after));
            self.attach(id, parent);
            replacement.push(id);
        }

        let index = self.child_index(parent, m.node)?;
        self.nodes[parent].children.splice(index..=index, replacement);
        self.nodes[m.node].parent = None;

        Some(mark)
    }

    /// Undoes `highlight`: the mark and its adjacent split-off text siblings
    /// collapse back into one plain text node with the original content.
    pub fn unwrap_highlight(&mut self, mark: NodeId) {
        let Some(parent) = self.nodes.get(mark).and_then(|n| n.parent) else {
            return;
        };
        let Some(index) = self.child_index(parent, mark) else {
            return;
        };

        let children = &self.nodes[parent].children;
        let mut first = index;
        while first > 0 && self.is_text(children[first - 1]) {
            first -= 1;
        }
        let mut last = index;
        while last + 1 < children.len() && self.is_text(children[last + 1]) {
            last += 1;
        }

        let span: Vec<NodeId> = self.nodes[parent].children[first..=last].to_vec();
        let mut restored = String::new();
        for id in &span {
            restored.push_str(&self.collect_text(*id));
            self.nodes[*id].parent = None;
        }

        let replacement = self.push_detached(NodeKind::Text(restored));
        self.attach(replacement, parent);
        self.nodes[parent]
            .children
            .splice(first..=last, [replacement]);
    }

    /// Inserts a new node immediately after `sibling`. No-op result when the
    /// sibling is detached.
    pub fn insert_after(&mut self, sibling: NodeId, kind: NodeKind) -> Option<NodeId> {
        let parent = self.nodes.get(sibling)?.parent?;
        let index = self.child_index(parent, sibling)?;
        let id = self.push_detached(kind);
        self.attach(id, parent);
        self.nodes[parent].children.insert(index + 1, id);
        Some(id)
    }

    /// Detaches `id` from its parent.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(id).and_then(|n| n.parent) else {
            return;
        };
        self.nodes[parent].children.retain(|&c| c != id);
        self.nodes[id].parent = None;
    }

    /// Full text of the subtree rooted at `id`, hidden or not.
    pub fn collect_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_into(id, &mut out);
        out
    }

    pub fn text_content(&self) -> String {
        self.collect_text(self.root())
    }

    /// Whether any attached element carries `tag`. Used to verify teardown.
    pub fn contains_tag(&self, tag: &str) -> bool {
        self.subtree_contains_tag(self.root(), tag)
    }

    fn subtree_contains_tag(&self, id: NodeId, tag: &str) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if let NodeKind::Element { tag: t, .. } = &node.kind {
            if t == tag {
                return true;
            }
        }
        node.children
            .iter()
            .any(|&child| self.subtree_contains_tag(child, tag))
    }

    fn collect_into(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for &child in &node.children {
                    self.collect_into(child, out);
                }
            }
        }
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.push_detached(kind);
        self.attach(id, parent);
        self.nodes[parent].children.push(id);
        id
    }

    fn push_detached(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    fn attach(&mut self, id: NodeId, parent: NodeId) {
        self.nodes[id].parent = Some(parent);
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes
            .get(parent)?
            .children
            .iter()
            .position(|&c| c == child)
    }

    fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id).map(|n| &n.kind), Some(NodeKind::Text(_)))
    }
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`.
/// Non-ASCII bytes compare exactly, which keeps every match aligned to char
/// boundaries.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || n.len() > h.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| {
        haystack.is_char_boundary(i)
            && haystack.is_char_boundary(i + n.len())
            && h[i..i + n.len()].eq_ignore_ascii_case(n)
    })
}
