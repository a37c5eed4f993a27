use smol_str::SmolStr;

use crate::analyzer::SemanticNodeMarker;
use crate::parser::ast::{Node, NodeType};
use crate::text::Location;
use crate::text::names::NameRegistry;
use crate::utils::SignatureHasher;

/// A self-contained sub-AST with its text and local name table.
///
/// Snippets serve as templates for similarity grouping and completion
/// insertion. The node vector is in the same parent-after-children order as
/// a parsed script; the root sits at the last position.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScriptSnippet {
    pub text: SmolStr,
    pub names: Vec<SmolStr>,
    pub nodes: Vec<Node>,
    pub node_markers: Vec<SemanticNodeMarker>,
    pub root_node_id: u32,
}

impl ScriptSnippet {
    /// Extract the subtree rooted at `root_node_id`.
    pub fn extract(
        text: &str,
        ast: &[Node],
        ast_markers: &[SemanticNodeMarker],
        root_node_id: usize,
        names: &NameRegistry,
    ) -> ScriptSnippet {
        if root_node_id >= ast.len() {
            return ScriptSnippet::default();
        }

        let root = &ast[root_node_id];
        let snippet_offset = root.location.offset;
        let snippet_size = root.location.length;
        let patch_location = |location: Location| -> Location {
            debug_assert!(location.offset >= snippet_offset);
            debug_assert!(location.end() <= snippet_offset + snippet_size);
            Location::new(location.offset - snippet_offset, location.length)
        };

        let mut out = ScriptSnippet {
            text: SmolStr::new(
                &text[snippet_offset as usize..(snippet_offset + snippet_size) as usize],
            ),
            ..Default::default()
        };
        let mut translated_names: ahash::AHashMap<u32, u32> = ahash::AHashMap::new();
        let mut sparse_markers: Vec<(usize, SemanticNodeMarker)> = Vec::new();

        out.nodes.push(Node {
            location: patch_location(root.location),
            node_type: root.node_type,
            attribute_key: crate::parser::ast::AttributeKey::None,
            parent: 0,
            children_begin_or_value: root.children_begin_or_value,
            children_count: root.children_count,
        });

        // Pre-order DFS; children are pushed in reverse source order so that
        // the later reversal restores the original order.
        let mut pending: Vec<(usize, usize)> = vec![(root_node_id, 0)];
        while let Some((source_id, output_id)) = pending.pop() {
            if ast_markers
                .get(source_id)
                .is_some_and(|&m| m != SemanticNodeMarker::None)
            {
                sparse_markers.push((output_id, ast_markers[source_id]));
            }
            let source = &ast[source_id];
            if source.node_type == NodeType::Name {
                let name_id = source.children_begin_or_value;
                let translated = *translated_names.entry(name_id).or_insert_with(|| {
                    let next = out.names.len() as u32;
                    out.names.push(names.get(name_id).text.clone());
                    next
                });
                out.nodes[output_id].children_begin_or_value = translated;
            } else if source.node_type.has_children() {
                out.nodes[output_id].children_begin_or_value = out.nodes.len() as u32;
                for i in 0..source.children_count as usize {
                    let child_source =
                        source.children_begin_or_value as usize + source.children_count as usize
                            - 1
                            - i;
                    let child = &ast[child_source];
                    out.nodes.push(Node {
                        location: patch_location(child.location),
                        node_type: child.node_type,
                        attribute_key: child.attribute_key,
                        parent: output_id as u32,
                        children_begin_or_value: child.children_begin_or_value,
                        children_count: child.children_count,
                    });
                    pending.push((child_source, out.nodes.len() - 1));
                }
            }
        }

        // Reverse into the parsed-script convention: children are read
        // before parents when scanning left-to-right.
        let total = out.nodes.len();
        out.nodes.reverse();
        for node in &mut out.nodes {
            node.parent = (total - 1 - node.parent as usize) as u32;
            if node.node_type.has_children() {
                node.children_begin_or_value = (total
                    - node.children_begin_or_value as usize
                    - node.children_count as usize) as u32;
            }
        }
        out.node_markers = vec![SemanticNodeMarker::None; total];
        for (forward_id, marker) in sparse_markers {
            out.node_markers[total - 1 - forward_id] = marker;
        }
        out.root_node_id = (total - 1) as u32;
        out.nodes[total - 1].parent = u32::MAX;
        out
    }

    fn signature(&self, skip_names_and_literals: bool) -> u64 {
        let mut hasher = SignatureHasher::default();
        for node in &self.nodes {
            hasher.write_u16(node.node_type as u16);
            hasher.write_u16(node.attribute_key as u16);
            match node.node_type {
                NodeType::Name => {
                    if !skip_names_and_literals {
                        hasher.write_str(&self.names[node.children_begin_or_value as usize]);
                    }
                }
                NodeType::LiteralNull
                | NodeType::LiteralInteger
                | NodeType::LiteralFloat
                | NodeType::LiteralString
                | NodeType::LiteralInterval => {
                    if !skip_names_and_literals {
                        hasher.write_str(self.read_node_text(node));
                    }
                }
                _ => {
                    if node.node_type.has_children() {
                        hasher.write_u32(node.children_count);
                    } else {
                        hasher.write_u32(node.children_begin_or_value);
                    }
                }
            }
        }
        hasher.finish()
    }

    /// Hashes only the node shape; stable across renames and constant
    /// value changes.
    pub fn template_signature(&self) -> u64 {
        self.signature(true)
    }

    /// Additionally hashes names and literal text.
    pub fn raw_signature(&self) -> u64 {
        self.signature(false)
    }

    fn read_node_text(&self, node: &Node) -> &str {
        let begin = (node.location.offset as usize).min(self.text.len());
        let end = (node.location.end() as usize).min(self.text.len());
        &self.text[begin..end]
    }

    /// Structural equality under the signature rules.
    pub fn equals(&self, other: &ScriptSnippet, skip_names_and_literals: bool) -> bool {
        if self.nodes.len() != other.nodes.len() {
            return false;
        }
        for (left, right) in self.nodes.iter().zip(other.nodes.iter()) {
            if left.node_type != right.node_type
                || left.attribute_key != right.attribute_key
                || left.children_count != right.children_count
            {
                return false;
            }
            match left.node_type {
                NodeType::Name => {
                    if !skip_names_and_literals
                        && self.names[left.children_begin_or_value as usize]
                            != other.names[right.children_begin_or_value as usize]
                    {
                        return false;
                    }
                }
                NodeType::LiteralNull
                | NodeType::LiteralInteger
                | NodeType::LiteralFloat
                | NodeType::LiteralString
                | NodeType::LiteralInterval => {
                    if !skip_names_and_literals
                        && self.read_node_text(left) != other.read_node_text(right)
                    {
                        return false;
                    }
                }
                _ => {
                    if !left.node_type.has_children()
                        && left.children_begin_or_value != right.children_begin_or_value
                    {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Snippets grouped by their template signature.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SnippetGroup {
    pub template_signature: u64,
    pub snippets: Vec<ScriptSnippet>,
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::{parse, scan};

    fn snippet_for(text: &str, probe: &str) -> ScriptSnippet {
        let scanned = Rc::new(scan(format!("{text}\0\0"), 1, 1));
        let parsed = parse(&scanned);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        // Find the n-ary expression node enclosing the probe offset.
        let offset = text.find(probe).unwrap() + probe.len() / 2;
        let (_, node) = parsed.find_node_at_offset(offset).unwrap();
        let mut root = node;
        loop {
            if parsed.nodes[root].node_type == NodeType::ObjectSqlNaryExpression {
                break;
            }
            let parent = parsed.nodes[root].parent as usize;
            assert_ne!(parent, root, "no expression found around '{probe}'");
            root = parent;
        }
        let markers = vec![SemanticNodeMarker::None; parsed.nodes.len()];
        let names = scanned.name_registry.borrow();
        ScriptSnippet::extract(scanned.text(), &parsed.nodes, &markers, root, &names)
    }

    #[test]
    fn test_extract_restriction() {
        let snippet = snippet_for("select 1 from t where x.v = 42", "x.v = 42");
        assert_eq!(snippet.text, "x.v = 42");
        assert_eq!(snippet.root_node_id as usize, snippet.nodes.len() - 1);
        assert_eq!(snippet.nodes[snippet.root_node_id as usize].parent, u32::MAX);
        // Post-order: every non-root node's parent comes after it.
        for (idx, node) in snippet.nodes.iter().enumerate() {
            if idx != snippet.root_node_id as usize {
                assert!(node.parent as usize > idx);
            }
        }
        // The referenced names were interned locally.
        assert_eq!(snippet.names, vec![SmolStr::new("x"), SmolStr::new("v")]);
        // Child adjacency survives the reversal.
        for (idx, node) in snippet.nodes.iter().enumerate() {
            for child in node.children() {
                assert_eq!(snippet.nodes[child].parent as usize, idx);
            }
        }
    }

    #[test]
    fn test_signatures_ignore_names_and_literals() {
        let a = snippet_for("select 1 from t where x.v = 42", "x.v = 42");
        let b = snippet_for("select 1 from u where y.w = 7", "y.w = 7");
        let c = snippet_for("select 1 from t where x.v < 42", "x.v < 42");

        assert_eq!(a.template_signature(), b.template_signature());
        assert_ne!(a.raw_signature(), b.raw_signature());
        // A different operator changes the enum value, never the shape hash
        // of names; both signatures differ.
        assert_ne!(a.template_signature(), c.template_signature());
        assert!(a.equals(&b, true));
        assert!(!a.equals(&b, false));
        assert!(a.equals(&a.clone(), false));
    }

    #[test]
    fn test_signatures_are_deterministic() {
        let a = snippet_for("select 1 from t where x.v = 42", "x.v = 42");
        let b = snippet_for("select 1 from t where x.v = 42", "x.v = 42");
        assert_eq!(a.template_signature(), b.template_signature());
        assert_eq!(a.raw_signature(), b.raw_signature());
    }

    #[test]
    fn test_extract_out_of_bounds() {
        let snippet = ScriptSnippet::extract("", &[], &[], 5, &NameRegistry::new());
        assert!(snippet.nodes.is_empty());
    }
}
