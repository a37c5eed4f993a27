use crate::parser::ast::{AttributeKey, NodeId, NodeType};
use crate::parser::parser::ParsedScript;
use crate::parser::scanner::CursorLocation;
use crate::script::Script;
use crate::status::StatusCode;
use crate::text::Location;
use crate::text::names::NameId;

/// What the cursor is pointing at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorContext {
    #[default]
    None,
    TableRef {
        table_reference_id: u32,
        at_alias: bool,
    },
    ColumnRef {
        expression_id: u32,
    },
}

/// One component of the qualified name under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameComponentKind {
    Name,
    TrailingDot,
    Unknown,
}

#[derive(Debug, Clone, Copy)]
pub struct NameComponent {
    pub kind: NameComponentKind,
    pub location: Location,
    pub name: Option<NameId>,
}

/// The script state located at a text offset: scanner symbol, AST node,
/// statement, and the enclosing name scopes.
#[derive(Debug, Clone)]
pub struct ScriptCursor {
    pub text_offset: usize,
    pub scanner_location: Option<CursorLocation>,
    pub statement_id: Option<u32>,
    pub ast_node_id: Option<NodeId>,
    /// The node path from the cursor node to the statement root.
    pub ast_path_to_root: Vec<NodeId>,
    /// Enclosing name scopes, innermost to outermost.
    pub name_scopes: Vec<u32>,
    pub context: CursorContext,
}

impl ScriptCursor {
    /// Place a cursor in a script.
    /// Requires a scanned script; parsed and analyzed state is optional and
    /// only enriches the cursor.
    pub(crate) fn place(script: &Script, text_offset: usize) -> Result<ScriptCursor, StatusCode> {
        let Some(scanned) = script.scanned_script() else {
            return Err(StatusCode::ScriptNotScanned);
        };
        let text_offset = text_offset.min(scanned.text_len());
        let mut cursor = ScriptCursor {
            text_offset,
            scanner_location: Some(scanned.find_symbol(text_offset)),
            statement_id: None,
            ast_node_id: None,
            ast_path_to_root: Vec::new(),
            name_scopes: Vec::new(),
            context: CursorContext::None,
        };

        let Some(parsed) = script.parsed_script() else {
            return Ok(cursor);
        };
        let Some((statement_id, node_id)) = parsed.find_node_at_offset(text_offset) else {
            return Ok(cursor);
        };
        cursor.statement_id = Some(statement_id as u32);
        cursor.ast_node_id = Some(node_id as NodeId);

        match script.analyzed_script() {
            Some(analyzed) => {
                let (path, scopes) = analyzed.follow_path_upwards(node_id as NodeId);
                cursor.ast_path_to_root = path;
                cursor.name_scopes = scopes;

                // Discriminate the innermost reference the cursor is in.
                'outer: for &path_node in &cursor.ast_path_to_root {
                    if let Some(&expression_id) =
                        analyzed.column_refs_by_ast_node.get(&path_node)
                    {
                        cursor.context = CursorContext::ColumnRef { expression_id };
                        break 'outer;
                    }
                    if let Some(&table_reference_id) =
                        analyzed.table_refs_by_ast_node.get(&path_node)
                    {
                        let at_alias = cursor
                            .ast_path_to_root
                            .iter()
                            .take_while(|&&n| n != path_node)
                            .chain(std::iter::once(&path_node))
                            .any(|&n| {
                                parsed.nodes[n as usize].attribute_key
                                    == AttributeKey::SqlTablerefAlias
                            });
                        cursor.context = CursorContext::TableRef {
                            table_reference_id,
                            at_alias,
                        };
                        break 'outer;
                    }
                }
            }
            None => {
                // Without analysis we still record the raw node path.
                let mut iter = node_id;
                loop {
                    cursor.ast_path_to_root.push(iter as NodeId);
                    let parent = parsed.nodes[iter].parent as usize;
                    if parent == iter {
                        break;
                    }
                    iter = parent;
                }
            }
        }
        Ok(cursor)
    }

    /// Read the qualified name path enclosing the cursor.
    ///
    /// Returns the components of the innermost name-path array on the node
    /// path, plus the array's location.
    pub fn read_name_path(&self, parsed: &ParsedScript) -> (Vec<NameComponent>, Location) {
        let nodes = &parsed.nodes;
        let array_id = self.ast_path_to_root.iter().copied().find(|&id| {
            let node = &nodes[id as usize];
            node.node_type == NodeType::Array
                && matches!(
                    node.attribute_key,
                    AttributeKey::SqlTablerefName
                        | AttributeKey::SqlColumnRefPath
                        | AttributeKey::SqlCreateName
                        | AttributeKey::SqlCreateAsName
                        | AttributeKey::SqlFunctionName
                        | AttributeKey::ExtSetKey
                )
        });
        let Some(array_id) = array_id else {
            return (Vec::new(), Location::default());
        };
        let array = &nodes[array_id as usize];
        let components = array
            .children()
            .map(|child| {
                let node = &nodes[child];
                match node.node_type {
                    NodeType::Name => NameComponent {
                        kind: NameComponentKind::Name,
                        location: node.location,
                        name: Some(node.children_begin_or_value),
                    },
                    NodeType::ObjectExtTrailingDot => NameComponent {
                        kind: NameComponentKind::TrailingDot,
                        location: node.location,
                        name: None,
                    },
                    _ => NameComponent {
                        kind: NameComponentKind::Unknown,
                        location: node.location,
                        name: None,
                    },
                }
            })
            .collect();
        (components, array.location)
    }
}
