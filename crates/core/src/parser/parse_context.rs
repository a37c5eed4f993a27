use crate::parser::ast::{
    AttributeKey, ExpressionOperator, Node, NodeId, NodeType, Statement, StatementType,
};
use crate::parser::scanner::ScannedScript;
use crate::text::Location;
use crate::text::names::NameId;

/// Node construction state shared by all grammar rules.
///
/// Children are buffered as node values and flushed into the flat buffer
/// when their parent materializes. This yields the emission order the
/// consumers rely on: children are contiguous and always precede their
/// parent.
pub(crate) struct ParseContext<'a> {
    pub scanned: &'a ScannedScript,
    pub nodes: Vec<Node>,
    pub statements: Vec<Statement>,
    pub errors: Vec<(Location, String)>,
    current_statement_begin: usize,
}

impl<'a> ParseContext<'a> {
    pub fn new(scanned: &'a ScannedScript) -> Self {
        Self {
            scanned,
            nodes: Vec::new(),
            statements: Vec::new(),
            errors: Vec::new(),
            current_statement_begin: 0,
        }
    }

    pub fn error(&mut self, location: Location, message: impl Into<String>) {
        self.errors.push((location, message.into()));
    }

    /// Flush a node value into the buffer and adopt its already-flushed
    /// children.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        let mut flushed = node;
        flushed.parent = node_id;
        self.nodes.push(flushed);
        if node.node_type.has_children() {
            let begin = node.children_begin_or_value as usize;
            for child_id in begin..begin + node.children_count as usize {
                self.nodes[child_id].parent = node_id;
            }
        }
        node_id
    }

    pub fn null(&self) -> Node {
        Node::new(Location::default(), NodeType::None, 0, 0)
    }

    pub fn bool_node(&self, location: Location, value: bool) -> Node {
        Node::new(location, NodeType::Bool, value as u32, 0)
    }

    pub fn name_from_identifier(&self, location: Location, name: NameId) -> Node {
        Node::new(location, NodeType::Name, name, 0)
    }

    pub fn name_from_keyword(&mut self, location: Location, text: &str) -> Node {
        let name = self.scanned.register_keyword_as_name(text, location);
        Node::new(location, NodeType::Name, name, 0)
    }

    pub fn name_from_string_literal(&mut self, location: Location) -> Node {
        let trimmed = self
            .scanned
            .read_text_at(location)
            .trim_matches('\'')
            .to_owned();
        let name = self
            .scanned
            .name_registry
            .borrow_mut()
            .register(&trimmed, location, crate::text::names::NameTags::NONE);
        Node::new(location, NodeType::Name, name, 0)
    }

    pub fn literal(&self, location: Location, node_type: NodeType) -> Node {
        Node::new(location, node_type, 0, 0)
    }

    pub fn enum_node(&self, location: Location, node_type: NodeType, value: u32) -> Node {
        debug_assert!(node_type.is_enum());
        Node::new(location, node_type, value, 0)
    }

    pub fn attr(&self, key: AttributeKey, node: Node) -> Node {
        node.with_attribute(key)
    }

    /// A trailing dot in a qualified name.
    pub fn trailing_dot(&mut self, location: Location) -> Node {
        self.error(location, "name has a trailing dot");
        Node::new(location, NodeType::ObjectExtTrailingDot, 0, 0)
    }

    /// Copy buffered children into the node buffer, dropping NONE nodes.
    /// When `shrink_location` is set, the resulting location spans from the
    /// first to the last emitted child.
    pub fn array(
        &mut self,
        location: Location,
        children: Vec<Node>,
        null_if_empty: bool,
        shrink_location: bool,
    ) -> Node {
        let begin = self.nodes.len();
        for child in children {
            if child.node_type == NodeType::None {
                continue;
            }
            self.add_node(child);
        }
        let count = self.nodes.len() - begin;
        if count == 0 && null_if_empty {
            return self.null();
        }
        let mut location = location;
        if count > 0 && shrink_location {
            let first = self.nodes[begin].location;
            let last = self.nodes[self.nodes.len() - 1].location;
            location = first.spanning(last);
        }
        Node::new(location, NodeType::Array, begin as u32, count as u32)
    }

    /// Same as `array`, for objects: each child node's attribute key
    /// identifies its role in the parent.
    pub fn object(
        &mut self,
        location: Location,
        node_type: NodeType,
        attributes: Vec<Node>,
        null_if_empty: bool,
        shrink_location: bool,
    ) -> Node {
        debug_assert!(node_type.is_object());
        let begin = self.nodes.len();
        for child in attributes {
            if child.node_type == NodeType::None {
                continue;
            }
            self.add_node(child);
        }
        let count = self.nodes.len() - begin;
        if count == 0 && null_if_empty {
            return self.null();
        }
        let mut location = location;
        if count > 0 && shrink_location {
            let first = self.nodes[begin].location;
            let last = self.nodes[self.nodes.len() - 1].location;
            location = first.spanning(last);
        }
        Node::new(location, node_type, begin as u32, count as u32)
    }

    /// Finish the current statement with its root node.
    pub fn add_statement(&mut self, node: Node) {
        if node.node_type == NodeType::None {
            return;
        }
        let statement_type = match node.node_type {
            NodeType::ObjectSqlSelect => StatementType::Select,
            NodeType::ObjectSqlCreate => StatementType::CreateTable,
            NodeType::ObjectSqlCreateAs => StatementType::CreateTableAs,
            NodeType::ObjectExtSet => StatementType::Set,
            _ => StatementType::None,
        };
        let root = self.add_node(node);
        let nodes_begin = self.current_statement_begin;
        self.statements.push(Statement {
            statement_type,
            root,
            nodes_begin,
            node_count: self.nodes.len() - nodes_begin,
        });
        self.current_statement_begin = self.nodes.len();
    }

    /// Discard the nodes of a statement that failed to parse.
    pub fn reset_statement(&mut self) {
        self.current_statement_begin = self.nodes.len();
    }
}

/// An expression under construction.
///
/// Associatively-chained AND/OR operators are kept unmaterialized so that
/// chains merge into a single n-ary node.
pub(crate) enum ExprElem {
    Node(Node),
    Nary(Box<NaryExpr>),
}

pub(crate) struct NaryExpr {
    pub location: Location,
    pub op: ExpressionOperator,
    pub op_node: Node,
    pub args: Vec<ExprElem>,
}

impl ParseContext<'_> {
    /// Build an operator expression, flattening AND/OR chains.
    pub fn make_expr(
        &mut self,
        location: Location,
        op: ExpressionOperator,
        op_location: Location,
        args: Vec<ExprElem>,
    ) -> ExprElem {
        let op_node = self.enum_node(op_location, NodeType::EnumSqlExpressionOperator, op as u32);
        match op {
            ExpressionOperator::And | ExpressionOperator::Or => {
                let mut nary = NaryExpr {
                    location,
                    op,
                    op_node,
                    args: Vec::with_capacity(args.len()),
                };
                for arg in args {
                    match arg {
                        ExprElem::Nary(child) if child.op == op => nary.args.extend(child.args),
                        other => nary.args.push(other),
                    }
                }
                ExprElem::Nary(Box::new(nary))
            }
            _ => {
                let node = self.materialize_operator(location, op_node, args);
                ExprElem::Node(node)
            }
        }
    }

    /// Turn an expression element into a node, materializing pending n-aries.
    pub fn expression(&mut self, elem: ExprElem) -> Node {
        match elem {
            ExprElem::Node(node) => node,
            ExprElem::Nary(nary) => {
                let NaryExpr {
                    location,
                    op_node,
                    args,
                    ..
                } = *nary;
                self.materialize_operator(location, op_node, args)
            }
        }
    }

    fn materialize_operator(
        &mut self,
        location: Location,
        op_node: Node,
        args: Vec<ExprElem>,
    ) -> Node {
        let arg_nodes: Vec<Node> = args.into_iter().map(|a| self.expression(a)).collect();
        let args_array = self.array(location, arg_nodes, false, true);
        self.object(
            location,
            NodeType::ObjectSqlNaryExpression,
            vec![
                self.attr(AttributeKey::SqlExpressionOperator, op_node),
                self.attr(AttributeKey::SqlExpressionArgs, args_array),
            ],
            false,
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::scanner;

    fn scanned(text: &str) -> ScannedScript {
        scanner::scan(format!("{text}\0\0"), 1, 1)
    }

    #[test]
    fn test_children_precede_parents() {
        let scan = scanned("select 1");
        let mut ctx = ParseContext::new(&scan);
        let a = ctx.literal(Location::new(0, 1), NodeType::LiteralInteger);
        let b = ctx.literal(Location::new(2, 1), NodeType::LiteralInteger);
        let array = ctx.array(Location::new(0, 3), vec![a, b], true, false);
        let object = ctx.object(
            Location::new(0, 3),
            NodeType::ObjectSqlSelect,
            vec![ctx.attr(AttributeKey::SqlSelectTargets, array)],
            false,
            false,
        );
        ctx.add_statement(object);

        // Leaves first, then the array, then the object root.
        assert_eq!(ctx.nodes.len(), 4);
        assert_eq!(ctx.nodes[0].node_type, NodeType::LiteralInteger);
        assert_eq!(ctx.nodes[2].node_type, NodeType::Array);
        assert_eq!(ctx.nodes[3].node_type, NodeType::ObjectSqlSelect);
        // Parents are patched on adoption.
        assert_eq!(ctx.nodes[0].parent, 2);
        assert_eq!(ctx.nodes[1].parent, 2);
        assert_eq!(ctx.nodes[2].parent, 3);
        assert_eq!(ctx.nodes[3].parent, 3);
        // Statement covers the full range.
        assert_eq!(ctx.statements[0].nodes_begin, 0);
        assert_eq!(ctx.statements[0].node_count, 4);
        assert_eq!(ctx.statements[0].root, 3);
    }

    #[test]
    fn test_array_drops_none_and_shrinks() {
        let scan = scanned("x");
        let mut ctx = ParseContext::new(&scan);
        let none = ctx.null();
        let leaf = ctx.literal(Location::new(4, 2), NodeType::LiteralInteger);
        let array = ctx.array(Location::new(0, 10), vec![none, leaf], true, true);
        assert_eq!(array.children_count, 1);
        assert_eq!(array.location, Location::new(4, 2));

        let empty = ctx.array(Location::new(0, 0), vec![ctx.null()], true, false);
        assert_eq!(empty.node_type, NodeType::None);
    }

    #[test]
    fn test_and_chains_merge() {
        let scan = scanned("x");
        let mut ctx = ParseContext::new(&scan);
        let a = ExprElem::Node(ctx.literal(Location::new(0, 1), NodeType::LiteralInteger));
        let b = ExprElem::Node(ctx.literal(Location::new(2, 1), NodeType::LiteralInteger));
        let c = ExprElem::Node(ctx.literal(Location::new(4, 1), NodeType::LiteralInteger));
        let ab = ctx.make_expr(
            Location::new(0, 3),
            ExpressionOperator::And,
            Location::new(1, 1),
            vec![a, b],
        );
        let abc = ctx.make_expr(
            Location::new(0, 5),
            ExpressionOperator::And,
            Location::new(3, 1),
            vec![ab, c],
        );
        let node = ctx.expression(abc);
        assert_eq!(node.node_type, NodeType::ObjectSqlNaryExpression);
        // One operator node and one argument array with all three arguments.
        let args = ctx.nodes[node.children()].to_vec();
        let array = args
            .iter()
            .find(|n| n.attribute_key == AttributeKey::SqlExpressionArgs)
            .unwrap();
        assert_eq!(array.children_count, 3);
    }
}
