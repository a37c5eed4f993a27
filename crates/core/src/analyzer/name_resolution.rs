use smol_str::SmolStr;

use crate::analyzer::{
    AnalyzedScript, AnalyzerError, AnalyzerErrorType, BinaryExpression, BinaryExpressionFunction,
    Comparison, ComparisonFunction, ConstIntervalCast, Expression, ExpressionInner,
    FunctionArguments, FunctionCallExpression, FunctionName, LiteralExpression, LiteralType,
    NameScope, ResultTarget, SemanticNodeMarker, TableReference, TableReferenceInner,
    UnresolvedColumnRef, UnresolvedRelation,
};
use crate::catalog::{
    Catalog, ContextObjectId, DatabaseReference, QualifiedCatalogObjectId, QualifiedTableName,
    SchemaReference, TableColumn, TableDeclaration,
};
use crate::parser::ast::{
    AttributeKey, ExpressionOperator, IntervalType, KnownFunction, Node, NodeId, NodeType,
};
use crate::parser::scanner::ScannedScript;
use crate::text::Location;
use crate::text::names::{NameId, NameTags};

/// Collected facts about one subtree, merged upwards during the pass.
#[derive(Default)]
struct NodeState {
    child_scopes: Vec<u32>,
    table_columns: Vec<(SmolStr, NodeId)>,
    table_references: Vec<u32>,
    column_references: Vec<u32>,
    result_targets: Vec<ResultTarget>,
}

impl NodeState {
    fn merge(&mut self, other: NodeState) {
        self.child_scopes.extend(other.child_scopes);
        self.table_columns.extend(other.table_columns);
        self.table_references.extend(other.table_references);
        self.column_references.extend(other.column_references);
        self.result_targets.extend(other.result_targets);
    }
}

struct NamePathInfo {
    names: Vec<(NameId, NodeId, Location)>,
    trailing_dot: bool,
}

fn attr_child(nodes: &[Node], node_id: usize, key: AttributeKey) -> Option<usize> {
    nodes[node_id]
        .children()
        .find(|&child| nodes[child].attribute_key == key)
}

fn read_name_path(nodes: &[Node], array_id: usize) -> NamePathInfo {
    let mut info = NamePathInfo {
        names: Vec::new(),
        trailing_dot: false,
    };
    for child in nodes[array_id].children() {
        match nodes[child].node_type {
            NodeType::Name => info.names.push((
                nodes[child].children_begin_or_value,
                child as NodeId,
                nodes[child].location,
            )),
            NodeType::ObjectExtTrailingDot => info.trailing_dot = true,
            _ => {}
        }
    }
    info
}

fn tag_name(scanned: &ScannedScript, name: NameId, tag: NameTags) {
    scanned
        .name_registry
        .borrow_mut()
        .get_mut(name)
        .coarse_analyzer_tags |= tag;
}

fn name_text(scanned: &ScannedScript, name: NameId) -> SmolStr {
    scanned.name_registry.borrow().get(name).text.clone()
}

fn add_resolved_object(scanned: &ScannedScript, name: NameId, object: QualifiedCatalogObjectId) {
    let mut names = scanned.name_registry.borrow_mut();
    let objects = &mut names.get_mut(name).resolved_objects;
    if !objects.contains(&object) {
        objects.push(object);
    }
}

/// The name-resolution pass: one left-to-right sweep over the flat AST.
///
/// Children always precede their parents in the node buffer, so merging
/// child states when a parent is visited reduces exactly bottom-up.
pub(crate) fn run(analyzed: &mut AnalyzedScript, catalog: &mut Catalog) {
    let parsed = analyzed.parsed_script.clone();
    let nodes = &parsed.nodes;
    let scanned = &*parsed.scanned_script;

    let mut states: Vec<NodeState> = Vec::with_capacity(nodes.len());
    states.resize_with(nodes.len(), NodeState::default);
    let mut expression_by_node: Vec<Option<u32>> = vec![None; nodes.len()];

    for (statement_id, statement) in parsed.statements.iter().enumerate() {
        let statement_id = statement_id as u32;
        for node_id in statement.nodes_begin..statement.nodes_begin + statement.node_count {
            let node = &nodes[node_id];

            // Merge the states of all children first; they were visited.
            let mut state = NodeState::default();
            if node.node_type.has_children() {
                for child in node.children() {
                    state.merge(std::mem::take(&mut states[child]));
                }
            }

            match node.node_type {
                NodeType::Bool
                | NodeType::LiteralNull
                | NodeType::LiteralInteger
                | NodeType::LiteralFloat
                | NodeType::LiteralString
                | NodeType::LiteralInterval => {
                    if !is_literal_flag(nodes, node_id) {
                        let literal_type = match node.node_type {
                            NodeType::Bool => LiteralType::Bool,
                            NodeType::LiteralNull => LiteralType::Null,
                            NodeType::LiteralInteger => LiteralType::Integer,
                            NodeType::LiteralFloat => LiteralType::Float,
                            NodeType::LiteralInterval => LiteralType::Interval,
                            _ => LiteralType::String,
                        };
                        let raw_value = SmolStr::new(scanned.read_text_at(node.location));
                        let id = add_expression(
                            analyzed,
                            node_id as NodeId,
                            node.location,
                            statement_id,
                            ExpressionInner::Literal(LiteralExpression {
                                literal_type,
                                raw_value,
                            }),
                        );
                        analyzed.expressions[id as usize].is_constant = true;
                        analyzed.node_markers[node_id] = SemanticNodeMarker::Constant;
                        expression_by_node[node_id] = Some(id);
                    }
                }

                NodeType::ObjectSqlColumnRef => {
                    if let Some(path_id) = attr_child(nodes, node_id, AttributeKey::SqlColumnRefPath)
                    {
                        let path = read_name_path(nodes, path_id);
                        if !path.names.is_empty() {
                            let (table_alias, column_name) = if path.trailing_dot {
                                let (alias_name, _, _) = *path.names.last().unwrap();
                                tag_name(scanned, alias_name, NameTags::TABLE_ALIAS);
                                (Some(name_text(scanned, alias_name)), SmolStr::default())
                            } else {
                                let (column, _, _) = *path.names.last().unwrap();
                                tag_name(scanned, column, NameTags::COLUMN_NAME);
                                let alias = if path.names.len() >= 2 {
                                    let (alias_name, _, _) = path.names[path.names.len() - 2];
                                    tag_name(scanned, alias_name, NameTags::TABLE_ALIAS);
                                    Some(name_text(scanned, alias_name))
                                } else {
                                    None
                                };
                                (alias, name_text(scanned, column))
                            };
                            let id = add_expression(
                                analyzed,
                                node_id as NodeId,
                                node.location,
                                statement_id,
                                ExpressionInner::UnresolvedColumnRef(UnresolvedColumnRef {
                                    column_name_ast_node_id: path_id as NodeId,
                                    table_alias,
                                    column_name,
                                    ast_scope_root: None,
                                }),
                            );
                            analyzed.node_markers[node_id] = SemanticNodeMarker::ColumnReference;
                            analyzed
                                .column_refs_by_ast_node
                                .insert(node_id as NodeId, id);
                            state.column_references.push(id);
                            expression_by_node[node_id] = Some(id);
                        }
                    }
                }

                NodeType::ObjectSqlNaryExpression => {
                    let op = attr_child(nodes, node_id, AttributeKey::SqlExpressionOperator)
                        .and_then(|child| {
                            ExpressionOperator::from_node_value(
                                nodes[child].children_begin_or_value,
                            )
                        });
                    let args: Vec<Option<u32>> =
                        match attr_child(nodes, node_id, AttributeKey::SqlExpressionArgs) {
                            Some(array) => nodes[array]
                                .children()
                                .map(|child| expression_by_node[child])
                                .collect(),
                            None => Vec::new(),
                        };
                    if let Some(op) = op {
                        if let Some(id) = classify_operator(
                            analyzed,
                            node_id as NodeId,
                            node.location,
                            statement_id,
                            op,
                            &args,
                        ) {
                            expression_by_node[node_id] = Some(id);
                        }
                    }
                }

                NodeType::ObjectSqlFunctionCall => {
                    let name = if let Some(child) =
                        attr_child(nodes, node_id, AttributeKey::SqlFunctionKnownName)
                    {
                        KnownFunction::from_node_value(nodes[child].children_begin_or_value)
                            .map(FunctionName::Known)
                    } else {
                        attr_child(nodes, node_id, AttributeKey::SqlFunctionName).map(|array| {
                            let path = read_name_path(nodes, array);
                            let text = path
                                .names
                                .last()
                                .map(|&(name, _, _)| name_text(scanned, name))
                                .unwrap_or_default();
                            FunctionName::Named(text)
                        })
                    };
                    if let Some(name) = name {
                        let distinct =
                            attr_child(nodes, node_id, AttributeKey::SqlFunctionDistinct).is_some();
                        let arguments =
                            if attr_child(nodes, node_id, AttributeKey::SqlFunctionStar).is_some() {
                                FunctionArguments::Star
                            } else {
                                let ids = attr_child(
                                    nodes,
                                    node_id,
                                    AttributeKey::SqlFunctionArguments,
                                )
                                .map(|array| {
                                    nodes[array]
                                        .children()
                                        .filter_map(|child| expression_by_node[child])
                                        .collect()
                                })
                                .unwrap_or_default();
                                FunctionArguments::List(ids)
                            };
                        let id = add_expression(
                            analyzed,
                            node_id as NodeId,
                            node.location,
                            statement_id,
                            ExpressionInner::FunctionCall(FunctionCallExpression {
                                name,
                                distinct,
                                arguments,
                            }),
                        );
                        expression_by_node[node_id] = Some(id);
                    }
                }

                NodeType::ObjectSqlConstIntervalCast => {
                    let raw_value =
                        attr_child(nodes, node_id, AttributeKey::SqlConstCastValue)
                            .map(|child| SmolStr::new(scanned.read_text_at(nodes[child].location)))
                            .unwrap_or_default();
                    let interval = attr_child(nodes, node_id, AttributeKey::SqlConstCastInterval)
                        .and_then(|child| {
                            IntervalType::from_node_value(nodes[child].children_begin_or_value)
                        });
                    let id = add_expression(
                        analyzed,
                        node_id as NodeId,
                        node.location,
                        statement_id,
                        ExpressionInner::ConstIntervalCast(ConstIntervalCast {
                            raw_value,
                            interval,
                        }),
                    );
                    analyzed.expressions[id as usize].is_constant = true;
                    analyzed.node_markers[node_id] = SemanticNodeMarker::Constant;
                    expression_by_node[node_id] = Some(id);
                }

                NodeType::ObjectSqlCast => {
                    // A cast is transparent to classification.
                    if let Some(child) = attr_child(nodes, node_id, AttributeKey::SqlCastValue) {
                        expression_by_node[node_id] = expression_by_node[child];
                    }
                }

                NodeType::ObjectSqlResultTarget => {
                    if attr_child(nodes, node_id, AttributeKey::SqlResultTargetStar).is_some() {
                        state.result_targets.push(ResultTarget::Star);
                    } else if let Some(value) =
                        attr_child(nodes, node_id, AttributeKey::SqlResultTargetValue)
                    {
                        if let Some(id) = expression_by_node[value] {
                            let named =
                                attr_child(nodes, node_id, AttributeKey::SqlResultTargetName)
                                    .is_some();
                            state.result_targets.push(if named {
                                ResultTarget::Named(id)
                            } else {
                                ResultTarget::Unnamed(id)
                            });
                        }
                    }
                }

                NodeType::ObjectSqlTableRef => {
                    let alias_name = attr_child(nodes, node_id, AttributeKey::SqlTablerefAlias)
                        .map(|child| {
                            let name = nodes[child].children_begin_or_value;
                            tag_name(scanned, name, NameTags::TABLE_ALIAS);
                            name_text(scanned, name)
                        });
                    let inner = match attr_child(nodes, node_id, AttributeKey::SqlTablerefName) {
                        Some(path_id) => {
                            let path = read_name_path(nodes, path_id);
                            match table_name_from_path(scanned, &path) {
                                Some(table_name) => {
                                    register_explicit_schema(
                                        analyzed, catalog, scanned, &path, &table_name,
                                    );
                                    TableReferenceInner::Unresolved(UnresolvedRelation {
                                        table_name_ast_node_id: path_id as NodeId,
                                        table_name,
                                    })
                                }
                                None => TableReferenceInner::None,
                            }
                        }
                        None => TableReferenceInner::None,
                    };
                    let id = analyzed.table_references.len() as u32;
                    analyzed.table_references.push(TableReference {
                        table_reference_id: ContextObjectId::new(
                            analyzed.entry.catalog_entry_id,
                            id,
                        ),
                        ast_node_id: node_id as NodeId,
                        location: Some(node.location),
                        ast_statement_id: Some(statement_id),
                        ast_scope_root: None,
                        alias_name,
                        inner,
                    });
                    analyzed.table_refs_by_ast_node.insert(node_id as NodeId, id);
                    state.table_references.push(id);
                }

                NodeType::ObjectSqlJoinedTable => {
                    // USING names columns shared by both join sides.
                    if let Some(using_id) = attr_child(nodes, node_id, AttributeKey::SqlJoinUsing)
                    {
                        let using = read_name_path(nodes, using_id);
                        for &(name, _, _) in &using.names {
                            tag_name(scanned, name, NameTags::COLUMN_NAME);
                        }
                    }
                }

                NodeType::ObjectSqlColumnDef => {
                    if let Some(child) = attr_child(nodes, node_id, AttributeKey::SqlColumnDefName)
                    {
                        let name = nodes[child].children_begin_or_value;
                        tag_name(scanned, name, NameTags::COLUMN_NAME);
                        state
                            .table_columns
                            .push((name_text(scanned, name), child as NodeId));
                    }
                }

                NodeType::ObjectSqlCreate | NodeType::ObjectSqlCreateAs => {
                    let name_key = if node.node_type == NodeType::ObjectSqlCreate {
                        AttributeKey::SqlCreateName
                    } else {
                        AttributeKey::SqlCreateAsName
                    };
                    if let Some(path_id) = attr_child(nodes, node_id, name_key) {
                        let path = read_name_path(nodes, path_id);
                        let columns = std::mem::take(&mut state.table_columns);
                        declare_table(
                            analyzed,
                            catalog,
                            scanned,
                            &path,
                            columns,
                            node_id as NodeId,
                            statement_id,
                        );
                    }
                }

                NodeType::ObjectSqlSelect => {
                    let scope_id = analyzed.name_scopes.len() as u32;
                    for &child in &state.child_scopes {
                        analyzed.name_scopes[child as usize].parent_scope = Some(scope_id);
                    }
                    for &table_ref in &state.table_references {
                        analyzed.table_references[table_ref as usize].ast_scope_root =
                            Some(node_id as NodeId);
                    }
                    for &expression in &state.column_references {
                        if let ExpressionInner::UnresolvedColumnRef(inner) =
                            &mut analyzed.expressions[expression as usize].inner
                        {
                            inner.ast_scope_root = Some(node_id as NodeId);
                        }
                    }
                    analyzed.name_scopes.push(NameScope {
                        name_scope_id: scope_id,
                        ast_node_id: node_id as NodeId,
                        ast_statement_id: Some(statement_id),
                        parent_scope: None,
                        child_scopes: std::mem::take(&mut state.child_scopes),
                        expressions: std::mem::take(&mut state.column_references),
                        table_references: std::mem::take(&mut state.table_references),
                        result_targets: std::mem::take(&mut state.result_targets),
                        referenced_tables_by_name: Default::default(),
                    });
                    analyzed
                        .name_scopes_by_root_node
                        .insert(node_id as NodeId, scope_id);
                    state.child_scopes.push(scope_id);
                }

                _ => {}
            }

            states[node_id] = state;
        }
    }
}

fn is_literal_flag(nodes: &[Node], node_id: usize) -> bool {
    if matches!(
        nodes[node_id].attribute_key,
        AttributeKey::SqlResultTargetStar
            | AttributeKey::SqlFunctionStar
            | AttributeKey::SqlFunctionDistinct
            | AttributeKey::SqlSelectDistinct
            | AttributeKey::SqlColumnRefStar
            | AttributeKey::SqlConstCastValue
    ) {
        return true;
    }
    // Type modifiers are not value literals.
    let parent = nodes[node_id].parent as usize;
    parent != node_id && nodes[parent].attribute_key == AttributeKey::SqlDataTypeModifiers
}

fn add_expression(
    analyzed: &mut AnalyzedScript,
    ast_node_id: NodeId,
    location: Location,
    statement_id: u32,
    inner: ExpressionInner,
) -> u32 {
    let id = analyzed.expressions.len() as u32;
    analyzed.expressions.push(Expression {
        expression_id: ContextObjectId::new(analyzed.entry.catalog_entry_id, id),
        ast_node_id,
        location: Some(location),
        ast_statement_id: Some(statement_id),
        inner,
        is_constant: false,
        is_projection: false,
        is_restriction: false,
    });
    id
}

fn classify_operator(
    analyzed: &mut AnalyzedScript,
    ast_node_id: NodeId,
    location: Location,
    statement_id: u32,
    op: ExpressionOperator,
    args: &[Option<u32>],
) -> Option<u32> {
    let arg_is_column_ref = |idx: usize| -> bool {
        args.get(idx)
            .copied()
            .flatten()
            .is_some_and(|id| analyzed.expressions[id as usize].is_column_ref())
    };
    let arg_is_constant = |idx: usize| -> bool {
        args.get(idx)
            .copied()
            .flatten()
            .is_some_and(|id| analyzed.expressions[id as usize].is_constant)
    };
    let arg_is_projecting = |idx: usize| -> bool {
        args.get(idx).copied().flatten().is_some_and(|id| {
            let expr = &analyzed.expressions[id as usize];
            expr.is_column_ref() || expr.is_projection
        })
    };
    let all_constant = !args.is_empty() && (0..args.len()).all(arg_is_constant);

    let (inner, is_restriction, is_projection) = match op {
        ExpressionOperator::Equal
        | ExpressionOperator::NotEqual
        | ExpressionOperator::LessThan
        | ExpressionOperator::LessEqual
        | ExpressionOperator::GreaterThan
        | ExpressionOperator::GreaterEqual
        | ExpressionOperator::Like
        | ExpressionOperator::NotLike
        | ExpressionOperator::Ilike
        | ExpressionOperator::NotIlike
        | ExpressionOperator::SimilarTo
        | ExpressionOperator::NotSimilarTo
        | ExpressionOperator::Between
        | ExpressionOperator::NotBetween
        | ExpressionOperator::In
        | ExpressionOperator::NotIn
        | ExpressionOperator::IsNull
        | ExpressionOperator::IsNotNull => {
            let func = match op {
                ExpressionOperator::Equal => ComparisonFunction::Equal,
                ExpressionOperator::NotEqual => ComparisonFunction::NotEqual,
                ExpressionOperator::LessThan => ComparisonFunction::LessThan,
                ExpressionOperator::LessEqual => ComparisonFunction::LessEqual,
                ExpressionOperator::GreaterThan => ComparisonFunction::GreaterThan,
                ExpressionOperator::GreaterEqual => ComparisonFunction::GreaterEqual,
                ExpressionOperator::Like => ComparisonFunction::Like,
                ExpressionOperator::NotLike => ComparisonFunction::NotLike,
                ExpressionOperator::Ilike => ComparisonFunction::Ilike,
                ExpressionOperator::NotIlike => ComparisonFunction::NotIlike,
                ExpressionOperator::SimilarTo => ComparisonFunction::SimilarTo,
                ExpressionOperator::NotSimilarTo => ComparisonFunction::NotSimilarTo,
                ExpressionOperator::Between => ComparisonFunction::Between,
                ExpressionOperator::NotBetween => ComparisonFunction::NotBetween,
                ExpressionOperator::In => ComparisonFunction::In,
                ExpressionOperator::NotIn => ComparisonFunction::NotIn,
                ExpressionOperator::IsNull => ComparisonFunction::IsNull,
                _ => ComparisonFunction::IsNotNull,
            };
            // A comparison restricts a column when the other side is constant.
            let rest_constant = args.len() >= 2 && (1..args.len()).all(arg_is_constant);
            let single_column = args.len() == 1 && arg_is_column_ref(0);
            let (is_restriction, target_left) =
                if arg_is_column_ref(0) && (single_column || rest_constant) {
                    (true, true)
                } else if args.len() == 2 && arg_is_column_ref(1) && arg_is_constant(0) {
                    (true, false)
                } else {
                    (false, true)
                };
            (
                ExpressionInner::Comparison(Comparison {
                    func,
                    left_expression_id: args.first().copied().flatten(),
                    right_expression_id: args.get(1).copied().flatten(),
                    restriction_target_left: target_left,
                }),
                is_restriction,
                false,
            )
        }
        ExpressionOperator::And
        | ExpressionOperator::Or
        | ExpressionOperator::Plus
        | ExpressionOperator::Minus
        | ExpressionOperator::Multiply
        | ExpressionOperator::Divide
        | ExpressionOperator::Modulo
        | ExpressionOperator::Concat => {
            let func = match op {
                ExpressionOperator::And => BinaryExpressionFunction::And,
                ExpressionOperator::Or => BinaryExpressionFunction::Or,
                ExpressionOperator::Plus => BinaryExpressionFunction::Plus,
                ExpressionOperator::Minus => BinaryExpressionFunction::Minus,
                ExpressionOperator::Multiply => BinaryExpressionFunction::Multiply,
                ExpressionOperator::Divide => BinaryExpressionFunction::Divide,
                ExpressionOperator::Modulo => BinaryExpressionFunction::Modulo,
                _ => BinaryExpressionFunction::Concat,
            };
            let arithmetic = !matches!(
                func,
                BinaryExpressionFunction::And | BinaryExpressionFunction::Or
            );
            let left_projecting = arg_is_projecting(0);
            let right_projecting = args.len() >= 2 && arg_is_projecting(args.len() - 1);
            let is_projection = arithmetic && (left_projecting || right_projecting);
            (
                ExpressionInner::BinaryExpression(BinaryExpression {
                    func,
                    left_expression_id: args.first().copied().flatten(),
                    right_expression_id: args.last().copied().flatten(),
                    projection_target_left: left_projecting || !right_projecting,
                }),
                false,
                is_projection,
            )
        }
        // NOT and unary negation are not reified.
        _ => return None,
    };

    let id = add_expression(analyzed, ast_node_id, location, statement_id, inner);
    let expr = &mut analyzed.expressions[id as usize];
    expr.is_constant = all_constant;
    expr.is_restriction = is_restriction;
    expr.is_projection = is_projection;
    Some(id)
}

fn table_name_from_path(
    scanned: &ScannedScript,
    path: &NamePathInfo,
) -> Option<QualifiedTableName> {
    if path.names.is_empty() {
        return None;
    }
    let names = &path.names;
    let n = names.len();
    let table = name_text(scanned, names[n - 1].0);
    tag_name(scanned, names[n - 1].0, NameTags::TABLE_NAME);
    let schema = if n >= 2 {
        tag_name(scanned, names[n - 2].0, NameTags::SCHEMA_NAME);
        name_text(scanned, names[n - 2].0)
    } else {
        SmolStr::default()
    };
    let database = if n >= 3 {
        tag_name(scanned, names[n - 3].0, NameTags::DATABASE_NAME);
        name_text(scanned, names[n - 3].0)
    } else {
        SmolStr::default()
    };
    Some(QualifiedTableName {
        database_name: database,
        schema_name: schema,
        table_name: table,
    })
}

/// Register the database and schema of an explicitly qualified table ref.
/// The allocated ids are preliminary until the script is loaded.
fn register_explicit_schema(
    analyzed: &mut AnalyzedScript,
    catalog: &mut Catalog,
    scanned: &ScannedScript,
    path: &NamePathInfo,
    table_name: &QualifiedTableName,
) {
    if path.names.len() < 3 {
        return;
    }
    let db_name_id = path.names[path.names.len() - 3].0;
    let schema_name_id = path.names[path.names.len() - 2].0;
    let (database_id, schema_id) = register_schema_reference(
        analyzed,
        catalog,
        &table_name.database_name,
        &table_name.schema_name,
    );
    add_resolved_object(
        scanned,
        db_name_id,
        QualifiedCatalogObjectId::Database(database_id),
    );
    add_resolved_object(
        scanned,
        schema_name_id,
        QualifiedCatalogObjectId::Schema(database_id, schema_id),
    );
}

/// Register a (database, schema) pair in the analyzed entry, allocating
/// catalog ids on first sight.
fn register_schema_reference(
    analyzed: &mut AnalyzedScript,
    catalog: &mut Catalog,
    database_name: &SmolStr,
    schema_name: &SmolStr,
) -> (u32, u32) {
    let entry = &mut analyzed.entry;
    let database_id = match entry.databases_by_name.get(database_name) {
        Some(&idx) => entry.database_references[idx].catalog_database_id,
        None => {
            let id = catalog.allocate_database_id(database_name);
            entry.add_database_reference(DatabaseReference {
                catalog_database_id: id,
                database_name: database_name.clone(),
                database_alias: SmolStr::default(),
            });
            id
        }
    };
    let schema_id = match entry
        .schemas_by_qualified_name
        .get(&(database_name.clone(), schema_name.clone()))
    {
        Some(&idx) => entry.schema_references[idx].catalog_schema_id,
        None => {
            let id = catalog.allocate_schema_id(database_name, schema_name);
            entry.add_schema_reference(SchemaReference {
                catalog_database_id: database_id,
                catalog_schema_id: id,
                database_name: database_name.clone(),
                schema_name: schema_name.clone(),
            });
            id
        }
    };
    (database_id, schema_id)
}

fn declare_table(
    analyzed: &mut AnalyzedScript,
    catalog: &mut Catalog,
    scanned: &ScannedScript,
    path: &NamePathInfo,
    columns: Vec<(SmolStr, NodeId)>,
    ast_node_id: NodeId,
    statement_id: u32,
) {
    if path.names.is_empty() {
        return;
    }
    let names = &path.names;
    let n = names.len();
    let table_text = name_text(scanned, names[n - 1].0);
    tag_name(scanned, names[n - 1].0, NameTags::TABLE_NAME);

    // Unqualified names are qualified with the catalog defaults.
    let mut registry = scanned.name_registry.borrow_mut();
    let (db_text, db_name_id, schema_text, schema_name_id) = match n {
        1 => {
            let db = catalog.default_database_name().clone();
            let schema = catalog.default_schema_name().clone();
            let db_id = registry.register(&db, Location::default(), NameTags::DATABASE_NAME);
            let schema_id =
                registry.register(&schema, Location::default(), NameTags::SCHEMA_NAME);
            (db, db_id, schema, schema_id)
        }
        2 => {
            let db = catalog.default_database_name().clone();
            let db_id = registry.register(&db, Location::default(), NameTags::DATABASE_NAME);
            let schema_id = names[0].0;
            registry.get_mut(schema_id).coarse_analyzer_tags |= NameTags::SCHEMA_NAME;
            (db, db_id, registry.get(schema_id).text.clone(), schema_id)
        }
        _ => {
            let db_id = names[n - 3].0;
            let schema_id = names[n - 2].0;
            registry.get_mut(db_id).coarse_analyzer_tags |= NameTags::DATABASE_NAME;
            registry.get_mut(schema_id).coarse_analyzer_tags |= NameTags::SCHEMA_NAME;
            (
                registry.get(db_id).text.clone(),
                db_id,
                registry.get(schema_id).text.clone(),
                schema_id,
            )
        }
    };
    drop(registry);

    let (database_id, schema_id) =
        register_schema_reference(analyzed, catalog, &db_text, &schema_text);
    add_resolved_object(
        scanned,
        db_name_id,
        QualifiedCatalogObjectId::Database(database_id),
    );
    add_resolved_object(
        scanned,
        schema_name_id,
        QualifiedCatalogObjectId::Schema(database_id, schema_id),
    );

    let qualified = QualifiedTableName {
        database_name: db_text,
        schema_name: schema_text,
        table_name: table_text,
    };
    if analyzed
        .entry
        .tables_by_qualified_name
        .contains_key(&qualified.key())
    {
        analyzed.errors.push(AnalyzerError {
            error_type: AnalyzerErrorType::DuplicateTableName,
            location: Some(analyzed.parsed_script.nodes[ast_node_id as usize].location),
            message: format!("duplicate table name '{}'", qualified.table_name),
        });
        return;
    }

    let table_idx = analyzed.entry.table_declarations.len() as u32;
    let table_id = ContextObjectId::new(analyzed.entry.catalog_entry_id, table_idx);
    add_resolved_object(
        scanned,
        names[n - 1].0,
        QualifiedCatalogObjectId::Table(table_id),
    );

    let mut table_columns = Vec::with_capacity(columns.len());
    let mut columns_by_name = ahash::AHashMap::with_capacity(columns.len());
    for (idx, (column_name, column_node)) in columns.into_iter().enumerate() {
        columns_by_name
            .entry(column_name.clone())
            .or_insert(idx as u32);
        // The column name is interned; find it to attach the back-ref.
        let name_id = scanned
            .name_registry
            .borrow()
            .find(&column_name)
            .map(|name| name.name_id);
        if let Some(name_id) = name_id {
            add_resolved_object(
                scanned,
                name_id,
                QualifiedCatalogObjectId::TableColumn(table_id, idx as u32),
            );
        }
        table_columns.push(TableColumn {
            column_index: idx as u32,
            ast_node_id: Some(column_node),
            column_name,
        });
    }

    analyzed.entry.declare_table(TableDeclaration {
        catalog_database_id: database_id,
        catalog_schema_id: schema_id,
        catalog_table_id: table_id,
        ast_node_id: Some(ast_node_id),
        ast_statement_id: Some(statement_id),
        ast_scope_root: None,
        table_name: qualified,
        table_columns,
        table_columns_by_name: columns_by_name,
    });
}
