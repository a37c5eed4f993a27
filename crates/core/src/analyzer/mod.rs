pub(crate) mod name_resolution;
pub(crate) mod resolver;

use std::cell::{OnceCell, Ref};
use std::rc::Rc;

use ahash::AHashMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::catalog::{
    Catalog, CatalogDatabaseId, CatalogEntry, CatalogEntryData, CatalogSchemaId, CatalogVersion,
    ContextObjectId, QualifiedTableName, TableDeclaration,
};
use crate::parser::ast::{IntervalType, KnownFunction, NodeId};
use crate::parser::parser::ParsedScript;
use crate::text::Location;
use crate::text::names::{NameRegistry, NameSearchIndex, index_name_suffixes};

/// Semantic flags attached per AST node, consumed by the snippet extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SemanticNodeMarker {
    #[default]
    None,
    ColumnReference,
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AnalyzerErrorType {
    DuplicateTableName,
}

#[derive(Debug, Clone)]
pub struct AnalyzerError {
    pub error_type: AnalyzerErrorType,
    pub location: Option<Location>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LiteralType {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Interval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ComparisonFunction {
    Unknown,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Like,
    NotLike,
    Ilike,
    NotIlike,
    SimilarTo,
    NotSimilarTo,
    Between,
    NotBetween,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum BinaryExpressionFunction {
    Unknown,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

#[derive(Debug, Clone)]
pub struct UnresolvedColumnRef {
    pub column_name_ast_node_id: NodeId,
    pub table_alias: Option<SmolStr>,
    pub column_name: SmolStr,
    pub ast_scope_root: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ResolvedColumnRef {
    pub column_name_ast_node_id: NodeId,
    pub table_alias: Option<SmolStr>,
    pub column_name: SmolStr,
    pub ast_scope_root: Option<NodeId>,
    pub catalog_database_id: CatalogDatabaseId,
    pub catalog_schema_id: CatalogSchemaId,
    pub catalog_table_id: ContextObjectId,
    pub table_column_id: u32,
    pub referenced_catalog_version: CatalogVersion,
}

#[derive(Debug, Clone)]
pub struct LiteralExpression {
    pub literal_type: LiteralType,
    pub raw_value: SmolStr,
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub func: ComparisonFunction,
    pub left_expression_id: Option<u32>,
    pub right_expression_id: Option<u32>,
    pub restriction_target_left: bool,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub func: BinaryExpressionFunction,
    pub left_expression_id: Option<u32>,
    pub right_expression_id: Option<u32>,
    pub projection_target_left: bool,
}

#[derive(Debug, Clone)]
pub enum FunctionName {
    Known(KnownFunction),
    Named(SmolStr),
}

#[derive(Debug, Clone)]
pub enum FunctionArguments {
    Star,
    List(Vec<u32>),
}

#[derive(Debug, Clone)]
pub struct FunctionCallExpression {
    pub name: FunctionName,
    pub distinct: bool,
    pub arguments: FunctionArguments,
}

#[derive(Debug, Clone)]
pub struct ConstIntervalCast {
    pub raw_value: SmolStr,
    pub interval: Option<IntervalType>,
}

#[derive(Debug, Clone)]
pub enum ExpressionInner {
    UnresolvedColumnRef(UnresolvedColumnRef),
    ResolvedColumnRef(ResolvedColumnRef),
    Literal(LiteralExpression),
    Comparison(Comparison),
    BinaryExpression(BinaryExpression),
    FunctionCall(FunctionCallExpression),
    ConstIntervalCast(ConstIntervalCast),
}

/// A reified expression.
#[derive(Debug, Clone)]
pub struct Expression {
    pub expression_id: ContextObjectId,
    pub ast_node_id: NodeId,
    pub location: Option<Location>,
    pub ast_statement_id: Option<u32>,
    pub inner: ExpressionInner,
    pub is_constant: bool,
    pub is_projection: bool,
    pub is_restriction: bool,
}

impl Expression {
    pub fn is_column_ref(&self) -> bool {
        matches!(
            self.inner,
            ExpressionInner::UnresolvedColumnRef(_) | ExpressionInner::ResolvedColumnRef(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedTableEntry {
    pub table_name: QualifiedTableName,
    pub catalog_database_id: CatalogDatabaseId,
    pub catalog_schema_id: CatalogSchemaId,
    pub catalog_table_id: ContextObjectId,
    pub referenced_catalog_version: CatalogVersion,
}

#[derive(Debug, Clone)]
pub struct UnresolvedRelation {
    pub table_name_ast_node_id: NodeId,
    pub table_name: QualifiedTableName,
}

#[derive(Debug, Clone)]
pub struct ResolvedRelation {
    pub table_name_ast_node_id: NodeId,
    pub selected: ResolvedTableEntry,
    pub alternatives: Vec<ResolvedTableEntry>,
}

#[derive(Debug, Clone, Default)]
pub enum TableReferenceInner {
    /// A table ref without a name, e.g. a subquery.
    #[default]
    None,
    Unresolved(UnresolvedRelation),
    Resolved(ResolvedRelation),
}

/// A table reference in a FROM clause.
#[derive(Debug, Clone)]
pub struct TableReference {
    pub table_reference_id: ContextObjectId,
    pub ast_node_id: NodeId,
    pub location: Option<Location>,
    pub ast_statement_id: Option<u32>,
    pub ast_scope_root: Option<NodeId>,
    pub alias_name: Option<SmolStr>,
    pub inner: TableReferenceInner,
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ResultTarget {
    Star,
    Unnamed(u32),
    Named(u32),
}

/// A naming scope: the tables and column references visible inside one
/// scope-introducing AST node.
#[derive(Debug)]
pub struct NameScope {
    pub name_scope_id: u32,
    pub ast_node_id: NodeId,
    pub ast_statement_id: Option<u32>,
    pub parent_scope: Option<u32>,
    pub child_scopes: Vec<u32>,
    /// Expression ids of the column references in this scope.
    pub expressions: Vec<u32>,
    pub table_references: Vec<u32>,
    pub result_targets: Vec<ResultTarget>,
    /// The named tables in scope, keyed by alias or unqualified table name.
    pub referenced_tables_by_name: AHashMap<SmolStr, ContextObjectId>,
}

/// A restriction or transform anchored at a resolved table column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnUse {
    pub catalog_table_id: ContextObjectId,
    pub table_column_id: u32,
    pub expression_id: u32,
    pub root_ast_node_id: NodeId,
}

/// A schema discovered while dot-completing a database name.
#[derive(Debug, Clone)]
pub struct DiscoveredSchema {
    pub catalog_database_id: CatalogDatabaseId,
    pub catalog_schema_id: CatalogSchemaId,
    pub database_name: SmolStr,
    pub schema_name: SmolStr,
    pub through_catalog: bool,
}

/// The analyzed script. Also a catalog entry.
#[derive(Debug)]
pub struct AnalyzedScript {
    pub parsed_script: Rc<ParsedScript>,
    pub catalog_version: CatalogVersion,
    pub entry: CatalogEntryData,
    pub errors: Vec<AnalyzerError>,
    pub table_references: Vec<TableReference>,
    pub expressions: Vec<Expression>,
    pub name_scopes: Vec<NameScope>,
    pub name_scopes_by_root_node: FxHashMap<NodeId, u32>,
    pub table_refs_by_ast_node: FxHashMap<NodeId, u32>,
    pub column_refs_by_ast_node: FxHashMap<NodeId, u32>,
    pub node_markers: Vec<SemanticNodeMarker>,
    pub column_restrictions: Vec<ColumnUse>,
    pub column_transforms: Vec<ColumnUse>,
    name_search_index: OnceCell<NameSearchIndex>,
}

impl AnalyzedScript {
    pub(crate) fn new(parsed_script: Rc<ParsedScript>) -> Self {
        let node_count = parsed_script.nodes.len();
        let catalog_entry_id = parsed_script.catalog_entry_id;
        Self {
            parsed_script,
            catalog_version: 0,
            entry: CatalogEntryData::new(catalog_entry_id),
            errors: Vec::new(),
            table_references: Vec::new(),
            expressions: Vec::new(),
            name_scopes: Vec::new(),
            name_scopes_by_root_node: FxHashMap::default(),
            table_refs_by_ast_node: FxHashMap::default(),
            column_refs_by_ast_node: FxHashMap::default(),
            node_markers: vec![SemanticNodeMarker::None; node_count],
            column_restrictions: Vec::new(),
            column_transforms: Vec::new(),
            name_search_index: OnceCell::new(),
        }
    }

    /// Walk the parent chain from a node, collecting the node path and the
    /// name scopes rooted along it, innermost first.
    pub fn follow_path_upwards(&self, ast_node_id: NodeId) -> (Vec<NodeId>, Vec<u32>) {
        let nodes = &self.parsed_script.nodes;
        let mut path = Vec::new();
        let mut scopes = Vec::new();
        let mut iter = ast_node_id as usize;
        loop {
            path.push(iter as NodeId);
            if let Some(&scope) = self.name_scopes_by_root_node.get(&(iter as NodeId)) {
                scopes.push(scope);
            }
            let parent = nodes[iter].parent as usize;
            if parent == iter || parent >= nodes.len() {
                break;
            }
            iter = parent;
        }
        (path, scopes)
    }

    /// All schemas named under a database, in this entry and across the
    /// catalog. The flag marks hits from other entries.
    pub fn resolve_database_schemas_with_catalog(
        &self,
        catalog: &Catalog,
        database_name: &str,
        out: &mut Vec<DiscoveredSchema>,
    ) {
        // This entry may not have been added to the catalog yet, so the own
        // references come first.
        for reference in &self.entry.schema_references {
            if reference.database_name == database_name {
                out.push(DiscoveredSchema {
                    catalog_database_id: reference.catalog_database_id,
                    catalog_schema_id: reference.catalog_schema_id,
                    database_name: reference.database_name.clone(),
                    schema_name: reference.schema_name.clone(),
                    through_catalog: false,
                });
            }
        }
        for ((db_name, _), declaration) in catalog
            .schemas()
            .range((SmolStr::new(database_name), SmolStr::default())..)
        {
            if db_name != database_name {
                break;
            }
            out.push(DiscoveredSchema {
                catalog_database_id: declaration.catalog_database_id,
                catalog_schema_id: declaration.catalog_schema_id,
                database_name: declaration.database_name.clone(),
                schema_name: declaration.schema_name.clone(),
                through_catalog: true,
            });
        }
    }

    /// All tables under a schema name (optionally database-qualified), in
    /// this entry and across the catalog.
    pub fn resolve_schema_tables_with_catalog<'a>(
        &'a self,
        catalog: &'a Catalog,
        database_name: Option<&str>,
        schema_name: &str,
        out: &mut Vec<(&'a TableDeclaration, bool)>,
    ) {
        let mut own = Vec::new();
        self.entry
            .resolve_tables_in_schema(schema_name, database_name, &mut own, usize::MAX);
        out.extend(own.into_iter().map(|t| (t, false)));

        for (entry_id, entry, _) in catalog.iterate_ranked() {
            if entry_id == self.entry.catalog_entry_id {
                continue;
            }
            let mut hits = Vec::new();
            entry.entry_data().resolve_tables_in_schema(
                schema_name,
                database_name,
                &mut hits,
                usize::MAX,
            );
            out.extend(hits.into_iter().map(|t| (t, true)));
        }
    }

    /// All (table, column) pairs matching a column name, in this entry and
    /// across the catalog.
    pub fn resolve_table_columns_with_catalog<'a>(
        &'a self,
        catalog: &'a Catalog,
        column_name: &str,
        out: &mut Vec<(&'a TableDeclaration, u32)>,
    ) {
        for (entry_id, entry, _) in catalog.iterate_ranked() {
            if entry_id == self.entry.catalog_entry_id {
                continue;
            }
            entry.entry_data().resolve_table_columns(column_name, out);
        }
        self.entry.resolve_table_columns(column_name, out);
    }

    pub fn byte_size(&self) -> usize {
        self.entry.byte_size()
            + self.table_references.len() * std::mem::size_of::<TableReference>()
            + self.expressions.len() * std::mem::size_of::<Expression>()
            + self.name_scopes.len() * std::mem::size_of::<NameScope>()
    }

    pub fn name_search_index_size(&self) -> usize {
        self.name_search_index.get().map_or(0, |index| index.len())
    }
}

impl CatalogEntry for AnalyzedScript {
    fn entry_data(&self) -> &CatalogEntryData {
        &self.entry
    }

    fn names(&self) -> Ref<'_, NameRegistry> {
        self.parsed_script.scanned_script.name_registry.borrow()
    }

    fn name_search_index(&self) -> &NameSearchIndex {
        self.name_search_index.get_or_init(|| {
            let mut index = NameSearchIndex::new();
            for name in self.names().iter() {
                index_name_suffixes(&mut index, name);
            }
            index
        })
    }
}

/// Run the analyzer pipeline over a parsed script.
///
/// The catalog is needed mutably for preliminary database/schema id
/// allocation; resolution afterwards only reads it.
pub fn analyze(parsed: &Rc<ParsedScript>, catalog: &mut Catalog) -> AnalyzedScript {
    let mut analyzed = AnalyzedScript::new(parsed.clone());
    name_resolution::run(&mut analyzed, catalog);
    resolver::resolve_table_refs(&mut analyzed, catalog);
    resolver::resolve_column_refs(&mut analyzed, catalog);
    resolver::collect_column_uses(&mut analyzed);
    analyzed.catalog_version = catalog.version();
    log::debug!(
        "analyzed script {}: {} tables, {} table refs, {} expressions, {} scopes",
        analyzed.entry.catalog_entry_id,
        analyzed.entry.table_declarations.len(),
        analyzed.table_references.len(),
        analyzed.expressions.len(),
        analyzed.name_scopes.len(),
    );
    analyzed
}
