use crate::text::Location;

pub type NodeId = u32;
pub type StatementId = u32;

/// The parent id of a node that has not been adopted yet.
/// The parser patches parents when the enclosing node materializes; the
/// statement root keeps pointing at itself.
pub const NO_PARENT: u32 = u32::MAX;

/// The type of an AST node.
///
/// The variants partition into the sentinel, leaves, arrays, enums and
/// objects. Enum and object ranges are contiguous so that dispatch can
/// compare against the range thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u16)]
pub enum NodeType {
    None = 0,

    // Leaves
    Name,
    Bool,
    Operator,
    LiteralNull,
    LiteralInteger,
    LiteralFloat,
    LiteralString,
    LiteralInterval,

    Array,

    // Enums
    EnumSqlExpressionOperator,
    EnumSqlJoinType,
    EnumSqlOrderDirection,
    EnumSqlOrderNullRule,
    EnumSqlColumnConstraint,
    EnumSqlTempType,
    EnumSqlKnownFunction,
    EnumSqlIntervalType,

    // Objects
    ObjectSqlSelect,
    ObjectSqlResultTarget,
    ObjectSqlTableRef,
    ObjectSqlJoinedTable,
    ObjectSqlColumnRef,
    ObjectSqlNaryExpression,
    ObjectSqlFunctionCall,
    ObjectSqlCast,
    ObjectSqlConstIntervalCast,
    ObjectSqlOrderSpec,
    ObjectSqlCte,
    ObjectSqlDataType,
    ObjectSqlColumnDef,
    ObjectSqlCreate,
    ObjectSqlCreateAs,
    ObjectExtSet,
    ObjectExtTrailingDot,
}

impl NodeType {
    const FIRST_ENUM: u16 = NodeType::EnumSqlExpressionOperator as u16;
    const FIRST_OBJECT: u16 = NodeType::ObjectSqlSelect as u16;

    pub fn is_enum(&self) -> bool {
        let v = *self as u16;
        v >= Self::FIRST_ENUM && v < Self::FIRST_OBJECT
    }

    pub fn is_object(&self) -> bool {
        (*self as u16) >= Self::FIRST_OBJECT
    }

    /// Does this node type list children in `children_begin_or_value`?
    pub fn has_children(&self) -> bool {
        *self == NodeType::Array || self.is_object()
    }
}

/// The role of a node within its parent object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u16)]
pub enum AttributeKey {
    None = 0,

    SqlSelectWithCtes,
    SqlSelectDistinct,
    SqlSelectTargets,
    SqlSelectFrom,
    SqlSelectWhere,
    SqlSelectGroupBy,
    SqlSelectHaving,
    SqlSelectOrderBy,
    SqlSelectLimit,
    SqlSelectOffset,

    SqlResultTargetValue,
    SqlResultTargetName,
    SqlResultTargetStar,

    SqlTablerefName,
    SqlTablerefAlias,
    SqlTablerefSelect,

    SqlJoinType,
    SqlJoinLeft,
    SqlJoinRight,
    SqlJoinOn,
    SqlJoinUsing,

    SqlColumnRefPath,
    SqlColumnRefStar,

    SqlExpressionOperator,
    SqlExpressionArgs,

    SqlFunctionName,
    SqlFunctionKnownName,
    SqlFunctionDistinct,
    SqlFunctionStar,
    SqlFunctionArguments,

    SqlCastValue,
    SqlCastType,

    SqlConstCastValue,
    SqlConstCastInterval,

    SqlOrderValue,
    SqlOrderDirection,
    SqlOrderNulls,

    SqlCteName,
    SqlCteColumns,
    SqlCteStatement,

    SqlDataTypeName,
    SqlDataTypeModifiers,

    SqlColumnDefName,
    SqlColumnDefType,
    SqlColumnDefConstraints,

    SqlCreateName,
    SqlCreateColumns,
    SqlCreateTemp,
    SqlCreateAsName,
    SqlCreateAsColumns,
    SqlCreateAsStatement,

    ExtSetKey,
    ExtSetValue,
}

/// A fixed-size AST node record.
///
/// `children_begin_or_value` carries the first child id for arrays and
/// objects, the interned name id for names, the enum value for enum nodes
/// and the boolean value for bools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Node {
    pub location: Location,
    pub node_type: NodeType,
    pub attribute_key: AttributeKey,
    pub parent: u32,
    pub children_begin_or_value: u32,
    pub children_count: u32,
}

impl Node {
    pub fn new(
        location: Location,
        node_type: NodeType,
        children_begin_or_value: u32,
        children_count: u32,
    ) -> Self {
        Self {
            location,
            node_type,
            attribute_key: AttributeKey::None,
            parent: NO_PARENT,
            children_begin_or_value,
            children_count,
        }
    }

    pub fn with_attribute(mut self, key: AttributeKey) -> Self {
        self.attribute_key = key;
        self
    }

    pub fn children(&self) -> std::ops::Range<usize> {
        if self.node_type.has_children() {
            let begin = self.children_begin_or_value as usize;
            begin..begin + self.children_count as usize
        } else {
            0..0
        }
    }
}

/// The type of a parsed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum StatementType {
    None,
    Select,
    CreateTable,
    CreateTableAs,
    Set,
}

/// A statement with its contiguous node range.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Statement {
    pub statement_type: StatementType,
    pub root: NodeId,
    pub nodes_begin: usize,
    pub node_count: usize,
}

macro_rules! value_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::FromRepr, strum_macros::IntoStaticStr)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize))]
        #[repr(u32)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn from_node_value(value: u32) -> Option<Self> {
                Self::from_repr(value)
            }
        }
    };
}

value_enum! {
    /// The operator of an n-ary expression node.
    ExpressionOperator {
        And,
        Or,
        Not,
        Negate,
        Plus,
        Minus,
        Multiply,
        Divide,
        Modulo,
        Concat,
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
}

value_enum! {
    JoinType {
        None,
        Inner,
        Left,
        Right,
        Full,
        Cross,
    }
}

value_enum! {
    OrderDirection {
        Ascending,
        Descending,
    }
}

value_enum! {
    OrderNullRule {
        NullsFirst,
        NullsLast,
    }
}

value_enum! {
    ColumnConstraint {
        NotNull,
        Null,
        PrimaryKey,
        Unique,
        Default,
        Check,
    }
}

value_enum! {
    TempType {
        None,
        Temp,
    }
}

value_enum! {
    /// Functions the analyzer knows by name.
    KnownFunction {
        Unknown,
        Avg,
        Coalesce,
        Count,
        Lower,
        Max,
        Min,
        Substring,
        Sum,
        Trim,
        Upper,
    }
}

impl KnownFunction {
    /// Classify a case-folded function name.
    pub fn find(folded: &str) -> Option<KnownFunction> {
        Some(match folded {
            "avg" => KnownFunction::Avg,
            "coalesce" => KnownFunction::Coalesce,
            "count" => KnownFunction::Count,
            "lower" => KnownFunction::Lower,
            "max" => KnownFunction::Max,
            "min" => KnownFunction::Min,
            "substring" => KnownFunction::Substring,
            "sum" => KnownFunction::Sum,
            "trim" => KnownFunction::Trim,
            "upper" => KnownFunction::Upper,
            _ => return None,
        })
    }
}

value_enum! {
    IntervalType {
        Year,
        Month,
        Day,
        Hour,
        Minute,
        Second,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_ranges() {
        assert!(!NodeType::None.is_enum());
        assert!(!NodeType::Name.is_object());
        assert!(NodeType::EnumSqlJoinType.is_enum());
        assert!(!NodeType::EnumSqlJoinType.is_object());
        assert!(NodeType::ObjectSqlSelect.is_object());
        assert!(!NodeType::ObjectSqlSelect.is_enum());
        assert!(NodeType::Array.has_children());
        assert!(NodeType::ObjectExtSet.has_children());
        assert!(!NodeType::Name.has_children());
    }

    #[test]
    fn test_value_enum_roundtrip() {
        let op = ExpressionOperator::LessEqual;
        assert_eq!(ExpressionOperator::from_node_value(op as u32), Some(op));
        assert_eq!(ExpressionOperator::from_node_value(9999), None);
    }
}
