/// A keyword category, mirroring the grammar's keyword classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordCategory {
    Dashql,
    SqlColumnName,
    SqlReserved,
    SqlTypeFunc,
    SqlUnreserved,
}

/// How likely a user wants to complete a keyword.
/// The added score is chosen so small that it only influences the ranking
/// among similarly ranked keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordPrevalence {
    Default,
    Popular,
    VeryPopular,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum_macros::IntoStaticStr,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    All,
    And,
    As,
    Asc,
    Between,
    Bigint,
    Boolean,
    By,
    Case,
    Cast,
    Char,
    Character,
    Check,
    Collate,
    Constraint,
    Create,
    Cross,
    Date,
    Day,
    Decimal,
    Default,
    Desc,
    Distinct,
    Double,
    Else,
    End,
    Except,
    Exists,
    False,
    First,
    Float,
    From,
    Full,
    Group,
    Having,
    Hour,
    If,
    Ilike,
    In,
    Inner,
    Insert,
    Int,
    Integer,
    Intersect,
    Interval,
    Into,
    Is,
    Join,
    Key,
    Last,
    Left,
    Like,
    Limit,
    Minute,
    Month,
    Not,
    Null,
    Nulls,
    Numeric,
    Offset,
    On,
    Or,
    Order,
    Ordinality,
    Outer,
    Partition,
    Precision,
    Primary,
    Real,
    Recursive,
    References,
    Right,
    Second,
    Select,
    Set,
    Similar,
    Smallint,
    Table,
    Temp,
    Temporary,
    Text,
    Then,
    Time,
    Timestamp,
    To,
    True,
    Union,
    Unique,
    Using,
    Values,
    Varchar,
    View,
    When,
    Where,
    With,
    Without,
    Year,
    Zone,

    /// NOT followed by BETWEEN/IN/LIKE/ILIKE/SIMILAR, rewritten by the scanner.
    NotLa,
    /// NULLS followed by FIRST/LAST, rewritten by the scanner.
    NullsLa,
    /// WITH followed by TIME/ORDINALITY, rewritten by the scanner.
    WithLa,
}

impl Keyword {
    /// The canonical lower-case spelling.
    pub fn name(&self) -> &'static str {
        match self {
            Keyword::NotLa => "not",
            Keyword::NullsLa => "nulls",
            Keyword::WithLa => "with",
            other => other.into(),
        }
    }

    /// Find a keyword by its case-folded text.
    pub fn find(folded: &str) -> Option<&'static KeywordInfo> {
        KEYWORDS
            .binary_search_by(|entry| entry.name.cmp(folded))
            .ok()
            .map(|idx| &KEYWORDS[idx])
    }

    pub fn category(&self) -> KeywordCategory {
        KEYWORDS
            .iter()
            .find(|entry| entry.keyword == *self)
            .map(|entry| entry.category)
            .unwrap_or(KeywordCategory::SqlReserved)
    }

    pub fn prevalence(&self) -> KeywordPrevalence {
        match self {
            Keyword::And
            | Keyword::From
            | Keyword::Group
            | Keyword::Order
            | Keyword::Select
            | Keyword::Where => KeywordPrevalence::VeryPopular,
            Keyword::As
            | Keyword::Asc
            | Keyword::By
            | Keyword::Case
            | Keyword::Cast
            | Keyword::Desc
            | Keyword::End
            | Keyword::Like
            | Keyword::Limit
            | Keyword::Offset
            | Keyword::Or
            | Keyword::Set
            | Keyword::Then
            | Keyword::When
            | Keyword::With => KeywordPrevalence::Popular,
            _ => KeywordPrevalence::Default,
        }
    }
}

/// A keyword table entry.
#[derive(Debug)]
pub struct KeywordInfo {
    pub name: &'static str,
    pub keyword: Keyword,
    pub category: KeywordCategory,
}

macro_rules! kw {
    ($name:literal, $keyword:ident, $category:ident) => {
        KeywordInfo {
            name: $name,
            keyword: Keyword::$keyword,
            category: KeywordCategory::$category,
        }
    };
}

/// All scannable keywords, sorted by name for binary search.
/// The lookahead rewrites (NOT_LA et al) are synthesized by the scanner and
/// deliberately absent here.
static KEYWORDS: &[KeywordInfo] = &[
    kw!("all", All, SqlReserved),
    kw!("and", And, SqlReserved),
    kw!("as", As, SqlReserved),
    kw!("asc", Asc, SqlReserved),
    kw!("between", Between, SqlColumnName),
    kw!("bigint", Bigint, SqlColumnName),
    kw!("boolean", Boolean, SqlColumnName),
    kw!("by", By, SqlUnreserved),
    kw!("case", Case, SqlReserved),
    kw!("cast", Cast, SqlReserved),
    kw!("char", Char, SqlColumnName),
    kw!("character", Character, SqlColumnName),
    kw!("check", Check, SqlReserved),
    kw!("collate", Collate, SqlReserved),
    kw!("constraint", Constraint, SqlReserved),
    kw!("create", Create, SqlReserved),
    kw!("cross", Cross, SqlTypeFunc),
    kw!("date", Date, SqlColumnName),
    kw!("day", Day, SqlUnreserved),
    kw!("decimal", Decimal, SqlColumnName),
    kw!("default", Default, SqlReserved),
    kw!("desc", Desc, SqlReserved),
    kw!("distinct", Distinct, SqlReserved),
    kw!("double", Double, SqlColumnName),
    kw!("else", Else, SqlReserved),
    kw!("end", End, SqlReserved),
    kw!("except", Except, SqlReserved),
    kw!("exists", Exists, SqlColumnName),
    kw!("false", False, SqlReserved),
    kw!("first", First, SqlUnreserved),
    kw!("float", Float, SqlColumnName),
    kw!("from", From, SqlReserved),
    kw!("full", Full, SqlTypeFunc),
    kw!("group", Group, SqlReserved),
    kw!("having", Having, SqlReserved),
    kw!("hour", Hour, SqlUnreserved),
    kw!("if", If, SqlUnreserved),
    kw!("ilike", Ilike, SqlTypeFunc),
    kw!("in", In, SqlReserved),
    kw!("inner", Inner, SqlTypeFunc),
    kw!("insert", Insert, SqlUnreserved),
    kw!("int", Int, SqlColumnName),
    kw!("integer", Integer, SqlColumnName),
    kw!("intersect", Intersect, SqlReserved),
    kw!("interval", Interval, SqlColumnName),
    kw!("into", Into, SqlReserved),
    kw!("is", Is, SqlTypeFunc),
    kw!("join", Join, SqlTypeFunc),
    kw!("key", Key, SqlUnreserved),
    kw!("last", Last, SqlUnreserved),
    kw!("left", Left, SqlTypeFunc),
    kw!("like", Like, SqlTypeFunc),
    kw!("limit", Limit, SqlReserved),
    kw!("minute", Minute, SqlUnreserved),
    kw!("month", Month, SqlUnreserved),
    kw!("not", Not, SqlReserved),
    kw!("null", Null, SqlReserved),
    kw!("nulls", Nulls, SqlUnreserved),
    kw!("numeric", Numeric, SqlColumnName),
    kw!("offset", Offset, SqlReserved),
    kw!("on", On, SqlReserved),
    kw!("or", Or, SqlReserved),
    kw!("order", Order, SqlReserved),
    kw!("ordinality", Ordinality, SqlUnreserved),
    kw!("outer", Outer, SqlTypeFunc),
    kw!("partition", Partition, SqlUnreserved),
    kw!("precision", Precision, SqlColumnName),
    kw!("primary", Primary, SqlReserved),
    kw!("real", Real, SqlColumnName),
    kw!("recursive", Recursive, SqlUnreserved),
    kw!("references", References, SqlReserved),
    kw!("right", Right, SqlTypeFunc),
    kw!("second", Second, SqlUnreserved),
    kw!("select", Select, SqlReserved),
    kw!("set", Set, SqlUnreserved),
    kw!("similar", Similar, SqlTypeFunc),
    kw!("smallint", Smallint, SqlColumnName),
    kw!("table", Table, SqlReserved),
    kw!("temp", Temp, SqlUnreserved),
    kw!("temporary", Temporary, SqlUnreserved),
    kw!("text", Text, SqlUnreserved),
    kw!("then", Then, SqlReserved),
    kw!("time", Time, SqlColumnName),
    kw!("timestamp", Timestamp, SqlColumnName),
    kw!("to", To, SqlReserved),
    kw!("true", True, SqlReserved),
    kw!("union", Union, SqlReserved),
    kw!("unique", Unique, SqlReserved),
    kw!("using", Using, SqlReserved),
    kw!("values", Values, SqlColumnName),
    kw!("varchar", Varchar, SqlColumnName),
    kw!("view", View, SqlUnreserved),
    kw!("when", When, SqlReserved),
    kw!("where", Where, SqlReserved),
    kw!("with", With, SqlReserved),
    kw!("without", Without, SqlUnreserved),
    kw!("year", Year, SqlUnreserved),
    kw!("zone", Zone, SqlUnreserved),
];

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_table_is_sorted() {
        for pair in KEYWORDS.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} >= {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn test_find() {
        assert_eq!(Keyword::find("select").unwrap().keyword, Keyword::Select);
        assert_eq!(Keyword::find("with").unwrap().keyword, Keyword::With);
        assert!(Keyword::find("SELECT").is_none(), "lookup expects folded text");
        assert!(Keyword::find("frobnicate").is_none());
    }

    #[test]
    fn test_synthetic_names() {
        assert_eq!(Keyword::NotLa.name(), "not");
        assert_eq!(Keyword::NullsLa.name(), "nulls");
        assert_eq!(Keyword::WithLa.name(), "with");
        assert_eq!(Keyword::Select.name(), "select");
    }
}
