use crate::parser::keywords::Keyword;
use crate::text::Location;
use crate::text::names::NameId;

/// The kind of a scanner symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Eof,
    /// An identifier, raw or double-quoted, carrying its interned name.
    Ident(NameId),
    Keyword(Keyword),
    LiteralInteger,
    LiteralFloat,
    LiteralString,
    LiteralBitString,
    LiteralHexString,
    /// A parameter reference `$N`.
    Param,
    /// An inner dot without trailing whitespace, as in `a.b`.
    Dot,
    /// A dot followed by whitespace or EOF, as in `a. `.
    DotTrailing,
    Comma,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    QuestionMark,
    Circumflex,
    Star,
    Plus,
    Minus,
    Slash,
    Percent,
    Equals,
    NotEquals,
    LessThan,
    LessEquals,
    GreaterThan,
    GreaterEquals,
    Concat,
}

/// A tagged token produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerSymbol {
    pub kind: SymbolKind,
    pub location: Location,
}

impl ScannerSymbol {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, SymbolKind::Eof)
    }

    pub fn is_dot(&self) -> bool {
        matches!(self.kind, SymbolKind::Dot)
    }

    pub fn is_trailing_dot(&self) -> bool {
        matches!(self.kind, SymbolKind::DotTrailing)
    }

    pub fn ident(&self) -> Option<NameId> {
        match self.kind {
            SymbolKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            SymbolKind::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }
}
