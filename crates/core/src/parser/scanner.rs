use std::cell::RefCell;

use crate::catalog::CatalogEntryId;
use crate::parser::keywords::Keyword;
use crate::parser::token::{ScannerSymbol, SymbolKind};
use crate::text::Location;
use crate::text::names::{NameRegistry, NameTags};
use crate::text::rope::TextVersion;
use crate::utils::fold_case;

/// Where a text offset sits relative to a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RelativePosition {
    NewSymbolBefore,
    BeginOfSymbol,
    MidOfSymbol,
    EndOfSymbol,
    NewSymbolAfter,
}

/// A symbol resolved for a text offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolLocation {
    pub symbol_id: usize,
    pub symbol: ScannerSymbol,
    pub text_offset: usize,
    pub relative_pos: RelativePosition,
}

impl SymbolLocation {
    pub fn is_dot(&self) -> bool {
        self.symbol.is_dot()
    }

    pub fn is_trailing_dot(&self) -> bool {
        self.symbol.is_trailing_dot()
    }
}

/// The scanner location of a cursor: the current symbol and its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorLocation {
    pub current: SymbolLocation,
    pub previous: Option<SymbolLocation>,
}

/// The output of one scanner run over the full script text.
#[derive(Debug)]
pub struct ScannedScript {
    pub catalog_entry_id: CatalogEntryId,
    pub text_version: TextVersion,
    /// The copied text, terminated by two NUL sentinel bytes.
    text_buffer: String,
    pub errors: Vec<(Location, String)>,
    pub line_breaks: Vec<Location>,
    pub comments: Vec<Location>,
    pub name_registry: RefCell<NameRegistry>,
    /// The token stream, terminated by exactly one EOF symbol.
    pub symbols: Vec<ScannerSymbol>,
}

impl ScannedScript {
    /// The user text without the sentinel padding.
    pub fn text(&self) -> &str {
        &self.text_buffer[..self.text_buffer.len() - 2]
    }

    pub fn text_len(&self) -> usize {
        self.text_buffer.len() - 2
    }

    pub fn read_text_at(&self, location: Location) -> &str {
        let begin = (location.offset as usize).min(self.text_len());
        let end = (location.end() as usize).min(self.text_len());
        &self.text_buffer[begin..end]
    }

    /// Register a keyword spelling as a name.
    pub fn register_keyword_as_name(&self, text: &str, location: Location) -> u32 {
        self.name_registry
            .borrow_mut()
            .register(text, location, NameTags::NONE)
    }

    /// Find the symbol at a text offset.
    ///
    /// The symbol stream is sorted by offset, so this is a binary search.
    /// EOF is special: the previous real symbol is returned, or
    /// `NewSymbolBefore` on an empty stream.
    pub fn find_symbol(&self, text_offset: usize) -> CursorLocation {
        let text_offset = text_offset.min(self.text_len());

        let relative_position = |symbol: &ScannerSymbol| -> RelativePosition {
            let begin = symbol.location.offset as usize;
            let end = symbol.location.end() as usize;
            if text_offset < begin {
                RelativePosition::NewSymbolBefore
            } else if text_offset == begin {
                RelativePosition::BeginOfSymbol
            } else if text_offset == end {
                RelativePosition::EndOfSymbol
            } else if text_offset < end {
                RelativePosition::MidOfSymbol
            } else {
                RelativePosition::NewSymbolAfter
            }
        };

        // Predecessor of the first symbol beginning after the offset.
        let upper = self
            .symbols
            .partition_point(|s| (s.location.offset as usize) <= text_offset);
        let mut symbol_id = upper.saturating_sub(1);

        // Hit EOF? Take the last symbol before it, if there is one.
        if self.symbols[symbol_id].is_eof() {
            if symbol_id == 0 {
                let symbol = self.symbols[0];
                return CursorLocation {
                    current: SymbolLocation {
                        symbol_id: 0,
                        symbol,
                        text_offset,
                        relative_pos: RelativePosition::NewSymbolBefore,
                    },
                    previous: None,
                };
            }
            symbol_id -= 1;
        }

        let current = SymbolLocation {
            symbol_id,
            symbol: self.symbols[symbol_id],
            text_offset,
            relative_pos: relative_position(&self.symbols[symbol_id]),
        };
        let previous = (symbol_id > 0).then(|| SymbolLocation {
            symbol_id: symbol_id - 1,
            symbol: self.symbols[symbol_id - 1],
            text_offset,
            relative_pos: relative_position(&self.symbols[symbol_id - 1]),
        });
        CursorLocation { current, previous }
    }

    pub fn symbol_byte_size(&self) -> usize {
        self.symbols.len() * std::mem::size_of::<ScannerSymbol>()
    }
}

/// Scan a padded text buffer into a fresh `ScannedScript`.
///
/// The input must carry the two trailing NUL bytes; `Rope::to_padded_string`
/// produces exactly that.
pub fn scan(
    text_buffer: String,
    text_version: TextVersion,
    catalog_entry_id: CatalogEntryId,
) -> ScannedScript {
    debug_assert!(text_buffer.ends_with("\0\0"));
    let mut scanner = Scanner {
        text: &text_buffer,
        user_len: text_buffer.len() - 2,
        pos: 0,
        symbols: Vec::new(),
        errors: Vec::new(),
        line_breaks: Vec::new(),
        comments: Vec::new(),
        names: NameRegistry::new(),
    };
    scanner.run();
    let Scanner {
        symbols,
        errors,
        line_breaks,
        comments,
        names,
        ..
    } = scanner;
    ScannedScript {
        catalog_entry_id,
        text_version,
        text_buffer,
        errors,
        line_breaks,
        comments,
        name_registry: RefCell::new(names),
        symbols,
    }
}

struct Scanner<'a> {
    text: &'a str,
    user_len: usize,
    pos: usize,
    symbols: Vec<ScannerSymbol>,
    errors: Vec<(Location, String)>,
    line_breaks: Vec<Location>,
    comments: Vec<Location>,
    names: NameRegistry,
}

impl Scanner<'_> {
    const EOF: char = '\0';

    fn at_eof(&self) -> bool {
        self.pos >= self.user_len
    }

    fn peek(&self) -> char {
        if self.at_eof() {
            Self::EOF
        } else {
            self.text[self.pos..].chars().next().unwrap_or(Self::EOF)
        }
    }

    fn peek_at(&self, pos: usize) -> char {
        if pos >= self.user_len {
            Self::EOF
        } else {
            self.text[pos..].chars().next().unwrap_or(Self::EOF)
        }
    }

    fn peek_second(&self) -> char {
        let c = self.peek();
        if c == Self::EOF {
            return Self::EOF;
        }
        self.peek_at(self.pos + c.len_utf8())
    }

    fn shift(&mut self) -> char {
        let c = self.peek();
        if c != Self::EOF {
            self.pos += c.len_utf8();
        }
        c
    }

    fn shift_while(&mut self, f: impl Fn(char) -> bool + Copy) {
        while !self.at_eof() && f(self.peek()) {
            self.shift();
        }
    }

    fn location_from(&self, begin: usize) -> Location {
        Location::new(begin as u32, (self.pos - begin) as u32)
    }

    fn error(&mut self, location: Location, message: impl Into<String>) {
        self.errors.push((location, message.into()));
    }

    fn push(&mut self, kind: SymbolKind, location: Location) {
        self.symbols.push(ScannerSymbol { kind, location });
    }

    fn run(&mut self) {
        loop {
            self.skip_whitespace_and_comments();
            if self.at_eof() {
                self.push(SymbolKind::Eof, Location::zero_at(self.user_len as u32));
                break;
            }
            self.next_symbol();
        }
        self.apply_lookahead_rewrites();
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let c = self.peek();
            match c {
                ' ' | '\t' | '\r' => {
                    self.shift();
                }
                '\n' => {
                    let begin = self.pos;
                    self.shift();
                    self.line_breaks.push(self.location_from(begin));
                }
                '-' if self.peek_second() == '-' => {
                    let begin = self.pos;
                    self.shift_while(|c| c != '\n');
                    self.comments.push(self.location_from(begin));
                }
                '/' if self.peek_second() == '*' => {
                    self.skip_block_comment();
                }
                _ => break,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let outermost = self.pos;
        self.shift();
        self.shift();
        let mut depth = 1usize;
        while depth > 0 {
            if self.at_eof() {
                let loc = self.location_from(outermost);
                self.error(loc, "unterminated block comment");
                break;
            }
            match self.peek() {
                '/' if self.peek_second() == '*' => {
                    self.shift();
                    self.shift();
                    depth += 1;
                }
                '*' if self.peek_second() == '/' => {
                    self.shift();
                    self.shift();
                    depth -= 1;
                }
                '\n' => {
                    let begin = self.pos;
                    self.shift();
                    self.line_breaks.push(self.location_from(begin));
                }
                _ => {
                    self.shift();
                }
            }
        }
        self.comments.push(self.location_from(outermost));
    }

    fn next_symbol(&mut self) {
        let begin = self.pos;
        let c = self.peek();
        match c {
            '\'' => self.scan_string_literal(begin, SymbolKind::LiteralString),
            '"' => self.scan_quoted_identifier(begin),
            'b' | 'B' if self.peek_second() == '\'' => {
                self.shift();
                self.scan_string_literal(begin, SymbolKind::LiteralBitString);
            }
            'x' | 'X' if self.peek_second() == '\'' => {
                self.shift();
                self.scan_string_literal(begin, SymbolKind::LiteralHexString);
            }
            'e' | 'E' if self.peek_second() == '\'' => {
                self.shift();
                self.scan_string_literal(begin, SymbolKind::LiteralString);
            }
            '0'..='9' => self.scan_number(begin),
            '$' => self.scan_parameter(begin),
            '.' => {
                if self.peek_second().is_ascii_digit() {
                    self.scan_number(begin);
                } else {
                    self.shift();
                    let next = self.peek();
                    let kind = if next.is_whitespace() || next == Self::EOF {
                        SymbolKind::DotTrailing
                    } else {
                        SymbolKind::Dot
                    };
                    self.push(kind, self.location_from(begin));
                }
            }
            c if is_identifier_start(c) => self.scan_identifier(begin),
            _ => self.scan_operator(begin),
        }
    }

    fn scan_string_literal(&mut self, begin: usize, kind: SymbolKind) {
        // Consume the body of one quoted literal.
        // Returns false if the literal was unterminated.
        fn consume_body(scanner: &mut Scanner) -> bool {
            scanner.shift();
            loop {
                if scanner.at_eof() {
                    return false;
                }
                match scanner.peek() {
                    '\'' if scanner.peek_second() == '\'' => {
                        scanner.shift();
                        scanner.shift();
                    }
                    '\'' => {
                        scanner.shift();
                        return true;
                    }
                    '\n' => {
                        let nl = scanner.pos;
                        scanner.shift();
                        scanner.line_breaks.push(scanner.location_from(nl));
                    }
                    _ => {
                        scanner.shift();
                    }
                }
            }
        }

        if !consume_body(self) {
            let loc = self.location_from(begin);
            self.error(loc, "unterminated string literal");
            self.push(kind, self.location_from(begin));
            return;
        }

        // Standard concat rule: a literal continues across whitespace that
        // contains at least one newline and is followed by another quote.
        loop {
            let resume = self.pos;
            let mut saw_newline = false;
            let mut pending_breaks: Vec<Location> = Vec::new();
            loop {
                match self.peek() {
                    ' ' | '\t' | '\r' => {
                        self.shift();
                    }
                    '\n' => {
                        let nl = self.pos;
                        self.shift();
                        pending_breaks.push(self.location_from(nl));
                        saw_newline = true;
                    }
                    _ => break,
                }
            }
            if saw_newline && self.peek() == '\'' {
                self.line_breaks.append(&mut pending_breaks);
                if !consume_body(self) {
                    let loc = self.location_from(begin);
                    self.error(loc, "unterminated string literal");
                    break;
                }
            } else {
                self.pos = resume;
                break;
            }
        }
        self.push(kind, self.location_from(begin));
    }

    fn scan_quoted_identifier(&mut self, begin: usize) {
        self.shift();
        let content_begin = self.pos;
        loop {
            if self.at_eof() {
                let loc = self.location_from(begin);
                self.error(loc, "unterminated quoted identifier");
                break;
            }
            match self.peek() {
                '"' if self.peek_second() == '"' => {
                    self.shift();
                    self.shift();
                }
                '"' => break,
                '\n' => {
                    let nl = self.pos;
                    self.shift();
                    self.line_breaks.push(self.location_from(nl));
                }
                _ => {
                    self.shift();
                }
            }
        }
        let content_end = self.pos;
        if self.peek() == '"' {
            self.shift();
        }
        let location = self.location_from(begin);
        // Trimmed of surrounding quotes and trailing whitespace, interned as-is.
        let text = self.text;
        let content = text[content_begin..content_end].trim_end();
        let name = self.names.register(content, location, NameTags::NONE);
        self.push(SymbolKind::Ident(name), location);
    }

    fn scan_number(&mut self, begin: usize) {
        self.shift_while(|c| c.is_ascii_digit());
        let mut is_float = false;
        if self.peek() == '.' && self.peek_second() != '.' {
            is_float = true;
            self.shift();
            self.shift_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), 'e' | 'E') {
            let mark = self.pos;
            self.shift();
            if matches!(self.peek(), '+' | '-') {
                self.shift();
            }
            if self.peek().is_ascii_digit() {
                is_float = true;
                self.shift_while(|c| c.is_ascii_digit());
            } else {
                self.pos = mark;
            }
        }
        let location = self.location_from(begin);
        let text = &self.text[begin..self.pos];
        let kind = if !is_float && text.parse::<i64>().is_ok() {
            SymbolKind::LiteralInteger
        } else {
            SymbolKind::LiteralFloat
        };
        self.push(kind, location);
    }

    fn scan_parameter(&mut self, begin: usize) {
        self.shift();
        self.shift_while(|c| c.is_ascii_digit());
        let location = self.location_from(begin);
        let digits = &self.text[begin + 1..self.pos];
        if digits.is_empty() || digits.parse::<i64>().is_err() {
            self.error(location, "invalid parameter");
        }
        self.push(SymbolKind::Param, location);
    }

    fn scan_identifier(&mut self, begin: usize) {
        self.shift();
        self.shift_while(is_identifier_continue);
        let location = self.location_from(begin);
        let text = &self.text[begin..self.pos];
        let folded = fold_case(text);
        if let Some(info) = Keyword::find(&folded) {
            self.push(SymbolKind::Keyword(info.keyword), location);
            return;
        }
        // Unquoted identifiers are interned in their folded form.
        let name = self.names.register(&folded, location, NameTags::NONE);
        self.push(SymbolKind::Ident(name), location);
    }

    fn scan_operator(&mut self, begin: usize) {
        let c = self.shift();
        let kind = match (c, self.peek()) {
            ('<', '=') => {
                self.shift();
                SymbolKind::LessEquals
            }
            ('>', '=') => {
                self.shift();
                SymbolKind::GreaterEquals
            }
            ('<', '>') => {
                self.shift();
                SymbolKind::NotEquals
            }
            ('!', '=') => {
                self.shift();
                SymbolKind::NotEquals
            }
            ('|', '|') => {
                self.shift();
                SymbolKind::Concat
            }
            ('<', _) => SymbolKind::LessThan,
            ('>', _) => SymbolKind::GreaterThan,
            ('=', _) => SymbolKind::Equals,
            ('+', _) => SymbolKind::Plus,
            ('-', _) => SymbolKind::Minus,
            ('*', _) => SymbolKind::Star,
            ('/', _) => SymbolKind::Slash,
            ('%', _) => SymbolKind::Percent,
            ('(', _) => SymbolKind::LParen,
            (')', _) => SymbolKind::RParen,
            ('[', _) => SymbolKind::LBracket,
            (']', _) => SymbolKind::RBracket,
            (',', _) => SymbolKind::Comma,
            (';', _) => SymbolKind::Semicolon,
            (':', _) => SymbolKind::Colon,
            ('?', _) => SymbolKind::QuestionMark,
            ('^', _) => SymbolKind::Circumflex,
            _ => {
                let loc = self.location_from(begin);
                self.error(loc, format!("unexpected character '{c}'"));
                return;
            }
        };
        self.push(kind, self.location_from(begin));
    }

    /// Rewrite NOT/NULLS/WITH when the grammar needs limited lookahead.
    fn apply_lookahead_rewrites(&mut self) {
        for i in 0..self.symbols.len().saturating_sub(1) {
            let next = self.symbols[i + 1].keyword();
            let current = &mut self.symbols[i];
            match current.kind {
                SymbolKind::Keyword(Keyword::Not) => {
                    if matches!(
                        next,
                        Some(
                            Keyword::Between
                                | Keyword::In
                                | Keyword::Like
                                | Keyword::Ilike
                                | Keyword::Similar
                        )
                    ) {
                        current.kind = SymbolKind::Keyword(Keyword::NotLa);
                    }
                }
                SymbolKind::Keyword(Keyword::Nulls) => {
                    if matches!(next, Some(Keyword::First | Keyword::Last)) {
                        current.kind = SymbolKind::Keyword(Keyword::NullsLa);
                    }
                }
                SymbolKind::Keyword(Keyword::With) => {
                    if matches!(next, Some(Keyword::Time | Keyword::Ordinality)) {
                        current.kind = SymbolKind::Keyword(Keyword::WithLa);
                    }
                }
                _ => {}
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scan_text(text: &str) -> ScannedScript {
        scan(format!("{text}\0\0"), 1, 1)
    }

    fn kinds(scanned: &ScannedScript) -> Vec<SymbolKind> {
        scanned.symbols.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_scan_select_one() {
        let scanned = scan_text("select 1");
        assert_eq!(
            kinds(&scanned),
            vec![
                SymbolKind::Keyword(Keyword::Select),
                SymbolKind::LiteralInteger,
                SymbolKind::Eof
            ]
        );
        assert_eq!(scanned.symbols[0].location, Location::new(0, 6));
        assert_eq!(scanned.symbols[1].location, Location::new(7, 1));
        assert!(scanned.errors.is_empty());
    }

    #[test]
    fn test_empty_text_has_single_eof() {
        let scanned = scan_text("");
        assert_eq!(kinds(&scanned), vec![SymbolKind::Eof]);
        let location = scanned.find_symbol(0);
        assert_eq!(
            location.current.relative_pos,
            RelativePosition::NewSymbolBefore
        );
        assert!(location.previous.is_none());
    }

    #[test]
    fn test_identifiers_are_folded_and_interned() {
        let scanned = scan_text("select FooBar, foobar");
        let names = scanned.name_registry.borrow();
        let name = names.find("foobar").expect("name interned");
        assert_eq!(name.occurrences, 2);
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_quoted_identifiers_preserve_case() {
        let scanned = scan_text("select \"FooBar\"");
        let names = scanned.name_registry.borrow();
        assert!(names.find("FooBar").is_some());
        assert!(names.find("foobar").is_none());
    }

    #[test]
    fn test_keyword_folding() {
        let scanned = scan_text("SeLeCt");
        assert_eq!(
            kinds(&scanned),
            vec![SymbolKind::Keyword(Keyword::Select), SymbolKind::Eof]
        );
    }

    #[test]
    fn test_dot_disambiguation() {
        let scanned = scan_text("a.b");
        assert_eq!(scanned.symbols[1].kind, SymbolKind::Dot);

        let scanned = scan_text("a. ");
        assert_eq!(scanned.symbols[1].kind, SymbolKind::DotTrailing);

        let scanned = scan_text("a.");
        assert_eq!(scanned.symbols[1].kind, SymbolKind::DotTrailing);
    }

    #[test]
    fn test_lookahead_rewrites() {
        let scanned = scan_text("x not in y");
        assert_eq!(scanned.symbols[1].kind, SymbolKind::Keyword(Keyword::NotLa));

        let scanned = scan_text("nulls first");
        assert_eq!(
            scanned.symbols[0].kind,
            SymbolKind::Keyword(Keyword::NullsLa)
        );

        let scanned = scan_text("with time");
        assert_eq!(scanned.symbols[0].kind, SymbolKind::Keyword(Keyword::WithLa));

        let scanned = scan_text("with cte");
        assert_eq!(scanned.symbols[0].kind, SymbolKind::Keyword(Keyword::With));
    }

    #[test]
    fn test_numbers() {
        let scanned = scan_text("1 1.5 .5 1e3 123456789012345678901234567890");
        assert_eq!(
            kinds(&scanned),
            vec![
                SymbolKind::LiteralInteger,
                SymbolKind::LiteralFloat,
                SymbolKind::LiteralFloat,
                SymbolKind::LiteralFloat,
                SymbolKind::LiteralFloat,
                SymbolKind::Eof
            ]
        );
    }

    #[test]
    fn test_comments_and_line_breaks() {
        let scanned = scan_text("select 1 -- trailing\n/* block /* nested */ */ , 2");
        assert_eq!(scanned.comments.len(), 2);
        assert_eq!(scanned.line_breaks.len(), 1);
        assert!(scanned.errors.is_empty());

        let scanned = scan_text("/* open");
        assert_eq!(scanned.errors.len(), 1);
        assert!(scanned.errors[0].1.contains("unterminated block comment"));
    }

    #[test]
    fn test_string_literals() {
        let scanned = scan_text("select 'it''s'");
        assert_eq!(scanned.symbols[1].kind, SymbolKind::LiteralString);
        assert_eq!(scanned.read_text_at(scanned.symbols[1].location), "'it''s'");

        // Concat across a newline
        let scanned = scan_text("select 'a'\n'b'");
        assert_eq!(
            kinds(&scanned),
            vec![
                SymbolKind::Keyword(Keyword::Select),
                SymbolKind::LiteralString,
                SymbolKind::Eof
            ]
        );

        // No concat without a newline
        let scanned = scan_text("select 'a' 'b'");
        assert_eq!(scanned.symbols.len(), 4);

        let scanned = scan_text("select 'open");
        assert_eq!(scanned.errors.len(), 1);
    }

    #[test]
    fn test_bit_and_hex_literals() {
        let scanned = scan_text("b'0101' x'ff'");
        assert_eq!(
            kinds(&scanned),
            vec![
                SymbolKind::LiteralBitString,
                SymbolKind::LiteralHexString,
                SymbolKind::Eof
            ]
        );
    }

    #[test]
    fn test_parameters() {
        let scanned = scan_text("$1 $99999999999999999999");
        assert_eq!(
            kinds(&scanned),
            vec![SymbolKind::Param, SymbolKind::Param, SymbolKind::Eof]
        );
        assert_eq!(scanned.errors.len(), 1);
        assert_eq!(scanned.errors[0].1, "invalid parameter");
    }

    #[test]
    fn test_operators() {
        let scanned = scan_text("a <= b <> c || d");
        let kinds = kinds(&scanned);
        assert!(kinds.contains(&SymbolKind::LessEquals));
        assert!(kinds.contains(&SymbolKind::NotEquals));
        assert!(kinds.contains(&SymbolKind::Concat));
    }

    #[test]
    fn test_symbol_end_offsets_within_text() {
        let scanned = scan_text("select a, b from foo");
        for symbol in &scanned.symbols {
            assert!((symbol.location.end() as usize) <= scanned.text_len());
        }
        assert!(scanned.symbols.last().unwrap().is_eof());
    }

    #[test]
    fn test_find_symbol_positions() {
        let scanned = scan_text("select a");
        // Begin of `select`
        let at0 = scanned.find_symbol(0);
        assert_eq!(at0.current.symbol_id, 0);
        assert_eq!(at0.current.relative_pos, RelativePosition::BeginOfSymbol);
        // Mid of `select`
        let at3 = scanned.find_symbol(3);
        assert_eq!(at3.current.relative_pos, RelativePosition::MidOfSymbol);
        // End of `select`
        let at6 = scanned.find_symbol(6);
        assert_eq!(at6.current.relative_pos, RelativePosition::EndOfSymbol);
        // End of `a`
        let at8 = scanned.find_symbol(8);
        assert_eq!(at8.current.symbol_id, 1);
        assert_eq!(at8.current.relative_pos, RelativePosition::EndOfSymbol);
        assert_eq!(at8.previous.unwrap().symbol_id, 0);
        // Clamped past the end
        let beyond = scanned.find_symbol(1000);
        assert_eq!(beyond.current.symbol_id, 1);
    }

    #[test]
    fn test_scan_incrementally_matches_full_scan() {
        // Character-by-character growth converges on the same final stream.
        let full = "select 1";
        let mut acc = String::new();
        let mut last = None;
        for c in full.chars() {
            acc.push(c);
            last = Some(scan_text(&acc));
        }
        let last = last.unwrap();
        assert_eq!(
            kinds(&last),
            vec![
                SymbolKind::Keyword(Keyword::Select),
                SymbolKind::LiteralInteger,
                SymbolKind::Eof
            ]
        );
        assert_eq!(last.symbols[0].location, Location::new(0, 6));
        assert_eq!(last.symbols[1].location, Location::new(7, 1));
    }
}
