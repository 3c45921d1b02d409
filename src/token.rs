use std::fmt;

/// Closed set of token tags produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    KwIf,
    KwElse,
    KwFor,
    KwWhile,
    KwDo,
    KwFn,
    KwInt,
    KwChar,
    KwDouble,
    KwString,
    KwReturn,
    KwBreak,
    KwContinue,

    Identifier,
    Number,
    StringLiteral,

    // Operators
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %
    Assign,  // =
    Eq,      // ==
    Neq,     // !=
    Lt,      // <
    Le,      // <=
    Gt,      // >
    Ge,      // >=

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,

    EndOfFile,
    Unknown,
}

impl TokenKind {
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::KwInt | TokenKind::KwChar | TokenKind::KwDouble | TokenKind::KwString
        )
    }

    /// Spelling used by the token dump.
    pub fn dump_name(self) -> &'static str {
        match self {
            TokenKind::KwIf => "KW_IF",
            TokenKind::KwElse => "KW_ELSE",
            TokenKind::KwFor => "KW_FOR",
            TokenKind::KwWhile => "KW_WHILE",
            TokenKind::KwDo => "KW_DO",
            TokenKind::KwFn => "KW_FN",
            TokenKind::KwInt => "KW_INT",
            TokenKind::KwChar => "KW_CHAR",
            TokenKind::KwDouble => "KW_DOUBLE",
            TokenKind::KwString => "KW_STRING",
            TokenKind::KwReturn => "KW_RETURN",
            TokenKind::KwBreak => "KW_BREAK",
            TokenKind::KwContinue => "KW_CONTINUE",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Number => "NUMBER",
            TokenKind::StringLiteral => "STRING_LITERAL",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Assign => "=",
            TokenKind::Eq => "==",
            TokenKind::Neq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::EndOfFile => "EOF",
            TokenKind::Unknown => "UNKNOWN",
        }
    }
}

/// One lexeme with its one-based source position.
///
/// `text` holds the raw lexeme; string literals store their contents without
/// the surrounding quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    /// Token-dump line: `Line <l>:<c>  <KIND>  '<text>'`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Line {}:{}  {}  '{}'",
            self.line,
            self.column,
            self.kind.dump_name(),
            self.text
        )
    }
}
