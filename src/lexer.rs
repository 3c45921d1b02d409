use crate::token::{Token, TokenKind};

pub mod trie;

use trie::Trie;

/// On-demand token stream over the raw source bytes.
///
/// The lexer never fails: bytes it cannot place become `Unknown` tokens and
/// an unterminated string literal yields whatever was collected before EOF.
pub struct Lexer {
    src: Vec<u8>,
    pos: usize,
    line: u32,
    column: u32,
    keywords: Trie,
    buffered: Option<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            src: source.as_bytes().to_vec(),
            pos: 0,
            line: 1,
            column: 1,
            keywords: Trie::with_keywords(),
            buffered: None,
        }
    }

    /// Returns the next token, advancing position. At end of input this
    /// returns `EndOfFile` and keeps returning it on further calls.
    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.buffered.take() {
            return token;
        }
        self.scan_token()
    }

    /// Returns the next token without consuming it.
    pub fn peek_token(&mut self) -> Token {
        if let Some(token) = &self.buffered {
            return token.clone();
        }
        let token = self.scan_token();
        self.buffered = Some(token.clone());
        token
    }

    fn scan_token(&mut self) -> Token {
        self.skip_whitespace();
        if self.is_end() {
            return Token::new(TokenKind::EndOfFile, "", self.line, self.column);
        }
        let c = self.peek(0);
        if is_letter(c) {
            return self.identifier();
        }
        if c.is_ascii_digit() {
            return self.number();
        }
        if c == b'"' {
            return self.string_literal();
        }
        self.symbol()
    }

    fn is_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self, offset: usize) -> u8 {
        self.src.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn get(&mut self) -> u8 {
        let c = self.peek(0);
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while !self.is_end() && self.peek(0).is_ascii_whitespace() {
            self.get();
        }
    }

    fn identifier(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        while !self.is_end() && (is_letter(self.peek(0)) || self.peek(0).is_ascii_digit()) {
            self.get();
        }
        let text = self.lexeme(start);
        let kind = self.keywords.lookup(&text).unwrap_or(TokenKind::Identifier);
        Token::new(kind, text, line, column)
    }

    fn number(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let start = self.pos;

        while !self.is_end() && self.peek(0).is_ascii_digit() {
            self.get();
        }

        // Fractional part only when the dot is followed by a digit, so that
        // `1.` stays a number and a separate '.' symbol.
        if self.peek(0) == b'.' && self.peek(1).is_ascii_digit() {
            self.get();
            while !self.is_end() && self.peek(0).is_ascii_digit() {
                self.get();
            }
        }

        Token::new(TokenKind::Number, self.lexeme(start), line, column)
    }

    fn string_literal(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        self.get(); // opening quote
        let start = self.pos;
        while !self.is_end() && self.peek(0) != b'"' {
            self.get();
        }
        let text = self.lexeme(start);
        if !self.is_end() {
            self.get(); // closing quote
        }
        Token::new(TokenKind::StringLiteral, text, line, column)
    }

    fn symbol(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let c = self.get();
        let kind = match c {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'=' => {
                if self.peek(0) == b'=' {
                    self.get();
                    return Token::new(TokenKind::Eq, "==", line, column);
                }
                TokenKind::Assign
            }
            b'!' => {
                if self.peek(0) == b'=' {
                    self.get();
                    return Token::new(TokenKind::Neq, "!=", line, column);
                }
                TokenKind::Unknown
            }
            b'<' => {
                if self.peek(0) == b'=' {
                    self.get();
                    return Token::new(TokenKind::Le, "<=", line, column);
                }
                TokenKind::Lt
            }
            b'>' => {
                if self.peek(0) == b'=' {
                    self.get();
                    return Token::new(TokenKind::Ge, ">=", line, column);
                }
                TokenKind::Gt
            }
            _ => TokenKind::Unknown,
        };
        let text = String::from_utf8_lossy(&[c]).into_owned();
        Token::new(kind, text, line, column)
    }

    fn lexeme(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }
}

/// Tokenizes the whole source, including the terminal `EndOfFile` token.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let is_eof = token.kind == TokenKind::EndOfFile;
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    tokens
}

fn is_letter(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_keywords_and_identifiers() {
        let kinds = kinds("fn int main ifx do_ continue");
        assert_eq!(
            kinds,
            vec![
                TokenKind::KwFn,
                TokenKind::KwInt,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::KwContinue,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn scans_simple_function() {
        let source = indoc! {"
            fn int main() {
                printInt(1+2*3);
                return 0;
            }
        "};
        let kinds = kinds(source);
        assert_eq!(
            kinds,
            vec![
                TokenKind::KwFn,
                TokenKind::KwInt,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Star,
                TokenKind::Number,
                TokenKind::RParen,
                TokenKind::Semicolon,
                TokenKind::KwReturn,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::RBrace,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = tokenize("int x;\n  x = 1;");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 5));
        assert_eq!((tokens[2].line, tokens[2].column), (1, 6));
        // second line, after two spaces of indentation
        assert_eq!((tokens[3].line, tokens[3].column), (2, 3));
        assert_eq!((tokens[4].line, tokens[4].column), (2, 5));
    }

    #[test]
    fn two_char_operators_win_over_prefixes() {
        let kinds = kinds("= == < <= > >= != !");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Assign,
                TokenKind::Eq,
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::Neq,
                TokenKind::Unknown,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn bare_bang_is_unknown_with_text() {
        let tokens = tokenize("!x");
        assert_eq!(tokens[0].kind, TokenKind::Unknown);
        assert_eq!(tokens[0].text, "!");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn numbers_with_and_without_fraction() {
        let tokens = tokenize("12 3.50 4. .5");
        assert_eq!(tokens[0].text, "12");
        assert_eq!(tokens[1].text, "3.50");
        // `4.` splits into the number and a stray dot
        assert_eq!(tokens[2].text, "4");
        assert_eq!(tokens[3].kind, TokenKind::Unknown);
        assert_eq!(tokens[3].text, ".");
        // a leading dot is not a number either
        assert_eq!(tokens[4].kind, TokenKind::Unknown);
        assert_eq!(tokens[5].text, "5");
    }

    #[test]
    fn string_literal_strips_quotes() {
        let tokens = tokenize("\"hi there\";");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "hi there");
        assert_eq!(tokens[1].kind, TokenKind::Semicolon);
    }

    #[test]
    fn unterminated_string_collects_to_eof() {
        let tokens = tokenize("\"abc");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "abc");
        assert_eq!(tokens[1].kind, TokenKind::EndOfFile);
    }

    #[test]
    fn peek_does_not_advance() {
        let mut lexer = Lexer::new("a b");
        let peeked = lexer.peek_token();
        assert_eq!(peeked.text, "a");
        assert_eq!(lexer.peek_token(), peeked);
        assert_eq!(lexer.next_token(), peeked);
        assert_eq!(lexer.next_token().text, "b");
    }

    #[test]
    fn eof_repeats() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier);
        assert_eq!(lexer.next_token().kind, TokenKind::EndOfFile);
        assert_eq!(lexer.next_token().kind, TokenKind::EndOfFile);
    }

    #[test]
    fn tokenize_ends_with_single_eof() {
        let tokens = tokenize("int x = 1;");
        let eof_count = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::EndOfFile)
            .count();
        assert_eq!(eof_count, 1);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EndOfFile));
    }
}
