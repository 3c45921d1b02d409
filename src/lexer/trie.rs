use std::collections::HashMap;

use crate::token::TokenKind;

#[derive(Debug, Default)]
struct Node {
    keyword: Option<TokenKind>,
    next: HashMap<u8, Node>,
}

/// Byte-keyed keyword trie; terminal nodes carry the keyword's token kind.
#[derive(Debug)]
pub struct Trie {
    root: Node,
}

impl Trie {
    pub fn new() -> Self {
        Self {
            root: Node::default(),
        }
    }

    /// Trie preloaded with every keyword of the source language.
    pub fn with_keywords() -> Self {
        let mut trie = Self::new();

        trie.insert("if", TokenKind::KwIf);
        trie.insert("else", TokenKind::KwElse);
        trie.insert("for", TokenKind::KwFor);
        trie.insert("while", TokenKind::KwWhile);
        trie.insert("do", TokenKind::KwDo);
        trie.insert("fn", TokenKind::KwFn);

        trie.insert("int", TokenKind::KwInt);
        trie.insert("char", TokenKind::KwChar);
        trie.insert("double", TokenKind::KwDouble);
        trie.insert("string", TokenKind::KwString);

        trie.insert("return", TokenKind::KwReturn);
        trie.insert("break", TokenKind::KwBreak);
        trie.insert("continue", TokenKind::KwContinue);

        trie
    }

    pub fn insert(&mut self, word: &str, kind: TokenKind) {
        let mut node = &mut self.root;
        for &byte in word.as_bytes() {
            node = node.next.entry(byte).or_default();
        }
        node.keyword = Some(kind);
    }

    /// Exact-match lookup; prefixes of keywords do not match.
    pub fn lookup(&self, word: &str) -> Option<TokenKind> {
        let mut node = &self.root;
        for &byte in word.as_bytes() {
            node = node.next.get(&byte)?;
        }
        node.keyword
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_whole_keywords_only() {
        let trie = Trie::with_keywords();
        assert_eq!(trie.lookup("if"), Some(TokenKind::KwIf));
        assert_eq!(trie.lookup("continue"), Some(TokenKind::KwContinue));
        assert_eq!(trie.lookup("i"), None);
        assert_eq!(trie.lookup("iff"), None);
        assert_eq!(trie.lookup("Int"), None);
        assert_eq!(trie.lookup(""), None);
    }

    #[test]
    fn insert_overwrites_terminal() {
        let mut trie = Trie::new();
        trie.insert("x", TokenKind::Identifier);
        trie.insert("x", TokenKind::KwInt);
        assert_eq!(trie.lookup("x"), Some(TokenKind::KwInt));
    }
}
