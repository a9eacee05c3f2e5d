//! The stateful lexer
//!
//! Scans a byte buffer under the currently selected state's rule list.
//! The parser drives every state transition explicitly and may rewind
//! the cursor to a previously emitted token (`reject`) so that already
//! tokenized lookahead is re-read under a new state.
//!
//! `dynamic_rule_update` recompiles one named rule, in every state that
//! declares it, to match a fixed literal. The parser uses it when the
//! program name is first discovered, so later usage lines cannot match
//! an arbitrary identifier as `PROG_NAME`.

use super::location::SourceLocation;
use super::states::{self, LexState};
use super::tokens::{Position, Token, TokenKind};
use std::fmt;

/// Errors produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    /// No rule of the active state matched at the cursor.
    NoRuleMatched {
        state: &'static str,
        pos: Position,
        byte: u8,
    },
    /// `change_state` was asked for a name missing from the tables.
    UnknownState(String),
    /// `dynamic_rule_update` was asked for a rule no state declares.
    UnknownRule(String),
    /// The dynamic rule literal did not compile.
    BadDynamicRule { rule: String, message: String },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::NoRuleMatched { state, pos, byte } => write!(
                f,
                "{state}: no rule matched at {pos} (byte 0x{byte:02x})"
            ),
            LexError::UnknownState(name) => write!(f, "unknown lexer state: {name}"),
            LexError::UnknownRule(name) => write!(f, "unknown lexer rule: {name}"),
            LexError::BadDynamicRule { rule, message } => {
                write!(f, "dynamic update of rule {rule} failed: {message}")
            }
        }
    }
}

impl std::error::Error for LexError {}

/// A lexer whose active rule set is one of the named docopt states.
pub struct StateLexer<'s> {
    source: &'s [u8],
    cursor: usize,
    states: Vec<LexState>,
    current: usize,
    location: SourceLocation,
}

impl<'s> StateLexer<'s> {
    /// Create a lexer over `source`, starting in `initial_state`.
    pub fn new(source: &'s [u8], initial_state: &str) -> Result<Self, LexError> {
        let states = states::base_states();
        let current = states
            .iter()
            .position(|s| s.name == initial_state)
            .ok_or_else(|| LexError::UnknownState(initial_state.to_string()))?;
        Ok(Self {
            source,
            cursor: 0,
            states,
            current,
            location: SourceLocation::new(source),
        })
    }

    /// Name of the active state.
    pub fn state_name(&self) -> &'static str {
        self.states[self.current].name
    }

    /// Select another state; takes effect at the next `next()`.
    pub fn change_state(&mut self, name: &str) -> Result<(), LexError> {
        match self.states.iter().position(|s| s.name == name) {
            Some(index) => {
                self.current = index;
                Ok(())
            }
            None => Err(LexError::UnknownState(name.to_string())),
        }
    }

    /// Produce the next token under the active state.
    ///
    /// Every rule is tried at the cursor; the longest match wins and
    /// declaration order breaks ties. Zero-length matches never win.
    /// Once the buffer is exhausted, `Eof` tokens are emitted forever.
    pub fn next(&mut self) -> Result<Token, LexError> {
        if self.cursor >= self.source.len() {
            return Ok(Token {
                kind: TokenKind::Eof,
                value: String::new(),
                pos: self.location.position_at(self.source.len()),
                state: self.state_name(),
            });
        }

        let at_line_start = self.cursor == 0 || self.source[self.cursor - 1] == b'\n';
        let rest = &self.source[self.cursor..];
        let mut best: Option<(usize, usize)> = None; // (match length, rule index)
        for (index, rule) in self.states[self.current].rules.iter().enumerate() {
            if rule.line_start && !at_line_start {
                continue;
            }
            if let Some(found) = rule.re.find(rest) {
                let len = found.end();
                if len > 0 && best.map_or(true, |(best_len, _)| len > best_len) {
                    best = Some((len, index));
                }
            }
        }

        let pos = self.location.position_at(self.cursor);
        match best {
            Some((len, index)) => {
                let rule = &self.states[self.current].rules[index];
                let token = Token {
                    kind: rule.kind,
                    value: String::from_utf8_lossy(&rest[..len]).into_owned(),
                    pos,
                    state: self.states[self.current].name,
                };
                self.cursor += len;
                Ok(token)
            }
            None => Err(LexError::NoRuleMatched {
                state: self.state_name(),
                pos,
                byte: rest[0],
            }),
        }
    }

    /// Return a token to the stream: the next `next()` re-scans from the
    /// token's byte offset, under whatever state is then active.
    pub fn reject(&mut self, token: &Token) {
        self.cursor = token.pos.offset;
    }

    /// Skip `n` bytes, then forward to the next UTF-8 boundary. Used to
    /// step over a byte no rule matched.
    pub fn discard(&mut self, n: usize) {
        self.cursor = (self.cursor + n).min(self.source.len());
        while self.cursor < self.source.len() && (self.source[self.cursor] & 0xC0) == 0x80 {
            self.cursor += 1;
        }
    }

    /// Replace the pattern of `rule_name`, in every state declaring it,
    /// with a regex matching exactly `literal`.
    pub fn dynamic_rule_update(&mut self, rule_name: &str, literal: &str) -> Result<(), LexError> {
        let re = states::compile_anchored(&regex::escape(literal)).map_err(|e| {
            LexError::BadDynamicRule {
                rule: rule_name.to_string(),
                message: e.to_string(),
            }
        })?;
        let mut found = false;
        for state in &mut self.states {
            for rule in &mut state.rules {
                if rule.name == rule_name {
                    rule.re = re.clone();
                    found = true;
                }
            }
        }
        if found {
            Ok(())
        } else {
            Err(LexError::UnknownRule(rule_name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexing::states::{
        RULE_PROG_NAME, STATE_FIRST_PROGRAM_USAGE, STATE_OPTIONS, STATE_PROLOGUE, STATE_USAGE_LINE,
    };

    fn kinds(lexer: &mut StateLexer<'_>, n: usize) -> Vec<TokenKind> {
        (0..n).map(|_| lexer.next().unwrap().kind).collect()
    }

    #[test]
    fn prologue_splits_words_and_headings() {
        let mut lexer = StateLexer::new(b"Naval Fate.\nUsage: prog\n", STATE_PROLOGUE).unwrap();
        assert_eq!(
            kinds(&mut lexer, 5),
            vec![
                TokenKind::Text,
                TokenKind::Blank,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Usage,
            ]
        );
    }

    #[test]
    fn usage_keyword_only_matches_at_line_start() {
        let mut lexer = StateLexer::new(b"see usage: below\n", STATE_PROLOGUE).unwrap();
        let tokens: Vec<Token> = (0..5).map(|_| lexer.next().unwrap()).collect();
        assert!(tokens.iter().all(|t| t.kind != TokenKind::Usage));
    }

    #[test]
    fn eof_repeats_forever() {
        let mut lexer = StateLexer::new(b"", STATE_PROLOGUE).unwrap();
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.next().unwrap().value, "");
    }

    #[test]
    fn reject_rewinds_to_the_token_offset() {
        let mut lexer = StateLexer::new(b"prog go", STATE_FIRST_PROGRAM_USAGE).unwrap();
        let first = lexer.next().unwrap();
        assert_eq!(first.value, "prog");
        lexer.reject(&first);
        assert_eq!(lexer.next().unwrap().value, "prog");
    }

    #[test]
    fn dynamic_rule_narrows_prog_name() {
        let mut lexer = StateLexer::new(b"prog another", STATE_USAGE_LINE).unwrap();
        lexer.dynamic_rule_update(RULE_PROG_NAME, "prog").unwrap();
        assert_eq!(lexer.next().unwrap().kind, TokenKind::ProgName);
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Blank);
        // "another" no longer matches the PROG_NAME literal
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Ident);
    }

    #[test]
    fn dynamic_literal_beats_prefix_identifiers() {
        // The literal `p` must not split `print`; the longer IDENT match wins.
        let mut lexer = StateLexer::new(b"print", STATE_USAGE_LINE).unwrap();
        lexer.dynamic_rule_update(RULE_PROG_NAME, "p").unwrap();
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Ident);
        assert_eq!(token.value, "print");
    }

    #[test]
    fn unknown_names_are_rejected() {
        let mut lexer = StateLexer::new(b"", STATE_PROLOGUE).unwrap();
        assert!(matches!(
            lexer.change_state("state_Bogus"),
            Err(LexError::UnknownState(_))
        ));
        assert!(matches!(
            lexer.dynamic_rule_update("BOGUS", "x"),
            Err(LexError::UnknownRule(_))
        ));
    }

    #[test]
    fn options_state_lexes_signatures_and_defaults() {
        let mut lexer =
            StateLexer::new(b"-s, --separator=<str>  [default: 42]", STATE_OPTIONS).unwrap();
        let expected = [
            (TokenKind::Short, "-s"),
            (TokenKind::Punct, ","),
            (TokenKind::Blank, " "),
            (TokenKind::Long, "--separator"),
            (TokenKind::Punct, "="),
            (TokenKind::Argument, "<str>"),
            (TokenKind::LongBlank, "  "),
            (TokenKind::Default, "[default: 42]"),
        ];
        for (kind, value) in expected {
            let token = lexer.next().unwrap();
            assert_eq!((token.kind, token.value.as_str()), (kind, value));
        }
    }

    #[test]
    fn discard_steps_over_unmatched_bytes() {
        let mut lexer = StateLexer::new(b"$go", STATE_USAGE_LINE).unwrap();
        let err = lexer.next().unwrap_err();
        assert!(matches!(err, LexError::NoRuleMatched { byte: b'$', .. }));
        lexer.discard(1);
        assert_eq!(lexer.next().unwrap().value, "go");
    }
}
