//! Lexer state tables for the docopt help-text language
//!
//! Each state is an ordered list of named regex rules. The parser selects
//! the active state explicitly as it moves between document sections;
//! the lexer never changes state on its own.
//!
//! Rule order is significant: at the cursor the longest match wins, and
//! declaration order breaks ties (`PROG_NAME` before `IDENT`, `ARGUMENT`
//! before `TEXT`). Rules flagged `line_start` are only tried at offset 0
//! or immediately after a newline, which is how `Usage:` and section
//! headings are kept from firing mid-line.
//!
//! The tables are compiled once and cloned per lexer instance, so the
//! dynamic `PROG_NAME` rewrite performed after the program name is
//! discovered stays local to the parser that learned it.

use super::tokens::TokenKind;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

pub const STATE_PROLOGUE: &str = "state_Prologue";
pub const STATE_FIRST_PROGRAM_USAGE: &str = "state_First_Program_Usage";
pub const STATE_USAGE_LINE: &str = "state_Usage_Line";
pub const STATE_OPTIONS: &str = "state_Options";
pub const STATE_FREE: &str = "state_Free";

/// Name of the dynamically rewritten rule.
pub const RULE_PROG_NAME: &str = "PROG_NAME";

/// A rule as declared in the static tables.
struct RuleDef {
    name: &'static str,
    kind: TokenKind,
    pattern: &'static str,
    line_start: bool,
}

const fn rule(name: &'static str, kind: TokenKind, pattern: &'static str) -> RuleDef {
    RuleDef {
        name,
        kind,
        pattern,
        line_start: false,
    }
}

const fn heading(name: &'static str, kind: TokenKind, pattern: &'static str) -> RuleDef {
    RuleDef {
        name,
        kind,
        pattern,
        line_start: true,
    }
}

// Shared sub-patterns. ARGUMENT covers both the <bracketed> and the
// UPPER-CASE spellings; IDENT deliberately excludes dots so that
// `FILE...` splits into ARGUMENT and PUNCT.
const PAT_SECTION: &str = r"[A-Za-z][A-Za-z0-9 _-]*:";
const PAT_USAGE: &str = r"(?i)usage:";
const PAT_SHORT: &str = r"-[A-Za-z0-9?]?";
const PAT_LONG: &str = r"--[A-Za-z][A-Za-z0-9-]*|--";
const PAT_ARGUMENT: &str = r"<[^<>\s]+>|[A-Z][A-Z0-9_-]*";
const PAT_IDENT: &str = r"[A-Za-z][A-Za-z0-9_-]*";

const PROLOGUE_RULES: &[RuleDef] = &[
    rule("NEWLINE", TokenKind::Newline, r"\n"),
    heading("USAGE", TokenKind::Usage, PAT_USAGE),
    heading("SECTION", TokenKind::Section, PAT_SECTION),
    rule("BLANK", TokenKind::Blank, r"[ \t]+"),
    rule("TEXT", TokenKind::Text, r"\S+"),
];

const FIRST_PROGRAM_USAGE_RULES: &[RuleDef] = &[
    rule("NEWLINE", TokenKind::Newline, r"\n"),
    rule("BLANK", TokenKind::Blank, r"[ \t]+"),
    rule(RULE_PROG_NAME, TokenKind::ProgName, r"\S+"),
];

const USAGE_LINE_RULES: &[RuleDef] = &[
    rule("NEWLINE", TokenKind::Newline, r"\n"),
    rule("LONG_BLANK", TokenKind::LongBlank, r"[ \t]{2,}"),
    rule("BLANK", TokenKind::Blank, r"[ \t]"),
    heading("USAGE", TokenKind::Usage, PAT_USAGE),
    heading("SECTION", TokenKind::Section, PAT_SECTION),
    // Rewritten to the exact program name literal once it is known.
    rule(RULE_PROG_NAME, TokenKind::ProgName, r"\S+"),
    rule("LONG", TokenKind::Long, PAT_LONG),
    rule("SHORT", TokenKind::Short, PAT_SHORT),
    rule("ARGUMENT", TokenKind::Argument, PAT_ARGUMENT),
    rule("PUNCT", TokenKind::Punct, r"\.\.\.|[\]\[()|=]"),
    rule("IDENT", TokenKind::Ident, PAT_IDENT),
];

const OPTIONS_RULES: &[RuleDef] = &[
    rule("NEWLINE", TokenKind::Newline, r"\n"),
    rule("LONG_BLANK", TokenKind::LongBlank, r"[ \t]{2,}"),
    rule("BLANK", TokenKind::Blank, r"[ \t]"),
    heading("SECTION", TokenKind::Section, PAT_SECTION),
    rule("DEFAULT", TokenKind::Default, r"(?i)\[default:[ \t]*[^\]\n]*\]"),
    rule("LONG", TokenKind::Long, PAT_LONG),
    rule("SHORT", TokenKind::Short, PAT_SHORT),
    rule("ARGUMENT", TokenKind::Argument, PAT_ARGUMENT),
    rule("PUNCT", TokenKind::Punct, r"[,=]"),
    // Description words. The first character must not open one of the
    // structural tokens above, so `-s,` still lexes as SHORT + PUNCT.
    rule("TEXT", TokenKind::Text, r"[^\s=,<\[-]\S*|\S"),
];

const FREE_RULES: &[RuleDef] = &[
    rule("NEWLINE", TokenKind::Newline, r"\n"),
    heading("SECTION", TokenKind::Section, PAT_SECTION),
    rule("BLANK", TokenKind::Blank, r"[ \t]+"),
    rule("TEXT", TokenKind::Text, r"\S+"),
];

const ALL_STATE_DEFS: &[(&str, &[RuleDef])] = &[
    (STATE_PROLOGUE, PROLOGUE_RULES),
    (STATE_FIRST_PROGRAM_USAGE, FIRST_PROGRAM_USAGE_RULES),
    (STATE_USAGE_LINE, USAGE_LINE_RULES),
    (STATE_OPTIONS, OPTIONS_RULES),
    (STATE_FREE, FREE_RULES),
];

/// A compiled rule of one lexer state.
#[derive(Debug, Clone)]
pub(crate) struct Rule {
    pub name: &'static str,
    pub kind: TokenKind,
    pub re: Regex,
    pub line_start: bool,
}

/// A compiled lexer state.
#[derive(Debug, Clone)]
pub(crate) struct LexState {
    pub name: &'static str,
    pub rules: Vec<Rule>,
}

/// Compile a table pattern anchored at the cursor.
pub(crate) fn compile_anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

static BASE_STATES: Lazy<Vec<LexState>> = Lazy::new(|| {
    ALL_STATE_DEFS
        .iter()
        .map(|&(name, defs)| LexState {
            name,
            rules: defs
                .iter()
                .map(|def| Rule {
                    name: def.name,
                    kind: def.kind,
                    re: compile_anchored(def.pattern)
                        .expect("state table pattern must compile"),
                    line_start: def.line_start,
                })
                .collect(),
        })
        .collect()
});

/// A fresh copy of the compiled state tables for one lexer instance.
pub(crate) fn base_states() -> Vec<LexState> {
    BASE_STATES.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_states_compile() {
        let states = base_states();
        assert_eq!(states.len(), 5);
        assert_eq!(states[0].name, STATE_PROLOGUE);
        assert_eq!(states[2].name, STATE_USAGE_LINE);
    }

    #[test]
    fn prog_name_rule_exists_in_both_usage_states() {
        let states = base_states();
        for name in [STATE_FIRST_PROGRAM_USAGE, STATE_USAGE_LINE] {
            let state = states.iter().find(|s| s.name == name).unwrap();
            assert!(state.rules.iter().any(|r| r.name == RULE_PROG_NAME));
        }
    }

    #[test]
    fn options_text_rule_yields_to_short() {
        // `-s,` must not be swallowed by the description catch-all.
        let states = base_states();
        let options = states.iter().find(|s| s.name == STATE_OPTIONS).unwrap();
        let text = options.rules.iter().find(|r| r.name == "TEXT").unwrap();
        let short = options.rules.iter().find(|r| r.name == "SHORT").unwrap();
        assert_eq!(text.re.find(b"-s,").unwrap().end(), 1);
        assert_eq!(short.re.find(b"-s,").unwrap().end(), 2);
    }
}
