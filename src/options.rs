//! Options-section transform
//!
//! Flattens the parsed `Options_section` into a lookup map for the argv
//! matcher: every alias of an option points at the *same* rule instance,
//! so `options["-s"]` and `options["--separator"]` are identical, not
//! merely equal. `Rc` carries that identity; callers can check it with
//! `Rc::ptr_eq`.

use crate::ast::{DocoptAst, NodeId, NodeKind};
use crate::parsing::DocoptParser;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[cfg(feature = "option-default")]
use once_cell::sync::Lazy;
#[cfg(feature = "option-default")]
use regex::Regex;

/// One option definition, shared between all of its alias keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionRule {
    pub long: Option<String>,
    pub short: Option<String>,
    /// 0 or 1; docopt options take at most one argument.
    pub arg_count: usize,
    pub default_value: Option<String>,
    pub argument_name: Option<String>,
}

/// Alias literal to shared rule.
pub type OptionsMap = HashMap<String, Rc<OptionRule>>;

/// Errors from the options transform.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsError {
    /// The parser has no options node; `parse` was not run.
    NoOptionsSection,
}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionsError::NoOptionsSection => write!(f, "options node is not available"),
        }
    }
}

impl std::error::Error for OptionsError {}

#[cfg(feature = "option-default")]
static DEFAULT_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\[default:[ \t]*(?P<value>[^\]]*)\]$").unwrap());

impl<'s> DocoptParser<'s> {
    /// Transform the options section into an alias-keyed map. Aliases of
    /// one `Option_line` share a single `OptionRule` instance.
    pub fn options_map(&self) -> Result<OptionsMap, OptionsError> {
        let Some(section) = self.options_node() else {
            return Err(OptionsError::NoOptionsSection);
        };
        let ast = self.ast();
        let mut options = OptionsMap::new();

        for &line in ast.children(section) {
            if ast.kind(line) != NodeKind::OptionLine {
                continue;
            }

            let mut rule = OptionRule::default();
            let mut keys = Vec::new();
            collect_aliases(ast, line, &mut rule, &mut keys);

            #[cfg(feature = "option-default")]
            if let Some(value) = find_default(ast, line) {
                rule.default_value = Some(value);
            }

            if keys.is_empty() {
                continue;
            }
            let rule = Rc::new(rule);
            for key in keys {
                options.insert(key, Rc::clone(&rule));
            }
        }

        Ok(options)
    }
}

/// Walk the aliases of one option line, descending into an
/// `Option_alternative_group` when present.
fn collect_aliases(ast: &DocoptAst, node: NodeId, rule: &mut OptionRule, keys: &mut Vec<String>) {
    for &child in ast.children(node) {
        match ast.kind(child) {
            NodeKind::OptionAlternativeGroup => collect_aliases(ast, child, rule, keys),
            NodeKind::OptionLong => {
                let value = ast.token_value(child).to_string();
                rule.long = Some(value.clone());
                keys.push(value);
                record_argument(ast, child, rule);
            }
            NodeKind::OptionShort => {
                let value = ast.token_value(child).to_string();
                rule.short = Some(value.clone());
                keys.push(value);
                record_argument(ast, child, rule);
            }
            _ => {}
        }
    }
}

fn record_argument(ast: &DocoptAst, alias: NodeId, rule: &mut OptionRule) {
    let children = ast.children(alias);
    if children.len() == 1 && ast.kind(children[0]) == NodeKind::OptionArgument {
        rule.arg_count = 1;
        rule.argument_name = Some(ast.token_value(children[0]).to_string());
    }
}

#[cfg(feature = "option-default")]
fn find_default(ast: &DocoptAst, line: NodeId) -> Option<String> {
    let node = ast.find_child(line, NodeKind::OptionDefault)?;
    let raw = ast.token_value(node);
    DEFAULT_VALUE
        .captures(raw)
        .map(|caps| caps["value"].to_string())
}
