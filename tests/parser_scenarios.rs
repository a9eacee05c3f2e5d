//! End-to-end parser scenarios
//!
//! Each test feeds a small docopt document through the full pipeline and
//! checks the resulting tree shape, down to node kinds, token values and
//! repeat flags.

use docopt_lang::testing::{
    assert_parent_child_consistent, child, child_kinds, descend, parse_source, usage_section,
};
use docopt_lang::{NodeKind, ParseError};

/// Unwrap the step wrapper the driver records errors under.
fn step_inner(error: &ParseError) -> &ParseError {
    match error {
        ParseError::Step { inner, .. } => &**inner,
        other => other,
    }
}

#[test]
fn minimal_single_command_usage() {
    let parser = parse_source("Usage: myprog go\n");
    assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());
    assert_eq!(parser.prog_name(), "myprog");

    let ast = parser.ast();
    let section = usage_section(&parser);
    assert_eq!(
        child_kinds(ast, section),
        vec![NodeKind::Usage, NodeKind::UsageLine]
    );
    assert_eq!(ast.token_value(child(ast, section, 0)), "Usage:");

    let line = child(ast, section, 1);
    assert_eq!(
        child_kinds(ast, line),
        vec![NodeKind::ProgName, NodeKind::UsageExpr]
    );
    assert_eq!(ast.token_value(child(ast, line, 0)), "myprog");

    let expr = child(ast, line, 1);
    assert_eq!(child_kinds(ast, expr), vec![NodeKind::UsageCommand]);
    assert_eq!(ast.token_value(child(ast, expr, 0)), "go");

    assert_parent_child_consistent(ast);
}

#[test]
fn optional_group_with_inline_argument() {
    let parser = parse_source("Usage: p [-c COLOR] FILE\n");
    assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());

    let ast = parser.ast();
    let expr = descend(
        ast,
        usage_section(&parser),
        &[NodeKind::UsageLine, NodeKind::UsageExpr],
    );
    assert_eq!(
        child_kinds(ast, expr),
        vec![NodeKind::UsageOptionalGroup, NodeKind::UsageArgument]
    );
    assert_eq!(ast.token_value(child(ast, expr, 1)), "FILE");

    let inner = descend(ast, child(ast, expr, 0), &[NodeKind::UsageExpr]);
    assert_eq!(
        child_kinds(ast, inner),
        vec![NodeKind::UsageShortOption, NodeKind::UsageArgument]
    );
    assert_eq!(ast.token_value(child(ast, inner, 0)), "-c");
    assert_eq!(ast.token_value(child(ast, inner, 1)), "COLOR");
}

#[test]
fn top_level_alternative_creates_required_group() {
    let parser = parse_source("Usage: p a | b\n");
    assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());

    let ast = parser.ast();
    let line = descend(ast, usage_section(&parser), &[NodeKind::UsageLine]);
    assert_eq!(
        child_kinds(ast, line),
        vec![NodeKind::ProgName, NodeKind::UsageExpr]
    );

    let group = descend(
        ast,
        child(ast, line, 1),
        &[NodeKind::UsageRequiredGroup],
    );
    assert_eq!(
        child_kinds(ast, group),
        vec![NodeKind::UsageExpr, NodeKind::UsageExpr]
    );
    let left = child(ast, group, 0);
    let right = child(ast, group, 1);
    assert_eq!(ast.token_value(child(ast, left, 0)), "a");
    assert_eq!(ast.token_value(child(ast, right, 0)), "b");

    // surgery must not leave stray parent pointers behind
    assert_parent_child_consistent(ast);
}

#[test]
fn ellipsis_sets_the_repeat_flag() {
    let parser = parse_source("Usage: p FILE...\n");
    assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());

    let ast = parser.ast();
    let expr = descend(
        ast,
        usage_section(&parser),
        &[NodeKind::UsageLine, NodeKind::UsageExpr],
    );
    let file = child(ast, expr, 0);
    assert_eq!(ast.kind(file), NodeKind::UsageArgument);
    assert_eq!(ast.token_value(file), "FILE");
    assert!(ast.repeat(file));
}

#[test]
fn repeated_prog_name_opens_a_new_usage_line() {
    let parser = parse_source("Usage: p one\n       p two\n");
    assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());

    let ast = parser.ast();
    let section = usage_section(&parser);
    assert_eq!(
        child_kinds(ast, section),
        vec![NodeKind::Usage, NodeKind::UsageLine, NodeKind::UsageLine]
    );

    for (index, command) in [(1, "one"), (2, "two")] {
        let line = child(ast, section, index);
        assert_eq!(ast.kind(child(ast, line, 0)), NodeKind::ProgName);
        assert_eq!(ast.token_value(child(ast, line, 0)), "p");
        let expr = descend(ast, line, &[NodeKind::UsageExpr]);
        assert_eq!(ast.token_value(child(ast, expr, 0)), command);
    }
}

#[test]
fn line_starting_with_a_foreign_word_is_an_error() {
    let parser = parse_source("Usage: p one\n       q two\n");
    let mismatch = parser
        .errors()
        .iter()
        .map(step_inner)
        .any(|e| matches!(e, ParseError::LineStartMismatch { expected, .. } if expected == "p"));
    assert!(mismatch, "errors: {:?}", parser.errors());

    // the bogus line must not have become a usage line
    let ast = parser.ast();
    let lines = child_kinds(ast, usage_section(&parser))
        .into_iter()
        .filter(|&k| k == NodeKind::UsageLine)
        .count();
    assert_eq!(lines, 1);
}

#[test]
fn options_section_with_alias_and_description() {
    let parser = parse_source(
        "Usage: p [options]\n\nOptions:\n  -s, --separator=<str>  Field separator.\n                         Continued description.\n",
    );
    assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());

    let ast = parser.ast();
    let section = parser.options_node().expect("options section exists");
    let line = descend(ast, section, &[NodeKind::OptionLine]);
    assert_eq!(
        child_kinds(ast, line),
        vec![
            NodeKind::OptionAlternativeGroup,
            NodeKind::OptionDescription
        ]
    );

    let group = child(ast, line, 0);
    assert_eq!(
        child_kinds(ast, group),
        vec![NodeKind::OptionShort, NodeKind::OptionLong]
    );
    assert_eq!(ast.token_value(child(ast, group, 0)), "-s");
    let long = child(ast, group, 1);
    assert_eq!(ast.token_value(long), "--separator");
    assert_eq!(child_kinds(ast, long), vec![NodeKind::OptionArgument]);
    assert_eq!(ast.token_value(child(ast, long, 0)), "<str>");

    let description = child(ast, line, 1);
    let words: Vec<&str> = ast
        .children(description)
        .iter()
        .map(|&c| ast.token_value(c))
        .collect();
    assert!(words.len() >= 2, "description too short: {words:?}");
    assert!(words.contains(&"Field"));
    assert!(words.contains(&"Continued"));

    assert_parent_child_consistent(ast);
}

// ----------------------------------------------------------------------
// Boundary behaviors
// ----------------------------------------------------------------------

#[test]
fn empty_input_is_an_error() {
    let parser = parse_source("");
    assert!(parser
        .errors()
        .iter()
        .map(step_inner)
        .any(|e| matches!(e, ParseError::UsageNotFound { .. })));
}

#[test]
fn prologue_only_input_is_an_error() {
    let parser = parse_source("Just a plain paragraph.\nNothing else.\n");
    assert!(parser
        .errors()
        .iter()
        .map(step_inner)
        .any(|e| matches!(e, ParseError::UsageNotFound { .. })));
}

#[test]
fn usage_without_program_name_is_an_error() {
    let parser = parse_source("Usage:\n\nOptions:\n");
    assert!(parser
        .errors()
        .iter()
        .map(step_inner)
        .any(|e| matches!(e, ParseError::MissingProgName { .. })));
}

#[test]
fn unterminated_groups_name_the_missing_closer() {
    let parser = parse_source("Usage: p [-c\n");
    assert!(parser
        .errors()
        .iter()
        .map(step_inner)
        .any(|e| matches!(e, ParseError::UnclosedGroup { closer: ']', .. })));

    let parser = parse_source("Usage: p (-c\n");
    assert!(parser
        .errors()
        .iter()
        .map(step_inner)
        .any(|e| matches!(e, ParseError::UnclosedGroup { closer: ')', .. })));
}

#[test]
fn mismatched_closer_is_an_error() {
    let parser = parse_source("Usage: p [-c)\n");
    assert!(parser
        .errors()
        .iter()
        .map(step_inner)
        .any(|e| matches!(e, ParseError::MismatchedCloser { .. })));
}

#[test]
fn blank_line_inside_a_group_is_an_error() {
    let parser = parse_source("Usage: p [a\n\nb]\n");
    assert!(parser
        .errors()
        .iter()
        .map(step_inner)
        .any(|e| matches!(e, ParseError::TwoNewlineInGroup { .. })));
}

#[test]
fn leading_ellipsis_is_an_error() {
    let parser = parse_source("Usage: p ...\n");
    assert!(parser
        .errors()
        .iter()
        .map(step_inner)
        .any(|e| matches!(e, ParseError::RepeatWithoutChild { .. })));
}

#[test]
fn second_usage_keyword_is_an_error() {
    let parser = parse_source("Usage: p go\nUsage: p stop\n");
    assert!(parser
        .errors()
        .iter()
        .map(step_inner)
        .any(|e| matches!(e, ParseError::UsageMisplaced { .. })));
}
