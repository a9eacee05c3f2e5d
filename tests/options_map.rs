//! Options-map laws
//!
//! Aliases of one option line share a single rule instance; options with
//! a single argument report `arg_count == 1`; the `option-default`
//! feature surfaces `[default: VALUE]` annotations.

use docopt_lang::testing::parse_source;
use std::rc::Rc;

#[test]
fn aliases_point_to_the_identical_rule() {
    let parser = parse_source(
        "Usage: p [options]\n\nOptions:\n  -s, --separator=<str>  Field separator.\n",
    );
    assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());

    let options = parser.options_map().unwrap();
    let short = options.get("-s").expect("-s mapped");
    let long = options.get("--separator").expect("--separator mapped");
    assert!(Rc::ptr_eq(short, long), "aliases must share one instance");
    assert_eq!(short.arg_count, 1);
    assert_eq!(short.argument_name.as_deref(), Some("<str>"));
}

#[test]
fn each_line_gets_its_own_rule() {
    let parser = parse_source(
        "Usage: p [options]\n\nOptions:\n  -a  First flag.\n  -b  Second flag.\n",
    );
    assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());

    let options = parser.options_map().unwrap();
    let a = options.get("-a").expect("-a mapped");
    let b = options.get("-b").expect("-b mapped");
    assert!(!Rc::ptr_eq(a, b));
    assert_eq!(a.arg_count, 0);
    assert_eq!(b.arg_count, 0);
}

#[test]
fn positional_argument_form_counts_one_argument() {
    // no `=`: the argument follows the alias directly
    let parser = parse_source("Usage: p [options]\n\nOptions:\n  -c COLOR  Paint it.\n");
    assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());

    let options = parser.options_map().unwrap();
    let rule = options.get("-c").expect("-c mapped");
    assert_eq!(rule.arg_count, 1);
    assert_eq!(rule.argument_name.as_deref(), Some("COLOR"));
    assert_eq!(rule.short.as_deref(), Some("-c"));
    assert_eq!(rule.long, None);
}

#[test]
fn document_without_options_heading_yields_an_empty_map() {
    let parser = parse_source("Usage: p go\n");
    let options = parser.options_map().unwrap();
    assert!(options.is_empty());
}

#[cfg(feature = "option-default")]
mod default_values {
    use docopt_lang::testing::{descend, parse_source};
    use docopt_lang::NodeKind;

    #[test]
    fn default_annotation_is_attached_and_extracted() {
        let parser = parse_source(
            "Usage: p [options]\n\nOptions:\n  -d DIR  Working directory.\n          [default: /tmp]\n",
        );
        assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());

        let ast = parser.ast();
        let line = descend(
            ast,
            parser.options_node().unwrap(),
            &[NodeKind::OptionLine],
        );
        let default = ast
            .find_child(line, NodeKind::OptionDefault)
            .expect("default node attached to the option line");
        assert_eq!(ast.token_value(default), "[default: /tmp]");

        let options = parser.options_map().unwrap();
        let rule = options.get("-d").unwrap();
        assert_eq!(rule.default_value.as_deref(), Some("/tmp"));
        assert_eq!(rule.arg_count, 1);
    }

    #[test]
    fn awkward_default_values_survive_verbatim() {
        let parser = parse_source(
            "Usage: p [options]\n\nOptions:\n  -s SEP  Separator.\n          [default: ,]\n",
        );
        let options = parser.options_map().unwrap();
        assert_eq!(
            options.get("-s").unwrap().default_value.as_deref(),
            Some(",")
        );
    }
}

#[cfg(not(feature = "option-default"))]
mod without_default_feature {
    use docopt_lang::testing::{descend, parse_source};
    use docopt_lang::NodeKind;

    #[test]
    fn default_annotation_is_recognized_but_not_attached() {
        let parser = parse_source(
            "Usage: p [options]\n\nOptions:\n  -d DIR  Working directory.\n          [default: /tmp]\n",
        );
        assert!(parser.errors().is_empty(), "errors: {:?}", parser.errors());

        let ast = parser.ast();
        let line = descend(
            ast,
            parser.options_node().unwrap(),
            &[NodeKind::OptionLine],
        );
        assert!(ast.find_child(line, NodeKind::OptionDefault).is_none());

        let options = parser.options_map().unwrap();
        assert_eq!(options.get("-d").unwrap().default_value, None);
    }
}
