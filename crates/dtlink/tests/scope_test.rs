//! Integration tests for the scope predicate and visibility queries

use std::sync::Arc;

use proptest::prelude::*;

use dtlink::{
    config::DiagnosticsConfig,
    identifier::Name,
    resolver::resolve,
    runtime::Runtime,
    scope::{Cursor, in_scope},
    span::{FileId, Position},
};
use dtlink_parser::ast::Statement;

fn resolve_sources(sources: &[&str]) -> Runtime {
    let files = sources
        .iter()
        .enumerate()
        .map(|(i, source)| Arc::new(dtlink_parser::parse(source, FileId::new(i as u32))))
        .collect();
    resolve(files, &DiagnosticsConfig::default(), 0)
}

fn at(line: u32, column: u32) -> Cursor {
    Cursor::new(FileId::new(0), Position::new(line, column))
}

fn label_names(runtime: &Runtime, cursor: Cursor) -> Vec<String> {
    runtime
        .visible_labels(cursor)
        .into_iter()
        .map(|(label, _)| label.to_string())
        .collect()
}

#[test]
fn test_labels_visible_until_deleted() {
    let runtime = resolve_sources(&["/ { a: x { }; };\n/delete-node/ &a;\n/ { b: y { }; };\n"]);

    assert_eq!(label_names(&runtime, at(1, 0)), ["a"]);
    assert!(label_names(&runtime, at(2, 0)).is_empty());
    assert_eq!(label_names(&runtime, at(3, 0)), ["b"]);
}

#[test]
fn test_labels_of_earlier_files_are_visible() {
    let runtime = resolve_sources(&["/ { a: x { }; };", "/ { b: y { }; };"]);
    let start_of_second = Cursor::new(FileId::new(1), Position::default());

    assert_eq!(label_names(&runtime, start_of_second), ["a"]);
}

#[test]
fn test_visible_properties_follow_overrides_and_deletes() {
    let source = "/ { n {\n\tp = <1>;\n\tp = <2>;\n\tq;\n}; };\n/ { n { /delete-property/ q; }; };\n";
    let runtime = resolve_sources(&[source]);
    let n = runtime.resolve("/n").unwrap();

    let values = |cursor: Cursor| -> Vec<(String, Option<u64>)> {
        runtime
            .visible_properties(n, cursor)
            .into_iter()
            .map(|p| (p.name().to_string(), p.first_cell()))
            .collect()
    };

    assert_eq!(values(at(2, 0)), [("p".to_string(), Some(1))]);
    assert_eq!(
        values(at(5, 0)),
        [("p".to_string(), Some(2)), ("q".to_string(), None)]
    );
    assert_eq!(values(at(6, 0)), [("p".to_string(), Some(2))]);
}

#[test]
fn test_visible_child_definitions() {
    let source = "/ {\n\ta { };\n\tb { };\n};\n/delete-node/ &{/a};\n";
    let runtime = resolve_sources(&[source]);
    let root = runtime.root();
    let names = |cursor: Cursor| -> Vec<String> {
        runtime
            .visible_child_definitions(root, cursor)
            .into_iter()
            .map(|id| runtime.node(id).full_name())
            .collect()
    };

    assert!(names(at(1, 0)).is_empty());
    assert_eq!(names(at(2, 0)), ["a"]);
    // The deleted node is listed after the active ones.
    assert_eq!(names(at(4, 0)), ["b", "a"]);
    assert_eq!(names(at(5, 0)), ["b"]);
}

#[test]
fn test_child_from_scope() {
    let source = "/ { l: soc { uart@1000 { }; }; };\n/delete-node/ &{/soc/uart@1000};\n";
    let runtime = resolve_sources(&[source]);

    let before = at(1, 0);
    let uart = runtime.child_from_scope(&["&l", "uart"], before).unwrap();
    assert_eq!(runtime.node(uart).full_name(), "uart@1000");
    assert_eq!(runtime.child_from_scope(&["/", "soc", "uart@1000"], before), Some(uart));

    let after = at(2, 0);
    assert_eq!(runtime.child_from_scope(&["/", "soc", "uart@1000"], after), None);
    assert!(runtime.child_from_scope(&["&l"], after).is_some());
    assert_eq!(runtime.child_from_scope(&["&l"], at(0, 0)), None);
}

#[test]
fn test_runtime_in_scope_uses_file_order() {
    let runtime = resolve_sources(&["/ { a { }; };", "/ { b { }; };"]);
    let first = runtime.parsed(FileId::new(0)).unwrap().ast.statements[0].span();
    let second = runtime.parsed(FileId::new(1)).unwrap().ast.statements[0].span();

    assert!(runtime.in_scope(Cursor::new(FileId::new(1), Position::default()), first));
    assert!(!runtime.in_scope(Cursor::new(FileId::new(0), Position::new(9, 0)), second));
    assert_eq!(runtime.visible_labels(at(9, 0)), Vec::<(Name, _)>::new());
}

/// A small statement vocabulary for generated sources.
const SNIPPETS: &[&str] = &[
    "/ { a { p = <1>; }; };",
    "/ { L1: a { p = <2>; }; };",
    "/ { L2: b@1 { q = <&L1>; }; };",
    "/ { b@1 { r = &{/a}; }; };",
    "&L1 { p = <3>; };",
    "&L2 { /delete-property/ q; };",
    "/delete-node/ &L1;",
    "/delete-node/ &{/b@1};",
    "/ { /delete-node/ a; };",
    "&missing { c { }; };",
    "/ { c { }; c { }; };",
];

fn source() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(SNIPPETS), 0..8).prop_map(|s| s.join("\n"))
}

fn statement_spans(runtime: &Runtime, file: FileId) -> Vec<dtlink::span::Span> {
    fn walk(statement: &Statement, out: &mut Vec<dtlink::span::Span>) {
        out.push(statement.span());
        if let Statement::Node(block) = statement {
            for child in &block.body {
                walk(child, out);
            }
        }
    }
    let mut spans = Vec::new();
    for statement in &runtime.parsed(file).unwrap().ast.statements {
        walk(statement, &mut spans);
    }
    spans
}

proptest! {
    #[test]
    fn test_scope_is_antisymmetric_across_files(
        sources in prop::collection::vec(source(), 2..5),
        line in 0u32..20,
        column in 0u32..40,
        pick in any::<(prop::sample::Index, prop::sample::Index)>(),
    ) {
        let texts: Vec<&str> = sources.iter().map(String::as_str).collect();
        let runtime = resolve_sources(&texts);
        let order = runtime.file_order();

        let i = pick.0.index(order.len());
        let j = pick.1.index(order.len());
        prop_assume!(i < j);
        let (earlier, later) = (order[i], order[j]);
        let position = Position::new(line, column);

        for span in statement_spans(&runtime, earlier) {
            prop_assert!(in_scope(&order, Cursor::new(later, position), span));
        }
        for span in statement_spans(&runtime, later) {
            prop_assert!(!in_scope(&order, Cursor::new(earlier, position), span));
        }
    }

    #[test]
    fn test_resolution_is_deterministic(sources in prop::collection::vec(source(), 1..4)) {
        let texts: Vec<&str> = sources.iter().map(String::as_str).collect();
        let first = resolve_sources(&texts);
        let second = resolve_sources(&texts);

        prop_assert_eq!(first.issues(), second.issues());
        prop_assert_eq!(first.graph().len(), second.graph().len());
        for id in first.graph().ids() {
            prop_assert_eq!(first.graph().path(id), second.graph().path(id));
            prop_assert_eq!(first.node(id).children(), second.node(id).children());
            prop_assert_eq!(
                first.node(id).properties().keys().collect::<Vec<_>>(),
                second.node(id).properties().keys().collect::<Vec<_>>()
            );
        }
        prop_assert_eq!(first.label_table(), second.label_table());
    }
}
