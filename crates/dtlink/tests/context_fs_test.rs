//! Integration tests for contexts backed by the file system

use std::{fs, path::Path};

use tempfile::TempDir;

use dtlink::{
    Context, DtLinkError, FsSources,
    config::{AppConfig, ContextConfig, DiagnosticsConfig},
    issue::IssueKind,
};
use dtlink_parser::error::ErrorCode;

fn write(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

#[test]
fn test_context_reads_includes_from_disk() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "include/soc.dtsi", "/ { soc { uart0: serial@1000 { }; }; };");
    write(dir.path(), "common.dtsi", "/ { chosen { }; };");
    write(
        dir.path(),
        "boards/board.dts",
        "/dts-v1/;\n#include <soc.dtsi>\n&uart0 { status = \"okay\"; };\n",
    );

    let config = AppConfig::new(
        ContextConfig::new(
            vec![dir.path().join("include")],
            vec![dir.path().join("common.dtsi")],
        ),
        DiagnosticsConfig::default(),
    );
    let mut context = Context::new(dir.path().join("boards/board.dts"), FsSources, config);
    let runtime = context.runtime().unwrap();

    assert_eq!(
        context.ordered_files(),
        [
            dir.path().join("common.dtsi"),
            dir.path().join("include/soc.dtsi"),
            dir.path().join("boards/board.dts"),
        ]
    );
    assert!(context.diagnostics().is_empty(), "{:?}", context.diagnostics());
    assert!(runtime.resolve("/chosen").is_some());
    let uart = runtime.label("uart0").unwrap();
    assert!(runtime.node(uart).property("status").is_some());
}

#[test]
fn test_context_revaluates_after_edit() {
    let dir = TempDir::new().unwrap();
    let board = dir.path().join("board.dts");
    write(dir.path(), "board.dts", "/ { n { }; };\n/delete-property/ missing;\n");

    let mut context = Context::new(&board, FsSources, AppConfig::default());
    let first = context.runtime().unwrap();
    assert_eq!(first.issues()[0].kind(), IssueKind::PropertyDoesNotExist);

    write(dir.path(), "board.dts", "/ { n { missing; }; };\n");
    let second = context.revaluate(Some(board.as_path())).unwrap();

    assert!(second.issues().is_empty());
    assert!(second.generation() > first.generation());
    assert!(context.diagnostics().is_empty());
}

#[test]
fn test_syntax_errors_surface_with_linker_issues() {
    let dir = TempDir::new().unwrap();
    let board = dir.path().join("board.dts");
    write(dir.path(), "board.dts", "/ { a = ; };\n&nowhere { };\n");

    let mut context = Context::new(&board, FsSources, AppConfig::default());
    context.runtime().unwrap();

    let codes: Vec<_> = context
        .diagnostics()
        .iter()
        .filter_map(|diagnostic| diagnostic.code())
        .collect();
    assert_eq!(codes, [ErrorCode::E100, ErrorCode::E402]);
}

#[test]
fn test_missing_common_file_is_a_hard_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "board.dts", "/ { };");

    let mut config = AppConfig::default();
    config.context_mut().add_common(dir.path().join("absent.dtsi"));
    let mut context = Context::new(dir.path().join("board.dts"), FsSources, config);

    let err = context.runtime().unwrap_err();
    assert!(matches!(err, DtLinkError::SourceUnavailable { .. }));
}
