use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::tempdir;

use dtlink::DtLinkError;
use dtlink_cli::{Args, error_adapter::diagnostic_reportables, run};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn collect_dts_files(dir: impl AsRef<Path>) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("Failed to read fixtures directory")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "dts"))
        .collect();
    files.sort();
    files
}

fn args(input: &Path) -> Args {
    Args {
        input: input.to_string_lossy().to_string(),
        config: None,
        include_path: Vec::new(),
        common: Vec::new(),
        dump_tree: false,
        log_level: "off".to_string(),
    }
}

#[test]
fn e2e_smoke_test_valid_board() {
    let dir = fixtures().join("valid");
    let mut args = args(&dir.join("board.dts"));
    args.include_path
        .push(dir.join("include").to_string_lossy().to_string());

    let outcome = run(&args).expect("valid board should resolve");

    assert!(
        outcome.diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        outcome.diagnostics
    );
    assert!(!outcome.failed());
    assert_eq!(outcome.context.ordered_files().len(), 3);

    let tree = outcome.tree();
    assert!(tree.contains("uart0: serial@4000c000 {"), "{tree}");
    assert!(tree.contains("status = \"okay\"; // replaces 1 definition"), "{tree}");
    assert!(tree.contains("// deleted node spi@40010000"), "{tree}");
}

#[test]
fn e2e_smoke_test_error_examples() {
    let error_examples = collect_dts_files(fixtures().join("errors"));

    assert!(
        !error_examples.is_empty(),
        "No error examples found in tests/fixtures/errors/"
    );

    let mut unexpectedly_succeeded = Vec::new();

    for example_path in &error_examples {
        let outcome = run(&args(example_path)).expect("error examples are readable");
        let reportables = diagnostic_reportables(&outcome.context, &outcome.diagnostics);

        if !outcome.failed() || !reportables.iter().any(|r| r.is_error()) {
            unexpectedly_succeeded.push(example_path.clone());
        }
    }

    if !unexpectedly_succeeded.is_empty() {
        eprintln!("\nError examples that unexpectedly succeeded:");
        for path in &unexpectedly_succeeded {
            eprintln!("  - {}", path.display());
        }
        panic!(
            "{} error example(s) succeeded unexpectedly",
            unexpectedly_succeeded.len()
        );
    }
}

#[test]
fn e2e_smoke_test_missing_include_is_a_warning() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let board = temp_dir.path().join("board.dts");
    fs::write(&board, "/dts-v1/;\n#include \"absent.dtsi\"\n/ { };\n").unwrap();

    let outcome = run(&args(&board)).unwrap();
    assert_eq!(outcome.warnings(), 1);
    assert!(!outcome.failed());

    let config = temp_dir.path().join("dtlink.toml");
    fs::write(&config, "[diagnostics]\nwarnings_as_errors = true\n").unwrap();
    let mut strict = args(&board);
    strict.config = Some(config.to_string_lossy().to_string());

    assert!(run(&strict).unwrap().failed());
}

#[test]
fn e2e_smoke_test_common_files_come_first() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let common = temp_dir.path().join("common.dtsi");
    let board = temp_dir.path().join("board.dts");
    fs::write(&common, "/ { aliases { }; };\n").unwrap();
    fs::write(&board, "/ { /delete-node/ aliases; };\n").unwrap();

    let mut args = args(&board);
    args.common.push(common.to_string_lossy().to_string());

    let outcome = run(&args).unwrap();
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.context.ordered_files(), [common, board]);
}

#[test]
fn e2e_smoke_test_missing_input() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let err = run(&args(&temp_dir.path().join("absent.dts"))).unwrap_err();
    assert!(matches!(err, DtLinkError::SourceUnavailable { .. }));
}
