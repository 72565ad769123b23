//! Property tests for token spans produced by the lexer

use proptest::prelude::*;

use dtlink_core::span::{FileId, LineIndex};
use dtlink_parser::{lexer::tokenize, parse};

const FRAGMENTS: &[&str] = &[
    "/dts-v1/;",
    "/ {",
    "};",
    "uart0: serial@4000c000 {",
    "status = \"okay\";",
    "reg = <0x0 0x1000>;",
    "clocks = <&clk 1>, <&{/soc/clk@1}>;",
    "data = [de ad be ef];",
    "&uart0 {",
    "/delete-node/ &{/soc/spi@2000};",
    "/delete-property/ status;",
    "linux,phandle = <7>;",
];

const SEPARATORS: &[&str] = &[" ", "\n", "\t", "\n\n", " /* note */ ", " // note\n"];

fn fragments() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(prop::sample::select(FRAGMENTS), 0..16),
        prop::sample::select(SEPARATORS),
    )
        .prop_map(|(parts, separator)| parts.join(separator))
}

proptest! {
    #[test]
    fn test_tokens_cover_valid_source(source in fragments()) {
        let index = LineIndex::new(&source);
        let (tokens, diagnostics) = tokenize(&source, FileId::default(), &index);

        prop_assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let mut offset = 0;
        for token in &tokens {
            prop_assert_eq!(token.span.start(), offset);
            prop_assert!(!token.span.is_empty());
            prop_assert_eq!(token.span.start_pos(), index.position(token.span.start()));
            offset = token.span.end();
        }
        prop_assert_eq!(offset, source.len());
    }

    #[test]
    fn test_spans_stay_ordered_on_arbitrary_input(source in "[ -~\n\t]{0,80}") {
        let index = LineIndex::new(&source);
        let (tokens, _) = tokenize(&source, FileId::default(), &index);

        let mut offset = 0;
        for token in &tokens {
            prop_assert!(token.span.start() >= offset);
            prop_assert!(token.span.end() <= source.len());
            offset = token.span.end();
        }

        // Parsing recovers from anything; every reported span is in the text.
        let parsed = parse(&source, FileId::default());
        for diagnostic in &parsed.diagnostics {
            for label in diagnostic.labels() {
                prop_assert!(label.span().start() <= source.len());
            }
        }
    }
}
