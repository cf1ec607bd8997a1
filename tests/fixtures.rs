// Whole-file checks against the C sources under testdata/
//
// Each case runs the default rule set over one fixture and compares the
// findings of a single category, line for line.

use nett::{AnalysisOptions, Analyzer, Category, NettValidator};
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
}

fn findings(name: &str, category: Category) -> Vec<String> {
    let analyzer = Analyzer::with_defaults().unwrap();
    let report = analyzer.analyze_file(fixture(name)).unwrap();
    let tag = format!("[{}]", category.as_str());
    report.render().into_iter().filter(|line| line.contains(&tag)).collect()
}

const BINARY_OPERATORS: &[&str] = &[
    "Line 8: [WHITESPACE] '*' at position 12, expected 1 space, found 2",
    "Line 8: [WHITESPACE] 'y' at position 16, expected 1 space, found 3",
    "Line 9: [WHITESPACE] '/' at position 13, expected 1 space, found 3",
    "Line 9: [WHITESPACE] 'y' at position 17, expected 1 space, found 3",
    "Line 10: [WHITESPACE] '%' at position 14, expected 1 space, found 4",
    "Line 10: [WHITESPACE] 'y' at position 17, expected 1 space, found 2",
    "Line 13: [WHITESPACE] '+' at position 12, expected 1 space, found 2",
    "Line 13: [WHITESPACE] 'y' at position 15, expected 1 space, found 2",
    "Line 14: [WHITESPACE] '-' at position 13, expected 1 space, found 3",
    "Line 14: [WHITESPACE] 'y' at position 16, expected 1 space, found 2",
    "Line 17: [WHITESPACE] '<<' at position 12, expected 1 space, found 2",
    "Line 17: [WHITESPACE] 'y' at position 16, expected 1 space, found 2",
    "Line 18: [WHITESPACE] '>>' at position 12, expected 1 space, found 2",
    "Line 18: [WHITESPACE] 'x' at position 16, expected 1 space, found 2",
    "Line 21: [WHITESPACE] '<' at position 12, expected 1 space, found 2",
    "Line 21: [WHITESPACE] 'x' at position 15, expected 1 space, found 2",
    "Line 22: [WHITESPACE] '>' at position 19, expected 1 space, found 2",
    "Line 22: [WHITESPACE] 'y' at position 22, expected 1 space, found 2",
    "Line 23: [WHITESPACE] '>=' at position 20, expected 1 space, found 3",
    "Line 23: [WHITESPACE] 'x' at position 25, expected 1 space, found 3",
    "Line 23: [WHITESPACE] ',' at position 27, expected 0 spaces, found 1",
    "Line 23: [WHITESPACE] 'x' at position 30, expected 1 space, found 2",
    "Line 23: [WHITESPACE] '<=' at position 33, expected 1 space, found 2",
    "Line 23: [WHITESPACE] 'y' at position 37, expected 1 space, found 2",
    "Line 28: [WHITESPACE] '==' at position 12, expected 1 space, found 2",
    "Line 28: [WHITESPACE] 'y' at position 16, expected 1 space, found 2",
    "Line 28: [WHITESPACE] '||' at position 19, expected 1 space, found 2",
    "Line 28: [WHITESPACE] 'y' at position 23, expected 1 space, found 2",
    "Line 28: [WHITESPACE] '!=' at position 26, expected 1 space, found 2",
    "Line 28: [WHITESPACE] 'x' at position 30, expected 1 space, found 2",
    "Line 28: [WHITESPACE] '&&' at position 33, expected 1 space, found 2",
    "Line 28: [WHITESPACE] 'argc' at position 37, expected 1 space, found 2",
    "Line 29: [WHITESPACE] '&' at position 19, expected 1 space, found 2",
    "Line 29: [WHITESPACE] 'y' at position 22, expected 1 space, found 2",
    "Line 29: [WHITESPACE] '|' at position 25, expected 1 space, found 2",
    "Line 29: [WHITESPACE] 'z' at position 28, expected 1 space, found 2",
    "Line 29: [WHITESPACE] '^' at position 31, expected 1 space, found 2",
    "Line 29: [WHITESPACE] 'argc' at position 34, expected 1 space, found 2",
    "Line 33: [WHITESPACE] '=' at position 8, expected 1 space, found 2",
    "Line 33: [WHITESPACE] 'x' at position 11, expected 1 space, found 2",
    "Line 34: [WHITESPACE] '*=' at position 8, expected 1 space, found 2",
    "Line 34: [WHITESPACE] 'y' at position 12, expected 1 space, found 2",
    "Line 35: [WHITESPACE] '/=' at position 9, expected 1 space, found 3",
    "Line 35: [WHITESPACE] 'x' at position 13, expected 1 space, found 2",
    "Line 36: [WHITESPACE] '%=' at position 10, expected 1 space, found 4",
    "Line 36: [WHITESPACE] 'y' at position 17, expected 1 space, found 5",
    "Line 37: [WHITESPACE] '+=' at position 9, expected 1 space, found 3",
    "Line 37: [WHITESPACE] 'y' at position 13, expected 1 space, found 2",
    "Line 38: [WHITESPACE] '-=' at position 8, expected 1 space, found 2",
    "Line 38: [WHITESPACE] 'x' at position 13, expected 1 space, found 3",
    "Line 39: [WHITESPACE] '<<=' at position 9, expected 1 space, found 3",
    "Line 39: [WHITESPACE] 'argc' at position 14, expected 1 space, found 2",
    "Line 40: [WHITESPACE] '>>=' at position 9, expected 1 space, found 3",
    "Line 40: [WHITESPACE] 'argc' at position 14, expected 1 space, found 2",
    "Line 41: [WHITESPACE] '&=' at position 10, expected 1 space, found 4",
    "Line 41: [WHITESPACE] 'x' at position 14, expected 1 space, found 2",
    "Line 42: [WHITESPACE] '^=' at position 9, expected 1 space, found 3",
    "Line 42: [WHITESPACE] 'x' at position 13, expected 1 space, found 2",
    "Line 43: [WHITESPACE] '|=' at position 9, expected 1 space, found 3",
    "Line 43: [WHITESPACE] 'argc' at position 14, expected 1 space, found 3",
];

const SWITCH_STATEMENTS: &[&str] = &[
    "Line 6: [WHITESPACE] Switch statements should look like: switch (...",
    "Line 9: [WHITESPACE] '1' at position 15, expected 1 space, found 2",
    "Line 14: [WHITESPACE] '(' at position 13, expected 1 space, found 2",
    "Line 16: [WHITESPACE] ':' at position 21, expected 0 spaces, found 1",
    "Line 21: [WHITESPACE] 'argc' at position 14, expected 0 spaces, found 1",
    "Line 21: [WHITESPACE] ')' at position 19, expected 0 spaces, found 1",
    "Line 23: [WHITESPACE] '{' at position 18, expected 1 space, found 2",
    "Line 31: [WHITESPACE] Closing parentheses should look like: ...X)",
    "Line 33: [WHITESPACE] Case statements should look like: case X:",
    "Line 39: [WHITESPACE] '{' at position 20, expected 1 space, found 2",
    "Line 41: [WHITESPACE] Case expressions should look like: case X:",
];

const ENUMS: &[&str] = &[
    "Line 2: [WHITESPACE] 'enum' at position 10, expected 1 space, found 2",
    "Line 4: [WHITESPACE] ';' at position 7, expected 0 spaces, found 1",
    "Line 7: [WHITESPACE] Typedef'd enums should look like: typedef enum ...",
    "Line 9: [WHITESPACE] ',' at position 10, expected 0 spaces, found 1",
    "Line 13: [WHITESPACE] 'Bax' at position 7, expected 1 space, found 2",
    "Line 18: [WHITESPACE] '{' at position 11, expected 1 space, found 2",
    "Line 21: [WHITESPACE] Semicolons should be on the same line as the end of a declaration.",
    "Line 26: [WHITESPACE] '{' at position 11, expected 1 space, found 2",
];

const PARAMETER_CONTINUATION: &[&str] = &[
    "Line 29: [INDENTATION] 'char' Expected indent of 8 spaces, found 5.",
    "Line 35: [INDENTATION] 'someParameter' Expected indent of 8 spaces, found 12.",
    "Line 36: [INDENTATION] 'anotherOne' Expected indent of 8 spaces, found 10.",
    "Line 42: [INDENTATION] 'bool' Expected indent of 8 spaces, found 14.",
    "Line 43: [INDENTATION] 'char' Expected indent of 8 spaces, found 13.",
];

const MACRO_BODIES: &[&str] = &[
    "Line 52: [INDENTATION] 'MACRO' Expected indent of 8 spaces, found 10.",
    "Line 56: [INDENTATION] 'i' Expected indent of 16 spaces, found 14.",
    "Line 59: [INDENTATION] 'MACRO' Expected indent of 8 spaces, found 6.",
    "Line 63: [INDENTATION] '2' Expected indent of 16 spaces, found 13.",
    "Line 64: [INDENTATION] ')' Expected indent of 16 spaces, found 12.",
    "Line 67: [INDENTATION] 'MACRO' Expected indent of 8 spaces, found 11.",
    "Line 72: [INDENTATION] 'argc' Expected indent of 16 spaces, found 21.",
    "Line 76: [INDENTATION] 'MACRO' Expected indent of 8 spaces, found 9.",
    "Line 78: [INDENTATION] 'MACRO' Expected indent of 8 spaces, found 5.",
    "Line 82: [INDENTATION] '2' Expected indent of 16 spaces, found 19.",
    "Line 85: [INDENTATION] '4' Expected indent of 16 spaces, found 21.",
    "Line 87: [INDENTATION] 'MACRO' Expected indent of 4 spaces, found 6.",
    "Line 89: [INDENTATION] '4' Expected indent of 12 spaces, found 8.",
];

const FUNCTION_COMMENTS: &[&str] = &["Line 7: [COMMENTS] Functions should be preceded by explanatory comments."];

#[rstest]
#[case("whitespace/binary_operators.c", Category::Whitespace, BINARY_OPERATORS)]
#[case("whitespace/switch_statements.c", Category::Whitespace, SWITCH_STATEMENTS)]
#[case("whitespace/enums.c", Category::Whitespace, ENUMS)]
#[case("indentation/parameter_continuation.c", Category::Indentation, PARAMETER_CONTINUATION)]
#[case("indentation/macro_bodies.c", Category::Indentation, MACRO_BODIES)]
#[case("comments/function_comments.c", Category::Comments, FUNCTION_COMMENTS)]
fn test_fixture_findings(#[case] name: &str, #[case] category: Category, #[case] expected: &[&str]) {
    assert_eq!(findings(name, category), expected);
}

#[test]
fn test_findings_are_ordered_by_line() {
    let analyzer = Analyzer::with_defaults().unwrap();
    let report = analyzer.analyze_file(fixture("whitespace/switch_statements.c")).unwrap();
    let lines: Vec<u32> = report.diagnostics.iter().map(|d| d.line).collect();
    let mut sorted = lines.clone();
    sorted.sort();
    assert_eq!(lines, sorted);
}

#[tokio::test]
async fn test_styled_copy_keeps_the_source() {
    let temp = TempDir::new().unwrap();
    let original = fs::read_to_string(fixture("whitespace/binary_operators.c")).unwrap();
    let copy = temp.path().join("binary_operators.c");
    fs::write(&copy, &original).unwrap();

    let validator = NettValidator::new().unwrap();
    let options = AnalysisOptions {
        annotate: true,
        ..Default::default()
    };
    let report = validator.check_paths(&[&copy], &options).unwrap();
    let written = validator.generate_styled_files(&report).await.unwrap();
    assert_eq!(written.len(), 1);

    let styled = fs::read_to_string(&written[0]).unwrap();
    let annotation = |line: &str| {
        line.strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .and_then(|(label, _)| Category::from_label(label))
            .is_some()
    };
    let stripped: Vec<&str> = styled.lines().filter(|line| !annotation(line)).collect();
    assert_eq!(stripped, original.lines().collect::<Vec<_>>());

    let whitespace = styled.lines().filter(|line| line.starts_with("[WHITESPACE]")).count();
    assert_eq!(whitespace, 15);
    assert!(styled.contains("[NOTE] More violations of this category exist in this file, but the cap has been reached."));
}
