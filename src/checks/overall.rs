//! File-level policies: headers, keyword macros and function length

use super::{CheckContext, StyleCheck};
use crate::domain::{Category, DiagnosticEngine};
use crate::source::lexer::is_keyword;

pub struct OverallCheck;

impl StyleCheck for OverallCheck {
    fn name(&self) -> &'static str {
        "overall"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Overall]
    }

    fn check(&self, ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        let file = ctx.file;
        let max = ctx.config.max_function_length;

        for (_, function) in file.function_defs() {
            if file.is_header() {
                out.record(
                    Category::Overall,
                    function.header.line,
                    "Headers should not contain function definitions.",
                );
            }
            if let Some((first, last)) = function.line_span(&file.tokens) {
                let length = last - first + 1;
                if length > max {
                    out.record(
                        Category::Overall,
                        first,
                        format!("Function length of {length} is over the maximum of {max}."),
                    );
                }
            }
        }

        for definition in file.macros() {
            if definition.header.name.as_deref().is_some_and(is_keyword) {
                out.record(
                    Category::Overall,
                    definition.header.line,
                    "Do not #define a keyword to something else.",
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::{run, run_with};
    use crate::config::ConfigBuilder;

    fn function_of(lines: usize) -> String {
        let mut source = String::from("int long_one(void)\n{\n");
        for _ in 0..lines - 3 {
            source.push_str("    work();\n");
        }
        source.push_str("}\n");
        source
    }

    #[test]
    fn test_function_length_limit() {
        let out = run(&OverallCheck, "len.c", &function_of(51));
        assert_eq!(
            out,
            vec!["Line 1: [OVERALL] Function length of 51 is over the maximum of 50."]
        );
        assert!(run(&OverallCheck, "len.c", &function_of(50)).is_empty());

        let config = ConfigBuilder::new().max_function_length(10).build().unwrap();
        let out = run_with(&OverallCheck, "len.c", &function_of(11), &config);
        assert_eq!(
            out,
            vec!["Line 1: [OVERALL] Function length of 11 is over the maximum of 10."]
        );
    }

    #[test]
    fn test_header_definitions_and_keyword_macros() {
        let out = run(
            &OverallCheck,
            "util.h",
            "#define while if\n#define LIMIT 3\n\nint helper(void) {\n    return LIMIT;\n}\n",
        );
        assert_eq!(
            out,
            vec![
                "Line 1: [OVERALL] Do not #define a keyword to something else.",
                "Line 4: [OVERALL] Headers should not contain function definitions.",
            ]
        );
    }
}
