//! Maximum line length, measured after tab expansion

use super::{CheckContext, StyleCheck};
use crate::domain::{Category, DiagnosticEngine};

pub struct LineLengthCheck;

impl StyleCheck for LineLengthCheck {
    fn name(&self) -> &'static str {
        "line_length"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::LineLength]
    }

    fn check(&self, ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        let max = ctx.config.max_line_length as usize;
        for line in &ctx.file.lines {
            let length = line.len();
            if length > max {
                out.record(
                    Category::LineLength,
                    line.number,
                    format!("Line length of {length} is over the maximum of {max}."),
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

    #[test]
    fn test_long_lines_are_reported() {
        let long = format!("int x; /* {} */\n", "a".repeat(103));
        assert_eq!(long.trim_end().len(), 116);
        let out = run(&LineLengthCheck, "long.c", &format!("int a;\n{long}"));
        assert_eq!(out, vec!["Line 2: [LINE_LENGTH] Line length of 116 is over the maximum of 80."]);
    }

    #[test]
    fn test_tabs_count_after_expansion() {
        let config = ConfigBuilder::new().max_line_length(10).build().unwrap();
        let out = run_with(&LineLengthCheck, "tabs.c", "\t\tint x;\n\tint y;\n", &config);
        assert_eq!(out, vec!["Line 1: [LINE_LENGTH] Line length of 14 is over the maximum of 10."]);
    }
}
