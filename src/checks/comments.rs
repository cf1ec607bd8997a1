//! Required comments on function definitions and global variables

use super::{CheckContext, StyleCheck};
use crate::domain::{Category, DiagnosticEngine};
use crate::source::{DeclNode, SourceFile, VarKind};
use std::collections::{BTreeMap, HashSet};

pub struct CommentsCheck;

/// Names of functions with a comment ending on the line above some
/// declaration or definition of them
fn commented_functions(file: &SourceFile, into: &mut HashSet<String>) {
    for (_, function) in file.functions() {
        let Some(name) = function.header.name.as_ref() else {
            continue;
        };
        let first = function.header.span.first;
        let line = file.line_of(first);
        let commented = file
            .leading_comment(first)
            .is_some_and(|comment| file.token(comment).end_line + 1 == line);
        if commented {
            into.insert(name.clone());
        }
    }
}

impl CommentsCheck {
    fn check_functions(ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        let mut commented = HashSet::new();
        commented_functions(ctx.file, &mut commented);
        for header in ctx.includes {
            commented_functions(header, &mut commented);
        }

        // first definition of each name
        let mut definitions: BTreeMap<&str, u32> = BTreeMap::new();
        for (_, function) in ctx.file.function_defs() {
            if let Some(name) = function.header.name.as_deref() {
                definitions
                    .entry(name)
                    .or_insert_with(|| ctx.file.line_of(function.header.span.first));
            }
        }

        for (name, line) in definitions {
            if name != "main" && !commented.contains(name) {
                out.record(
                    Category::Comments,
                    line,
                    "Functions should be preceded by explanatory comments.",
                );
            }
        }
    }

    fn check_globals(ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        let file = ctx.file;
        for decl in &file.decls {
            let DeclNode::Variable(var) = decl else {
                continue;
            };
            if var.kind != VarKind::Global || var.header.name.is_none() {
                continue;
            }
            let line = var.header.line;
            let leading = file
                .leading_comment(var.header.span.first)
                .is_some_and(|comment| file.token(comment).end_line + 1 >= line);
            let trailing = var
                .semicolon
                .and_then(|semi| semi.checked_add(1))
                .filter(|&next| next < file.tokens.len())
                .is_some_and(|next| {
                    let token = file.token(next);
                    token.is_comment() && token.line == line
                });
            if !leading && !trailing {
                out.record(Category::Comments, line, "Global variables should be commented.");
            }
        }
    }
}

impl StyleCheck for CommentsCheck {
    fn name(&self) -> &'static str {
        "comments"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Comments]
    }

    fn check(&self, ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        Self::check_functions(ctx, out);
        Self::check_globals(ctx, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::run;
    use crate::config::RuleConfig;

    #[test]
    fn test_function_comment_at_declaration_or_definition() {
        let out = run(
            &CommentsCheck,
            "funcs.c",
            "// declared here\n\
             void declared(void);\n\
             int defined(void);\n\
             \n\
             void missing(void) {\n\
             }\n\
             \n\
             void declared(void) {\n\
             }\n\
             \n\
             // defined here\n\
             int defined(void) {\n\
             \x20   return 1;\n\
             }\n\
             \n\
             /* too far */\n\
             \n\
             void spaced(void) {\n\
             }\n\
             \n\
             int main(void) {\n\
             \x20   return 0;\n\
             }\n",
        );
        assert_eq!(
            out,
            vec![
                "Line 5: [COMMENTS] Functions should be preceded by explanatory comments.",
                "Line 18: [COMMENTS] Functions should be preceded by explanatory comments.",
            ]
        );
    }

    #[test]
    fn test_comment_in_included_header_counts() {
        let config = RuleConfig::default();
        let header = SourceFile::parse("api.h", "// Does the work\nint work(void);\n", &config).unwrap();
        let file = SourceFile::parse("api.c", "#include \"api.h\"\n\nint work(void) {\n    return 0;\n}\n", &config).unwrap();
        let includes = [header];
        let ctx = CheckContext::new(&file, &config).with_includes(&includes);
        let mut out = DiagnosticEngine::new();
        CommentsCheck.check(&ctx, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_global_variable_comments() {
        let out = run(
            &CommentsCheck,
            "globals.c",
            "// counts things\n\
             int counter;\n\
             int bare;\n\
             \n\
             int trailing; // explained\n\
             /* a\n\
             \x20  b */\n\
             static const char *name = \"x\";\n\
             \n\
             /* far away */\n\
             \n\
             int lonely;\n",
        );
        assert_eq!(
            out,
            vec![
                "Line 3: [COMMENTS] Global variables should be commented.",
                "Line 12: [COMMENTS] Global variables should be commented.",
            ]
        );
    }
}
