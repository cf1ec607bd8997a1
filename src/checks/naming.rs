//! Identifier naming conventions and Hungarian notation

use super::{CheckContext, StyleCheck};
use crate::config::HungarianConfig;
use crate::domain::{Category, Diagnostic, DiagnosticEngine};
use crate::source::{DeclNode, TypeSummary, VarKind};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref UPPER_CAMEL: Regex = Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap();
    static ref LOWER_CAMEL: Regex = Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap();
    static ref UPPER_SNAKE: Regex = Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap();
    static ref LOWER_SNAKE: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    static ref FILE_CAMEL: Regex = Regex::new(r"^[a-z0-9][a-zA-Z0-9]*$").unwrap();
}

const MISNAMED: &str = "' misnamed.";
const ALREADY_INFRACTED: &str = "' misnamed but has already been infracted.";
const FILE_RULE: &str = "Files should be namedLikeThis.";

/// The one case style a spelling falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStyle {
    UpperSnakeCase,
    LowerSnakeCase,
    UpperCamelCase,
    LowerCamelCase,
    Other,
}

/// Case style of `name`. All-caps names count as UPPER_SNAKE_CASE and
/// single-word lowercase names as lowerCamelCase.
pub fn classify(name: &str) -> CaseStyle {
    if UPPER_SNAKE.is_match(name) {
        CaseStyle::UpperSnakeCase
    } else if UPPER_CAMEL.is_match(name) {
        CaseStyle::UpperCamelCase
    } else if LOWER_CAMEL.is_match(name) {
        CaseStyle::LowerCamelCase
    } else if LOWER_SNAKE.is_match(name) {
        CaseStyle::LowerSnakeCase
    } else {
        CaseStyle::Other
    }
}

fn starts_or_ends(name: &str, marker: &str) -> bool {
    name.starts_with(marker) || name.ends_with(marker)
}

fn pointer_marked(name: &str) -> bool {
    starts_or_ends(name, "ptr") || name.contains("pointer")
}

fn array_marked(name: &str) -> bool {
    starts_or_ends(name, "arr") || name.contains("array")
}

/// Whether a variable name encodes its type
pub fn is_hungarian(name: &str, ty: &TypeSummary, config: &HungarianConfig) -> bool {
    if !config.enabled {
        return false;
    }
    let extra = config.extra_prefixes.iter().any(|prefix| {
        name.strip_prefix(prefix.as_str())
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_uppercase())
    });
    if extra {
        return true;
    }

    let lower = name.to_ascii_lowercase();
    let name = lower.as_str();
    if ty.function_pointer {
        starts_or_ends(name, "fp") || pointer_marked(name)
    } else if ty.pointer {
        array_marked(name) || pointer_marked(name)
    } else if ty.array {
        array_marked(name)
    } else if ty.char {
        starts_or_ends(name, "chr") || name.contains("char")
    } else if ty.record {
        starts_or_ends(name, "str") || name.contains("struct")
    } else if ty.enumeration {
        name.contains("enum")
    } else {
        false
    }
}

/// Name a run-wide de-duplication applies to, if this is such a finding
pub fn infracted_name(diagnostic: &Diagnostic) -> Option<&str> {
    if diagnostic.category != Category::Naming || diagnostic.message.contains(FILE_RULE) {
        return None;
    }
    let rest = diagnostic.message.strip_prefix('\'')?;
    rest.find(MISNAMED).map(|end| &rest[..end])
}

/// NOTE left in annotated files where a name was already reported
pub fn already_infracted(name: &str, line: u32) -> Diagnostic {
    Diagnostic::new(Category::Note, line, format!("'{name}{ALREADY_INFRACTED}"))
}

fn misnamed(out: &mut DiagnosticEngine, line: u32, name: &str, rule: &str) {
    out.record(Category::Naming, line, format!("'{name}{MISNAMED} {rule}"));
}

pub struct NamingCheck;

impl NamingCheck {
    fn check_file_name(ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        let file_name = ctx.file.file_name();
        let (stem, extension) = match file_name.find('.') {
            Some(dot) => (&file_name[..dot], file_name.rsplit('.').next().unwrap_or("c")),
            None => (file_name.as_str(), "c"),
        };
        if !FILE_CAMEL.is_match(stem) {
            misnamed(out, 1, &file_name, &format!("{FILE_RULE}{extension}"));
        }
    }
}

impl StyleCheck for NamingCheck {
    fn name(&self) -> &'static str {
        "naming"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Naming]
    }

    fn check(&self, ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        Self::check_file_name(ctx, out);

        for decl in &ctx.file.decls {
            let Some(name) = decl.name() else {
                continue;
            };
            let line = decl.line();
            match decl {
                DeclNode::Variable(var) => {
                    let (pattern, rule) = match var.kind {
                        VarKind::Field => (&*LOWER_CAMEL, "Struct/Union fields should be namedLikeThis."),
                        _ => (&*LOWER_CAMEL, "Variables should be namedLikeThis."),
                    };
                    // a name gets at most one finding per declaration
                    if !pattern.is_match(name) {
                        misnamed(out, line, name, rule);
                    } else if is_hungarian(name, &var.ty, &ctx.config.hungarian) {
                        misnamed(out, line, name, "Hungarian notation is not to be used.");
                    }
                }
                DeclNode::FunctionDecl(_) | DeclNode::FunctionDef(_) => {
                    if name != "main" && !LOWER_SNAKE.is_match(name) {
                        misnamed(out, line, name, "Functions should be named_like_this.");
                    }
                }
                DeclNode::Struct(record) | DeclNode::Union(record) => {
                    if record.is_definition() && !UPPER_CAMEL.is_match(name) {
                        misnamed(out, line, name, "Types should be NamedLikeThis.");
                    }
                }
                DeclNode::Enum(e) => {
                    if e.is_definition() && !UPPER_CAMEL.is_match(name) {
                        misnamed(out, line, name, "Enums should be NamedLikeThis.");
                    }
                }
                DeclNode::EnumConstant(_) => {
                    if !UPPER_SNAKE.is_match(name) {
                        misnamed(out, line, name, "Enum constants should be NAMED_LIKE_THIS.");
                    }
                }
                DeclNode::Typedef(_) => {
                    if !UPPER_CAMEL.is_match(name) {
                        misnamed(out, line, name, "Types should be NamedLikeThis.");
                    }
                }
                DeclNode::Macro(m) => {
                    if !m.header_guard && !UPPER_SNAKE.is_match(name) {
                        misnamed(out, line, name, "#defines should be NAMED_LIKE_THIS.");
                    }
                }
            }
        }
    }
}
