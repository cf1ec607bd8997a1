//! Physical lines and tab expansion

/// One physical line of a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number
    pub number: u32,
    /// Text as read, without the line terminator
    pub raw: String,
    /// Text with tabs expanded
    pub text: String,
}

impl SourceLine {
    /// Length of the expanded text in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether the line holds nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Number of leading spaces in the expanded text
    pub fn indent(&self) -> usize {
        self.text.chars().take_while(|c| *c == ' ').count()
    }
}

/// Expand tabs to the next multiple of `tab_width`.
///
/// Expanding an already expanded line returns it unchanged.
pub fn expand_tabs(line: &str, tab_width: u32) -> String {
    let width = tab_width.max(1) as usize;
    let mut out = String::with_capacity(line.len());
    let mut column = 0usize;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = width - (column % width);
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}

/// Split content into lines, dropping `\r` and expanding tabs.
pub fn split_lines(content: &str, tab_width: u32) -> Vec<SourceLine> {
    let mut lines: Vec<SourceLine> = content
        .split('\n')
        .enumerate()
        .map(|(index, raw)| {
            let raw = raw.replace('\r', "");
            SourceLine {
                number: index as u32 + 1,
                text: expand_tabs(&raw, tab_width),
                raw,
            }
        })
        .collect();

    // a trailing newline does not start another line
    if content.ends_with('\n') {
        lines.pop();
    }
    lines
}

/// The text the lexer sees: expanded lines joined with `\n`.
pub fn sanitize(content: &str, tab_width: u32) -> String {
    let mut out = split_lines(content, tab_width)
        .into_iter()
        .map(|line| line.text)
        .collect::<Vec<_>>()
        .join("\n");
    if content.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("\tx", "    x")]
    #[case("ab\tx", "ab  x")]
    #[case("abcd\tx", "abcd    x")]
    #[case("  \t\tx", "        x")]
    #[case("no tabs", "no tabs")]
    fn test_expand_tabs(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(expand_tabs(input, 4), expected);
    }

    #[test]
    fn test_expand_tabs_idempotent() {
        let once = expand_tabs("\tif (x)\t{", 4);
        assert_eq!(expand_tabs(&once, 4), once);
    }

    #[test]
    fn test_split_lines_strips_carriage_returns() {
        let lines = split_lines("int a;\r\n\tint b;\r\n", 4);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "int a;");
        assert_eq!(lines[1].text, "    int b;");
        assert_eq!(lines[1].raw, "\tint b;");
        assert_eq!(lines[1].number, 2);
        assert_eq!(lines[1].indent(), 4);
    }

    #[test]
    fn test_sanitize_keeps_trailing_newline() {
        assert_eq!(sanitize("a\tb\n", 4), "a   b\n");
        assert_eq!(sanitize("a", 4), "a");
    }

    #[test]
    fn test_blank_lines() {
        let lines = split_lines("x\n   \n\ny", 4);
        assert!(!lines[0].is_blank());
        assert!(lines[1].is_blank());
        assert!(lines[2].is_blank());
        assert_eq!(lines[3].len(), 1);
    }
}
