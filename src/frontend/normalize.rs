//! Source normalization
//!
//! Snippets pasted from a page often carry blank lines before and after the
//! code, sometimes holding stray indentation. Those lines would make the
//! lexer report an unexpected indent, so they are stripped before compiling.
//! Blank lines inside the snippet are left alone.

/// Strip leading and trailing whitespace-only lines.
///
/// The two ends are scanned independently. An all-blank input yields an
/// empty string.
pub fn normalize(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();

    let top = lines
        .iter()
        .take_while(|line| line.trim().is_empty())
        .count();
    let bottom = lines
        .iter()
        .rev()
        .take_while(|line| line.trim().is_empty())
        .count();

    // Everything blank: both scans cover the whole input.
    if top == lines.len() {
        return String::new();
    }

    lines[top..lines.len() - bottom].join("\n")
}
