//! Locating the JSON payload inside a model reply.

/// Returns the first balanced `{...}` span in `text`.
///
/// Braces inside string literals (including escaped quotes) do not count.
/// If the object never closes, the remainder of the text from the first `{`
/// is returned so the JSON parser can report where it broke. `None` means the
/// text contains no `{` at all.
pub fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                depth += 1;
            }
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    Some(&text[start..])
}

/// Drops the first and the last line and joins what is left.
///
/// Assumes exactly one line of preamble and one of postamble (typically
/// code-fence markers). A reply of one or two lines trims to nothing.
pub fn strip_wrapper_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= 2 {
        return String::new();
    }
    lines[1..lines.len() - 1].join("\n")
}
