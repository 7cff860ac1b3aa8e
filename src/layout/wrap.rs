//! Greedy line breaking for fixed-width text cells.
//!
//! A line breaks at its last space; when there is none (CJK text, long URLs)
//! it breaks at the character that would overflow. The space a line breaks
//! on is consumed. Every line holds at least one character, so a glyph wider
//! than the cell still makes progress.

/// Split `text` into lines no wider than `max_width`.
///
/// `char_width` gives the advance of one character in the same unit as
/// `max_width`. Embedded `\n` always starts a new line. Empty input yields
/// one empty line; otherwise no trailing empty line is produced unless the
/// text ends in `\n`.
pub fn wrap_lines<F>(text: &str, max_width: f32, char_width: F) -> Vec<String>
where
    F: Fn(char) -> f32,
{
    let chars: Vec<char> = text.chars().collect();
    let mut lines = Vec::new();

    let mut start = 0;
    let mut i = 0;
    let mut last_space: Option<usize> = None;
    let mut width = 0.0f32;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            lines.push(collect(&chars[start..i]));
            i += 1;
            start = i;
            last_space = None;
            width = 0.0;
            continue;
        }
        if c == ' ' {
            last_space = Some(i);
        }
        width += char_width(c);
        if width > max_width {
            match last_space {
                Some(sp) => {
                    lines.push(collect(&chars[start..sp]));
                    i = sp + 1;
                }
                None => {
                    if i == start {
                        i += 1;
                    }
                    lines.push(collect(&chars[start..i]));
                }
            }
            start = i;
            last_space = None;
            width = 0.0;
        } else {
            i += 1;
        }
    }
    // A break that lands exactly on the end leaves nothing to emit.
    if start < chars.len() || lines.is_empty() || chars.last() == Some(&'\n') {
        lines.push(collect(&chars[start..]));
    }
    lines
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}
