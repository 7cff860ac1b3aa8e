//! Text normalisation: deterministic cleanup of model-generated analysis text.
//!
//! ## Why normalise before parsing?
//!
//! Vision models answer the eight-heading prompt in loosely structured
//! Markdown. The same answer can arrive with `**bold**` headings, `---`
//! separators, Windows line endings, or three different bullet glyphs
//! depending on the model's mood. The section splitter and the layout engine
//! only want to deal with one shape of text, so every quirk is flattened here
//! first.
//!
//! ## Rule Order
//!
//! Line endings are unified before anything splits on `\n`. Star bullets are
//! rewritten before emphasis stripping, otherwise `* item *note*` would be read
//! as one emphasis span. Rule lines are dropped before bullet normalisation so
//! `- - -` style separators are judged on their original text.
//!
//! [`normalize`] is idempotent: applying it to its own output is a no-op.

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical prefix every bullet line starts with after normalisation.
pub const BULLET_PREFIX: &str = "- ";

/// Apply all normalisation rules to raw analysis text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Per line: rewrite `* ` bullets, strip `*` / `**` / `***` emphasis,
///    drop horizontal-rule and bare `#` lines, canonicalise bullet glyphs,
///    trim trailing whitespace
/// 4. Collapse 3+ consecutive blank lines down to 2
pub fn normalize(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = s
        .split('\n')
        .filter_map(normalise_line)
        .collect::<Vec<_>>()
        .join("\n");
    collapse_blank_lines(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Per-line cleanup ─────────────────────────────────────────────────

/// Returns `None` when the whole line should be dropped.
fn normalise_line(line: &str) -> Option<String> {
    let line = rewrite_star_bullet(line);
    let line = strip_emphasis(&line);
    let line = line.trim_end();
    if is_rule_line(line) {
        return None;
    }
    let line = normalise_bullet(line);
    Some(line.trim_end().to_string())
}

static RE_STAR_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\*\s+").unwrap());

/// `* item` is a Markdown bullet, not the start of an emphasis span.
fn rewrite_star_bullet(line: &str) -> String {
    RE_STAR_BULLET.replace(line, BULLET_PREFIX).into_owned()
}

static RE_EMPHASIS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"\*\*\*([^*\n]+?)\*\*\*").unwrap(),
        Regex::new(r"\*\*([^*\n]+?)\*\*").unwrap(),
        Regex::new(r"\*([^*\n]+?)\*").unwrap(),
    ]
});

/// Remove asterisk emphasis, keeping the wrapped text verbatim.
///
/// Unbalanced runs such as `**a*b**` only pair up after an inner span has been
/// removed, so passes repeat until nothing changes. Every effective pass
/// removes at least two asterisks, which bounds the loop.
fn strip_emphasis(line: &str) -> String {
    let mut current = line.to_string();
    loop {
        let mut next = current.clone();
        for re in RE_EMPHASIS.iter() {
            next = re.replace_all(&next, "$1").into_owned();
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

static RE_RULE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:-{3,}|_{3,}|—{3,}|#{1,6})\s*$").unwrap());

/// Horizontal rules (`---`, `___`, `———`) and bare heading marks (`###`).
fn is_rule_line(line: &str) -> bool {
    RE_RULE_LINE.is_match(line)
}

static RE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[•●○◦▪■·・]\s*|[-+*]\s+)").unwrap());

fn normalise_bullet(line: &str) -> String {
    match RE_BULLET.find(line) {
        Some(m) => format!("{}{}", BULLET_PREFIX, &line[m.end()..]),
        None => line.to_string(),
    }
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_strip_emphasis_levels() {
        assert_eq!(strip_emphasis("***重要*** 与 **加粗** 和 *斜体*"), "重要 与 加粗 和 斜体");
    }

    #[test]
    fn test_strip_emphasis_unbalanced_reaches_fixpoint() {
        let once = strip_emphasis("**a*b**");
        assert_eq!(strip_emphasis(&once), once);
        assert!(!once.contains("*a"));
    }

    #[test]
    fn test_lone_asterisk_survives() {
        assert_eq!(strip_emphasis("3 * 4"), "3 * 4");
    }

    #[test]
    fn test_rule_lines_dropped() {
        let out = normalize("上\n---\n___\n————\n###\n下");
        assert_eq!(out, "上\n下");
    }

    #[test]
    fn test_two_dashes_kept() {
        assert_eq!(normalize("a\n--\nb"), "a\n--\nb");
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        assert_eq!(normalize("  hello   \nworld \t"), "  hello\nworld");
    }

    #[test]
    fn test_bullet_variants_canonicalised() {
        let input = "• 第一\n●第二\n-   第三\n+ 第四\n* 第五 *注*\n· 第六";
        let expected = "- 第一\n- 第二\n- 第三\n- 第四\n- 第五 注\n- 第六";
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn test_hyphen_without_space_is_not_bullet() {
        assert_eq!(normalize("-5 度"), "-5 度");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(normalize("a\n\n\n\n\n\nb"), "a\n\n\nb");
        assert_eq!(normalize("a\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_rule_removal_does_not_leave_long_gaps() {
        assert_eq!(normalize("a\n\n---\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(normalize("hello\u{200B}world\u{FEFF}"), "helloworld");
    }

    #[test]
    fn test_heading_emphasis_removed() {
        assert_eq!(normalize("**1. 图案结构解读**"), "1. 图案结构解读");
    }

    #[test]
    fn test_idempotent_on_messy_input() {
        let samples = [
            "**生命之花分析报告**\r\n\r\n姓名：张三\r\n---\n**1. 图案结构解读**\n> • 中心 *对称*\n\n\n\n\n* 外圈 **多层**  \n",
            "**a*b** ***c** *d\n•\n•  \n- - -\n  - 缩进",
            "*** a\n** a **b\n* * * x\n*x** * y\n\u{00AD}———\n",
            "",
            "\n\n\n\n",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }
}
