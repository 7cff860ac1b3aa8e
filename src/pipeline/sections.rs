//! Section splitting: partition the analysis into the eight titled sections.
//!
//! The prompt asks the model for eight numbered top-level headings. Headings
//! are the only structure the text reliably has, so one regex decides what a
//! heading is ([`parse_heading`]) and everything else hangs off it.
//!
//! Every heading line ends the body before it. Only the eight
//! [`CANONICAL_TITLES`] are kept in the map; text under any other numbered
//! heading (an appendix, a stray `9. …`) is dropped with it.

use crate::config::DuplicatePolicy;
use crate::pipeline::normalize::normalize;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// The eight section titles, in display order.
pub const CANONICAL_TITLES: [&str; 8] = [
    "1. 图案结构解读",
    "2. 颜色能量解读",
    "3. 绘画表现方式",
    "4. 性格与核心天赋",
    "5. 荣格原型分析",
    "6. 职业与发展方向",
    "7. 成长与建议",
    "8. 总结金句",
];

/// A parsed heading line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub number: u32,
    pub title: String,
}

impl Heading {
    /// `"{number}. {title}"`, the key used in [`SectionMap`].
    pub fn key(&self) -> String {
        format!("{}. {}", self.number, self.title)
    }
}

/// One titled division of the analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub key: String,
    pub body: String,
}

/// Sections keyed by canonical title, iterated in canonical order.
///
/// Built once by [`split_sections`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    sections: HashMap<String, Section>,
}

impl SectionMap {
    pub fn get(&self, key: &str) -> Option<&Section> {
        self.sections.get(key)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Present sections in [`CANONICAL_TITLES`] order, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        CANONICAL_TITLES
            .iter()
            .filter_map(move |title| self.sections.get(*title))
    }

    /// Sections that will actually be rendered.
    pub fn non_empty(&self) -> impl Iterator<Item = &Section> {
        self.iter().filter(|s| !s.body.is_empty())
    }
}

// Whole-line match: optional `#`/emphasis marks, a positive integer, a period,
// a title that does not start with a digit (rules out `1.5`), optional
// trailing emphasis. Nothing else may be on the line.
static RE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(?:#{1,6}[ \t]*)?\**[ \t]*([1-9][0-9]*)[ \t]*\.[ \t]*([^\d\s*][^*]*?)[ \t]*\**[ \t]*$")
        .unwrap()
});

/// Parse `line` as a numbered section heading.
///
/// Accepts `3. 绘画表现方式`, `**3. 绘画表现方式**` and `### 3. 绘画表现方式`.
/// Rejects prose with embedded dots such as `image1.jpg is nice`. A trailing
/// `:`/`：` is not part of the title.
pub fn parse_heading(line: &str) -> Option<Heading> {
    let caps = RE_HEADING.captures(line)?;
    let number = caps[1].parse().ok()?;
    let title = caps[2]
        .trim()
        .trim_end_matches([':', '：'])
        .trim_end()
        .to_string();
    if title.is_empty() {
        return None;
    }
    Some(Heading { number, title })
}

/// Whether `line` is a numbered heading of any title.
pub fn is_section_heading(line: &str) -> bool {
    parse_heading(line).is_some()
}

/// Split text into sections, later duplicates replacing earlier ones.
pub fn split_sections(text: &str) -> SectionMap {
    split_sections_with(text, DuplicatePolicy::default())
}

/// Split text into sections under an explicit duplicate-heading policy.
pub fn split_sections_with(text: &str, policy: DuplicatePolicy) -> SectionMap {
    let mut sections: HashMap<String, Section> = HashMap::new();
    // Key is `None` while inside a non-canonical heading's body.
    let mut current: Option<(Option<String>, Vec<&str>)> = None;

    for line in text.split('\n') {
        if let Some(heading) = parse_heading(line) {
            if let Some((Some(k), body)) = current.take() {
                insert(&mut sections, k, &body, policy);
            }
            current = Some((canonical_key(heading), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((Some(k), body)) = current.take() {
        insert(&mut sections, k, &body, policy);
    }

    debug!("Split {} canonical sections", sections.len());
    SectionMap { sections }
}

fn canonical_key(heading: Heading) -> Option<String> {
    let key = heading.key();
    if CANONICAL_TITLES.contains(&key.as_str()) {
        Some(key)
    } else {
        debug!("Dropping non-canonical section '{}'", key);
        None
    }
}

fn insert(
    sections: &mut HashMap<String, Section>,
    key: String,
    lines: &[&str],
    policy: DuplicatePolicy,
) {
    if sections.contains_key(&key) {
        debug!("Duplicate section heading '{}' ({:?})", key, policy);
        if policy == DuplicatePolicy::FirstWriteWins {
            return;
        }
    }
    let body = clean_body(&lines.join("\n"));
    sections.insert(key.clone(), Section { key, body });
}

static RE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^>[ \t]*").unwrap());
static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)*").unwrap());

/// Drop blockquote marks, re-normalise and keep at most one blank line in a row.
fn clean_body(body: &str) -> String {
    let s = RE_QUOTE.replace_all(body, "");
    let s = normalize(&s);
    let s = RE_BLANK_RUN.replace_all(&s, "\n\n");
    s.trim().to_string()
}
