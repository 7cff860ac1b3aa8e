//! Prompts for the Flower of Life vision-model analysis.
//!
//! Every prompt lives here so the section splitter's expectations and the
//! wording that produces them can be checked side by side: the eight titles in
//! [`DEFAULT_PROMPT`] are exactly [`crate::pipeline::sections::CANONICAL_TITLES`].
//!
//! Callers may replace the user prompt; the system prompt is fixed.

/// System message sent ahead of every analysis request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Default user prompt: a second-person reading under eight numbered headings,
/// bullet points under each, no tables.
pub const DEFAULT_PROMPT: &str = concat!(
    "请你用以第二人称为这个名为\"生命之花\"的图片做一个完整的解析：",
    "1 . 图案结构解读 2 . 颜色能量解读 3 . 绘画表现方式 4 . 性格与核心天赋 ",
    "5 . 荣格原型分析 6 . 职业与发展方向 7 . 成长与建议 8 . 总结金句？",
    "请回答具有逻辑，每个一级标题下的内容再分点回答。不要以表格的形式出现。",
    "不要出现敏感词：灵性"
);

/// Appended to caller prompts so the answer stays renderable as prose.
pub const NO_TABLE_SUFFIX: &str = "。请不要以表格的形式出现回答";

const NO_TABLE_MARKER: &str = "不要以表格的形式";

/// Choose the user prompt for one request.
///
/// A non-blank override replaces [`DEFAULT_PROMPT`] entirely and gets
/// [`NO_TABLE_SUFFIX`] appended, unless it already asks for no tables.
pub fn build_user_prompt(prompt_override: Option<&str>) -> String {
    match prompt_override.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) if p.contains(NO_TABLE_MARKER) => p.to_string(),
        Some(p) => format!("{p}{NO_TABLE_SUFFIX}"),
        None => DEFAULT_PROMPT.to_string(),
    }
}
