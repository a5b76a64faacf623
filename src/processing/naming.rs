//! # 名称与 ID 派生
//!
//! - `extract_display_name`：从文件名 / URL 派生人类可读名称
//! - `name_to_id`：名称转稳定 ID，统一加 `custom-` 前缀，与内置壁纸隔离
//! - `ensure_unique_id`：按 `-2`、`-3`… 追加后缀直到不冲突
//!
//! 正则通过 `once_cell::sync::Lazy` 首次使用时编译。

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// 自定义壁纸 ID 前缀。
pub const CUSTOM_ID_PREFIX: &str = "custom-";

/// 名称为空时的占位名称。
pub const DEFAULT_DISPLAY_NAME: &str = "Custom Wallpaper";

static EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[A-Za-z0-9]{1,5}$").unwrap());
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_]+").unwrap());
static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// 从文件名或 URL 派生显示名称。
///
/// # 示例
/// ```rust
/// use wallpaper_vault::processing::extract_display_name;
///
/// assert_eq!(extract_display_name("sunset_over-the-sea.jpg"), "Sunset Over The Sea");
/// assert_eq!(extract_display_name("https://cdn.example.com/img/myCoolShot.png?w=10"), "My Cool Shot");
/// assert_eq!(extract_display_name("My Wallpaper"), "My Wallpaper");
/// ```
pub fn extract_display_name(input: &str) -> String {
    let stem = strip_extension(last_segment(input.trim()));

    let decoded = stem.replace("%20", " ");
    let spaced = SEPARATORS.replace_all(&decoded, " ");
    let spaced = CAMEL_BOUNDARY.replace_all(&spaced, "$1 $2");
    let collapsed = WHITESPACE.replace_all(spaced.trim(), " ");

    let titled = collapsed
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ");

    if titled.is_empty() {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        titled
    }
}

/// 显示名称转 ID。
///
/// ```rust
/// use wallpaper_vault::processing::name_to_id;
///
/// assert_eq!(name_to_id("My Cool Wallpaper!"), "custom-my-cool-wallpaper");
/// ```
pub fn name_to_id(name: &str) -> String {
    let lowered = name.to_lowercase();
    let slug = NON_ALNUM.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        format!("{CUSTOM_ID_PREFIX}wallpaper")
    } else {
        format!("{CUSTOM_ID_PREFIX}{slug}")
    }
}

/// 在已用 ID 集合中为 `base` 找到第一个可用 ID。
pub fn ensure_unique_id(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }

    let mut suffix: u32 = 2;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !used.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// 取最后一个有效片段：URL 取路径最后一段（忽略 query / fragment），路径取文件名。
fn last_segment(input: &str) -> &str {
    let without_query = input
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    let path = match without_query.find("://") {
        Some(idx) => {
            let after_scheme = &without_query[idx + 3..];
            match after_scheme.find('/') {
                Some(slash) => &after_scheme[slash..],
                None => "",
            }
        }
        None => without_query,
    };

    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or_default()
}

fn strip_extension(segment: &str) -> &str {
    match EXTENSION.find(segment) {
        Some(found) if found.start() > 0 => &segment[..found.start()],
        _ => segment,
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
