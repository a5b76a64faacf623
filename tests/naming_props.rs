use std::collections::HashSet;

use proptest::prelude::*;
use wallpaper_vault::processing::{
    CUSTOM_ID_PREFIX, ensure_unique_id, extract_display_name, name_to_id, scaled_dimensions,
};

#[test]
fn documented_examples_hold() {
    assert_eq!(extract_display_name("My Wallpaper"), "My Wallpaper");
    assert_eq!(name_to_id("My Cool Wallpaper!"), "custom-my-cool-wallpaper");
}

#[test]
fn unique_id_suffixes_follow_sequence() {
    let mut used = HashSet::new();
    let mut produced = Vec::new();
    for _ in 0..4 {
        let id = ensure_unique_id("custom-sky", &used);
        used.insert(id.clone());
        produced.push(id);
    }
    assert_eq!(
        produced,
        vec!["custom-sky", "custom-sky-2", "custom-sky-3", "custom-sky-4"]
    );
}

proptest! {
    #[test]
    fn ids_are_prefixed_lowercase_slugs(name in ".{0,40}") {
        let id = name_to_id(&name);
        prop_assert!(id.starts_with(CUSTOM_ID_PREFIX));

        let slug = &id[CUSTOM_ID_PREFIX.len()..];
        prop_assert!(!slug.is_empty());
        prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
        prop_assert!(!slug.contains("--"));
        prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn display_names_are_never_empty_and_stable(name in "[A-Za-z0-9_ -]{0,30}(\\.[a-z]{3})?") {
        let display = extract_display_name(&name);
        prop_assert!(!display.trim().is_empty());
        prop_assert_eq!(extract_display_name(&display), display.clone());
    }

    #[test]
    fn clean_title_case_names_are_unchanged(words in prop::collection::vec("[A-Z][a-z]{1,8}", 1..5)) {
        let name = words.join(" ");
        prop_assert_eq!(extract_display_name(&name), name);
    }

    #[test]
    fn unique_id_is_never_in_use(base in "custom-[a-z]{1,8}", taken in 0usize..6) {
        let mut used: HashSet<String> = HashSet::new();
        used.insert(base.clone());
        for n in 2..(2 + taken) {
            used.insert(format!("{base}-{n}"));
        }

        let id = ensure_unique_id(&base, &used);
        prop_assert!(!used.contains(&id));
        prop_assert!(id.starts_with(&base));
    }

    #[test]
    fn resize_never_upscales_and_caps_width(width in 1u32..20_000, height in 1u32..20_000, target in 1u32..4_000) {
        let (w, h) = scaled_dimensions(width, height, target);
        prop_assert_eq!(w, width.min(target));
        prop_assert!(h >= 1);
        prop_assert!(h <= height);

        if width > target {
            let scale = target as f64 / width as f64;
            let expected = ((height as f64 * scale).round() as u32).max(1);
            prop_assert_eq!(h, expected);
        } else {
            prop_assert_eq!(h, height);
        }
    }
}
