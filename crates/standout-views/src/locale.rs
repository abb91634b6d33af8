//! Locale-specific template naming.
//!
//! A template `greeting.ftl` requested for `de-CH` is looked up as
//!
//! 1. `greeting_de_CH.ftl`
//! 2. `greeting_de.ftl`
//! 3. `greeting.ftl`
//!
//! and the first one that exists is rendered. Variants, when present, add a
//! more specific candidate in front (`greeting_de_CH_1996.ftl`). A variant
//! without a region keeps the empty region slot (`greeting_de__1996.ftl`).

use unic_langid::LanguageIdentifier;

/// Locale keys from most to least specific, joined with `_`.
///
/// The undetermined language (`und`) yields no keys.
pub fn locale_keys(locale: &LanguageIdentifier) -> Vec<String> {
    let language = locale.language.as_str();
    if locale.language.is_empty() {
        return Vec::new();
    }

    let region = locale.region.as_ref().map_or("", |region| region.as_str());
    let variants: Vec<&str> = locale.variants().map(|variant| variant.as_str()).collect();

    let mut keys = Vec::with_capacity(3);
    if !variants.is_empty() {
        keys.push(format!("{}_{}_{}", language, region, variants.join("_")));
    }
    if !region.is_empty() {
        keys.push(format!("{}_{}", language, region));
    }
    keys.push(language.to_string());
    keys
}

/// Candidate template names for `name` in `locale`, most specific first.
///
/// The unlocalized name is always the last candidate.
pub fn localized_names(name: &str, locale: &LanguageIdentifier) -> Vec<String> {
    let (stem, extension) = split_extension(name);
    let mut names: Vec<String> = locale_keys(locale)
        .into_iter()
        .map(|key| format!("{}_{}{}", stem, key, extension))
        .collect();
    names.push(name.to_string());
    names
}

fn split_extension(name: &str) -> (&str, &str) {
    let file_start = name.rfind('/').map_or(0, |slash| slash + 1);
    match name[file_start..].rfind('.') {
        Some(dot) if dot > 0 => name.split_at(file_start + dot),
        _ => (name, ""),
    }
}
