//! Identifier normalization
//!
//! Turns raw SKUs, URLs and names into canonical spellings and variant sets
//! so that differently formatted identifiers from the two catalogs meet in
//! the same index bucket.
//!
//! ## Variant set for a SKU
//! 1. upper-cased original, with and without separators
//! 2. retailer prefix (`BAS-`) removed, with and without separators
//! 3. base code before the first dash
//! 4. first two segments, joined with and without a dash
//! 5. numeric base (trailing letters removed)

use regex::Regex;
use std::collections::BTreeSet;

/// Words ignored when comparing names
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "with", "of", "for", "to", "from", "by",
];

lazy_static::lazy_static! {
    // 2-4 letter retailer prefix followed by a dash
    static ref RETAILER_PREFIX_RE: Regex = Regex::new(r"^[A-Z]{2,4}-").unwrap();
    static ref SEPARATOR_RE: Regex = Regex::new(r"[-_\s]").unwrap();
    static ref SEGMENT_RE: Regex = Regex::new(r"[-_]").unwrap();
    static ref TRAILING_LETTERS_RE: Regex = Regex::new(r"[A-Z]+$").unwrap();
    static ref PROTOCOL_RE: Regex = Regex::new(r"^https?://").unwrap();
    static ref WWW_RE: Regex = Regex::new(r"^www\.").unwrap();
    static ref QUERY_FRAGMENT_RE: Regex = Regex::new(r"[?#].*$").unwrap();
    static ref WORD_RE: Regex = Regex::new(r"\w+").unwrap();
    static ref NAME_SUFFIX_RE: Regex =
        Regex::new(r"\s+(fabric|leather|finish|material|pillow|mirror)$").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref NON_ALNUM_RE: Regex = Regex::new(r"[^a-z0-9\s]").unwrap();
    static ref LEADING_DIGITS_RE: Regex = Regex::new(r"^(\d+)").unwrap();
    static ref LOOKUP_SEPARATOR_RE: Regex = Regex::new(r"[+\s-]+").unwrap();
}

/// Strict SKU normalization used for exact comparison
///
/// Upper-cases, strips a retailer prefix and removes `-`, `_` and whitespace.
/// The result never contains a separator, so applying it twice is a no-op.
pub fn normalize_sku(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return String::new();
    }

    let without_prefix = RETAILER_PREFIX_RE.replace(&upper, "");
    SEPARATOR_RE.replace_all(&without_prefix, "").into_owned()
}

/// SKU variants for fuzzy lookup
///
/// Always contains `normalize_sku(raw)` when the input is non-empty.
pub fn sku_variants(raw: &str) -> BTreeSet<String> {
    let mut variants = BTreeSet::new();
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return variants;
    }

    variants.insert(upper.clone());
    variants.insert(SEPARATOR_RE.replace_all(&upper, "").into_owned());

    let without_prefix = RETAILER_PREFIX_RE.replace(&upper, "");
    if without_prefix != upper {
        variants.insert(SEPARATOR_RE.replace_all(&without_prefix, "").into_owned());
        variants.insert(without_prefix.into_owned());
    }

    if let Some((base, _)) = upper.split_once('-') {
        variants.insert(base.to_string());
    }

    let parts: Vec<&str> = SEGMENT_RE.split(&upper).collect();
    if parts.len() >= 2 {
        variants.insert(format!("{}-{}", parts[0], parts[1]));
        variants.insert(format!("{}{}", parts[0], parts[1]));
    }

    let dashless = upper.replace('-', "");
    let numeric_base = TRAILING_LETTERS_RE.replace(&dashless, "");
    if !numeric_base.is_empty() && numeric_base != upper {
        variants.insert(numeric_base.into_owned());
    }

    variants.remove("");
    variants
}

/// URL normalization: no protocol, no `www.`, no query/fragment, no trailing slash
pub fn normalize_url(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return String::new();
    }

    let url = PROTOCOL_RE.replace(&lowered, "");
    let url = WWW_RE.replace(&url, "");
    let url = QUERY_FRAGMENT_RE.replace(&url, "");
    url.trim_end_matches('/').to_string()
}

/// Lower-cased word tokens minus stop words
pub fn name_tokens(raw: &str) -> BTreeSet<String> {
    let lowered = raw.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|word| !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of the two names' token sets (0.0-1.0)
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let left = name_tokens(a);
    let right = name_tokens(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f64 / union as f64
}

/// Name key for card-side name lookup
///
/// Drops one trailing material word (`fabric`, `leather`, `finish` ...) and
/// collapses whitespace.
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let stripped = NAME_SUFFIX_RE.replace(&lowered, "");
    WHITESPACE_RE.replace_all(&stripped, " ").trim().to_string()
}

/// Whitespace-separated lower-case words
pub fn name_words(raw: &str) -> BTreeSet<String> {
    raw.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Compact lookup key: lower-case ASCII letters and digits only
pub fn lookup_key(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let cleaned = NON_ALNUM_RE.replace_all(&lowered, "");
    WHITESPACE_RE.replace_all(&cleaned, "").into_owned()
}

/// Loose variants for product-reference tokens
pub fn lookup_variants(raw: &str) -> BTreeSet<String> {
    let mut variants = BTreeSet::new();
    let sku = raw.trim();
    if sku.is_empty() {
        return variants;
    }

    variants.insert(sku.to_string());
    variants.insert(sku.to_lowercase());
    variants.insert(sku.to_uppercase());
    variants.insert(sku.trim_start_matches('0').to_string());

    if let Some(cap) = LEADING_DIGITS_RE.captures(sku) {
        variants.insert(cap[1].to_string());
    }

    let clean = LOOKUP_SEPARATOR_RE.replace_all(sku, "");
    variants.insert(clean.to_lowercase());
    variants.insert(clean.into_owned());

    variants.remove("");
    variants
}
