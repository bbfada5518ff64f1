//! Scene folder style mapping
//!
//! A style (room scene) is a folder holding one `ORIGINAL_*` render whose
//! file name lists the SKUs staged in it, e.g.
//! `ORIGINAL_1342-3-6442-2.jpg`. SKUs are pulled out of that name with the
//! named scene rules, matched against card SKUs, and the result is inverted
//! into a card → styles index.

use crate::extract::{CardField, ExtractionRule};
use crate::index::VariantIndex;
use crate::reverse::CardRef;
use crate::types::{present, CardRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Prefix of the render that names a scene's products
pub const ORIGINAL_PREFIX: &str = "ORIGINAL_";
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".png"];

/// Folder name words marking work folders rather than styles
const SKIPPED_FOLDER_WORDS: &[&str] = &["analysis", "temp", "test"];
const STYLE_NAME_SEPARATOR: &str = " - ";

lazy_static::lazy_static! {
    static ref SCENE_RULES: Vec<ExtractionRule> = vec![
        // 1342-3, 2571-K173CB
        ExtractionRule::new("standard", CardField::Sku, r"(?i)\b(\d{3,4}-[A-Z0-9]+)\b"),
        // C000-72SFA1
        ExtractionRule::new("custom", CardField::Sku, r"(?i)\b([A-Z]\d{3}-[A-Z0-9]+)\b"),
        // 1215-05__6S24-0610
        ExtractionRule::new("underscore", CardField::Sku, r"(\d{3,4}-\d+)__"),
        // 0270
        ExtractionRule::new("numeric", CardField::Sku, r"\b(0\d{3})\b"),
    ];
}

/// Scene rules in evaluation order
pub fn scene_rules() -> &'static [ExtractionRule] {
    &SCENE_RULES
}

/// SKUs named by a scene render, upper-cased, first occurrence kept
pub fn extract_scene_skus(image_name: &str) -> Vec<String> {
    let mut name = image_name.replace(ORIGINAL_PREFIX, "");
    for extension in IMAGE_EXTENSIONS {
        name = name.replace(extension, "");
    }

    let mut skus: Vec<String> = Vec::new();
    for rule in scene_rules() {
        for sku in rule.apply_all(&name) {
            let sku = sku.to_uppercase();
            if !skus.contains(&sku) {
                skus.push(sku);
            }
        }
    }
    skus
}

/// Upper-cased SKU, its dash-free form and the base before the first dash
pub fn scene_sku_variants(sku: &str) -> BTreeSet<String> {
    let upper = sku.trim().to_uppercase();
    let mut variants = BTreeSet::new();
    if upper.is_empty() {
        return variants;
    }

    variants.insert(upper.replace('-', ""));
    if let Some((base, _)) = upper.split_once('-') {
        variants.insert(base.to_string());
    }
    variants.insert(upper);
    variants.remove("");
    variants
}

/// Style name from a scene folder name; None for work folders
pub fn style_name(folder_name: &str) -> Option<String> {
    if let Some((name, _)) = folder_name.split_once(STYLE_NAME_SEPARATOR) {
        return Some(name.to_string()).filter(|n| !n.trim().is_empty());
    }

    let lowered = folder_name.to_lowercase();
    if SKIPPED_FOLDER_WORDS.iter().any(|word| lowered.contains(word)) {
        return None;
    }
    Some(folder_name.to_string()).filter(|n| !n.trim().is_empty())
}

/// True for `ORIGINAL_*.jpg` / `ORIGINAL_*.png`
pub fn is_original_image(file_name: &str) -> bool {
    file_name.starts_with(ORIGINAL_PREFIX)
        && IMAGE_EXTENSIONS.iter().any(|ext| file_name.ends_with(ext))
}

/// One scene folder found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneFolder {
    pub style_name: String,
    pub folder_name: String,
    pub original_image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMapping {
    pub style_name: String,
    /// Registry id of the style, when the registry knows it
    pub style_id: Option<String>,
    pub original_image: String,
    pub folder_name: String,
    pub extracted_skus: Vec<String>,
    pub matched_products_count: usize,
    pub products: Vec<CardRef>,
}

/// Style as seen from a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneStyleRef {
    pub style_name: String,
    pub style_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub total_styles: usize,
    pub styles_with_products: usize,
    pub total_product_links: usize,
    pub products_with_styles: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneReport {
    pub summary: SceneSummary,
    pub styles: Vec<SceneMapping>,
    /// Card file → styles staging it
    pub product_styles: BTreeMap<String, Vec<SceneStyleRef>>,
}

/// Card SKU index for scene lookups
pub struct SceneMatcher<'a> {
    index: VariantIndex<'a, CardRecord>,
}

impl<'a> SceneMatcher<'a> {
    pub fn new(cards: &'a [CardRecord]) -> Self {
        let index = VariantIndex::build(cards, |card| {
            present(&card.sku).map(scene_sku_variants).unwrap_or_default()
        });
        info!(variants = index.len(), "built scene SKU index");
        Self { index }
    }

    /// Cards for the given scene SKUs; per SKU the first variant with a hit wins
    pub fn match_skus(&self, skus: &[String]) -> Vec<&'a CardRecord> {
        let mut matched: Vec<&'a CardRecord> = Vec::new();

        for sku in skus {
            let Some(bucket) = scene_sku_variants(sku)
                .iter()
                .map(|variant| self.index.lookup(variant))
                .find(|bucket| !bucket.is_empty())
            else {
                continue;
            };

            for &card in bucket {
                if !matched.iter().any(|m| m.file_name == card.file_name) {
                    matched.push(card);
                }
            }
        }
        matched
    }

    /// Maps every folder in style-name order
    ///
    /// # Arguments
    /// * `folders` - scene folders; the first folder per style name wins
    /// * `style_ids` - registry style name → identifier
    pub fn run(&self, folders: &[SceneFolder], style_ids: &BTreeMap<String, String>) -> SceneReport {
        let mut by_style: BTreeMap<&str, &SceneFolder> = BTreeMap::new();
        for folder in folders {
            by_style.entry(folder.style_name.as_str()).or_insert(folder);
        }

        let mut report = SceneReport::default();
        for (style, folder) in by_style {
            let extracted_skus = extract_scene_skus(&folder.original_image);
            let products: Vec<CardRef> = self
                .match_skus(&extracted_skus)
                .into_iter()
                .map(CardRef::from)
                .collect();
            debug!(style, skus = extracted_skus.len(), products = products.len(), "mapped scene");

            let style_ref = SceneStyleRef {
                style_name: style.to_string(),
                style_id: style_ids.get(style).cloned(),
            };
            for product in &products {
                let styles = report.product_styles.entry(product.filename.clone()).or_default();
                if !styles.contains(&style_ref) {
                    styles.push(style_ref.clone());
                }
            }

            report.summary.total_product_links += products.len();
            if !products.is_empty() {
                report.summary.styles_with_products += 1;
            }
            report.styles.push(SceneMapping {
                style_name: style_ref.style_name,
                style_id: style_ref.style_id,
                original_image: folder.original_image.clone(),
                folder_name: folder.folder_name.clone(),
                extracted_skus,
                matched_products_count: products.len(),
                products,
            });
        }

        report.summary.total_styles = report.styles.len();
        report.summary.products_with_styles = report.product_styles.len();
        info!(
            styles = report.summary.total_styles,
            with_products = report.summary.styles_with_products,
            "scene mapping complete"
        );
        report
    }
}
