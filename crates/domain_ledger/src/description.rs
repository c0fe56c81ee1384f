//! Description codec
//!
//! Legacy ledger data links a transfer debit to the credit that later
//! offsets it only through the free-text description. Both sides are
//! written in the shape `"<prefix><product> (<variant>)"`:
//!
//! ```text
//! Transferencia de 2 x Pantalón Sendero (Negro/M)
//! Devolución de 2 x Pantalón Sendero (Negro/M)
//! ```
//!
//! The codec strips the first matching prefix, splits product from variant
//! and compares both parts with case-insensitive exact equality. No fuzzy
//! matching is attempted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Ordered prefix patterns; only the first match is stripped
static PREFIX_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^transferencia\s+de\s+\d+\s*x\s+",
        r"(?i)^devoluci[oó]n\s+de\s+\d+\s*x\s+",
        r"(?i)^devoluci[oó]n\s+de\s+",
        r"(?i)^\d+\s*x\s+",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static VARIANT_SUFFIX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(?P<product>.*?)\s*\((?P<variant>[^()]*)\)\s*$").ok());

static QUANTITY: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*x\s").ok());

/// Normalised product/variant pair used as the matching key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemKey {
    pub product: String,
    pub variant: String,
}

impl LineItemKey {
    /// Builds a key from catalog names, normalised the same way as parsed text
    pub fn from_names(product: &str, variant: &str) -> Self {
        Self {
            product: normalize(product),
            variant: normalize(variant),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.product.is_empty() && self.variant.is_empty()
    }
}

/// Everything the codec can read out of a description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDescription {
    pub key: LineItemKey,
    pub quantity: u32,
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Parses and renders ledger descriptions
pub struct DescriptionCodec;

impl DescriptionCodec {
    /// Extracts the normalised `{product, variant}` pair
    pub fn extract_item(description: &str) -> LineItemKey {
        let trimmed = description.trim();
        let stripped = PREFIX_PATTERNS
            .iter()
            .find_map(|pattern| {
                pattern
                    .find(trimmed)
                    .map(|found| &trimmed[found.end()..])
            })
            .unwrap_or(trimmed);

        match VARIANT_SUFFIX.as_ref().and_then(|re| re.captures(stripped)) {
            Some(caps) => LineItemKey {
                product: normalize(caps.name("product").map_or("", |m| m.as_str())),
                variant: normalize(caps.name("variant").map_or("", |m| m.as_str())),
            },
            None => LineItemKey {
                product: normalize(stripped),
                variant: String::new(),
            },
        }
    }

    /// First `"<n> x "` in the description, or 1 when there is none
    ///
    /// An explicit `0 x` is kept: split return credits can carry a share of
    /// the amount without a whole unit.
    pub fn extract_quantity(description: &str) -> u32 {
        QUANTITY
            .as_ref()
            .and_then(|re| re.captures(description))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(1)
    }

    pub fn parse(description: &str) -> ParsedDescription {
        ParsedDescription {
            key: Self::extract_item(description),
            quantity: Self::extract_quantity(description),
        }
    }

    /// True when both descriptions name the same product and variant
    pub fn same_line_item(a: &str, b: &str) -> bool {
        Self::extract_item(a) == Self::extract_item(b)
    }

    /// Case-insensitive containment of the return marker
    pub fn mentions(description: &str, marker: &str) -> bool {
        description.to_lowercase().contains(&marker.to_lowercase())
    }

    pub fn render_transfer(quantity: u32, product: &str, variant: &str) -> String {
        format!("Transferencia de {} x {}", quantity, Self::render_item(product, variant))
    }

    pub fn render_return(quantity: u32, product: &str, variant: &str) -> String {
        format!("Devolución de {} x {}", quantity, Self::render_item(product, variant))
    }

    pub fn render_payment(debit_description: &str) -> String {
        format!("Pago: {}", debit_description.trim())
    }

    fn render_item(product: &str, variant: &str) -> String {
        let product = product.trim();
        let variant = variant.trim();
        if variant.is_empty() {
            product.to_string()
        } else {
            format!("{} ({})", product, variant)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_transfer() {
        let key = DescriptionCodec::extract_item("transferencia de 2 x Pantalón Sendero (Negro/M)");
        assert_eq!(key.product, "pantalón sendero");
        assert_eq!(key.variant, "negro/m");
    }

    #[test]
    fn test_extract_from_return_with_and_without_quantity() {
        let with_qty = DescriptionCodec::extract_item("Devolución de 2 x Pantalón Sendero (Negro/M)");
        let without_qty = DescriptionCodec::extract_item("devolución de Pantalón Sendero (Negro/M)");
        assert_eq!(with_qty, without_qty);
        assert_eq!(with_qty, LineItemKey::from_names("Pantalón Sendero", "Negro/M"));
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        assert!(DescriptionCodec::same_line_item(
            "TRANSFERENCIA DE 3 x Gorra (Azul)",
            "DEVOLUCIÓN de 1 x gorra (azul)",
        ));
    }

    #[test]
    fn test_no_prefix_no_variant() {
        let key = DescriptionCodec::extract_item("  Gorra Trucker  ");
        assert_eq!(key.product, "gorra trucker");
        assert_eq!(key.variant, "");
    }

    #[test]
    fn test_different_variant_does_not_match() {
        assert!(!DescriptionCodec::same_line_item(
            "Transferencia de 2 x Pantalón Sendero (Negro/M)",
            "Devolución de 2 x Pantalón Sendero (Negro/L)",
        ));
    }

    #[test]
    fn test_matching_is_exact_not_fuzzy() {
        assert!(!DescriptionCodec::same_line_item(
            "Transferencia de 2 x Pantalon Sendero (Negro/M)",
            "Devolución de 2 x Pantalón Sendero (Negro/M)",
        ));
    }

    #[test]
    fn test_quantity_extraction() {
        assert_eq!(DescriptionCodec::extract_quantity("transferencia de 12 x Gorra (Azul)"), 12);
        assert_eq!(DescriptionCodec::extract_quantity("devolución de Gorra (Azul)"), 1);
        assert_eq!(DescriptionCodec::extract_quantity("3 x Gorra"), 3);
        assert_eq!(DescriptionCodec::extract_quantity("0 x Gorra"), 0);
    }

    #[test]
    fn test_render_parses_back() {
        let rendered = DescriptionCodec::render_return(4, "Pantalón Sendero", "Negro/M");
        assert_eq!(rendered, "Devolución de 4 x Pantalón Sendero (Negro/M)");
        let parsed = DescriptionCodec::parse(&rendered);
        assert_eq!(parsed.quantity, 4);
        assert_eq!(parsed.key, LineItemKey::from_names("Pantalón Sendero", "Negro/M"));
        assert!(DescriptionCodec::same_line_item(
            &rendered,
            &DescriptionCodec::render_transfer(4, "Pantalón Sendero", "Negro/M"),
        ));
    }

    #[test]
    fn test_render_without_variant() {
        assert_eq!(DescriptionCodec::render_transfer(1, "Gorra", " "), "Transferencia de 1 x Gorra");
        assert_eq!(DescriptionCodec::render_payment(" Transferencia de 1 x Gorra "), "Pago: Transferencia de 1 x Gorra");
    }

    #[test]
    fn test_marker_detection() {
        assert!(DescriptionCodec::mentions("DEVOLUCIÓN de 1 x Gorra", "devolución"));
        assert!(!DescriptionCodec::mentions("Pago: Transferencia", "devolución"));
    }
}
