//! Candidate-driven extraction over a rendered product page.
//!
//! A field is extracted by trying an ordered list of [`Candidate`]s and
//! committing to the first one that yields a usable value. Values from
//! different candidates are never merged.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

use crate::pricing::{format_price, parse_price};
use crate::utils::error::ExtractionError;

/// Headings containing these words are site chrome, not product titles.
const NOISE_WORDS: &[&str] = &[
    "cart", "basket", "bag", "search", "menu", "navigation", "sign in", "log in",
    "account", "checkout", "wishlist", "skip to", "cookie", "newsletter",
];

const MAX_TITLE_LEN: usize = 300;
const MAX_JSON_DEPTH: usize = 12;

static CURRENCY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$£€¥₹]\s?\d[\d,.]*").expect("valid currency pattern")
});

static LD_JSON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid ld+json selector"));

static HEADINGS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1, h2").expect("valid heading selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Price,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Price => "price",
        }
    }
}

/// One concrete extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// schema.org `Product` embedded as JSON-LD.
    StructuredData,
    /// `<meta property=..>` or `<meta name=..>` content.
    MetaTag(&'static str),
    /// Text of the first matching element.
    Selector(&'static str),
    /// Attribute of the first matching element.
    Attribute { selector: &'static str, attr: &'static str },
    /// First plausible `h1`/`h2`.
    Heading,
    /// First currency-prefixed amount in the visible page text.
    CurrencyText,
}

impl Candidate {
    /// Value this candidate yields for `field`, if it yields a usable one.
    pub fn evaluate(&self, page: &Page, field: Field) -> Option<String> {
        match (self, field) {
            (Candidate::StructuredData, Field::Title) => page.products.iter().find_map(product_name),
            (Candidate::StructuredData, Field::Price) => page
                .products
                .iter()
                .find_map(|product| product.get("offers").and_then(|offers| offer_price(offers, 0)))
                .and_then(|raw| canonical_price(&raw)),
            (Candidate::MetaTag(key), Field::Title) => page.meta_content(key),
            (Candidate::MetaTag(key), Field::Price) => page.meta_content(key).and_then(|raw| canonical_price(&raw)),
            (Candidate::Selector(css), _) => page.select_text(css, |text| accepts(field, text)),
            (Candidate::Attribute { selector, attr }, Field::Title) => page.select_attr(selector, attr),
            (Candidate::Attribute { selector, attr }, Field::Price) => {
                page.select_attr(selector, attr).and_then(|raw| canonical_price(&raw))
            }
            (Candidate::Heading, Field::Title) => page.plausible_heading(),
            (Candidate::CurrencyText, Field::Price) => page.first_currency_amount(),
            (Candidate::Heading, Field::Price) | (Candidate::CurrencyText, Field::Title) => None,
        }
    }
}

fn accepts(field: Field, text: &str) -> bool {
    match field {
        Field::Title => !text.is_empty() && text.len() <= MAX_TITLE_LEN,
        Field::Price => parse_price(text).is_some(),
    }
}

/// Bare amounts from structured sources are rendered in display form.
fn canonical_price(raw: &str) -> Option<String> {
    parse_price(raw).map(|value| format_price(Some(value)))
}

/// Tries `candidates` in order and commits to the first usable value.
pub fn first_match(page: &Page, field: Field, candidates: &[Candidate]) -> Result<(Candidate, String), ExtractionError> {
    candidates
        .iter()
        .find_map(|candidate| candidate.evaluate(page, field).map(|value| (*candidate, value)))
        .ok_or(ExtractionError::NoCandidate { field: field.name() })
}

/// A parsed product page.
pub struct Page {
    url: String,
    document: Html,
    products: Vec<Value>,
}

impl Page {
    pub fn parse(url: &str, html: &str) -> Self {
        let document = Html::parse_document(html);
        let products = structured_products(&document);
        Self {
            url: url.to_string(),
            document,
            products,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn has_structured_product(&self) -> bool {
        !self.products.is_empty()
    }

    fn selector(css: &str) -> Option<Selector> {
        match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                tracing::warn!(selector = css, "Skipping invalid selector: {:?}", e);
                None
            }
        }
    }

    fn select_text(&self, css: &str, accept: impl Fn(&str) -> bool) -> Option<String> {
        let selector = Self::selector(css)?;
        self.document
            .select(&selector)
            .map(|element| element_text(&element))
            .find(|text| accept(text))
    }

    fn select_attr(&self, css: &str, attr: &str) -> Option<String> {
        let selector = Self::selector(css)?;
        self.document
            .select(&selector)
            .filter_map(|element| element.value().attr(attr))
            .map(collapse_whitespace)
            .find(|value| !value.is_empty())
    }

    fn meta_content(&self, key: &str) -> Option<String> {
        let css = format!(r#"meta[property="{key}"], meta[name="{key}"]"#);
        self.select_attr(&css, "content")
    }

    fn plausible_heading(&self) -> Option<String> {
        self.document
            .select(&HEADINGS)
            .map(|element| element_text(&element))
            .find(|text| accepts(Field::Title, text) && !is_noise(text))
    }

    fn first_currency_amount(&self) -> Option<String> {
        let text = self.visible_text();
        CURRENCY_AMOUNT
            .find_iter(&text)
            .map(|m| m.as_str().trim_end_matches([',', '.']).trim())
            .find(|amount| !uses_decimal_comma(amount))
            .map(str::to_string)
    }

    /// Page text outside `script`, `style` and similar non-rendered elements.
    pub fn visible_text(&self) -> String {
        let mut out = String::new();
        for node in self.document.root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|el| el.name().to_string()))
                .is_some_and(|name| matches!(name.as_str(), "script" | "style" | "noscript" | "template"));
            if !hidden {
                out.push_str(text);
                out.push(' ');
            }
        }
        collapse_whitespace(&out)
    }
}

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_noise(text: &str) -> bool {
    let lower = text.to_lowercase();
    NOISE_WORDS.iter().any(|word| lower.contains(word))
}

/// Every schema.org `Product` found in the page's JSON-LD blocks, in document order.
fn structured_products(document: &Html) -> Vec<Value> {
    let mut products = Vec::new();
    for script in document.select(&LD_JSON) {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => collect_products(&value, 0, &mut products),
            Err(e) => {
                let err = ExtractionError::MalformedStructuredData(e.to_string());
                tracing::debug!("Ignoring JSON-LD block: {}", err);
            }
        }
    }
    products
}

fn collect_products(value: &Value, depth: usize, out: &mut Vec<Value>) {
    if depth > MAX_JSON_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                collect_products(item, depth + 1, out);
            }
        }
        Value::Object(map) => {
            if map.get("@type").is_some_and(|t| is_type(t, "Product")) {
                out.push(value.clone());
                return;
            }
            // Covers @graph, mainEntity and other wrappers.
            for nested in map.values() {
                collect_products(nested, depth + 1, out);
            }
        }
        _ => {}
    }
}

fn is_type(type_value: &Value, wanted: &str) -> bool {
    let matches = |name: &str| name == wanted || name.rsplit('/').next() == Some(wanted);
    match type_value {
        Value::String(name) => matches(name),
        Value::Array(names) => names.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn product_name(product: &Value) -> Option<String> {
    product
        .get("name")
        .and_then(scalar_text)
        .filter(|name| accepts(Field::Title, name))
}

/// Price from an `Offer`, `AggregateOffer`, offer list or price specification.
fn offer_price(offers: &Value, depth: usize) -> Option<String> {
    if depth > MAX_JSON_DEPTH {
        return None;
    }
    match offers {
        Value::Array(items) => items.iter().find_map(|item| offer_price(item, depth + 1)),
        Value::Object(map) => ["price", "lowPrice", "highPrice"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(scalar_text))
            .find(|text| parse_price(text).is_some())
            .or_else(|| map.get("priceSpecification").and_then(|spec| offer_price(spec, depth + 1)))
            .or_else(|| map.get("offers").and_then(|nested| offer_price(nested, depth + 1))),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(collapse_whitespace(text)),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// `39,90` or `1.299,00`: comma as decimal separator. Comma stripping would
/// read these as hundreds, so the currency heuristic skips them.
fn uses_decimal_comma(amount: &str) -> bool {
    match amount.rfind([',', '.']) {
        Some(i) if amount[i..].starts_with(',') => amount.len() - i - 1 != 3,
        _ => false,
    }
}
