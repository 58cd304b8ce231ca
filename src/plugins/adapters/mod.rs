//! Per-retailer extraction strategies.
//!
//! Each adapter layers its site-specific candidates between the shared
//! structured sources (JSON-LD, social meta tags) and the page-wide
//! heuristics. `Generic` uses the shared layers only.

pub mod amazon;
pub mod bestbuy;
pub mod costco;
pub mod dedcool;
pub mod ebay;
pub mod generic;
pub mod sephora;
pub mod target;
pub mod walmart;

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::extraction::{first_match, Candidate, Field, Page};
use crate::models::ExtractionResult;

const STRUCTURED_TITLE: &[Candidate] = &[
    Candidate::StructuredData,
    Candidate::MetaTag("og:title"),
    Candidate::MetaTag("twitter:title"),
];

const STRUCTURED_PRICE: &[Candidate] = &[
    Candidate::StructuredData,
    Candidate::MetaTag("product:price:amount"),
    Candidate::MetaTag("og:price:amount"),
];

const HEURISTIC_TITLE: &[Candidate] = &[Candidate::Heading];
const HEURISTIC_PRICE: &[Candidate] = &[Candidate::CurrencyText];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    Amazon,
    Walmart,
    BestBuy,
    Target,
    Ebay,
    Sephora,
    DedCool,
    Costco,
    Generic,
}

/// Host keywords checked in order; the first substring hit wins.
const HOST_TABLE: &[(&str, AdapterKind)] = &[
    ("amazon", AdapterKind::Amazon),
    ("walmart", AdapterKind::Walmart),
    ("bestbuy", AdapterKind::BestBuy),
    ("target", AdapterKind::Target),
    ("ebay", AdapterKind::Ebay),
    ("sephora", AdapterKind::Sephora),
    ("dedcool", AdapterKind::DedCool),
    ("costco", AdapterKind::Costco),
];

/// Picks the adapter for `url` by its host. Unparseable URLs get `Generic`.
pub fn select_adapter(url: &str) -> AdapterKind {
    let host = match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_lowercase(),
            None => return AdapterKind::Generic,
        },
        Err(e) => {
            tracing::debug!(url, "Falling back to generic adapter: {}", e);
            return AdapterKind::Generic;
        }
    };

    HOST_TABLE
        .iter()
        .find(|(keyword, _)| host.contains(keyword))
        .map(|(_, kind)| *kind)
        .unwrap_or(AdapterKind::Generic)
}

impl AdapterKind {
    pub fn name(&self) -> &'static str {
        match self {
            AdapterKind::Amazon => "amazon",
            AdapterKind::Walmart => "walmart",
            AdapterKind::BestBuy => "bestbuy",
            AdapterKind::Target => "target",
            AdapterKind::Ebay => "ebay",
            AdapterKind::Sephora => "sephora",
            AdapterKind::DedCool => "dedcool",
            AdapterKind::Costco => "costco",
            AdapterKind::Generic => "generic",
        }
    }

    fn site_candidates(&self, field: Field) -> &'static [Candidate] {
        let (title, price) = match self {
            AdapterKind::Amazon => (amazon::TITLE, amazon::PRICE),
            AdapterKind::Walmart => (walmart::TITLE, walmart::PRICE),
            AdapterKind::BestBuy => (bestbuy::TITLE, bestbuy::PRICE),
            AdapterKind::Target => (target::TITLE, target::PRICE),
            AdapterKind::Ebay => (ebay::TITLE, ebay::PRICE),
            AdapterKind::Sephora => (sephora::TITLE, sephora::PRICE),
            AdapterKind::DedCool => (dedcool::TITLE, dedcool::PRICE),
            AdapterKind::Costco => (costco::TITLE, costco::PRICE),
            AdapterKind::Generic => (generic::TITLE, generic::PRICE),
        };
        match field {
            Field::Title => title,
            Field::Price => price,
        }
    }

    /// Full ordered candidate list for `field`.
    pub fn candidates(&self, field: Field) -> Vec<Candidate> {
        let (structured, heuristic) = match field {
            Field::Title => (STRUCTURED_TITLE, HEURISTIC_TITLE),
            Field::Price => (STRUCTURED_PRICE, HEURISTIC_PRICE),
        };
        structured
            .iter()
            .chain(self.site_candidates(field))
            .chain(heuristic)
            .copied()
            .collect()
    }

    /// Extracts title and price. Missing fields become sentinels, never errors.
    pub fn extract(&self, page: &Page) -> ExtractionResult {
        let title = self.extract_field(page, Field::Title);
        let price = self.extract_field(page, Field::Price);
        ExtractionResult::new(title, price)
    }

    fn extract_field(&self, page: &Page, field: Field) -> Option<String> {
        match first_match(page, field, &self.candidates(field)) {
            Ok((candidate, value)) => {
                tracing::debug!(adapter = self.name(), field = field.name(), ?candidate, "Candidate matched");
                Some(value)
            }
            Err(e) => {
                tracing::debug!(adapter = self.name(), url = page.url(), "{}", e);
                None
            }
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses `html` and runs the adapter selected for `url`.
pub fn extract_page(url: &str, html: &str) -> (AdapterKind, ExtractionResult) {
    let adapter = select_adapter(url);
    let page = Page::parse(url, html);
    (adapter, adapter.extract(&page))
}
