use crate::extraction::Candidate;

pub const TITLE: &[Candidate] = &[
    Candidate::Selector("h1.product__title"),
    Candidate::Selector(".product-single__title"),
];

// Sale price first; Shopify themes render both when discounted.
pub const PRICE: &[Candidate] = &[
    Candidate::Selector(".price-item--sale"),
    Candidate::Selector(".price-item--regular"),
    Candidate::Selector("[data-product-price]"),
    Candidate::Selector(".product__price"),
];
