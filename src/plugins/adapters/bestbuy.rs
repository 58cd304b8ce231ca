use crate::extraction::Candidate;

pub const TITLE: &[Candidate] = &[Candidate::Selector(".sku-title h1"), Candidate::Selector("h1.heading-5")];

pub const PRICE: &[Candidate] = &[
    Candidate::Selector(r#".priceView-customer-price span[aria-hidden="true"]"#),
    Candidate::Selector(".priceView-customer-price span"),
    Candidate::Selector(r#"[data-testid="customer-price"] span"#),
];
