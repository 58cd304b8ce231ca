use crate::extraction::Candidate;

pub const TITLE: &[Candidate] = &[Candidate::Selector(r#"h1[data-test="product-title"]"#)];

pub const PRICE: &[Candidate] = &[
    Candidate::Selector(r#"[data-test="product-price"]"#),
    Candidate::Selector(r#"[data-test="product-price-sale"]"#),
];
