use crate::extraction::Candidate;

pub const TITLE: &[Candidate] = &[Candidate::Selector(r#"[data-at="product_name"]"#)];

pub const PRICE: &[Candidate] = &[
    Candidate::Selector(r#"[data-at="price"]"#),
    Candidate::Selector(r#"p[data-comp~="Price"] span"#),
];
