use crate::extraction::Candidate;

pub const TITLE: &[Candidate] = &[
    Candidate::Selector(r#"h1[automation-id="productName"]"#),
    Candidate::Selector("h1.product-h1-container-v2"),
];

pub const PRICE: &[Candidate] = &[
    Candidate::Selector(r#"[automation-id="productPriceOutput"]"#),
    Candidate::Selector("#pull-right-price span.value"),
    Candidate::Selector(".your-price .value"),
];
