use crate::extraction::Candidate;

pub const TITLE: &[Candidate] = &[
    Candidate::Selector(r#"h1[itemprop="name"]"#),
    Candidate::Selector("#main-title"),
];

pub const PRICE: &[Candidate] = &[
    Candidate::Attribute { selector: r#"[itemprop="price"]"#, attr: "content" },
    Candidate::Selector(r#"span[itemprop="price"]"#),
    Candidate::Selector(r#"span[data-automation-id="product-price"]"#),
];
