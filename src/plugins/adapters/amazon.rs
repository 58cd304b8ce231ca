use crate::extraction::Candidate;

pub const TITLE: &[Candidate] = &[Candidate::Selector("#productTitle"), Candidate::Selector("#title")];

pub const PRICE: &[Candidate] = &[
    Candidate::Selector("#priceblock_ourprice"),
    Candidate::Selector("#priceblock_dealprice"),
    Candidate::Selector(".priceToPay .a-offscreen"),
    Candidate::Selector(".priceToPay"),
    Candidate::Selector("#corePrice_feature_div .a-offscreen"),
    Candidate::Selector(".a-price .a-offscreen"),
];
