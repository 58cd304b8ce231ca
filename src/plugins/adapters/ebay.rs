use crate::extraction::Candidate;

pub const TITLE: &[Candidate] = &[
    Candidate::Selector("h1.x-item-title__mainTitle span"),
    Candidate::Selector("#itemTitle"),
];

pub const PRICE: &[Candidate] = &[
    Candidate::Selector(".x-price-primary span"),
    Candidate::Selector("#prcIsum"),
    Candidate::Selector("#mm-saleDscPrc"),
];
