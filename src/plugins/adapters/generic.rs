use crate::extraction::Candidate;

/// Unknown retailers rely on the shared structured and heuristic layers.
pub const TITLE: &[Candidate] = &[];
pub const PRICE: &[Candidate] = &[];
