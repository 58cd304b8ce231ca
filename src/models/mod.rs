use uuid::Uuid;

pub mod continuation;
pub mod extraction;
pub mod price_history;
pub mod target;

pub use continuation::*;
pub use extraction::*;
pub use price_history::*;
pub use target::*;

// Helper function to generate ids in the format stored by the database
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
