pub mod schema;

pub use schema::{has_all_required, is_legal, missing_cards, required_cards, validate};
