//! Migration framework
//!
//! - Embedded SQL migrations, applied in order
//! - Checksums recorded at apply time and verified on every later run
//! - Idempotent application

mod checksums;
mod embedded;
mod runner;

pub use embedded::{get_migrations, Migration};
pub use runner::{apply_migrations, applied_migrations};
