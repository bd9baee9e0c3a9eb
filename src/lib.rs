pub mod driver;
pub mod error;
pub mod parser;
pub mod report;
pub mod runner;
pub mod server;
pub mod utils;

// Re-export common items
pub use error::{HarnessError, Result};
pub use report::Report;
pub use runner::run_suite;
