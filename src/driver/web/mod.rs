//! Web browser driver (Playwright)

pub mod driver;

pub use driver::{PlaywrightDriver, PlaywrightPage};
