pub mod types;
pub mod yaml;

pub use types::{Group, Step, Suite, Target};
pub use yaml::{builtin_suite, parse_suite_file, parse_suite_str, BUILTIN_SUITES};
