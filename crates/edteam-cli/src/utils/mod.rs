//! Utility functions for terminal output.

pub mod format;

pub use format::{clip, format_date, header, rule, short_timestamp, truncate_string, RULE_WIDTH};
