//! Pure helpers shared by the tools: statistics and value conversion.

pub mod stats;
pub mod values;

pub use stats::{
    date_range, frequencies, summarize_numbers, DateRange, Frequency, FrequencySummary,
    NumericSummary,
};
