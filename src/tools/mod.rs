//! MCP tool implementations.
//!
//! Each tool has an `*Input` (deserialized from tool arguments), an
//! `*Output` (rendered to text by [`crate::fmt`]) and an async `execute_*`
//! function taking any [`crate::portal::Portal`].

mod item;
mod search;
mod summary;
mod table;

// item
pub use item::{execute_item_definition, ItemDefinitionInput, ItemDefinitionOutput};

// search
pub use search::{
    content_search_query, execute_search_content, execute_search_layers, layer_search_query,
    LayerEntry, LayerListing, SearchContentInput, SearchContentOutput, SearchLayersInput,
    SearchLayersOutput, ServiceResult, MAX_SEARCH_RESULTS,
};

// summary
pub use summary::{
    execute_summarize_field, FieldSummary, SummarizeFieldInput, SummarizeFieldOutput,
    MAX_SUMMARY_RECORDS, MAX_TOP_N,
};

// table
pub use table::{execute_feature_table, FeatureTableInput, FeatureTableOutput, MAX_TABLE_RECORDS};
