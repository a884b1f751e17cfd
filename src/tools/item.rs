//! Item definition retrieval.

use crate::error::Result;
use crate::portal::{Item, Portal};
use crate::types::ItemId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const fn default_include_data() -> bool {
    true
}

/// Input for the get_item_definition tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ItemDefinitionInput {
    /// 32-character portal item id
    pub item_id: String,
    /// Also fetch the item's data resource, e.g. web map JSON (default: true)
    #[serde(default = "default_include_data")]
    pub include_data: bool,
}

/// Output for the get_item_definition tool.
#[derive(Debug, Serialize)]
pub struct ItemDefinitionOutput {
    pub item: Item,
    /// Omitted from the rendering when data was not requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Option<Value>>,
}

/// Executes the get_item_definition tool.
///
/// # Errors
///
/// Returns a `ServerError` if the id is malformed or the item cannot be read.
pub async fn execute_item_definition(
    portal: &dyn Portal,
    input: ItemDefinitionInput,
) -> Result<ItemDefinitionOutput> {
    let id: ItemId = input.item_id.parse()?;

    let item = portal.item(&id).await?;
    let data = if input.include_data {
        Some(portal.item_data(&id).await?)
    } else {
        None
    };

    tracing::debug!(
        %id,
        item_type = %item.item_type,
        has_data = ?data.as_ref().map(Option::is_some),
        "item definition"
    );

    Ok(ItemDefinitionOutput { item, data })
}
