//! Attribute table preview.

use crate::error::{Result, ValidationError};
use crate::portal::{Feature, FeatureQuery, Field, LayerInfo, Portal};
use crate::services::values;
use crate::types::{FieldKind, FieldType};
use crate::validate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound on rows per preview.
pub const MAX_TABLE_RECORDS: usize = 2000;

fn default_max_records() -> usize {
    100
}

/// Input for the get_feature_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FeatureTableInput {
    /// Layer REST URL ending in /FeatureServer/<id> or /MapServer/<id>
    pub service_url: String,
    /// SQL where clause (default: 1=1)
    #[serde(rename = "where", default)]
    pub where_clause: Option<String>,
    /// Maximum rows (1-2000, default: 100)
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    /// Columns to include, in order (default: all attribute fields)
    #[serde(default)]
    pub out_fields: Option<Vec<String>>,
}

/// Output for the get_feature_table tool.
#[derive(Debug, Serialize)]
pub struct FeatureTableOutput {
    pub layer_name: String,
    pub service_url: String,
    pub columns: Vec<String>,
    /// Rendered cells; `None` for null.
    pub rows: Vec<Vec<Option<String>>>,
    /// Total matching features, when known to exceed the rows returned.
    pub total: Option<u64>,
    pub exceeded_transfer_limit: bool,
}

/// Field types that never carry tabular attribute values.
fn is_tabular(field: &Field) -> bool {
    !matches!(
        field.field_type,
        FieldType::Geometry | FieldType::Blob | FieldType::Raster
    )
}

/// Resolves the requested columns against layer metadata.
fn resolve_columns(
    layer: &LayerInfo,
    requested: Option<&[String]>,
) -> std::result::Result<Vec<Field>, ValidationError> {
    match requested {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|name| {
                layer
                    .field(name.trim())
                    .cloned()
                    .ok_or_else(|| ValidationError::UnknownField {
                        field: name.trim().to_string(),
                        available: layer.field_names(),
                    })
            })
            .collect(),
        _ => Ok(layer.fields.iter().filter(|f| is_tabular(f)).cloned().collect()),
    }
}

/// Looks up an attribute by exact name, then case-insensitively.
pub(crate) fn attribute<'a>(feature: &'a Feature, name: &str) -> Option<&'a Value> {
    feature.attributes.get(name).or_else(|| {
        feature
            .attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

fn render_cell(value: Option<&Value>, field_type: FieldType) -> Option<String> {
    let value = value?;
    if field_type.kind() == FieldKind::Date {
        if let Some(dt) = values::parse_date(value) {
            return Some(values::format_datetime(&dt));
        }
    }
    values::display_value(value).map(|c| c.into_owned())
}

/// Executes the get_feature_table tool.
///
/// # Errors
///
/// Returns a `ServerError` if arguments are invalid or the layer cannot be
/// read or queried.
pub async fn execute_feature_table(
    portal: &dyn Portal,
    input: FeatureTableInput,
) -> Result<FeatureTableOutput> {
    let url = validate::validate_layer_url(&input.service_url)?;
    let where_clause = validate::validate_where(input.where_clause.as_deref())?;
    let max_records =
        validate::check_range("max_records", input.max_records, 1, MAX_TABLE_RECORDS)?;

    let layer = portal.layer_info(&url).await?;
    let fields = resolve_columns(&layer, input.out_fields.as_deref())?;

    let mut query = FeatureQuery::new(&where_clause, max_records);
    if input.out_fields.as_ref().is_some_and(|f| !f.is_empty()) {
        query = query.with_out_fields(fields.iter().map(|f| f.name.clone()).collect());
    }
    query.order_by = layer.object_id_field.clone();

    let set = portal.query(&url, &query).await?;

    // Some services publish no field list; fall back to the attribute keys.
    let (columns, types): (Vec<String>, Vec<FieldType>) = if fields.is_empty() {
        set.features
            .first()
            .map(|f| {
                f.attributes
                    .keys()
                    .map(|k| (k.clone(), FieldType::Unknown))
                    .unzip()
            })
            .unwrap_or_default()
    } else {
        fields.into_iter().map(|f| (f.name, f.field_type)).unzip()
    };

    let rows: Vec<Vec<Option<String>>> = set
        .features
        .iter()
        .map(|feature| {
            columns
                .iter()
                .zip(&types)
                .map(|(name, ty)| render_cell(attribute(feature, name), *ty))
                .collect()
        })
        .collect();

    let total = if !rows.is_empty() && (set.exceeded_transfer_limit || rows.len() >= max_records)
    {
        match portal.count(&url, &where_clause).await {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::debug!(error = %e, "feature count unavailable");
                None
            }
        }
    } else {
        None
    };

    Ok(FeatureTableOutput {
        layer_name: layer.name,
        service_url: url,
        columns,
        rows,
        total,
        exceeded_transfer_limit: set.exceeded_transfer_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer() -> LayerInfo {
        serde_json::from_value(json!({
            "id": 0,
            "name": "Parcels",
            "fields": [
                {"name": "OBJECTID", "type": "esriFieldTypeOID"},
                {"name": "Shape", "type": "esriFieldTypeGeometry"},
                {"name": "OWNER", "type": "esriFieldTypeString"},
                {"name": "SALE_DATE", "type": "esriFieldTypeDate"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_resolve_columns_skips_geometry() {
        let cols = resolve_columns(&layer(), None).unwrap();
        let names: Vec<_> = cols.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["OBJECTID", "OWNER", "SALE_DATE"]);
    }

    #[test]
    fn test_resolve_columns_uses_requested_order() {
        let requested = vec!["sale_date".to_string(), "OBJECTID".to_string()];
        let cols = resolve_columns(&layer(), Some(&requested)).unwrap();
        let names: Vec<_> = cols.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["SALE_DATE", "OBJECTID"]);
    }

    #[test]
    fn test_resolve_columns_unknown_field() {
        let requested = vec!["NOPE".to_string()];
        let err = resolve_columns(&layer(), Some(&requested)).unwrap_err();
        assert!(err.to_string().contains("OBJECTID, Shape, OWNER, SALE_DATE"));
    }

    #[test]
    fn test_render_cell() {
        assert_eq!(render_cell(None, FieldType::String), None);
        assert_eq!(render_cell(Some(&json!(null)), FieldType::String), None);
        assert_eq!(
            render_cell(Some(&json!(1_577_836_800_000_i64)), FieldType::Date).as_deref(),
            Some("2020-01-01T00:00:00Z")
        );
        assert_eq!(
            render_cell(Some(&json!(7)), FieldType::Integer).as_deref(),
            Some("7")
        );
    }

    #[test]
    fn test_attribute_case_insensitive_fallback() {
        let feature: Feature =
            serde_json::from_value(json!({"attributes": {"owner": "Smith"}})).unwrap();
        assert_eq!(attribute(&feature, "OWNER"), Some(&json!("Smith")));
        assert_eq!(attribute(&feature, "missing"), None);
    }
}
