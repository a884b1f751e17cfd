//! Per-field statistical summary.

use super::table::attribute;
use crate::error::{Result, ValidationError};
use crate::portal::{FeatureQuery, Portal};
use crate::services::{self, values, DateRange, FrequencySummary, NumericSummary};
use crate::types::{FieldKind, FieldType};
use crate::validate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound on sampled features.
pub const MAX_SUMMARY_RECORDS: usize = 10_000;

/// Upper bound on frequency table rows.
pub const MAX_TOP_N: usize = 50;

fn default_max_records() -> usize {
    2000
}

fn default_top_n() -> usize {
    10
}

/// Input for the summarize_field tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SummarizeFieldInput {
    /// Layer REST URL ending in /FeatureServer/<id> or /MapServer/<id>
    pub service_url: String,
    /// Field name (case-insensitive)
    pub field: String,
    /// SQL where clause (default: 1=1)
    #[serde(rename = "where", default)]
    pub where_clause: Option<String>,
    /// Maximum features sampled (1-10000, default: 2000; the service may cap this lower)
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    /// Most frequent values listed for text fields (1-50, default: 10)
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

/// Statistics appropriate to the field's type.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSummary {
    Numeric(NumericSummary),
    Date(DateRange),
    Text(FrequencySummary),
    /// Every sampled value was null or unparseable.
    Empty,
}

/// Output for the summarize_field tool.
#[derive(Debug, Serialize)]
pub struct SummarizeFieldOutput {
    pub layer_name: String,
    pub field: String,
    pub field_type: FieldType,
    pub where_clause: String,
    /// Features returned by the query.
    pub sampled: usize,
    pub nulls: usize,
    /// Non-null values that did not parse as the field's type.
    pub invalid: usize,
    /// The service stopped before all matching features were returned.
    pub truncated: bool,
    pub summary: FieldSummary,
}

/// Tallies from splitting raw values by field kind.
#[derive(Debug, Default)]
struct Tally {
    nulls: usize,
    invalid: usize,
}

fn summarize_numeric<'a>(raw: impl Iterator<Item = Option<&'a Value>>) -> (FieldSummary, Tally) {
    let mut tally = Tally::default();
    let mut numbers = Vec::new();
    for value in raw {
        match value.and_then(values::parse_number) {
            None => tally.nulls += 1,
            Some(Ok(n)) => numbers.push(n),
            Some(Err(())) => tally.invalid += 1,
        }
    }
    let summary =
        services::summarize_numbers(&numbers).map_or(FieldSummary::Empty, FieldSummary::Numeric);
    (summary, tally)
}

fn summarize_dates<'a>(raw: impl Iterator<Item = Option<&'a Value>>) -> (FieldSummary, Tally) {
    let mut tally = Tally::default();
    let mut dates = Vec::new();
    for value in raw {
        match value.filter(|v| !v.is_null()) {
            None => tally.nulls += 1,
            Some(v) => match values::parse_date(v) {
                Some(dt) => dates.push(dt),
                None => tally.invalid += 1,
            },
        }
    }
    let summary = services::date_range(&dates).map_or(FieldSummary::Empty, FieldSummary::Date);
    (summary, tally)
}

fn summarize_text<'a>(
    raw: impl Iterator<Item = Option<&'a Value>>,
    top_n: usize,
) -> (FieldSummary, Tally) {
    let mut tally = Tally::default();
    let mut texts = Vec::new();
    for value in raw {
        match value.and_then(values::display_value) {
            None => tally.nulls += 1,
            Some(text) => texts.push(text.into_owned()),
        }
    }
    let summary =
        services::frequencies(texts, top_n).map_or(FieldSummary::Empty, FieldSummary::Text);
    (summary, tally)
}

/// Executes the summarize_field tool.
///
/// # Errors
///
/// Returns a `ServerError` if arguments are invalid, the field does not
/// exist, or the layer cannot be queried.
pub async fn execute_summarize_field(
    portal: &dyn Portal,
    input: SummarizeFieldInput,
) -> Result<SummarizeFieldOutput> {
    let url = validate::validate_layer_url(&input.service_url)?;
    let where_clause = validate::validate_where(input.where_clause.as_deref())?;
    let max_records =
        validate::check_range("max_records", input.max_records, 1, MAX_SUMMARY_RECORDS)?;
    let top_n = validate::check_range("top_n", input.top_n, 1, MAX_TOP_N)?;

    let layer = portal.layer_info(&url).await?;
    let field = layer
        .field(input.field.trim())
        .cloned()
        .ok_or_else(|| ValidationError::UnknownField {
            field: input.field.trim().to_string(),
            available: layer.field_names(),
        })?;

    let query =
        FeatureQuery::new(&where_clause, max_records).with_out_fields(vec![field.name.clone()]);
    let set = portal.query(&url, &query).await?;

    let raw = set.features.iter().map(|f| attribute(f, &field.name));
    let (summary, tally) = match field.field_type.kind() {
        FieldKind::Numeric => summarize_numeric(raw),
        FieldKind::Date => summarize_dates(raw),
        FieldKind::Text => summarize_text(raw, top_n),
    };

    tracing::debug!(
        field = %field.name,
        sampled = set.features.len(),
        nulls = tally.nulls,
        invalid = tally.invalid,
        "field summary"
    );

    Ok(SummarizeFieldOutput {
        layer_name: layer.name,
        field: field.name,
        field_type: field.field_type,
        where_clause,
        sampled: set.features.len(),
        nulls: tally.nulls,
        invalid: tally.invalid,
        truncated: set.exceeded_transfer_limit,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_tally() {
        let raw = [json!(1), json!("2.5"), json!(null), json!("n/a"), json!(4)];
        let (summary, tally) = summarize_numeric(raw.iter().map(Some).chain([None]));
        assert_eq!(tally.nulls, 2);
        assert_eq!(tally.invalid, 1);
        match summary {
            FieldSummary::Numeric(s) => {
                assert_eq!(s.count, 3);
                assert_eq!(s.median, 2.5);
            }
            other => panic!("expected numeric summary, got {other:?}"),
        }
    }

    #[test]
    fn test_dates_tally() {
        let raw = [
            json!(1_577_836_800_000_i64),
            json!("2020-03-01"),
            json!(null),
            json!("not a date"),
        ];
        let (summary, tally) = summarize_dates(raw.iter().map(Some));
        assert_eq!(tally.nulls, 1);
        assert_eq!(tally.invalid, 1);
        match summary {
            FieldSummary::Date(r) => {
                assert_eq!(r.count, 2);
                assert_eq!(r.span_days, 60.0);
            }
            other => panic!("expected date range, got {other:?}"),
        }
    }

    #[test]
    fn test_text_counts_numbers_as_text() {
        let raw = [json!("A"), json!(1), json!("A"), json!(null)];
        let (summary, tally) = summarize_text(raw.iter().map(Some), 5);
        assert_eq!(tally.nulls, 1);
        match summary {
            FieldSummary::Text(f) => {
                assert_eq!(f.count, 3);
                assert_eq!(f.distinct, 2);
                assert_eq!(f.top[0].value, "A");
                assert_eq!(f.top[0].count, 2);
            }
            other => panic!("expected frequencies, got {other:?}"),
        }
    }

    #[test]
    fn test_all_null_is_empty() {
        let raw = [json!(null), json!(null)];
        let (summary, tally) = summarize_numeric(raw.iter().map(Some));
        assert!(matches!(summary, FieldSummary::Empty));
        assert_eq!(tally.nulls, 2);
    }
}
