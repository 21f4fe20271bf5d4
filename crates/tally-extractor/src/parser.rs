//! Parse model output into record candidates

use crate::error::ExtractorError;
use crate::types::{ExtractionReport, RowFailure};
use serde_json::Value;
use tally_domain::{FieldConfidence, RecordCandidate};
use tracing::warn;

/// Parse a model JSON response into an extraction report
///
/// The expected shape is an object with a `rows` array. Each row parses
/// into a tagged outcome: a [`RecordCandidate`] on success, a recorded
/// [`RowFailure`] otherwise. A response whose rows all fail is the
/// transcription-ambiguous condition and fails the page; a well-formed
/// empty `rows` array is a legitimate non-transactional page.
pub fn parse_model_response(response: &str) -> Result<ExtractionReport, ExtractorError> {
    let json_str = extract_json(response)?;

    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| ExtractorError::InvalidFormat(format!("JSON parse error: {}", e)))?;

    let obj = json
        .as_object()
        .ok_or_else(|| ExtractorError::InvalidFormat("Expected JSON object".to_string()))?;

    // a missing "rows" key reads as an empty page, matching models that
    // answer {"rows": []} and {} interchangeably for blank pages
    let rows = match obj.get("rows") {
        None => return Ok(ExtractionReport::default()),
        Some(value) => value.as_array().ok_or_else(|| {
            ExtractorError::InvalidFormat("'rows' is not an array".to_string())
        })?,
    };

    let mut candidates = Vec::new();
    let mut skipped = Vec::new();
    let mut seen_row_ids = std::collections::HashSet::new();

    for (idx, row_json) in rows.iter().enumerate() {
        match parse_row_json(row_json, idx) {
            Ok(candidate) => {
                if !seen_row_ids.insert(candidate.row_id) {
                    warn!("row {} reuses row_id {}", idx, candidate.row_id);
                    skipped.push(RowFailure {
                        reason: format!("duplicate row_id {}", candidate.row_id),
                        raw: row_json.to_string(),
                    });
                    continue;
                }
                candidates.push(candidate);
            }
            Err(reason) => {
                warn!("failed to parse row {}: {}", idx, reason);
                skipped.push(RowFailure {
                    reason,
                    raw: row_json.to_string(),
                });
            }
        }
    }

    if candidates.is_empty() && !skipped.is_empty() {
        return Err(ExtractorError::Ambiguous(format!(
            "all {} proposed rows failed to parse",
            skipped.len()
        )));
    }

    Ok(ExtractionReport {
        candidates,
        skipped,
    })
}

/// Extract JSON from a response, handling markdown code blocks
///
/// Models sometimes wrap JSON in ``` fences despite JSON-mode instructions.
fn extract_json(response: &str) -> Result<String, ExtractorError> {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err(ExtractorError::InvalidFormat("Empty code block".to_string()));
        }

        // skip the opening fence and the closing fence line
        let json_lines = &lines[1..lines.len().saturating_sub(1)];
        Ok(json_lines.join("\n"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Parse a single row object into a candidate
fn parse_row_json(json: &Value, idx: usize) -> Result<RecordCandidate, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "row is not a JSON object".to_string())?;

    let row_id = match obj.get("row_id") {
        None | Some(Value::Null) => idx as u32,
        Some(value) => value
            .as_u64()
            .ok_or_else(|| format!("'row_id' is not a non-negative integer: {}", value))?
            as u32,
    };

    let description = obj
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let transaction_type = obj
        .get("transaction_type")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown")
        .to_string();

    let pounds = parse_optional_int(obj, "pounds")?;
    let shillings = parse_optional_int(obj, "shillings")?;
    let pence = parse_optional_int(obj, "pence")?;

    let pence_fraction = match obj.get("pence_fraction") {
        None | Some(Value::Null) => None,
        Some(Value::String(token)) => Some(token.clone()),
        Some(other) => return Err(format!("'pence_fraction' is not a string: {}", other)),
    };

    let confidence = FieldConfidence {
        description: parse_confidence(obj, "model_conf_description"),
        transaction_type: parse_confidence(obj, "model_conf_transaction_type"),
        pounds: parse_confidence(obj, "model_conf_pounds"),
        shillings: parse_confidence(obj, "model_conf_shillings"),
        pence: parse_confidence(obj, "model_conf_pence"),
        pence_fraction: parse_confidence(obj, "model_conf_pence_fraction"),
    }
    .clamped();

    Ok(RecordCandidate {
        row_id,
        description,
        transaction_type,
        pounds,
        shillings,
        pence,
        pence_fraction,
        confidence,
    })
}

fn parse_optional_int(
    obj: &serde_json::Map<String, Value>,
    field: &str,
) -> Result<Option<i64>, String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("'{}' is not an integer: {}", field, value)),
    }
}

fn parse_confidence(obj: &serde_json::Map<String, Value>, field: &str) -> f64 {
    obj.get(field).and_then(|v| v.as_f64()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_response() {
        let response = r#"{
            "rows": [
                {
                    "row_id": 0,
                    "description": "Received of Mr Hale for the poor",
                    "transaction_type": "Credit",
                    "pounds": 3,
                    "shillings": 12,
                    "pence": 6,
                    "pence_fraction": "1/2",
                    "model_conf_description": 0.95,
                    "model_conf_transaction_type": 0.9,
                    "model_conf_pounds": 0.85,
                    "model_conf_shillings": 0.85,
                    "model_conf_pence": 0.8,
                    "model_conf_pence_fraction": 0.6
                }
            ]
        }"#;

        let report = parse_model_response(response).unwrap();
        assert_eq!(report.candidates.len(), 1);
        assert!(report.skipped.is_empty());

        let candidate = &report.candidates[0];
        assert_eq!(candidate.description, "Received of Mr Hale for the poor");
        assert_eq!(candidate.transaction_type, "Credit");
        assert_eq!(candidate.pounds, Some(3));
        assert_eq!(candidate.shillings, Some(12));
        assert_eq!(candidate.pence, Some(6));
        assert_eq!(candidate.pence_fraction.as_deref(), Some("1/2"));
        assert!((candidate.confidence.description - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_parse_markdown_wrapped_json() {
        let response = "```json\n{\"rows\": []}\n```";
        let report = parse_model_response(response).unwrap();
        assert!(report.candidates.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_empty_rows_is_not_an_error() {
        let report = parse_model_response(r#"{"rows": []}"#).unwrap();
        assert!(report.candidates.is_empty());

        // some models answer {} for blank pages
        let report = parse_model_response("{}").unwrap();
        assert!(report.candidates.is_empty());
    }

    #[test]
    fn test_missing_fields_default_leniently() {
        let response = r#"{"rows": [{"description": "To bread and wine"}]}"#;
        let report = parse_model_response(response).unwrap();

        let candidate = &report.candidates[0];
        assert_eq!(candidate.row_id, 0);
        assert_eq!(candidate.transaction_type, "Unknown");
        assert_eq!(candidate.pounds, None);
        assert_eq!(candidate.pence_fraction, None);
        assert_eq!(candidate.confidence.description, 0.0);
    }

    #[test]
    fn test_bad_row_is_skipped_not_fatal() {
        let response = r#"{
            "rows": [
                {"description": "good row", "pounds": 1},
                {"description": "bad row", "pounds": "three"}
            ]
        }"#;

        let report = parse_model_response(response).unwrap();
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("pounds"));
    }

    #[test]
    fn test_all_rows_failing_is_ambiguous() {
        let response = r#"{
            "rows": [
                {"pounds": "three"},
                "not even an object"
            ]
        }"#;

        let err = parse_model_response(response).unwrap_err();
        assert!(matches!(err, ExtractorError::Ambiguous(_)));
    }

    #[test]
    fn test_unparseable_body_is_invalid_format() {
        let err = parse_model_response("the page shows a church ledger").unwrap_err();
        assert!(matches!(err, ExtractorError::InvalidFormat(_)));

        let err = parse_model_response(r#"["not", "an", "object"]"#).unwrap_err();
        assert!(matches!(err, ExtractorError::InvalidFormat(_)));
    }

    #[test]
    fn test_duplicate_row_ids_skip_later_row() {
        let response = r#"{
            "rows": [
                {"row_id": 0, "description": "first"},
                {"row_id": 0, "description": "second"}
            ]
        }"#;

        let report = parse_model_response(response).unwrap();
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].description, "first");
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("duplicate row_id"));
    }

    #[test]
    fn test_row_id_defaults_to_index() {
        let response = r#"{
            "rows": [
                {"description": "a"},
                {"description": "b"}
            ]
        }"#;

        let report = parse_model_response(response).unwrap();
        assert_eq!(report.candidates[0].row_id, 0);
        assert_eq!(report.candidates[1].row_id, 1);
    }

    #[test]
    fn test_confidences_are_clamped() {
        let response = r#"{
            "rows": [
                {"description": "x", "model_conf_description": 1.7, "model_conf_pounds": -0.3}
            ]
        }"#;

        let report = parse_model_response(response).unwrap();
        let c = &report.candidates[0].confidence;
        assert_eq!(c.description, 1.0);
        assert_eq!(c.pounds, 0.0);
    }
}
