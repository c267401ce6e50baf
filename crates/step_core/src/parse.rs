//! Best-effort parsing of model output
//!
//! Models are asked for a JSON object with `action`, `rationale` and
//! `confidence`, but nothing guarantees they comply. Parsing errors are typed
//! here and absorbed at [`StepOutput::from_content`].

use crate::types::StepOutput;
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons model output could not be read as a decision object
#[derive(Debug, Error)]
pub enum ModelOutputError {
    #[error("model output is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("model output is JSON but not an object")]
    NotAnObject,
}

/// Fields extracted from a decision object; each one independently optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionFields {
    pub action: Option<String>,
    pub rationale: Option<String>,
    pub confidence: Option<u8>,
}

/// Parse model text into decision fields
pub fn parse_model_output(text: &str) -> Result<DecisionFields, ModelOutputError> {
    let value: Value = serde_json::from_str(text)?;
    let object = value.as_object().ok_or(ModelOutputError::NotAnObject)?;

    Ok(DecisionFields {
        action: string_field(object, "action"),
        rationale: string_field(object, "rationale"),
        confidence: object.get("confidence").and_then(confidence_value),
    })
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Read a confidence percentage from a number or numeric string
fn confidence_value(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if !number.is_finite() {
        return None;
    }
    Some(number.round().clamp(0.0, 100.0) as u8)
}

impl StepOutput {
    /// Normalize model text into a step output.
    ///
    /// Never fails: unusable text degrades to empty fields and zero confidence.
    pub fn from_content(content: &str, raw_response: Value) -> Self {
        let fields = match parse_model_output(content) {
            Ok(fields) => fields,
            Err(err) => {
                tracing::debug!(error = %err, "model output unusable, using defaults");
                DecisionFields::default()
            }
        };

        Self {
            action: fields.action.unwrap_or_default(),
            rationale: fields.rationale.unwrap_or_default(),
            confidence: fields.confidence.unwrap_or(0),
            raw_response,
            served_model: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_well_formed_decision() {
        let fields = parse_model_output(
            r#"{"action":"tap gear icon","rationale":"it is top-right","confidence":87}"#,
        )
        .unwrap();

        assert_eq!(fields.action.as_deref(), Some("tap gear icon"));
        assert_eq!(fields.rationale.as_deref(), Some("it is top-right"));
        assert_eq!(fields.confidence, Some(87));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            parse_model_output("not json"),
            Err(ModelOutputError::NotJson(_))
        ));
    }

    #[test]
    fn test_array_is_not_a_decision() {
        assert!(matches!(
            parse_model_output(r#"[{"id":"btn-1","type":"button"}]"#),
            Err(ModelOutputError::NotAnObject)
        ));
    }

    #[test]
    fn test_confidence_variants() {
        let cases = [
            (json!(55.6), Some(56)),
            (json!("70"), Some(70)),
            (json!("80 %"), Some(80)),
            (json!(250), Some(100)),
            (json!(-3), Some(0)),
            (json!("high"), None),
            (json!(null), None),
        ];
        for (value, expected) in cases {
            assert_eq!(confidence_value(&value), expected, "{value}");
        }
    }

    #[test]
    fn test_missing_fields_default_independently() {
        let output = StepOutput::from_content(r#"{"action":"scroll"}"#, json!({"raw": true}));
        assert_eq!(output.action, "scroll");
        assert_eq!(output.rationale, "");
        assert_eq!(output.confidence, 0);
        assert_eq!(output.raw_response, json!({"raw": true}));
    }

    #[test]
    fn test_non_string_action_is_ignored() {
        let output = StepOutput::from_content(r#"{"action":{"x":1},"confidence":12}"#, Value::Null);
        assert_eq!(output.action, "");
        assert_eq!(output.confidence, 12);
    }

    #[test]
    fn test_malformed_content_degrades() {
        let raw = json!({"choices": []});
        let output = StepOutput::from_content("not json", raw.clone());
        assert_eq!(
            output,
            StepOutput {
                action: String::new(),
                rationale: String::new(),
                confidence: 0,
                raw_response: raw,
                served_model: None,
            }
        );
    }
}
