// src/registers.rs
//
// Field model and validation for the configurable register forms. A
// template is an ordered list of typed fields stored as JSONB; entries
// store a data map keyed by field id. Validation runs server-side before
// an entry row is inserted.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Select,
    Checkbox,
    Date,
    Datetime,
    Textarea,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterField {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Checks a template's field list at create/update time.
pub fn validate_template(fields: &[RegisterField]) -> Result<(), String> {
    if fields.is_empty() {
        return Err("Template must define at least one field".to_string());
    }
    let mut seen = std::collections::HashSet::new();
    for field in fields {
        if field.id.trim().is_empty() {
            return Err("Field id must not be empty".to_string());
        }
        if !seen.insert(field.id.as_str()) {
            return Err(format!("Duplicate field id '{}'", field.id));
        }
        if field.field_type == FieldType::Select
            && field.options.as_ref().map_or(true, |o| o.is_empty())
        {
            return Err(format!("Select field '{}' must define options", field.id));
        }
    }
    Ok(())
}

/// Checks an entry's data map against its template. Required fields must
/// be present and non-empty, values must match their field type, and
/// unknown field ids are rejected.
pub fn validate_entry(fields: &[RegisterField], data: &Map<String, Value>) -> Result<(), String> {
    for key in data.keys() {
        if !fields.iter().any(|f| f.id == *key) {
            return Err(format!("Unknown field '{key}'"));
        }
    }

    for field in fields {
        let value = data.get(&field.id).filter(|v| !is_empty(v));
        match value {
            None => {
                if field.required {
                    return Err(format!("Field '{}' is required", field.id));
                }
            }
            Some(value) => check_value(field, value)?,
        }
    }
    Ok(())
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_value(field: &RegisterField, value: &Value) -> Result<(), String> {
    match field.field_type {
        FieldType::Text | FieldType::Textarea | FieldType::File => match value {
            Value::String(_) => Ok(()),
            _ => Err(format!("Field '{}' must be a string", field.id)),
        },
        FieldType::Number => match value {
            Value::Number(_) => Ok(()),
            _ => Err(format!("Field '{}' must be a number", field.id)),
        },
        FieldType::Checkbox => match value {
            Value::Bool(_) => Ok(()),
            _ => Err(format!("Field '{}' must be a boolean", field.id)),
        },
        FieldType::Select => {
            let Value::String(s) = value else {
                return Err(format!("Field '{}' must be a string", field.id));
            };
            let options = field.options.as_deref().unwrap_or(&[]);
            if options.iter().any(|o| o == s) {
                Ok(())
            } else {
                Err(format!("Field '{}' must be one of its options", field.id))
            }
        }
        FieldType::Date => {
            let Value::String(s) = value else {
                return Err(format!("Field '{}' must be a date string", field.id));
            };
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| format!("Field '{}' must be a YYYY-MM-DD date", field.id))
        }
        FieldType::Datetime => {
            let Value::String(s) = value else {
                return Err(format!("Field '{}' must be a datetime string", field.id));
            };
            if DateTime::parse_from_rfc3339(s).is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
            {
                Ok(())
            } else {
                Err(format!("Field '{}' must be an ISO datetime", field.id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(id: &str, field_type: FieldType, required: bool) -> RegisterField {
        RegisterField {
            id: id.to_string(),
            label: id.to_string(),
            field_type,
            required,
            options: None,
        }
    }

    fn sample_fields() -> Vec<RegisterField> {
        vec![
            field("remarks", FieldType::Text, true),
            field("quantity", FieldType::Number, true),
            RegisterField {
                options: Some(vec!["inward".to_string(), "outward".to_string()]),
                ..field("movement", FieldType::Select, true)
            },
            field("checked", FieldType::Checkbox, false),
            field("entry_date", FieldType::Date, false),
        ]
    }

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn valid_entry_passes() {
        let d = data(json!({
            "remarks": "seal intact",
            "quantity": 12,
            "movement": "inward",
            "checked": true,
            "entry_date": "2026-08-29"
        }));
        assert!(validate_entry(&sample_fields(), &d).is_ok());
    }

    #[test]
    fn missing_required_field_fails() {
        let d = data(json!({ "remarks": "x", "movement": "inward" }));
        let err = validate_entry(&sample_fields(), &d).unwrap_err();
        assert!(err.contains("quantity"));
    }

    #[test]
    fn empty_string_counts_as_missing() {
        let d = data(json!({ "remarks": "  ", "quantity": 1, "movement": "inward" }));
        assert!(validate_entry(&sample_fields(), &d).is_err());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let d = data(json!({
            "remarks": "x", "quantity": 1, "movement": "inward", "extra": 5
        }));
        let err = validate_entry(&sample_fields(), &d).unwrap_err();
        assert!(err.contains("extra"));
    }

    #[test]
    fn type_mismatches_are_rejected() {
        let fields = sample_fields();
        let bad_number = data(json!({ "remarks": "x", "quantity": "12", "movement": "inward" }));
        assert!(validate_entry(&fields, &bad_number).is_err());

        let bad_select = data(json!({ "remarks": "x", "quantity": 1, "movement": "sideways" }));
        assert!(validate_entry(&fields, &bad_select).is_err());

        let bad_date = data(json!({
            "remarks": "x", "quantity": 1, "movement": "inward", "entry_date": "29/08/2026"
        }));
        assert!(validate_entry(&fields, &bad_date).is_err());
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let d = data(json!({ "remarks": "x", "quantity": 1, "movement": "inward" }));
        assert!(validate_entry(&sample_fields(), &d).is_ok());
    }

    #[test]
    fn template_rejects_duplicate_ids_and_optionless_selects() {
        let dup = vec![field("a", FieldType::Text, false), field("a", FieldType::Number, false)];
        assert!(validate_template(&dup).is_err());

        let bare_select = vec![field("pick", FieldType::Select, true)];
        assert!(validate_template(&bare_select).is_err());

        assert!(validate_template(&sample_fields()).is_ok());
        assert!(validate_template(&[]).is_err());
    }

    #[test]
    fn field_type_serde_uses_lowercase_names() {
        let parsed: FieldType = serde_json::from_value(json!("datetime")).unwrap();
        assert_eq!(parsed, FieldType::Datetime);
        assert_eq!(serde_json::to_value(FieldType::Textarea).unwrap(), json!("textarea"));
    }
}
