use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{FormField, SubmissionValue};

/// Placeholder for fields the respondent left unanswered.
pub const NO_VALUE: &str = "no value";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub key: String,
    pub value: String,
}

/// Flat `"{order}_{label}" -> value` mapping, kept in field order so that
/// spreadsheet headers and rows line up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedRecord {
    entries: Vec<RecordEntry>,
}

impl KeyedRecord {
    pub fn build(fields: &[FormField], values: &[SubmissionValue]) -> Self {
        let mut ordered: Vec<&FormField> = fields.iter().collect();
        ordered.sort_by_key(|field| field.order);

        let entries = ordered
            .into_iter()
            .map(|field| RecordEntry {
                key: field.key(),
                value: lookup(values, &field.id)
                    .unwrap_or(NO_VALUE)
                    .to_string(),
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    pub fn values(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.value.clone()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|e| (e.key.clone(), Value::String(e.value.clone())))
            .collect();
        Value::Object(map)
    }
}

/// Submitted value for a field, if the respondent answered it.
pub fn lookup<'a>(values: &'a [SubmissionValue], field_id: &str) -> Option<&'a str> {
    values
        .iter()
        .find(|v| v.form_field_id == field_id)
        .map(|v| v.value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: &str, label: &str, order: i32) -> FormField {
        FormField {
            id: id.to_string(),
            label: label.to_string(),
            order,
        }
    }

    fn value(field_id: &str, value: &str) -> SubmissionValue {
        SubmissionValue {
            form_field_id: field_id.to_string(),
            value: value.to_string(),
            respondent_id: "r1".to_string(),
            form_id: "f1".to_string(),
        }
    }

    #[test]
    fn duplicate_labels_get_distinct_keys() {
        let fields = vec![field("a", "Name", 0), field("b", "Name", 1)];
        let record = KeyedRecord::build(&fields, &[value("a", "Ada"), value("b", "Grace")]);

        assert_eq!(record.keys(), vec!["0_Name", "1_Name"]);
        assert_eq!(record.get("0_Name"), Some("Ada"));
        assert_eq!(record.get("1_Name"), Some("Grace"));
    }

    #[test]
    fn missing_values_become_no_value() {
        let fields = vec![field("a", "Email", 0)];
        let record = KeyedRecord::build(&fields, &[]);

        assert_eq!(record.get("0_Email"), Some(NO_VALUE));
    }

    #[test]
    fn entries_follow_field_order_and_trim_labels() {
        let fields = vec![field("b", " Second ", 2), field("a", "First", 1)];
        let record = KeyedRecord::build(&fields, &[value("a", "1"), value("b", "2")]);

        assert_eq!(record.keys(), vec!["1_First", "2_Second"]);
        assert_eq!(record.values(), vec!["1", "2"]);
        assert_eq!(
            record.to_json(),
            serde_json::json!({ "1_First": "1", "2_Second": "2" })
        );
    }
}
