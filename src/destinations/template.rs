use std::sync::LazyLock;

use askama::Template;
use regex::Regex;

use crate::error::DeliveryError;
use crate::models::{FormField, SubmissionValue};
use crate::workflow::record::lookup;
use crate::workflow::NO_VALUE;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Replace `{{fieldId}}` placeholders with the submitted value, or `no value`.
pub fn render_dynamic(template: &str, values: &[SubmissionValue]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures| {
            let value = lookup(values, &caps[1]).unwrap_or(NO_VALUE);
            escape_html(value)
        })
        .to_string()
}

#[derive(Template)]
#[template(path = "mail/submission.html")]
struct SubmissionListing<'a> {
    rows: Vec<ListingRow<'a>>,
}

struct ListingRow<'a> {
    label: &'a str,
    value: &'a str,
}

/// Default body: a two-column label/value table of every field.
pub fn render_listing(
    fields: &[FormField],
    values: &[SubmissionValue],
) -> Result<String, DeliveryError> {
    let mut ordered: Vec<&FormField> = fields.iter().collect();
    ordered.sort_by_key(|field| field.order);

    let rows = ordered
        .into_iter()
        .map(|field| ListingRow {
            label: field.label.trim(),
            value: lookup(values, &field.id).unwrap_or(NO_VALUE),
        })
        .collect();

    SubmissionListing { rows }
        .render()
        .map_err(|e| DeliveryError::Configuration(format!("failed to render mail body: {e}")))
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(field_id: &str, value: &str) -> SubmissionValue {
        SubmissionValue {
            form_field_id: field_id.into(),
            value: value.into(),
            respondent_id: "r1".into(),
            form_id: "form-1".into(),
        }
    }

    #[test]
    fn substitutes_submitted_values() {
        assert_eq!(
            render_dynamic("Hello {{f1}}", &[value("f1", "World")]),
            "Hello World"
        );
    }

    #[test]
    fn missing_values_render_no_value() {
        assert_eq!(render_dynamic("Hello {{f1}}", &[]), "Hello no value");
    }

    #[test]
    fn tolerates_whitespace_and_escapes_values() {
        assert_eq!(
            render_dynamic("<p>{{ f1 }}</p>", &[value("f1", "<b>x</b>")]),
            "<p>&lt;b&gt;x&lt;/b&gt;</p>"
        );
    }

    #[test]
    fn listing_has_one_row_per_field() {
        let fields = vec![
            FormField { id: "b".into(), label: "Email".into(), order: 1 },
            FormField { id: "a".into(), label: "Name".into(), order: 0 },
        ];
        let html = render_listing(&fields, &[value("a", "Ada")]).unwrap();

        let name_at = html.find("Name").unwrap();
        let email_at = html.find("Email").unwrap();
        assert!(name_at < email_at);
        assert!(html.contains("Ada"));
        assert!(html.contains(NO_VALUE));
    }
}
