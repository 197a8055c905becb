//! Field type dispatch and the form value codec.
//!
//! Every field of a content type carries a type tag. Editors render and
//! parse values through [`to_form`] / [`from_form`], which dispatch on
//! [`FieldType`] so that an unknown tag fails once, at lookup.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use corpora_core::{Error, Result};

use crate::crossref::CrossReference;
use crate::file::validate_relative_path;
use crate::geo::GeoPoint;
use crate::html::normalize_html;
use crate::link::validate_url;
use crate::timespan::Timespan;

/// Field types a content type may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    LargeText,
    Keyword,
    Html,
    Number,
    Decimal,
    Boolean,
    Date,
    Timespan,
    GeoPoint,
    File,
    Image,
    IiifImage,
    Link,
    CrossReference,
    Choice,
}

impl FieldType {
    pub const ALL: [FieldType; 16] = [
        FieldType::Text,
        FieldType::LargeText,
        FieldType::Keyword,
        FieldType::Html,
        FieldType::Number,
        FieldType::Decimal,
        FieldType::Boolean,
        FieldType::Date,
        FieldType::Timespan,
        FieldType::GeoPoint,
        FieldType::File,
        FieldType::Image,
        FieldType::IiifImage,
        FieldType::Link,
        FieldType::CrossReference,
        FieldType::Choice,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::LargeText => "large_text",
            FieldType::Keyword => "keyword",
            FieldType::Html => "html",
            FieldType::Number => "number",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Timespan => "timespan",
            FieldType::GeoPoint => "geo_point",
            FieldType::File => "file",
            FieldType::Image => "image",
            FieldType::IiifImage => "iiif_image",
            FieldType::Link => "link",
            FieldType::CrossReference => "cross_reference",
            FieldType::Choice => "choice",
        }
    }

    /// Look up a field type by tag.
    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.tag() == tag)
            .ok_or_else(|| Error::UnsupportedType(format!("field type: {}", tag)))
    }

    /// Whether the stored value is a path into the content's file store.
    pub fn is_file_backed(&self) -> bool {
        matches!(self, FieldType::File | FieldType::Image)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s)
    }
}

/// A value as an editor control holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Text(String),
    Bool(bool),
    List(Vec<String>),
}

impl FormValue {
    pub fn empty() -> Self {
        FormValue::Text(String::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FormValue::Text(s) => s.trim().is_empty(),
            FormValue::Bool(_) => false,
            FormValue::List(items) => items.iter().all(|i| i.trim().is_empty()),
        }
    }

    fn into_text(self, field_type: FieldType) -> Result<String> {
        match self {
            FormValue::Text(s) => Ok(s),
            other => Err(Error::Validation(format!(
                "{} field expects text, got {:?}",
                field_type, other
            ))),
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_string())
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        FormValue::Bool(value)
    }
}

/// Render a stored value for an editor. `null` renders as the empty value
/// of the field's control.
pub fn to_form(field_type: FieldType, value: &JsonValue) -> Result<FormValue> {
    if value.is_null() {
        return Ok(match field_type {
            FieldType::Boolean => FormValue::Bool(false),
            FieldType::Timespan => FormValue::List(Vec::new()),
            _ => FormValue::empty(),
        });
    }
    let form = match field_type {
        FieldType::Text
        | FieldType::LargeText
        | FieldType::Keyword
        | FieldType::Html
        | FieldType::Choice
        | FieldType::Link
        | FieldType::File
        | FieldType::Image
        | FieldType::IiifImage => FormValue::Text(expect_str(field_type, value)?.to_string()),
        FieldType::Number | FieldType::Decimal => match value {
            JsonValue::Number(n) => FormValue::Text(n.to_string()),
            JsonValue::String(s) => FormValue::Text(s.clone()),
            _ => return Err(mismatch(field_type, value)),
        },
        FieldType::Boolean => FormValue::Bool(
            value
                .as_bool()
                .ok_or_else(|| mismatch(field_type, value))?,
        ),
        FieldType::Date => {
            let raw = expect_str(field_type, value)?;
            FormValue::Text(raw.get(..10).unwrap_or(raw).to_string())
        }
        FieldType::Timespan => {
            let span: Timespan = serde_json::from_value(value.clone())?;
            FormValue::List(span.to_form_parts())
        }
        FieldType::GeoPoint => FormValue::Text(GeoPoint::from_geojson(value)?.to_form_string()),
        FieldType::CrossReference => {
            let xref: CrossReference = serde_json::from_value(value.clone())?;
            FormValue::List(vec![xref.uri, xref.label])
        }
    };
    Ok(form)
}

/// Parse an editor value into the stored form. Blank input stores `null`.
pub fn from_form(field_type: FieldType, value: FormValue) -> Result<JsonValue> {
    if field_type != FieldType::Boolean && value.is_empty() {
        return Ok(JsonValue::Null);
    }
    let stored = match field_type {
        FieldType::Text | FieldType::LargeText | FieldType::Choice | FieldType::IiifImage => {
            JsonValue::String(value.into_text(field_type)?)
        }
        FieldType::Keyword => JsonValue::String(value.into_text(field_type)?.trim().to_string()),
        FieldType::Html => {
            let html = normalize_html(&value.into_text(field_type)?);
            if html.is_empty() {
                JsonValue::Null
            } else {
                JsonValue::String(html)
            }
        }
        FieldType::Number => {
            let raw = value.into_text(field_type)?;
            let n: i64 = raw.trim().parse().map_err(|_| {
                Error::Validation(format!("not a whole number: {}", raw.trim()))
            })?;
            json!(n)
        }
        FieldType::Decimal => {
            let raw = value.into_text(field_type)?;
            let n: f64 = raw
                .trim()
                .parse()
                .ok()
                .filter(|n: &f64| n.is_finite())
                .ok_or_else(|| Error::Validation(format!("not a number: {}", raw.trim())))?;
            json!(n)
        }
        FieldType::Boolean => match value {
            FormValue::Bool(b) => JsonValue::Bool(b),
            FormValue::Text(s) => JsonValue::Bool(matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "on" | "yes" | "1"
            )),
            FormValue::List(_) => {
                return Err(Error::Validation("boolean field expects a flag".into()))
            }
        },
        FieldType::Date => JsonValue::String(parse_date(&value.into_text(field_type)?)?),
        FieldType::Timespan => {
            let parts = match value {
                FormValue::List(parts) => parts,
                FormValue::Text(start) => vec![start],
                FormValue::Bool(_) => {
                    return Err(Error::Validation("timespan field expects dates".into()))
                }
            };
            serde_json::to_value(Timespan::from_form_parts(&parts)?)?
        }
        FieldType::GeoPoint => GeoPoint::parse(&value.into_text(field_type)?)?.to_geojson(),
        FieldType::File | FieldType::Image => {
            JsonValue::String(validate_relative_path(&value.into_text(field_type)?)?)
        }
        FieldType::Link => JsonValue::String(validate_url(&value.into_text(field_type)?)?),
        FieldType::CrossReference => {
            let (uri, label) = match value {
                FormValue::List(parts) => {
                    let mut parts = parts.into_iter();
                    (parts.next().unwrap_or_default(), parts.next())
                }
                FormValue::Text(uri) => (uri, None),
                FormValue::Bool(_) => {
                    return Err(Error::Validation("cross reference expects a URI".into()))
                }
            };
            let mut xref = CrossReference::from_uri(&uri)?;
            if let Some(label) = label.filter(|l| !l.trim().is_empty()) {
                xref.label = label;
            }
            serde_json::to_value(xref)?
        }
    };
    Ok(stored)
}

fn expect_str(field_type: FieldType, value: &JsonValue) -> Result<&str> {
    value.as_str().ok_or_else(|| mismatch(field_type, value))
}

fn mismatch(field_type: FieldType, value: &JsonValue) -> Error {
    Error::Validation(format!("unexpected {} value: {}", field_type, value))
}

/// Accept a calendar date or a full timestamp; store `YYYY-MM-DD`.
fn parse_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.format("%Y-%m-%d").to_string());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .map_err(|_| Error::Validation(format!("not a date: {}", raw)))
}
