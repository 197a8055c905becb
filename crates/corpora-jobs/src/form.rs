//! Job submission form built from a task's parameter schema.

use serde_json::{Map, Value as JsonValue};

use corpora_core::{ContentUri, Error, JobSubmission, Result, Task, TaskParameter};

use crate::params::{
    cross_reference_value, parse_bool, pep8_normalize, validate_corpus_path, ParameterType,
};

/// One control of a [`JobForm`].
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub param_type: ParameterType,
    pub required: bool,
    pub choices: Vec<String>,
    /// Target content type of a cross-reference parameter.
    pub content_type: Option<String>,
    pub note: Option<String>,
    value: Option<JsonValue>,
}

impl FormField {
    fn from_parameter(param: &TaskParameter) -> Result<Self> {
        let param_type = ParameterType::from_tag(&param.type_tag)?;
        Ok(Self {
            name: param.name.clone(),
            label: param.label.clone().unwrap_or_else(|| param.name.clone()),
            param_type,
            required: param.required,
            choices: param.choices.clone(),
            content_type: param.content_type.clone(),
            note: param.note.clone(),
            value: param.default.clone().filter(|v| !v.is_null()),
        })
    }

    pub fn value(&self) -> Option<&JsonValue> {
        self.value.as_ref()
    }

    /// Value as shown in the form; secrets are masked.
    pub fn display_value(&self) -> String {
        match (&self.value, self.param_type.is_secret()) {
            (None, _) => String::new(),
            (Some(_), true) => "••••••••".to_string(),
            (Some(JsonValue::String(s)), false) => s.clone(),
            (Some(JsonValue::Object(o)), false) => o
                .get("uri")
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string(),
            (Some(other), false) => other.to_string(),
        }
    }

    fn parse(&self, raw: &str) -> Result<Option<JsonValue>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() && self.param_type != ParameterType::Boolean {
            return Ok(None);
        }
        let value = match self.param_type {
            ParameterType::Text | ParameterType::Password => JsonValue::String(raw.to_string()),
            ParameterType::Boolean => JsonValue::Bool(parse_bool(raw)?),
            ParameterType::Choice => {
                if !self.choices.iter().any(|c| c == trimmed) {
                    return Err(Error::Validation(format!(
                        "{} must be one of {:?}, got: {}",
                        self.name, self.choices, trimmed
                    )));
                }
                JsonValue::String(trimmed.to_string())
            }
            ParameterType::CorpusFile => JsonValue::String(validate_corpus_path(trimmed)?),
            ParameterType::CorpusRepo | ParameterType::ContentTypeRef => {
                if trimmed.contains(char::is_whitespace) {
                    return Err(Error::Validation(format!(
                        "{} must be a single name, got: {}",
                        self.name, trimmed
                    )));
                }
                JsonValue::String(trimmed.to_string())
            }
            ParameterType::CrossReference => {
                let uri: ContentUri = trimmed.parse()?;
                if let Some(expected) = &self.content_type {
                    if &uri.content_type != expected {
                        return Err(Error::Validation(format!(
                            "{} must reference a {}, got a {}",
                            self.name, expected, uri.content_type
                        )));
                    }
                }
                cross_reference_value(&uri)
            }
            ParameterType::Pep8Text => JsonValue::String(pep8_normalize(raw)),
        };
        Ok(Some(value))
    }
}

/// Parameter form for one task on one jobsite.
#[derive(Debug, Clone)]
pub struct JobForm {
    task: Task,
    jobsite_id: String,
    fields: Vec<FormField>,
}

impl JobForm {
    /// Build the form. Fails with `UnsupportedType` if any parameter's
    /// type tag is unknown.
    pub fn new(task: Task, jobsite_id: impl Into<String>) -> Result<Self> {
        let fields = task
            .parameters
            .iter()
            .map(FormField::from_parameter)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            task,
            jobsite_id: jobsite_id.into(),
            fields,
        })
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Parse and store a raw form value. Blank input clears the field.
    pub fn set_value(&mut self, name: &str, raw: &str) -> Result<()> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| Error::InvalidInput(format!("unknown parameter: {}", name)))?;
        field.value = field.parse(raw)?;
        Ok(())
    }

    /// Names of required parameters that have no value.
    pub fn missing(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required && f.value.is_none())
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "missing required parameters: {}",
                missing.join(", ")
            )))
        }
    }

    /// Submission payload for running the task against `target`.
    pub fn to_submission(&self, target: &ContentUri) -> Result<JobSubmission> {
        if target.content_type != self.task.content_type {
            return Err(Error::InvalidInput(format!(
                "task {} runs on {} content, not {}",
                self.task.name, self.task.content_type, target.content_type
            )));
        }
        self.validate()?;
        let parameters: Map<String, JsonValue> = self
            .fields
            .iter()
            .filter_map(|f| f.value.clone().map(|v| (f.name.clone(), v)))
            .collect();
        Ok(JobSubmission {
            jobsite_id: self.jobsite_id.clone(),
            task_id: self.task.id.clone(),
            corpus_id: target.corpus_id.clone(),
            content_type: target.content_type.clone(),
            content_id: target.content_id.clone(),
            parameters,
        })
    }
}
