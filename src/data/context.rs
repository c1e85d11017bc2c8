use crate::condition::{FieldSource, Value};
use crate::error::ContextError;
use ahash::AHashMap;
use serde::Deserialize;
use std::fs;

/// A flat map of field name to value.
pub type FieldMap = AHashMap<String, Value>;

/// The runtime data a condition tree is evaluated against.
///
/// All four maps are flat. Nested JSON objects are flattened into dotted keys
/// on load, so `{"address": {"city": "Pune"}}` becomes `address.city`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationContext {
    /// Submitted form data of the current screen.
    pub form_data: FieldMap,
    /// Completed service call results, keyed by service id.
    pub services: AHashMap<String, FieldMap>,
    /// Journey state.
    pub application_state: FieldMap,
    /// Authenticated identity.
    pub user_profile: FieldMap,
}

/// Matches the expected JSON shape of a context document.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawContext {
    #[serde(default)]
    form_data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    services: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    application_state: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    user_profile: serde_json::Map<String, serde_json::Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a context document of the form
    /// `{ "formData": {}, "services": {}, "applicationState": {}, "userProfile": {} }`.
    /// Every section is optional.
    pub fn from_json_str(json: &str) -> Result<Self, ContextError> {
        let raw: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json(raw)
    }

    pub fn from_json(json: serde_json::Value) -> Result<Self, ContextError> {
        if !json.is_object() {
            return Err(ContextError::NotAnObject(json_kind(&json)));
        }
        let raw: RawContext = serde_json::from_value(json)?;

        let services = raw
            .services
            .iter()
            .map(|(service_id, response)| {
                let mut fields = FieldMap::new();
                match response {
                    serde_json::Value::Object(map) => flatten_into(&mut fields, "", map),
                    // A scalar response is addressable as `<serviceId>.value`.
                    other => {
                        fields.insert("value".to_string(), Value::from_json(other));
                    }
                }
                (service_id.clone(), fields)
            })
            .collect();

        Ok(Self {
            form_data: flatten(&raw.form_data),
            services,
            application_state: flatten(&raw.application_state),
            user_profile: flatten(&raw.user_profile),
        })
    }

    /// Loads a context document from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, ContextError> {
        let content = fs::read_to_string(path).map_err(|source| ContextError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn with_form(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.form_data.insert(field.into(), value.into());
        self
    }

    pub fn with_service(
        mut self,
        service_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.services
            .entry(service_id.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn with_state(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.application_state.insert(field.into(), value.into());
        self
    }

    pub fn with_user(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.user_profile.insert(field.into(), value.into());
        self
    }

    /// Looks up a field. Missing maps and missing keys resolve to `Value::Absent`.
    pub fn resolve(&self, source: FieldSource, field: &str) -> Value {
        let found = match source {
            FieldSource::FormData => self.form_data.get(field),
            FieldSource::ApplicationState => self.application_state.get(field),
            FieldSource::UserProfile => self.user_profile.get(field),
            FieldSource::ServiceResponse => field
                .split_once('.')
                .and_then(|(service_id, key)| self.services.get(service_id)?.get(key)),
        };
        found.cloned().unwrap_or(Value::Absent)
    }

    /// Renders the context back to its JSON document shape, with flat maps.
    pub fn to_json(&self) -> serde_json::Value {
        let services: serde_json::Map<String, serde_json::Value> = self
            .services
            .iter()
            .map(|(id, fields)| (id.clone(), map_to_json(fields)))
            .collect();
        serde_json::json!({
            "formData": map_to_json(&self.form_data),
            "services": services,
            "applicationState": map_to_json(&self.application_state),
            "userProfile": map_to_json(&self.user_profile),
        })
    }
}

fn flatten(map: &serde_json::Map<String, serde_json::Value>) -> FieldMap {
    let mut fields = FieldMap::new();
    flatten_into(&mut fields, "", map);
    fields
}

fn flatten_into(
    fields: &mut FieldMap,
    prefix: &str,
    map: &serde_json::Map<String, serde_json::Value>,
) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            serde_json::Value::Object(nested) => flatten_into(fields, &path, nested),
            other => {
                fields.insert(path, Value::from_json(other));
            }
        }
    }
}

fn map_to_json(fields: &FieldMap) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::to_value(v).unwrap_or_default()))
        .collect();
    serde_json::Value::Object(map)
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
