//! Typed accessors over a compendium entry's JSON object.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::ContentError;
use crate::stats::StatModifier;

/// Borrowed view of one entry, carrying its id for error messages.
#[derive(Clone, Copy, Debug)]
pub struct Fields<'a> {
    entry: &'a str,
    obj: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(entry: &'a str, value: &'a Value) -> Result<Self, ContentError> {
        let obj = value.as_object().ok_or_else(|| ContentError::NotAnObject {
            entry: entry.to_string(),
        })?;
        Ok(Self { entry, obj })
    }

    pub fn entry(&self) -> &'a str {
        self.entry
    }

    pub fn object(&self) -> &'a Map<String, Value> {
        self.obj
    }

    pub fn missing(&self, field: &'static str) -> ContentError {
        ContentError::MissingField {
            entry: self.entry.to_string(),
            field,
        }
    }

    pub fn invalid(&self, field: &str, reason: impl Into<String>) -> ContentError {
        ContentError::InvalidField {
            entry: self.entry.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.obj.get(field)
    }

    pub fn required_str(&self, field: &'static str) -> Result<&'a str, ContentError> {
        let value = self.get(field).ok_or_else(|| self.missing(field))?;
        value
            .as_str()
            .ok_or_else(|| self.invalid(field, "expected a string"))
    }

    pub fn optional_str(&self, field: &'static str) -> Result<Option<&'a str>, ContentError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "expected a string")),
        }
    }

    /// Required display string; the empty string means "not set".
    pub fn display_str(&self, field: &'static str) -> Result<Option<String>, ContentError> {
        let value = self.required_str(field)?;
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    pub fn bool_or(&self, field: &'static str, default: bool) -> Result<bool, ContentError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| self.invalid(field, "expected a boolean")),
        }
    }

    pub fn required_f32(&self, field: &'static str) -> Result<f32, ContentError> {
        let value = self.get(field).ok_or_else(|| self.missing(field))?;
        value
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| self.invalid(field, "expected a number"))
    }

    pub fn f32_or(&self, field: &'static str, default: f32) -> Result<f32, ContentError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.required_f32(field),
        }
    }

    pub fn required_u32(&self, field: &'static str) -> Result<u32, ContentError> {
        let value = self.get(field).ok_or_else(|| self.missing(field))?;
        value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.invalid(field, "expected a non-negative integer"))
    }

    pub fn u32_or(&self, field: &'static str, default: u32) -> Result<u32, ContentError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.required_u32(field),
        }
    }

    pub fn u64_or(&self, field: &'static str, default: u64) -> Result<u64, ContentError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value
                .as_u64()
                .ok_or_else(|| self.invalid(field, "expected a non-negative integer")),
        }
    }

    pub fn string_set(&self, field: &'static str) -> Result<BTreeSet<String>, ContentError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(BTreeSet::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.invalid(field, "expected an array of strings"))
                })
                .collect(),
            Some(_) => Err(self.invalid(field, "expected an array of strings")),
        }
    }

    /// `{"stat": [modifier, ...]}` where each modifier is a serialized
    /// [`StatModifier`].
    pub fn modifiers(&self) -> Result<BTreeMap<String, Vec<StatModifier>>, ContentError> {
        match self.get("modifiers") {
            None | Some(Value::Null) => Ok(BTreeMap::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|err| self.invalid("modifiers", err.to_string())),
        }
    }

    /// Deserializes an arbitrary serde field.
    pub fn parse<T: serde::de::DeserializeOwned>(
        &self,
        field: &'static str,
    ) -> Result<Option<T>, ContentError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|err| self.invalid(field, err.to_string())),
        }
    }
}

/// Empty string for unset display fields.
pub fn display_value(value: Option<&str>) -> Value {
    Value::String(value.unwrap_or_default().to_string())
}
