// Copyright 2025 Cloudbin (https://github.com/cloudbin)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Schema-field metadata for storage-config forms
//!
//! Each driver type publishes a [`ConfigSchema`]: a flat list of field
//! records plus the layout groups the admin UI renders. Field metadata is a
//! value, not a type hierarchy - predicates (`required_when`,
//! `disabled_when`, `depends_on`) are small data-only expressions evaluated
//! against the submitted config bag.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field value kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Enum,
    Secret,
}

/// Wire-level validation rule attached to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRule {
    /// Must parse as an http(s) URL
    Url,
    /// Must be an absolute filesystem path
    AbsPath,
}

/// Data-only predicate over the submitted config bag
///
/// Exactly one of `equals`, `values`, `truthy` is meaningful; the first
/// matching arm wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldPredicate {
    /// Name of the field the predicate inspects
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truthy: bool,
}

impl FieldPredicate {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            equals: Some(value.into()),
            values: None,
            truthy: false,
        }
    }

    pub fn one_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            equals: None,
            values: Some(values),
            truthy: false,
        }
    }

    pub fn truthy(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            equals: None,
            values: None,
            truthy: true,
        }
    }

    /// Evaluate against a config bag
    pub fn matches(&self, config: &Map<String, Value>) -> bool {
        let actual = config.get(&self.field).unwrap_or(&Value::Null);
        if let Some(expected) = &self.equals {
            return actual == expected;
        }
        if let Some(values) = &self.values {
            return values.iter().any(|v| v == actual);
        }
        if self.truthy {
            return match actual {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
                Value::String(s) => !s.is_empty() && s != "0" && s != "false",
                Value::Array(a) => !a.is_empty(),
                Value::Object(_) => true,
            };
        }
        false
    }
}

/// One field of a driver's config schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required_on_create: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_when: Option<FieldPredicate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<FieldRule>,
}

impl ConfigField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            required_on_create: false,
            required_when: None,
            enum_values: Vec::new(),
            default_value: None,
            rule: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn required_on_create(mut self) -> Self {
        self.required_on_create = true;
        self
    }

    pub fn required_when(mut self, predicate: FieldPredicate) -> Self {
        self.required_when = Some(predicate);
        self
    }

    pub fn enum_values(mut self, values: &[&str]) -> Self {
        self.enum_values = values.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Whether the field must be present on this mutation
    ///
    /// `required` applies when its `required_when` gate (if any) matches;
    /// `required_on_create` applies to creates unconditionally.
    pub fn is_required(&self, config: &Map<String, Value>, creating: bool) -> bool {
        if creating && self.required_on_create {
            return true;
        }
        if !self.required {
            return false;
        }
        match &self.required_when {
            Some(predicate) => predicate.matches(config),
            None => true,
        }
    }
}

/// Layout entry: a single field or a row of fields rendered side by side
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutField {
    Single(String),
    Row(Vec<String>),
}

/// One titled group of fields in the admin form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutGroup {
    pub title_key: String,
    pub fields: Vec<LayoutField>,
}

/// A driver type's full config schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub fields: Vec<ConfigField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layout: Vec<LayoutGroup>,
}

impl ConfigSchema {
    pub fn new(fields: Vec<ConfigField>, layout: Vec<LayoutGroup>) -> Self {
        Self { fields, layout }
    }

    pub fn field(&self, name: &str) -> Option<&ConfigField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of all secret fields
    pub fn secret_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::Secret)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Names of all boolean fields (coerced to 0/1 at the wire layer)
    pub fn boolean_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::Boolean)
            .map(|f| f.name.as_str())
            .collect()
    }
}
