//! Typed arguments owned by an advanced task definition.
//!
//! Arguments exist only as children of their definition and are removed
//! with it (cascade).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ArgumentId, DefinitionId};
use crate::query::{FieldValue, Record};

/// Primitive type tag for a declared argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentType {
    String,
    Number,
    Boolean,
}

impl fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedTaskDefinitionArgument {
    pub id: ArgumentId,
    pub advanced_task_definition: DefinitionId,
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: ArgumentType,
}

/// New argument for creation (without generated fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDefinitionArgument {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: ArgumentType,
}

impl NewDefinitionArgument {
    pub fn new(name: impl Into<String>, arg_type: ArgumentType) -> Self {
        Self {
            name: name.into(),
            arg_type,
        }
    }
}

impl Record for AdvancedTaskDefinitionArgument {
    fn field(&self, column: &str) -> FieldValue {
        match column {
            "id" => FieldValue::Int(self.id),
            "advanced_task_definition" => FieldValue::Int(self.advanced_task_definition),
            "name" => FieldValue::Text(self.name.clone()),
            "type" => FieldValue::Text(self.arg_type.to_string()),
            _ => FieldValue::Null,
        }
    }
}
