//! Map-sign recognition.
//!
//! A map sign is a sign block entity whose first text line equals the marker
//! (`#map` by default). Its coordinates and remaining lines become one output
//! record.

use fastnbt::Value;

use crate::error::{DecodeError, FormatError};
use crate::format::{Field, FieldSource, FieldValue};
use crate::nbt::{self, Compound};

pub const DEFAULT_MARKER: &str = "#map";

const SIGN_IDS: [&str; 2] = ["Sign", "minecraft:sign"];

#[derive(Debug, Clone)]
pub struct SignFilter {
    marker: String,
}

impl SignFilter {
    pub fn new(marker: impl Into<String>) -> Self {
        SignFilter {
            marker: marker.into(),
        }
    }

    pub fn is_match(&self, value: &Value) -> bool {
        let Value::Compound(map) = value else {
            return false;
        };
        let is_sign = matches!(map.get("id"), Some(Value::String(id)) if SIGN_IDS.contains(&id.as_str()));
        is_sign && matches!(map.get("Text1"), Some(Value::String(line)) if *line == self.marker)
    }

    /// Map signs of a decoded chunk, in block-entity list order.
    pub fn matches<'a>(&self, chunk: &'a Value) -> Result<Vec<&'a Compound>, DecodeError> {
        let mut found = Vec::new();
        for entity in nbt::block_entities(chunk)? {
            nbt::walk(entity, &mut |value| {
                if let Value::Compound(map) = value {
                    if self.is_match(value) {
                        found.push(map);
                    }
                }
            });
        }
        Ok(found)
    }
}

/// Field access over one matched sign compound.
#[derive(Debug, Clone, Copy)]
pub struct SignRecord<'a> {
    fields: &'a Compound,
}

impl<'a> SignRecord<'a> {
    pub fn new(fields: &'a Compound) -> Self {
        SignRecord { fields }
    }

    fn int(&self, name: &'static str) -> Result<i32, FormatError> {
        match self.fields.get(name) {
            Some(Value::Int(n)) => Ok(*n),
            Some(_) => Err(FormatError::FieldType { name, expected: "an int" }),
            None => Err(FormatError::MissingField(name)),
        }
    }

    fn text(&self, name: &'static str) -> Result<&'a str, FormatError> {
        match self.fields.get(name) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(_) => Err(FormatError::FieldType { name, expected: "a string" }),
            None => Err(FormatError::MissingField(name)),
        }
    }
}

impl FieldSource for SignRecord<'_> {
    fn lookup(&self, field: Field) -> Result<FieldValue<'_>, FormatError> {
        Ok(match field {
            Field::X => FieldValue::Int(self.int("x")?),
            Field::Y => FieldValue::Int(self.int("y")?),
            Field::Z => FieldValue::Int(self.int("z")?),
            Field::Line(1) => FieldValue::Text(self.text("Text1")?),
            Field::Line(2) => FieldValue::Text(self.text("Text2")?),
            Field::Line(3) => FieldValue::Text(self.text("Text3")?),
            Field::Line(_) => FieldValue::Text(self.text("Text4")?),
        })
    }
}
