//! Response schemas handed to Gemini as `responseSchema`, and the structural
//! check applied to what comes back.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::gemini::Artifact;

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String,
    Integer,
    Array(Box<Schema>),
    Object {
        properties: Vec<(&'static str, Schema)>,
        required: Vec<&'static str>,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaMismatch {
    #[error("missing required field `{0}`")]
    Missing(String),
    #[error("field `{path}` should be {expected}")]
    WrongType { path: String, expected: &'static str },
}

fn object(properties: Vec<(&'static str, Schema)>, required: &[&'static str]) -> Schema {
    Schema::Object { properties, required: required.to_vec() }
}

fn string_list() -> Schema {
    Schema::Array(Box::new(Schema::String))
}

impl Schema {
    pub fn lesson_plan() -> Schema {
        let lesson_info = object(
            vec![
                ("subject", Schema::String),
                ("gradeLevel", Schema::String),
                ("lessonTitle", Schema::String),
                ("duration", Schema::Integer),
                ("teacherName", Schema::String),
                ("institution", Schema::String),
            ],
            &["subject", "gradeLevel", "lessonTitle", "duration"],
        );
        let stage = object(
            vec![
                ("title", Schema::String),
                ("teacherActions", string_list()),
                ("studentActions", string_list()),
                ("duration", Schema::Integer),
            ],
            &["title", "teacherActions", "studentActions", "duration"],
        );
        object(
            vec![
                ("lessonInfo", lesson_info),
                ("objectives", string_list()),
                ("prerequisites", string_list()),
                ("materials", string_list()),
                ("stages", Schema::Array(Box::new(stage))),
            ],
            &["lessonInfo", "objectives", "prerequisites", "materials", "stages"],
        )
    }

    pub fn presentation() -> Schema {
        let slide = object(
            vec![
                ("title", Schema::String),
                ("content", string_list()),
                ("speakerNotes", Schema::String),
            ],
            &["title", "content", "speakerNotes"],
        );
        object(vec![("slides", Schema::Array(Box::new(slide)))], &["slides"])
    }

    pub fn handout() -> Schema {
        object(vec![("htmlContent", Schema::String)], &["htmlContent"])
    }

    pub fn for_artifact(artifact: Artifact) -> Schema {
        match artifact {
            Artifact::Plan => Self::lesson_plan(),
            Artifact::Presentation => Self::presentation(),
            Artifact::Handout => Self::handout(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Schema::String => "STRING",
            Schema::Integer => "INTEGER",
            Schema::Array(_) => "ARRAY",
            Schema::Object { .. } => "OBJECT",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Schema::String => "a string",
            Schema::Integer => "an integer",
            Schema::Array(_) => "an array",
            Schema::Object { .. } => "an object",
        }
    }

    /// Checks a decoded response against this schema. Optional properties are
    /// only checked when present and not null.
    pub fn check(&self, value: &Value) -> Result<(), SchemaMismatch> {
        self.check_at(value, "")
    }

    fn check_at(&self, value: &Value, path: &str) -> Result<(), SchemaMismatch> {
        let wrong = || SchemaMismatch::WrongType {
            path: if path.is_empty() { "$".to_string() } else { path.to_string() },
            expected: self.describe(),
        };
        match self {
            Schema::String => value.is_string().then_some(()).ok_or_else(wrong),
            Schema::Integer => {
                (value.is_i64() || value.is_u64()).then_some(()).ok_or_else(wrong)
            }
            Schema::Array(items) => {
                let arr = value.as_array().ok_or_else(wrong)?;
                for (i, item) in arr.iter().enumerate() {
                    items.check_at(item, &format!("{path}[{i}]"))?;
                }
                Ok(())
            }
            Schema::Object { properties, required } => {
                let map = value.as_object().ok_or_else(wrong)?;
                for (name, schema) in properties {
                    let child = if path.is_empty() { name.to_string() } else { format!("{path}.{name}") };
                    match map.get(*name) {
                        None | Some(Value::Null) if required.contains(name) => {
                            return Err(SchemaMismatch::Missing(child));
                        }
                        None | Some(Value::Null) => {}
                        Some(v) => schema.check_at(v, &child)?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.type_name())?;
        match self {
            Schema::Array(items) => map.serialize_entry("items", items.as_ref())?,
            Schema::Object { properties, required } => {
                map.serialize_entry("properties", &Properties(properties))?;
                map.serialize_entry("required", required)?;
            }
            Schema::String | Schema::Integer => {}
        }
        map.end()
    }
}

// Keeps declaration order, which Gemini uses as the output order.
struct Properties<'a>(&'a [(&'static str, Schema)]);

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, schema) in self.0 {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}
