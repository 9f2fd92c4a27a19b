//! Contract documents: the JSON declaration of entities and relationships a
//! generated codebase must structurally satisfy.

use crate::core::error::SpecgateError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Function,
    Database,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_kind")]
    pub kind: Option<EntityKind>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub key_fields: Vec<String>,
    #[serde(default)]
    pub function: Option<String>,
}

/// Unknown `"type"` values fall back to inference instead of rejecting the
/// whole contract.
fn lenient_kind<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<EntityKind>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.and_then(|r| match r.as_str() {
        "file" => Some(EntityKind::File),
        "function" => Some(EntityKind::Function),
        "database" | "table" => Some(EntityKind::Database),
        _ => None,
    }))
}

impl Entity {
    /// The string kind inference looks at: `path`, else `table`.
    pub fn locator(&self) -> &str {
        self.path
            .as_deref()
            .or(self.table.as_deref())
            .unwrap_or("")
    }

    /// Explicit `type` when present, otherwise inferred from the locator.
    pub fn effective_kind(&self) -> EntityKind {
        self.kind
            .unwrap_or_else(|| infer_entity_kind(self.locator()))
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.locator().to_string(),
        }
    }
}

/// Fallback for contracts without `"type"`. A locator with a `/` or a `.` is
/// a file, or a function if it also has a `:`. Everything else is a
/// database declaration. `user.py` is therefore a file and `a:b` a database
/// entry; both are intended.
pub fn infer_entity_kind(locator: &str) -> EntityKind {
    if locator.contains('/') || locator.contains('.') {
        if locator.contains(':') {
            EntityKind::Function
        } else {
            EntityKind::File
        }
    } else {
        EntityKind::Database
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipKind {
    ManyToMany,
    OneToMany,
    ManyToOne,
    OneToOne,
    ForeignKey,
    Other(String),
}

impl RelationshipKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ManyToMany => "many_to_many",
            Self::OneToMany => "one_to_many",
            Self::ManyToOne => "many_to_one",
            Self::OneToOne => "one_to_one",
            Self::ForeignKey => "foreign_key",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for RelationshipKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "many_to_many" => Self::ManyToMany,
            "one_to_many" => Self::OneToMany,
            "many_to_one" => Self::ManyToOne,
            "one_to_one" => Self::OneToOne,
            "foreign_key" => Self::ForeignKey,
            _ => Self::Other(raw),
        }
    }
}

impl Serialize for RelationshipKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RelationshipKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    #[serde(rename = "from")]
    pub from_table: String,
    #[serde(rename = "to")]
    pub to_table: String,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    #[serde(default)]
    pub via: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contract {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl Contract {
    pub fn from_json_str(raw: &str) -> Result<Self, SpecgateError> {
        serde_json::from_str(raw)
            .map_err(|e| SpecgateError::InputReadError(format!("invalid contract JSON: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, SpecgateError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SpecgateError::InputReadError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_inference_boundaries() {
        assert_eq!(infer_entity_kind("app/models/user.py"), EntityKind::File);
        assert_eq!(infer_entity_kind("user.py"), EntityKind::File);
        assert_eq!(infer_entity_kind("users"), EntityKind::Database);
        assert_eq!(
            infer_entity_kind("app/services/auth.py:login"),
            EntityKind::Function
        );
        assert_eq!(infer_entity_kind("auth.login:x"), EntityKind::Function);
        // A colon alone does not make a function.
        assert_eq!(infer_entity_kind("auth:login"), EntityKind::Database);
        assert_eq!(infer_entity_kind(""), EntityKind::Database);
    }

    #[test]
    fn explicit_type_beats_inference() {
        let e: Entity =
            serde_json::from_str(r#"{"type":"database","path":"app/models/user.py"}"#).unwrap();
        assert_eq!(e.effective_kind(), EntityKind::Database);
    }

    #[test]
    fn unknown_type_falls_back_to_inference() {
        let e: Entity =
            serde_json::from_str(r#"{"type":"endpoint","path":"app/api/x.py"}"#).unwrap();
        assert_eq!(e.kind, None);
        assert_eq!(e.effective_kind(), EntityKind::File);
    }

    #[test]
    fn parses_contract_without_type_fields() {
        let c = Contract::from_json_str(
            r#"{"entities":[{"table":"users","key_fields":["id","email"]}],
                "relationships":[{"from":"projects","to":"users","type":"foreign_key","via":"owner_id"},
                                 {"from":"users","to":"roles","type":"belongs_to"}]}"#,
        )
        .unwrap();
        assert_eq!(c.entities[0].effective_kind(), EntityKind::Database);
        assert_eq!(c.entities[0].key_fields, vec!["id", "email"]);
        assert_eq!(c.relationships[0].kind, RelationshipKind::ForeignKey);
        assert_eq!(
            c.relationships[1].kind,
            RelationshipKind::Other("belongs_to".to_string())
        );
        assert_eq!(c.relationships[1].via, None);
    }

    #[test]
    fn malformed_contract_is_input_error() {
        let err = Contract::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, SpecgateError::InputReadError(_)));
    }
}
