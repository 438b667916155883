//! Document ingestion (`SPEC_FULL.md` §4.10 / `spec.md` §6). Turns an
//! already-parsed YAML document into a validated, internally-typed
//! [`Document`] — the boundary between "external schema" and "internal
//! model" that the rest of this crate works exclusively on the far side of.
//!
//! Splitting a multi-document YAML stream into individual `RawDocument`
//! values is a CLI concern (`cmd/kuke`), not this crate's: per `spec.md` §1
//! the parser/splitter is an external collaborator. This module only
//! validates and converts one already-separated document at a time.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{KukeonError, Result};
use crate::model::{
    Cell, CellSpec, Container, ContainerEntitySpec, Kind, Metadata, Realm, RealmSpec, Space,
    SpaceSpec, Stack, StackSpec,
};

const SUPPORTED_API_VERSION: &str = "v1beta1";

/// A single YAML document before kind-specific validation: just enough
/// structure to read `apiVersion`/`kind` and defer `metadata`/`spec` parsing
/// until the kind is known.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default, rename = "apiVersion")]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub spec: Value,
}

/// The validated, typed form of one document. Exhaustive match on this
/// enum, not a kind string, drives every dispatch in C5/C6/C7 (`spec.md` §9
/// re-architecture note on dynamic dispatch).
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    Realm(Realm),
    Space(Space),
    Stack(Stack),
    Cell(Cell),
    Container(Container),
}

impl Document {
    pub fn kind(&self) -> Kind {
        match self {
            Document::Realm(_) => Kind::Realm,
            Document::Space(_) => Kind::Space,
            Document::Stack(_) => Kind::Stack,
            Document::Cell(_) => Kind::Cell,
            Document::Container(_) => Kind::Container,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Document::Realm(r) => &r.metadata.name,
            Document::Space(s) => &s.metadata.name,
            Document::Stack(s) => &s.metadata.name,
            Document::Cell(c) => &c.metadata.name,
            Document::Container(c) => &c.metadata.name,
        }
    }
}

fn field_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn require_name(metadata: &Value, kind: Kind) -> Result<()> {
    if field_str(metadata, "name").is_some() {
        Ok(())
    } else {
        Err(KukeonError::NameRequired { kind })
    }
}

/// `spec.md` §6's `Space`/`Stack`/`Cell`/`Container` rows each require one or
/// more ancestor-name fields to be non-empty; this checks one such field,
/// reporting it through `ConversionFailed` since it is a boundary-conversion
/// concern rather than a lookup or lifecycle error.
fn require_spec_field(spec: &Value, key: &str, kind: Kind) -> Result<()> {
    if field_str(spec, key).is_some() {
        Ok(())
    } else {
        Err(KukeonError::ConversionFailed(format!(
            "{kind}.spec.{key} is required"
        )))
    }
}

fn require_containers_non_empty(spec: &Value) -> Result<()> {
    match spec.get("containers").and_then(Value::as_sequence) {
        Some(seq) if !seq.is_empty() => Ok(()),
        _ => Err(KukeonError::ConversionFailed(
            "Cell.spec.containers must be non-empty".to_string(),
        )),
    }
}

fn convert<T: for<'de> Deserialize<'de>>(value: Value, what: &str) -> Result<T> {
    serde_yaml::from_value(value)
        .map_err(|e| KukeonError::ConversionFailed(format!("{what}: {e}")))
}

impl TryFrom<RawDocument> for Document {
    type Error = KukeonError;

    fn try_from(raw: RawDocument) -> Result<Document> {
        if !raw.api_version.is_empty() && raw.api_version != SUPPORTED_API_VERSION {
            return Err(KukeonError::UnsupportedApiVersion(raw.api_version));
        }
        if raw.spec.is_null() {
            return Err(KukeonError::SpaceDocRequired);
        }

        let kind = match raw.kind.as_str() {
            "Realm" => Kind::Realm,
            "Space" => Kind::Space,
            "Stack" => Kind::Stack,
            "Cell" => Kind::Cell,
            "Container" => Kind::Container,
            other => return Err(KukeonError::UnknownKind(other.to_string())),
        };

        require_name(&raw.metadata, kind)?;
        match kind {
            Kind::Realm => {}
            Kind::Space => require_spec_field(&raw.spec, "realmName", kind)?,
            Kind::Stack => {
                require_spec_field(&raw.spec, "realmName", kind)?;
                require_spec_field(&raw.spec, "spaceName", kind)?;
            }
            Kind::Cell => {
                require_spec_field(&raw.spec, "realmName", kind)?;
                require_spec_field(&raw.spec, "spaceName", kind)?;
                require_spec_field(&raw.spec, "stackName", kind)?;
                require_containers_non_empty(&raw.spec)?;
            }
            Kind::Container => {
                require_spec_field(&raw.spec, "realmName", kind)?;
                require_spec_field(&raw.spec, "spaceName", kind)?;
                require_spec_field(&raw.spec, "stackName", kind)?;
                require_spec_field(&raw.spec, "cellName", kind)?;
            }
        }

        let metadata: Metadata = convert(raw.metadata, "metadata")?;
        Ok(match kind {
            Kind::Realm => Document::Realm(Realm {
                metadata,
                spec: convert::<RealmSpec>(raw.spec, "Realm.spec")?,
                status: Default::default(),
            }),
            Kind::Space => Document::Space(Space {
                metadata,
                spec: convert::<SpaceSpec>(raw.spec, "Space.spec")?,
                status: Default::default(),
            }),
            Kind::Stack => Document::Stack(Stack {
                metadata,
                spec: convert::<StackSpec>(raw.spec, "Stack.spec")?,
                status: Default::default(),
            }),
            Kind::Cell => Document::Cell(Cell {
                metadata,
                spec: convert::<CellSpec>(raw.spec, "Cell.spec")?,
                status: Default::default(),
            }),
            Kind::Container => Document::Container(Container {
                metadata,
                spec: convert::<ContainerEntitySpec>(raw.spec, "Container.spec")?,
                status: Default::default(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: &str, metadata: &str, spec: &str) -> RawDocument {
        RawDocument {
            api_version: "v1beta1".to_string(),
            kind: kind.to_string(),
            metadata: serde_yaml::from_str(metadata).unwrap(),
            spec: serde_yaml::from_str(spec).unwrap(),
        }
    }

    #[test]
    fn realm_converts() {
        let d = raw("Realm", "name: prod", "namespace: prod-ns");
        let doc = Document::try_from(d).unwrap();
        assert_eq!(doc.kind(), Kind::Realm);
        assert_eq!(doc.name(), "prod");
    }

    #[test]
    fn empty_api_version_defaults() {
        let mut d = raw("Realm", "name: prod", "{}");
        d.api_version = String::new();
        assert!(Document::try_from(d).is_ok());
    }

    #[test]
    fn unsupported_api_version_rejected() {
        let mut d = raw("Realm", "name: prod", "{}");
        d.api_version = "v2".to_string();
        let err = Document::try_from(d).unwrap_err();
        assert!(matches!(err, KukeonError::UnsupportedApiVersion(_)));
    }

    #[test]
    fn unknown_kind_rejected() {
        let d = raw("Blob", "name: x", "{}");
        let err = Document::try_from(d).unwrap_err();
        assert!(matches!(err, KukeonError::UnknownKind(_)));
    }

    #[test]
    fn missing_name_rejected() {
        let d = raw("Realm", "{}", "{}");
        let err = Document::try_from(d).unwrap_err();
        assert!(matches!(err, KukeonError::NameRequired { kind: Kind::Realm }));
    }

    #[test]
    fn space_requires_realm_name() {
        let d = raw("Space", "name: web", "{}");
        let err = Document::try_from(d).unwrap_err();
        assert!(matches!(err, KukeonError::ConversionFailed(_)));
    }

    #[test]
    fn cell_requires_non_empty_containers() {
        let d = raw(
            "Cell",
            "name: worker",
            "realmName: prod\nspaceName: web\nstackName: api\ncontainers: []",
        );
        let err = Document::try_from(d).unwrap_err();
        assert!(matches!(err, KukeonError::ConversionFailed(_)));
    }

    #[test]
    fn cell_with_containers_converts() {
        let d = raw(
            "Cell",
            "name: worker",
            "realmName: prod\nspaceName: web\nstackName: api\ncontainers:\n  - root: true\n    image: pause:3.9",
        );
        let doc = Document::try_from(d).unwrap();
        if let Document::Cell(cell) = doc {
            assert_eq!(cell.spec.containers.len(), 1);
        } else {
            panic!("expected Cell");
        }
    }
}
