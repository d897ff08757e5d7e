//! The packaged schema document.
//!
//! `schema.graphql` describes the public API surface. The resolvers are code-first, so at
//! startup the document is parsed and checked against the SDL the resolvers actually serve;
//! a declared member with no resolver behind it stops the server from starting.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_graphql::parser::parse_schema;
use async_graphql::parser::types::{ServiceDocument, TypeKind, TypeSystemDefinition};
use thiserror::Error;

/// `schema.graphql` as shipped with the crate, built into the binary
const PACKAGED_SCHEMA: &str = include_str!("../../schema.graphql");

/// Label used in place of a file path for [PACKAGED_SCHEMA]
const PACKAGED_SCHEMA_LABEL: &str = "<packaged schema.graphql>";

#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("failed to read schema document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse schema document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: async_graphql::parser::Error,
    },
    #[error("schema document declares members without resolvers: {}", .0.join(", "))]
    Unserved(Vec<String>),
}

/// A parsed schema document, reduced to the names of its members
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    path: PathBuf,
    members: BTreeSet<String>,
}

impl SchemaDocument {
    /// Read and parse the document at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref().to_path_buf();
        let source = std::fs::read_to_string(&path).map_err(|source| SchemaLoadError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(path, &source)
    }

    /// The document built into the binary
    pub fn packaged() -> Result<Self, SchemaLoadError> {
        Self::parse(PathBuf::from(PACKAGED_SCHEMA_LABEL), PACKAGED_SCHEMA)
    }

    fn parse(path: PathBuf, source: &str) -> Result<Self, SchemaLoadError> {
        let document = parse_schema(source).map_err(|source| SchemaLoadError::Parse {
            path: path.clone(),
            source,
        })?;

        let members = members(&document);
        tracing::debug!(path = %path.display(), members = members.len(), "Loaded schema document");

        Ok(Self { path, members })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check that every type, field, argument, input field and enum value declared in the
    /// document also appears in `served_sdl`. Field types are not compared.
    pub fn verify_served_by(&self, served_sdl: &str) -> Result<(), SchemaLoadError> {
        let served = parse_schema(served_sdl).map_err(|source| SchemaLoadError::Parse {
            path: PathBuf::from("<served schema>"),
            source,
        })?;
        let served = members(&served);

        let unserved: Vec<String> = self.members.difference(&served).cloned().collect();
        if unserved.is_empty() {
            Ok(())
        } else {
            Err(SchemaLoadError::Unserved(unserved))
        }
    }
}

/// Names such as `Query`, `Query.feed`, `Query.feed(filter)` and `Sort.asc`
fn members(document: &ServiceDocument) -> BTreeSet<String> {
    let mut members = BTreeSet::new();

    for definition in &document.definitions {
        let TypeSystemDefinition::Type(ty) = definition else {
            continue;
        };
        let ty = &ty.node;
        let type_name = ty.name.node.as_str();
        members.insert(type_name.to_string());

        match &ty.kind {
            TypeKind::Object(object) => {
                for field in &object.fields {
                    let field_name = format!("{}.{}", type_name, field.node.name.node);
                    for argument in &field.node.arguments {
                        members.insert(format!("{}({})", field_name, argument.node.name.node));
                    }
                    members.insert(field_name);
                }
            }
            TypeKind::InputObject(input) => {
                for field in &input.fields {
                    members.insert(format!("{}.{}", type_name, field.node.name.node));
                }
            }
            TypeKind::Enum(enum_type) => {
                for value in &enum_type.values {
                    members.insert(format!("{}.{}", type_name, value.node.value.node));
                }
            }
            _ => {}
        }
    }

    members
}
