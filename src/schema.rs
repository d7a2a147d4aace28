//! Object types whose attribute tables can be uploaded as query lists.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::InvalidInputError;

/// Ordered attribute names describing one object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSchema {
    pub name: String,
    pub fields: Vec<String>,
}

/// Registry of object schemas keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchemaRegistry {
    schemas: BTreeMap<String, ObjectSchema>,
}

impl ObjectSchemaRegistry {
    /// The four object types available out of the box.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register("Professor", ["First Name", "Last Name", "Institution"]);
        registry.register("Movie", ["Name", "Year"]);
        registry.register("Electronic", ["Name", "Model No./Year"]);
        registry.register("Car", ["Make", "Model", "Year"]);
        registry
    }

    /// Add or replace an object type.
    pub fn register<I, S>(&mut self, name: &str, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = ObjectSchema {
            name: name.to_string(),
            fields: fields.into_iter().map(Into::into).collect(),
        };
        self.schemas.insert(name.to_string(), schema);
    }

    pub fn get(&self, name: &str) -> Result<&ObjectSchema, InvalidInputError> {
        self.schemas
            .get(name)
            .ok_or_else(|| InvalidInputError::UnknownObjectType(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Turn an uploaded attribute table into one query per row.
    ///
    /// The header must start with the schema's fields in order. Empty cells
    /// are dropped, and a row needs at least as many remaining cells as the
    /// schema has fields. Line numbers in errors are 1-based file lines.
    pub fn parse_query_table(
        &self,
        object: &str,
        text: &str,
    ) -> Result<Vec<String>, InvalidInputError> {
        let schema = self.get(object)?;
        let mut lines = text.lines().map(str::trim_end);
        let header: Vec<&str> = lines.next().unwrap_or_default().split(',').collect();
        let matches = schema.fields.len() <= header.len()
            && schema
                .fields
                .iter()
                .zip(&header)
                .all(|(expected, found)| expected == found);
        if !matches {
            return Err(InvalidInputError::HeaderMismatch {
                object: schema.name.clone(),
                expected: schema.fields.clone(),
            });
        }

        let mut queries = Vec::new();
        for (offset, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').filter(|field| !field.is_empty()).collect();
            if fields.len() < schema.fields.len() {
                return Err(InvalidInputError::MissingFields {
                    line: offset + 2,
                    required: schema.fields.len(),
                });
            }
            queries.push(fields.join(" ").trim().to_string());
        }
        if queries.is_empty() {
            return Err(InvalidInputError::NoQueries);
        }
        info!("Parsed {} {} queries from upload", queries.len(), schema.name);
        Ok(queries)
    }
}
