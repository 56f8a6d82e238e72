//! Scenario-held data and the content repository boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::result::{StepError, StepResult};
use crate::table::GherkinTable;

/// Field values keyed by field identifier
pub type ContentFields = BTreeMap<String, Value>;

/// Data produced or submitted earlier in the scenario, by test identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentHolder {
    entries: BTreeMap<String, Value>,
}

impl ContentHolder {
    /// Empty holder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store data under `identifier`, replacing what was there
    pub fn insert(&mut self, identifier: impl Into<String>, data: impl Into<Value>) {
        self.entries.insert(identifier.into(), data.into());
    }

    /// Stored data
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&Value> {
        self.entries.get(identifier)
    }

    /// Whether `identifier` is held
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Nothing held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

/// One field of a content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field identifier
    pub identifier: String,
    /// Field type identifier (e.g. "ezstring")
    pub field_type: String,
}

impl FieldDefinition {
    /// Create a field definition
    #[must_use]
    pub fn new(identifier: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            field_type: field_type.into(),
        }
    }

    /// Definitions from `| field | type |` rows (header stripped)
    pub fn from_table(table: &GherkinTable) -> StepResult<Vec<Self>> {
        let definitions: Vec<Self> = table
            .data_rows()
            .iter()
            .map(|row| match row.as_slice() {
                [identifier, field_type, ..] if !identifier.is_empty() => {
                    Ok(Self::new(identifier.clone(), field_type.clone()))
                }
                _ => Err(StepError::configuration(format!(
                    "field definition row needs '| field | type |', got {row:?}"
                ))),
            })
            .collect::<StepResult<_>>()?;
        if definitions.is_empty() {
            return Err(StepError::configuration("content type needs at least one field"));
        }
        Ok(definitions)
    }
}

/// Content repository operations used by fixture steps.
///
/// Every method answers [`StepError::Pending`] unless the adapter
/// overrides it.
pub trait ContentRepository {
    /// Create and publish a content type
    fn create_content_type(&mut self, identifier: &str, fields: &[FieldDefinition]) -> StepResult<()> {
        let _ = (identifier, fields);
        Err(StepError::pending("Content managing: Content Type create"))
    }

    /// Field definitions of a content type
    fn load_content_type_by_identifier(&self, identifier: &str) -> StepResult<Vec<FieldDefinition>> {
        let _ = identifier;
        Err(StepError::pending("Content managing: Content Type load"))
    }

    /// Create a content draft, returning its id
    fn create_content(
        &mut self,
        identifier: &str,
        content_type: &str,
        fields: &ContentFields,
    ) -> StepResult<String> {
        let _ = (identifier, content_type, fields);
        Err(StepError::pending("Content managing: Content create"))
    }

    /// Publish the current version of a content object
    fn publish_version(&mut self, content_id: &str) -> StepResult<()> {
        let _ = content_id;
        Err(StepError::pending("Content managing: Content publish"))
    }

    /// Read a field of a content object
    fn read_field(&self, content_id: &str, field: &str) -> StepResult<Value> {
        let _ = (content_id, field);
        Err(StepError::pending("Content managing: field read"))
    }

    /// Write a field of a content object
    fn write_field(&mut self, content_id: &str, field: &str, value: Value) -> StepResult<()> {
        let _ = (content_id, field, value);
        Err(StepError::pending("Content managing: field write"))
    }

    /// Data the repository associates with a test identifier
    fn data_by_identifier(&self, identifier: &str) -> StepResult<Option<Value>> {
        let _ = identifier;
        Ok(None)
    }
}

/// Repository used when no adapter is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRepository;

impl ContentRepository for UnavailableRepository {}

/// Stored content object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredContent {
    /// Content type identifier
    pub content_type: String,
    /// Field values
    pub fields: ContentFields,
    /// Published (false for drafts)
    pub published: bool,
}

/// In-memory repository for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    /// Content types by identifier
    pub content_types: BTreeMap<String, Vec<FieldDefinition>>,
    /// Content objects by test identifier
    pub contents: BTreeMap<String, StoredContent>,
}

impl MemoryRepository {
    /// Empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn content_mut(&mut self, content_id: &str) -> StepResult<&mut StoredContent> {
        self.contents
            .get_mut(content_id)
            .ok_or_else(|| StepError::assertion(format!("Content object '{content_id}' not found")))
    }
}

impl ContentRepository for MemoryRepository {
    fn create_content_type(&mut self, identifier: &str, fields: &[FieldDefinition]) -> StepResult<()> {
        tracing::debug!(identifier, fields = fields.len(), "content type created");
        self.content_types
            .insert(identifier.to_string(), fields.to_vec());
        Ok(())
    }

    fn load_content_type_by_identifier(&self, identifier: &str) -> StepResult<Vec<FieldDefinition>> {
        self.content_types
            .get(identifier)
            .cloned()
            .ok_or_else(|| StepError::assertion(format!("Content Type '{identifier}' not found")))
    }

    fn create_content(
        &mut self,
        identifier: &str,
        content_type: &str,
        fields: &ContentFields,
    ) -> StepResult<String> {
        let definitions = self.load_content_type_by_identifier(content_type)?;
        if let Some(unknown) = fields
            .keys()
            .find(|name| !definitions.iter().any(|d| &d.identifier == *name))
        {
            return Err(StepError::assertion(format!(
                "Content Type '{content_type}' has no field '{unknown}'"
            )));
        }
        self.contents.insert(
            identifier.to_string(),
            StoredContent {
                content_type: content_type.to_string(),
                fields: fields.clone(),
                published: false,
            },
        );
        Ok(identifier.to_string())
    }

    fn publish_version(&mut self, content_id: &str) -> StepResult<()> {
        self.content_mut(content_id)?.published = true;
        Ok(())
    }

    fn read_field(&self, content_id: &str, field: &str) -> StepResult<Value> {
        self.contents
            .get(content_id)
            .and_then(|c| c.fields.get(field))
            .cloned()
            .ok_or_else(|| {
                StepError::assertion(format!("Content object '{content_id}' has no field '{field}'"))
            })
    }

    fn write_field(&mut self, content_id: &str, field: &str, value: Value) -> StepResult<()> {
        self.content_mut(content_id)?
            .fields
            .insert(field.to_string(), value);
        Ok(())
    }

    fn data_by_identifier(&self, identifier: &str) -> StepResult<Option<Value>> {
        Ok(self
            .contents
            .get(identifier)
            .map(|c| Value::Object(c.fields.clone().into_iter().collect())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    mod holder_tests {
        use super::*;

        #[test]
        fn test_insert_get_clear() {
            let mut holder = ContentHolder::new();
            holder.insert("X", 1);
            holder.insert("Y", json!({"title": "Hello"}));
            assert_eq!(holder.get("X"), Some(&json!(1)));
            assert!(holder.contains("Y"));
            assert_eq!(holder.len(), 2);

            holder.clear();
            assert!(holder.is_empty());
        }

        #[test]
        fn test_insert_replaces() {
            let mut holder = ContentHolder::new();
            holder.insert("X", "a");
            holder.insert("X", "b");
            assert_eq!(holder.get("X"), Some(&json!("b")));
            assert_eq!(holder.iter().count(), 1);
        }
    }

    mod field_definition_tests {
        use super::*;

        #[test]
        fn test_from_table() {
            let table = GherkinTable::from_slices(&[
                &["field", "type"],
                &["title", "ezstring"],
                &["body", "ezxmltext"],
            ]);
            let fields = FieldDefinition::from_table(&table).unwrap();
            assert_eq!(fields[0], FieldDefinition::new("title", "ezstring"));
            assert_eq!(fields.len(), 2);
        }

        #[test]
        fn test_from_table_rejects_short_row() {
            let table = GherkinTable::from_slices(&[&["field", "type"], &["title"]]);
            assert!(FieldDefinition::from_table(&table)
                .unwrap_err()
                .is_fatal_configuration());
        }

        #[test]
        fn test_from_table_rejects_empty() {
            let table = GherkinTable::from_slices(&[&["field", "type"]]);
            assert!(FieldDefinition::from_table(&table).is_err());
        }
    }

    mod repository_tests {
        use super::*;

        #[test]
        fn test_unavailable_is_pending() {
            let mut repo = UnavailableRepository;
            assert!(repo.create_content_type("article", &[]).unwrap_err().is_pending());
            assert!(repo.publish_version("1").unwrap_err().is_pending());
            assert!(repo.read_field("1", "title").unwrap_err().is_pending());
            assert_eq!(repo.data_by_identifier("A").unwrap(), None);
        }

        #[test]
        fn test_memory_round_trip() {
            let mut repo = MemoryRepository::new();
            repo.create_content_type("article", &[FieldDefinition::new("title", "ezstring")])
                .unwrap();
            let mut fields = ContentFields::new();
            fields.insert("title".to_string(), json!("Hello"));

            let id = repo.create_content("A", "article", &fields).unwrap();
            assert!(!repo.contents["A"].published);
            repo.publish_version(&id).unwrap();
            assert!(repo.contents["A"].published);

            repo.write_field(&id, "title", json!("Bye")).unwrap();
            assert_eq!(repo.read_field(&id, "title").unwrap(), json!("Bye"));
            assert_eq!(
                repo.data_by_identifier("A").unwrap(),
                Some(json!({"title": "Bye"}))
            );
        }

        #[test]
        fn test_memory_rejects_unknown_field() {
            let mut repo = MemoryRepository::new();
            repo.create_content_type("article", &[FieldDefinition::new("title", "ezstring")])
                .unwrap();
            let mut fields = ContentFields::new();
            fields.insert("body".to_string(), json!("x"));
            assert!(repo.create_content("A", "article", &fields).is_err());
            assert!(repo.create_content("B", "missing", &ContentFields::new()).is_err());
        }
    }
}
