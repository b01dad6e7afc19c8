//! Document domain model
//!
//! Documents are free-form notes that live next to a project's tasks (design
//! notes, specs, meeting minutes). They take no part in the dependency graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{DocumentId, ProjectKey};

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("Document title is required")]
    EmptyTitle,
}

/// A document with its markdown body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub project: ProjectKey,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
}

impl Document {
    pub fn new(id: DocumentId, project: ProjectKey, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            project,
            created_by: String::new(),
            created_at: now,
            updated_at: now,
            body: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.title.trim().is_empty() {
            return Err(DocumentError::EmptyTitle);
        }
        Ok(())
    }
}

/// The YAML frontmatter of a document file; the body follows it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFrontmatter {
    pub id: DocumentId,
    pub title: String,
    pub project: ProjectKey,
    #[serde(default)]
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Document> for DocumentFrontmatter {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            project: doc.project.clone(),
            created_by: doc.created_by.clone(),
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

impl DocumentFrontmatter {
    /// Converts to a Document with the given body
    pub fn into_document(self, body: String) -> Document {
        Document {
            id: self.id,
            title: self.title,
            project: self.project,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            body,
        }
    }
}
