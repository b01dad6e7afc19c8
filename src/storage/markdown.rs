//! Markdown storage for documents
//!
//! Documents are stored as markdown files in `.compass/documents/`, one file
//! per document named after its ID. Each file has YAML frontmatter for
//! metadata followed by the markdown body.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::{Document, DocumentFrontmatter, DocumentId};

/// Store for documents as markdown files
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Creates a new document store at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".compass").join("documents"))
    }

    /// Returns the directory containing document files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn doc_path(&self, id: &DocumentId) -> PathBuf {
        self.dir.join(format!("{}.md", id))
    }

    fn read_from_file(&self, path: &Path) -> Result<Document> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read document file: {}", path.display()))?;

        parse_markdown(&content)
            .with_context(|| format!("Invalid document file: {}", path.display()))
    }

    /// Reads all documents, sorted by ID
    pub fn read_all(&self) -> Result<Vec<Document>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut docs = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read directory: {}", self.dir.display()))?
        {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.extension().is_some_and(|e| e == "md") {
                docs.push(self.read_from_file(&path)?);
            }
        }

        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    /// Reads a single document by ID
    pub fn read(&self, id: &DocumentId) -> Result<Option<Document>> {
        let path = self.doc_path(id);
        if !path.exists() {
            return Ok(None);
        }

        Ok(Some(self.read_from_file(&path)?))
    }

    /// Writes a document atomically (temp file + rename)
    pub fn write(&self, doc: &Document) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;

        let path = self.doc_path(&doc.id);
        let temp_path = path.with_extension("md.tmp");
        let content = render_markdown(doc)?;

        fs::write(&temp_path, &content)
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

        fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    /// Checks if a document exists
    pub fn exists(&self, id: &DocumentId) -> bool {
        self.doc_path(id).exists()
    }
}

/// Parses a markdown string with YAML frontmatter into a Document
fn parse_markdown(content: &str) -> Result<Document> {
    let content = content.trim_start();

    let rest = content
        .strip_prefix("---")
        .ok_or_else(|| anyhow::anyhow!("Missing frontmatter (must start with ---)"))?;

    // The closing delimiter sits on its own line
    let end_pos = rest
        .find("\n---")
        .ok_or_else(|| anyhow::anyhow!("Missing frontmatter end delimiter (---)"))?;

    let yaml_content = rest[..end_pos].trim();
    let body = rest[end_pos + 4..].trim();

    let fm: DocumentFrontmatter =
        serde_yaml::from_str(yaml_content).context("Failed to parse frontmatter")?;

    Ok(fm.into_document(body.to_string()))
}

fn render_markdown(doc: &Document) -> Result<String> {
    let frontmatter = DocumentFrontmatter::from(doc);
    let yaml = serde_yaml::to_string(&frontmatter).context("Failed to serialize frontmatter")?;

    let mut content = String::new();
    content.push_str("---\n");
    content.push_str(&yaml);
    content.push_str("---\n\n");
    content.push_str(&doc.body);

    if !content.ends_with('\n') {
        content.push('\n');
    }

    Ok(content)
}
