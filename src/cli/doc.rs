//! Document CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{Document, DocumentId};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum DocCommands {
    /// Create a document
    ///
    /// Examples:
    ///   compass doc create "Auth design"
    ///   compass doc create "Meeting notes" --body "Agreed on sessions."
    Create {
        /// Document title
        title: String,

        /// Markdown body
        #[arg(long)]
        body: Option<String>,
    },

    /// List documents
    List,

    /// Show document details
    Show {
        /// Document ID
        id: DocumentId,
    },
}

pub fn run(cmd: DocCommands, output: &Output) -> Result<()> {
    match cmd {
        DocCommands::Create { title, body } => create_document(output, &title, body),
        DocCommands::List => list_documents(output),
        DocCommands::Show { id } => show_document(output, &id),
    }
}

fn document_json(doc: &Document) -> serde_json::Value {
    serde_json::json!({
        "id": doc.id,
        "title": doc.title,
        "project": doc.project,
        "created_by": doc.created_by,
        "created_at": doc.created_at,
        "updated_at": doc.updated_at,
    })
}

fn create_document(output: &Output, title: &str, body: Option<String>) -> Result<()> {
    let project = Project::open_current()?;
    output.verbose_ctx(
        "doc",
        &format!("Writing document to {}", project.document_store().dir().display()),
    );

    let doc = project.create_document(title, body)?;

    if output.is_json() {
        output.data(&document_json(&doc));
    } else {
        output.success(&format!("Created document: {} - {}", doc.id, doc.title));
    }

    Ok(())
}

fn list_documents(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let docs = project.documents()?;

    output.verbose_ctx("doc", &format!("Listing {} documents", docs.len()));

    if output.is_json() {
        let items: Vec<_> = docs.iter().map(document_json).collect();
        output.data(&items);
    } else if docs.is_empty() {
        println!("No documents");
    } else {
        println!("{:<14} {:<16} TITLE", "ID", "UPDATED");
        println!("{}", "-".repeat(60));

        for doc in &docs {
            println!(
                "{:<14} {:<16} {}",
                doc.id,
                doc.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                doc.title
            );
        }
    }

    Ok(())
}

fn show_document(output: &Output, id: &DocumentId) -> Result<()> {
    let project = Project::open_current()?;
    let doc = project.document(id)?;

    if output.is_json() {
        let mut value = document_json(&doc);
        value["body"] = serde_json::json!(doc.body);
        output.data(&value);
    } else {
        println!("Document: {}", doc.id);
        println!("Title: {}", doc.title);
        println!("Project: {}", doc.project);
        println!("Created: {} by {}", doc.created_at.format("%Y-%m-%d %H:%M"), doc.created_by);
        println!("Updated: {}", doc.updated_at.format("%Y-%m-%d %H:%M"));

        if !doc.body.is_empty() {
            println!("\n{}", doc.body);
        }
    }

    Ok(())
}
