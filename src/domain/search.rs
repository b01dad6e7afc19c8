//! Case-insensitive text search over tasks and documents
//!
//! A record matches when its title or body contains the query. Title matches
//! carry no snippet; body-only matches carry the surrounding text.

use serde::Serialize;

use super::document::Document;
use super::task::Task;

/// Characters of context kept on each side of a body match
const SNIPPET_CONTEXT: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchHitKind {
    Document,
    Epic,
    Task,
}

impl SearchHitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchHitKind::Document => "document",
            SearchHitKind::Epic => "epic",
            SearchHitKind::Task => "task",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    #[serde(rename = "type")]
    pub kind: SearchHitKind,
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Searches documents first, then tasks, each in input order
///
/// A blank query matches nothing.
pub fn search_records(query: &str, tasks: &[Task], documents: &[Document]) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let docs = documents.iter().filter_map(|d| {
        hit(&needle, &d.title, Some(d.body.as_str())).map(|snippet| SearchHit {
            kind: SearchHitKind::Document,
            id: d.id.to_string(),
            title: d.title.clone(),
            snippet,
        })
    });

    let tasks = tasks.iter().filter_map(|t| {
        hit(&needle, &t.title, t.body.as_deref()).map(|snippet| SearchHit {
            kind: if t.is_epic() {
                SearchHitKind::Epic
            } else {
                SearchHitKind::Task
            },
            id: t.id.to_string(),
            title: t.title.clone(),
            snippet,
        })
    });

    docs.chain(tasks).collect()
}

/// `Some(None)` for a title match, `Some(Some(snippet))` for a body match
fn hit(needle: &str, title: &str, body: Option<&str>) -> Option<Option<String>> {
    if find_ignore_case(title, needle).is_some() {
        return Some(None);
    }
    let body = body?;
    find_ignore_case(body, needle).map(|idx| Some(snippet(body, idx, needle)))
}

/// Byte offset of the first case-insensitive occurrence of a lowercase needle
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.char_indices().map(|(i, _)| i).find(|&i| {
        let mut rest = haystack[i..].chars().flat_map(char::to_lowercase);
        needle.chars().all(|c| rest.next() == Some(c))
    })
}

/// Cuts the text around a match, on char boundaries, on one line
fn snippet(text: &str, idx: usize, needle: &str) -> String {
    let start = text[..idx]
        .char_indices()
        .rev()
        .nth(SNIPPET_CONTEXT - 1)
        .map_or(0, |(i, _)| i);
    let end = text[idx..]
        .char_indices()
        .nth(needle.chars().count() + SNIPPET_CONTEXT)
        .map_or(text.len(), |(i, _)| idx + i);

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&text[start..end]);
    if end < text.len() {
        out.push_str("...");
    }
    out.replace('\n', " ")
}
