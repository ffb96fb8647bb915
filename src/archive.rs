//! Read-only markdown archive of historical tickets.
//!
//! Archived tickets live as one `.md` file each in a directory. Listing
//! renders each body to HTML and best-effort extracts a few structured
//! fields from fixed label prefixes in the text. Missing fields stay null.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use pulldown_cmark::{html, Parser};
use serde::Serialize;

use crate::errors::TicketError;

#[derive(Debug, Serialize)]
pub struct ArchivedTicket {
    /// Filename without the `.md` extension.
    pub id: String,
    /// Body rendered to HTML.
    pub content: String,
    pub last_modified: DateTime<Utc>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub created: Option<String>,
    pub status: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ArchiveStore {
    dir: PathBuf,
}

impl ArchiveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// All archived tickets, most recently modified first. A missing
    /// directory is an empty archive, not an error; an unreadable one is.
    pub fn list(&self) -> Result<Vec<ArchivedTicket>, TicketError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read archive directory {}", self.dir.display()))
            .map_err(TicketError::Storage)?;

        let mut tickets = Vec::new();
        for entry in entries {
            let entry = entry
                .context("Failed to read archive directory entry")
                .map_err(TicketError::Storage)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            tickets.push(read_archived(&path)?);
        }
        tickets.sort_by(|a, b| b.last_modified.cmp(&a.last_modified).then(a.id.cmp(&b.id)));
        Ok(tickets)
    }
}

fn read_archived(path: &Path) -> Result<ArchivedTicket, TicketError> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read archived ticket {}", path.display()))
        .map_err(TicketError::Storage)?;
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to stat archived ticket {}", path.display()))
        .map_err(TicketError::Storage)?;

    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ArchivedTicket {
        id,
        content: render_markdown(&raw),
        last_modified: DateTime::<Utc>::from(modified),
        title: extract_title(&raw),
        author: extract_field(&raw, "Created by:"),
        created: extract_field(&raw, "Created on:"),
        status: extract_field(&raw, "Status:"),
        tags: extract_field(&raw, "Tags:")
            .map(|line| {
                line.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
    })
}

fn render_markdown(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() * 2);
    html::push_html(&mut out, Parser::new(raw));
    out
}

/// First `# ` heading, if any.
fn extract_title(raw: &str) -> Option<String> {
    raw.lines().find_map(|line| {
        line.strip_prefix("# ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    })
}

/// First line starting with the label, with the label stripped. The label
/// may appear after markdown emphasis markers or list bullets.
fn extract_field(raw: &str, label: &str) -> Option<String> {
    raw.lines().find_map(|line| {
        let line = line.trim_start_matches(['-', '*', ' ']).trim();
        line.strip_prefix(label)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}
