//! SQLite-backed ticket repository.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::errors::TicketError;
use crate::models::{
    compute_stats, new_ticket_id, StatsQuery, Ticket, TicketComment, TicketCreate, TicketEvent,
    TicketEventType, TicketFilter, TicketPriority, TicketStats, TicketStatus, TicketType,
    TicketUpdate,
};
use crate::store::{apply_update, new_comment_id, status_change_details, TicketRepository};

const TICKET_COLUMNS: &str = "id, title, description, status, priority, kind, created_by, \
     assigned_to, project_id, asset_id, shot_id, created_at, updated_at, due_date, tags, \
     environment, time_estimate, time_spent";

pub struct SqliteTickets {
    conn: Connection,
}

impl SqliteTickets {
    /// Open (or create) the ticket database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path)
            .context("Failed to open SQLite database")
            .map_err(TicketError::Storage)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self, TicketError> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory SQLite database")
            .map_err(TicketError::Storage)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<(), TicketError> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")
            .map_err(TicketError::Storage)?;
        self.run_migrations()
    }

    fn run_migrations(&self) -> Result<(), TicketError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS tickets (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'open',
                    priority TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    created_by TEXT NOT NULL,
                    assigned_to TEXT,
                    project_id TEXT NOT NULL,
                    asset_id TEXT,
                    shot_id TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    due_date TEXT,
                    tags TEXT NOT NULL DEFAULT '[]',
                    environment TEXT,
                    time_estimate REAL,
                    time_spent REAL NOT NULL DEFAULT 0.0
                );

                CREATE TABLE IF NOT EXISTS ticket_comments (
                    id TEXT PRIMARY KEY,
                    ticket_id TEXT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,
                    author TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    attachments TEXT NOT NULL DEFAULT '[]'
                );

                CREATE TABLE IF NOT EXISTS ticket_events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ticket_id TEXT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
                    event_type TEXT NOT NULL,
                    user TEXT NOT NULL,
                    details TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tickets_project ON tickets(project_id);
                CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
                CREATE INDEX IF NOT EXISTS idx_comments_ticket ON ticket_comments(ticket_id);
                CREATE INDEX IF NOT EXISTS idx_events_ticket ON ticket_events(ticket_id);
                ",
            )
            .context("Failed to create tables")
            .map_err(TicketError::Storage)?;
        Ok(())
    }

    fn ticket_exists(&self, id: &str) -> Result<bool, TicketError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(1) FROM tickets WHERE id = ?1", params![id], |row| {
                row.get(0)
            })?;
        Ok(count > 0)
    }

    fn write_ticket(&self, ticket: &Ticket) -> Result<(), TicketError> {
        self.conn.execute(
            "UPDATE tickets SET title = ?2, description = ?3, status = ?4, priority = ?5, \
             assigned_to = ?6, updated_at = ?7, due_date = ?8, tags = ?9, time_spent = ?10 \
             WHERE id = ?1",
            params![
                ticket.id,
                ticket.title,
                ticket.description,
                ticket.status.as_str(),
                ticket.priority.as_str(),
                ticket.assigned_to,
                ticket.updated_at.to_rfc3339(),
                ticket.due_date.map(|d| d.to_rfc3339()),
                serde_json::to_string(&ticket.tags).unwrap_or_else(|_| "[]".into()),
                ticket.time_spent,
            ],
        )?;
        Ok(())
    }

    fn insert_event(
        &self,
        ticket_id: &str,
        event_type: TicketEventType,
        user: &str,
        details: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TicketError> {
        self.conn.execute(
            "INSERT INTO ticket_events (ticket_id, event_type, user, details, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![ticket_id, event_type.as_str(), user, details, at.to_rfc3339()],
        )?;
        Ok(())
    }
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_enum<T: std::str::FromStr>(idx: usize, value: &str) -> rusqlite::Result<T> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognized value '{}'", value).into(),
        )
    })
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    let status: String = row.get(3)?;
    let priority: String = row.get(4)?;
    let kind: String = row.get(5)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;
    let due_date: Option<String> = row.get(13)?;
    let tags_json: String = row.get(14)?;

    Ok(Ticket {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: parse_enum::<TicketStatus>(3, &status)?,
        priority: parse_enum::<TicketPriority>(4, &priority)?,
        kind: parse_enum::<TicketType>(5, &kind)?,
        created_by: row.get(6)?,
        assigned_to: row.get(7)?,
        project_id: row.get(8)?,
        asset_id: row.get(9)?,
        shot_id: row.get(10)?,
        created_at: parse_timestamp(11, &created_at)?,
        updated_at: parse_timestamp(12, &updated_at)?,
        due_date: due_date.as_deref().map(|d| parse_timestamp(13, d)).transpose()?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        environment: row.get(15)?,
        time_estimate: row.get(16)?,
        time_spent: row.get(17)?,
    })
}

impl TicketRepository for SqliteTickets {
    fn create(&mut self, req: TicketCreate, created_by: &str) -> Result<Ticket, TicketError> {
        let now = Utc::now();
        let ticket = Ticket {
            id: new_ticket_id(now),
            title: req.title,
            description: req.description,
            status: TicketStatus::Open,
            priority: req.priority,
            kind: req.kind,
            created_by: created_by.to_string(),
            assigned_to: req.assigned_to,
            project_id: req.project_id,
            asset_id: req.asset_id,
            shot_id: req.shot_id,
            created_at: now,
            updated_at: now,
            due_date: req.due_date,
            tags: req.tags,
            environment: req.environment,
            time_estimate: req.time_estimate,
            time_spent: 0.0,
        };

        self.conn.execute(
            "INSERT INTO tickets (id, title, description, status, priority, kind, created_by, \
             assigned_to, project_id, asset_id, shot_id, created_at, updated_at, due_date, tags, \
             environment, time_estimate, time_spent) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                ticket.id,
                ticket.title,
                ticket.description,
                ticket.status.as_str(),
                ticket.priority.as_str(),
                ticket.kind.as_str(),
                ticket.created_by,
                ticket.assigned_to,
                ticket.project_id,
                ticket.asset_id,
                ticket.shot_id,
                ticket.created_at.to_rfc3339(),
                ticket.updated_at.to_rfc3339(),
                ticket.due_date.map(|d| d.to_rfc3339()),
                serde_json::to_string(&ticket.tags).unwrap_or_else(|_| "[]".into()),
                ticket.environment,
                ticket.time_estimate,
                ticket.time_spent,
            ],
        )?;
        self.insert_event(&ticket.id, TicketEventType::Created, created_by, "Ticket created", now)?;
        Ok(ticket)
    }

    fn get(&self, id: &str) -> Result<Ticket, TicketError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM tickets WHERE id = ?1", TICKET_COLUMNS))?;
        let mut rows = stmt.query_map(params![id], ticket_from_row)?;
        match rows.next() {
            Some(row) => Ok(row?),
            None => Err(TicketError::not_found(id)),
        }
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        // All filter values are text, so the dynamic WHERE stays string-typed.
        let mut sql = format!("SELECT {} FROM tickets WHERE 1=1", TICKET_COLUMNS);
        let mut args: Vec<String> = Vec::new();
        if let Some(status) = filter.status {
            args.push(status.as_str().to_string());
            sql.push_str(&format!(" AND status = ?{}", args.len()));
        }
        if let Some(priority) = filter.priority {
            args.push(priority.as_str().to_string());
            sql.push_str(&format!(" AND priority = ?{}", args.len()));
        }
        if let Some(assigned_to) = &filter.assigned_to {
            args.push(assigned_to.clone());
            sql.push_str(&format!(" AND assigned_to = ?{}", args.len()));
        }
        if let Some(project_id) = &filter.project_id {
            args.push(project_id.clone());
            sql.push_str(&format!(" AND project_id = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY created_at DESC, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), ticket_from_row)?;
        let mut tickets = Vec::new();
        for row in rows {
            tickets.push(row?);
        }
        Ok(tickets)
    }

    fn update(
        &mut self,
        id: &str,
        update: TicketUpdate,
        user: &str,
    ) -> Result<Ticket, TicketError> {
        let now = Utc::now();
        let mut ticket = self.get(id)?;
        let transition = apply_update(&mut ticket, &update, now);
        self.write_ticket(&ticket)?;
        if let Some((from, to)) = transition {
            self.insert_event(
                id,
                TicketEventType::StatusChanged,
                user,
                &status_change_details(from, to),
                now,
            )?;
        }
        Ok(ticket)
    }

    fn add_comment(&mut self, id: &str, comment: TicketComment) -> Result<String, TicketError> {
        if !self.ticket_exists(id)? {
            return Err(TicketError::not_found(id));
        }
        let now = Utc::now();
        let comment_id = new_comment_id();
        self.conn.execute(
            "INSERT INTO ticket_comments (id, ticket_id, content, author, created_at, attachments) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                comment_id,
                id,
                comment.content,
                comment.author,
                comment.created_at.to_rfc3339(),
                serde_json::to_string(&comment.attachments).unwrap_or_else(|_| "[]".into()),
            ],
        )?;
        self.conn.execute(
            "UPDATE tickets SET updated_at = ?2 WHERE id = ?1",
            params![id, now.to_rfc3339()],
        )?;
        self.insert_event(
            id,
            TicketEventType::CommentAdded,
            &comment.author,
            &format!("Added comment: '{}'", comment.content),
            now,
        )?;
        Ok(comment_id)
    }

    fn assign(&mut self, id: &str, assignee: &str, user: &str) -> Result<(), TicketError> {
        if !self.ticket_exists(id)? {
            return Err(TicketError::not_found(id));
        }
        let now = Utc::now();
        self.conn.execute(
            "UPDATE tickets SET assigned_to = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, assignee, now.to_rfc3339()],
        )?;
        self.insert_event(
            id,
            TicketEventType::Assigned,
            user,
            &format!("Assigned to {}", assignee),
            now,
        )?;
        Ok(())
    }

    fn history(&self, id: &str) -> Result<Vec<TicketEvent>, TicketError> {
        if !self.ticket_exists(id)? {
            return Err(TicketError::not_found(id));
        }
        let mut stmt = self.conn.prepare(
            "SELECT created_at, event_type, user, details FROM ticket_events \
             WHERE ticket_id = ?1 ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            let created_at: String = row.get(0)?;
            let event_type: String = row.get(1)?;
            Ok(TicketEvent {
                timestamp: parse_timestamp(0, &created_at)?,
                event_type: parse_enum(1, &event_type)?,
                user: row.get(2)?,
                details: row.get(3)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    fn statistics(&self, query: &StatsQuery) -> Result<TicketStats, TicketError> {
        let tickets: Vec<Ticket> = self
            .list(&TicketFilter::default())?
            .into_iter()
            .filter(|t| query.matches(t))
            .collect();
        Ok(compute_stats(&tickets))
    }
}
