//! Ticket repository contract and the async-safe handle shared by handlers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::TicketError;
use crate::models::{
    compute_stats, new_ticket_id, StatsQuery, Ticket, TicketComment, TicketCreate, TicketEvent,
    TicketEventType, TicketFilter, TicketStats, TicketStatus, TicketUpdate,
};

/// The storage contract every ticket backend must satisfy.
///
/// Tickets are never hard-deleted. All identity fields (`id`, `created_by`,
/// `created_at`) are immutable after creation; every mutation refreshes
/// `updated_at` and appends an audit event.
pub trait TicketRepository: Send {
    fn create(&mut self, req: TicketCreate, created_by: &str) -> Result<Ticket, TicketError>;
    fn get(&self, id: &str) -> Result<Ticket, TicketError>;
    /// Filters are conjunctive; result is ordered by `created_at` descending.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;
    fn update(&mut self, id: &str, update: TicketUpdate, user: &str)
        -> Result<Ticket, TicketError>;
    /// Appends a comment and returns its server-generated id.
    fn add_comment(&mut self, id: &str, comment: TicketComment) -> Result<String, TicketError>;
    fn assign(&mut self, id: &str, assignee: &str, user: &str) -> Result<(), TicketError>;
    /// Audit events for one ticket, oldest first.
    fn history(&self, id: &str) -> Result<Vec<TicketEvent>, TicketError>;
    fn statistics(&self, query: &StatsQuery) -> Result<TicketStats, TicketError>;
}

/// Async-safe handle to the ticket store.
///
/// Wraps the repository behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads. The single mutex also serializes mutations,
/// which is what keeps concurrent updates to the same ticket well-ordered.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<std::sync::Mutex<Box<dyn TicketRepository>>>,
}

impl StoreHandle {
    pub fn new(repo: impl TicketRepository + 'static) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(Box::new(repo))),
        }
    }

    /// Run a closure with access to the repository on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R, TicketError>
    where
        F: FnOnce(&mut dyn TicketRepository) -> Result<R, TicketError> + Send + 'static,
        R: Send + 'static,
    {
        let repo = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = repo.lock().map_err(|_| TicketError::LockPoisoned)?;
            f(guard.as_mut())
        })
        .await
        .map_err(|e| TicketError::Storage(anyhow::anyhow!("Store task panicked: {}", e)))?
    }
}

/// Apply the non-null fields of `update` onto `ticket`, refresh `updated_at`,
/// and report the status transition if one happened. Shared by both backends
/// so they stay contract-identical.
pub(crate) fn apply_update(
    ticket: &mut Ticket,
    update: &TicketUpdate,
    now: DateTime<Utc>,
) -> Option<(TicketStatus, TicketStatus)> {
    let mut transition = None;

    if let Some(title) = &update.title {
        ticket.title = title.clone();
    }
    if let Some(description) = &update.description {
        ticket.description = description.clone();
    }
    if let Some(status) = update.status {
        if status != ticket.status {
            transition = Some((ticket.status, status));
        }
        ticket.status = status;
    }
    if let Some(priority) = update.priority {
        ticket.priority = priority;
    }
    if let Some(assigned_to) = &update.assigned_to {
        ticket.assigned_to = Some(assigned_to.clone());
    }
    if let Some(due_date) = update.due_date {
        ticket.due_date = Some(due_date);
    }
    if let Some(tags) = &update.tags {
        ticket.tags = tags.clone();
    }
    if let Some(time_spent) = update.time_spent {
        ticket.time_spent = time_spent;
    }
    ticket.updated_at = now;

    transition
}

pub(crate) fn status_change_details(from: TicketStatus, to: TicketStatus) -> String {
    format!("Status changed from '{}' to '{}'", from, to)
}

pub(crate) fn new_comment_id() -> String {
    let fragment = uuid::Uuid::new_v4().simple().to_string();
    format!("comment-{}", &fragment[..8])
}

struct MemoryEntry {
    ticket: Ticket,
    comments: Vec<(String, TicketComment)>,
    events: Vec<TicketEvent>,
}

/// In-memory reference implementation of the repository contract.
///
/// Exists for tests and as the executable specification the SQLite backend
/// is checked against; production always runs on `SqliteTickets`.
#[derive(Default)]
pub struct MemoryTickets {
    entries: HashMap<String, MemoryEntry>,
}

impl MemoryTickets {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut MemoryEntry, TicketError> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| TicketError::not_found(id))
    }

    /// Stored comments for one ticket, in insertion order.
    pub fn comments(&self, id: &str) -> Result<Vec<(String, TicketComment)>, TicketError> {
        self.entries
            .get(id)
            .map(|e| e.comments.clone())
            .ok_or_else(|| TicketError::not_found(id))
    }
}

impl TicketRepository for MemoryTickets {
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
        let entry = MemoryEntry {
            ticket: ticket.clone(),
            comments: Vec::new(),
            events: vec![TicketEvent {
                timestamp: now,
                event_type: TicketEventType::Created,
                user: created_by.to_string(),
                details: "Ticket created".to_string(),
            }],
        };
        self.entries.insert(ticket.id.clone(), entry);
        Ok(ticket)
    }

    fn get(&self, id: &str) -> Result<Ticket, TicketError> {
        self.entries
            .get(id)
            .map(|e| e.ticket.clone())
            .ok_or_else(|| TicketError::not_found(id))
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let mut tickets: Vec<Ticket> = self
            .entries
            .values()
            .map(|e| e.ticket.clone())
            .filter(|t| filter.matches(t))
            .collect();
        // Stable ordering: created_at descending, id as tie-breaker.
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(tickets)
    }

    fn update(
        &mut self,
        id: &str,
        update: TicketUpdate,
        user: &str,
    ) -> Result<Ticket, TicketError> {
        let now = Utc::now();
        let entry = self.entry_mut(id)?;
        let transition = apply_update(&mut entry.ticket, &update, now);
        if let Some((from, to)) = transition {
            entry.events.push(TicketEvent {
                timestamp: now,
                event_type: TicketEventType::StatusChanged,
                user: user.to_string(),
                details: status_change_details(from, to),
            });
        }
        Ok(entry.ticket.clone())
    }

    fn add_comment(&mut self, id: &str, comment: TicketComment) -> Result<String, TicketError> {
        let now = Utc::now();
        let comment_id = new_comment_id();
        let author = comment.author.clone();
        let details = format!("Added comment: '{}'", comment.content);
        let entry = self.entry_mut(id)?;
        entry.comments.push((comment_id.clone(), comment));
        entry.ticket.updated_at = now;
        entry.events.push(TicketEvent {
            timestamp: now,
            event_type: TicketEventType::CommentAdded,
            user: author,
            details,
        });
        Ok(comment_id)
    }

    fn assign(&mut self, id: &str, assignee: &str, user: &str) -> Result<(), TicketError> {
        let now = Utc::now();
        let entry = self.entry_mut(id)?;
        entry.ticket.assigned_to = Some(assignee.to_string());
        entry.ticket.updated_at = now;
        entry.events.push(TicketEvent {
            timestamp: now,
            event_type: TicketEventType::Assigned,
            user: user.to_string(),
            details: format!("Assigned to {}", assignee),
        });
        Ok(())
    }

    fn history(&self, id: &str) -> Result<Vec<TicketEvent>, TicketError> {
        self.entries
            .get(id)
            .map(|e| e.events.clone())
            .ok_or_else(|| TicketError::not_found(id))
    }

    fn statistics(&self, query: &StatsQuery) -> Result<TicketStats, TicketError> {
        let tickets: Vec<Ticket> = self
            .entries
            .values()
            .map(|e| e.ticket.clone())
            .filter(|t| query.matches(t))
            .collect();
        Ok(compute_stats(&tickets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TicketPriority, TicketType};

    fn create_req(title: &str, project: &str) -> TicketCreate {
        TicketCreate {
            title: title.into(),
            description: "something broke".into(),
            priority: TicketPriority::High,
            kind: TicketType::Bug,
            project_id: project.into(),
            assigned_to: None,
            asset_id: None,
            shot_id: None,
            due_date: None,
            tags: vec![],
            environment: None,
            time_estimate: None,
        }
    }

    #[test]
    fn create_assigns_server_side_fields() {
        let mut store = MemoryTickets::new();
        let ticket = store.create(create_req("Crash on export", "proj1"), "alice").unwrap();
        assert!(ticket.id.starts_with("TICKET-"));
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.created_by, "alice");
        assert_eq!(ticket.time_spent, 0.0);
        assert_eq!(ticket.created_at, ticket.updated_at);
    }

    #[test]
    fn create_ids_are_unique() {
        let mut store = MemoryTickets::new();
        let mut ids = std::collections::HashSet::new();
        for i in 0..50 {
            let t = store.create(create_req(&format!("t{}", i), "proj1"), "alice").unwrap();
            assert!(ids.insert(t.id));
        }
    }

    #[test]
    fn get_roundtrips_created_ticket() {
        let mut store = MemoryTickets::new();
        let created = store.create(create_req("Crash on export", "proj1"), "alice").unwrap();
        let fetched = store.get(&created.id).unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.title, created.title);
        assert_eq!(fetched.status, created.status);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let store = MemoryTickets::new();
        assert!(matches!(
            store.get("TICKET-00000000-ffffffff"),
            Err(TicketError::NotFound { .. })
        ));
    }

    #[test]
    fn update_preserves_identity_and_advances_updated_at() {
        let mut store = MemoryTickets::new();
        let created = store.create(create_req("Crash on export", "proj1"), "alice").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let updated = store
            .update(
                &created.id,
                TicketUpdate {
                    status: Some(TicketStatus::Resolved),
                    ..Default::default()
                },
                "bob",
            )
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_by, created.created_by);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.status, TicketStatus::Resolved);
        assert!(updated.updated_at > created.created_at);
        // Untouched fields survive.
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.priority, created.priority);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let mut store = MemoryTickets::new();
        let result = store.update("nope", TicketUpdate::default(), "bob");
        assert!(matches!(result, Err(TicketError::NotFound { .. })));
    }

    #[test]
    fn status_change_is_recorded_in_history() {
        let mut store = MemoryTickets::new();
        let created = store.create(create_req("Crash on export", "proj1"), "alice").unwrap();
        store
            .update(
                &created.id,
                TicketUpdate {
                    status: Some(TicketStatus::InProgress),
                    ..Default::default()
                },
                "bob",
            )
            .unwrap();
        let history = store.history(&created.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event_type, TicketEventType::Created);
        assert_eq!(history[1].event_type, TicketEventType::StatusChanged);
        assert_eq!(history[1].details, "Status changed from 'open' to 'in_progress'");
        assert!(history[0].timestamp <= history[1].timestamp);
    }

    #[test]
    fn same_status_update_records_no_transition() {
        let mut store = MemoryTickets::new();
        let created = store.create(create_req("Crash on export", "proj1"), "alice").unwrap();
        store
            .update(
                &created.id,
                TicketUpdate {
                    status: Some(TicketStatus::Open),
                    ..Default::default()
                },
                "bob",
            )
            .unwrap();
        assert_eq!(store.history(&created.id).unwrap().len(), 1);
    }

    #[test]
    fn list_filters_by_status_and_project() {
        let mut store = MemoryTickets::new();
        let a = store.create(create_req("a", "proj1"), "alice").unwrap();
        let _b = store.create(create_req("b", "proj2"), "alice").unwrap();
        store
            .update(
                &a.id,
                TicketUpdate {
                    status: Some(TicketStatus::Resolved),
                    ..Default::default()
                },
                "alice",
            )
            .unwrap();

        let all = store.list(&TicketFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let resolved = store
            .list(&TicketFilter {
                status: Some(TicketStatus::Resolved),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, a.id);

        let proj1_open = store
            .list(&TicketFilter {
                status: Some(TicketStatus::Open),
                project_id: Some("proj1".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(proj1_open.is_empty());
    }

    #[test]
    fn add_comment_appends_and_touches_ticket() {
        let mut store = MemoryTickets::new();
        let created = store.create(create_req("Crash on export", "proj1"), "alice").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let comment_id = store
            .add_comment(
                &created.id,
                TicketComment {
                    content: "Working on this now".into(),
                    author: "bob".into(),
                    created_at: Utc::now(),
                    attachments: vec![],
                },
            )
            .unwrap();
        assert!(comment_id.starts_with("comment-"));
        let comments = store.comments(&created.id).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].0, comment_id);
        let ticket = store.get(&created.id).unwrap();
        assert!(ticket.updated_at > created.updated_at);
        let history = store.history(&created.id).unwrap();
        assert_eq!(history.last().unwrap().event_type, TicketEventType::CommentAdded);
        assert!(history.last().unwrap().details.contains("Working on this now"));
    }

    #[test]
    fn assign_sets_assignee_and_records_event() {
        let mut store = MemoryTickets::new();
        let created = store.create(create_req("Crash on export", "proj1"), "alice").unwrap();
        store.assign(&created.id, "carol", "alice").unwrap();
        let ticket = store.get(&created.id).unwrap();
        assert_eq!(ticket.assigned_to.as_deref(), Some("carol"));
        let history = store.history(&created.id).unwrap();
        assert_eq!(history.last().unwrap().event_type, TicketEventType::Assigned);
    }

    #[test]
    fn mutations_on_unknown_ids_are_not_found() {
        let mut store = MemoryTickets::new();
        assert!(matches!(
            store.assign("nope", "x", "y"),
            Err(TicketError::NotFound { .. })
        ));
        assert!(matches!(
            store.add_comment(
                "nope",
                TicketComment {
                    content: "c".into(),
                    author: "a".into(),
                    created_at: Utc::now(),
                    attachments: vec![],
                }
            ),
            Err(TicketError::NotFound { .. })
        ));
        assert!(matches!(store.history("nope"), Err(TicketError::NotFound { .. })));
    }

    #[test]
    fn statistics_respects_project_filter() {
        let mut store = MemoryTickets::new();
        store.create(create_req("a", "proj1"), "alice").unwrap();
        store.create(create_req("b", "proj1"), "alice").unwrap();
        store.create(create_req("c", "proj2"), "alice").unwrap();

        let all = store.statistics(&StatsQuery::default()).unwrap();
        assert_eq!(all.total_tickets, 3);

        let proj1 = store
            .statistics(&StatsQuery {
                project_id: Some("proj1".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(proj1.total_tickets, 2);
    }

    #[tokio::test]
    async fn store_handle_runs_closures() {
        let handle = StoreHandle::new(MemoryTickets::new());
        let ticket = handle
            .call(|repo| repo.create(create_req("via handle", "proj1"), "alice"))
            .await
            .unwrap();
        let id = ticket.id.clone();
        let fetched = handle.call(move |repo| repo.get(&id)).await.unwrap();
        assert_eq!(fetched.title, "via handle");
    }
}
