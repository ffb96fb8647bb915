use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// True for the terminal states that count toward resolution metrics.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    Bug,
    Feature,
    Task,
    TechnicalDebt,
}

impl TicketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Task => "task",
            Self::TechnicalDebt => "technical_debt",
        }
    }
}

impl std::fmt::Display for TicketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bug" => Ok(Self::Bug),
            "feature" => Ok(Self::Feature),
            "task" => Ok(Self::Task),
            "technical_debt" => Ok(Self::TechnicalDebt),
            _ => Err(format!("Invalid ticket type: {}", s)),
        }
    }
}

/// A unit of trackable work in the pipeline. Tickets are never hard-deleted;
/// they move through `TicketStatus` until closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    #[serde(rename = "type")]
    pub kind: TicketType,
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub project_id: String,
    pub asset_id: Option<String>,
    pub shot_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub environment: Option<String>,
    pub time_estimate: Option<f64>,
    pub time_spent: f64,
}

/// Client payload for ticket creation. `id`, `created_by`, and timestamps
/// are assigned server-side and never accepted from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCreate {
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    #[serde(rename = "type")]
    pub kind: TicketType,
    pub project_id: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub shot_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub time_estimate: Option<f64>,
}

/// Partial update. Only fields present overwrite the stored ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub time_spent: Option<f64>,
}

impl TicketUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.due_date.is_none()
            && self.tags.is_none()
            && self.time_spent.is_none()
    }
}

/// An append-only comment owned by exactly one ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketComment {
    pub content: String,
    pub author: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketEventType {
    Created,
    StatusChanged,
    CommentAdded,
    Assigned,
}

impl TicketEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::StatusChanged => "status_changed",
            Self::CommentAdded => "comment_added",
            Self::Assigned => "assigned",
        }
    }
}

impl FromStr for TicketEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "status_changed" => Ok(Self::StatusChanged),
            "comment_added" => Ok(Self::CommentAdded),
            "assigned" => Ok(Self::Assigned),
            _ => Err(format!("Invalid event type: {}", s)),
        }
    }
}

/// A single audit entry in a ticket's history, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: TicketEventType,
    pub user: String,
    pub details: String,
}

/// Conjunctive list filters; `None` means no constraint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<String>,
    pub project_id: Option<String>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.map_or(true, |s| ticket.status == s)
            && self.priority.map_or(true, |p| ticket.priority == p)
            && self
                .assigned_to
                .as_deref()
                .map_or(true, |a| ticket.assigned_to.as_deref() == Some(a))
            && self
                .project_id
                .as_deref()
                .map_or(true, |p| ticket.project_id == p)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatsQuery {
    pub project_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl StatsQuery {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.project_id
            .as_deref()
            .map_or(true, |p| ticket.project_id == p)
            && self.start_date.map_or(true, |d| ticket.created_at >= d)
            && self.end_date.map_or(true, |d| ticket.created_at <= d)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverCount {
    pub user: String,
    pub tickets_resolved: usize,
}

/// Aggregate counts over a filtered ticket set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketStats {
    pub total_tickets: usize,
    pub status_breakdown: BTreeMap<String, usize>,
    pub priority_breakdown: BTreeMap<String, usize>,
    /// Mean wall-clock hours from creation to last update for resolved and
    /// closed tickets; `None` when nothing has been resolved yet.
    pub average_resolution_hours: Option<f64>,
    pub top_resolvers: Vec<ResolverCount>,
}

/// Compute statistics over an already-filtered ticket set. Shared by the
/// SQLite and in-memory repository implementations.
pub fn compute_stats(tickets: &[Ticket]) -> TicketStats {
    let mut status_breakdown = BTreeMap::new();
    let mut priority_breakdown = BTreeMap::new();
    let mut resolution_hours = Vec::new();
    let mut resolver_counts: BTreeMap<String, usize> = BTreeMap::new();

    for ticket in tickets {
        *status_breakdown
            .entry(ticket.status.as_str().to_string())
            .or_insert(0) += 1;
        *priority_breakdown
            .entry(ticket.priority.as_str().to_string())
            .or_insert(0) += 1;

        if ticket.status.is_resolved() {
            let elapsed = ticket.updated_at - ticket.created_at;
            resolution_hours.push(elapsed.num_seconds() as f64 / 3600.0);
            if let Some(assignee) = &ticket.assigned_to {
                *resolver_counts.entry(assignee.clone()).or_insert(0) += 1;
            }
        }
    }

    let average_resolution_hours = if resolution_hours.is_empty() {
        None
    } else {
        Some(resolution_hours.iter().sum::<f64>() / resolution_hours.len() as f64)
    };

    let mut top_resolvers: Vec<ResolverCount> = resolver_counts
        .into_iter()
        .map(|(user, tickets_resolved)| ResolverCount {
            user,
            tickets_resolved,
        })
        .collect();
    top_resolvers.sort_by(|a, b| b.tickets_resolved.cmp(&a.tickets_resolved));
    top_resolvers.truncate(5);

    TicketStats {
        total_tickets: tickets.len(),
        status_breakdown,
        priority_breakdown,
        average_resolution_hours,
        top_resolvers,
    }
}

/// Generate a unique ticket id: `TICKET-<date>-<8 hex chars>`.
///
/// The random fragment comes from a v4 UUID, so concurrent creates in the
/// same process tick cannot collide the way a timestamp hash would.
pub fn new_ticket_id(now: DateTime<Utc>) -> String {
    let fragment = uuid::Uuid::new_v4().simple().to_string();
    format!("TICKET-{}-{}", now.format("%Y%m%d"), &fragment[..8])
}
