//! Pipeline status endpoints: render queue, farm health, milestones,
//! productivity stats, and shot dependencies.
//!
//! These are deterministic mock snapshots shaped like the real farm data;
//! no scheduler integration exists yet. TODO: replace the render queue
//! with a real Deadline query once the farm API gateway is reachable.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
pub struct RenderJob {
    pub id: String,
    pub project_name: String,
    pub shot_name: String,
    pub status: String,
    pub priority: u8,
    pub submitted_by: String,
    pub start_time: Option<DateTime<Utc>>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub frame_range: String,
    pub completion_percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct ProjectMilestone {
    pub id: String,
    pub project_name: String,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub status: String,
    pub assignee: String,
    pub description: String,
}

pub fn render_queue(now: DateTime<Utc>) -> Vec<RenderJob> {
    vec![RenderJob {
        id: "job123".to_string(),
        project_name: "Project Alpha".to_string(),
        shot_name: "SHOT_042".to_string(),
        status: "rendering".to_string(),
        priority: 1,
        submitted_by: "user123".to_string(),
        start_time: Some(now - Duration::hours(2)),
        estimated_completion: Some(now + Duration::hours(1)),
        frame_range: "1001-1125".to_string(),
        completion_percentage: 65.5,
    }]
}

pub fn system_health() -> Value {
    json!({
        "render_farm": {
            "status": "healthy",
            "active_nodes": 42,
            "total_nodes": 50,
            "cpu_usage": 87.5,
            "memory_usage": 75.2,
            "gpu_usage": 92.1
        },
        "storage": {
            "total_space": 500000,
            "used_space": 350000,
            "hot_storage_status": "healthy",
            "backup_status": "in_progress"
        },
        "services": {
            "deadline": "running",
            "nuke": "running",
            "houdini": "running",
            "maya": "warning"
        }
    })
}

pub fn productivity_stats() -> Value {
    json!({
        "total_hours_logged": 160,
        "assets_completed": 25,
        "reviews_performed": 42,
        "average_review_time": "2.5 hours",
        "busiest_day": "Wednesday",
        "peak_hours": ["10:00", "14:00"],
        "department_breakdown": {
            "modeling": 45,
            "texturing": 30,
            "rigging": 25,
            "animation": 60
        }
    })
}

pub fn shot_dependencies(shot_id: &str) -> Value {
    json!({
        "shot_id": shot_id,
        "assets": [
            {"id": "asset1", "name": "character_rig", "status": "approved"},
            {"id": "asset2", "name": "environment", "status": "in_progress"}
        ],
        "upstream_tasks": [
            {"id": "task1", "name": "modeling", "status": "completed"},
            {"id": "task2", "name": "rigging", "status": "in_progress"}
        ],
        "downstream_tasks": [
            {"id": "task3", "name": "animation", "status": "pending"},
            {"id": "task4", "name": "lighting", "status": "pending"}
        ]
    })
}

pub fn project_milestones(project_id: &str, now: DateTime<Utc>) -> Vec<ProjectMilestone> {
    vec![ProjectMilestone {
        id: format!("{}-milestone-1", project_id),
        project_name: "Project Alpha".to_string(),
        title: "Final Delivery".to_string(),
        due_date: now + Duration::days(30),
        status: "in_progress".to_string(),
        assignee: "user123".to_string(),
        description: "Deliver final composited shots".to_string(),
    }]
}
