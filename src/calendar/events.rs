//! Calendar event payloads mirrored from projects and tasks.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{AppError, Result};
use crate::model::calendar::{
    Attendee, CalendarEvent, EventTime, ReminderOverride, Reminders, RemoteEvent,
};
use crate::model::project::Project;
use crate::model::task::Task;

/// Distinguishes task deadlines from project events in the calendar UI.
pub const TASK_COLOR_ID: &str = "11";

/// Search limit when locating project events by text.
pub const PROJECT_SEARCH_LIMIT: u32 = 50;

pub fn project_marker(name: &str) -> String {
    format!("Project: {name}")
}

fn project_description(project: &Project) -> String {
    format!(
        "{}\nDescription: {}\nPriority: {}",
        project_marker(&project.name),
        project.description,
        project.priority.label()
    )
}

/// Whole-day event on `date`; the end is exclusive, so it is the next day.
fn all_day(date: NaiveDate, time_zone: &str) -> (EventTime, EventTime) {
    let end = date.succ_opt().unwrap_or(date);
    (
        EventTime::AllDay {
            date,
            time_zone: time_zone.to_string(),
        },
        EventTime::AllDay {
            date: end,
            time_zone: time_zone.to_string(),
        },
    )
}

pub fn project_start_event(project: &Project, time_zone: &str) -> CalendarEvent {
    let (start, end) = all_day(project.start_date, time_zone);
    CalendarEvent {
        summary: format!("Project Start: {}", project.name),
        description: Some(project_description(project)),
        location: None,
        start,
        end,
        recurrence: Vec::new(),
        reminders: Reminders::email_and_popup(60, 15),
        attendees: Vec::new(),
        color_id: None,
    }
}

pub fn project_deadline_event(project: &Project, time_zone: &str) -> CalendarEvent {
    let (start, end) = all_day(project.end_date, time_zone);
    CalendarEvent {
        summary: format!("Project Deadline: {}", project.name),
        description: Some(project_description(project)),
        location: None,
        start,
        end,
        recurrence: Vec::new(),
        reminders: Reminders::email_and_popup(24 * 60, 60),
        attendees: Vec::new(),
        color_id: None,
    }
}

pub fn task_deadline_event(
    task: &Task,
    assigned_by: &str,
    project: Option<&Project>,
    time_zone: &str,
) -> CalendarEvent {
    let mut description = format!(
        "Task: {}\nDescription: {}\nPriority: {}\nAssigned by: {}",
        task.name,
        task.description,
        task.priority.label(),
        assigned_by
    );
    if let Some(project) = project {
        description.push_str(&format!("\nProject: {}", project.name));
    }

    let (start, end) = all_day(task.due_date, time_zone);
    CalendarEvent {
        summary: format!("Task Due: {}", task.name),
        description: Some(description),
        location: None,
        start,
        end,
        recurrence: Vec::new(),
        reminders: Reminders::email_and_popup(24 * 60, 60),
        attendees: Vec::new(),
        color_id: Some(TASK_COLOR_ID.to_string()),
    }
}

/// Text match used when no event ids were recorded for a project.
pub fn is_project_event(event: &RemoteEvent, project_name: &str) -> bool {
    let summary = event.summary.as_deref().unwrap_or_default();
    let description = event.description.as_deref().unwrap_or_default();
    description.contains(&project_marker(project_name))
        || summary.contains(&format!("Project Start: {project_name}"))
        || summary.contains(&format!("Project Deadline: {project_name}"))
}

/// Free-form event an administrator places in an employee's calendar.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CustomEventRequest {
    #[schema(example = "Quarterly review")]
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    #[schema(example = "2026-02-15T10:00:00", value_type = String)]
    pub start: NaiveDateTime,
    #[schema(example = "2026-02-15T11:30:00", value_type = String)]
    pub end: NaiveDateTime,
    /// IANA zone; the configured default when absent.
    pub time_zone: Option<String>,
    /// RRULE lines, e.g. `RRULE:FREQ=WEEKLY;BYDAY=MO`
    #[serde(default)]
    pub recurrence: Vec<String>,
    #[serde(default)]
    pub reminders: Vec<ReminderOverride>,
    #[serde(default)]
    pub attendees: Vec<String>,
    pub color_id: Option<String>,
}

impl CustomEventRequest {
    pub fn into_event(self, default_time_zone: &str) -> Result<CalendarEvent> {
        if self.summary.trim().is_empty() {
            return Err(AppError::validation("Event summary is required"));
        }
        if self.end <= self.start {
            return Err(AppError::validation("Event end must be after its start"));
        }
        if let Some(rule) = self.recurrence.iter().find(|r| !r.starts_with("RRULE:")) {
            return Err(AppError::validation(format!(
                "Unsupported recurrence rule: {rule}"
            )));
        }

        let time_zone = self
            .time_zone
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or_else(|| default_time_zone.to_string());

        let reminders = if self.reminders.is_empty() {
            Reminders {
                use_default: true,
                overrides: Vec::new(),
            }
        } else {
            Reminders::overrides(self.reminders)
        };

        Ok(CalendarEvent {
            summary: self.summary,
            description: self.description,
            location: self.location,
            start: EventTime::Timed {
                date_time: self.start,
                time_zone: time_zone.clone(),
            },
            end: EventTime::Timed {
                date_time: self.end,
                time_zone,
            },
            recurrence: self.recurrence,
            reminders,
            attendees: self
                .attendees
                .into_iter()
                .map(|email| Attendee { email })
                .collect(),
            color_id: self.color_id,
        })
    }
}
