//! Mirrors project and task dates into collaborators' calendars.
//!
//! Every operation is best effort: failures become warnings on the returned
//! [`SyncReport`] and never propagate to the caller's mutation.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use super::client::CalendarApi;
use super::credentials::CredentialStore;
use super::events::{
    self, CustomEventRequest, PROJECT_SEARCH_LIMIT, is_project_event, project_marker,
};
use super::retry::RetryPolicy;
use super::CalendarError;
use crate::error::Result;
use crate::model::calendar::{CalendarEvent, EventLink, EventSource, RemoteEvent};
use crate::model::employee::Employee;
use crate::model::project::Project;
use crate::model::task::Task;
use crate::repository::EventLinkRepository;

#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
pub struct SyncReport {
    pub created: u32,
    pub deleted: u32,
    pub warnings: Vec<String>,
}

impl SyncReport {
    fn warn(&mut self, message: String) {
        tracing::warn!(warning = %message, "Calendar sync degraded");
        self.warnings.push(message);
    }

    pub fn merge(&mut self, other: SyncReport) {
        self.created += other.created;
        self.deleted += other.deleted;
        self.warnings.extend(other.warnings);
    }
}

pub struct CalendarSync {
    credentials: Arc<CredentialStore>,
    api: Arc<dyn CalendarApi>,
    links: Arc<dyn EventLinkRepository>,
    retry: RetryPolicy,
    time_zone: String,
}

impl CalendarSync {
    pub fn new(
        credentials: Arc<CredentialStore>,
        api: Arc<dyn CalendarApi>,
        links: Arc<dyn EventLinkRepository>,
        retry: RetryPolicy,
        time_zone: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            api,
            links,
            retry,
            time_zone: time_zone.into(),
        }
    }

    pub fn time_zone(&self) -> &str {
        &self.time_zone
    }

    /// Access token for a connected employee. Employees without stored
    /// credentials are skipped silently; an unusable grant is a warning.
    async fn token_for(&self, employee: &Employee, report: &mut SyncReport) -> Option<String> {
        match self.credentials.get(employee.id).await {
            Ok(Some(credentials)) => match self.credentials.refresh_if_expired(credentials).await {
                Some(credentials) => Some(credentials.token),
                None => {
                    report.warn(format!(
                        "Google Calendar is not available for {}",
                        employee.full_name()
                    ));
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                report.warn(format!(
                    "Could not load calendar credentials for {}: {e}",
                    employee.full_name()
                ));
                None
            }
        }
    }

    async fn create_linked(
        &self,
        token: &str,
        employee: &Employee,
        source: EventSource,
        event: &CalendarEvent,
        report: &mut SyncReport,
    ) {
        let result = self
            .retry
            .run("insert_event", || self.api.insert_event(token, event))
            .await;
        match result {
            Ok(remote) => {
                report.created += 1;
                let link = EventLink {
                    employee_id: employee.id,
                    source_kind: source.kind,
                    source_id: source.id,
                    event_id: remote.id.clone(),
                };
                if let Err(e) = self.links.record(&link).await {
                    tracing::error!(
                        employee_id = employee.id,
                        event_id = %remote.id,
                        error = %e,
                        "Failed to record calendar event link"
                    );
                }
            }
            Err(e) => {
                report.warn(format!(
                    "Could not add \"{}\" to {}'s calendar: {e}",
                    event.summary,
                    employee.full_name()
                ));
            }
        }
    }

    async fn delete_one(
        &self,
        token: &str,
        employee: &Employee,
        event_id: &str,
        report: &mut SyncReport,
    ) {
        let result = self
            .retry
            .run("delete_event", || self.api.delete_event(token, event_id))
            .await;
        match result {
            Ok(()) => {
                report.deleted += 1;
                if let Err(e) = self.links.remove(employee.id, event_id).await {
                    tracing::error!(
                        employee_id = employee.id,
                        event_id,
                        error = %e,
                        "Failed to drop calendar event link"
                    );
                }
            }
            Err(e) => {
                report.warn(format!(
                    "Could not remove an event from {}'s calendar: {e}",
                    employee.full_name()
                ));
            }
        }
    }

    /// Removes the events recorded for `source`. Projects created before ids
    /// were recorded fall back to a text search on `project_name`.
    async fn delete_source_events(
        &self,
        token: &str,
        employee: &Employee,
        source: EventSource,
        project_name: Option<&str>,
        report: &mut SyncReport,
    ) {
        let links = match self.links.find(employee.id, source).await {
            Ok(links) => links,
            Err(e) => {
                tracing::error!(employee_id = employee.id, error = %e, "Failed to load calendar event links");
                Vec::new()
            }
        };

        if !links.is_empty() {
            for link in links {
                self.delete_one(token, employee, &link.event_id, report).await;
            }
            return;
        }

        let Some(name) = project_name else {
            return;
        };
        let query = project_marker(name);
        let found = self
            .retry
            .run("search_events", || {
                self.api.search_events(token, &query, PROJECT_SEARCH_LIMIT)
            })
            .await;
        match found {
            Ok(found) => {
                for event in found.iter().filter(|e| is_project_event(e, name)) {
                    self.delete_one(token, employee, &event.id, report).await;
                }
            }
            Err(e) => report.warn(format!(
                "Could not search {}'s calendar for project events: {e}",
                employee.full_name()
            )),
        }
    }

    async fn create_project_events(
        &self,
        token: &str,
        project: &Project,
        employee: &Employee,
        report: &mut SyncReport,
    ) {
        let source = EventSource::project(project.id);
        let start = events::project_start_event(project, &self.time_zone);
        let deadline = events::project_deadline_event(project, &self.time_zone);
        self.create_linked(token, employee, source, &start, report)
            .await;
        self.create_linked(token, employee, source, &deadline, report)
            .await;
    }

    pub async fn on_project_created(
        &self,
        project: &Project,
        collaborators: &[Employee],
    ) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.credentials.is_configured() {
            return report;
        }
        for employee in collaborators {
            if let Some(token) = self.token_for(employee, &mut report).await {
                self.create_project_events(&token, project, employee, &mut report)
                    .await;
            }
        }
        tracing::info!(
            project_id = project.id,
            created = report.created,
            warnings = report.warnings.len(),
            "Project events synced"
        );
        report
    }

    /// Replaces the events of collaborators whose membership did not change.
    /// `previous` is the project as it was before the edit.
    pub async fn on_project_dates_changed(
        &self,
        previous: &Project,
        project: &Project,
        unaffected: &[Employee],
    ) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.credentials.is_configured() {
            return report;
        }
        let source = EventSource::project(project.id);
        for employee in unaffected {
            if let Some(token) = self.token_for(employee, &mut report).await {
                self.delete_source_events(
                    &token,
                    employee,
                    source,
                    Some(&previous.name),
                    &mut report,
                )
                .await;
                self.create_project_events(&token, project, employee, &mut report)
                    .await;
            }
        }
        report
    }

    pub async fn on_collaborator_added(&self, project: &Project, employee: &Employee) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.credentials.is_configured() {
            return report;
        }
        if let Some(token) = self.token_for(employee, &mut report).await {
            self.create_project_events(&token, project, employee, &mut report)
                .await;
        }
        report
    }

    pub async fn on_collaborator_removed(
        &self,
        project: &Project,
        employee: &Employee,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.credentials.is_configured() {
            return report;
        }
        if let Some(token) = self.token_for(employee, &mut report).await {
            self.delete_source_events(
                &token,
                employee,
                EventSource::project(project.id),
                Some(&project.name),
                &mut report,
            )
            .await;
        }
        report
    }

    /// Runs before the project row is removed.
    pub async fn on_project_deleted(
        &self,
        project: &Project,
        collaborators: &[Employee],
    ) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.credentials.is_configured() {
            return report;
        }
        let source = EventSource::project(project.id);
        for employee in collaborators {
            if let Some(token) = self.token_for(employee, &mut report).await {
                self.delete_source_events(
                    &token,
                    employee,
                    source,
                    Some(&project.name),
                    &mut report,
                )
                .await;
            }
        }
        tracing::info!(
            project_id = project.id,
            deleted = report.deleted,
            warnings = report.warnings.len(),
            "Project events removed"
        );
        report
    }

    pub async fn on_task_created(
        &self,
        task: &Task,
        assignee: &Employee,
        assigned_by: &str,
        project: Option<&Project>,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.credentials.is_configured() {
            return report;
        }
        if let Some(token) = self.token_for(assignee, &mut report).await {
            let event = events::task_deadline_event(task, assigned_by, project, &self.time_zone);
            self.create_linked(
                &token,
                assignee,
                EventSource::task(task.id),
                &event,
                &mut report,
            )
            .await;
        }
        report
    }

    pub async fn on_task_deleted(&self, task: &Task, assignee: &Employee) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.credentials.is_configured() {
            return report;
        }
        if let Some(token) = self.token_for(assignee, &mut report).await {
            self.delete_source_events(
                &token,
                assignee,
                EventSource::task(task.id),
                None,
                &mut report,
            )
            .await;
        }
        report
    }

    /// Places an arbitrary event in `employee`'s calendar. Unlike the
    /// mirroring hooks this reports failure to the caller.
    pub async fn create_custom_event(
        &self,
        employee: &Employee,
        request: CustomEventRequest,
    ) -> Result<RemoteEvent> {
        if !self.credentials.is_configured() {
            return Err(CalendarError::NotConfigured.into());
        }
        let event = request.into_event(&self.time_zone)?;
        let token = self
            .credentials
            .access_token(employee.id)
            .await
            .ok_or(CalendarError::NotConnected)?;
        let remote = self
            .retry
            .run("insert_event", || self.api.insert_event(&token, &event))
            .await?;
        tracing::info!(employee_id = employee.id, event_id = %remote.id, "Custom calendar event created");
        Ok(remote)
    }
}
