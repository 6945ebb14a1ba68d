use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::calendar::sync::{CalendarSync, SyncReport};
use crate::error::{AppError, Result};
use crate::model::employee::Employee;
use crate::model::project::{
    Collaborator, CollaboratorRole, NewProject, Priority, Project, ProjectStatus,
    validate_project_dates,
};
use crate::model::task::{NewTask, Task, TaskFilter, TaskStatus};
use crate::repository::{EmployeeRepository, ProjectRepository, RepositoryError, TaskRepository};

fn default_role() -> CollaboratorRole {
    CollaboratorRole::Member
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CollaboratorInput {
    #[schema(example = 3)]
    pub employee_id: u64,
    #[serde(default = "default_role")]
    pub role: CollaboratorRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectInput {
    #[schema(example = "Atlas")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = "2026-03-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-05-01", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    #[serde(default)]
    pub collaborators: Vec<CollaboratorInput>,
}

/// Partial update; `collaborators`, when present, replaces the whole set.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub collaborators: Option<Vec<CollaboratorInput>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub collaborators: Vec<Collaborator>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskInput {
    #[schema(example = "Write migration")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub project_id: Option<u64>,
    #[schema(example = 3)]
    pub assigned_to: u64,
    #[schema(example = "2026-03-20", format = "date", value_type = String)]
    pub due_date: NaiveDate,
    pub priority: Option<Priority>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(format = "date", value_type = Option<String>)]
    pub due_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
}

/// Project and task records. Every mutation returns the calendar
/// [`SyncReport`] alongside its result.
pub struct ProjectService {
    projects: Arc<dyn ProjectRepository>,
    tasks: Arc<dyn TaskRepository>,
    employees: Arc<dyn EmployeeRepository>,
    sync: Arc<CalendarSync>,
}

fn required_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation(format!("{what} name is required")));
    }
    Ok(name.to_string())
}

/// First occurrence wins for repeated employee ids.
fn dedup_collaborators(input: Vec<CollaboratorInput>) -> Vec<CollaboratorInput> {
    let mut seen = HashSet::new();
    input
        .into_iter()
        .filter(|c| seen.insert(c.employee_id))
        .collect()
}

impl ProjectService {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        tasks: Arc<dyn TaskRepository>,
        employees: Arc<dyn EmployeeRepository>,
        sync: Arc<CalendarSync>,
    ) -> Self {
        Self {
            projects,
            tasks,
            employees,
            sync,
        }
    }

    async fn find_project(&self, id: u64) -> Result<Project> {
        self.projects
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Project"))
    }

    async fn find_employee(&self, id: u64) -> Result<Employee> {
        self.employees
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee"))
    }

    /// Loads `ids`, failing if any of them is unknown.
    async fn employees_exactly(&self, ids: &[u64]) -> Result<Vec<Employee>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = self.employees.find_many(ids).await?;
        if let Some(missing) = ids.iter().find(|id| !found.iter().any(|e| e.id == **id)) {
            return Err(AppError::validation(format!("Unknown employee id {missing}")));
        }
        Ok(found)
    }

    async fn collaborator_employees(&self, project_id: u64) -> Result<Vec<Employee>> {
        let ids: Vec<u64> = self
            .projects
            .collaborators(project_id)
            .await?
            .into_iter()
            .map(|c| c.employee_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.employees.find_many(&ids).await?)
    }

    pub async fn create(
        &self,
        input: ProjectInput,
        created_by: u64,
    ) -> Result<(ProjectDetail, SyncReport)> {
        let name = required_name(&input.name, "Project")?;
        validate_project_dates(input.start_date, input.end_date)?;
        let requested = dedup_collaborators(input.collaborators);
        let ids: Vec<u64> = requested.iter().map(|c| c.employee_id).collect();
        let team = self.employees_exactly(&ids).await?;

        let project = self
            .projects
            .insert(&NewProject {
                name,
                description: input.description,
                start_date: input.start_date,
                end_date: input.end_date,
                status: input.status.unwrap_or(ProjectStatus::Planning),
                priority: input.priority.unwrap_or(Priority::Medium),
                created_by,
            })
            .await?;

        let mut collaborators = Vec::with_capacity(requested.len());
        for c in requested {
            let collaborator = Collaborator {
                project_id: project.id,
                employee_id: c.employee_id,
                role: c.role,
            };
            self.projects.add_collaborator(&collaborator).await?;
            collaborators.push(collaborator);
        }
        tracing::info!(
            project_id = project.id,
            collaborators = collaborators.len(),
            "Project created"
        );

        let report = self.sync.on_project_created(&project, &team).await;
        Ok((
            ProjectDetail {
                project,
                collaborators,
            },
            report,
        ))
    }

    pub async fn get(&self, id: u64) -> Result<ProjectDetail> {
        let project = self.find_project(id).await?;
        let collaborators = self.projects.collaborators(id).await?;
        Ok(ProjectDetail {
            project,
            collaborators,
        })
    }

    pub async fn list(&self, employee_id: Option<u64>) -> Result<Vec<Project>> {
        Ok(self.projects.list(employee_id).await?)
    }

    pub async fn update(
        &self,
        id: u64,
        update: ProjectUpdate,
    ) -> Result<(ProjectDetail, SyncReport)> {
        let previous = self.find_project(id).await?;
        let mut project = previous.clone();
        if let Some(name) = update.name {
            project.name = required_name(&name, "Project")?;
        }
        if let Some(description) = update.description {
            project.description = description;
        }
        project.start_date = update.start_date.unwrap_or(project.start_date);
        project.end_date = update.end_date.unwrap_or(project.end_date);
        project.status = update.status.unwrap_or(project.status);
        project.priority = update.priority.unwrap_or(project.priority);
        validate_project_dates(project.start_date, project.end_date)?;

        let current = self.projects.collaborators(id).await?;
        let (added, removed, unaffected_ids) = match update.collaborators {
            Some(requested) => {
                let requested = dedup_collaborators(requested);
                let ids: Vec<u64> = requested.iter().map(|c| c.employee_id).collect();
                self.employees_exactly(&ids).await?;

                let removed: Vec<u64> = current
                    .iter()
                    .filter(|c| !ids.contains(&c.employee_id))
                    .map(|c| c.employee_id)
                    .collect();
                let mut added = Vec::new();
                let mut unaffected = Vec::new();
                for c in requested {
                    match current.iter().find(|existing| existing.employee_id == c.employee_id) {
                        Some(existing) => {
                            if existing.role != c.role {
                                // role change only, calendar untouched
                                self.projects.remove_collaborator(id, c.employee_id).await?;
                                self.projects
                                    .add_collaborator(&Collaborator {
                                        project_id: id,
                                        employee_id: c.employee_id,
                                        role: c.role,
                                    })
                                    .await?;
                            }
                            unaffected.push(c.employee_id);
                        }
                        None => added.push(c),
                    }
                }
                (added, removed, unaffected)
            }
            None => (
                Vec::new(),
                Vec::new(),
                current.iter().map(|c| c.employee_id).collect(),
            ),
        };

        self.projects.update(&project).await?;
        tracing::info!(
            project_id = id,
            added = added.len(),
            removed = removed.len(),
            "Project updated"
        );

        let mut report = SyncReport::default();
        if project.calendar_fields_changed(&previous) && !unaffected_ids.is_empty() {
            let unaffected = self.employees.find_many(&unaffected_ids).await?;
            report.merge(
                self.sync
                    .on_project_dates_changed(&previous, &project, &unaffected)
                    .await,
            );
        }

        for employee_id in removed {
            self.projects.remove_collaborator(id, employee_id).await?;
            if let Some(employee) = self.employees.find(employee_id).await? {
                report.merge(self.sync.on_collaborator_removed(&previous, &employee).await);
            }
        }

        for c in added {
            self.projects
                .add_collaborator(&Collaborator {
                    project_id: id,
                    employee_id: c.employee_id,
                    role: c.role,
                })
                .await?;
            if let Some(employee) = self.employees.find(c.employee_id).await? {
                report.merge(self.sync.on_collaborator_added(&project, &employee).await);
            }
        }

        let collaborators = self.projects.collaborators(id).await?;
        Ok((
            ProjectDetail {
                project,
                collaborators,
            },
            report,
        ))
    }

    /// Removes the project's tasks and calendar events, then the project.
    pub async fn delete(&self, id: u64) -> Result<SyncReport> {
        let project = self.find_project(id).await?;
        let mut report = SyncReport::default();

        let tasks = self
            .tasks
            .list(&TaskFilter {
                project_id: Some(id),
                ..TaskFilter::default()
            })
            .await?;
        for task in tasks {
            report.merge(self.delete_task_record(&task).await?);
        }

        let team = self.collaborator_employees(id).await?;
        report.merge(self.sync.on_project_deleted(&project, &team).await);

        self.projects.delete(id).await?;
        tracing::info!(
            project_id = id,
            warnings = report.warnings.len(),
            "Project deleted"
        );
        Ok(report)
    }

    pub async fn add_collaborator(
        &self,
        project_id: u64,
        input: CollaboratorInput,
    ) -> Result<(Collaborator, SyncReport)> {
        let project = self.find_project(project_id).await?;
        let employee = self.find_employee(input.employee_id).await?;

        let collaborator = Collaborator {
            project_id,
            employee_id: employee.id,
            role: input.role,
        };
        self.projects
            .add_collaborator(&collaborator)
            .await
            .map_err(|e| match e {
                RepositoryError::Duplicate(_) => {
                    AppError::Conflict("Employee is already a collaborator".into())
                }
                other => other.into(),
            })?;
        tracing::info!(project_id, employee_id = employee.id, "Collaborator added");

        let report = self.sync.on_collaborator_added(&project, &employee).await;
        Ok((collaborator, report))
    }

    pub async fn remove_collaborator(&self, project_id: u64, employee_id: u64) -> Result<SyncReport> {
        let project = self.find_project(project_id).await?;
        if !self
            .projects
            .remove_collaborator(project_id, employee_id)
            .await?
        {
            return Err(AppError::not_found("Collaborator"));
        }
        tracing::info!(project_id, employee_id, "Collaborator removed");

        Ok(match self.employees.find(employee_id).await? {
            Some(employee) => self.sync.on_collaborator_removed(&project, &employee).await,
            None => SyncReport::default(),
        })
    }

    /// `assigned_by` is the creator's display name used in the event text.
    pub async fn create_task(
        &self,
        input: TaskInput,
        created_by: u64,
        assigned_by: &str,
    ) -> Result<(Task, SyncReport)> {
        let name = required_name(&input.name, "Task")?;
        let assignee = self.find_employee(input.assigned_to).await?;

        let project = match input.project_id {
            Some(project_id) => {
                let project = self.find_project(project_id).await?;
                let collaborators = self.projects.collaborators(project_id).await?;
                if !collaborators.iter().any(|c| c.employee_id == assignee.id) {
                    return Err(AppError::validation(
                        "The assignee must be a collaborator on the project",
                    ));
                }
                Some(project)
            }
            None => None,
        };

        let task = self
            .tasks
            .insert(&NewTask {
                name,
                description: input.description,
                project_id: input.project_id,
                assigned_to: assignee.id,
                created_by,
                due_date: input.due_date,
                priority: input.priority.unwrap_or(Priority::Medium),
            })
            .await?;
        tracing::info!(task_id = task.id, assigned_to = assignee.id, "Task created");

        let report = self
            .sync
            .on_task_created(&task, &assignee, assigned_by, project.as_ref())
            .await;
        Ok((task, report))
    }

    pub async fn get_task(&self, id: u64) -> Result<Task> {
        self.tasks
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Task"))
    }

    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        Ok(self.tasks.list(filter).await?)
    }

    pub async fn update_task(&self, id: u64, update: TaskUpdate) -> Result<Task> {
        let mut task = self.get_task(id).await?;
        if let Some(name) = update.name {
            task.name = required_name(&name, "Task")?;
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        task.due_date = update.due_date.unwrap_or(task.due_date);
        task.priority = update.priority.unwrap_or(task.priority);
        if let Some(status) = update.status {
            task.completed_at = match status {
                TaskStatus::Completed => task.completed_at.or_else(|| Some(Utc::now())),
                _ => None,
            };
            task.status = status;
        }

        self.tasks.update(&task).await?;
        tracing::info!(task_id = id, status = %task.status, "Task updated");
        Ok(task)
    }

    pub async fn mark_task_completed(&self, id: u64, actor_employee_id: u64) -> Result<Task> {
        let mut task = self.get_task(id).await?;
        task.mark_completed(actor_employee_id, Utc::now())?;
        self.tasks.update(&task).await?;
        tracing::info!(task_id = id, "Task completed");
        Ok(task)
    }

    pub async fn delete_task(&self, id: u64) -> Result<SyncReport> {
        let task = self.get_task(id).await?;
        self.delete_task_record(&task).await
    }

    async fn delete_task_record(&self, task: &Task) -> Result<SyncReport> {
        let report = match self.employees.find(task.assigned_to).await? {
            Some(assignee) => self.sync.on_task_deleted(task, &assignee).await,
            None => SyncReport::default(),
        };
        self.tasks.delete(task.id).await?;
        tracing::info!(task_id = task.id, "Task deleted");
        Ok(report)
    }
}
