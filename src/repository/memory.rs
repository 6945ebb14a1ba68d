//! In-process repository used by service and handler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    ApprovalOutcome, CredentialRepository, EmployeeRepository, EventLinkRepository, LeaveRepository,
    ProjectRepository, RepoResult, RepositoryError, TaskRepository, UserRepository,
};
use crate::model::calendar::{CalendarCredentials, EventLink, EventSource};
use crate::model::employee::{Employee, EmployeeFilter, NewEmployee};
use crate::model::leave::{
    LeaveApplication, LeaveBalance, LeaveFilter, LeaveStatus, LeaveType, NewLeaveApplication,
    NewLeaveBalance, NewLeaveType,
};
use crate::model::project::{Collaborator, NewProject, Project};
use crate::model::task::{NewTask, Task, TaskFilter, TaskStatus};
use crate::model::user::{NewUser, RefreshTokenRecord, User};

#[derive(Default)]
struct Tables {
    next_id: u64,
    employees: Vec<Employee>,
    users: Vec<User>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    leave_types: Vec<LeaveType>,
    balances: Vec<LeaveBalance>,
    applications: Vec<LeaveApplication>,
    projects: Vec<Project>,
    collaborators: Vec<Collaborator>,
    tasks: Vec<Task>,
    credentials: HashMap<u64, CalendarCredentials>,
    links: Vec<EventLink>,
}

impl Tables {
    fn id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut tables)
    }

    pub fn applications(&self) -> Vec<LeaveApplication> {
        self.with(|t| t.applications.clone())
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.with(|t| t.tasks.clone())
    }

    pub fn links(&self) -> Vec<EventLink> {
        self.with(|t| t.links.clone())
    }
}

fn page<T: Clone>(rows: Vec<T>, page: u32, per_page: u32) -> (Vec<T>, i64) {
    let (limit, offset) = super::mysql::page_window(page, per_page);
    let total = rows.len() as i64;
    let rows = rows
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    (rows, total)
}

#[async_trait]
impl EmployeeRepository for MemoryStore {
    async fn insert(&self, employee: &NewEmployee) -> RepoResult<Employee> {
        self.with(|t| {
            if t.employees
                .iter()
                .any(|e| e.email == employee.email || e.employee_code == employee.employee_code)
            {
                return Err(RepositoryError::Duplicate(employee.email.clone()));
            }
            let row = Employee {
                id: t.id(),
                employee_code: employee.employee_code.clone(),
                first_name: employee.first_name.clone(),
                last_name: employee.last_name.clone(),
                email: employee.email.clone(),
                phone: employee.phone.clone(),
                address: employee.address.clone(),
                department: employee.department,
                position: employee.position.clone(),
                date_of_birth: employee.date_of_birth,
                joining_date: employee.joining_date,
                is_active: true,
            };
            t.employees.push(row.clone());
            Ok(row)
        })
    }

    async fn last_employee_code(&self, prefix: &str) -> RepoResult<Option<String>> {
        Ok(self.with(|t| {
            t.employees
                .iter()
                .map(|e| e.employee_code.clone())
                .filter(|c| {
                    c.strip_prefix(prefix).is_some_and(|digits| {
                        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
                    })
                })
                .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        }))
    }

    async fn find(&self, id: u64) -> RepoResult<Option<Employee>> {
        Ok(self.with(|t| t.employees.iter().find(|e| e.id == id).cloned()))
    }

    async fn find_many(&self, ids: &[u64]) -> RepoResult<Vec<Employee>> {
        Ok(self.with(|t| {
            t.employees
                .iter()
                .filter(|e| ids.contains(&e.id))
                .cloned()
                .collect()
        }))
    }

    async fn list(&self, filter: &EmployeeFilter) -> RepoResult<(Vec<Employee>, i64)> {
        let search = filter.search.as_deref().map(|s| s.trim().to_lowercase());
        let rows: Vec<Employee> = self.with(|t| {
            t.employees
                .iter()
                .rev()
                .filter(|e| filter.department.is_none_or(|d| e.department == Some(d)))
                .filter(|e| {
                    search.as_deref().is_none_or(|s| {
                        e.first_name.to_lowercase().contains(s)
                            || e.last_name.to_lowercase().contains(s)
                            || e.email.to_lowercase().contains(s)
                    })
                })
                .cloned()
                .collect()
        });
        Ok(page(rows, filter.page, filter.per_page))
    }

    async fn delete(&self, id: u64) -> RepoResult<bool> {
        Ok(self.with(|t| {
            let before = t.employees.len();
            t.employees.retain(|e| e.id != id);
            t.employees.len() != before
        }))
    }
}

#[async_trait]
impl LeaveRepository for MemoryStore {
    async fn insert_leave_type(&self, leave_type: &NewLeaveType) -> RepoResult<LeaveType> {
        self.with(|t| {
            if t.leave_types.iter().any(|lt| lt.name == leave_type.name) {
                return Err(RepositoryError::Duplicate(leave_type.name.clone()));
            }
            let row = LeaveType {
                id: t.id(),
                name: leave_type.name.clone(),
                default_days: leave_type.default_days,
                description: leave_type.description.clone(),
            };
            t.leave_types.push(row.clone());
            Ok(row)
        })
    }

    async fn list_leave_types(&self) -> RepoResult<Vec<LeaveType>> {
        Ok(self.with(|t| t.leave_types.clone()))
    }

    async fn find_leave_type(&self, id: u64) -> RepoResult<Option<LeaveType>> {
        Ok(self.with(|t| t.leave_types.iter().find(|lt| lt.id == id).cloned()))
    }

    async fn find_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> RepoResult<Option<LeaveBalance>> {
        Ok(self.with(|t| {
            t.balances
                .iter()
                .find(|b| {
                    b.employee_id == employee_id && b.leave_type_id == leave_type_id && b.year == year
                })
                .cloned()
        }))
    }

    async fn insert_balance(&self, balance: &NewLeaveBalance) -> RepoResult<LeaveBalance> {
        self.with(|t| {
            if t.balances.iter().any(|b| {
                b.employee_id == balance.employee_id
                    && b.leave_type_id == balance.leave_type_id
                    && b.year == balance.year
            }) {
                return Err(RepositoryError::Duplicate("leave balance".into()));
            }
            let row = LeaveBalance {
                id: t.id(),
                employee_id: balance.employee_id,
                leave_type_id: balance.leave_type_id,
                year: balance.year,
                total_days: balance.total_days,
                used_days: 0,
                remaining_days: balance.total_days,
            };
            t.balances.push(row.clone());
            Ok(row)
        })
    }

    async fn list_balances(&self, employee_id: u64, year: i32) -> RepoResult<Vec<LeaveBalance>> {
        Ok(self.with(|t| {
            t.balances
                .iter()
                .filter(|b| b.employee_id == employee_id && b.year == year)
                .cloned()
                .collect()
        }))
    }

    async fn insert_application(
        &self,
        application: &NewLeaveApplication,
    ) -> RepoResult<LeaveApplication> {
        Ok(self.with(|t| {
            let row = LeaveApplication {
                id: t.id(),
                employee_id: application.employee_id,
                leave_type_id: application.leave_type_id,
                start_date: application.start_date,
                end_date: application.end_date,
                total_days: application.total_days,
                reason: application.reason.clone(),
                status: LeaveStatus::Pending,
                reviewed_by: None,
                reviewed_at: None,
                admin_remarks: None,
                created_at: Utc::now(),
            };
            t.applications.push(row.clone());
            row
        }))
    }

    async fn find_application(&self, id: u64) -> RepoResult<Option<LeaveApplication>> {
        Ok(self.with(|t| t.applications.iter().find(|a| a.id == id).cloned()))
    }

    async fn list_applications(
        &self,
        filter: &LeaveFilter,
    ) -> RepoResult<(Vec<LeaveApplication>, i64)> {
        let rows: Vec<LeaveApplication> = self.with(|t| {
            t.applications
                .iter()
                .rev()
                .filter(|a| filter.employee_id.is_none_or(|id| a.employee_id == id))
                .filter(|a| filter.status.is_none_or(|s| a.status == s))
                .cloned()
                .collect()
        });
        Ok(page(rows, filter.page, filter.per_page))
    }

    async fn transition_application(
        &self,
        application: &LeaveApplication,
        expected: LeaveStatus,
    ) -> RepoResult<bool> {
        Ok(self.with(|t| {
            match t
                .applications
                .iter_mut()
                .find(|a| a.id == application.id && a.status == expected)
            {
                Some(row) => {
                    *row = application.clone();
                    true
                }
                None => false,
            }
        }))
    }

    async fn approve_application(
        &self,
        application: &LeaveApplication,
        balance_id: u64,
        days: u32,
    ) -> RepoResult<ApprovalOutcome> {
        Ok(self.with(|t| {
            let Some(row) = t
                .applications
                .iter_mut()
                .find(|a| a.id == application.id && a.status == LeaveStatus::Pending)
            else {
                return ApprovalOutcome::NotPending;
            };
            let Some(stored) = t
                .balances
                .iter_mut()
                .find(|b| b.id == balance_id && b.remaining_days >= days)
            else {
                return ApprovalOutcome::InsufficientBalance;
            };
            stored.used_days += days;
            stored.recompute();
            *row = application.clone();
            ApprovalOutcome::Approved
        }))
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn insert(&self, project: &NewProject) -> RepoResult<Project> {
        Ok(self.with(|t| {
            let row = Project {
                id: t.id(),
                name: project.name.clone(),
                description: project.description.clone(),
                start_date: project.start_date,
                end_date: project.end_date,
                status: project.status,
                priority: project.priority,
                created_by: project.created_by,
                created_at: Utc::now(),
            };
            t.projects.push(row.clone());
            row
        }))
    }

    async fn find(&self, id: u64) -> RepoResult<Option<Project>> {
        Ok(self.with(|t| t.projects.iter().find(|p| p.id == id).cloned()))
    }

    async fn list(&self, employee_id: Option<u64>) -> RepoResult<Vec<Project>> {
        Ok(self.with(|t| {
            t.projects
                .iter()
                .filter(|p| {
                    employee_id.is_none_or(|emp| {
                        t.collaborators
                            .iter()
                            .any(|c| c.project_id == p.id && c.employee_id == emp)
                    })
                })
                .cloned()
                .collect()
        }))
    }

    async fn update(&self, project: &Project) -> RepoResult<()> {
        self.with(|t| {
            if let Some(row) = t.projects.iter_mut().find(|p| p.id == project.id) {
                *row = project.clone();
            }
        });
        Ok(())
    }

    async fn delete(&self, id: u64) -> RepoResult<bool> {
        Ok(self.with(|t| {
            let before = t.projects.len();
            t.projects.retain(|p| p.id != id);
            t.collaborators.retain(|c| c.project_id != id);
            t.projects.len() != before
        }))
    }

    async fn collaborators(&self, project_id: u64) -> RepoResult<Vec<Collaborator>> {
        Ok(self.with(|t| {
            t.collaborators
                .iter()
                .filter(|c| c.project_id == project_id)
                .cloned()
                .collect()
        }))
    }

    async fn add_collaborator(&self, collaborator: &Collaborator) -> RepoResult<()> {
        self.with(|t| {
            if t.collaborators.iter().any(|c| {
                c.project_id == collaborator.project_id && c.employee_id == collaborator.employee_id
            }) {
                return Err(RepositoryError::Duplicate("project collaborator".into()));
            }
            t.collaborators.push(collaborator.clone());
            Ok(())
        })
    }

    async fn remove_collaborator(&self, project_id: u64, employee_id: u64) -> RepoResult<bool> {
        Ok(self.with(|t| {
            let before = t.collaborators.len();
            t.collaborators
                .retain(|c| !(c.project_id == project_id && c.employee_id == employee_id));
            t.collaborators.len() != before
        }))
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn insert(&self, task: &NewTask) -> RepoResult<Task> {
        Ok(self.with(|t| {
            let row = Task {
                id: t.id(),
                name: task.name.clone(),
                description: task.description.clone(),
                project_id: task.project_id,
                assigned_to: task.assigned_to,
                created_by: task.created_by,
                due_date: task.due_date,
                status: TaskStatus::Pending,
                priority: task.priority,
                completed_at: None,
                created_at: Utc::now(),
            };
            t.tasks.push(row.clone());
            row
        }))
    }

    async fn find(&self, id: u64) -> RepoResult<Option<Task>> {
        Ok(self.with(|t| t.tasks.iter().find(|task| task.id == id).cloned()))
    }

    async fn list(&self, filter: &TaskFilter) -> RepoResult<Vec<Task>> {
        Ok(self.with(|t| {
            t.tasks
                .iter()
                .filter(|task| filter.assigned_to.is_none_or(|a| task.assigned_to == a))
                .filter(|task| filter.project_id.is_none_or(|p| task.project_id == Some(p)))
                .filter(|task| filter.status.is_none_or(|s| task.status == s))
                .cloned()
                .collect()
        }))
    }

    async fn update(&self, task: &Task) -> RepoResult<()> {
        self.with(|t| {
            if let Some(row) = t.tasks.iter_mut().find(|row| row.id == task.id) {
                *row = task.clone();
            }
        });
        Ok(())
    }

    async fn delete(&self, id: u64) -> RepoResult<bool> {
        Ok(self.with(|t| {
            let before = t.tasks.len();
            t.tasks.retain(|task| task.id != id);
            t.tasks.len() != before
        }))
    }
}

#[async_trait]
impl CredentialRepository for MemoryStore {
    async fn upsert(&self, credentials: &CalendarCredentials) -> RepoResult<()> {
        self.with(|t| {
            t.credentials
                .insert(credentials.employee_id, credentials.clone());
        });
        Ok(())
    }

    async fn find(&self, employee_id: u64) -> RepoResult<Option<CalendarCredentials>> {
        Ok(self.with(|t| t.credentials.get(&employee_id).cloned()))
    }

    async fn update_token(
        &self,
        employee_id: u64,
        token: &str,
        expiry: Option<DateTime<Utc>>,
    ) -> RepoResult<()> {
        self.with(|t| {
            if let Some(row) = t.credentials.get_mut(&employee_id) {
                row.token = token.to_string();
                row.expiry = expiry;
            }
        });
        Ok(())
    }

    async fn delete(&self, employee_id: u64) -> RepoResult<bool> {
        Ok(self.with(|t| t.credentials.remove(&employee_id).is_some()))
    }
}

#[async_trait]
impl EventLinkRepository for MemoryStore {
    async fn record(&self, link: &EventLink) -> RepoResult<()> {
        self.with(|t| t.links.push(link.clone()));
        Ok(())
    }

    async fn find(&self, employee_id: u64, source: EventSource) -> RepoResult<Vec<EventLink>> {
        Ok(self.with(|t| {
            t.links
                .iter()
                .filter(|l| l.employee_id == employee_id && l.source() == source)
                .cloned()
                .collect()
        }))
    }

    async fn remove(&self, employee_id: u64, event_id: &str) -> RepoResult<()> {
        self.with(|t| {
            t.links
                .retain(|l| !(l.employee_id == employee_id && l.event_id == event_id))
        });
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &NewUser) -> RepoResult<u64> {
        self.with(|t| {
            let username = user.username.to_lowercase();
            if t.users.iter().any(|u| u.username == username) {
                return Err(RepositoryError::Duplicate(username));
            }
            let id = t.id();
            t.users.push(User {
                id,
                username,
                password: user.password_hash.clone(),
                role_id: user.role.id(),
                employee_id: user.employee_id,
                is_active: true,
            });
            Ok(id)
        })
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let username = username.to_lowercase();
        Ok(self.with(|t| t.users.iter().find(|u| u.username == username).cloned()))
    }

    async fn exists(&self, username: &str) -> RepoResult<bool> {
        let username = username.to_lowercase();
        Ok(self.with(|t| t.users.iter().any(|u| u.username == username)))
    }

    async fn touch_last_login(&self, _user_id: u64) -> RepoResult<()> {
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        _expires_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        self.with(|t| {
            let id = t.id();
            t.refresh_tokens.insert(
                jti.to_string(),
                RefreshTokenRecord {
                    id,
                    user_id,
                    revoked: false,
                },
            );
        });
        Ok(())
    }

    async fn find_refresh_token(&self, jti: &str) -> RepoResult<Option<RefreshTokenRecord>> {
        Ok(self.with(|t| t.refresh_tokens.get(jti).cloned()))
    }

    async fn revoke_refresh_token(&self, jti: &str) -> RepoResult<()> {
        self.with(|t| {
            if let Some(record) = t.refresh_tokens.get_mut(jti) {
                record.revoked = true;
            }
        });
        Ok(())
    }
}
