use async_trait::async_trait;

use super::MySqlStore;
use crate::model::project::{Collaborator, NewProject, Project};
use crate::repository::{ProjectRepository, RepoResult};

const PROJECT_COLUMNS: &str =
    "p.id, p.name, p.description, p.start_date, p.end_date, p.status, p.priority, p.created_by, p.created_at";

#[async_trait]
impl ProjectRepository for MySqlStore {
    async fn insert(&self, project: &NewProject) -> RepoResult<Project> {
        let result = sqlx::query(
            r#"
            INSERT INTO projects
            (name, description, start_date, end_date, status, priority, created_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(project.status)
        .bind(project.priority)
        .bind(project.created_by)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?");
        Ok(sqlx::query_as::<_, Project>(&sql)
            .bind(result.last_insert_id())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find(&self, id: u64) -> RepoResult<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?");
        Ok(sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list(&self, employee_id: Option<u64>) -> RepoResult<Vec<Project>> {
        let projects = match employee_id {
            Some(employee_id) => {
                let sql = format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects p \
                     JOIN project_collaborators c ON c.project_id = p.id \
                     WHERE c.employee_id = ? ORDER BY p.end_date"
                );
                sqlx::query_as::<_, Project>(&sql)
                    .bind(employee_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects p ORDER BY p.end_date");
                sqlx::query_as::<_, Project>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(projects)
    }

    async fn update(&self, project: &Project) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE projects
            SET name = ?, description = ?, start_date = ?, end_date = ?, status = ?, priority = ?
            WHERE id = ?
            "#,
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(project.status)
        .bind(project.priority)
        .bind(project.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: u64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn collaborators(&self, project_id: u64) -> RepoResult<Vec<Collaborator>> {
        Ok(sqlx::query_as::<_, Collaborator>(
            "SELECT project_id, employee_id, role FROM project_collaborators WHERE project_id = ?",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn add_collaborator(&self, collaborator: &Collaborator) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO project_collaborators (project_id, employee_id, role) VALUES (?, ?, ?)",
        )
        .bind(collaborator.project_id)
        .bind(collaborator.employee_id)
        .bind(collaborator.role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_collaborator(&self, project_id: u64, employee_id: u64) -> RepoResult<bool> {
        let result = sqlx::query(
            "DELETE FROM project_collaborators WHERE project_id = ? AND employee_id = ?",
        )
        .bind(project_id)
        .bind(employee_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
