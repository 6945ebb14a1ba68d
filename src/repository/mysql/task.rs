use async_trait::async_trait;

use super::MySqlStore;
use crate::model::task::{NewTask, Task, TaskFilter, TaskStatus};
use crate::repository::{RepoResult, TaskRepository};

const TASK_COLUMNS: &str = "id, name, description, project_id, assigned_to, created_by, \
     due_date, status, priority, completed_at, created_at";

enum FilterValue {
    U64(u64),
    Status(TaskStatus),
}

#[async_trait]
impl TaskRepository for MySqlStore {
    async fn insert(&self, task: &NewTask) -> RepoResult<Task> {
        let result = sqlx::query(
            r#"
            INSERT INTO tasks
            (name, description, project_id, assigned_to, created_by, due_date, status, priority)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.project_id)
        .bind(task.assigned_to)
        .bind(task.created_by)
        .bind(task.due_date)
        .bind(TaskStatus::Pending)
        .bind(task.priority)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?");
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(result.last_insert_id())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find(&self, id: u64) -> RepoResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?");
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list(&self, filter: &TaskFilter) -> RepoResult<Vec<Task>> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args = Vec::new();

        if let Some(assignee) = filter.assigned_to {
            where_sql.push_str(" AND assigned_to = ?");
            args.push(FilterValue::U64(assignee));
        }
        if let Some(project_id) = filter.project_id {
            where_sql.push_str(" AND project_id = ?");
            args.push(FilterValue::U64(project_id));
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Status(status));
        }

        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks{where_sql} ORDER BY due_date");
        let mut query = sqlx::query_as::<_, Task>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Status(s) => query.bind(s),
            };
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn update(&self, task: &Task) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET name = ?, description = ?, project_id = ?, assigned_to = ?, due_date = ?,
                status = ?, priority = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.project_id)
        .bind(task.assigned_to)
        .bind(task.due_date)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.completed_at)
        .bind(task.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: u64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
