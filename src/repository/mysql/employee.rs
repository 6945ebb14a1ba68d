use async_trait::async_trait;

use super::{MySqlStore, page_window};
use crate::model::employee::{Employee, EmployeeFilter, NewEmployee};
use crate::repository::{EmployeeRepository, RepoResult};

const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, phone, address, \
     department, position, date_of_birth, joining_date, is_active";

#[async_trait]
impl EmployeeRepository for MySqlStore {
    async fn insert(&self, employee: &NewEmployee) -> RepoResult<Employee> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees
            (employee_code, first_name, last_name, email, phone, address,
             department, position, date_of_birth, joining_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&employee.employee_code)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.address)
        .bind(employee.department)
        .bind(&employee.position)
        .bind(employee.date_of_birth)
        .bind(employee.joining_date)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id();
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn last_employee_code(&self, prefix: &str) -> RepoResult<Option<String>> {
        // Only prefix-plus-digits codes are sequenced. Longer codes sort after
        // shorter ones: EMP1000 follows EMP999.
        let code = sqlx::query_scalar::<_, String>(
            r#"
            SELECT employee_code
            FROM employees
            WHERE employee_code REGEXP CONCAT('^', ?, '[0-9]+$')
            ORDER BY CHAR_LENGTH(employee_code) DESC, employee_code DESC
            LIMIT 1
            "#,
        )
        .bind(prefix)
        .fetch_optional(&self.pool)
        .await?;
        Ok(code)
    }

    async fn find(&self, id: u64) -> RepoResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_many(&self, ids: &[u64]) -> RepoResult<Vec<Employee>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id IN ({placeholders}) ORDER BY id"
        );
        let mut query = sqlx::query_as::<_, Employee>(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn list(&self, filter: &EmployeeFilter) -> RepoResult<(Vec<Employee>, i64)> {
        let (limit, offset) = page_window(filter.page, filter.per_page);

        // ---------- build WHERE clause dynamically ----------
        let mut conditions = Vec::new();
        let mut bindings: Vec<String> = Vec::new();

        if let Some(department) = filter.department {
            conditions.push("department = ?");
            bindings.push(department.to_string());
        }

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            conditions.push("(first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
            let like = format!("%{}%", search.trim());
            bindings.push(like.clone());
            bindings.push(like.clone());
            bindings.push(like);
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM employees {where_clause}");
        tracing::debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for b in &bindings {
            count_query = count_query.bind(b);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause} ORDER BY id DESC LIMIT ? OFFSET ?"
        );
        let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
        for b in &bindings {
            data_query = data_query.bind(b);
        }
        let employees = data_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((employees, total))
    }

    async fn delete(&self, id: u64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
