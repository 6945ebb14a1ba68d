use async_trait::async_trait;

use super::{MySqlStore, page_window};
use crate::model::leave::{
    LeaveApplication, LeaveBalance, LeaveFilter, LeaveStatus, LeaveType, NewLeaveApplication,
    NewLeaveBalance, NewLeaveType,
};
use crate::repository::{ApprovalOutcome, LeaveRepository, RepoResult};

const APPLICATION_COLUMNS: &str = "id, employee_id, leave_type_id, start_date, end_date, \
     total_days, reason, status, reviewed_by, reviewed_at, admin_remarks, created_at";

const BALANCE_COLUMNS: &str =
    "id, employee_id, leave_type_id, year, total_days, used_days, remaining_days";

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Status(LeaveStatus),
}

#[async_trait]
impl LeaveRepository for MySqlStore {
    async fn insert_leave_type(&self, leave_type: &NewLeaveType) -> RepoResult<LeaveType> {
        let result = sqlx::query(
            "INSERT INTO leave_types (name, default_days, description) VALUES (?, ?, ?)",
        )
        .bind(&leave_type.name)
        .bind(leave_type.default_days)
        .bind(&leave_type.description)
        .execute(&self.pool)
        .await?;

        Ok(LeaveType {
            id: result.last_insert_id(),
            name: leave_type.name.clone(),
            default_days: leave_type.default_days,
            description: leave_type.description.clone(),
        })
    }

    async fn list_leave_types(&self) -> RepoResult<Vec<LeaveType>> {
        Ok(sqlx::query_as::<_, LeaveType>(
            "SELECT id, name, default_days, description FROM leave_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_leave_type(&self, id: u64) -> RepoResult<Option<LeaveType>> {
        Ok(sqlx::query_as::<_, LeaveType>(
            "SELECT id, name, default_days, description FROM leave_types WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> RepoResult<Option<LeaveBalance>> {
        let sql = format!(
            "SELECT {BALANCE_COLUMNS} FROM leave_balances \
             WHERE employee_id = ? AND leave_type_id = ? AND year = ?"
        );
        Ok(sqlx::query_as::<_, LeaveBalance>(&sql)
            .bind(employee_id)
            .bind(leave_type_id)
            .bind(year)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_balance(&self, balance: &NewLeaveBalance) -> RepoResult<LeaveBalance> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_balances
                (employee_id, leave_type_id, year, total_days, used_days, remaining_days)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(balance.employee_id)
        .bind(balance.leave_type_id)
        .bind(balance.year)
        .bind(balance.total_days)
        .bind(balance.total_days)
        .execute(&self.pool)
        .await?;

        Ok(LeaveBalance {
            id: result.last_insert_id(),
            employee_id: balance.employee_id,
            leave_type_id: balance.leave_type_id,
            year: balance.year,
            total_days: balance.total_days,
            used_days: 0,
            remaining_days: balance.total_days,
        })
    }

    async fn list_balances(&self, employee_id: u64, year: i32) -> RepoResult<Vec<LeaveBalance>> {
        let sql = format!(
            "SELECT {BALANCE_COLUMNS} FROM leave_balances \
             WHERE employee_id = ? AND year = ? ORDER BY leave_type_id"
        );
        Ok(sqlx::query_as::<_, LeaveBalance>(&sql)
            .bind(employee_id)
            .bind(year)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_application(
        &self,
        application: &NewLeaveApplication,
    ) -> RepoResult<LeaveApplication> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_applications
                (employee_id, leave_type_id, start_date, end_date, total_days, reason, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(application.employee_id)
        .bind(application.leave_type_id)
        .bind(application.start_date)
        .bind(application.end_date)
        .bind(application.total_days)
        .bind(&application.reason)
        .bind(LeaveStatus::Pending)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM leave_applications WHERE id = ?");
        Ok(sqlx::query_as::<_, LeaveApplication>(&sql)
            .bind(result.last_insert_id())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_application(&self, id: u64) -> RepoResult<Option<LeaveApplication>> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM leave_applications WHERE id = ?");
        Ok(sqlx::query_as::<_, LeaveApplication>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_applications(
        &self,
        filter: &LeaveFilter,
    ) -> RepoResult<(Vec<LeaveApplication>, i64)> {
        let (limit, offset) = page_window(filter.page, filter.per_page);

        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(emp_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(emp_id));
        }

        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Status(status));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_applications{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Status(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM leave_applications{where_sql} \
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, LeaveApplication>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Status(s) => data_q.bind(s),
            };
        }
        let applications = data_q
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((applications, total))
    }

    async fn transition_application(
        &self,
        application: &LeaveApplication,
        expected: LeaveStatus,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_applications
            SET status = ?, reviewed_by = ?, reviewed_at = ?, admin_remarks = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(application.status)
        .bind(application.reviewed_by)
        .bind(application.reviewed_at)
        .bind(&application.admin_remarks)
        .bind(application.id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn approve_application(
        &self,
        application: &LeaveApplication,
        balance_id: u64,
        days: u32,
    ) -> RepoResult<ApprovalOutcome> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE leave_applications
            SET status = ?, reviewed_by = ?, reviewed_at = ?, admin_remarks = ?
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(application.status)
        .bind(application.reviewed_by)
        .bind(application.reviewed_at)
        .bind(&application.admin_remarks)
        .bind(application.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(ApprovalOutcome::NotPending);
        }

        // Relative to the stored row; MySQL evaluates SET left to right, so
        // remaining_days sees the new used_days.
        let deducted = sqlx::query(
            r#"
            UPDATE leave_balances
            SET used_days = used_days + ?, remaining_days = total_days - used_days
            WHERE id = ?
            AND remaining_days >= ?
            "#,
        )
        .bind(days)
        .bind(balance_id)
        .bind(days)
        .execute(&mut *tx)
        .await?;

        if deducted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(ApprovalOutcome::InsufficientBalance);
        }

        tx.commit().await?;
        Ok(ApprovalOutcome::Approved)
    }
}
