//! sqlx/MySQL adapters for the repository ports.

use sqlx::MySqlPool;

mod calendar;
mod employee;
mod leave;
mod project;
mod task;
mod user;

/// One pool-backed store implementing every repository port.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Normalizes 1-based paging input into (limit, offset).
pub(crate) fn page_window(page: u32, per_page: u32) -> (i64, i64) {
    let per_page = per_page.clamp(1, 100);
    let page = page.max(1);
    let per_page = i64::from(per_page);
    (per_page, i64::from(page - 1) * per_page)
}
