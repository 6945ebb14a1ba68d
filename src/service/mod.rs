//! Domain services: orchestration over the repository ports.

use chrono::{Datelike, Local};

pub mod employee;
pub mod ledger;
pub mod leave;
pub mod project;

/// Calendar year that new balances are opened for.
pub fn current_year() -> i32 {
    Local::now().year()
}
