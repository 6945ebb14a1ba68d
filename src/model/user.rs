use sqlx::FromRow;

use crate::model::role::Role;

/// Login account; linked to an employee record for self-service users.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    /// argon2 PHC string
    pub password: String,
    pub role_id: u8,
    pub employee_id: Option<u64>,
    pub is_active: bool,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::from_id(self.role_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub employee_id: Option<u64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    pub id: u64,
    pub user_id: u64,
    pub revoked: bool,
}
