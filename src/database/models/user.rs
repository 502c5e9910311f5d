use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::database::manager::DatabaseError;
use crate::database::store::{from_record, record_i64, returned_id, RelationalStore};
use crate::database::clock::timestamp_now;
use crate::params;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Stored user row. Never serialized to clients directly; see [`PublicUser`].
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";

pub async fn find_by_email(store: &dyn RelationalStore, email: &str) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {} FROM Users WHERE email = ?", USER_COLUMNS);
    store.query_one(&sql, &params![email]).await?.map(from_record).transpose()
}

pub async fn find_by_id(store: &dyn RelationalStore, id: i64) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {} FROM Users WHERE id = ?", USER_COLUMNS);
    store.query_one(&sql, &params![id]).await?.map(from_record).transpose()
}

pub async fn insert(
    store: &dyn RelationalStore,
    username: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<i64, DatabaseError> {
    let now = timestamp_now();
    let row = store
        .query_one(
            "INSERT INTO Users (username, email, password_hash, role, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
            &params![username, email, password_hash, role.as_str(), now.as_str(), now.as_str()],
        )
        .await?;
    returned_id(row)
}

pub async fn update_password_hash(
    store: &dyn RelationalStore,
    id: i64,
    password_hash: &str,
) -> Result<u64, DatabaseError> {
    let result = store
        .execute(
            "UPDATE Users SET password_hash = ?, updated_at = ? WHERE id = ?",
            &params![password_hash, timestamp_now(), id],
        )
        .await?;
    Ok(result.rows_affected)
}

pub async fn count(store: &dyn RelationalStore) -> Result<i64, DatabaseError> {
    let row = store.query_one("SELECT COUNT(*) AS count FROM Users", &[]).await?;
    Ok(row.as_ref().and_then(|r| record_i64(r, "count")).unwrap_or(0))
}
