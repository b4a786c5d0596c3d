use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,                   // unique user ID
    pub email: String,              // unique, lowercased
    pub username: String,           // display name
    pub password_hash: String,      // Argon2id PHC string
    pub is_admin: bool,             // role flag
    pub created_at: OffsetDateTime, // creation timestamp
}

/// Values needed to insert a user; id and timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
}
