use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::documents;

/// Default read model for a stored document. Deliberately omits
/// `password_hash`; handlers that need the hash go through
/// [`DocumentSecret`] instead, so the hash cannot end up in a response
/// by accident.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = documents)]
pub struct Document {
    pub id: Uuid,
    pub owner_email: String,
    pub original_name: String,
    pub storage_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub checksum: String,
    pub protected: bool,
    pub tags: Vec<String>,
    pub created_at: NaiveDateTime,
}

/// Internal verification view: the protection flag and the stored hash,
/// nothing else. Never serialized.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = documents)]
pub struct DocumentSecret {
    pub protected: bool,
    pub password_hash: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: Uuid,
    pub owner_email: String,
    pub original_name: String,
    pub storage_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub checksum: String,
    pub protected: bool,
    pub tags: Vec<String>,
}
