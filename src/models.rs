use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Student {
    pub id: i64,
    pub fname: String,
    pub lname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub file: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub password_hash: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StudentChanges {
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub password_hash: String,
}

/// A file attached to the registration form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Fields of the registration form, collected from the multipart body.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub password: String,
    pub cpassword: String,
    pub register: bool,
    pub file: Option<Upload>,
    /// Set when the file part ran past the upload limit and was dropped.
    pub file_too_large: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStudent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub fname: String,
    #[serde(default)]
    pub lname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub update: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    pub fn parse(&self) -> Option<i64> {
        self.id
            .as_deref()
            .and_then(|id| id.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
    }
}
