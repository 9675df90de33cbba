use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::models::{NewStudent, Student, StudentChanges};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS student (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fname TEXT NOT NULL,
    lname TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password TEXT NOT NULL,
    file TEXT,
    created_at TEXT NOT NULL
)";

/// Failure of a write that may collide with the email constraint.
#[derive(Debug)]
pub enum WriteError {
    EmailTaken,
    Database(sqlx::Error),
}

impl From<sqlx::Error> for WriteError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            WriteError::EmailTaken
        } else {
            WriteError::Database(err)
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            // SQLITE_CONSTRAINT_UNIQUE
            db.code().as_deref() == Some("2067")
                || db.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}

pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}

pub async fn email_taken(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, i64>("SELECT id FROM student WHERE email = ? LIMIT 1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn insert_student(pool: &SqlitePool, student: &NewStudent) -> Result<i64, WriteError> {
    let res = sqlx::query(
        "INSERT INTO student (fname, lname, email, password, file, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&student.fname)
    .bind(&student.lname)
    .bind(&student.email)
    .bind(&student.password_hash)
    .bind(&student.file)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(res.last_insert_rowid())
}

/// Returns `false` when no row has the given id.
pub async fn update_student(
    pool: &SqlitePool,
    id: i64,
    changes: &StudentChanges,
) -> Result<bool, WriteError> {
    let res = sqlx::query(
        "UPDATE student SET fname = ?, lname = ?, email = ?, password = ? WHERE id = ?",
    )
    .bind(&changes.fname)
    .bind(&changes.lname)
    .bind(&changes.email)
    .bind(&changes.password_hash)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() >= 1)
}

pub async fn find_student(pool: &SqlitePool, id: i64) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>("SELECT * FROM student WHERE id = ? LIMIT 1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// All students, newest first.
pub async fn list_students(pool: &SqlitePool) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>("SELECT * FROM student ORDER BY id DESC")
        .fetch_all(pool)
        .await
}

/// Deletes a student and returns the removed row.
pub async fn delete_student(pool: &SqlitePool, id: i64) -> Result<Option<Student>, sqlx::Error> {
    let student = find_student(pool, id).await?;
    if student.is_some() {
        sqlx::query("DELETE FROM student WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
    }
    Ok(student)
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<std::time::Duration>)
        .max_lifetime(None::<std::time::Duration>)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    migrate(&pool).await.expect("schema");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_student(email: &str) -> NewStudent {
        NewStudent {
            fname: "Ada".to_string(),
            lname: "Lovelace".to_string(),
            email: email.to_string(),
            password_hash: "$pbkdf2-sha256$not-a-real-hash".to_string(),
            file: None,
        }
    }

    #[tokio::test]
    async fn insert_list_find_delete() {
        let pool = memory_pool().await;
        let first = insert_student(&pool, &new_student("ada@example.com")).await.unwrap();
        let second = insert_student(&pool, &new_student("grace@example.com")).await.unwrap();

        let listed = list_students(&pool).await.unwrap();
        assert_eq!(
            listed.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![second, first]
        );

        let found = find_student(&pool, first).await.unwrap().unwrap();
        assert_eq!(found.email, "ada@example.com");
        assert!(found.file.is_none());

        let removed = delete_student(&pool, first).await.unwrap();
        assert_eq!(removed.map(|s| s.id), Some(first));
        assert!(find_student(&pool, first).await.unwrap().is_none());
        assert!(delete_student(&pool, first).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_constraint_is_authoritative() {
        let pool = memory_pool().await;
        insert_student(&pool, &new_student("ada@example.com")).await.unwrap();

        assert!(email_taken(&pool, "ADA@example.com").await.unwrap());
        let err = insert_student(&pool, &new_student("Ada@Example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::EmailTaken));
        assert_eq!(list_students(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_reports_missing_rows_and_collisions() {
        let pool = memory_pool().await;
        let ada = insert_student(&pool, &new_student("ada@example.com")).await.unwrap();
        insert_student(&pool, &new_student("grace@example.com")).await.unwrap();

        let changes = StudentChanges {
            fname: "Augusta".to_string(),
            lname: "King".to_string(),
            email: "grace@example.com".to_string(),
            password_hash: "hash".to_string(),
        };
        assert!(matches!(
            update_student(&pool, ada, &changes).await,
            Err(WriteError::EmailTaken)
        ));

        let changes = StudentChanges {
            email: "augusta@example.com".to_string(),
            ..changes
        };
        assert!(update_student(&pool, ada, &changes).await.unwrap());
        assert!(!update_student(&pool, 999, &changes).await.unwrap());

        let stored = find_student(&pool, ada).await.unwrap().unwrap();
        assert_eq!(stored.fname, "Augusta");
        assert_eq!(stored.password, "hash");
    }
}
