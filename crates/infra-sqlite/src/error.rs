// sqlx::Error -> AppError::Storage
// (orphan rule: a From impl for AppError cannot live here)

use offline_queue_core::error::AppError;

/// Convert sqlx::Error to AppError with the SQLite result code when present
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            Some(code) => match code.as_ref() {
                "5" => AppError::Storage(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                "13" => AppError::Storage(format!("Database full: {}", db_err.message())),
                "8" => AppError::Storage(format!(
                    "Database is read-only: {}",
                    db_err.message()
                )),
                other => AppError::Storage(format!(
                    "Database error [{}]: {}",
                    other,
                    db_err.message()
                )),
            },
            None => AppError::Storage(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::RowNotFound => AppError::Storage("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Storage(format!("Column not found: {}", col))
        }
        _ => AppError::Storage(err.to_string()),
    }
}
