//! Small helpers shared by the store implementations.

use time::{OffsetDateTime, PrimitiveDateTime};

/// Current UTC wall-clock time as stored in `TIMESTAMP` columns.
pub fn utc_now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

/// Unix seconds of a stored UTC timestamp.
pub fn unix_timestamp(at: PrimitiveDateTime) -> i64 {
    at.assume_utc().unix_timestamp()
}

/// `true` if `err` is a PostgreSQL unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}
