//! Retryable SQL execution for writes that may hit a locked database.

use crate::core::store::StoreError;
use crate::models::config::RetrySection;
use rusqlite::{Connection, ErrorCode, ToSql};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetrySection::default().into()
    }
}

impl RetryPolicy {
    /// Linear backoff, saturating instead of overflowing.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.checked_mul(attempt).unwrap_or(Duration::MAX)
    }
}

impl From<RetrySection> for RetryPolicy {
    fn from(section: RetrySection) -> Self {
        Self {
            max_attempts: section.max_attempts.max(1),
            backoff: Duration::from_millis(section.backoff_ms),
        }
    }
}

/// Busy and locked databases clear up on their own; everything else is final.
pub fn is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
    )
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
/// Attempt numbers passed to `op` start at 1.
pub fn retry<T, F>(policy: RetryPolicy, mut op: F) -> Result<T, StoreError>
where
    F: FnMut(u32) -> rusqlite::Result<T>,
{
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if is_transient(&err) => {
                if attempt >= policy.max_attempts {
                    return Err(StoreError::RetryExhausted {
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
                thread::sleep(policy.backoff_for(attempt));
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// A prepared statement that is re-executed on transient failures.
pub struct RetryableQuery<'c> {
    conn: &'c Connection,
    sql: &'static str,
    policy: RetryPolicy,
}

impl<'c> RetryableQuery<'c> {
    pub fn new(conn: &'c Connection, sql: &'static str, policy: RetryPolicy) -> Self {
        Self { conn, sql, policy }
    }

    /// Execute with positional parameters; returns affected rows.
    pub fn execute(&self, params: &[&dyn ToSql]) -> Result<usize, StoreError> {
        retry(self.policy, |_| {
            let mut stmt = self.conn.prepare_cached(self.sql)?;
            stmt.execute(params)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(0),
        }
    }

    #[test]
    fn test_retries_transient_then_succeeds() {
        let mut calls = 0;
        let result = retry(fast_policy(5), |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(sqlite_failure(rusqlite::ffi::SQLITE_BUSY))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = retry(fast_policy(5), |_| {
            calls += 1;
            Err(sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT))
        });
        assert!(matches!(result, Err(StoreError::Constraint(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_exhaustion_reports_attempts() {
        let result: Result<(), _> =
            retry(fast_policy(4), |_| Err(sqlite_failure(rusqlite::ffi::SQLITE_LOCKED)));
        match result {
            Err(StoreError::RetryExhausted { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let mut calls = 0;
        let _: Result<(), _> = retry(fast_policy(0), |_| {
            calls += 1;
            Err(sqlite_failure(rusqlite::ffi::SQLITE_BUSY))
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_policy_from_zero_attempts_clamped() {
        let policy = RetryPolicy::from(RetrySection {
            max_attempts: 0,
            backoff_ms: 10,
        });
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff, Duration::from_millis(10));
    }

    #[test]
    fn test_backoff_is_linear_and_saturates() {
        let policy = RetryPolicy::from(RetrySection {
            max_attempts: 3,
            backoff_ms: 50,
        });
        assert_eq!(policy.backoff_for(3), Duration::from_millis(150));

        let huge = RetryPolicy::from(RetrySection {
            max_attempts: 3,
            backoff_ms: u64::MAX,
        });
        assert_eq!(huge.backoff_for(2), Duration::MAX);
    }

    #[test]
    fn test_query_executes_insert() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER PRIMARY KEY)").unwrap();
        let query = RetryableQuery::new(&conn, "INSERT INTO t (v) VALUES (?1)", fast_policy(3));
        assert_eq!(query.execute(&[&7i64]).unwrap(), 1);
        assert!(matches!(
            query.execute(&[&7i64]),
            Err(StoreError::Constraint(_))
        ));
    }
}
