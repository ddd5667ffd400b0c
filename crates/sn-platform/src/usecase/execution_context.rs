//! Execution Context
//!
//! The request envelope passed explicitly from handlers into use-cases and
//! agents: correlation id, the admitted caller (if any) and the deadline
//! inherited by downstream RPC calls.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::shared::error::{PlatformError, Result};
use crate::user::entity::User;

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Correlation id, echoed in the `x-request-id` response header
    pub request_id: String,
    /// Authenticated caller, `None` for anonymous requests
    pub caller: Option<User>,
    pub deadline: Option<Instant>,
}

impl ExecutionContext {
    /// Context for work not tied to an inbound request.
    pub fn create() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            caller: None,
            deadline: None,
        }
    }

    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            caller: None,
            deadline: None,
        }
    }

    pub fn with_caller(mut self, caller: Option<User>) -> Self {
        self.caller = caller;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// The caller, or `Unauthorized` for anonymous requests.
    pub fn require_caller(&self) -> Result<&User> {
        self.caller
            .as_ref()
            .ok_or_else(|| PlatformError::unauthorized("authentication required"))
    }

    pub fn caller_id(&self) -> Option<i64> {
        self.caller.as_ref().map(|u| u.id)
    }

    /// Time left before the deadline; zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::entity::Sex;
    use chrono::NaiveDate;

    fn user() -> User {
        User {
            id: 1,
            version: 1,
            username: "u1".into(),
            email: "u1@example.com".into(),
            first_name: "U".into(),
            last_name: "One".into(),
            sex: Sex::M,
            birth_date: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
            avatar_src: None,
        }
    }

    #[test]
    fn test_anonymous_context_requires_caller() {
        let ctx = ExecutionContext::with_request_id("req-1");
        assert_eq!(ctx.request_id, "req-1");
        assert!(matches!(ctx.require_caller(), Err(PlatformError::Unauthorized { .. })));
        assert_eq!(ctx.caller_id(), None);
    }

    #[test]
    fn test_caller_context() {
        let ctx = ExecutionContext::create().with_caller(Some(user()));
        assert_eq!(ctx.require_caller().unwrap().id, 1);
        assert_eq!(ctx.caller_id(), Some(1));
    }

    #[test]
    fn test_remaining_time() {
        let ctx = ExecutionContext::create();
        assert!(ctx.remaining().is_none());

        let ctx = ctx.with_timeout(Duration::from_secs(10));
        let remaining = ctx.remaining().unwrap();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining > Duration::from_secs(9));
    }
}
