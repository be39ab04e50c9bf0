use std::collections::VecDeque;
use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::principal::{Principal, Role};
use crate::clock::Clock;
use crate::error::{AppError, AppResult};

pub type SessionToken = String;

/// Caller-held view of the active login. The manager keeps the authoritative
/// copy; a stale `last_activity` here is harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: SessionToken,
    pub principal: Principal,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn user_id(&self) -> u64 { self.principal.user_id }
    pub fn role(&self) -> Role { self.principal.role }
    pub fn username(&self) -> &str { &self.principal.username }
}

fn gen_token() -> AppResult<SessionToken> {
    // 256-bit random token base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| {
        warn!(target: "crmdesk::session", error = %e, "OS random source unavailable");
        AppError::store("rng_unavailable", "A technical error occurred. Please try again later.")
    })?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Most recent retired tokens remembered per kind; older ones fall back to
/// `session_invalid`.
const RETIRED_CAP: usize = 32;

#[derive(Default)]
struct Retired(VecDeque<SessionToken>);

impl Retired {
    fn insert(&mut self, token: SessionToken) {
        if self.0.contains(&token) { return; }
        if self.0.len() == RETIRED_CAP { self.0.pop_front(); }
        self.0.push_back(token);
    }

    fn contains(&self, token: &str) -> bool { self.0.iter().any(|t| t == token) }

    #[cfg(test)]
    fn len(&self) -> usize { self.0.len() }
}

/// Single-user session state: one active session, plus the tokens that were
/// logged out or timed out so reuse reports the right error.
pub struct SessionManager {
    timeout: Duration,
    clock: Arc<dyn Clock>,
    active: Option<Session>,
    revoked: Retired,
    expired: Retired,
}

impl SessionManager {
    pub fn new(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { timeout, clock, active: None, revoked: Retired::default(), expired: Retired::default() }
    }

    pub fn timeout(&self) -> Duration { self.timeout }

    pub fn current(&self) -> Option<&Session> { self.active.as_ref() }

    /// Start a session for an already-verified principal. Replaces any previous one.
    pub fn issue(&mut self, principal: Principal) -> AppResult<Session> {
        let token = gen_token()?;
        let now = self.clock.now();
        if let Some(prev) = self.active.take() {
            info!(target: "crmdesk::session", user = %prev.principal.username, "previous session replaced by new login");
            self.revoked.insert(prev.token);
        }
        let sess = Session { token, principal, created_at: now, last_activity: now };
        info!(target: "crmdesk::session", user = %sess.principal.username, role = %sess.principal.role, timeout_secs = self.timeout.num_seconds(), "session.issue");
        self.active = Some(sess.clone());
        Ok(sess)
    }

    /// Gate for every entity call. Timeout runs from last activity; an expired
    /// session is dropped here and can never be revived.
    pub fn touch(&mut self, session: &Session) -> AppResult<Session> {
        let now = self.clock.now();
        let Some(active) = self.active.as_mut().filter(|a| a.token == session.token) else {
            if self.expired.contains(&session.token) {
                return Err(AppError::session_expired());
            }
            if self.revoked.contains(&session.token) {
                debug!(target: "crmdesk::session", user = %session.principal.username, "logged-out token presented");
            }
            return Err(AppError::session_invalid());
        };
        let idle = now - active.last_activity;
        if idle > self.timeout {
            warn!(target: "crmdesk::session", user = %active.principal.username, idle_secs = idle.num_seconds(), "session expired");
            if let Some(dead) = self.active.take() { self.expired.insert(dead.token); }
            return Err(AppError::session_expired());
        }
        active.last_activity = now;
        debug!(target: "crmdesk::session", user = %active.principal.username, "session.touch");
        Ok(active.clone())
    }

    /// Returns true if the token was the active session.
    pub fn logout(&mut self, session: &Session) -> bool {
        match self.active.take() {
            Some(a) if a.token == session.token => {
                info!(target: "crmdesk::session", user = %a.principal.username, "session.logout");
                self.revoked.insert(a.token);
                true
            }
            other => {
                self.active = other;
                self.revoked.insert(session.token.clone());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn principal(role: Role) -> Principal { Principal { user_id: 7, username: "ana".into(), role } }

    fn mgr() -> (SessionManager, ManualClock) {
        let clock = ManualClock::default();
        (SessionManager::new(Duration::minutes(15), Arc::new(clock.clone())), clock)
    }

    #[test]
    fn issue_stamps_both_times() {
        let (mut sm, clock) = mgr();
        let s = sm.issue(principal(Role::Support)).unwrap();
        assert_eq!(s.created_at, clock.now());
        assert_eq!(s.last_activity, s.created_at);
        assert_eq!(s.token.len(), 43);
    }

    #[test]
    fn touch_slides_the_window() {
        let (mut sm, clock) = mgr();
        let s = sm.issue(principal(Role::Support)).unwrap();
        for _ in 0..4 {
            clock.advance(Duration::minutes(10));
            let t = sm.touch(&s).expect("still active");
            assert_eq!(t.last_activity, clock.now());
            assert_eq!(t.created_at, s.created_at);
        }
    }

    #[test]
    fn exactly_at_threshold_is_still_active() {
        let (mut sm, clock) = mgr();
        let s = sm.issue(principal(Role::Commercial)).unwrap();
        clock.advance(Duration::minutes(15));
        assert!(sm.touch(&s).is_ok());
    }

    #[test]
    fn idle_past_threshold_expires_for_good() {
        let (mut sm, clock) = mgr();
        let s = sm.issue(principal(Role::Management)).unwrap();
        clock.advance(Duration::minutes(15) + Duration::seconds(1));
        let e = sm.touch(&s).unwrap_err();
        assert_eq!(e.code_str(), "session_expired");
        // rewinding the clock does not bring it back
        clock.advance(Duration::minutes(-30));
        assert_eq!(sm.touch(&s).unwrap_err().code_str(), "session_expired");
        assert!(sm.current().is_none());
    }

    #[test]
    fn logout_invalidates_token() {
        let (mut sm, _clock) = mgr();
        let s = sm.issue(principal(Role::Support)).unwrap();
        assert!(sm.logout(&s));
        assert!(sm.touch(&s).unwrap_err().is_session_expired());
        assert!(!sm.logout(&s));
    }

    #[test]
    fn new_login_replaces_old_session() {
        let (mut sm, _clock) = mgr();
        let a = sm.issue(principal(Role::Support)).unwrap();
        let b = sm.issue(principal(Role::Management)).unwrap();
        assert!(sm.touch(&a).is_err());
        assert!(sm.touch(&b).is_ok());
    }

    #[test]
    fn retired_tokens_are_bounded() {
        let (mut sm, clock) = mgr();
        let first = sm.issue(principal(Role::Support)).unwrap();
        clock.advance(Duration::hours(1));
        assert_eq!(sm.touch(&first).unwrap_err().code_str(), "session_expired");
        for _ in 0..(RETIRED_CAP * 3) {
            let s = sm.issue(principal(Role::Support)).unwrap();
            assert!(sm.logout(&s));
            sm.issue(principal(Role::Support)).unwrap();
            clock.advance(Duration::hours(1));
            let current = sm.current().cloned().unwrap();
            assert!(sm.touch(&current).unwrap_err().is_session_expired());
        }
        assert_eq!(sm.revoked.len(), RETIRED_CAP);
        assert_eq!(sm.expired.len(), RETIRED_CAP);
        // the oldest expired token has been forgotten
        assert_eq!(sm.touch(&first).unwrap_err().code_str(), "session_invalid");
    }

    #[test]
    fn unknown_token_is_invalid() {
        let (mut sm, clock) = mgr();
        let forged = Session { token: "nope".into(), principal: principal(Role::Management), created_at: clock.now(), last_activity: clock.now() };
        assert_eq!(sm.touch(&forged).unwrap_err().code_str(), "session_invalid");
    }
}
