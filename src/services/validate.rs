//! Input checks shared by the services. Messages are safe to show the caller.

use chrono::{DateTime, Utc};

use crate::error::{AppError, AppResult};
use crate::identity::Role;
use crate::model::User;
use crate::storage::RecordStore;

pub(crate) fn required(value: &str) -> AppResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::validation("required_fields_empty", "Required fields cannot be empty or whitespace."));
    }
    Ok(v.to_string())
}

/// For patches: a provided value must still be non-blank.
pub(crate) fn required_opt(value: Option<String>) -> AppResult<Option<String>> {
    value.as_deref().map(required).transpose()
}

/// Blank optional text collapses to None.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub(crate) fn email(value: &str) -> AppResult<String> {
    let v = required(value)?;
    match v.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') => Ok(v),
        _ => Err(AppError::validation("invalid_email", "Email address is not valid.")),
    }
}

pub(crate) fn amounts(total_cents: i64, rest_to_pay_cents: i64) -> AppResult<()> {
    if total_cents <= 0 {
        return Err(AppError::validation("invalid_total_price", "Total price must be greater than 0."));
    }
    if rest_to_pay_cents < 0 {
        return Err(AppError::validation("negative_rest_to_pay", "Rest to pay can't be negative."));
    }
    if rest_to_pay_cents > total_cents {
        return Err(AppError::validation("inferior_total_price", "Total price can't be lower than rest to pay."));
    }
    Ok(())
}

/// `start_changed` limits the past-date check to a start the caller actually set.
pub(crate) fn schedule(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>, start_changed: bool) -> AppResult<()> {
    if start_changed && start < now {
        return Err(AppError::validation("event_date_in_past", "Event date must be in the future."));
    }
    if end < start {
        return Err(AppError::validation("end_before_start", "End date must be after start date."));
    }
    Ok(())
}

/// The referenced user must exist and hold `role`.
pub(crate) fn contact<S: RecordStore>(store: &S, user_id: u64, role: Role) -> AppResult<User> {
    let Some(u) = store.get::<User>(user_id)? else {
        return Err(AppError::validation("contact_not_found", "The contact mentioned does not exist."));
    };
    if u.role != role {
        return Err(AppError::validation("contact_wrong_role", format!("The contact mentioned is not a {} user.", role)));
    }
    Ok(u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("  Ada ").unwrap(), "Ada");
        assert_eq!(required(" \t").unwrap_err().code_str(), "required_fields_empty");
        assert_eq!(required_opt(None).unwrap(), None);
        assert!(required_opt(Some("  ".into())).is_err());
    }

    #[test]
    fn email_shape() {
        assert!(email("a@b.io").is_ok());
        for bad in ["", "ab.io", "@b.io", "a@b", "a@.io", "a@io."] {
            assert!(email(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn amount_rules() {
        assert!(amounts(1000, 0).is_ok());
        assert!(amounts(1000, 1000).is_ok());
        assert_eq!(amounts(0, 0).unwrap_err().code_str(), "invalid_total_price");
        assert_eq!(amounts(1000, -1).unwrap_err().code_str(), "negative_rest_to_pay");
        assert_eq!(amounts(1000, 1001).unwrap_err().code_str(), "inferior_total_price");
    }

    #[test]
    fn schedule_rules() {
        let now = Utc::now();
        let later = now + Duration::days(3);
        assert!(schedule(now, later, later + Duration::hours(4), true).is_ok());
        assert_eq!(schedule(now, now - Duration::days(1), later, true).unwrap_err().code_str(), "event_date_in_past");
        // an untouched past start is tolerated on update
        assert!(schedule(now, now - Duration::days(1), later, false).is_ok());
        assert_eq!(schedule(now, later, later - Duration::hours(1), true).unwrap_err().code_str(), "end_before_start");
    }
}
