//! Booking authorization policy and per-user quota check.
//!
//! Both functions are pure: they look at nothing but their arguments, so the
//! rules are testable without a store and reusable from any transport layer.

use crate::models::{Booking, Role, User};

/// A registered user may hold at most this many bookings at once.
/// Global constant for now; a per-company or time-windowed quota would
/// replace the count fed into [`can_create`], not this check itself.
pub const MAX_ACTIVE_BOOKINGS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
}

/// Whether `actor` may perform `action` on `booking`.
///
/// Admins may do anything; everyone else only touches their own bookings.
/// The rule is currently identical for all three actions.
pub fn can_access(actor: &User, booking: &Booking, action: Action) -> bool {
    match action {
        Action::Read | Action::Update | Action::Delete => {
            actor.role == Role::Admin || booking.user_id == actor.id
        }
    }
}

/// Whether a user with `existing` bookings may create another one.
pub fn can_create(existing: usize) -> bool {
    existing < MAX_ACTIVE_BOOKINGS
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            name: "Test".to_string(),
            email: format!("{id}@example.com"),
            tel: "000".to_string(),
            role,
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    fn booking(owner: &str) -> Booking {
        Booking {
            id: "b1".to_string(),
            booking_date: Utc::now(),
            user_id: owner.to_string(),
            company_id: "c1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn admin_can_do_everything() {
        let admin = user("a1", Role::Admin);
        let b = booking("someone-else");
        for action in [Action::Read, Action::Update, Action::Delete] {
            assert!(can_access(&admin, &b, action));
        }
    }

    #[test]
    fn owner_can_touch_own_booking() {
        let u = user("u1", Role::User);
        let b = booking("u1");
        for action in [Action::Read, Action::Update, Action::Delete] {
            assert!(can_access(&u, &b, action));
        }
    }

    #[test]
    fn non_owner_is_denied_all_actions() {
        let u = user("u1", Role::User);
        let b = booking("u2");
        for action in [Action::Read, Action::Update, Action::Delete] {
            assert!(!can_access(&u, &b, action));
        }
    }

    #[test]
    fn quota_allows_up_to_three() {
        assert!(can_create(0));
        assert!(can_create(1));
        assert!(can_create(2));
        assert!(!can_create(3));
        assert!(!can_create(4));
    }
}
