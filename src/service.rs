//! Booking service: orchestrates the authorization policy, the quota check
//! and the entity store for the five booking operations, plus the company
//! operations the booking routes depend on.
//!
//! Handlers stay thin; every rule that matters lives here or in [`crate::policy`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::error::ApiError;
use crate::models::{Booking, BookingView, Company, CompanySummary, Role, User, UserSummary};
use crate::policy::{self, Action};
use crate::storage::Storage;

/// Path ids are UUID strings; anything else is rejected up front.
fn validate_id(raw: &str, what: &str) -> Result<(), ApiError> {
    Uuid::parse_str(raw)
        .map(|_| ())
        .map_err(|_| ApiError::Validation(format!("Please provide a valid {what} id")))
}

fn enrich(store: &Storage, booking: &Booking, include_user: bool) -> Result<BookingView, ApiError> {
    let company = store
        .get_company(&booking.company_id)?
        .as_ref()
        .map(CompanySummary::from);
    let user = if include_user {
        store.get_user(&booking.user_id)?.as_ref().map(UserSummary::from)
    } else {
        None
    };
    Ok(BookingView {
        id: booking.id.clone(),
        booking_date: booking.booking_date,
        created_at: booking.created_at,
        company,
        user,
    })
}

fn enrich_all(
    store: &Storage,
    bookings: Vec<Booking>,
    include_user: bool,
) -> Result<Vec<BookingView>, ApiError> {
    bookings
        .iter()
        .map(|b| enrich(store, b, include_user))
        .collect()
}

// --- Booking operations ---

/// List bookings for the actor. Non-admins are always scoped to their own
/// bookings, whatever the filter; admins see everything, with user details
/// populated, optionally narrowed to one company.
pub fn list_bookings(
    store: &Storage,
    actor: &User,
    company_filter: Option<&str>,
) -> Result<Vec<BookingView>, ApiError> {
    match actor.role {
        Role::Admin => {
            let bookings = match company_filter {
                Some(company_id) => {
                    validate_id(company_id, "company")?;
                    store.bookings_for_company(company_id)?
                }
                None => store.list_bookings()?,
            };
            enrich_all(store, bookings, true)
        }
        Role::User => enrich_all(store, store.bookings_for_user(&actor.id)?, false),
    }
}

/// List bookings for one company. Non-admins only see their own bookings
/// against that company.
pub fn list_bookings_by_company(
    store: &Storage,
    actor: &User,
    company_id: &str,
) -> Result<Vec<BookingView>, ApiError> {
    validate_id(company_id, "company")?;
    match actor.role {
        Role::Admin => enrich_all(store, store.bookings_for_company(company_id)?, true),
        Role::User => enrich_all(
            store,
            store.bookings_for_user_and_company(&actor.id, company_id)?,
            false,
        ),
    }
}

/// List bookings for one user, with company details.
///
/// Protection is route-level only: any authenticated caller may query any
/// user id. Known access-control gap, kept pending a product decision
/// (see DESIGN.md).
pub fn list_bookings_by_user(
    store: &Storage,
    _actor: &User,
    user_id: &str,
) -> Result<Vec<BookingView>, ApiError> {
    validate_id(user_id, "user")?;
    enrich_all(store, store.bookings_for_user(user_id)?, false)
}

/// Fetch one booking with both company and user details populated.
pub fn get_booking(store: &Storage, actor: &User, id: &str) -> Result<BookingView, ApiError> {
    let booking = store
        .get_booking(id)?
        .ok_or_else(|| ApiError::NotFound(format!("No booking with the id of {id}")))?;
    if !policy::can_access(actor, &booking, Action::Read) {
        return Err(ApiError::Forbidden(format!(
            "User {} is not authorized to view this booking",
            actor.id
        )));
    }
    enrich(store, &booking, true)
}

/// Create a booking for `actor` against a company, subject to the per-user
/// quota. The quota check and the insert are not atomic: two concurrent
/// creates can both pass the check and overshoot the ceiling. Accepted race.
pub fn create_booking(
    store: &Storage,
    actor: &User,
    company_id: &str,
    booking_date: DateTime<Utc>,
) -> Result<Booking, ApiError> {
    store
        .get_company(company_id)?
        .ok_or_else(|| ApiError::NotFound(format!("No company with the id of {company_id}")))?;

    let existing = store.count_bookings_for_user(&actor.id)?;
    if !policy::can_create(existing) {
        return Err(ApiError::Quota(format!(
            "The user with ID {} has already made {} bookings",
            actor.id,
            policy::MAX_ACTIVE_BOOKINGS
        )));
    }

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        booking_date,
        user_id: actor.id.clone(),
        company_id: company_id.to_string(),
        created_at: Utc::now(),
    };
    store.put_booking(&booking)?;
    Ok(booking)
}

/// Patch applied by [`update_booking`]. Owning references are mutable too.
#[derive(Debug, Default, Clone)]
pub struct BookingPatch {
    pub booking_date: Option<DateTime<Utc>>,
    pub company_id: Option<String>,
    pub user_id: Option<String>,
}

pub fn update_booking(
    store: &Storage,
    actor: &User,
    id: &str,
    patch: BookingPatch,
) -> Result<Booking, ApiError> {
    let mut booking = store
        .get_booking(id)?
        .ok_or_else(|| ApiError::NotFound(format!("No booking with the id of {id}")))?;
    if !policy::can_access(actor, &booking, Action::Update) {
        return Err(ApiError::Forbidden(format!(
            "User {} is not authorized to update this booking",
            actor.id
        )));
    }

    if let Some(date) = patch.booking_date {
        booking.booking_date = date;
    }
    if let Some(company_id) = patch.company_id {
        store.get_company(&company_id)?.ok_or_else(|| {
            ApiError::NotFound(format!("No company with the id of {company_id}"))
        })?;
        booking.company_id = company_id;
    }
    if let Some(user_id) = patch.user_id {
        store
            .get_user(&user_id)?
            .ok_or_else(|| ApiError::NotFound(format!("No user with the id of {user_id}")))?;
        booking.user_id = user_id;
    }

    store.put_booking(&booking)?;
    Ok(booking)
}

pub fn delete_booking(store: &Storage, actor: &User, id: &str) -> Result<(), ApiError> {
    let booking = store
        .get_booking(id)?
        .ok_or_else(|| ApiError::NotFound(format!("No booking with the id of {id}")))?;
    if !policy::can_access(actor, &booking, Action::Delete) {
        return Err(ApiError::Forbidden(format!(
            "User {} is not authorized to delete this booking",
            actor.id
        )));
    }
    store.delete_booking(&booking.id)?;
    Ok(())
}

// --- Account operations ---

/// Register a new account. Public registration always gets the `user` role;
/// admins are created by the seed script.
pub fn register_user(
    store: &Storage,
    name: &str,
    email: &str,
    tel: &str,
    password: &str,
) -> Result<User, ApiError> {
    if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide a name, email and password".to_string(),
        ));
    }
    if store.find_user_by_email(email)?.is_some() {
        return Err(ApiError::Validation(format!(
            "Email {email} is already registered"
        )));
    }
    let password_hash =
        hash_password(password).map_err(|e| ApiError::Unexpected(format!("bcrypt: {e}")))?;
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        tel: tel.to_string(),
        role: Role::User,
        password_hash,
        created_at: Utc::now(),
    };
    store.put_user(&user)?;
    Ok(user)
}

// --- Company operations ---

const MAX_NAME_LEN: usize = 20;
const MAX_POSITION_LEN: usize = 20;
const MAX_JD_LEN: usize = 500;

fn validate_company_fields(name: &str, position: &str, jd: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("Please add a name".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::Validation(format!(
            "Name cannot be more than {MAX_NAME_LEN} characters"
        )));
    }
    if position.chars().count() > MAX_POSITION_LEN {
        return Err(ApiError::Validation(format!(
            "Position cannot be more than {MAX_POSITION_LEN} characters"
        )));
    }
    if jd.chars().count() > MAX_JD_LEN {
        return Err(ApiError::Validation(format!(
            "Job description cannot be more than {MAX_JD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn create_company(
    store: &Storage,
    name: &str,
    position: &str,
    jd: &str,
    location: &str,
    tel: &str,
    image: &str,
) -> Result<Company, ApiError> {
    validate_company_fields(name, position, jd)?;
    if store.find_company_by_name(name)?.is_some() {
        return Err(ApiError::Validation(format!(
            "Company name {name} is already taken"
        )));
    }
    let company = Company {
        id: Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
        position: position.trim().to_string(),
        jd: jd.trim().to_string(),
        location: location.to_string(),
        tel: tel.to_string(),
        image: image.to_string(),
    };
    store.put_company(&company)?;
    Ok(company)
}

pub fn update_company(
    store: &Storage,
    id: &str,
    updated: Company,
) -> Result<Company, ApiError> {
    let existing = store
        .get_company(id)?
        .ok_or_else(|| ApiError::NotFound(format!("No company with the id of {id}")))?;
    validate_company_fields(&updated.name, &updated.position, &updated.jd)?;
    if updated.name != existing.name && store.find_company_by_name(&updated.name)?.is_some() {
        return Err(ApiError::Validation(format!(
            "Company name {} is already taken",
            updated.name
        )));
    }
    let company = Company {
        id: existing.id,
        ..updated
    };
    store.put_company(&company)?;
    Ok(company)
}

/// Delete a company; every dependent booking is cascade-deleted with it.
pub fn delete_company(store: &Storage, id: &str) -> Result<(), ApiError> {
    if !store.delete_company(id)? {
        return Err(ApiError::NotFound(format!("No company with the id of {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn open_temp(name: &str) -> (Storage, std::path::PathBuf) {
        let temp_dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&temp_dir);
        let storage = Storage::open(temp_dir.to_str().unwrap()).expect("open storage");
        (storage, temp_dir)
    }

    fn seeded_user(store: &Storage, name: &str, role: Role) -> User {
        let mut user = register_user(
            store,
            name,
            &format!("{name}@example.com"),
            "000",
            "password",
        )
        .expect("register");
        if role == Role::Admin {
            user.role = Role::Admin;
            store.put_user(&user).expect("promote");
        }
        user
    }

    fn seeded_company(store: &Storage, name: &str) -> Company {
        create_company(
            store,
            name,
            "Engineer",
            "Build things",
            "London",
            "020",
            "https://example.com/logo.png",
        )
        .expect("create company")
    }

    #[test]
    fn quota_allows_three_then_rejects_fourth() {
        let (store, dir) = open_temp("slotbook_svc_quota");
        let u1 = seeded_user(&store, "u1", Role::User);
        let company = seeded_company(&store, "Globex");

        for _ in 0..3 {
            create_booking(&store, &u1, &company.id, Utc::now()).expect("create under quota");
        }
        let err = create_booking(&store, &u1, &company.id, Utc::now()).unwrap_err();
        assert!(matches!(err, ApiError::Quota(_)));
        assert_eq!(store.count_bookings_for_user(&u1.id).unwrap(), 3);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn create_against_missing_company_is_not_found() {
        let (store, dir) = open_temp("slotbook_svc_create_missing");
        let u1 = seeded_user(&store, "u1", Role::User);

        let err = create_booking(&store, &u1, &Uuid::new_v4().to_string(), Utc::now()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn get_missing_booking_is_not_found_for_any_role() {
        let (store, dir) = open_temp("slotbook_svc_get_missing");
        let admin = seeded_user(&store, "admin", Role::Admin);
        let u1 = seeded_user(&store, "u1", Role::User);

        let id = Uuid::new_v4().to_string();
        assert!(matches!(
            get_booking(&store, &admin, &id).unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            get_booking(&store, &u1, &id).unwrap_err(),
            ApiError::NotFound(_)
        ));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn non_owner_is_forbidden_even_when_booking_exists() {
        let (store, dir) = open_temp("slotbook_svc_forbidden");
        let u1 = seeded_user(&store, "u1", Role::User);
        let u2 = seeded_user(&store, "u2", Role::User);
        let company = seeded_company(&store, "Globex");

        let booking = create_booking(&store, &u1, &company.id, Utc::now()).unwrap();

        assert!(matches!(
            get_booking(&store, &u2, &booking.id).unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            update_booking(&store, &u2, &booking.id, BookingPatch::default()).unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            delete_booking(&store, &u2, &booking.id).unwrap_err(),
            ApiError::Forbidden(_)
        ));
        // Still there
        assert!(store.get_booking(&booking.id).unwrap().is_some());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn owner_can_update_and_delete() {
        let (store, dir) = open_temp("slotbook_svc_owner_ops");
        let u1 = seeded_user(&store, "u1", Role::User);
        let company = seeded_company(&store, "Globex");
        let other = seeded_company(&store, "Initech");

        let booking = create_booking(&store, &u1, &company.id, Utc::now()).unwrap();

        let new_date = Utc::now() + chrono::Duration::days(7);
        let updated = update_booking(
            &store,
            &u1,
            &booking.id,
            BookingPatch {
                booking_date: Some(new_date),
                company_id: Some(other.id.clone()),
                user_id: None,
            },
        )
        .unwrap();
        assert_eq!(updated.booking_date, new_date);
        assert_eq!(updated.company_id, other.id);

        delete_booking(&store, &u1, &booking.id).unwrap();
        assert!(store.get_booking(&booking.id).unwrap().is_none());
        assert!(matches!(
            delete_booking(&store, &u1, &booking.id).unwrap_err(),
            ApiError::NotFound(_)
        ));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn update_to_missing_company_is_rejected() {
        let (store, dir) = open_temp("slotbook_svc_update_missing");
        let u1 = seeded_user(&store, "u1", Role::User);
        let company = seeded_company(&store, "Globex");
        let booking = create_booking(&store, &u1, &company.id, Utc::now()).unwrap();

        let err = update_booking(
            &store,
            &u1,
            &booking.id,
            BookingPatch {
                booking_date: None,
                company_id: Some(Uuid::new_v4().to_string()),
                user_id: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn list_scoping_matches_roles() {
        // Scenario: admin creates company C; U1 books 3 slots; admin filtered by C
        // sees 3 entries with user details; U1 sees 3 entries without them.
        let (store, dir) = open_temp("slotbook_svc_scenario");
        let admin = seeded_user(&store, "admin", Role::Admin);
        let u1 = seeded_user(&store, "u1", Role::User);
        let u2 = seeded_user(&store, "u2", Role::User);
        let c = seeded_company(&store, "Globex");
        let other = seeded_company(&store, "Initech");

        for days in 1..=3 {
            create_booking(&store, &u1, &c.id, Utc::now() + chrono::Duration::days(days))
                .expect("u1 booking");
        }
        create_booking(&store, &u2, &other.id, Utc::now()).expect("u2 booking");

        let admin_view = list_bookings_by_company(&store, &admin, &c.id).unwrap();
        assert_eq!(admin_view.len(), 3);
        assert!(admin_view.iter().all(|b| b.user.is_some()));
        assert!(admin_view
            .iter()
            .all(|b| b.company.as_ref().unwrap().name == "Globex"));

        let u1_view = list_bookings(&store, &u1, None).unwrap();
        assert_eq!(u1_view.len(), 3);
        assert!(u1_view.iter().all(|b| b.user.is_none()));

        // Admin unfiltered list sees everything
        assert_eq!(list_bookings(&store, &admin, None).unwrap().len(), 4);

        // u1 scoped to own bookings against `other` company: none
        assert!(list_bookings_by_company(&store, &u1, &other.id)
            .unwrap()
            .is_empty());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn admin_list_filter_narrows_to_company() {
        let (store, dir) = open_temp("slotbook_svc_list_filter");
        let admin = seeded_user(&store, "admin", Role::Admin);
        let u1 = seeded_user(&store, "u1", Role::User);
        let c1 = seeded_company(&store, "Globex");
        let c2 = seeded_company(&store, "Initech");
        create_booking(&store, &u1, &c1.id, Utc::now()).unwrap();
        create_booking(&store, &u1, &c2.id, Utc::now()).unwrap();

        let filtered = list_bookings(&store, &admin, Some(&c1.id)).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].company.as_ref().unwrap().name, "Globex");

        assert!(matches!(
            list_bookings(&store, &admin, Some("not-a-uuid")).unwrap_err(),
            ApiError::Validation(_)
        ));

        // A filter never widens a non-admin beyond their own bookings
        let u2 = seeded_user(&store, "u2", Role::User);
        assert!(list_bookings(&store, &u2, Some(&c1.id)).unwrap().is_empty());
        assert_eq!(list_bookings(&store, &u1, Some(&c1.id)).unwrap().len(), 2);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn list_by_user_has_no_ownership_narrowing() {
        let (store, dir) = open_temp("slotbook_svc_by_user");
        let u1 = seeded_user(&store, "u1", Role::User);
        let u2 = seeded_user(&store, "u2", Role::User);
        let c = seeded_company(&store, "Globex");
        create_booking(&store, &u1, &c.id, Utc::now()).unwrap();

        // u2 can read u1's bookings by id, see list_bookings_by_user docs
        let view = list_bookings_by_user(&store, &u2, &u1.id).unwrap();
        assert_eq!(view.len(), 1);
        assert!(view[0].user.is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn malformed_ids_fail_validation() {
        let (store, dir) = open_temp("slotbook_svc_validation");
        let u1 = seeded_user(&store, "u1", Role::User);

        assert!(matches!(
            list_bookings_by_company(&store, &u1, "not-a-uuid").unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            list_bookings_by_user(&store, &u1, "").unwrap_err(),
            ApiError::Validation(_)
        ));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn cascade_delete_through_service() {
        let (store, dir) = open_temp("slotbook_svc_cascade");
        let u1 = seeded_user(&store, "u1", Role::User);
        let c = seeded_company(&store, "Globex");
        for _ in 0..2 {
            create_booking(&store, &u1, &c.id, Utc::now()).unwrap();
        }

        delete_company(&store, &c.id).unwrap();
        assert!(store.list_bookings().unwrap().is_empty());
        assert!(matches!(
            delete_company(&store, &c.id).unwrap_err(),
            ApiError::NotFound(_)
        ));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn duplicate_email_and_company_name_rejected() {
        let (store, dir) = open_temp("slotbook_svc_unique");
        seeded_user(&store, "u1", Role::User);
        let err = register_user(&store, "Other", "u1@example.com", "1", "pw").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        seeded_company(&store, "Globex");
        let err = create_company(&store, "Globex", "p", "jd", "l", "t", "i").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn company_field_limits_enforced() {
        let (store, dir) = open_temp("slotbook_svc_limits");
        let long_name = "x".repeat(21);
        assert!(matches!(
            create_company(&store, &long_name, "p", "jd", "l", "t", "i").unwrap_err(),
            ApiError::Validation(_)
        ));
        let long_jd = "x".repeat(501);
        assert!(matches!(
            create_company(&store, "ok", "p", &long_jd, "l", "t", "i").unwrap_err(),
            ApiError::Validation(_)
        ));

        let _ = fs::remove_dir_all(dir);
    }
}
