use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account role. Fixed at registration; determines authorization scope.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub tel: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct Company {
    pub id: String,
    /// eg. "Google" (unique, max 20 chars)
    pub name: String,
    /// eg. "Software Engineer" (max 20 chars)
    pub position: String,
    /// Job description (max 500 chars)
    pub jd: String,
    /// eg. "London"
    pub location: String,
    pub tel: String,
    /// URL to company picture
    pub image: String,
}

/// Interview slot booked by a user against a company.
///
/// Wire names match the document fields: `user` and `company` hold ids,
/// the referenced entities are joined into [`BookingView`] on read.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    /// Interview start date; the slot ends one hour later.
    pub booking_date: DateTime<Utc>,
    #[serde(rename = "user")]
    pub user_id: String,
    #[serde(rename = "company")]
    pub company_id: String,
    pub created_at: DateTime<Utc>,
}

/// JWT claims carried on every authenticated request.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

// --- Read-side views (populated references, no secrets) ---

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct CompanySummary {
    pub name: String,
    pub location: String,
    pub tel: String,
}

impl From<&Company> for CompanySummary {
    fn from(c: &Company) -> Self {
        Self {
            name: c.name.clone(),
            location: c.location.clone(),
            tel: c.tel.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
    pub tel: String,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            name: u.name.clone(),
            email: u.email.clone(),
            tel: u.tel.clone(),
        }
    }
}

/// Booking enriched with its referenced entities. `user` is only populated
/// for admin readers (and for the booking owner on single-booking reads).
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: String,
    pub booking_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// None if the referenced company was deleted out from under the booking.
    pub company: Option<CompanySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Public projection of a user account (no password hash).
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub tel: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            tel: u.tel.clone(),
            role: u.role,
            created_at: u.created_at,
        }
    }
}
