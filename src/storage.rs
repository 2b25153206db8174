//! Entity store on Sled: users, companies and bookings as serde-JSON documents.
//!
//! Referential fields (`Booking.user_id`, `Booking.company_id`) are plain id
//! strings; the storage layer does not enforce them. Uniqueness of user email
//! and company name is maintained through small secondary index trees.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;

use crate::models::{Booking, Company, User};

#[derive(Debug)]
pub enum StorageError {
    Db(sled::Error),
    Codec(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Db(e) => write!(f, "sled error: {e}"),
            StorageError::Codec(e) => write!(f, "document codec error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<sled::Error> for StorageError {
    fn from(e: sled::Error) -> Self {
        StorageError::Db(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Codec(e)
    }
}

#[allow(dead_code)] // db kept for flush/close style ops on Sled
#[derive(Clone)] // Clone for sharing across handlers (Sled internals cheap to clone)
pub struct Storage {
    db: Db,
    user_tree: sled::Tree,
    company_tree: sled::Tree,
    booking_tree: sled::Tree,
    // Secondary indexes: email -> user id, company name -> company id
    user_email_tree: sled::Tree,
    company_name_tree: sled::Tree,
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(value)?)
}

impl Storage {
    /// Open or create the Sled database at the given path.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        let user_tree = db.open_tree("users")?;
        let company_tree = db.open_tree("companies")?;
        let booking_tree = db.open_tree("bookings")?;
        let user_email_tree = db.open_tree("user_emails")?;
        let company_name_tree = db.open_tree("company_names")?;
        Ok(Self {
            db,
            user_tree,
            company_tree,
            booking_tree,
            user_email_tree,
            company_name_tree,
        })
    }

    // --- Users ---

    /// Insert or replace a user document and its email index entry.
    pub fn put_user(&self, user: &User) -> Result<(), StorageError> {
        // Keep the email index in sync if the address changes.
        if let Some(old) = self.get_user(&user.id)? {
            if old.email != user.email {
                self.user_email_tree.remove(old.email.as_bytes())?;
            }
        }
        self.user_tree.insert(user.id.as_bytes(), encode(user)?)?;
        self.user_email_tree
            .insert(user.email.as_bytes(), user.id.as_bytes())?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        match self.user_tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        match self.user_email_tree.get(email.as_bytes())? {
            Some(id) => {
                let id = String::from_utf8_lossy(&id).to_string();
                self.get_user(&id)
            }
            None => Ok(None),
        }
    }

    // --- Companies ---

    pub fn put_company(&self, company: &Company) -> Result<(), StorageError> {
        // Keep the name index in sync across renames.
        if let Some(old) = self.get_company(&company.id)? {
            if old.name != company.name {
                self.company_name_tree.remove(old.name.as_bytes())?;
            }
        }
        self.company_tree
            .insert(company.id.as_bytes(), encode(company)?)?;
        self.company_name_tree
            .insert(company.name.as_bytes(), company.id.as_bytes())?;
        Ok(())
    }

    pub fn get_company(&self, id: &str) -> Result<Option<Company>, StorageError> {
        match self.company_tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn find_company_by_name(&self, name: &str) -> Result<Option<Company>, StorageError> {
        match self.company_name_tree.get(name.as_bytes())? {
            Some(id) => {
                let id = String::from_utf8_lossy(&id).to_string();
                self.get_company(&id)
            }
            None => Ok(None),
        }
    }

    pub fn list_companies(&self) -> Result<Vec<Company>, StorageError> {
        let mut companies = Vec::new();
        for item in self.company_tree.iter() {
            let (_, v) = item?;
            companies.push(decode(&v)?);
        }
        Ok(companies)
    }

    /// Delete a company and cascade-delete every booking that references it.
    /// Returns `false` if the company did not exist.
    pub fn delete_company(&self, id: &str) -> Result<bool, StorageError> {
        let Some(company) = self.get_company(id)? else {
            return Ok(false);
        };
        for booking in self.bookings_for_company(id)? {
            self.booking_tree.remove(booking.id.as_bytes())?;
        }
        self.company_name_tree.remove(company.name.as_bytes())?;
        self.company_tree.remove(id.as_bytes())?;
        Ok(true)
    }

    // --- Bookings ---

    pub fn put_booking(&self, booking: &Booking) -> Result<(), StorageError> {
        self.booking_tree
            .insert(booking.id.as_bytes(), encode(booking)?)?;
        Ok(())
    }

    pub fn get_booking(&self, id: &str) -> Result<Option<Booking>, StorageError> {
        match self.booking_tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Returns `false` if the booking did not exist.
    pub fn delete_booking(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.booking_tree.remove(id.as_bytes())?.is_some())
    }

    fn scan_bookings<F>(&self, mut keep: F) -> Result<Vec<Booking>, StorageError>
    where
        F: FnMut(&Booking) -> bool,
    {
        let mut bookings = Vec::new();
        for item in self.booking_tree.iter() {
            let (_, v) = item?;
            let booking: Booking = decode(&v)?;
            if keep(&booking) {
                bookings.push(booking);
            }
        }
        Ok(bookings)
    }

    pub fn list_bookings(&self) -> Result<Vec<Booking>, StorageError> {
        self.scan_bookings(|_| true)
    }

    pub fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>, StorageError> {
        self.scan_bookings(|b| b.user_id == user_id)
    }

    pub fn bookings_for_company(&self, company_id: &str) -> Result<Vec<Booking>, StorageError> {
        self.scan_bookings(|b| b.company_id == company_id)
    }

    pub fn bookings_for_user_and_company(
        &self,
        user_id: &str,
        company_id: &str,
    ) -> Result<Vec<Booking>, StorageError> {
        self.scan_bookings(|b| b.user_id == user_id && b.company_id == company_id)
    }

    /// Existing booking count for one user (quota input).
    pub fn count_bookings_for_user(&self, user_id: &str) -> Result<usize, StorageError> {
        Ok(self.bookings_for_user(user_id)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;
    use std::fs;

    fn open_temp(name: &str) -> (Storage, std::path::PathBuf) {
        let temp_dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&temp_dir); // Clean up previous test data
        let storage = Storage::open(temp_dir.to_str().unwrap()).expect("open storage");
        (storage, temp_dir)
    }

    fn company(id: &str, name: &str) -> Company {
        Company {
            id: id.to_string(),
            name: name.to_string(),
            position: "Engineer".to_string(),
            jd: "Build things".to_string(),
            location: "London".to_string(),
            tel: "020".to_string(),
            image: "https://example.com/logo.png".to_string(),
        }
    }

    fn booking(id: &str, user_id: &str, company_id: &str) -> Booking {
        Booking {
            id: id.to_string(),
            booking_date: Utc::now(),
            user_id: user_id.to_string(),
            company_id: company_id.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn user_roundtrip_and_email_lookup() {
        let (storage, temp_dir) = open_temp("slotbook_test_users");

        let user = User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            tel: "111".to_string(),
            role: Role::User,
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        };
        storage.put_user(&user).expect("put user");

        let by_id = storage.get_user("u1").expect("get").expect("present");
        assert_eq!(by_id.email, "ada@example.com");

        let by_email = storage
            .find_user_by_email("ada@example.com")
            .expect("lookup")
            .expect("present");
        assert_eq!(by_email.id, "u1");

        assert!(storage.get_user("missing").expect("get").is_none());

        let _ = fs::remove_dir_all(temp_dir);
    }

    #[test]
    fn user_email_change_moves_email_index() {
        let (storage, temp_dir) = open_temp("slotbook_test_user_email");

        let mut user = User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            tel: "111".to_string(),
            role: Role::User,
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        };
        storage.put_user(&user).unwrap();

        user.email = "lovelace@example.com".to_string();
        storage.put_user(&user).unwrap();

        assert!(storage
            .find_user_by_email("ada@example.com")
            .unwrap()
            .is_none());
        let found = storage
            .find_user_by_email("lovelace@example.com")
            .unwrap()
            .expect("re-indexed under the new address");
        assert_eq!(found.id, "u1");

        let _ = fs::remove_dir_all(temp_dir);
    }

    #[test]
    fn booking_filters_and_count() {
        let (storage, temp_dir) = open_temp("slotbook_test_bookings");

        storage.put_booking(&booking("b1", "u1", "c1")).unwrap();
        storage.put_booking(&booking("b2", "u1", "c2")).unwrap();
        storage.put_booking(&booking("b3", "u2", "c1")).unwrap();

        assert_eq!(storage.list_bookings().unwrap().len(), 3);
        assert_eq!(storage.bookings_for_user("u1").unwrap().len(), 2);
        assert_eq!(storage.bookings_for_company("c1").unwrap().len(), 2);
        assert_eq!(
            storage
                .bookings_for_user_and_company("u1", "c1")
                .unwrap()
                .len(),
            1
        );
        assert_eq!(storage.count_bookings_for_user("u1").unwrap(), 2);

        assert!(storage.delete_booking("b1").unwrap());
        assert!(!storage.delete_booking("b1").unwrap());
        assert_eq!(storage.count_bookings_for_user("u1").unwrap(), 1);

        let _ = fs::remove_dir_all(temp_dir);
    }

    #[test]
    fn company_delete_cascades_to_bookings() {
        let (storage, temp_dir) = open_temp("slotbook_test_cascade");

        storage.put_company(&company("c1", "Globex")).unwrap();
        storage.put_booking(&booking("b1", "u1", "c1")).unwrap();
        storage.put_booking(&booking("b2", "u2", "c1")).unwrap();
        storage.put_booking(&booking("b3", "u1", "c2")).unwrap();

        assert!(storage.delete_company("c1").unwrap());
        assert!(storage.get_company("c1").unwrap().is_none());
        assert!(storage.find_company_by_name("Globex").unwrap().is_none());
        // Only the unrelated booking survives
        let remaining = storage.list_bookings().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "b3");

        assert!(!storage.delete_company("c1").unwrap());

        let _ = fs::remove_dir_all(temp_dir);
    }

    #[test]
    fn company_rename_moves_name_index() {
        let (storage, temp_dir) = open_temp("slotbook_test_rename");

        storage.put_company(&company("c1", "Initech")).unwrap();
        let mut renamed = company("c1", "Initrode");
        renamed.position = "Manager".to_string();
        storage.put_company(&renamed).unwrap();

        assert!(storage.find_company_by_name("Initech").unwrap().is_none());
        let found = storage
            .find_company_by_name("Initrode")
            .unwrap()
            .expect("renamed company indexed");
        assert_eq!(found.id, "c1");
        assert_eq!(found.position, "Manager");

        let _ = fs::remove_dir_all(temp_dir);
    }
}
