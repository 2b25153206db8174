//! Seed script for the slotbook store.
//!
//! Creates the admin account (public registration only ever issues the
//! `user` role) and a few sample companies to book against.
//! Run: cargo run --bin seed

use chrono::Utc;
use uuid::Uuid;

use slotbook::auth::hash_password;
use slotbook::models::{Company, Role, User};
use slotbook::storage::Storage;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let data_dir = std::env::var("SLOTBOOK_DATA_DIR").unwrap_or_else(|_| "./slotbook_data".into());
    let admin_email =
        std::env::var("SLOTBOOK_ADMIN_EMAIL").unwrap_or_else(|_| "admin@slotbook.local".into());
    let admin_password = std::env::var("SLOTBOOK_ADMIN_PASSWORD").unwrap_or_else(|_| "admin".into());

    let storage = Storage::open(&data_dir)?;

    if storage.find_user_by_email(&admin_email)?.is_none() {
        let admin = User {
            id: Uuid::new_v4().to_string(),
            name: "Admin".to_string(),
            email: admin_email.clone(),
            tel: String::new(),
            role: Role::Admin,
            password_hash: hash_password(&admin_password)?,
            created_at: Utc::now(),
        };
        storage.put_user(&admin)?;
        println!("Created admin account {admin_email}");
    } else {
        println!("Admin account {admin_email} already exists");
    }

    let samples = [
        ("Globex", "Software Engineer", "Build and run backend services.", "London"),
        ("Initech", "Data Analyst", "Reporting and dashboards for TPS metrics.", "Austin"),
        ("Hooli", "Product Manager", "Own the compression platform roadmap.", "Palo Alto"),
    ];
    for (name, position, jd, location) in samples {
        if storage.find_company_by_name(name)?.is_some() {
            println!("Company {name} already exists");
            continue;
        }
        let company = Company {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            position: position.to_string(),
            jd: jd.to_string(),
            location: location.to_string(),
            tel: "000-000-0000".to_string(),
            image: format!("https://placehold.co/200x200?text={name}"),
        };
        storage.put_company(&company)?;
        println!("Created company {name} ({})", company.id);
    }

    Ok(())
}
