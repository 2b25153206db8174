//! slotbook: job interview booking API in Rust
//!
//! REST service for booking interview slots between users and companies,
//! backed by a Sled document store with role-based access control
//! (admin vs regular user) and JWT authentication.
//!
//! The core lives in `policy` (authorization + quota rules) and `service`
//! (the booking workflow); `rest` is the Axum surface around them.

pub mod auth;
pub mod error;
pub mod mail;
pub mod models;
pub mod policy;
pub mod rest;
pub mod service;
pub mod storage;
