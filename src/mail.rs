//! Booking confirmation dispatch, fire-and-forget.
//!
//! The create handler responds to the caller first and spawns the dispatch on
//! a detached task. A failed send is logged and dropped, never retried or
//! surfaced to the caller. With no webhook configured the message is only
//! logged, which keeps local development and tests free of network calls.

use serde_json::json;
use tracing::{info, warn};

use crate::models::{Booking, User};

#[derive(Clone)]
pub struct Mailer {
    webhook: Option<String>,
    client: reqwest::Client,
}

impl Mailer {
    pub fn new(webhook: Option<String>) -> Self {
        Self {
            webhook,
            client: reqwest::Client::new(),
        }
    }

    /// Spawn a detached confirmation send for a freshly created booking.
    pub fn dispatch_confirmation(&self, user: &User, booking: &Booking) {
        let mailer = self.clone();
        let user = user.clone();
        let booking = booking.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_confirmation(&user, &booking).await {
                warn!(
                    booking_id = %booking.id,
                    to = %user.email,
                    "booking confirmation dispatch failed: {e}"
                );
            }
        });
    }

    async fn send_confirmation(&self, user: &User, booking: &Booking) -> Result<(), reqwest::Error> {
        let subject = "Your interview booking is confirmed";
        let body = format!(
            "Hi {},\n\nYour interview on {} is booked.\nBooking id: {}",
            user.name,
            booking.booking_date.format("%Y-%m-%d %H:%M"),
            booking.id,
        );

        let Some(url) = &self.webhook else {
            info!(to = %user.email, booking_id = %booking.id, "mail webhook not configured, logging only");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&json!({
                "to": user.email,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await?;
        response.error_for_status()?;
        info!(to = %user.email, booking_id = %booking.id, "booking confirmation dispatched");
        Ok(())
    }
}
