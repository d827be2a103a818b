//! Forwarding of `request-open` inquiries
//!
//! Open-mode profiles never get a reservation row. The request is handed to
//! the messaging service, which owns threads between clients and providers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A free-form request addressed to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub profile_id: String,

    /// Recipient: the profile owner
    pub owner_id: String,

    pub client_id: String,
    pub service_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub message: Option<String>,
}

/// Messaging collaborator receiving inquiries
pub trait InquirySink: Send + Sync {
    /// Deliver an inquiry to the provider
    fn forward(&self, inquiry: &Inquiry) -> Result<()>;
}

/// Sink that only records inquiries in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInquirySink;

impl InquirySink for LoggingInquirySink {
    fn forward(&self, inquiry: &Inquiry) -> Result<()> {
        tracing::info!(
            profile_id = %inquiry.profile_id,
            owner_id = %inquiry.owner_id,
            client_id = %inquiry.client_id,
            date = ?inquiry.date,
            "Inquiry forwarded to provider"
        );
        Ok(())
    }
}
