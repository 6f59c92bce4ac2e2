//! Wire models for the case-management API.
//!
//! Plain serde structs matching the JSON rows the backend serves, with
//! small display helpers for the roster and detail panes.

pub mod organization;
pub mod participant;
pub mod report;

pub use organization::{Employer, Provider};
pub use participant::{CaseNote, NewCaseNote, Participant, Referral, ServiceRecord};
pub use report::{EnrollmentPoint, ReferralOutcome, ServiceTypeCount};
