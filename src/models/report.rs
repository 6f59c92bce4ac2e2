use serde::{Deserialize, Serialize};

/// Daily enrollment count from `/v1/reports/enrollments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentPoint {
    pub date: String,
    pub count: i64,
}

/// Per-day service count by type from `/v1/reports/services`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceTypeCount {
    pub service_type: Option<String>,
    pub date: String,
    pub count: i64,
}

/// Referral count by organization and status from `/v1/reports/referrals`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralOutcome {
    pub org_name: Option<String>,
    pub kind: String,
    pub status: Option<String>,
    pub count: i64,
}
