use serde::{Deserialize, Serialize};

/// A person served by the drop-in center.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// ISO date (YYYY-MM-DD)
    pub dob: Option<String>,
    pub race: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Server-computed "first last" convenience field
    #[serde(default)]
    pub name: Option<String>,
}

impl Participant {
    pub fn display_name(&self) -> String {
        if let Some(ref name) = self.name {
            if !name.trim().is_empty() {
                return name.clone();
            }
        }
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        let joined = format!("{first} {last}");
        let joined = joined.trim();
        if joined.is_empty() {
            format!("Participant #{}", self.id)
        } else {
            joined.to_string()
        }
    }
}

/// A narrative case note attached to a participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseNote {
    pub id: i64,
    pub content: Option<String>,
    /// ISO timestamp from the server, no timezone suffix
    pub created_at: Option<String>,
}

/// Body for creating a case note.
#[derive(Debug, Clone, Serialize)]
pub struct NewCaseNote {
    pub content: String,
}

/// A service rendered to a participant (meal, shower, job coaching, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: i64,
    pub service_type: Option<String>,
    pub note: Option<String>,
    pub provided_at: Option<String>,
}

/// A referral of a participant to an employer or provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: i64,
    /// "employer" or "provider", when the referral names an organization
    pub kind: Option<String>,
    pub org_id: Option<i64>,
    pub org_name: Option<String>,
    pub status: Option<String>,
    pub note: Option<String>,
    pub referred_at: Option<String>,
}

impl Referral {
    pub fn org_display(&self) -> String {
        match (self.org_name.as_deref(), self.kind.as_deref()) {
            (Some(name), Some(kind)) => format!("{name} ({kind})"),
            (Some(name), None) => name.to_string(),
            _ => "-".to_string(),
        }
    }
}

/// Trim a server timestamp ("2026-08-31T14:05:00") down to minute
/// precision for table display.
pub fn timestamp_display(ts: Option<&str>) -> String {
    match ts {
        Some(ts) if ts.len() >= 16 => ts[..16].replace('T', " "),
        Some(ts) => ts.to_string(),
        None => "-".to_string(),
    }
}
