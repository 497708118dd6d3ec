use serde::{Deserialize, Serialize};

/// Marketplace roles, fixed numeric ids on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    Admin = 1,
    Pharmacy = 2,
    Patient = 3,
}

impl Role {
    pub fn id(self) -> u8 { self as u8 }
    pub fn from_id(id: u8) -> Option<Role> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Pharmacy),
            3 => Some(Role::Patient),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = String;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Role::from_id(v).ok_or_else(|| format!("unknown role id {}", v))
    }
}

impl From<Role> for u8 {
    fn from(r: Role) -> u8 { r.id() }
}

/// Pharmacy onboarding state machine positions. Transitions are backend
/// driven; the client only observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PharmacyStatus {
    OnboardingRequired,
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyProfile {
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "roleId")]
    pub role: Role,
    #[serde(default)]
    pub status: Option<PharmacyStatus>,
    #[serde(default)]
    pub pharmacy: Option<PharmacyProfile>,
}

impl User {
    /// Status is meaningful only for pharmacy operators; every other role
    /// ignores whatever the backend happens to send.
    pub fn pharmacy_status(&self) -> Option<PharmacyStatus> {
        if self.role == Role::Pharmacy { self.status } else { None }
    }

    pub fn is_approved_pharmacy(&self) -> bool {
        self.pharmacy_status() == Some(PharmacyStatus::Approved)
    }
}
