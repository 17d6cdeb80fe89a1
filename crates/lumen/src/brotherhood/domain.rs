use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a brotherhood member.
    MemberId
);
entity_id!(RoleId);
entity_id!(AssignmentId);
entity_id!(DuesId);
entity_id!(CeremonyTypeId);
entity_id!(CeremonyId);
entity_id!(ParticipationId);
entity_id!(
    /// Identifier of the authentication identity a member logs in with.
    IdentityId
);

/// Lifecycle state of a member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemberState {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl MemberState {
    pub const ALL: [MemberState; 3] = [Self::Active, Self::Inactive, Self::Suspended];

    pub const fn label(self) -> &'static str {
        match self {
            MemberState::Active => "Activo",
            MemberState::Inactive => "Inactivo",
            MemberState::Suspended => "Suspendido",
        }
    }

    /// Accepts the wire name (`active`) as well as the display label (`Activo`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "active" | "activo" => Some(Self::Active),
            "inactive" | "inactivo" => Some(Self::Inactive),
            "suspended" | "suspendido" => Some(Self::Suspended),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentState {
    #[default]
    Pending,
    Paid,
}

impl PaymentState {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentState::Pending => "Pendiente",
            PaymentState::Paid => "Pagado",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "pending" | "pendiente" => Some(Self::Pending),
            "paid" | "pagado" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Half-year the dues are charged for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuesPeriod {
    #[default]
    FirstHalf,
    SecondHalf,
}

impl DuesPeriod {
    pub const fn label(self) -> &'static str {
        match self {
            DuesPeriod::FirstHalf => "1er Semestre",
            DuesPeriod::SecondHalf => "2do Semestre",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "first-half" | "sem1" => Some(Self::FirstHalf),
            "second-half" | "sem2" => Some(Self::SecondHalf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub surname: String,
    pub national_id: String,
    pub birth_date: NaiveDate,
    pub join_date: NaiveDate,
    pub state: MemberState,
    pub photo: Option<String>,
    pub identity: IdentityId,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }

    /// Age as the difference between calendar years, ignoring month and day.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        calendar_age(self.birth_date, today)
    }
}

pub(crate) fn calendar_age(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    today.year() - birth_date.year()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub identity: IdentityId,
    pub name: String,
    pub surname: String,
    pub national_id: String,
    pub birth_date: NaiveDate,
    pub join_date: NaiveDate,
    pub state: MemberState,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeremonyType {
    pub id: CeremonyTypeId,
    pub name: String,
    pub description: Option<String>,
}

/// Name and description shared by the role and ceremony-type catalogues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub name: String,
    pub description: Option<String>,
}

impl ReferenceEntry {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
        }
    }
}

/// A member holding a role over an optional interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: AssignmentId,
    pub member: MemberId,
    pub role: RoleId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoleAssignment {
    pub member: MemberId,
    pub role: RoleId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dues {
    pub id: DuesId,
    pub member: MemberId,
    pub amount: Decimal,
    pub created_on: NaiveDate,
    pub payment_state: PaymentState,
    pub period: DuesPeriod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDues {
    pub member: MemberId,
    pub amount: Decimal,
    pub created_on: NaiveDate,
    pub payment_state: PaymentState,
    pub period: DuesPeriod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ceremony {
    pub id: CeremonyId,
    pub ceremony_type: CeremonyTypeId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCeremony {
    pub ceremony_type: CeremonyTypeId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

/// A member taking part in a ceremony under a role, optionally in a numbered segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    pub id: ParticipationId,
    pub member: MemberId,
    pub ceremony: CeremonyId,
    pub role: RoleId,
    pub segment: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParticipation {
    pub member: MemberId,
    pub ceremony: CeremonyId,
    pub role: RoleId,
    pub segment: Option<i32>,
}
