use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{
    AssignmentId, Ceremony, CeremonyType, CeremonyTypeId, Dues, Member, MemberId, Participation,
    ParticipationId, Role, RoleAssignment, RoleId,
};
use super::report::DuesTotals;

#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
}

/// Member row annotated with the number of dues records it owns.
#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    #[serde(flatten)]
    pub member: Member,
    pub dues_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberListView {
    pub is_admin: bool,
    pub members: Vec<MemberSummary>,
    pub roles: Vec<Role>,
    pub selected_role: Option<RoleId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeldRoleView {
    pub assignment: AssignmentId,
    pub role: RoleId,
    pub role_name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl HeldRoleView {
    pub(crate) fn new(assignment: &RoleAssignment, role: &Role) -> Self {
        Self {
            assignment: assignment.id,
            role: role.id,
            role_name: role.name.clone(),
            start_date: assignment.start_date,
            end_date: assignment.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberDetailView {
    pub is_admin: bool,
    pub member: Member,
    pub age: i32,
    pub roles: Vec<HeldRoleView>,
}

/// Data the role assignment form needs: the member and the selectable roles.
#[derive(Debug, Clone, Serialize)]
pub struct RoleAssignmentContext {
    pub member: Member,
    pub roles: Vec<Role>,
    pub held: Vec<HeldRoleView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuesListView {
    pub is_admin: bool,
    pub member: Member,
    pub dues: Vec<Dues>,
    #[serde(flatten)]
    pub totals: DuesTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkDuesOutcome {
    pub created: usize,
    pub dues: Vec<Dues>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CeremonySummary {
    #[serde(flatten)]
    pub ceremony: Ceremony,
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CeremonyListView {
    pub is_admin: bool,
    pub ceremonies: Vec<CeremonySummary>,
    pub ceremony_types: Vec<CeremonyType>,
    pub selected_type: Option<CeremonyTypeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantView {
    pub participation: ParticipationId,
    pub member: MemberId,
    pub member_name: String,
    pub role: RoleId,
    pub role_name: String,
    pub segment: Option<i32>,
}

impl ParticipantView {
    pub(crate) fn new(participation: &Participation, member: &Member, role: &Role) -> Self {
        Self {
            participation: participation.id,
            member: member.id,
            member_name: member.full_name(),
            role: role.id,
            role_name: role.name.clone(),
            segment: participation.segment,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CeremonyDetailView {
    pub is_admin: bool,
    #[serde(flatten)]
    pub ceremony: CeremonySummary,
    pub participants: Vec<ParticipantView>,
}

/// Candidates offered by the participant form: active members and every role.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantContext {
    pub ceremony: CeremonySummary,
    pub members: Vec<Member>,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleCatalogView {
    pub is_admin: bool,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CeremonyTypeCatalogView {
    pub is_admin: bool,
    pub ceremony_types: Vec<CeremonyType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Created,
    AlreadyAssigned,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleAssignmentResult {
    pub outcome: AssignmentOutcome,
    pub assignment: RoleAssignment,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipationResult {
    pub outcome: AssignmentOutcome,
    pub participation: Participation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub roles_created: usize,
    pub ceremony_types_created: usize,
}
