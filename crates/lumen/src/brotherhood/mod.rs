//! Membership management for a religious brotherhood: members, role assignments,
//! dues, ceremonies and participation, behind an administrator/member access policy.

pub mod domain;
pub mod memory;
pub mod policy;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;
pub mod views;

pub use domain::{
    AssignmentId, Ceremony, CeremonyId, CeremonyType, CeremonyTypeId, Dues, DuesId, DuesPeriod,
    IdentityId, Member, MemberId, MemberState, Participation, ParticipationId, PaymentState,
    ReferenceEntry, Role, RoleAssignment, RoleId,
};
pub use memory::{InMemoryBrotherhood, InMemoryIdentityDirectory};
pub use policy::{is_admin, Actor, MemberScope, ADMIN_GROUP};
pub use report::{DuesTotals, StatisticsView};
pub use repository::{BrotherhoodRepository, IdentityDirectory, IdentityError, RepositoryError};
pub use router::{brotherhood_router, CurrentActor, PageForm, AUTHENTICATED_USER_HEADER};
pub use service::{
    BrotherhoodError, BrotherhoodService, STANDARD_CEREMONY_TYPES, STANDARD_ROLES,
};
pub use validation::{
    BulkDuesForm, CeremonyForm, DuesForm, MemberForm, ParticipantForm, ReferenceForm,
    RegistrationForm, RoleAssignmentForm, RoleRemovalForm, ValidationErrors,
};
pub use views::{AssignmentOutcome, SeedSummary};

#[cfg(test)]
mod tests;
