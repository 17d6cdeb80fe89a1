use super::domain::{
    Ceremony, CeremonyId, CeremonyType, CeremonyTypeId, Dues, DuesId, IdentityId,
    Member, MemberId, NewCeremony, NewDues, NewMember, NewParticipation, NewRoleAssignment,
    Participation, ReferenceEntry, Role, RoleAssignment, RoleId,
};
use super::policy::Actor;

/// Storage abstraction mirroring the relational schema.
///
/// Implementations enforce the unique constraints (member national ID, member identity,
/// role and ceremony-type names, member/role pairs, member/ceremony/role triples) by
/// returning [`RepositoryError::Conflict`], reject dangling references with
/// [`RepositoryError::MissingReference`], and cascade deletes from members, ceremonies,
/// roles and ceremony types to their dependents.
pub trait BrotherhoodRepository: Send + Sync {
    fn insert_member(&self, member: NewMember) -> Result<Member, RepositoryError>;
    fn update_member(&self, member: &Member) -> Result<(), RepositoryError>;
    fn fetch_member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError>;
    fn member_by_identity(&self, identity: IdentityId) -> Result<Option<Member>, RepositoryError>;
    fn member_by_national_id(&self, national_id: &str) -> Result<Option<Member>, RepositoryError>;
    fn list_members(&self) -> Result<Vec<Member>, RepositoryError>;
    /// Removes the member with its role assignments, dues and participations.
    fn delete_member(&self, id: MemberId) -> Result<Member, RepositoryError>;

    fn insert_role(&self, role: ReferenceEntry) -> Result<Role, RepositoryError>;
    fn fetch_role(&self, id: RoleId) -> Result<Option<Role>, RepositoryError>;
    fn role_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError>;
    fn list_roles(&self) -> Result<Vec<Role>, RepositoryError>;
    /// Removes the role with every assignment and participation that references it.
    fn delete_role(&self, id: RoleId) -> Result<Role, RepositoryError>;

    fn insert_assignment(
        &self,
        assignment: NewRoleAssignment,
    ) -> Result<RoleAssignment, RepositoryError>;
    fn find_assignment(
        &self,
        member: MemberId,
        role: RoleId,
    ) -> Result<Option<RoleAssignment>, RepositoryError>;
    fn assignments_for_member(&self, member: MemberId)
        -> Result<Vec<RoleAssignment>, RepositoryError>;
    fn assignments_for_role(&self, role: RoleId) -> Result<Vec<RoleAssignment>, RepositoryError>;
    /// Deletes every assignment of the pair, returning how many rows were removed.
    fn delete_assignments(&self, member: MemberId, role: RoleId) -> Result<usize, RepositoryError>;

    fn insert_dues(&self, dues: NewDues) -> Result<Dues, RepositoryError>;
    fn update_dues(&self, dues: &Dues) -> Result<(), RepositoryError>;
    fn fetch_dues(&self, id: DuesId) -> Result<Option<Dues>, RepositoryError>;
    fn dues_for_member(&self, member: MemberId) -> Result<Vec<Dues>, RepositoryError>;
    fn list_dues(&self) -> Result<Vec<Dues>, RepositoryError>;
    fn delete_dues(&self, id: DuesId) -> Result<Dues, RepositoryError>;

    fn insert_ceremony_type(
        &self,
        ceremony_type: ReferenceEntry,
    ) -> Result<CeremonyType, RepositoryError>;
    fn fetch_ceremony_type(
        &self,
        id: CeremonyTypeId,
    ) -> Result<Option<CeremonyType>, RepositoryError>;
    fn ceremony_type_by_name(&self, name: &str) -> Result<Option<CeremonyType>, RepositoryError>;
    fn list_ceremony_types(&self) -> Result<Vec<CeremonyType>, RepositoryError>;
    /// Removes the type with its ceremonies and their participations.
    fn delete_ceremony_type(&self, id: CeremonyTypeId) -> Result<CeremonyType, RepositoryError>;

    fn insert_ceremony(&self, ceremony: NewCeremony) -> Result<Ceremony, RepositoryError>;
    fn fetch_ceremony(&self, id: CeremonyId) -> Result<Option<Ceremony>, RepositoryError>;
    fn list_ceremonies(&self) -> Result<Vec<Ceremony>, RepositoryError>;
    /// Removes the ceremony with its participations.
    fn delete_ceremony(&self, id: CeremonyId) -> Result<Ceremony, RepositoryError>;

    fn insert_participation(
        &self,
        participation: NewParticipation,
    ) -> Result<Participation, RepositoryError>;
    fn participations_for_ceremony(
        &self,
        ceremony: CeremonyId,
    ) -> Result<Vec<Participation>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("referenced {0} does not exist")]
    MissingReference(&'static str),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Authentication identities, owned by the external authentication system.
///
/// Usernames are unique; members log in with their national ID as username.
pub trait IdentityDirectory: Send + Sync {
    fn exists(&self, username: &str) -> Result<bool, IdentityError>;
    /// Creates an identity, failing with [`IdentityError::Conflict`] when the username is taken.
    fn provision(&self, username: &str, credential: &str) -> Result<IdentityId, IdentityError>;
    fn grant_group(&self, identity: IdentityId, group: &str) -> Result<(), IdentityError>;
    fn resolve(&self, username: &str) -> Result<Option<Actor>, IdentityError>;
    fn verify_credential(&self, username: &str, credential: &str) -> Result<bool, IdentityError>;
    fn revoke(&self, identity: IdentityId) -> Result<(), IdentityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity '{0}' already exists")]
    Conflict(String),
    #[error("identity not found")]
    NotFound,
    #[error("identity directory unavailable: {0}")]
    Unavailable(String),
}
