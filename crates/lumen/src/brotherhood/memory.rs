//! Process-local implementations of the storage and identity ports.
//!
//! Each store keeps its tables behind one mutex so every call observes and mutates a
//! consistent snapshot, which is what lets uniqueness checks double as constraints.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use super::domain::{
    AssignmentId, Ceremony, CeremonyId, CeremonyType, CeremonyTypeId, Dues, DuesId, IdentityId,
    Member, MemberId, NewCeremony, NewDues, NewMember, NewParticipation, NewRoleAssignment,
    Participation, ParticipationId, ReferenceEntry, Role, RoleAssignment, RoleId,
};
use super::policy::Actor;
use super::repository::{BrotherhoodRepository, IdentityDirectory, IdentityError, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    sequence: u64,
    members: BTreeMap<MemberId, Member>,
    roles: BTreeMap<RoleId, Role>,
    assignments: BTreeMap<AssignmentId, RoleAssignment>,
    dues: BTreeMap<DuesId, Dues>,
    ceremony_types: BTreeMap<CeremonyTypeId, CeremonyType>,
    ceremonies: BTreeMap<CeremonyId, Ceremony>,
    participations: BTreeMap<ParticipationId, Participation>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn require_member(&self, id: MemberId) -> Result<(), RepositoryError> {
        if self.members.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::MissingReference("member"))
        }
    }

    fn require_role(&self, id: RoleId) -> Result<(), RepositoryError> {
        if self.roles.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::MissingReference("role"))
        }
    }

    fn national_id_taken(&self, national_id: &str, except: Option<MemberId>) -> bool {
        self.members
            .values()
            .any(|member| member.national_id == national_id && Some(member.id) != except)
    }

    fn remove_ceremony(&mut self, id: CeremonyId) -> Option<Ceremony> {
        let ceremony = self.ceremonies.remove(&id)?;
        self.participations
            .retain(|_, participation| participation.ceremony != id);
        Some(ceremony)
    }
}

/// In-memory relational store used by the HTTP service, the CLI demo and tests.
///
/// Ids come from a single sequence shared by all tables.
#[derive(Debug, Default)]
pub struct InMemoryBrotherhood {
    tables: Mutex<Tables>,
}

impl InMemoryBrotherhood {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl BrotherhoodRepository for InMemoryBrotherhood {
    fn insert_member(&self, member: NewMember) -> Result<Member, RepositoryError> {
        let mut tables = self.tables()?;
        let identity_taken = tables
            .members
            .values()
            .any(|existing| existing.identity == member.identity);
        if identity_taken || tables.national_id_taken(&member.national_id, None) {
            return Err(RepositoryError::Conflict);
        }

        let id = MemberId(tables.next_id());
        let stored = Member {
            id,
            name: member.name,
            surname: member.surname,
            national_id: member.national_id,
            birth_date: member.birth_date,
            join_date: member.join_date,
            state: member.state,
            photo: member.photo,
            identity: member.identity,
        };
        tables.members.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_member(&self, member: &Member) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.members.contains_key(&member.id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.national_id_taken(&member.national_id, Some(member.id)) {
            return Err(RepositoryError::Conflict);
        }
        tables.members.insert(member.id, member.clone());
        Ok(())
    }

    fn fetch_member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError> {
        Ok(self.tables()?.members.get(&id).cloned())
    }

    fn member_by_identity(&self, identity: IdentityId) -> Result<Option<Member>, RepositoryError> {
        Ok(self
            .tables()?
            .members
            .values()
            .find(|member| member.identity == identity)
            .cloned())
    }

    fn member_by_national_id(&self, national_id: &str) -> Result<Option<Member>, RepositoryError> {
        Ok(self
            .tables()?
            .members
            .values()
            .find(|member| member.national_id == national_id)
            .cloned())
    }

    fn list_members(&self) -> Result<Vec<Member>, RepositoryError> {
        Ok(self.tables()?.members.values().cloned().collect())
    }

    fn delete_member(&self, id: MemberId) -> Result<Member, RepositoryError> {
        let mut tables = self.tables()?;
        let member = tables.members.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.assignments.retain(|_, assignment| assignment.member != id);
        tables.dues.retain(|_, dues| dues.member != id);
        tables
            .participations
            .retain(|_, participation| participation.member != id);
        Ok(member)
    }

    fn insert_role(&self, role: ReferenceEntry) -> Result<Role, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.roles.values().any(|existing| existing.name == role.name) {
            return Err(RepositoryError::Conflict);
        }
        let id = RoleId(tables.next_id());
        let stored = Role {
            id,
            name: role.name,
            description: role.description,
        };
        tables.roles.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_role(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        Ok(self.tables()?.roles.get(&id).cloned())
    }

    fn role_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError> {
        Ok(self
            .tables()?
            .roles
            .values()
            .find(|role| role.name == name)
            .cloned())
    }

    fn list_roles(&self) -> Result<Vec<Role>, RepositoryError> {
        Ok(self.tables()?.roles.values().cloned().collect())
    }

    fn delete_role(&self, id: RoleId) -> Result<Role, RepositoryError> {
        let mut tables = self.tables()?;
        let role = tables.roles.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.assignments.retain(|_, assignment| assignment.role != id);
        tables
            .participations
            .retain(|_, participation| participation.role != id);
        Ok(role)
    }

    fn insert_assignment(
        &self,
        assignment: NewRoleAssignment,
    ) -> Result<RoleAssignment, RepositoryError> {
        let mut tables = self.tables()?;
        tables.require_member(assignment.member)?;
        tables.require_role(assignment.role)?;
        let duplicate = tables.assignments.values().any(|existing| {
            existing.member == assignment.member && existing.role == assignment.role
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let id = AssignmentId(tables.next_id());
        let stored = RoleAssignment {
            id,
            member: assignment.member,
            role: assignment.role,
            start_date: assignment.start_date,
            end_date: assignment.end_date,
        };
        tables.assignments.insert(id, stored.clone());
        Ok(stored)
    }

    fn find_assignment(
        &self,
        member: MemberId,
        role: RoleId,
    ) -> Result<Option<RoleAssignment>, RepositoryError> {
        Ok(self
            .tables()?
            .assignments
            .values()
            .find(|assignment| assignment.member == member && assignment.role == role)
            .cloned())
    }

    fn assignments_for_member(
        &self,
        member: MemberId,
    ) -> Result<Vec<RoleAssignment>, RepositoryError> {
        Ok(self
            .tables()?
            .assignments
            .values()
            .filter(|assignment| assignment.member == member)
            .cloned()
            .collect())
    }

    fn assignments_for_role(&self, role: RoleId) -> Result<Vec<RoleAssignment>, RepositoryError> {
        Ok(self
            .tables()?
            .assignments
            .values()
            .filter(|assignment| assignment.role == role)
            .cloned()
            .collect())
    }

    fn delete_assignments(&self, member: MemberId, role: RoleId) -> Result<usize, RepositoryError> {
        let mut tables = self.tables()?;
        let before = tables.assignments.len();
        tables
            .assignments
            .retain(|_, assignment| !(assignment.member == member && assignment.role == role));
        Ok(before - tables.assignments.len())
    }

    fn insert_dues(&self, dues: NewDues) -> Result<Dues, RepositoryError> {
        let mut tables = self.tables()?;
        tables.require_member(dues.member)?;
        let id = DuesId(tables.next_id());
        let stored = Dues {
            id,
            member: dues.member,
            amount: dues.amount,
            created_on: dues.created_on,
            payment_state: dues.payment_state,
            period: dues.period,
        };
        tables.dues.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_dues(&self, dues: &Dues) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.dues.get_mut(&dues.id) {
            Some(existing) => {
                *existing = dues.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_dues(&self, id: DuesId) -> Result<Option<Dues>, RepositoryError> {
        Ok(self.tables()?.dues.get(&id).cloned())
    }

    fn dues_for_member(&self, member: MemberId) -> Result<Vec<Dues>, RepositoryError> {
        Ok(self
            .tables()?
            .dues
            .values()
            .filter(|dues| dues.member == member)
            .cloned()
            .collect())
    }

    fn list_dues(&self) -> Result<Vec<Dues>, RepositoryError> {
        Ok(self.tables()?.dues.values().cloned().collect())
    }

    fn delete_dues(&self, id: DuesId) -> Result<Dues, RepositoryError> {
        self.tables()?
            .dues
            .remove(&id)
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_ceremony_type(
        &self,
        ceremony_type: ReferenceEntry,
    ) -> Result<CeremonyType, RepositoryError> {
        let mut tables = self.tables()?;
        if tables
            .ceremony_types
            .values()
            .any(|existing| existing.name == ceremony_type.name)
        {
            return Err(RepositoryError::Conflict);
        }
        let id = CeremonyTypeId(tables.next_id());
        let stored = CeremonyType {
            id,
            name: ceremony_type.name,
            description: ceremony_type.description,
        };
        tables.ceremony_types.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_ceremony_type(
        &self,
        id: CeremonyTypeId,
    ) -> Result<Option<CeremonyType>, RepositoryError> {
        Ok(self.tables()?.ceremony_types.get(&id).cloned())
    }

    fn ceremony_type_by_name(&self, name: &str) -> Result<Option<CeremonyType>, RepositoryError> {
        Ok(self
            .tables()?
            .ceremony_types
            .values()
            .find(|ceremony_type| ceremony_type.name == name)
            .cloned())
    }

    fn list_ceremony_types(&self) -> Result<Vec<CeremonyType>, RepositoryError> {
        Ok(self.tables()?.ceremony_types.values().cloned().collect())
    }

    fn delete_ceremony_type(&self, id: CeremonyTypeId) -> Result<CeremonyType, RepositoryError> {
        let mut tables = self.tables()?;
        let ceremony_type = tables
            .ceremony_types
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        let orphaned: Vec<CeremonyId> = tables
            .ceremonies
            .values()
            .filter(|ceremony| ceremony.ceremony_type == id)
            .map(|ceremony| ceremony.id)
            .collect();
        for ceremony in orphaned {
            tables.remove_ceremony(ceremony);
        }
        Ok(ceremony_type)
    }

    fn insert_ceremony(&self, ceremony: NewCeremony) -> Result<Ceremony, RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.ceremony_types.contains_key(&ceremony.ceremony_type) {
            return Err(RepositoryError::MissingReference("ceremony type"));
        }
        let id = CeremonyId(tables.next_id());
        let stored = Ceremony {
            id,
            ceremony_type: ceremony.ceremony_type,
            start_date: ceremony.start_date,
            end_date: ceremony.end_date,
            description: ceremony.description,
        };
        tables.ceremonies.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_ceremony(&self, id: CeremonyId) -> Result<Option<Ceremony>, RepositoryError> {
        Ok(self.tables()?.ceremonies.get(&id).cloned())
    }

    fn list_ceremonies(&self) -> Result<Vec<Ceremony>, RepositoryError> {
        Ok(self.tables()?.ceremonies.values().cloned().collect())
    }

    fn delete_ceremony(&self, id: CeremonyId) -> Result<Ceremony, RepositoryError> {
        self.tables()?
            .remove_ceremony(id)
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_participation(
        &self,
        participation: NewParticipation,
    ) -> Result<Participation, RepositoryError> {
        let mut tables = self.tables()?;
        tables.require_member(participation.member)?;
        tables.require_role(participation.role)?;
        if !tables.ceremonies.contains_key(&participation.ceremony) {
            return Err(RepositoryError::MissingReference("ceremony"));
        }
        let duplicate = tables.participations.values().any(|existing| {
            existing.member == participation.member
                && existing.ceremony == participation.ceremony
                && existing.role == participation.role
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let id = ParticipationId(tables.next_id());
        let stored = Participation {
            id,
            member: participation.member,
            ceremony: participation.ceremony,
            role: participation.role,
            segment: participation.segment,
        };
        tables.participations.insert(id, stored.clone());
        Ok(stored)
    }

    fn participations_for_ceremony(
        &self,
        ceremony: CeremonyId,
    ) -> Result<Vec<Participation>, RepositoryError> {
        Ok(self
            .tables()?
            .participations
            .values()
            .filter(|participation| participation.ceremony == ceremony)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
struct IdentityRecord {
    id: IdentityId,
    credential_digest: String,
    groups: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Directory {
    sequence: u64,
    by_username: HashMap<String, IdentityRecord>,
}

/// Identity directory keeping salted SHA-256 credential digests.
///
/// A development stand-in for the external authentication system: a single fast hash
/// round is not a password-storage scheme, so production deployments resolve identities
/// through the upstream authenticator instead.
#[derive(Debug, Default)]
pub struct InMemoryIdentityDirectory {
    directory: Mutex<Directory>,
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn directory(&self) -> Result<MutexGuard<'_, Directory>, IdentityError> {
        self.directory
            .lock()
            .map_err(|_| IdentityError::Unavailable("directory mutex poisoned".to_string()))
    }
}

/// Digest of a credential salted with its username. Fast by construction; only suitable
/// for the in-memory development directory.
pub fn credential_digest(username: &str, credential: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update([0u8]);
    hasher.update(credential.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl IdentityDirectory for InMemoryIdentityDirectory {
    fn exists(&self, username: &str) -> Result<bool, IdentityError> {
        Ok(self.directory()?.by_username.contains_key(username))
    }

    fn provision(&self, username: &str, credential: &str) -> Result<IdentityId, IdentityError> {
        let mut directory = self.directory()?;
        if directory.by_username.contains_key(username) {
            return Err(IdentityError::Conflict(username.to_string()));
        }
        directory.sequence += 1;
        let id = IdentityId(directory.sequence);
        directory.by_username.insert(
            username.to_string(),
            IdentityRecord {
                id,
                credential_digest: credential_digest(username, credential),
                groups: BTreeSet::new(),
            },
        );
        Ok(id)
    }

    fn grant_group(&self, identity: IdentityId, group: &str) -> Result<(), IdentityError> {
        let mut directory = self.directory()?;
        let record = directory
            .by_username
            .values_mut()
            .find(|record| record.id == identity)
            .ok_or(IdentityError::NotFound)?;
        record.groups.insert(group.to_string());
        Ok(())
    }

    fn resolve(&self, username: &str) -> Result<Option<Actor>, IdentityError> {
        Ok(self
            .directory()?
            .by_username
            .get(username)
            .map(|record| Actor {
                identity: record.id,
                username: username.to_string(),
                groups: record.groups.clone(),
            }))
    }

    fn verify_credential(&self, username: &str, credential: &str) -> Result<bool, IdentityError> {
        Ok(self
            .directory()?
            .by_username
            .get(username)
            .is_some_and(|record| {
                record.credential_digest == credential_digest(username, credential)
            }))
    }

    fn revoke(&self, identity: IdentityId) -> Result<(), IdentityError> {
        let mut directory = self.directory()?;
        let before = directory.by_username.len();
        directory.by_username.retain(|_, record| record.id != identity);
        if directory.by_username.len() == before {
            Err(IdentityError::NotFound)
        } else {
            Ok(())
        }
    }
}
