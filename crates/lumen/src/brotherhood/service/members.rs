use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use super::{BrotherhoodError, BrotherhoodService};
use crate::brotherhood::domain::{Member, MemberId, NewMember, RoleId};
use crate::brotherhood::policy::{is_admin, Actor, MemberScope};
use crate::brotherhood::repository::{
    BrotherhoodRepository, IdentityDirectory, IdentityError, RepositoryError,
};
use crate::brotherhood::validation::{
    optional_filter, MemberDraft, MemberForm, RegistrationForm, ValidationErrors,
};
use crate::brotherhood::views::{HeldRoleView, MemberDetailView, MemberListView, MemberSummary};

const MEMBER_EXISTS: &str = "a member with this national ID already exists";
const IDENTITY_EXISTS: &str = "a user with this national ID already exists";

impl<R, I> BrotherhoodService<R, I>
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    /// Members visible to the actor, optionally narrowed to holders of one role.
    pub fn list_members(
        &self,
        actor: &Actor,
        role_filter: Option<&str>,
    ) -> Result<MemberListView, BrotherhoodError> {
        let scope = MemberScope::for_actor(actor);
        let selected_role = optional_filter("role", role_filter)?.map(RoleId);
        let holders: Option<BTreeSet<MemberId>> = match selected_role {
            Some(role) => Some(
                self.repository
                    .assignments_for_role(role)?
                    .into_iter()
                    .map(|assignment| assignment.member)
                    .collect(),
            ),
            None => None,
        };

        let mut dues_counts: HashMap<MemberId, usize> = HashMap::new();
        for dues in self.repository.list_dues()? {
            *dues_counts.entry(dues.member).or_default() += 1;
        }

        let members = self
            .repository
            .list_members()?
            .into_iter()
            .filter(|member| scope.admits(member))
            .filter(|member| holders.as_ref().map_or(true, |set| set.contains(&member.id)))
            .map(|member| MemberSummary {
                dues_count: dues_counts.get(&member.id).copied().unwrap_or_default(),
                member,
            })
            .collect();

        Ok(MemberListView {
            is_admin: is_admin(actor),
            members,
            roles: self.repository.list_roles()?,
            selected_role,
        })
    }

    pub fn member_detail(
        &self,
        actor: &Actor,
        id: MemberId,
    ) -> Result<MemberDetailView, BrotherhoodError> {
        let member = self.scoped_member(actor, id)?;
        let roles = self.held_roles(member.id)?;
        Ok(MemberDetailView {
            is_admin: is_admin(actor),
            age: member.age_on(self.today()),
            member,
            roles,
        })
    }

    /// Creates a member together with an identity whose username and initial
    /// credential are the national ID.
    pub fn create_member(
        &self,
        actor: &Actor,
        form: &MemberForm,
    ) -> Result<Member, BrotherhoodError> {
        self.require_admin(actor, "create member")?;

        let mut errors = ValidationErrors::default();
        let draft = form.validate(self.today(), &mut errors);
        if !errors.has_field("national_id") {
            let national_id = form.national_id.trim();
            if self.repository.member_by_national_id(national_id)?.is_some() {
                errors.add("national_id", MEMBER_EXISTS);
            } else if self.identities.exists(national_id)? {
                errors.add("national_id", IDENTITY_EXISTS);
            }
        }
        let draft = errors.finish(draft)?;

        let credential = draft.national_id.clone();
        let member = self.provision_member(draft, &credential)?;
        info!(member = %member.id, username = %actor.username, "member created");
        Ok(member)
    }

    /// Updates a member the actor can see. The login username is left untouched.
    pub fn update_member(
        &self,
        actor: &Actor,
        id: MemberId,
        form: &MemberForm,
    ) -> Result<Member, BrotherhoodError> {
        let existing = self.scoped_member(actor, id)?;

        let mut errors = ValidationErrors::default();
        let draft = form.validate(self.today(), &mut errors);
        if !errors.has_field("national_id") {
            let taken_by_other = self
                .repository
                .member_by_national_id(form.national_id.trim())?
                .is_some_and(|other| other.id != existing.id);
            if taken_by_other {
                errors.add("national_id", MEMBER_EXISTS);
            }
        }
        let draft = errors.finish(draft)?;

        let updated = Member {
            id: existing.id,
            identity: existing.identity,
            name: draft.name,
            surname: draft.surname,
            national_id: draft.national_id,
            birth_date: draft.birth_date,
            join_date: draft.join_date,
            state: draft.state,
            photo: draft.photo,
        };
        self.repository
            .update_member(&updated)
            .map_err(|err| match err {
                RepositoryError::Conflict => {
                    BrotherhoodError::Validation(ValidationErrors::single("national_id", MEMBER_EXISTS))
                }
                other => other.into(),
            })?;
        info!(member = %updated.id, username = %actor.username, "member updated");
        Ok(updated)
    }

    /// Revokes the member's identity, then deletes the member with its dependents.
    /// A directory failure leaves the member stored.
    pub fn delete_member(&self, actor: &Actor, id: MemberId) -> Result<Member, BrotherhoodError> {
        self.require_admin(actor, "delete member")?;
        let member = self.existing_member(id)?;
        match self.identities.revoke(member.identity) {
            Ok(()) => {}
            Err(IdentityError::NotFound) => {
                debug!(member = %member.id, "identity already gone");
            }
            Err(err) => return Err(err.into()),
        }
        let member = self.repository.delete_member(id)?;
        info!(member = %member.id, username = %actor.username, "member deleted");
        Ok(member)
    }

    /// Public self-registration: creates an identity with the chosen password and an
    /// active member joined today.
    pub fn register(&self, form: &RegistrationForm) -> Result<Member, BrotherhoodError> {
        let mut errors = ValidationErrors::default();
        let draft = form.validate(self.today(), &mut errors);
        if !errors.has_field("national_id") {
            let national_id = form.national_id.trim();
            if self.identities.exists(national_id)? {
                errors.add_non_field(IDENTITY_EXISTS);
            } else if self.repository.member_by_national_id(national_id)?.is_some() {
                errors.add("national_id", MEMBER_EXISTS);
            }
        }
        let draft = errors.finish(draft)?;

        let member = self.provision_member(draft.member, &draft.password)?;
        info!(member = %member.id, "member registered");
        Ok(member)
    }

    pub(super) fn held_roles(&self, member: MemberId) -> Result<Vec<HeldRoleView>, BrotherhoodError> {
        let mut held = Vec::new();
        for assignment in self.repository.assignments_for_member(member)? {
            if let Some(role) = self.repository.fetch_role(assignment.role)? {
                held.push(HeldRoleView::new(&assignment, &role));
            }
        }
        Ok(held)
    }

    /// Identity first, then the member; a failed member insert revokes the identity.
    fn provision_member(
        &self,
        draft: MemberDraft,
        credential: &str,
    ) -> Result<Member, BrotherhoodError> {
        let identity = match self.identities.provision(&draft.national_id, credential) {
            Ok(identity) => identity,
            Err(IdentityError::Conflict(_)) => {
                return Err(ValidationErrors::single("national_id", IDENTITY_EXISTS).into());
            }
            Err(err) => return Err(err.into()),
        };

        let inserted = self.repository.insert_member(NewMember {
            identity,
            name: draft.name,
            surname: draft.surname,
            national_id: draft.national_id,
            birth_date: draft.birth_date,
            join_date: draft.join_date,
            state: draft.state,
            photo: draft.photo,
        });
        match inserted {
            Ok(member) => Ok(member),
            Err(err) => {
                if let Err(revoke_err) = self.identities.revoke(identity) {
                    warn!(%identity, error = %revoke_err, "orphaned identity after failed member insert");
                }
                Err(match err {
                    RepositoryError::Conflict => {
                        ValidationErrors::single("national_id", MEMBER_EXISTS).into()
                    }
                    other => other.into(),
                })
            }
        }
    }
}
