use tracing::{debug, info};

use super::{BrotherhoodError, BrotherhoodService};
use crate::brotherhood::domain::{
    Ceremony, CeremonyId, CeremonyTypeId, MemberState, NewCeremony, NewParticipation,
};
use crate::brotherhood::policy::{is_admin, Actor};
use crate::brotherhood::repository::{BrotherhoodRepository, IdentityDirectory, RepositoryError};
use crate::brotherhood::validation::{
    optional_filter, CeremonyForm, ParticipantForm, ValidationErrors, INVALID_CHOICE,
};
use crate::brotherhood::views::{
    AssignmentOutcome, CeremonyDetailView, CeremonyListView, CeremonySummary, ParticipantContext,
    ParticipantView, ParticipationResult,
};

impl<R, I> BrotherhoodService<R, I>
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    /// Every ceremony, optionally narrowed to one type. Readable by any member.
    pub fn list_ceremonies(
        &self,
        actor: &Actor,
        type_filter: Option<&str>,
    ) -> Result<CeremonyListView, BrotherhoodError> {
        let selected_type = optional_filter("type", type_filter)?.map(CeremonyTypeId);
        let ceremony_types = self.repository.list_ceremony_types()?;

        let ceremonies = self
            .repository
            .list_ceremonies()?
            .into_iter()
            .filter(|ceremony| selected_type.map_or(true, |wanted| ceremony.ceremony_type == wanted))
            .map(|ceremony| {
                let type_name = ceremony_types
                    .iter()
                    .find(|candidate| candidate.id == ceremony.ceremony_type)
                    .map(|candidate| candidate.name.clone())
                    .unwrap_or_default();
                CeremonySummary {
                    ceremony,
                    type_name,
                }
            })
            .collect();

        Ok(CeremonyListView {
            is_admin: is_admin(actor),
            ceremonies,
            ceremony_types,
            selected_type,
        })
    }

    pub fn ceremony_detail(
        &self,
        actor: &Actor,
        id: CeremonyId,
    ) -> Result<CeremonyDetailView, BrotherhoodError> {
        let ceremony = self.ceremony_summary(id)?;

        let mut participants = Vec::new();
        for participation in self.repository.participations_for_ceremony(id)? {
            let member = self.repository.fetch_member(participation.member)?;
            let role = self.repository.fetch_role(participation.role)?;
            if let (Some(member), Some(role)) = (member, role) {
                participants.push(ParticipantView::new(&participation, &member, &role));
            }
        }

        Ok(CeremonyDetailView {
            is_admin: is_admin(actor),
            ceremony,
            participants,
        })
    }

    pub fn create_ceremony(
        &self,
        actor: &Actor,
        form: &CeremonyForm,
    ) -> Result<Ceremony, BrotherhoodError> {
        self.require_admin(actor, "create ceremony")?;
        let draft = form.clean()?;
        if self.repository.fetch_ceremony_type(draft.ceremony_type)?.is_none() {
            return Err(ValidationErrors::single("ceremony_type", INVALID_CHOICE).into());
        }

        let ceremony = self.repository.insert_ceremony(NewCeremony {
            ceremony_type: draft.ceremony_type,
            start_date: draft.start_date,
            end_date: draft.end_date,
            description: draft.description,
        })?;
        info!(ceremony = %ceremony.id, ceremony_type = %ceremony.ceremony_type, "ceremony created");
        Ok(ceremony)
    }

    /// Deletes a ceremony together with its participations.
    pub fn delete_ceremony(
        &self,
        actor: &Actor,
        id: CeremonyId,
    ) -> Result<Ceremony, BrotherhoodError> {
        self.require_admin(actor, "delete ceremony")?;
        let ceremony = self.repository.delete_ceremony(id)?;
        info!(ceremony = %ceremony.id, "ceremony deleted");
        Ok(ceremony)
    }

    /// Candidates for the participant form: active members and every role.
    pub fn participant_form(
        &self,
        actor: &Actor,
        id: CeremonyId,
    ) -> Result<ParticipantContext, BrotherhoodError> {
        self.require_admin(actor, "assign participant")?;
        let ceremony = self.ceremony_summary(id)?;
        let members = self
            .repository
            .list_members()?
            .into_iter()
            .filter(|member| member.state == MemberState::Active)
            .collect();
        Ok(ParticipantContext {
            ceremony,
            members,
            roles: self.repository.list_roles()?,
        })
    }

    /// Adds a member to a ceremony under a role. Repeating an existing
    /// member/ceremony/role triple is a no-op reporting the stored participation.
    pub fn assign_participant(
        &self,
        actor: &Actor,
        id: CeremonyId,
        form: &ParticipantForm,
    ) -> Result<ParticipationResult, BrotherhoodError> {
        self.require_admin(actor, "assign participant")?;
        let ceremony = self
            .repository
            .fetch_ceremony(id)?
            .ok_or(BrotherhoodError::NotFound)?;
        let draft = form.clean()?;

        let mut errors = ValidationErrors::default();
        if self.repository.fetch_member(draft.member)?.is_none() {
            errors.add("member", INVALID_CHOICE);
        }
        if self.repository.fetch_role(draft.role)?.is_none() {
            errors.add("role", INVALID_CHOICE);
        }
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let inserted = self.repository.insert_participation(NewParticipation {
            member: draft.member,
            ceremony: ceremony.id,
            role: draft.role,
            segment: draft.segment,
        });
        match inserted {
            Ok(participation) => {
                info!(
                    ceremony = %ceremony.id,
                    member = %draft.member,
                    role = %draft.role,
                    "participant added"
                );
                Ok(ParticipationResult {
                    outcome: AssignmentOutcome::Created,
                    participation,
                })
            }
            Err(RepositoryError::Conflict) => {
                debug!(ceremony = %ceremony.id, member = %draft.member, "participant already assigned");
                let participation = self
                    .repository
                    .participations_for_ceremony(ceremony.id)?
                    .into_iter()
                    .find(|existing| existing.member == draft.member && existing.role == draft.role)
                    .ok_or(BrotherhoodError::NotFound)?;
                Ok(ParticipationResult {
                    outcome: AssignmentOutcome::AlreadyAssigned,
                    participation,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn ceremony_summary(&self, id: CeremonyId) -> Result<CeremonySummary, BrotherhoodError> {
        let ceremony = self
            .repository
            .fetch_ceremony(id)?
            .ok_or(BrotherhoodError::NotFound)?;
        let type_name = self
            .repository
            .fetch_ceremony_type(ceremony.ceremony_type)?
            .map(|ceremony_type| ceremony_type.name)
            .unwrap_or_default();
        Ok(CeremonySummary {
            ceremony,
            type_name,
        })
    }
}
