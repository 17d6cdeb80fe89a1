use tracing::{info, warn};

use super::{BrotherhoodError, BrotherhoodService};
use crate::brotherhood::domain::{Dues, DuesId, MemberId, NewDues};
use crate::brotherhood::policy::{is_admin, Actor};
use crate::brotherhood::report::DuesTotals;
use crate::brotherhood::repository::{BrotherhoodRepository, IdentityDirectory};
use crate::brotherhood::validation::{BulkDuesForm, DuesForm, ValidationErrors};
use crate::brotherhood::views::{BulkDuesOutcome, DuesListView};

impl<R, I> BrotherhoodService<R, I>
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    /// Dues of one member with paid and pending totals. Non-administrators only see
    /// their own record; any other member id is not found.
    pub fn list_dues(&self, actor: &Actor, member: MemberId) -> Result<DuesListView, BrotherhoodError> {
        let member = self.scoped_member(actor, member)?;
        let dues = self.repository.dues_for_member(member.id)?;
        Ok(DuesListView {
            is_admin: is_admin(actor),
            totals: DuesTotals::from_dues(&dues),
            member,
            dues,
        })
    }

    /// Records dues for a member. Administrators may charge anyone; a member may only
    /// record dues against their own record.
    pub fn create_dues(
        &self,
        actor: &Actor,
        member: MemberId,
        form: &DuesForm,
    ) -> Result<Dues, BrotherhoodError> {
        let member = self.existing_member(member)?;
        if !is_admin(actor) && member.identity != actor.identity {
            warn!(username = %actor.username, member = %member.id, "dues for a foreign member refused");
            return Err(BrotherhoodError::Forbidden);
        }
        let draft = form.clean()?;

        let dues = self.repository.insert_dues(NewDues {
            member: member.id,
            amount: draft.amount,
            created_on: self.today(),
            payment_state: draft.payment_state,
            period: draft.period,
        })?;
        info!(dues = %dues.id, member = %member.id, amount = %dues.amount, "dues recorded");
        Ok(dues)
    }

    /// One dues row per selected member. Every selected member must exist before any
    /// row is written.
    pub fn create_bulk_dues(
        &self,
        actor: &Actor,
        form: &BulkDuesForm,
    ) -> Result<BulkDuesOutcome, BrotherhoodError> {
        self.require_admin(actor, "record bulk dues")?;
        let draft = form.clean()?;

        let mut errors = ValidationErrors::default();
        for member in &draft.members {
            if self.repository.fetch_member(*member)?.is_none() {
                errors.add("members", format!("member {member} does not exist"));
            }
        }
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let created_on = self.today();
        let mut dues = Vec::with_capacity(draft.members.len());
        for member in draft.members {
            dues.push(self.repository.insert_dues(NewDues {
                member,
                amount: draft.dues.amount,
                created_on,
                payment_state: draft.dues.payment_state,
                period: draft.dues.period,
            })?);
        }
        info!(created = dues.len(), amount = %draft.dues.amount, "bulk dues recorded");
        Ok(BulkDuesOutcome {
            created: dues.len(),
            dues,
        })
    }

    /// Changes amount, period and payment state; owner and creation date are kept.
    pub fn update_dues(
        &self,
        actor: &Actor,
        id: DuesId,
        form: &DuesForm,
    ) -> Result<Dues, BrotherhoodError> {
        self.require_admin(actor, "update dues")?;
        let existing = self
            .repository
            .fetch_dues(id)?
            .ok_or(BrotherhoodError::NotFound)?;
        let draft = form.clean()?;

        let updated = Dues {
            amount: draft.amount,
            period: draft.period,
            payment_state: draft.payment_state,
            ..existing
        };
        self.repository.update_dues(&updated)?;
        info!(dues = %updated.id, "dues updated");
        Ok(updated)
    }

    pub fn delete_dues(&self, actor: &Actor, id: DuesId) -> Result<Dues, BrotherhoodError> {
        self.require_admin(actor, "delete dues")?;
        let dues = self.repository.delete_dues(id)?;
        info!(dues = %dues.id, member = %dues.member, "dues deleted");
        Ok(dues)
    }
}
