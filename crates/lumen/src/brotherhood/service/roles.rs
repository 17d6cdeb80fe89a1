use tracing::{debug, info};

use super::{BrotherhoodError, BrotherhoodService};
use crate::brotherhood::domain::{MemberId, NewRoleAssignment};
use crate::brotherhood::policy::Actor;
use crate::brotherhood::repository::{BrotherhoodRepository, IdentityDirectory, RepositoryError};
use crate::brotherhood::validation::{
    RoleAssignmentForm, RoleRemovalForm, ValidationErrors, INVALID_CHOICE,
};
use crate::brotherhood::views::{AssignmentOutcome, RoleAssignmentContext, RoleAssignmentResult};

impl<R, I> BrotherhoodService<R, I>
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    pub fn role_assignment_form(
        &self,
        actor: &Actor,
        member: MemberId,
    ) -> Result<RoleAssignmentContext, BrotherhoodError> {
        self.require_admin(actor, "assign role")?;
        let member = self.existing_member(member)?;
        let held = self.held_roles(member.id)?;
        Ok(RoleAssignmentContext {
            member,
            roles: self.repository.list_roles()?,
            held,
        })
    }

    /// Gives a member a role. Assigning a role the member already holds is a no-op
    /// that reports the existing assignment.
    pub fn assign_role(
        &self,
        actor: &Actor,
        member: MemberId,
        form: &RoleAssignmentForm,
    ) -> Result<RoleAssignmentResult, BrotherhoodError> {
        self.require_admin(actor, "assign role")?;
        let member = self.existing_member(member)?;
        let draft = form.clean()?;
        if self.repository.fetch_role(draft.role)?.is_none() {
            return Err(ValidationErrors::single("role", INVALID_CHOICE).into());
        }

        let inserted = self.repository.insert_assignment(NewRoleAssignment {
            member: member.id,
            role: draft.role,
            start_date: draft.start_date,
            end_date: draft.end_date,
        });
        match inserted {
            Ok(assignment) => {
                info!(member = %member.id, role = %draft.role, "role assigned");
                Ok(RoleAssignmentResult {
                    outcome: AssignmentOutcome::Created,
                    assignment,
                })
            }
            Err(RepositoryError::Conflict) => {
                debug!(member = %member.id, role = %draft.role, "role already assigned");
                let assignment = self
                    .repository
                    .find_assignment(member.id, draft.role)?
                    .ok_or(BrotherhoodError::NotFound)?;
                Ok(RoleAssignmentResult {
                    outcome: AssignmentOutcome::AlreadyAssigned,
                    assignment,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Removes every assignment of the role from the member; removing a role the
    /// member does not hold succeeds with a count of zero.
    pub fn unassign_role(
        &self,
        actor: &Actor,
        member: MemberId,
        form: &RoleRemovalForm,
    ) -> Result<usize, BrotherhoodError> {
        self.require_admin(actor, "remove role")?;
        let member = self.existing_member(member)?;
        let role = form.clean()?;
        let removed = self.repository.delete_assignments(member.id, role)?;
        if removed == 0 {
            debug!(member = %member.id, %role, "role was not held");
        } else {
            info!(member = %member.id, %role, removed, "role removed");
        }
        Ok(removed)
    }
}
