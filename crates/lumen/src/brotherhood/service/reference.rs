use tracing::{debug, info};

use super::{BrotherhoodError, BrotherhoodService};
use crate::brotherhood::domain::{CeremonyType, CeremonyTypeId, ReferenceEntry, Role, RoleId};
use crate::brotherhood::policy::{is_admin, Actor};
use crate::brotherhood::repository::{BrotherhoodRepository, IdentityDirectory, RepositoryError};
use crate::brotherhood::validation::{ReferenceForm, ValidationErrors};
use crate::brotherhood::views::{CeremonyTypeCatalogView, RoleCatalogView, SeedSummary};

/// Roles every brotherhood starts with.
pub const STANDARD_ROLES: [&str; 12] = [
    "Capataz",
    "Costalero",
    "Acolito",
    "Auxiliares",
    "Diputado de formación",
    "Diputado Mayor de gobierno",
    "Secretario",
    "Mayordomo",
    "Fiscal",
    "Promotora sacramental",
    "Teniente Hermano Mayor",
    "Hermano Mayor",
];

pub const STANDARD_CEREMONY_TYPES: [&str; 7] = [
    "Culto Eucarístico",
    "Vigilia",
    "Acto Solemnes",
    "Estación de penitencia",
    "Besamanos",
    "Triduo",
    "Misa",
];

fn name_taken(err: RepositoryError, message: &'static str) -> BrotherhoodError {
    match err {
        RepositoryError::Conflict => ValidationErrors::single("name", message).into(),
        other => other.into(),
    }
}

impl<R, I> BrotherhoodService<R, I>
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    pub fn list_roles(&self, actor: &Actor) -> Result<RoleCatalogView, BrotherhoodError> {
        Ok(RoleCatalogView {
            is_admin: is_admin(actor),
            roles: self.repository.list_roles()?,
        })
    }

    pub fn create_role(&self, actor: &Actor, form: &ReferenceForm) -> Result<Role, BrotherhoodError> {
        self.require_admin(actor, "create role")?;
        let entry = form.clean()?;
        let role = self
            .repository
            .insert_role(entry)
            .map_err(|err| name_taken(err, "a role with this name already exists"))?;
        info!(role = %role.id, name = %role.name, "role created");
        Ok(role)
    }

    /// Deletes a role with every assignment and participation that uses it.
    pub fn delete_role(&self, actor: &Actor, id: RoleId) -> Result<Role, BrotherhoodError> {
        self.require_admin(actor, "delete role")?;
        let role = self.repository.delete_role(id)?;
        info!(role = %role.id, name = %role.name, "role deleted");
        Ok(role)
    }

    pub fn list_ceremony_types(
        &self,
        actor: &Actor,
    ) -> Result<CeremonyTypeCatalogView, BrotherhoodError> {
        Ok(CeremonyTypeCatalogView {
            is_admin: is_admin(actor),
            ceremony_types: self.repository.list_ceremony_types()?,
        })
    }

    pub fn create_ceremony_type(
        &self,
        actor: &Actor,
        form: &ReferenceForm,
    ) -> Result<CeremonyType, BrotherhoodError> {
        self.require_admin(actor, "create ceremony type")?;
        let entry = form.clean()?;
        let ceremony_type = self
            .repository
            .insert_ceremony_type(entry)
            .map_err(|err| name_taken(err, "a ceremony type with this name already exists"))?;
        info!(ceremony_type = %ceremony_type.id, name = %ceremony_type.name, "ceremony type created");
        Ok(ceremony_type)
    }

    /// Deletes a ceremony type with its ceremonies and their participations.
    pub fn delete_ceremony_type(
        &self,
        actor: &Actor,
        id: CeremonyTypeId,
    ) -> Result<CeremonyType, BrotherhoodError> {
        self.require_admin(actor, "delete ceremony type")?;
        let ceremony_type = self.repository.delete_ceremony_type(id)?;
        info!(ceremony_type = %ceremony_type.id, name = %ceremony_type.name, "ceremony type deleted");
        Ok(ceremony_type)
    }

    /// Inserts the standard role and ceremony-type catalogues. Entries already present
    /// by name are skipped; a concurrent insert of the same name also counts as present.
    pub fn seed_reference_data(&self) -> Result<SeedSummary, BrotherhoodError> {
        let mut summary = SeedSummary::default();

        for name in STANDARD_ROLES {
            if self.repository.role_by_name(name)?.is_some() {
                debug!(name, "role already present");
                continue;
            }
            match self.repository.insert_role(ReferenceEntry::named(name)) {
                Ok(_) => summary.roles_created += 1,
                Err(RepositoryError::Conflict) => debug!(name, "role already present"),
                Err(err) => return Err(err.into()),
            }
        }
        for name in STANDARD_CEREMONY_TYPES {
            if self.repository.ceremony_type_by_name(name)?.is_some() {
                debug!(name, "ceremony type already present");
                continue;
            }
            match self.repository.insert_ceremony_type(ReferenceEntry::named(name)) {
                Ok(_) => summary.ceremony_types_created += 1,
                Err(RepositoryError::Conflict) => debug!(name, "ceremony type already present"),
                Err(err) => return Err(err.into()),
            }
        }

        info!(
            roles_created = summary.roles_created,
            ceremony_types_created = summary.ceremony_types_created,
            "reference data seeded"
        );
        Ok(summary)
    }
}
