//! Application operations composing access policy, form cleaning and persistence.

mod ceremonies;
mod dues;
mod members;
mod reference;
mod roles;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use super::domain::{Member, MemberId};
use super::policy::{is_admin, Actor, MemberScope, ADMIN_GROUP};
use super::report::StatisticsView;
use super::repository::{BrotherhoodRepository, IdentityDirectory, IdentityError, RepositoryError};
use super::validation::ValidationErrors;
use super::views::HomeView;

pub use reference::{STANDARD_CEREMONY_TYPES, STANDARD_ROLES};

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Service exposing every brotherhood workflow over a repository and an identity directory.
pub struct BrotherhoodService<R, I> {
    repository: Arc<R>,
    identities: Arc<I>,
    today: Clock,
}

impl<R, I> BrotherhoodService<R, I>
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    pub fn new(repository: Arc<R>, identities: Arc<I>) -> Self {
        Self {
            repository,
            identities,
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replaces the clock used for age checks, join dates and dues creation dates.
    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    /// Map an authenticated username to the actor performing the request.
    pub fn resolve_actor(&self, username: &str) -> Result<Option<Actor>, BrotherhoodError> {
        Ok(self.identities.resolve(username)?)
    }

    /// Ensure an administrator identity exists, creating it on first start. An existing
    /// identity keeps its stored credential.
    pub fn bootstrap_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Actor, BrotherhoodError> {
        let identity = match self.identities.resolve(username)? {
            Some(actor) => {
                if !self.identities.verify_credential(username, password)? {
                    warn!(%username, "configured administrator password differs from the stored credential");
                }
                actor.identity
            }
            None => self.identities.provision(username, password)?,
        };
        self.identities.grant_group(identity, ADMIN_GROUP)?;
        info!(%username, "administrator identity ready");
        self.identities
            .resolve(username)?
            .ok_or(BrotherhoodError::Identity(IdentityError::NotFound))
    }

    /// Landing page: whether the caller is an administrator, and their own record otherwise.
    pub fn home(&self, actor: &Actor) -> Result<HomeView, BrotherhoodError> {
        if is_admin(actor) {
            return Ok(HomeView {
                is_admin: true,
                member: None,
            });
        }

        let member = self
            .repository
            .member_by_identity(actor.identity)?
            .ok_or(BrotherhoodError::NotFound)?;
        Ok(HomeView {
            is_admin: false,
            member: Some(member),
        })
    }

    pub fn statistics(&self, actor: &Actor) -> Result<StatisticsView, BrotherhoodError> {
        self.require_admin(actor, "view statistics")?;
        let members = self.repository.list_members()?;
        let dues = self.repository.list_dues()?;
        let ceremonies = self.repository.list_ceremonies()?;
        Ok(StatisticsView::compute(&members, &dues, &ceremonies))
    }

    fn require_admin(&self, actor: &Actor, operation: &'static str) -> Result<(), BrotherhoodError> {
        if is_admin(actor) {
            Ok(())
        } else {
            warn!(username = %actor.username, operation, "administrator rights required");
            Err(BrotherhoodError::Forbidden)
        }
    }

    /// Member lookup restricted to what the actor may see; foreign records are not found.
    fn scoped_member(&self, actor: &Actor, id: MemberId) -> Result<Member, BrotherhoodError> {
        let scope = MemberScope::for_actor(actor);
        self.repository
            .fetch_member(id)?
            .filter(|member| scope.admits(member))
            .ok_or(BrotherhoodError::NotFound)
    }

    fn existing_member(&self, id: MemberId) -> Result<Member, BrotherhoodError> {
        self.repository
            .fetch_member(id)?
            .ok_or(BrotherhoodError::NotFound)
    }
}

/// Error raised by the brotherhood service.
#[derive(Debug, thiserror::Error)]
pub enum BrotherhoodError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("administrator rights required")]
    Forbidden,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl From<RepositoryError> for BrotherhoodError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}
