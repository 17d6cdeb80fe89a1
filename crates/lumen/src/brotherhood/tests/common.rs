use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::brotherhood::domain::{IdentityId, Member, RoleId};
use crate::brotherhood::memory::{InMemoryBrotherhood, InMemoryIdentityDirectory};
use crate::brotherhood::policy::Actor;
use crate::brotherhood::repository::{IdentityDirectory, IdentityError};
use crate::brotherhood::router::AUTHENTICATED_USER_HEADER;
use crate::brotherhood::service::BrotherhoodService;
use crate::brotherhood::validation::{MemberForm, ReferenceForm};

pub(super) type MemoryService = BrotherhoodService<InMemoryBrotherhood, InMemoryIdentityDirectory>;

pub(super) const ADMIN_USERNAME: &str = "secretaria";

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryBrotherhood>,
    Arc<InMemoryIdentityDirectory>,
) {
    let repository = Arc::new(InMemoryBrotherhood::new());
    let identities = Arc::new(InMemoryIdentityDirectory::new());
    let service =
        BrotherhoodService::new(repository.clone(), identities.clone()).with_today(today);
    (service, repository, identities)
}

pub(super) fn admin(service: &MemoryService) -> Actor {
    service
        .bootstrap_admin(ADMIN_USERNAME, "hermandad-2025")
        .expect("admin bootstraps")
}

pub(super) fn member_form(national_id: &str) -> MemberForm {
    MemberForm {
        name: "Manuel".to_string(),
        surname: "Ruiz Ortega".to_string(),
        national_id: national_id.to_string(),
        birth_date: "1980-03-02".to_string(),
        join_date: "1995-04-10".to_string(),
        state: String::new(),
        photo: String::new(),
    }
}

/// Creates a member through the admin path and returns it with the actor it logs in as.
pub(super) fn enrol(service: &MemoryService, admin: &Actor, national_id: &str) -> (Member, Actor) {
    let member = service
        .create_member(admin, &member_form(national_id))
        .expect("member created");
    let actor = service
        .resolve_actor(national_id)
        .expect("directory reachable")
        .expect("identity provisioned");
    (member, actor)
}

pub(super) fn create_role(service: &MemoryService, admin: &Actor, name: &str) -> RoleId {
    service
        .create_role(
            admin,
            &ReferenceForm {
                name: name.to_string(),
                description: String::new(),
            },
        )
        .expect("role created")
        .id
}

/// Directory whose backend is down.
pub(super) struct UnavailableDirectory;

impl IdentityDirectory for UnavailableDirectory {
    fn exists(&self, _username: &str) -> Result<bool, IdentityError> {
        Err(IdentityError::Unavailable("directory offline".to_string()))
    }

    fn provision(&self, _username: &str, _credential: &str) -> Result<IdentityId, IdentityError> {
        Err(IdentityError::Unavailable("directory offline".to_string()))
    }

    fn grant_group(&self, _identity: IdentityId, _group: &str) -> Result<(), IdentityError> {
        Err(IdentityError::Unavailable("directory offline".to_string()))
    }

    fn resolve(&self, _username: &str) -> Result<Option<Actor>, IdentityError> {
        Err(IdentityError::Unavailable("directory offline".to_string()))
    }

    fn verify_credential(&self, _username: &str, _credential: &str) -> Result<bool, IdentityError> {
        Err(IdentityError::Unavailable("directory offline".to_string()))
    }

    fn revoke(&self, _identity: IdentityId) -> Result<(), IdentityError> {
        Err(IdentityError::Unavailable("directory offline".to_string()))
    }
}

pub(super) fn get_as(uri: &str, username: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(username) = username {
        builder = builder.header(AUTHENTICATED_USER_HEADER, username);
    }
    builder.body(Body::empty()).expect("request builds")
}

pub(super) fn post_form_as(uri: &str, username: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        axum::http::header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(username) = username {
        builder = builder.header(AUTHENTICATED_USER_HEADER, username);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
