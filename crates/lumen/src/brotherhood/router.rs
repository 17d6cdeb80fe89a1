use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{request::Parts, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use super::domain::{CeremonyId, CeremonyTypeId, DuesId, MemberId, RoleId};
use super::policy::Actor;
use super::repository::{BrotherhoodRepository, IdentityDirectory};
use super::service::{BrotherhoodError, BrotherhoodService};
use super::validation::{
    BulkDuesForm, CeremonyForm, DuesForm, MemberForm, ParticipantForm, ReferenceForm,
    RegistrationForm, RoleAssignmentForm, RoleRemovalForm, ValidationErrors,
};

/// Header carrying the username established by the upstream authenticator.
pub const AUTHENTICATED_USER_HEADER: &str = "x-authenticated-user";

type SharedService<R, I> = Arc<BrotherhoodService<R, I>>;

/// Router exposing every brotherhood page. All routes except `/register` require a
/// resolvable caller.
pub fn brotherhood_router<R, I>(service: SharedService<R, I>) -> Router
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let authenticated = Router::new()
        .route("/", get(home_handler::<R, I>))
        .route(
            "/members",
            get(list_members_handler::<R, I>).post(create_member_handler::<R, I>),
        )
        .route("/members/:member_id", get(member_detail_handler::<R, I>))
        .route("/members/:member_id/edit", post(update_member_handler::<R, I>))
        .route("/members/:member_id/delete", post(delete_member_handler::<R, I>))
        .route(
            "/members/:member_id/roles",
            get(role_form_handler::<R, I>).post(assign_role_handler::<R, I>),
        )
        .route(
            "/members/:member_id/roles/remove",
            post(unassign_role_handler::<R, I>),
        )
        .route(
            "/members/:member_id/dues",
            get(list_dues_handler::<R, I>).post(create_dues_handler::<R, I>),
        )
        .route("/dues/bulk", post(bulk_dues_handler::<R, I>))
        .route("/dues/:dues_id/edit", post(update_dues_handler::<R, I>))
        .route("/dues/:dues_id/delete", post(delete_dues_handler::<R, I>))
        .route(
            "/ceremonies",
            get(list_ceremonies_handler::<R, I>).post(create_ceremony_handler::<R, I>),
        )
        .route("/ceremonies/:ceremony_id", get(ceremony_detail_handler::<R, I>))
        .route(
            "/ceremonies/:ceremony_id/delete",
            post(delete_ceremony_handler::<R, I>),
        )
        .route(
            "/ceremonies/:ceremony_id/participants",
            get(participant_form_handler::<R, I>).post(assign_participant_handler::<R, I>),
        )
        .route("/statistics", get(statistics_handler::<R, I>))
        .route(
            "/roles",
            get(list_roles_handler::<R, I>).post(create_role_handler::<R, I>),
        )
        .route("/roles/:role_id/delete", post(delete_role_handler::<R, I>))
        .route(
            "/ceremony-types",
            get(list_ceremony_types_handler::<R, I>).post(create_ceremony_type_handler::<R, I>),
        )
        .route(
            "/ceremony-types/:ceremony_type_id/delete",
            post(delete_ceremony_type_handler::<R, I>),
        )
        .route_layer(middleware::from_fn_with_state(
            service.clone(),
            resolve_actor::<R, I>,
        ));

    Router::new()
        .route("/register", post(register_handler::<R, I>))
        .merge(authenticated)
        .with_state(service)
}

/// Resolves the forwarded username into an [`Actor`] stored in the request extensions.
/// Unknown or missing usernames pass through; [`CurrentActor`] then rejects the request.
async fn resolve_actor<R, I>(
    State(service): State<SharedService<R, I>>,
    mut request: Request,
    next: Next,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let username = request
        .headers()
        .get(AUTHENTICATED_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    if let Some(username) = username {
        match service.resolve_actor(&username) {
            Ok(Some(actor)) => {
                request.extensions_mut().insert(actor);
            }
            Ok(None) => debug!(%username, "forwarded username has no identity"),
            Err(err) => return failure_response(err, None),
        }
    }

    next.run(request).await
}

/// Extractor for the caller resolved by the authentication middleware.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(CurrentActor)
            .ok_or_else(|| {
                let payload = json!({ "error": "authentication required" });
                (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
            })
    }
}

/// Urlencoded body extractor whose rejection uses the same `{errors, input}` payload as
/// service validation failures.
#[derive(Debug, Clone)]
pub struct PageForm<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for PageForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<T>::from_request(request, state).await {
            Ok(Form(value)) => Ok(PageForm(value)),
            Err(rejection) => {
                let message = rejection.body_text();
                debug!(%message, "form body rejected");
                let mut errors = ValidationErrors::default();
                errors.add_non_field(message);
                Err(failure_response(BrotherhoodError::Validation(errors), None))
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MemberListQuery {
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CeremonyListQuery {
    #[serde(default, rename = "type")]
    ceremony_type: Option<String>,
}

fn view_response<T: Serialize>(result: Result<T, BrotherhoodError>) -> Response {
    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => failure_response(err, None),
    }
}

fn redirect_response<T>(
    result: Result<T, BrotherhoodError>,
    input: Option<Value>,
    location: impl FnOnce(&T) -> String,
) -> Response {
    match result {
        Ok(value) => Redirect::to(&location(&value)).into_response(),
        Err(err) => failure_response(err, input),
    }
}

/// Maps service failures onto HTTP outcomes; validation errors echo the submitted input.
fn failure_response(error: BrotherhoodError, input: Option<Value>) -> Response {
    match error {
        BrotherhoodError::Validation(errors) => {
            let payload = json!({
                "errors": errors,
                "input": input.unwrap_or(Value::Null),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        BrotherhoodError::Forbidden => Redirect::to("/").into_response(),
        BrotherhoodError::NotFound => {
            let payload = json!({ "error": "not found" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        other => {
            error!(error = %other, "brotherhood request failed");
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

fn echo<T: Serialize>(form: &T) -> Option<Value> {
    serde_json::to_value(form).ok()
}

pub(crate) async fn home_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    view_response(service.home(&actor))
}

pub(crate) async fn list_members_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<MemberListQuery>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    view_response(service.list_members(&actor, query.role.as_deref()))
}

pub(crate) async fn create_member_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    PageForm(form): PageForm<MemberForm>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    redirect_response(service.create_member(&actor, &form), echo(&form), |member| {
        format!("/members/{}", member.id)
    })
}

pub(crate) async fn member_detail_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(member_id): Path<u64>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    view_response(service.member_detail(&actor, MemberId(member_id)))
}

pub(crate) async fn update_member_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(member_id): Path<u64>,
    PageForm(form): PageForm<MemberForm>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.update_member(&actor, MemberId(member_id), &form);
    redirect_response(result, echo(&form), |member| format!("/members/{}", member.id))
}

pub(crate) async fn delete_member_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(member_id): Path<u64>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.delete_member(&actor, MemberId(member_id));
    redirect_response(result, None, |_| "/members".to_string())
}

pub(crate) async fn role_form_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(member_id): Path<u64>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    view_response(service.role_assignment_form(&actor, MemberId(member_id)))
}

pub(crate) async fn assign_role_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(member_id): Path<u64>,
    PageForm(form): PageForm<RoleAssignmentForm>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.assign_role(&actor, MemberId(member_id), &form);
    redirect_response(result, echo(&form), |outcome| {
        format!("/members/{}", outcome.assignment.member)
    })
}

pub(crate) async fn unassign_role_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(member_id): Path<u64>,
    PageForm(form): PageForm<RoleRemovalForm>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.unassign_role(&actor, MemberId(member_id), &form);
    redirect_response(result, echo(&form), |_| format!("/members/{member_id}"))
}

pub(crate) async fn list_dues_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(member_id): Path<u64>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    view_response(service.list_dues(&actor, MemberId(member_id)))
}

pub(crate) async fn create_dues_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(member_id): Path<u64>,
    PageForm(form): PageForm<DuesForm>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.create_dues(&actor, MemberId(member_id), &form);
    redirect_response(result, echo(&form), |dues| format!("/members/{}/dues", dues.member))
}

pub(crate) async fn bulk_dues_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    PageForm(pairs): PageForm<Vec<(String, String)>>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let form = BulkDuesForm::from_pairs(pairs);
    let result = service.create_bulk_dues(&actor, &form);
    redirect_response(result, echo(&form), |outcome| {
        format!("/members?dues_created={}", outcome.created)
    })
}

pub(crate) async fn update_dues_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(dues_id): Path<u64>,
    PageForm(form): PageForm<DuesForm>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.update_dues(&actor, DuesId(dues_id), &form);
    redirect_response(result, echo(&form), |dues| format!("/members/{}/dues", dues.member))
}

pub(crate) async fn delete_dues_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(dues_id): Path<u64>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.delete_dues(&actor, DuesId(dues_id));
    redirect_response(result, None, |dues| format!("/members/{}/dues", dues.member))
}

pub(crate) async fn list_ceremonies_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<CeremonyListQuery>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    view_response(service.list_ceremonies(&actor, query.ceremony_type.as_deref()))
}

pub(crate) async fn create_ceremony_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    PageForm(form): PageForm<CeremonyForm>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.create_ceremony(&actor, &form);
    redirect_response(result, echo(&form), |ceremony| {
        format!("/ceremonies/{}", ceremony.id)
    })
}

pub(crate) async fn ceremony_detail_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(ceremony_id): Path<u64>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    view_response(service.ceremony_detail(&actor, CeremonyId(ceremony_id)))
}

pub(crate) async fn delete_ceremony_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(ceremony_id): Path<u64>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.delete_ceremony(&actor, CeremonyId(ceremony_id));
    redirect_response(result, None, |_| "/ceremonies".to_string())
}

pub(crate) async fn participant_form_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(ceremony_id): Path<u64>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    view_response(service.participant_form(&actor, CeremonyId(ceremony_id)))
}

pub(crate) async fn assign_participant_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(ceremony_id): Path<u64>,
    PageForm(form): PageForm<ParticipantForm>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.assign_participant(&actor, CeremonyId(ceremony_id), &form);
    redirect_response(result, echo(&form), |outcome| {
        format!("/ceremonies/{}", outcome.participation.ceremony)
    })
}

pub(crate) async fn statistics_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    view_response(service.statistics(&actor))
}

pub(crate) async fn register_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    PageForm(form): PageForm<RegistrationForm>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    redirect_response(service.register(&form), echo(&form), |_| "/".to_string())
}

pub(crate) async fn list_roles_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    view_response(service.list_roles(&actor))
}

pub(crate) async fn create_role_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    PageForm(form): PageForm<ReferenceForm>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    redirect_response(service.create_role(&actor, &form), echo(&form), |_| {
        "/roles".to_string()
    })
}

pub(crate) async fn delete_role_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(role_id): Path<u64>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.delete_role(&actor, RoleId(role_id));
    redirect_response(result, None, |_| "/roles".to_string())
}

pub(crate) async fn list_ceremony_types_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    view_response(service.list_ceremony_types(&actor))
}

pub(crate) async fn create_ceremony_type_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    PageForm(form): PageForm<ReferenceForm>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.create_ceremony_type(&actor, &form);
    redirect_response(result, echo(&form), |_| "/ceremony-types".to_string())
}

pub(crate) async fn delete_ceremony_type_handler<R, I>(
    State(service): State<SharedService<R, I>>,
    CurrentActor(actor): CurrentActor,
    Path(ceremony_type_id): Path<u64>,
) -> Response
where
    R: BrotherhoodRepository + 'static,
    I: IdentityDirectory + 'static,
{
    let result = service.delete_ceremony_type(&actor, CeremonyTypeId(ceremony_type_id));
    redirect_response(result, None, |_| "/ceremony-types".to_string())
}
