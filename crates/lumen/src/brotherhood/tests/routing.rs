use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::brotherhood::memory::{InMemoryBrotherhood, InMemoryIdentityDirectory};
use crate::brotherhood::repository::{BrotherhoodRepository, IdentityDirectory};
use crate::brotherhood::router::{brotherhood_router, statistics_handler, CurrentActor};
use crate::brotherhood::service::BrotherhoodService;

const MEMBER_BODY: &str =
    "name=Manuel&surname=Ruiz&national_id=12345678A&birth_date=1980-03-02&join_date=1995-04-10";

#[tokio::test]
async fn requests_without_a_known_user_are_unauthorized() {
    let (service, _, _) = build_service();
    let router = brotherhood_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(get_as("/members", None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(get_as("/members", Some("nobody")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], json!("authentication required"));
}

#[tokio::test]
async fn admin_creates_member_and_is_redirected_to_detail() {
    let (service, repository, _) = build_service();
    admin(&service);
    let router = brotherhood_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(post_form_as("/members", Some(ADMIN_USERNAME), MEMBER_BODY))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let member = repository
        .member_by_national_id("12345678A")
        .expect("lookup")
        .expect("member stored");
    let expected = format!("/members/{}", member.id);
    assert_eq!(location(&response), Some(expected.as_str()));

    let response = router
        .oneshot(get_as(&expected, Some(ADMIN_USERNAME)))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["member"]["national_id"], json!("12345678A"));
    assert_eq!(payload["age"], json!(45));
}

#[tokio::test]
async fn invalid_forms_return_field_errors_with_the_input() {
    let (service, _, _) = build_service();
    admin(&service);
    let router = brotherhood_router(Arc::new(service));

    let body = "name=Manuel&surname=Ruiz&national_id=12345678A&birth_date=2000-01-01&join_date=1999-01-01";
    let response = router
        .oneshot(post_form_as("/members", Some(ADMIN_USERNAME), body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["errors"]["fields"]["join_date"],
        json!(["join date cannot precede birth date"])
    );
    assert_eq!(payload["input"]["national_id"], json!("12345678A"));
}

#[tokio::test]
async fn forbidden_mutations_redirect_home() {
    let (service, _, _) = build_service();
    let admin = admin(&service);
    enrol(&service, &admin, "12345678A");
    let router = brotherhood_router(Arc::new(service));

    let response = router
        .oneshot(post_form_as("/roles", Some("12345678A"), "name=Pertiguero"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));
}

#[tokio::test]
async fn foreign_member_records_are_not_found() {
    let (service, _, _) = build_service();
    let admin = admin(&service);
    enrol(&service, &admin, "12345678A");
    let (other, _) = enrol(&service, &admin, "11111111C");
    let router = brotherhood_router(Arc::new(service));

    for uri in [
        format!("/members/{}", other.id),
        format!("/members/{}/dues", other.id),
    ] {
        let response = router
            .clone()
            .oneshot(get_as(&uri, Some("12345678A")))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn registration_is_public_and_never_echoes_passwords() {
    let (service, _, identities) = build_service();
    let router = brotherhood_router(Arc::new(service));
    let base = "name=Lucia&surname=Martin&national_id=87654321B&birth_date=1990-05-05";

    let response = router
        .clone()
        .oneshot(post_form_as(
            "/register",
            None,
            &format!("{base}&password=cirio-2025&password2=cirio-2024"),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["errors"]["non_field"], json!(["passwords do not match"]));
    assert!(payload["input"].get("password").is_none());
    assert!(payload["input"].get("password2").is_none());
    assert!(!identities
        .exists("87654321B")
        .expect("directory reachable"));

    let response = router
        .clone()
        .oneshot(post_form_as(
            "/register",
            None,
            &format!("{base}&password=cirio-2025&password2=cirio-2025"),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));

    let response = router
        .oneshot(get_as("/", Some("87654321B")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["is_admin"], json!(false));
    assert_eq!(payload["member"]["state"], json!("active"));
}

#[tokio::test]
async fn bulk_dues_route_accepts_comma_separated_members() {
    let (service, repository, _) = build_service();
    let admin = admin(&service);
    let (first, _) = enrol(&service, &admin, "12345678A");
    let (second, _) = enrol(&service, &admin, "11111111C");
    let router = brotherhood_router(Arc::new(service));

    let body = format!(
        "members={}%2C{}&amount=25.00&period=first-half&payment_state=pending",
        first.id, second.id
    );
    let response = router
        .clone()
        .oneshot(post_form_as("/dues/bulk", Some(ADMIN_USERNAME), &body))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/members?dues_created=2"));
    assert_eq!(repository.list_dues().expect("list").len(), 2);

    let response = router
        .oneshot(get_as(
            &format!("/members/{}/dues", first.id),
            Some(ADMIN_USERNAME),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total_pending"], json!("25.00"));
    assert_eq!(payload["total_paid"], json!("0"));
}

#[tokio::test]
async fn bulk_dues_route_accepts_repeated_member_keys() {
    let (service, repository, _) = build_service();
    let admin = admin(&service);
    let (first, _) = enrol(&service, &admin, "12345678A");
    let (second, _) = enrol(&service, &admin, "11111111C");
    let router = brotherhood_router(Arc::new(service));

    let body = format!(
        "members={}&members={}&amount=25.00&period=first-half&payment_state=pending",
        first.id, second.id
    );
    let response = router
        .clone()
        .oneshot(post_form_as("/dues/bulk", Some(ADMIN_USERNAME), &body))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/members?dues_created=2"));
    let owners: Vec<_> = repository
        .list_dues()
        .expect("list")
        .iter()
        .map(|dues| dues.member)
        .collect();
    assert_eq!(owners, vec![first.id, second.id]);

    let response = router
        .oneshot(post_form_as(
            "/dues/bulk",
            Some(ADMIN_USERNAME),
            "members=1&members=oops&amount=25.00",
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["errors"]["fields"]["members"],
        json!(["'oops' is not a valid member"])
    );
    assert_eq!(payload["input"]["members"], json!(["1", "oops"]));
}

#[tokio::test]
async fn undecodable_form_bodies_use_the_field_error_payload() {
    let (service, repository, _) = build_service();
    let admin = admin(&service);
    let (member, _) = enrol(&service, &admin, "12345678A");
    let router = brotherhood_router(Arc::new(service));

    let response = router
        .oneshot(post_form_as(
            &format!("/members/{}/dues", member.id),
            Some(ADMIN_USERNAME),
            "amount=10.00&amount=20.00",
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    let messages = payload["errors"]["non_field"]
        .as_array()
        .expect("non-field errors");
    assert_eq!(messages.len(), 1);
    assert!(payload["errors"]["fields"]
        .as_object()
        .is_some_and(|fields| fields.is_empty()));
    assert_eq!(payload["input"], json!(null));
    assert!(repository.list_dues().expect("list").is_empty());
}

#[tokio::test]
async fn invalid_list_filters_are_rejected() {
    let (service, _, _) = build_service();
    admin(&service);
    let router = brotherhood_router(Arc::new(service));

    let response = router
        .oneshot(get_as("/ceremonies?type=misa", Some(ADMIN_USERNAME)))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["errors"]["fields"]["type"], json!(["select a valid choice"]));
}

#[tokio::test]
async fn directory_outage_is_an_internal_error() {
    let service = BrotherhoodService::new(
        Arc::new(InMemoryBrotherhood::new()),
        Arc::new(UnavailableDirectory),
    );
    let router = brotherhood_router(Arc::new(service));

    let response = router
        .oneshot(get_as("/", Some(ADMIN_USERNAME)))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn statistics_handler_renders_for_admins() {
    let (service, _, _) = build_service();
    let admin = admin(&service);
    enrol(&service, &admin, "12345678A");

    let response = statistics_handler::<InMemoryBrotherhood, InMemoryIdentityDirectory>(
        State(Arc::new(service)),
        CurrentActor(admin),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total_members"], json!(1));
    assert_eq!(payload["members_by_state"][0]["state_label"], json!("Activo"));
}
