//! End-to-end scenarios for the membership service driven through the public HTTP router.

mod common {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use lumen::brotherhood::{
        brotherhood_router, BrotherhoodService, InMemoryBrotherhood, InMemoryIdentityDirectory,
        AUTHENTICATED_USER_HEADER,
    };

    pub(super) const ADMIN: &str = "secretaria";

    pub(super) fn seeded_router() -> Router {
        let service = BrotherhoodService::new(
            Arc::new(InMemoryBrotherhood::new()),
            Arc::new(InMemoryIdentityDirectory::new()),
        );
        service.seed_reference_data().expect("seed reference data");
        service
            .bootstrap_admin(ADMIN, "hermandad-2025")
            .expect("admin bootstraps");
        brotherhood_router(Arc::new(service))
    }

    pub(super) async fn get(router: &Router, uri: &str, user: Option<&str>) -> Response {
        let mut builder = Request::get(uri);
        if let Some(user) = user {
            builder = builder.header(AUTHENTICATED_USER_HEADER, user);
        }
        router
            .clone()
            .oneshot(builder.body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes")
    }

    pub(super) async fn post(router: &Router, uri: &str, user: Option<&str>, body: &str) -> Response {
        let mut builder =
            Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(user) = user {
            builder = builder.header(AUTHENTICATED_USER_HEADER, user);
        }
        router
            .clone()
            .oneshot(
                builder
                    .body(Body::from(body.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("route executes")
    }

    pub(super) async fn json(response: Response) -> Value {
        assert_eq!(response.status(), StatusCode::OK, "expected a rendered view");
        let bytes = axum::body::to_bytes(response.into_body(), 256 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    pub(super) fn redirect_target(response: &Response) -> String {
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .expect("location header")
            .to_string()
    }

    /// Looks up a catalogue entry id by name from a list view payload.
    pub(super) fn id_named(entries: &Value, name: &str) -> u64 {
        entries
            .as_array()
            .expect("catalogue array")
            .iter()
            .find(|entry| entry["name"] == name)
            .and_then(|entry| entry["id"].as_u64())
            .unwrap_or_else(|| panic!("catalogue entry {name} missing"))
    }
}

use axum::http::StatusCode;
use common::*;
use serde_json::json;

const MANUEL: &str =
    "name=Manuel&surname=Ruiz&national_id=12345678A&birth_date=1980-03-02&join_date=1995-04-10";

#[tokio::test]
async fn member_lifecycle_from_enrolment_to_removal() {
    let router = seeded_router();

    let created = post(&router, "/members", Some(ADMIN), MANUEL).await;
    let detail_uri = redirect_target(&created);

    let roles = json(get(&router, "/roles", Some(ADMIN)).await).await;
    let hermano_mayor = id_named(&roles["roles"], "Hermano Mayor");
    let assigned = post(
        &router,
        &format!("{detail_uri}/roles"),
        Some(ADMIN),
        &format!("role={hermano_mayor}&start_date=2024-01-01"),
    )
    .await;
    assert_eq!(redirect_target(&assigned), detail_uri);

    let detail = json(get(&router, &detail_uri, Some(ADMIN)).await).await;
    assert_eq!(detail["roles"][0]["role_name"], json!("Hermano Mayor"));

    let dues_uri = format!("{detail_uri}/dues");
    let recorded = post(
        &router,
        &dues_uri,
        Some(ADMIN),
        "amount=30.50&period=second-half&payment_state=paid",
    )
    .await;
    assert_eq!(redirect_target(&recorded), dues_uri);
    let dues = json(get(&router, &dues_uri, Some(ADMIN)).await).await;
    assert_eq!(dues["total_paid"], json!("30.50"));
    assert_eq!(dues["total_pending"], json!("0"));

    let statistics = json(get(&router, "/statistics", Some(ADMIN)).await).await;
    assert_eq!(statistics["total_members"], json!(1));
    assert_eq!(statistics["total_dues"], json!(1));

    let removed = post(&router, &format!("{detail_uri}/delete"), Some(ADMIN), "").await;
    assert_eq!(redirect_target(&removed), "/members");
    assert_eq!(
        get(&router, &detail_uri, Some(ADMIN)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&router, "/", Some("12345678A")).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn members_only_see_their_own_record() {
    let router = seeded_router();
    redirect_target(&post(&router, "/members", Some(ADMIN), MANUEL).await);
    let registered = post(
        &router,
        "/register",
        None,
        "name=Lucia&surname=Martin&national_id=87654321B&birth_date=1990-05-05&password=cirio-2025&password2=cirio-2025",
    )
    .await;
    assert_eq!(redirect_target(&registered), "/");

    let listing = json(get(&router, "/members", Some("87654321B")).await).await;
    let members = listing["members"].as_array().expect("members array");
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["national_id"], json!("87654321B"));
    assert_eq!(listing["is_admin"], json!(false));

    let statistics = get(&router, "/statistics", Some("87654321B")).await;
    assert_eq!(redirect_target(&statistics), "/");

    let everyone = json(get(&router, "/members", Some(ADMIN)).await).await;
    assert_eq!(everyone["members"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn ceremony_participation_is_recorded_once() {
    let router = seeded_router();
    let member_uri = redirect_target(&post(&router, "/members", Some(ADMIN), MANUEL).await);
    let member_id = member_uri.trim_start_matches("/members/").to_string();

    let types = json(get(&router, "/ceremony-types", Some(ADMIN)).await).await;
    let vigilia = id_named(&types["ceremony_types"], "Vigilia");
    let ceremony_uri = redirect_target(
        &post(
            &router,
            "/ceremonies",
            Some(ADMIN),
            &format!("ceremony_type={vigilia}&start_date=2025-04-12&description=Vigilia+de+Ramos"),
        )
        .await,
    );

    let roles = json(get(&router, "/roles", Some(ADMIN)).await).await;
    let costalero = id_named(&roles["roles"], "Costalero");
    let body = format!("member={member_id}&role={costalero}&segment=2");
    for _ in 0..2 {
        let added = post(
            &router,
            &format!("{ceremony_uri}/participants"),
            Some(ADMIN),
            &body,
        )
        .await;
        assert_eq!(redirect_target(&added), ceremony_uri);
    }

    let detail = json(get(&router, &ceremony_uri, Some(ADMIN)).await).await;
    assert_eq!(detail["type_name"], json!("Vigilia"));
    let participants = detail["participants"].as_array().expect("participants");
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0]["role_name"], json!("Costalero"));
    assert_eq!(participants[0]["segment"], json!(2));

    let filtered = json(
        get(
            &router,
            &format!("/ceremonies?type={vigilia}"),
            Some(ADMIN),
        )
        .await,
    )
    .await;
    assert_eq!(filtered["ceremonies"].as_array().map(Vec::len), Some(1));
    assert_eq!(filtered["selected_type"], json!(vigilia));
}
