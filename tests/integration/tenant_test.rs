//! Tenant resolution and cross-tenant uniqueness tests.

use http::StatusCode;

use lightbase_service::user::{NewPasswordLogin, NewUser};

use crate::helpers::{ACME_API_URL, GLOBEX_API_URL, TestApp};

#[tokio::test]
async fn current_tenant_resolves_from_the_host_header() {
    let app = TestApp::new().await;

    let response = app
        .request_for_tenant(ACME_API_URL, "GET", "/multitenant/current", None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["tenant"]["name"], "acme");
    assert_eq!(response.body["apiUrl"], ACME_API_URL);
    assert_eq!(response.body["publicUrl"], "app.acme.test");

    let response = app
        .request_for_tenant(GLOBEX_API_URL, "GET", "/multitenant/current", None, None)
        .await;
    assert_eq!(response.body["tenant"]["name"], "globex");
}

#[tokio::test]
async fn unknown_host_is_an_invalid_tenant() {
    let app = TestApp::new().await;

    let response = app
        .request_for_tenant("api.unknown.test", "GET", "/multitenant/current", None, None)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_key(), "multitenant.require.invalidTenant");
}

#[tokio::test]
async fn tenant_origin_override_wins_in_development() {
    let app = TestApp::new().await;

    let req = http::Request::builder()
        .method("GET")
        .uri("/multitenant/current")
        .header("Host", ACME_API_URL)
        .header("x-lpc-tenant-origin", "app.globex.test")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router.clone(), req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parsed["tenant"]["name"], "globex");
    // With the override, the api URL follows the request host.
    assert_eq!(parsed["apiUrl"], ACME_API_URL);
}

async fn create_password_user_via_directory(
    app: &TestApp,
    tenant_name: &str,
    email: &str,
) -> Result<uuid::Uuid, lightbase_core::AppError> {
    let tenant_id: uuid::Uuid = sqlx::query_scalar("SELECT id FROM tenant WHERE name = $1")
        .bind(tenant_name)
        .fetch_one(&app.db_pool)
        .await
        .unwrap();

    let mut tx = app.db_pool.begin().await.unwrap();
    let result = app
        .state
        .user_directory
        .create_user(
            &mut *tx,
            tenant_id,
            NewUser {
                with_password: Some(NewPasswordLogin {
                    email: email.to_string(),
                    password: Some("P@ss1234".to_string()),
                    random_password: false,
                }),
                ..NewUser::default()
            },
        )
        .await;

    match result {
        Ok(user) => {
            tx.commit().await.unwrap();
            Ok(user.id)
        }
        Err(e) => {
            tx.rollback().await.unwrap();
            Err(e)
        }
    }
}

#[tokio::test]
async fn duplicate_email_is_forbidden_within_a_tenant_only() {
    let app = TestApp::new().await;

    // First user in acme.
    create_password_user_via_directory(&app, "acme", "x@e.com")
        .await
        .expect("first user");

    // Same email in acme is rejected.
    let err = create_password_user_via_directory(&app, "acme", "x@e.com")
        .await
        .expect_err("duplicate in acme");
    assert_eq!(err.key, "authPasswordBased.checkUnique.duplicateEmail");
    assert_eq!(err.status, StatusCode::BAD_REQUEST);

    // The same email in globex only is allowed.
    let globex_user = create_password_user_via_directory(&app, "globex", "x@e.com")
        .await
        .expect("user in globex");

    // Joining acme trips the uniqueness check.
    let acme_id: uuid::Uuid = sqlx::query_scalar("SELECT id FROM tenant WHERE name = 'acme'")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();

    let mut tx = app.db_pool.begin().await.unwrap();
    let err = app
        .state
        .user_directory
        .add_tenant(&mut *tx, globex_user, acme_id)
        .await
        .expect_err("joining acme with a duplicate email");
    tx.rollback().await.unwrap();

    assert_eq!(err.key, "authPasswordBased.checkUnique.duplicateEmail");
}

#[tokio::test]
async fn registration_enqueues_the_verify_mail() {
    let app = TestApp::new().await;

    create_password_user_via_directory(&app, "acme", "new-user@example.com")
        .await
        .unwrap();

    let jobs = app.job_payloads("auth.passwordBased.userRegistered").await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["email"], "new-user@example.com");
    assert_eq!(jobs[0]["shouldSetPassword"], false);
    assert!(jobs[0]["resetToken"].as_str().unwrap().starts_with("auth-reset-"));
}

#[tokio::test]
async fn rolled_back_registration_leaves_no_jobs() {
    let app = TestApp::new().await;

    let tenant_id: uuid::Uuid = sqlx::query_scalar("SELECT id FROM tenant WHERE name = 'acme'")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();

    let mut tx = app.db_pool.begin().await.unwrap();
    app.state
        .user_directory
        .create_user(
            &mut *tx,
            tenant_id,
            NewUser {
                with_password: Some(NewPasswordLogin {
                    email: "ghost@example.com".to_string(),
                    password: Some("P@ss1234".to_string()),
                    random_password: false,
                }),
                ..NewUser::default()
            },
        )
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert!(app
        .job_payloads("auth.passwordBased.userRegistered")
        .await
        .is_empty());
}
