//! Feature flag engine tests.

use http::StatusCode;

use lightbase_core::config::feature_flag::EXAMPLE_FLAG;

use crate::helpers::{GLOBEX_API_URL, TestApp};

#[tokio::test]
async fn current_returns_the_declared_set() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/feature-flag/current", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    let flags = response.body["featureFlags"].as_object().unwrap();
    assert_eq!(flags[EXAMPLE_FLAG], false);
}

#[tokio::test]
async fn tenant_override_beats_the_global_value() {
    let app = TestApp::new().await;

    app.state
        .feature_flags
        .set_dynamic(
            EXAMPLE_FLAG,
            Some(false),
            Some(&serde_json::json!({ "acme": true })),
        )
        .await
        .unwrap();

    let acme = app.request("GET", "/feature-flag/current", None, None).await;
    assert_eq!(acme.body["featureFlags"][EXAMPLE_FLAG], true);

    let globex = app
        .request_for_tenant(GLOBEX_API_URL, "GET", "/feature-flag/current", None, None)
        .await;
    assert_eq!(globex.body["featureFlags"][EXAMPLE_FLAG], false);
}

#[tokio::test]
async fn set_dynamic_rejects_undeclared_flags() {
    let app = TestApp::new().await;

    let err = app
        .state
        .feature_flags
        .set_dynamic("notDeclaredAnywhere", Some(true), None)
        .await
        .unwrap_err();

    assert_eq!(err.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_dynamic_on_unknown_identifier_is_a_server_error() {
    let app = TestApp::new().await;

    let err = app
        .state
        .feature_flags
        .get_dynamic("notDeclaredAnywhere", "acme")
        .await
        .unwrap_err();

    assert!(err.is_server_error());
}

#[tokio::test]
async fn undeclared_stored_flags_are_filtered_from_reads() {
    let app = TestApp::new().await;

    // A stale row the configuration no longer declares.
    sqlx::query("INSERT INTO feature_flag (name, description) VALUES ('legacyFlag', '')")
        .execute(&app.db_pool)
        .await
        .unwrap();
    app.state.feature_flags.clear_cache();

    let response = app.request("GET", "/feature-flag/current", None, None).await;
    assert!(response.body["featureFlags"].get("legacyFlag").is_none());

    // A fresh startup sync removes it entirely.
    lightbase_api::app::run_startup_sync(&app.state)
        .await
        .unwrap();
    let stale: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM feature_flag WHERE name = 'legacyFlag'")
            .fetch_one(&app.db_pool)
            .await
            .unwrap();
    assert_eq!(stale, 0);
}
