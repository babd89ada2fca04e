//! Core authentication flow tests: login, me, logout, refresh rotation.

use http::StatusCode;

use crate::helpers::TestApp;

#[tokio::test]
async fn login_returns_token_pair() {
    let app = TestApp::new().await;
    app.create_password_user("", "alice@example.com", "P@ss1234")
        .await;

    let response = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "alice@example.com",
                "password": "P@ss1234",
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.get("accessToken").is_some());
    assert!(response.body.get("refreshToken").is_some());
}

#[tokio::test]
async fn login_with_wrong_password_fails_generically() {
    let app = TestApp::new().await;
    app.create_password_user("", "bob@example.com", "P@ss1234")
        .await;

    let response = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "bob@example.com",
                "password": "wrong-password",
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.error_key(),
        "authPasswordBased.login.invalidEmailPasswordCombination"
    );
}

#[tokio::test]
async fn login_with_unknown_email_names_the_email() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "nobody@example.com",
                "password": "P@ss1234",
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_key(), "authPasswordBased.login.unknownEmail");
}

#[tokio::test]
async fn me_requires_authentication() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/auth/me", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_session_and_user() {
    let app = TestApp::new().await;
    app.create_password_user("", "carol@example.com", "P@ss1234")
        .await;
    let token = app.login("carol@example.com", "P@ss1234").await;

    let response = app.request("GET", "/auth/me", None, Some(&token)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["session"]["type"], "user");
    assert_eq!(response.body["session"]["loginType"], "passwordBased");
    assert_eq!(
        response.body["user"]["passwordLogin"]["email"],
        "carol@example.com"
    );
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = TestApp::new().await;
    app.create_password_user("", "dave@example.com", "P@ss1234")
        .await;
    let token = app.login("dave@example.com", "P@ss1234").await;

    let response = app.request("POST", "/auth/logout", None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.request("GET", "/auth/me", None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_the_pair() {
    let app = TestApp::new().await;
    app.create_password_user("", "erin@example.com", "P@ss1234")
        .await;

    let login = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "erin@example.com",
                "password": "P@ss1234",
            })),
            None,
        )
        .await;
    let refresh_token = login.body["refreshToken"].as_str().unwrap().to_string();

    let response = app
        .request(
            "POST",
            "/auth/refresh-tokens",
            Some(serde_json::json!({ "refreshToken": refresh_token })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.get("accessToken").is_some());

    let new_access = response.body["accessToken"].as_str().unwrap();
    let me = app.request("GET", "/auth/me", None, Some(new_access)).await;
    assert_eq!(me.status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_replay_revokes_the_whole_chain() {
    let app = TestApp::new().await;
    app.create_password_user("", "frank@example.com", "P@ss1234")
        .await;

    let login = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "frank@example.com",
                "password": "P@ss1234",
            })),
            None,
        )
        .await;
    let r1 = login.body["refreshToken"].as_str().unwrap().to_string();

    // First rotation succeeds.
    let rotated = app
        .request(
            "POST",
            "/auth/refresh-tokens",
            Some(serde_json::json!({ "refreshToken": r1 })),
            None,
        )
        .await;
    assert_eq!(rotated.status, StatusCode::OK);
    let a2 = rotated.body["accessToken"].as_str().unwrap().to_string();
    let r2 = rotated.body["refreshToken"].as_str().unwrap().to_string();

    // Replaying the consumed token burns the chain.
    let replay = app
        .request(
            "POST",
            "/auth/refresh-tokens",
            Some(serde_json::json!({ "refreshToken": r1 })),
            None,
        )
        .await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);

    // The freshly rotated pair is dead too.
    let me = app.request("GET", "/auth/me", None, Some(&a2)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);

    let rotate_again = app
        .request(
            "POST",
            "/auth/refresh-tokens",
            Some(serde_json::json!({ "refreshToken": r2 })),
            None,
        )
        .await;
    assert_eq!(rotate_again.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn soft_deleted_user_cannot_login_until_reactivated() {
    let app = TestApp::new().await;
    let admin_id = app
        .create_password_user("", "admin@example.com", "P@ss1234")
        .await;
    app.grant_admin(admin_id).await;
    let user_id = app
        .create_password_user("", "grace@example.com", "P@ss1234")
        .await;

    let admin_token = app.login("admin@example.com", "P@ss1234").await;

    let response = app
        .request(
            "POST",
            &format!("/auth/user/{user_id}/set-active"),
            Some(serde_json::json!({ "active": false })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // Exactly one softDeleted event.
    assert_eq!(app.job_payloads("auth.user.softDeleted").await.len(), 1);

    // Soft-deleted users resolve like unknown emails.
    let login = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "grace@example.com",
                "password": "P@ss1234",
            })),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::BAD_REQUEST);

    // Re-activation restores login; no second event.
    let response = app
        .request(
            "POST",
            &format!("/auth/user/{user_id}/set-active"),
            Some(serde_json::json!({ "active": true })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.job_payloads("auth.user.softDeleted").await.len(), 1);

    app.login("grace@example.com", "P@ss1234").await;
}
