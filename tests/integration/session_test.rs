//! Session administration and device binding tests.

use http::StatusCode;

use crate::helpers::TestApp;

#[tokio::test]
async fn session_list_marks_the_current_session() {
    let app = TestApp::new().await;
    app.create_password_user("", "alice@example.com", "P@ss1234")
        .await;
    let first = app.login("alice@example.com", "P@ss1234").await;
    let second = app.login("alice@example.com", "P@ss1234").await;

    let response = app
        .request("GET", "/session/list", None, Some(&second))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let sessions = response.body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(
        sessions
            .iter()
            .filter(|s| s["isCurrentSession"] == true)
            .count(),
        1
    );

    // The first token still works: concurrent logins each get their own
    // session.
    let me = app.request("GET", "/auth/me", None, Some(&first)).await;
    assert_eq!(me.status, StatusCode::OK);
}

#[tokio::test]
async fn session_logout_revokes_a_selected_session() {
    let app = TestApp::new().await;
    app.create_password_user("", "bob@example.com", "P@ss1234")
        .await;
    let victim = app.login("bob@example.com", "P@ss1234").await;
    let keeper = app.login("bob@example.com", "P@ss1234").await;

    let list = app.request("GET", "/session/list", None, Some(&keeper)).await;
    let victim_id = list.body["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["isCurrentSession"] == false)
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(
            "POST",
            "/session/logout",
            Some(serde_json::json!({ "sessionId": victim_id })),
            Some(&keeper),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let me = app.request("GET", "/auth/me", None, Some(&victim)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    let me = app.request("GET", "/auth/me", None, Some(&keeper)).await;
    assert_eq!(me.status, StatusCode::OK);
}

#[tokio::test]
async fn device_platform_rules_are_enforced() {
    let app = TestApp::new().await;
    app.create_password_user("", "carol@example.com", "P@ss1234")
        .await;

    // Desktop devices cannot carry a notification token at login.
    let response = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "carol@example.com",
                "password": "P@ss1234",
                "device": {
                    "platform": "desktop",
                    "name": "Firefox on Linux",
                    "notificationToken": "apns-token",
                },
            })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.error_key(),
        "auth.device.notificationTokenRequiresMobile"
    );

    // A clean desktop device logs in and can attach a web-push
    // subscription, but not a notification token.
    let login = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "carol@example.com",
                "password": "P@ss1234",
                "device": { "platform": "desktop", "name": "Firefox on Linux" },
            })),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["accessToken"].as_str().unwrap();

    let set = app
        .request(
            "POST",
            "/session/set-notification-token",
            Some(serde_json::json!({
                "webPushSubscription": { "endpoint": "https://push.example/abc" },
            })),
            Some(token),
        )
        .await;
    assert_eq!(set.status, StatusCode::OK);

    let set = app
        .request(
            "POST",
            "/session/set-notification-token",
            Some(serde_json::json!({ "notificationToken": "apns-token" })),
            Some(token),
        )
        .await;
    assert_eq!(set.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_device_is_rejected_when_required() {
    let app = TestApp::with_config(|config| {
        config.session.require_device = true;
    })
    .await;
    app.create_password_user("", "dave@example.com", "P@ss1234")
        .await;

    let response = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "dave@example.com",
                "password": "P@ss1234",
            })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_key(), "auth.login.missingDevice");
}

#[tokio::test]
async fn mobile_session_cap_is_enforced() {
    let app = TestApp::with_config(|config| {
        config.session.max_mobile_sessions = Some(1);
    })
    .await;
    app.create_password_user("", "erin@example.com", "P@ss1234")
        .await;

    let login = |device_name: &'static str| {
        let app = &app;
        async move {
            app.request(
                "POST",
                "/auth/password-based/login",
                Some(serde_json::json!({
                    "email": "erin@example.com",
                    "password": "P@ss1234",
                    "device": { "platform": "apple", "name": device_name },
                })),
                None,
            )
            .await
        }
    };

    let first = login("iPhone 15").await;
    assert_eq!(first.status, StatusCode::OK);

    let second = login("iPad").await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.error_key(), "auth.device.tooManyMobileSessions");
}

#[tokio::test]
async fn impersonation_switches_and_restores_identity() {
    let app = TestApp::new().await;
    let admin_id = app
        .create_password_user("", "admin@example.com", "P@ss1234")
        .await;
    app.grant_admin(admin_id).await;
    let target_id = app
        .create_password_user("", "target@example.com", "P@ss1234")
        .await;

    let token = app.login("admin@example.com", "P@ss1234").await;

    let start = app
        .request(
            "POST",
            "/auth/impersonate-start-session",
            Some(serde_json::json!({ "userId": target_id })),
            Some(&token),
        )
        .await;
    assert_eq!(start.status, StatusCode::OK);

    let me = app.request("GET", "/auth/me", None, Some(&token)).await;
    assert_eq!(me.body["user"]["id"], serde_json::json!(target_id));
    assert_eq!(
        me.body["session"]["impersonatorUserId"],
        serde_json::json!(admin_id)
    );

    let stop = app
        .request("POST", "/auth/impersonate-stop-session", None, Some(&token))
        .await;
    assert_eq!(stop.status, StatusCode::OK);

    let me = app.request("GET", "/auth/me", None, Some(&token)).await;
    assert_eq!(me.body["user"]["id"], serde_json::json!(admin_id));
    assert!(me.body["session"].get("impersonatorUserId").is_none());
}

#[tokio::test]
async fn anonymous_login_is_gated_by_the_flag() {
    let app = TestApp::new().await;

    // A user with a blocked anonymous token.
    let user_id = app
        .create_password_user("", "anon-owner@example.com", "P@ss1234")
        .await;
    sqlx::query(
        "INSERT INTO anonymous_login (user_id, login_token, is_allowed_to_login) \
         VALUES ($1, $2, FALSE)",
    )
    .bind(user_id)
    .bind("auth-anonymous-test-token")
    .execute(&app.db_pool)
    .await
    .unwrap();

    let response = app
        .request(
            "POST",
            "/auth/anonymous-based/login",
            Some(serde_json::json!({ "token": "auth-anonymous-test-token" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.error_key(),
        "authAnonymousBased.login.tokenIsNotAllowedToLogin"
    );

    // Allowing the token turns the same call into a token pair.
    sqlx::query("UPDATE anonymous_login SET is_allowed_to_login = TRUE WHERE user_id = $1")
        .bind(user_id)
        .execute(&app.db_pool)
        .await
        .unwrap();

    let response = app
        .request(
            "POST",
            "/auth/anonymous-based/login",
            Some(serde_json::json!({ "token": "auth-anonymous-test-token" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.get("accessToken").is_some());

    let token = response.body["accessToken"].as_str().unwrap();
    let me = app.request("GET", "/auth/me", None, Some(token)).await;
    assert_eq!(me.body["session"]["loginType"], "anonymousBased");

    // Internal flows can build a session seed without issuing tokens.
    let seed = app
        .state
        .anonymous_provider
        .session_for_user(user_id)
        .await
        .unwrap();
    assert_eq!(seed.user_id, user_id);
}
