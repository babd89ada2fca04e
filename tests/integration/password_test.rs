//! Password provider flows: email OTP two-step, verify/reset tokens,
//! enumeration defense, email and password updates, rate limiting.

use http::StatusCode;

use lightbase_core::config::feature_flag::REDUCE_ERROR_KEY_INFO_FLAG;

use crate::helpers::TestApp;

#[tokio::test]
async fn otp_enabled_login_runs_the_two_step_flow() {
    let app = TestApp::new().await;
    app.create_password_user_full("", "alice@example.com", "P@ss1234", true, true)
        .await;

    // Step 1: password login yields a checkTwoStep session and enqueues the
    // OTP mail job.
    let login = app
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
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["accessToken"].as_str().unwrap().to_string();

    let me = app.request("GET", "/auth/me", None, Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["session"]["type"], "checkTwoStep");
    assert_eq!(me.body["session"]["twoStepType"], "passwordBasedOtp");
    assert!(me.body.get("user").is_none());

    // Step 2: pick the OTP out of the enqueued job.
    let jobs = app.job_payloads("auth.passwordBased.requestOtp").await;
    assert_eq!(jobs.len(), 1);
    let otp = jobs[0]["otp"].as_str().unwrap().to_string();

    let verify = app
        .request(
            "POST",
            "/auth/password-based/verify-otp",
            Some(serde_json::json!({ "otp": otp })),
            Some(&token),
        )
        .await;
    assert_eq!(verify.status, StatusCode::OK);
    assert_eq!(verify.body["success"], true);

    // Step 3: the session is now fully authenticated.
    let me = app.request("GET", "/auth/me", None, Some(&token)).await;
    assert_eq!(me.body["session"]["type"], "user");
    assert!(me.body.get("user").is_some());
}

#[tokio::test]
async fn wrong_otp_is_rejected() {
    let app = TestApp::new().await;
    app.create_password_user_full("", "bob@example.com", "P@ss1234", true, true)
        .await;

    let login = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "bob@example.com",
                "password": "P@ss1234",
            })),
            None,
        )
        .await;
    let token = login.body["accessToken"].as_str().unwrap().to_string();

    let verify = app
        .request(
            "POST",
            "/auth/password-based/verify-otp",
            Some(serde_json::json!({ "otp": "000000" })),
            Some(&token),
        )
        .await;
    assert_eq!(verify.status, StatusCode::BAD_REQUEST);
    assert_eq!(verify.error_key(), "authPasswordBased.verifyOtp.invalidOtp");
}

#[tokio::test]
async fn unverified_login_is_denied_until_email_verified() {
    let app = TestApp::new().await;
    let user_id = app
        .create_password_user_full("", "carol@example.com", "P@ss1234", false, false)
        .await;

    let login = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "carol@example.com",
                "password": "P@ss1234",
            })),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::BAD_REQUEST);
    assert_eq!(login.error_key(), "authPasswordBased.login.emailNotVerified");

    // Issue a verify token directly, consume it, then login succeeds.
    sqlx::query(
        "INSERT INTO password_login_reset \
         (password_login_id, reset_token, should_set_password, expires_at) \
         SELECT id, 'auth-reset-verify-1', FALSE, NOW() + INTERVAL '1 day' \
         FROM password_login WHERE user_id = $1",
    )
    .bind(user_id)
    .execute(&app.db_pool)
    .await
    .unwrap();

    let verify = app
        .request(
            "POST",
            "/auth/password-based/verify-email",
            Some(serde_json::json!({ "resetToken": "auth-reset-verify-1" })),
            None,
        )
        .await;
    assert_eq!(verify.status, StatusCode::OK);
    assert_eq!(
        app.job_payloads("auth.passwordBased.loginVerified").await.len(),
        1
    );

    app.login("carol@example.com", "P@ss1234").await;

    // The token is single-use.
    let replay = app
        .request(
            "POST",
            "/auth/password-based/verify-email",
            Some(serde_json::json!({ "resetToken": "auth-reset-verify-1" })),
            None,
        )
        .await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forgot_password_enumeration_defense_follows_the_flag() {
    let app = TestApp::new().await;

    // Flag on: unknown email succeeds observably, nothing enqueued.
    app.state
        .feature_flags
        .set_dynamic(REDUCE_ERROR_KEY_INFO_FLAG, Some(true), None)
        .await
        .unwrap();

    let response = app
        .request(
            "POST",
            "/auth/password-based/forgot-password",
            Some(serde_json::json!({ "email": "nobody@nowhere.example" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(app.job_payloads("auth.passwordBased.forgotPassword").await.is_empty());

    // Flag off: the same input names the unknown email.
    app.state
        .feature_flags
        .set_dynamic(REDUCE_ERROR_KEY_INFO_FLAG, Some(false), None)
        .await
        .unwrap();

    let response = app
        .request(
            "POST",
            "/auth/password-based/forgot-password",
            Some(serde_json::json!({ "email": "nobody@nowhere.example" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.error_key(),
        "authPasswordBased.forgotPassword.unknownEmail"
    );
}

#[tokio::test]
async fn forgot_then_reset_password_works() {
    let app = TestApp::new().await;
    app.create_password_user("", "dave@example.com", "Old1234!")
        .await;

    let response = app
        .request(
            "POST",
            "/auth/password-based/forgot-password",
            Some(serde_json::json!({ "email": "dave@example.com" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let jobs = app.job_payloads("auth.passwordBased.forgotPassword").await;
    let reset_token = jobs[0]["resetToken"].as_str().unwrap().to_string();

    let response = app
        .request(
            "POST",
            "/auth/password-based/reset-password",
            Some(serde_json::json!({
                "resetToken": reset_token,
                "password": "New1234!",
            })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    app.login("dave@example.com", "New1234!").await;
}

#[tokio::test]
async fn update_email_clears_verification_and_sessions() {
    let app = TestApp::new().await;
    app.create_password_user("", "erin@example.com", "P@ss1234")
        .await;
    let token = app.login("erin@example.com", "P@ss1234").await;

    let response = app
        .request(
            "POST",
            "/auth/password-based/update-email",
            Some(serde_json::json!({ "email": "erin-new@example.com" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        app.job_payloads("auth.passwordBased.emailUpdated").await.len(),
        1
    );

    // Every session of the user is gone.
    let me = app.request("GET", "/auth/me", None, Some(&token)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);

    // The new address must be re-verified before it can login.
    let login = app
        .request(
            "POST",
            "/auth/password-based/login",
            Some(serde_json::json!({
                "email": "erin-new@example.com",
                "password": "P@ss1234",
            })),
            None,
        )
        .await;
    assert_eq!(login.error_key(), "authPasswordBased.login.emailNotVerified");
}

#[tokio::test]
async fn update_password_clears_sessions() {
    let app = TestApp::new().await;
    app.create_password_user("", "frank@example.com", "Old1234!")
        .await;
    let token = app.login("frank@example.com", "Old1234!").await;

    let response = app
        .request(
            "POST",
            "/auth/password-based/update-password",
            Some(serde_json::json!({ "password": "New1234!" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let me = app.request("GET", "/auth/me", None, Some(&token)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);

    app.login("frank@example.com", "New1234!").await;
}

#[tokio::test]
async fn verified_totp_setup_demands_the_second_factor_on_login() {
    let app = TestApp::new().await;
    app.create_password_user("", "grace@example.com", "P@ss1234")
        .await;
    let token = app.login("grace@example.com", "P@ss1234").await;

    // Set up and verify an authenticator.
    let setup = app
        .request("POST", "/auth/totp-provider/setup", None, Some(&token))
        .await;
    assert_eq!(setup.status, StatusCode::OK);
    let secret = setup.body["secret"].as_str().unwrap().to_string();
    assert!(setup.body["otpauthUrl"]
        .as_str()
        .unwrap()
        .contains("algorithm=SHA512"));

    let totp = lightbase_auth::totp::current_token(&secret).unwrap();
    let verified = app
        .request(
            "POST",
            "/auth/totp-provider/setup/verify",
            Some(serde_json::json!({ "totp": totp })),
            Some(&token),
        )
        .await;
    assert_eq!(verified.status, StatusCode::OK);

    // The next password login only gets a checkTwoStep session.
    let token = app.login("grace@example.com", "P@ss1234").await;
    let me = app.request("GET", "/auth/me", None, Some(&token)).await;
    assert_eq!(me.body["session"]["type"], "checkTwoStep");
    assert_eq!(me.body["session"]["twoStepType"], "totpProvider");

    // Passing the second factor promotes it.
    let totp = lightbase_auth::totp::current_token(&secret).unwrap();
    let verify = app
        .request(
            "POST",
            "/auth/totp-provider/verify",
            Some(serde_json::json!({ "totp": totp })),
            Some(&token),
        )
        .await;
    assert_eq!(verify.status, StatusCode::OK);

    let me = app.request("GET", "/auth/me", None, Some(&token)).await;
    assert_eq!(me.body["session"]["type"], "user");
}

#[tokio::test]
async fn password_routes_are_rate_limited() {
    let app = TestApp::with_config(|config| {
        config.rate_limit.enabled = true;
    })
    .await;

    // Eleven one-token requests fit the bucket.
    for _ in 0..11 {
        let response = app
            .request(
                "POST",
                "/auth/password-based/forgot-password",
                Some(serde_json::json!({ "email": "nobody@nowhere.example" })),
                None,
            )
            .await;
        assert_ne!(response.status, StatusCode::TOO_MANY_REQUESTS);
    }

    // The twelfth is blocked.
    let response = app
        .request(
            "POST",
            "/auth/password-based/forgot-password",
            Some(serde_json::json!({ "email": "nobody@nowhere.example" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.error_key(), "server.internal.rateLimit");
}
