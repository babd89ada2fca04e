//! Permission engine tests: summaries, role administration, idempotent
//! startup synchronization.

use http::StatusCode;

use crate::helpers::TestApp;

async fn admin_token(app: &TestApp) -> String {
    let admin_id = app
        .create_password_user("", "admin@example.com", "P@ss1234")
        .await;
    app.grant_admin(admin_id).await;
    app.login("admin@example.com", "P@ss1234").await
}

#[tokio::test]
async fn summary_lists_roles_and_permissions() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;

    let response = app
        .request("GET", "/auth/permission/summary", None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["roles"][0], "lightbase-admin");
    let permissions = response.body["permissions"].as_array().unwrap();
    assert!(permissions.iter().any(|p| p == "auth:permission:manage"));
    // Sorted output.
    let as_strings: Vec<&str> = permissions.iter().filter_map(|p| p.as_str()).collect();
    let mut sorted = as_strings.clone();
    sorted.sort_unstable();
    assert_eq!(as_strings, sorted);
}

#[tokio::test]
async fn permission_routes_require_the_manage_permission() {
    let app = TestApp::new().await;
    app.create_password_user("", "plain@example.com", "P@ss1234")
        .await;
    let token = app.login("plain@example.com", "P@ss1234").await;

    let response = app
        .request("GET", "/auth/permission/role/list", None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_key(), "permission.roleList.missingPermissions");
}

#[tokio::test]
async fn role_lifecycle_create_edit_delete() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;

    // Create a tenant-scoped role.
    let created = app
        .request(
            "POST",
            "/auth/permission/role",
            Some(serde_json::json!({ "identifier": "support" })),
            Some(&token),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK);
    let role_id = created.body["id"].as_str().unwrap().to_string();

    // Duplicate identifiers in the same tenant are rejected.
    let duplicate = app
        .request(
            "POST",
            "/auth/permission/role",
            Some(serde_json::json!({ "identifier": "support" })),
            Some(&token),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

    // Unknown permissions are rejected with their identifiers.
    let unknown = app
        .request(
            "POST",
            &format!("/auth/permission/role/{role_id}/add-permissions"),
            Some(serde_json::json!({ "permissions": ["auth:does:not-exist"] })),
            Some(&token),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        unknown.error_key(),
        "permission.roleAddPermissions.unknownPermission"
    );

    // Adding real permissions works; adding twice is ignored.
    for _ in 0..2 {
        let added = app
            .request(
                "POST",
                &format!("/auth/permission/role/{role_id}/add-permissions"),
                Some(serde_json::json!({ "permissions": ["auth:user:list"] })),
                Some(&token),
            )
            .await;
        assert_eq!(added.status, StatusCode::OK);
    }

    // Removing a permission that is not assigned is rejected.
    let absent = app
        .request(
            "POST",
            &format!("/auth/permission/role/{role_id}/remove-permissions"),
            Some(serde_json::json!({ "permissions": ["auth:user:manage"] })),
            Some(&token),
        )
        .await;
    assert_eq!(absent.status, StatusCode::BAD_REQUEST);

    // The editable role can be deleted.
    let deleted = app
        .request(
            "DELETE",
            &format!("/auth/permission/role/{role_id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
}

#[tokio::test]
async fn mandatory_roles_are_not_editable() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;

    let roles = app
        .request("GET", "/auth/permission/role/list", None, Some(&token))
        .await;
    let admin_role = roles.body["roles"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["identifier"] == "lightbase-admin")
        .expect("admin role listed")
        .clone();

    assert_eq!(admin_role["isEditable"], false);

    let role_id = admin_role["id"].as_str().unwrap();
    let deleted = app
        .request(
            "DELETE",
            &format!("/auth/permission/role/{role_id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(deleted.status, StatusCode::BAD_REQUEST);
    assert_eq!(deleted.error_key(), "permission.roleDelete.notEditable");
}

#[tokio::test]
async fn assigning_a_held_role_and_removing_an_absent_one_fail() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    let user_id = app
        .create_password_user("", "worker@example.com", "P@ss1234")
        .await;

    let role_id: uuid::Uuid = sqlx::query_scalar(
        "SELECT id FROM role WHERE identifier = 'lightbase-admin' AND tenant_id IS NULL",
    )
    .fetch_one(&app.db_pool)
    .await
    .unwrap();

    // Removing a role the user does not hold is a 400.
    let removed = app
        .request(
            "POST",
            &format!("/auth/permission/user/{user_id}/remove-role"),
            Some(serde_json::json!({ "role": role_id })),
            Some(&token),
        )
        .await;
    assert_eq!(removed.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        removed.error_key(),
        "permission.userRemoveRole.userDoesNotHaveRole"
    );

    // First assignment works, the second is a 400.
    let assigned = app
        .request(
            "POST",
            &format!("/auth/permission/user/{user_id}/assign-role"),
            Some(serde_json::json!({ "role": role_id })),
            Some(&token),
        )
        .await;
    assert_eq!(assigned.status, StatusCode::OK);

    let again = app
        .request(
            "POST",
            &format!("/auth/permission/user/{user_id}/assign-role"),
            Some(serde_json::json!({ "role": role_id })),
            Some(&token),
        )
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.error_key(), "permission.userAssignRole.userHasRole");
}

#[tokio::test]
async fn startup_sync_is_idempotent() {
    let app = TestApp::new().await;

    let count_permissions = || async {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM permission")
            .fetch_one(&app.db_pool)
            .await
            .unwrap()
    };
    let count_roles = || async {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM role")
            .fetch_one(&app.db_pool)
            .await
            .unwrap()
    };

    let permissions_before = count_permissions().await;
    let roles_before = count_roles().await;

    lightbase_api::app::run_startup_sync(&app.state)
        .await
        .expect("second sync failed");

    assert_eq!(count_permissions().await, permissions_before);
    assert_eq!(count_roles().await, roles_before);
}

#[tokio::test]
async fn user_sync_roles_requires_exactly_one_selector() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    let user_id = app
        .create_password_user("", "sync@example.com", "P@ss1234")
        .await;

    let both = app
        .request(
            "POST",
            &format!("/auth/permission/user/{user_id}/sync-roles"),
            Some(serde_json::json!({
                "idIn": [],
                "identifierIn": ["lightbase-admin"],
            })),
            Some(&token),
        )
        .await;
    assert_eq!(both.status, StatusCode::BAD_REQUEST);

    let by_identifier = app
        .request(
            "POST",
            &format!("/auth/permission/user/{user_id}/sync-roles"),
            Some(serde_json::json!({ "identifierIn": ["lightbase-admin"] })),
            Some(&token),
        )
        .await;
    assert_eq!(by_identifier.status, StatusCode::OK);

    let summary = app
        .request(
            "GET",
            &format!("/auth/permission/user/{user_id}/summary"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(summary.body["roles"][0], "lightbase-admin");
}
