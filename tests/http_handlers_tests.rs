use access_control_service::domain::user::User;
use access_control_service::infrastructure::UserRepository;
use access_control_service::test_utils::{TestContext, item_id};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_merge_permissions_created_then_merged() {
    let ctx = TestContext::new();
    let app = ctx.router();

    let (status, body) = send(
        &app,
        "POST",
        "/api/permissions",
        Some(json!({
            "group": "Billing",
            "permissions": [{"name": "view", "description": "Read invoices"}, {"name": "edit"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["group"], "Billing");
    assert_eq!(body["permissions"].as_array().unwrap().len(), 2);
    assert_eq!(body["permissions"][0]["description"], "Read invoices");

    let (status, body) = send(
        &app,
        "POST",
        "/api/permissions",
        Some(json!({
            "group": "Billing",
            "permissions": [{"name": "edit"}, {"name": "export"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["view", "edit", "export"]);
}

#[tokio::test]
async fn test_merge_permissions_validation_error() {
    let ctx = TestContext::new();
    let (status, body) = send(
        &ctx.router(),
        "POST",
        "/api/permissions",
        Some(json!({"group": "Billing", "permissions": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("permissions"));
}

#[tokio::test]
async fn test_merge_permissions_malformed_body_is_bad_request() {
    let ctx = TestContext::new();
    let app = ctx.router();

    let bodies = [
        json!({"group": "Billing", "permissions": "view"}),
        json!({"group": "Billing"}),
        json!({"group": "Billing", "permissions": [{"description": "x"}]}),
    ];
    for body in bodies {
        let (status, response) = send(&app, "POST", "/api/permissions", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].as_str().unwrap().contains("permissions"));
    }
    assert!(ctx.state.permission_groups.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_role_and_user_bodies_are_bad_request() {
    let ctx = TestContext::new();
    let group = ctx.seed_group("Billing", &["view"]).await;
    let role = ctx.seed_role("Accountant", vec![]).await;
    let app = ctx.router();

    let (status, body) = send(
        &app,
        "POST",
        "/api/roles",
        Some(json!({"name": "Auditor", "permissions": "view"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/roles/{}", role.id),
        Some(json!({"permissions": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/permissions/{}/{}", group.id, item_id(&group, "view")),
        Some(json!({"description": "no name"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"name": "Ada", "email": "ada@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("role"));

    let (status, body) = send(&app, "PUT", "/api/users/u1", Some(json!({"name": 7}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_list_permission_groups() {
    let ctx = TestContext::new();
    ctx.seed_group("Users", &["view"]).await;
    ctx.seed_group("Billing", &["view"]).await;

    let (status, body) = send(&ctx.router(), "GET", "/api/permissions", None).await;
    assert_eq!(status, StatusCode::OK);
    let groups = body.as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["group"], "Billing");
    assert!(groups[0].get("createdAt").is_some());
}

#[tokio::test]
async fn test_update_permission_item() {
    let ctx = TestContext::new();
    let group = ctx.seed_group("Billing", &["view", "edit"]).await;
    let edit = item_id(&group, "edit");
    let app = ctx.router();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/permissions/{}/{edit}", group.id),
        Some(json!({"name": "write", "description": "Change invoices"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Permission updated successfully");
    assert_eq!(body["updatedPermission"]["id"], edit.as_str());
    assert_eq!(body["updatedPermission"]["name"], "write");
    assert_eq!(body["group"]["permissions"][1]["name"], "write");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/permissions/{}/{edit}", group.id),
        Some(json!({"name": "view"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/permissions/{}/missing", group.id),
        Some(json!({"name": "other"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_permission_item_and_group() {
    let ctx = TestContext::new();
    let group = ctx.seed_group("Billing", &["view", "edit"]).await;
    let app = ctx.router();

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/permissions/{}/{}", group.id, item_id(&group, "view")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Permission deleted successfully");
    assert_eq!(body["deleted"], true);
    assert_eq!(body["groupDeleted"], false);
    assert_eq!(body["group"]["permissions"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/permissions/{}/{}", group.id, item_id(&group, "edit")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Permission group deleted as no permissions remain"
    );
    assert_eq!(body["groupDeleted"], true);
    assert!(body.get("group").is_none());

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/permissions/{}/{}", group.id, item_id(&group, "edit")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_role_accepts_both_reference_shapes() {
    let ctx = TestContext::new();
    let group = ctx.seed_group("Billing", &["view", "edit"]).await;
    let view = item_id(&group, "view");
    let edit = item_id(&group, "edit");

    let (status, body) = send(
        &ctx.router(),
        "POST",
        "/api/roles",
        Some(json!({"name": "Accountant", "permissions": [view, {"id": edit}]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Accountant");
    let permissions = body["permissions"].as_array().unwrap();
    assert_eq!(permissions.len(), 2);
    assert_eq!(permissions[0]["name"], "view");
    assert_eq!(permissions[0]["group"], "Billing");
    assert_eq!(permissions[1]["name"], "edit");
}

#[tokio::test]
async fn test_create_role_errors() {
    let ctx = TestContext::new();
    let app = ctx.router();
    ctx.seed_role("Accountant", vec![]).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/roles",
        Some(json!({"name": "Accountant", "permissions": []})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/api/roles",
        Some(json!({"name": "", "permissions": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/roles",
        Some(json!({"name": "Auditor", "permissions": ["not-an-id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_role_and_unknown_role() {
    let ctx = TestContext::new();
    let group = ctx.seed_group("Billing", &["view", "edit"]).await;
    let role = ctx
        .seed_role("Accountant", vec![item_id(&group, "view")])
        .await;
    let app = ctx.router();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/roles/{}", role.id),
        Some(json!({"name": "Auditor", "permissions": [item_id(&group, "edit")]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Auditor");
    assert_eq!(body["permissions"][0]["name"], "edit");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/roles/missing",
        Some(json!({"name": "Ghost", "permissions": []})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("role"));
}

#[tokio::test]
async fn test_delete_role_blocked_then_allowed() {
    let ctx = TestContext::new();
    let role = ctx.seed_role("Accountant", vec![]).await;
    let app = ctx.router();

    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"name": "Ada", "email": "ada@example.com", "role": role.id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "DELETE", &format!("/api/roles/{}", role.id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Cannot delete role assigned to users");

    let (status, body) = send(&app, "DELETE", &format!("/api/users/{user_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted");

    let (status, body) = send(&app, "DELETE", &format!("/api/roles/{}", role.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Role deleted");
}

#[tokio::test]
async fn test_create_user_defaults_and_errors() {
    let ctx = TestContext::new();
    let role = ctx.seed_role("Accountant", vec![]).await;
    let app = ctx.router();

    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"name": "Ada", "email": "ada@example.com", "role": role.id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "Active");
    assert_eq!(body["role"], role.id.as_str());

    let (status, _) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"name": "Ada", "email": "ada@example.com", "role": role.id})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"name": "Bob", "email": "bob@example.com", "role": "missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"name": "Bob", "email": "not-an-email", "role": role.id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_user_partial_fields() {
    let ctx = TestContext::new();
    let accountant = ctx.seed_role("Accountant", vec![]).await;
    let auditor = ctx.seed_role("Auditor", vec![]).await;
    let user = ctx
        .user_repo
        .create_user(User::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            accountant.id.clone(),
            None,
        ))
        .await
        .unwrap();
    let app = ctx.router();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", user.id),
        Some(json!({"role": auditor.id, "status": "Suspended"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], auditor.id.as_str());
    assert_eq!(body["status"], "Suspended");
    assert_eq!(body["name"], "Ada");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", user.id),
        Some(json!({"role": "missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "PUT", "/api/users/missing", Some(json!({"name": "X"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_users_resolves_role_and_permissions() {
    let ctx = TestContext::new();
    let group = ctx.seed_group("Billing", &["view", "edit"]).await;
    let role = ctx
        .seed_role(
            "Accountant",
            vec![item_id(&group, "view"), item_id(&group, "edit")],
        )
        .await;
    let app = ctx.router();

    send(
        &app,
        "POST",
        "/api/users",
        Some(json!({"name": "Ada", "email": "ada@example.com", "role": role.id})),
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/users", None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["role"]["name"], "Accountant");
    assert_eq!(users[0]["role"]["permissions"].as_array().unwrap().len(), 2);
    assert_eq!(users[0]["role"]["permissions"][1]["group"], "Billing");
}

#[tokio::test]
async fn test_delete_unknown_user_and_role_succeed() {
    let ctx = TestContext::new();
    let app = ctx.router();

    let (status, _) = send(&app, "DELETE", "/api/users/missing", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", "/api/roles/missing", None).await;
    assert_eq!(status, StatusCode::OK);
}
