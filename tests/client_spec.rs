use feature_toggle::api::{create_router_with_config, AccessConfig};
use feature_toggle::client::{ClientError, ToggleClient};
use feature_toggle::db::Database;
use feature_toggle::models::*;

/// Start a server on an ephemeral port and return its API base URL.
async fn spawn_server(config: AccessConfig) -> String {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let app = create_router_with_config(db, config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    format!("http://{}/api/v1", addr)
}

#[tokio::test]
async fn health_succeeds() {
    let url = spawn_server(AccessConfig::disabled()).await;
    let client = ToggleClient::new(url, None);

    client.health().await.expect("health");
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_ignored() {
    let url = spawn_server(AccessConfig::disabled()).await;
    let client = ToggleClient::new(format!("{}/", url), None);

    client.health().await.expect("health");
}

#[tokio::test]
async fn resolves_entitlements_for_a_user() {
    let url = spawn_server(AccessConfig::disabled()).await;
    let admin = ToggleClient::new(url, None);

    let billing = admin
        .create_feature(&FeatureArgs::root("Billing"))
        .await
        .expect("create billing");
    let invoices = admin
        .create_feature(&FeatureArgs::child("Invoices", billing.id))
        .await
        .expect("create invoices");
    let finance = admin
        .create_group(&GroupArgs::new("Finance", vec![invoices.id]))
        .await
        .expect("create group");
    admin.move_user("U", finance.id).await.expect("move user");

    let user = admin.with_user("U");
    assert!(!user.is_enabled(invoices.id).await.expect("check"));

    admin
        .enable_feature(billing.id, finance.id)
        .await
        .expect("enable");

    assert!(user.is_enabled(invoices.id).await.expect("check"));
    let names: Vec<String> = user
        .enabled_features()
        .await
        .expect("enabled features")
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["Billing", "Invoices"]);
}

#[tokio::test]
async fn anonymous_client_sees_nothing_until_public_enables_it() {
    let url = spawn_server(AccessConfig::disabled()).await;
    let client = ToggleClient::new(url, None);

    let feature = client
        .create_feature(&FeatureArgs::root("Landing Page"))
        .await
        .expect("create");
    assert!(!client.is_enabled(feature.id).await.expect("check"));

    let public = client
        .list_groups()
        .await
        .expect("groups")
        .into_iter()
        .find(|g| g.is_public())
        .expect("public group");
    client
        .enable_feature(feature.id, public.id)
        .await
        .expect("enable");

    assert!(client.is_enabled(feature.id).await.expect("check"));
}

#[tokio::test]
async fn maps_error_statuses() {
    let url = spawn_server(AccessConfig::disabled()).await;
    let client = ToggleClient::new(url, None);
    client
        .create_feature(&FeatureArgs::root("Billing"))
        .await
        .expect("create");

    let duplicate = client.create_feature(&FeatureArgs::root("Billing")).await;
    assert!(matches!(duplicate, Err(ClientError::Conflict(_))));

    let orphan = client
        .create_feature(&FeatureArgs::child("Invoices", 999))
        .await;
    assert!(matches!(orphan, Err(ClientError::Unprocessable(_))));

    let missing = client.is_enabled(999).await;
    assert!(matches!(missing, Err(ClientError::NotFound(_))));

    let unknown_group = client.move_user("alice", 999).await;
    assert!(matches!(unknown_group, Err(ClientError::NotFound(_))));
}

#[tokio::test]
async fn management_calls_need_the_admin_key() {
    let url = spawn_server(AccessConfig::with_admin_key("admin-secret")).await;

    let anonymous = ToggleClient::new(url.clone(), None);
    let denied = anonymous.list_features().await;
    assert!(matches!(denied, Err(ClientError::Forbidden)));
    assert!(anonymous.enabled_features().await.expect("enabled").is_empty());

    let admin = ToggleClient::new(url, Some("admin-secret".to_string()));
    admin
        .create_feature(&FeatureArgs::root("Billing"))
        .await
        .expect("create");
    let tree = admin.feature_tree().await.expect("tree");
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].feature.name, "Billing");
}

#[tokio::test]
async fn user_ids_with_reserved_characters_stay_one_path_segment() {
    let url = spawn_server(AccessConfig::disabled()).await;
    let client = ToggleClient::new(url, None);
    let finance = client
        .create_group(&GroupArgs::new("Finance", vec![]))
        .await
        .expect("create finance");
    let ops = client
        .create_group(&GroupArgs::new("Ops", vec![]))
        .await
        .expect("create ops");
    client.move_user("bob", finance.id).await.expect("move bob");

    let tricky = format!("bob/group/{}?", ops.id);
    let moved = client
        .move_user(&tricky, finance.id)
        .await
        .expect("move tricky user");
    assert_eq!(moved.id, tricky);
    assert_eq!(moved.group_id, finance.id);

    let fragment = client
        .move_user("a#b", ops.id)
        .await
        .expect("move user with fragment character");
    assert_eq!(fragment.id, "a#b");

    let groups = client.list_groups().await.expect("groups");
    let members_of = |id: i64| {
        groups
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.members.clone())
            .expect("group exists")
    };
    assert_eq!(members_of(finance.id), vec!["bob".to_string(), tricky.clone()]);
    assert_eq!(members_of(ops.id), vec!["a#b".to_string()]);
}
