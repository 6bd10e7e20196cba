use httpmock::prelude::*;
use polytomic_provider::testing::ProviderTester;
use polytomic_provider::{PolytomicProvider, ProviderError, ProviderService};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

const RESOURCE: &str = "polytomic_postgresql_connection";

fn tester() -> ProviderTester<PolytomicProvider> {
    ProviderTester::new(PolytomicProvider::with_env(|_| None))
}

fn config(hostname: &str) -> Value {
    json!({
        "id": null,
        "organization": null,
        "name": "warehouse",
        "force_destroy": null,
        "configuration": {
            "hostname": hostname,
            "username": "loader",
            "password": "hunter2",
            "database": "analytics",
            "port": 5432
        }
    })
}

fn api_connection(hostname: &str) -> Value {
    json!({"data": {
        "id": "c1",
        "name": "warehouse",
        "organization_id": "o1",
        "type": {"id": "postgresql", "name": "PostgreSQL"},
        "configuration": {
            "hostname": hostname,
            "username": "loader",
            "password": "********",
            "database": "analytics",
            "port": "5432",
            "ssl": false
        },
        "status": "healthy"
    }})
}

#[tokio::test]
async fn test_connection_create_refresh_update_delete() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/connections")
                .header("authorization", "Bearer test-key")
                .json_body_partial(
                    r#"{"name": "warehouse", "type": "postgresql", "configuration": {"password": "hunter2"}}"#,
                );
            then.status(200).json_body(api_connection("db.internal"));
        })
        .await;
    let mut get = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/connections/c1");
            then.status(200).json_body(api_connection("db.internal"));
        })
        .await;

    let tester = tester();
    assert_ok!(tester.configure_for(&server.base_url()).await);
    assert_ok!(tester.validate_resource_config(RESOURCE, config("db.internal")).await);

    let state = assert_ok!(tester.lifecycle_create(RESOURCE, config("db.internal")).await);
    create.assert_async().await;
    assert_eq!(state["id"], "c1");
    assert_eq!(state["organization"], "o1");
    assert_eq!(state["configuration"]["port"], 5432);
    assert_eq!(state["configuration"]["ssl"], false);
    // The API masks secrets; the configured value is kept.
    assert_eq!(state["configuration"]["password"], "hunter2");
    assert_eq!(state["force_destroy"], false);

    assert_ok!(
        tester
            .assert_no_drift(RESOURCE, state.clone(), config("db.internal"))
            .await
    );

    let plan = assert_ok!(
        tester
            .plan_update(RESOURCE, state.clone(), config("db2.internal"))
            .await
    );
    assert!(!plan.requires_replace);
    assert_eq!(plan.planned_state["id"], "c1");
    assert_eq!(plan.planned_state["configuration"]["hostname"], "db2.internal");

    let update = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/connections/c1")
                .json_body_partial(r#"{"configuration": {"hostname": "db2.internal"}}"#);
            then.status(200).json_body(api_connection("db2.internal"));
        })
        .await;
    get.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/connections/c1");
            then.status(200).json_body(api_connection("db2.internal"));
        })
        .await;

    let updated = assert_ok!(
        tester
            .lifecycle_update(RESOURCE, state, config("db2.internal"))
            .await
    );
    update.assert_async().await;
    assert_eq!(updated["configuration"]["hostname"], "db2.internal");
    assert_eq!(updated["configuration"]["password"], "hunter2");

    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/connections/c1");
            then.status(204);
        })
        .await;
    assert_ok!(tester.lifecycle_delete(RESOURCE, updated).await);
    delete.assert_async().await;
}

#[tokio::test]
async fn test_connection_removed_outside_is_dropped_from_state() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/connections/gone");
            then.status(404)
                .json_body(json!({"status": 404, "message": "connection not found"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/connections/gone");
            then.status(404)
                .json_body(json!({"status": 404, "message": "connection not found"}));
        })
        .await;

    let tester = tester();
    assert_ok!(tester.configure_for(&server.base_url()).await);
    let state = json!({
        "id": "gone",
        "organization": "o1",
        "name": "warehouse",
        "force_destroy": false,
        "configuration": {"hostname": "db", "username": "u", "database": "d"}
    });

    let refreshed = assert_ok!(tester.read(RESOURCE, state.clone()).await);
    assert!(refreshed.is_null());
    assert_ok!(tester.delete(RESOURCE, state).await);
}

#[tokio::test]
async fn test_connection_in_use_names_dependents() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/connections/c1");
            then.status(422).json_body(json!({
                "status": 422,
                "message": "connection is in use",
                "metadata": {"used_by": [
                    {"id": "s1", "name": "Users to CRM", "type": "sync"},
                    {"id": "m1", "name": "Users", "type": "model"}
                ]}
            }));
        })
        .await;

    let tester = tester();
    assert_ok!(tester.configure_for(&server.base_url()).await);
    let err = assert_err!(
        tester
            .delete(RESOURCE, json!({"id": "c1", "force_destroy": false}))
            .await
    );
    match &err {
        ProviderError::InUse { used_by, .. } => {
            assert_eq!(used_by.len(), 2);
            assert_eq!(used_by[0], "sync \"Users to CRM\" (s1)");
        },
        other => panic!("expected InUse, got {:?}", other),
    }
    let diagnostic = err.to_diagnostic();
    assert!(diagnostic.detail.unwrap_or_default().contains("model \"Users\" (m1)"));
}

#[tokio::test]
async fn test_connection_of_another_type_is_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/connections/c1");
            then.status(200).json_body(json!({"data": {
                "id": "c1",
                "name": "warehouse",
                "type": {"id": "mysql"},
                "configuration": {}
            }}));
        })
        .await;

    let tester = tester();
    assert_ok!(tester.configure_for(&server.base_url()).await);
    let imported = tester.import_resource(RESOURCE, "c1").await;
    assert!(matches!(imported, Err(ProviderError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_connection_data_source_omits_secrets() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/connections/c1");
            then.status(200).json_body(api_connection("db.internal"));
        })
        .await;

    let tester = tester();
    assert_ok!(tester.configure_for(&server.base_url()).await);
    let state = assert_ok!(
        tester
            .provider()
            .read_data_source(RESOURCE, json!({"id": "c1"}))
            .await
    );
    assert_eq!(state["name"], "warehouse");
    assert_eq!(state["configuration"]["hostname"], "db.internal");
    assert!(state["configuration"].get("password").is_none());
}
