use httpmock::prelude::*;
use polytomic_provider::testing::ProviderTester;
use polytomic_provider::PolytomicProvider;
use serde_json::{json, Value};
use tokio_test::assert_ok;

const RESOURCE: &str = "polytomic_bulk_sync";

fn config() -> Value {
    json!({
        "name": "Warehouse replication",
        "source_connection_id": "src",
        "destination_connection_id": "dst",
        "schedule": {"frequency": "daily", "hour": "2"},
        "schemas": [
            {"id": "public.users"},
            {"id": "public.orders", "enabled": false}
        ]
    })
}

fn api_bulk_sync() -> Value {
    // Schemas come back in a different order, with one the API discovered.
    json!({"data": {
        "id": "b1",
        "name": "Warehouse replication",
        "organization_id": "o1",
        "active": true,
        "mode": "replicate",
        "source_connection_id": "src",
        "destination_connection_id": "dst",
        "schedule": {"frequency": "daily", "hour": "2"},
        "discover": false,
        "policies": [],
        "schemas": [
            {"id": "public.events", "enabled": false},
            {"id": "public.orders", "enabled": false, "fields": [{"id": "total"}]},
            {"id": "public.users", "enabled": true}
        ]
    }})
}

#[tokio::test]
async fn test_bulk_sync_schemas_follow_configuration() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/bulk/syncs")
                .json_body_partial(
                    r#"{"name": "Warehouse replication", "schedule": {"frequency": "daily", "hour": "2"}}"#,
                );
            then.status(200).json_body(api_bulk_sync());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/bulk/syncs/b1");
            then.status(200).json_body(api_bulk_sync());
        })
        .await;

    let tester = ProviderTester::new(PolytomicProvider::with_env(|_| None));
    assert_ok!(tester.configure_for(&server.base_url()).await);

    let plan = assert_ok!(tester.plan_create(RESOURCE, config()).await);
    assert_eq!(plan.planned_state["schemas"][0]["enabled"], true);
    assert_eq!(plan.planned_state["schemas"][1]["enabled"], false);

    let state = assert_ok!(tester.lifecycle_create(RESOURCE, config()).await);
    create.assert_async().await;

    assert_eq!(state["id"], "b1");
    assert_eq!(state["active"], true);
    assert_eq!(state["mode"], "replicate");
    let ids: Vec<&str> = state["schemas"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["public.users", "public.orders"]);
    assert!(state["source_configuration"].is_null());

    assert_ok!(tester.assert_no_drift(RESOURCE, state, config()).await);
}

#[tokio::test]
async fn test_bulk_sync_invalid_schedule_is_rejected_before_apply() {
    let tester = ProviderTester::new(PolytomicProvider::with_env(|_| None));
    let mut bad = config();
    bad["schedule"]["frequency"] = json!("fortnightly");
    assert!(tester.validate_resource_config(RESOURCE, bad).await.is_err());
}
