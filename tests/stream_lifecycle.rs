use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};
use thousandeyes_stream_provider::testing::{
    assert_plan_changes_attribute, assert_plan_no_changes, ProviderTester,
};
use thousandeyes_stream_provider::{
    ClientConfig, ProviderService, Stream, StreamClient, StreamTestMatch, ThousandEyesProvider,
    STREAM_RESOURCE,
};
use tokio_test::{assert_err, assert_ok};

const CREATED: &str = r#"{
    "id": "s-1",
    "enabled": true,
    "type": "opentelemetry",
    "endpointType": "grpc",
    "streamEndpointUrl": "https://collector.example.com:4317",
    "dataModelVersion": "v1",
    "testMatch": [{"id": "281474", "domain": "cea"}]
}"#;

fn initial_config() -> Value {
    json!({
        "enabled": true,
        "type": "opentelemetry",
        "endpoint_type": "grpc",
        "stream_endpoint_url": "https://collector.example.com:4317",
        "data_model_version": "v1",
        "test_match": [{"id": "281474", "domain": "cea"}]
    })
}

async fn configured(server: &ServerGuard) -> ProviderTester<ThousandEyesProvider> {
    let tester = ProviderTester::new(ThousandEyesProvider::new());
    // The provider is configured with a v6 endpoint and talks to v7.
    tester
        .configure(json!({
            "token": "secret",
            "api_endpoint": format!("{}/v6", server.url())
        }))
        .await
        .unwrap();
    tester
}

async fn mock_get(server: &mut ServerGuard, status: usize, body: &str) -> Mock {
    server
        .mock("GET", "/v7/stream/s-1.json")
        .match_header("authorization", "Bearer secret")
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn crud_lifecycle_against_v7() {
    let mut server = Server::new_async().await;

    let create = server
        .mock("POST", "/v7/stream.json")
        .match_header("authorization", "Bearer secret")
        .match_header("content-type", "application/json")
        .match_header(
            "user-agent",
            Matcher::Regex("^thousandeyes-stream-provider/".to_string()),
        )
        .match_body(Matcher::Json(json!({
            "enabled": true,
            "type": "opentelemetry",
            "endpointType": "grpc",
            "streamEndpointUrl": "https://collector.example.com:4317",
            "dataModelVersion": "v1",
            "testMatch": [{"id": "281474", "domain": "cea"}]
        })))
        .with_status(201)
        .with_body(CREATED)
        .create_async()
        .await;
    // create, update and both lifecycle steps each read back once
    let get = server
        .mock("GET", "/v7/stream/s-1.json")
        .with_status(200)
        .with_body(CREATED)
        .expect(4)
        .create_async()
        .await;
    // Disabling is dropped from the body because `false` is a zero value.
    let update = server
        .mock("PUT", "/v7/stream/s-1.json")
        .match_body(Matcher::Json(json!({
            "streamEndpointUrl": "https://collector.example.com:4318"
        })))
        .with_status(200)
        .with_body(CREATED)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/v7/stream/s-1.json")
        .with_status(204)
        .create_async()
        .await;

    let tester = configured(&server).await;
    let mut updated_config = initial_config();
    updated_config["enabled"] = json!(false);
    updated_config["stream_endpoint_url"] = json!("https://collector.example.com:4318");

    let state = tester
        .lifecycle_crud(STREAM_RESOURCE, initial_config(), updated_config)
        .await
        .unwrap();

    // State always reflects the last read, not the planned values.
    assert_eq!(state["id"], "s-1");
    assert_eq!(state["enabled"], true);
    assert_eq!(state["tag_match"], json!([]));

    create.assert_async().await;
    update.assert_async().await;
    delete.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn replan_after_apply_converges() {
    let mut server = Server::new_async().await;
    let body = r#"{
        "id": "s-1",
        "type": "opentelemetry",
        "streamEndpointUrl": "https://collector.example.com:4317"
    }"#;
    let _create = server
        .mock("POST", "/v7/stream.json")
        .with_status(201)
        .with_body(body)
        .create_async()
        .await;
    let _get = mock_get(&mut server, 200, body).await;
    let put = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let tester = configured(&server).await;
    let config = json!({
        "type": "opentelemetry",
        "stream_endpoint_url": "https://collector.example.com:4317"
    });

    let state = tester
        .lifecycle_create(STREAM_RESOURCE, config.clone())
        .await
        .unwrap();
    assert_eq!(state["enabled"], false);
    assert_eq!(state["endpoint_type"], "");

    let plan = tester
        .plan_update(STREAM_RESOURCE, state.clone(), config)
        .await
        .unwrap();
    assert_plan_no_changes(&plan);

    let refreshed = tester
        .update(STREAM_RESOURCE, state.clone(), plan.planned_state)
        .await
        .unwrap();
    assert_eq!(refreshed, state);
    put.assert_async().await;
}

#[tokio::test]
async fn plan_update_reports_changed_attributes() {
    let server = Server::new_async().await;
    let tester = configured(&server).await;

    let mut prior = initial_config();
    prior["id"] = json!("s-1");
    let mut proposed = initial_config();
    proposed["tag_match"] = json!([{"key": "team", "value": "netops"}]);

    let plan = tester
        .plan_update(STREAM_RESOURCE, prior, proposed)
        .await
        .unwrap();
    assert_eq!(plan.changes.len(), 1);
    assert_plan_changes_attribute(&plan, "tag_match");
    assert_eq!(plan.planned_state["id"], "s-1");
    assert!(!plan.requires_replace);
}

#[tokio::test]
async fn import_then_read() {
    let mut server = Server::new_async().await;
    let get = mock_get(&mut server, 200, CREATED).await;
    let tester = configured(&server).await;

    let state = tester
        .lifecycle_import(STREAM_RESOURCE, "s-1")
        .await
        .unwrap();
    assert_eq!(state["id"], "s-1");
    assert_eq!(state["type"], "opentelemetry");
    assert_eq!(state["test_match"], json!([{"id": "281474", "domain": "cea"}]));
    get.assert_async().await;
}

#[tokio::test]
async fn read_after_delete_is_not_found() {
    let mut server = Server::new_async().await;
    let delete = server
        .mock("DELETE", "/v7/stream/s-1.json")
        .with_status(204)
        .create_async()
        .await;
    let get = mock_get(&mut server, 404, r#"{"message": "not found"}"#).await;
    let tester = configured(&server).await;

    assert_ok!(tester.delete(STREAM_RESOURCE, json!({"id": "s-1"})).await);
    let err = assert_err!(tester.read(STREAM_RESOURCE, json!({"id": "s-1"})).await);
    assert!(err.is_not_found());
    assert!(err.to_string().contains("response code 404"));

    delete.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn create_then_get_returns_same_stream() {
    let mut server = Server::new_async().await;
    let _create = server
        .mock("POST", "/v7/stream.json")
        .match_query(Matcher::UrlEncoded("aid".into(), "1234".into()))
        .with_status(201)
        .with_body(CREATED)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/v7/stream/s-1.json")
        .match_query(Matcher::UrlEncoded("aid".into(), "1234".into()))
        .with_status(200)
        .with_body(CREATED)
        .create_async()
        .await;

    let base = ClientConfig::new(format!("{}/v6", server.url()), "secret")
        .with_account_group_id("1234");
    let client = StreamClient::from_v6(&base).unwrap();

    let mut stream = Stream {
        enabled: true,
        stream_type: "opentelemetry".to_string(),
        endpoint_type: "grpc".to_string(),
        stream_endpoint_url: "https://collector.example.com:4317".to_string(),
        data_model_version: "v1".to_string(),
        ..Default::default()
    };
    stream.test_match.push(StreamTestMatch::new("281474", "cea"));

    let created = client.create_stream(&stream).await.unwrap();
    assert!(!created.id.is_empty());
    let fetched = client.get_stream(&created.id).await.unwrap();
    assert_eq!(created, fetched);

    stream.id = created.id.clone();
    assert_eq!(fetched, stream);
}

#[tokio::test]
async fn calls_before_configure_fail() {
    let provider = ThousandEyesProvider::new();
    let err = assert_err!(provider.read(STREAM_RESOURCE, json!({"id": "s-1"})).await);
    assert_eq!(err.to_string(), "Provider not configured");
}
