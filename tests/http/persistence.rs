use futures::future::join_all;
use serde_json::{json, Value};

use crate::http::*;

async fn create_counter_table(client: &Client<HttpConnector>, server: &TestServer) {
    post_json(client, &server.uri("/create-db"), json!({"name": "db1"})).await;
    let (status, _) = post_json(
        client,
        &server.uri("/create-table"),
        json!({
            "dbName": "db1",
            "tableName": "events",
            "fields": [{"name": "n", "type": "INT"}]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_http_data_survives_restart() {
    let data_dir = TempDir::new().unwrap();
    let client = Client::new();

    let server = TestServer::start(&data_dir).await;
    create_counter_table(&client, &server).await;
    post_json(
        &client,
        &server.uri("/insert-record"),
        json!({"dbName": "db1", "tableName": "events", "record": {"n": 7}}),
    )
    .await;
    server.stop().await;

    // The table document is plain pretty-printed JSON on disk
    let path = data_dir.path().join("db1").join("events.json");
    let on_disk: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk["name"], "events");
    assert_eq!(on_disk["records"], json!([{"n": 7}]));
    assert!(std::fs::read_to_string(&path).unwrap().contains("\n  \"fields\": ["));

    let server = TestServer::start(&data_dir).await;
    let (status, body) =
        get_json(&client, &server.uri("/list-records?db=db1&table=events")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"], json!([{"n": 7}]));
    assert_eq!(body["count"], 1);
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_http_concurrent_inserts_are_not_lost() {
    let data_dir = TempDir::new().unwrap();
    let server = TestServer::start(&data_dir).await;
    let client = Client::new();
    create_counter_table(&client, &server).await;

    let uri = server.uri("/insert-record");
    let inserts = (0..20).map(|n| {
        let client = client.clone();
        let uri = uri.clone();
        async move {
            post_json(
                &client,
                &uri,
                json!({"dbName": "db1", "tableName": "events", "record": {"n": n}}),
            )
            .await
        }
    });
    for (status, body) in join_all(inserts).await {
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (_, body) = get_json(&client, &server.uri("/list-records?db=db1&table=events")).await;
    assert_eq!(body["count"], 20);

    let mut seen: Vec<i64> = body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["n"].as_i64().unwrap())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..20).collect::<Vec<_>>());

    server.stop().await;
}
