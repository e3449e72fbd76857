use serde_json::json;

use crate::http::*;

#[tokio::test]
async fn test_http_database_table_record_flow() {
    let data_dir = TempDir::new().unwrap();
    let server = TestServer::start(&data_dir).await;
    let client = Client::new();

    let (status, body) = get_json(&client, &server.uri("/list-dbs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "databases": []}));

    let (status, body) =
        post_json(&client, &server.uri("/create-db"), json!({"name": "shop"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = post_json(
        &client,
        &server.uri("/create-table"),
        json!({
            "dbName": "shop",
            "tableName": "products",
            "fields": [
                {"name": "id", "type": "int", "primary": true},
                {"name": "title", "type": "VARCHAR"},
                {"name": "price", "type": "FLOAT", "nullable": "yes"}
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["table"]["fields"],
        json!([
            {"name": "id", "type": "INT", "size": 11, "primary": true, "nullable": false, "default": null},
            {"name": "title", "type": "VARCHAR", "size": 255, "primary": false, "nullable": false, "default": null},
            {"name": "price", "type": "FLOAT", "size": null, "primary": false, "nullable": true, "default": null}
        ])
    );

    let (status, body) = get_json(&client, &server.uri("/list-tables?db=shop")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tables"], json!(["products"]));

    // Missing the required title
    let (status, body) = post_json(
        &client,
        &server.uri("/insert-record"),
        json!({"dbName": "shop", "tableName": "products", "record": {"id": 1}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["Field title is required"]));

    let (status, _) = post_json(
        &client,
        &server.uri("/insert-record"),
        json!({
            "dbName": "shop",
            "tableName": "products",
            "record": {"id": 1, "title": "Lamp", "color": "red"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        get_json(&client, &server.uri("/list-records?db=shop&table=products")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(
        body["records"],
        json!([{"id": 1, "title": "Lamp", "color": "red"}])
    );

    server.stop().await;
}

#[tokio::test]
async fn test_http_error_statuses() {
    let data_dir = TempDir::new().unwrap();
    let server = TestServer::start(&data_dir).await;
    let client = Client::new();

    post_json(&client, &server.uri("/create-db"), json!({"name": "shop"})).await;

    let (status, body) =
        post_json(&client, &server.uri("/create-db"), json!({"name": " shop "})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, _) =
        post_json(&client, &server.uri("/create-db"), json!({"name": "../escape"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!data_dir.path().join("..").join("escape").exists());

    // Too long for a file name on disk
    let (status, _) = post_json(
        &client,
        &server.uri("/create-db"),
        json!({"name": "x".repeat(300)}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&client, &server.uri("/list-tables?db=missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_json(
        &client,
        &server.uri("/create-table"),
        json!({"dbName": "shop", "tableName": "t", "fields": [{"name": "x", "type": "BLOB"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get_json(&client, &server.uri("/no-such-route")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    server.stop().await;
}
