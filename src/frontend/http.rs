use std::{
    convert::Infallible,
    net::{AddrParseError, SocketAddr},
    sync::Arc,
};

use futures::{Future, TryStreamExt};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use warp::hyper::body::Buf;
use warp::multipart::{FormData, Part};
use warp::{Filter, Rejection, Reply};

use super::http_utils::{handle_rejection, into_response, ApiError, InvalidForm};
use crate::{
    catalog::Metastore, config::schema::HttpFrontend, data_types::format_timestamp,
    schema::RawField,
};

#[derive(Debug, Deserialize)]
struct CreateDatabaseBody {
    #[serde(alias = "nameDB")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTableBody {
    db_name: Option<String>,
    table_name: Option<String>,
    fields: Option<Vec<RawField>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertRecordBody {
    db_name: Option<String>,
    table_name: Option<String>,
    record: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TableQuery {
    db: Option<String>,
    table: Option<String>,
}

fn required<T>(value: Option<T>, what: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::InvalidRequest(format!("Missing {what}")))
}

fn with_metastore(
    metastore: Arc<Metastore>,
) -> impl Filter<Extract = (Arc<Metastore>,), Error = Infallible> + Clone {
    warp::any().map(move || metastore.clone())
}

// Size-limited database creation body: JSON, a URL-encoded form, or the
// multipart form the browser UI posts
fn database_body(
    max_body_bytes: u64,
) -> impl Filter<Extract = (CreateDatabaseBody,), Error = Rejection> + Clone {
    let multipart = warp::multipart::form()
        .max_length(max_body_bytes)
        .and_then(|form: FormData| async move {
            read_database_form(form).await.map_err(warp::reject::custom)
        });

    warp::body::content_length_limit(max_body_bytes).and(
        warp::body::json::<CreateDatabaseBody>()
            .or(warp::body::form())
            .unify()
            .or(multipart)
            .unify(),
    )
}

async fn read_database_form(form: FormData) -> Result<CreateDatabaseBody, InvalidForm> {
    let parts: Vec<Part> = form
        .try_collect()
        .await
        .map_err(|e| InvalidForm(e.to_string()))?;

    let mut name = None;
    for part in parts {
        if part.name() != "nameDB" && part.name() != "name" {
            continue;
        }
        let bytes = part
            .stream()
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(chunk.chunk());
                Ok(acc)
            })
            .await
            .map_err(|e| InvalidForm(e.to_string()))?;
        name = Some(
            String::from_utf8(bytes)
                .map_err(|_| InvalidForm("form field is not valid UTF-8".to_string()))?,
        );
    }

    Ok(CreateDatabaseBody { name })
}

fn json_body<T: DeserializeOwned + Send>(
    max_body_bytes: u64,
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(max_body_bytes).and(warp::body::json())
}

async fn create_database(
    body: CreateDatabaseBody,
    metastore: Arc<Metastore>,
) -> Result<impl Reply, ApiError> {
    let name = required(body.name, "database name")?;
    metastore.create_database(&name).await?;

    Ok(warp::reply::json(&json!({
        "success": true,
        "message": "Database created",
        "name": name.trim(),
    })))
}

async fn list_databases(metastore: Arc<Metastore>) -> Result<impl Reply, ApiError> {
    let databases = metastore.list_databases().await?;

    Ok(warp::reply::json(&json!({
        "success": true,
        "databases": databases,
    })))
}

async fn create_table(
    body: CreateTableBody,
    metastore: Arc<Metastore>,
) -> Result<impl Reply, ApiError> {
    let db_name = required(body.db_name, "dbName")?;
    let table_name = required(body.table_name, "tableName")?;
    let fields = required(body.fields, "fields")?;

    let table = metastore
        .create_table(&db_name, &table_name, &fields)
        .await?;

    Ok(warp::reply::json(&json!({
        "success": true,
        "message": "Table created",
        "table": table,
    })))
}

async fn insert_record(
    body: InsertRecordBody,
    metastore: Arc<Metastore>,
) -> Result<impl Reply, ApiError> {
    let db_name = required(body.db_name, "dbName")?;
    let table_name = required(body.table_name, "tableName")?;
    let record = match required(body.record, "record")? {
        Value::Object(record) => record,
        other => {
            debug!("Rejecting non-object record {other}");
            return Err(ApiError::InvalidRequest(
                "record must be a JSON object".to_string(),
            ));
        }
    };

    metastore
        .insert_record(&db_name, &table_name, record)
        .await?;

    Ok(warp::reply::json(&json!({
        "success": true,
        "message": "Record inserted",
    })))
}

async fn list_tables(
    query: TableQuery,
    metastore: Arc<Metastore>,
) -> Result<impl Reply, ApiError> {
    let db_name = required(query.db, "db parameter")?;
    let tables = metastore.list_tables(&db_name).await?;

    Ok(warp::reply::json(&json!({
        "success": true,
        "tables": tables,
    })))
}

async fn table_structure(
    query: TableQuery,
    metastore: Arc<Metastore>,
) -> Result<impl Reply, ApiError> {
    let db_name = required(query.db, "db parameter")?;
    let table_name = required(query.table, "table parameter")?;
    let structure = metastore.get_table_structure(&db_name, &table_name).await?;

    Ok(warp::reply::json(&json!({
        "success": true,
        "fields": structure.fields,
        "createdAt": format_timestamp(&structure.created_at),
    })))
}

async fn list_records(
    query: TableQuery,
    metastore: Arc<Metastore>,
) -> Result<impl Reply, ApiError> {
    let db_name = required(query.db, "db parameter")?;
    let table_name = required(query.table, "table parameter")?;
    let list = metastore.list_records(&db_name, &table_name).await?;

    Ok(warp::reply::json(&json!({
        "success": true,
        "records": list.records,
        "fields": list.fields,
        "count": list.count,
    })))
}

pub fn filters(
    metastore: Arc<Metastore>,
    config: HttpFrontend,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let max_body_bytes = config.max_body_bytes;

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["Content-Type"])
        .allow_methods(vec!["GET", "POST"]);

    // POST /create-db, also mounted at the browser UI's /criar-db
    let create_database_route = warp::path!("create-db")
        .or(warp::path!("criar-db"))
        .unify()
        .and(warp::post())
        .and(database_body(max_body_bytes))
        .and(with_metastore(metastore.clone()))
        .then(create_database)
        .map(into_response);

    // GET /list-dbs
    let list_databases_route = warp::path!("list-dbs")
        .and(warp::get())
        .and(with_metastore(metastore.clone()))
        .then(list_databases)
        .map(into_response);

    // POST /create-table
    let create_table_route = warp::path!("create-table")
        .and(warp::post())
        .and(json_body::<CreateTableBody>(max_body_bytes))
        .and(with_metastore(metastore.clone()))
        .then(create_table)
        .map(into_response);

    // POST /insert-record
    let insert_record_route = warp::path!("insert-record")
        .and(warp::post())
        .and(json_body::<InsertRecordBody>(max_body_bytes))
        .and(with_metastore(metastore.clone()))
        .then(insert_record)
        .map(into_response);

    // GET /list-tables?db=...
    let list_tables_route = warp::path!("list-tables")
        .and(warp::get())
        .and(warp::query::<TableQuery>())
        .and(with_metastore(metastore.clone()))
        .then(list_tables)
        .map(into_response);

    // GET /table-structure?db=...&table=...
    let table_structure_route = warp::path!("table-structure")
        .and(warp::get())
        .and(warp::query::<TableQuery>())
        .and(with_metastore(metastore.clone()))
        .then(table_structure)
        .map(into_response);

    // GET /list-records?db=...&table=...
    let list_records_route = warp::path!("list-records")
        .and(warp::get())
        .and(warp::query::<TableQuery>())
        .and(with_metastore(metastore))
        .then(list_records)
        .map(into_response);

    let routes = create_database_route
        .or(list_databases_route)
        .unify()
        .or(create_table_route)
        .unify()
        .or(insert_record_route)
        .unify()
        .or(list_tables_route)
        .unify()
        .or(table_structure_route)
        .unify()
        .or(list_records_route)
        .unify()
        .with(cors)
        .recover(handle_rejection);

    #[cfg(feature = "metrics")]
    let routes = routes.with(warp::log::custom(|info| {
        metrics::counter!(
            crate::config::context::HTTP_REQUESTS,
            "path" => info.path().to_string(),
            "method" => info.method().to_string(),
            "status" => info.status().as_u16().to_string(),
        )
        .increment(1)
    }));

    routes.with(warp::trace::request())
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address: {0}")]
    Address(#[from] AddrParseError),

    #[error("Failed to start the HTTP server: {0}")]
    Bind(#[from] warp::Error),
}

pub async fn run_server(
    metastore: Arc<Metastore>,
    config: HttpFrontend,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let socket_addr: SocketAddr =
        format!("{}:{}", config.bind_host, config.bind_port).parse()?;
    let filters = filters(metastore, config);

    let (addr, server) =
        warp::serve(filters).try_bind_with_graceful_shutdown(socket_addr, shutdown)?;
    info!("HTTP frontend listening on http://{addr}");
    server.await;

    Ok(())
}
