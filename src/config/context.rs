use std::sync::Arc;

use tracing::info;

use crate::{
    catalog::Metastore,
    repository::{
        interface::{Repository, Result},
        local::LocalRepository,
        memory::MemoryRepository,
    },
};

use super::schema;

pub const HTTP_REQUESTS: &str = "http_requests";

async fn build_repository(config: &schema::TabledocConfig) -> Result<Arc<dyn Repository>> {
    Ok(match &config.storage {
        schema::Storage::Local(schema::Local { data_dir }) => {
            info!("Storing databases under {data_dir}");
            Arc::new(LocalRepository::try_new(data_dir).await?)
        }
        schema::Storage::InMemory(_) => {
            info!("Storing databases in memory; they will be lost on shutdown");
            Arc::new(MemoryRepository::new())
        }
    })
}

pub async fn build_metastore(config: &schema::TabledocConfig) -> Result<Metastore> {
    let repository = build_repository(config).await?;
    Ok(Metastore::new_from_repository(repository))
}

#[cfg(feature = "metrics")]
pub fn setup_metrics(
    metrics: &schema::Metrics,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    use metrics::describe_counter;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr: SocketAddr = format!("{}:{}", metrics.host, metrics.port).parse()?;
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(HTTP_REQUESTS, "Counter tracking HTTP request statistics");
    Ok(())
}
