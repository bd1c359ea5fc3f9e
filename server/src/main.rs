mod routes;
mod uploads;

use file_share::{Config, ShareRegistry};
use tracing::{error, info};

use routes::AppState;
use uploads::UploadStore;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(None)?;
    file_share::logging::init(&config.log_filter);

    let registry = ShareRegistry::open(&config.data_dir, config.read_policy).await?;
    let uploads = UploadStore::new(&config.uploads_dir).await?;

    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port));

    info!(
        address = %config.server.address,
        port = config.server.port,
        data_dir = %config.data_dir.display(),
        "share server starting"
    );

    if let Err(e) = routes::build(AppState { registry, uploads }, figment).launch().await {
        error!(error = %e, "share server stopped");
        anyhow::bail!("share server failed: {}", e);
    }

    Ok(())
}
