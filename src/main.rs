use anyhow::Context;
use order_api::{api, config::AppConfig, db, telemetry};
use tokio::net::TcpListener;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let cfg = AppConfig::from_env()?;
    let db = db::DbPool::open(&cfg.db_path, cfg.pool_size)
        .with_context(|| format!("opening {}", cfg.db_path.display()))?;
    db.init_schema()
        .await
        .with_context(|| format!("creating schema in {}", cfg.db_path.display()))?;

    let app = api::build_app(api::AppState { db }, cfg.request_timeout);

    let listener = TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, db = %cfg.db_path.display(), "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
