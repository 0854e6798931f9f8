use std::net::SocketAddr;

use anyhow::Context;
use axum::http::HeaderValue;

use fablab_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fablab_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = fablab_api::app::build_services(&config).await?;
    let cors_origin = HeaderValue::from_str(&config.cors_origin).with_context(|| {
        format!("CORS_ORIGIN '{}' is not a valid header value", config.cors_origin)
    })?;
    let app = fablab_api::app::build_app(config.jwt_secret.clone(), cors_origin, services);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        env = ?config.env,
        cors_origin = %config.cors_origin,
        "listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;
    Ok(())
}
