use mock_server::Db;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");

    let mut db = Db::new();
    if let (Ok(key), Ok(secret)) = (std::env::var("FIELDBOOK_KEY"), std::env::var("FIELDBOOK_SECRET")) {
        info!("writes require basic auth");
        db = db.with_credentials(&key, &secret);
    }

    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    mock_server::run(listener, db).await?;
    Ok(())
}
