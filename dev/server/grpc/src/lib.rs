use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

pub mod env;
pub mod service;

pub async fn serve(env: env::Env) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();
    let addr = env.bind().parse()?;
    let server = service::app(env).await;

    tracing::info!("start app on {}", addr);
    server.serve(addr).await?;
    tracing::info!("stop app");

    Ok(())
}

pub async fn serve_with_listener(listener: TcpListener, env: env::Env) -> Result<(), tonic::transport::Error> {
    service::app(env).await.serve_with_incoming(TcpListenerStream::new(listener)).await
}

/// Run the server in background on an ephemeral local port and return its address.
pub async fn spawn_local(env: env::Env) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = serve_with_listener(listener, env).await {
            tracing::error!("{}", e);
        }
    });
    Ok(addr)
}
