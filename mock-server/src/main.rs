use tokio::net::TcpListener;

/// Serves the mock user API on `MOCK_API_ADDR` (default 127.0.0.1:8089).
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let addr = std::env::var("MOCK_API_ADDR").unwrap_or_else(|_| "127.0.0.1:8089".to_string());
    let listener = TcpListener::bind(&addr).await?;
    println!("mock API on http://{}", listener.local_addr()?);
    mock_server::run(listener).await
}
