mod routes;

use voting_app::AppContext;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let app_context = match AppContext::from_env() {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };
    let addr = app_context.config.listen_addr.clone();

    let app = routes::router(app_context.clone());

    tracing::info!("Listening on http://{}", addr);
    tracing::info!(
        "Search debounce {:?}, vote timeout {:?}, cache ttl {:?}",
        app_context.config.search_debounce,
        app_context.config.vote_timeout,
        app_context.config.search_cache_ttl
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
