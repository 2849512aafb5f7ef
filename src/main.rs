use std::sync::Arc;

use axum::Router;
use clap::Parser;
use jwt_simple::algorithms::HS256Key;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitrine::config::Config;
use vitrine::db::{create_pool, init_db, queries, AppState};
use vitrine::email::EmailService;
use vitrine::handlers;
use vitrine::models::{default_plans, CreateCollection, CreateProduct};
use vitrine::payments::StripeClient;

#[derive(Parser, Debug)]
#[command(name = "vitrine")]
#[command(about = "Multi-tenant storefront backend with shareable catalogs")]
struct Cli {
    /// Seed the database with a demo store (dev mode only)
    #[arg(long)]
    seed: bool,
}

/// Seeds a demo store with a catalog and a couple of products.
/// Only runs in dev mode and when no users exist yet.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    if queries::get_user_by_email(&conn, "demo@vitrine.local")
        .expect("Failed to check for demo user")
        .is_some()
    {
        tracing::info!("Demo store already exists, skipping seed");
        return;
    }

    let free_plan = queries::get_free_plan(&conn).expect("Plan catalog not seeded");
    let password_hash =
        vitrine::crypto::hash_password("demo-password").expect("Failed to hash demo password");

    let user = queries::create_user(
        &conn,
        &queries::NewUser {
            store_name: "Demo Store",
            email: "demo@vitrine.local",
            password_hash: &password_hash,
            phone: "11987654321",
            plan_id: &free_plan.id,
        },
    )
    .expect("Failed to create demo user");

    let collection = queries::create_collection(
        &conn,
        &user.id,
        &CreateCollection {
            name: "Summer Collection".to_string(),
            description: Some("Our latest arrivals".to_string()),
        },
    )
    .expect("Failed to create demo collection");

    for (name, price) in [("Linen Shirt", 12900_i64), ("Canvas Tote", 5900)] {
        queries::create_product(
            &conn,
            &user.id,
            &CreateProduct {
                name: name.to_string(),
                description: None,
                price_cents: price,
                collection_id: Some(collection.id.clone()),
                image_url: None,
            },
        )
        .expect("Failed to create demo product");
    }

    tracing::info!("============================================");
    tracing::info!("DEMO STORE SEEDED");
    tracing::info!("Email: demo@vitrine.local");
    tracing::info!("Password: demo-password");
    tracing::info!("Catalog token: {}", collection.share_token);
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitrine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");

    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
        // The plan catalog is reconciled on every start so config changes
        // (prices, quotas) take effect without a migration.
        queries::seed_plans(&conn, &default_plans()).expect("Failed to seed plan catalog");
    }

    let state = AppState {
        db: db_pool,
        stripe: StripeClient::new(&config.stripe),
        jwt_key: HS256Key::from_bytes(config.jwt_secret.as_bytes()),
        email: Arc::new(EmailService::new(
            config.resend_api_key.clone(),
            config.email_from.clone(),
        )),
        frontend_url: config.frontend_url.clone(),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set VITRINE_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = Router::new()
        .merge(handlers::public_router())
        .merge(handlers::authed_router())
        .merge(handlers::webhooks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Vitrine server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
