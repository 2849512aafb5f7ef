mod from_row;
pub mod queries;
mod schema;

pub use schema::init_db;

use std::sync::Arc;

use jwt_simple::algorithms::HS256Key;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::email::EmailService;
use crate::payments::StripeClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the database pool and configured collaborators.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Stripe client, constructed once at startup from config. Carries the
    /// API secret and webhook signing secret - never read from env at call time.
    pub stripe: StripeClient,
    pub jwt_key: HS256Key,
    pub email: Arc<EmailService>,
    /// Public frontend origin for redirects and links.
    pub frontend_url: String,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
