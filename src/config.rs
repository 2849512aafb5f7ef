use std::env;

/// Stripe credentials, loaded once at startup and injected into the
/// `StripeClient` at construction time. Never read from ambient state.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    /// Webhook signing secret. When unset, webhook signature verification
    /// fails closed (every delivery is rejected).
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Public frontend origin, used for checkout success/cancel redirects
    /// and password reset links.
    pub frontend_url: String,
    pub jwt_secret: String,
    pub stripe: StripeConfig,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("VITRINE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let stripe = StripeConfig {
            secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
        };

        if stripe.webhook_secret.is_none() {
            tracing::warn!(
                "STRIPE_WEBHOOK_SECRET is not set - all webhook deliveries will be rejected"
            );
        }

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "vitrine.db".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "https://vitrine.example.com".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                tracing::warn!("JWT_SECRET not set - using an insecure development default");
                "vitrine-dev-secret".to_string()
            }),
            stripe,
            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|s| !s.is_empty()),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "no-reply@vitrine.example.com".to_string()),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
