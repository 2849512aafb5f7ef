use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Plan tiers (seed-managed; name is the stable identity key)
        CREATE TABLE IF NOT EXISTS plans (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            description TEXT NOT NULL,
            price_cents INTEGER NOT NULL DEFAULT 0,
            stripe_price_id TEXT,
            max_products INTEGER NOT NULL DEFAULT 10,
            max_collections INTEGER NOT NULL DEFAULT 2,
            features TEXT NOT NULL DEFAULT '[]',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Merchant accounts. subscription_status is free text because
        -- customer.subscription.updated stores provider vocabulary verbatim.
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            store_name TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            phone TEXT NOT NULL,
            plan_id TEXT NOT NULL REFERENCES plans(id),
            subscription_status TEXT NOT NULL DEFAULT 'none',
            plan_expires_at INTEGER,
            stripe_customer_id TEXT,
            stripe_subscription_id TEXT,
            reset_token TEXT,
            reset_token_expires_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        CREATE INDEX IF NOT EXISTS idx_users_stripe_customer ON users(stripe_customer_id);
        CREATE INDEX IF NOT EXISTS idx_users_reset_token ON users(reset_token);

        -- Shareable product collections ("catalogs")
        CREATE TABLE IF NOT EXISTS collections (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT,
            share_token TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_collections_owner ON collections(owner_id);

        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            collection_id TEXT REFERENCES collections(id) ON DELETE SET NULL,
            name TEXT NOT NULL,
            description TEXT,
            price_cents INTEGER NOT NULL,
            image_url TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_products_owner ON products(owner_id);
        CREATE INDEX IF NOT EXISTS idx_products_collection ON products(collection_id);

        -- Customer orders placed from public catalogs
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            order_token TEXT NOT NULL UNIQUE,
            collection_id TEXT REFERENCES collections(id) ON DELETE SET NULL,
            customer_name TEXT,
            customer_phone TEXT,
            total_cents INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS order_items (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            product_id TEXT REFERENCES products(id) ON DELETE SET NULL,
            quantity INTEGER NOT NULL,
            size TEXT,
            price_cents INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id);
        "#,
    )
}
