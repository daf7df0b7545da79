//! Common test utilities

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Setup test database - ensure schema exists and start from a clean slate
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    // Idempotent schema creation, mirroring migrations/0001_wallets.sql.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wallets (
            user_id     UUID        NOT NULL,
            currency    TEXT        NOT NULL,
            balance     NUMERIC     NOT NULL DEFAULT 0 CHECK (balance >= 0),
            PRIMARY KEY (user_id, currency)
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("Failed to create wallets table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id               UUID        PRIMARY KEY,
            user_id          UUID        NOT NULL,
            kind             TEXT        NOT NULL CHECK (kind IN ('deposit', 'withdraw', 'exchange')),
            currency         TEXT        NOT NULL,
            amount           NUMERIC     NOT NULL CHECK (amount > 0),
            to_currency      TEXT,
            converted_amount NUMERIC     CHECK (converted_amount > 0),
            created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CHECK ((to_currency IS NULL) = (converted_amount IS NULL))
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("Failed to create transactions table");

    sqlx::query("TRUNCATE TABLE wallets, transactions")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    pool
}
