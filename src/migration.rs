use deadpool_postgres::Pool;
use anyhow::{Context, Result};

/// The relational schema for normalized flight data.
///
/// Reference tables carry a unique natural key each; `flights` is the
/// append-only fact table. Idempotent so startup can always run it.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS airlines (
    id SERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS aircrafts (
    id SERIAL PRIMARY KEY,
    model TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS airports (
    code TEXT PRIMARY KEY,
    city TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS passengers (
    id SERIAL PRIMARY KEY,
    passport_no TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS flights (
    id SERIAL PRIMARY KEY,
    flight_no TEXT NOT NULL,
    date TIMESTAMP NOT NULL,
    airline_id INTEGER NOT NULL REFERENCES airlines(id),
    aircraft_id INTEGER NOT NULL REFERENCES aircrafts(id),
    dep_airport_code TEXT NOT NULL REFERENCES airports(code),
    arr_airport_code TEXT NOT NULL REFERENCES airports(code),
    passenger_id INTEGER NOT NULL REFERENCES passengers(id)
);
"#;

/// Ensures the schema exists before the server starts accepting streams.
pub async fn run_migrations(pool: &Pool) -> Result<()> {
    let client = pool.get().await.context("Failed to get DB connection")?;
    client
        .batch_execute(SCHEMA_SQL)
        .await
        .context("Failed to apply schema")?;
    tracing::info!("✅ Database schema is up to date");
    Ok(())
}
