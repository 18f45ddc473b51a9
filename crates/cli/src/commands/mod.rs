pub mod migrate;
pub mod seed;
pub mod user;

use bookshop_api::config::get_database_url;
use bookshop_api::db::{self, Store};

/// Connect to the database named by `BOOKSHOP_DATABASE_URL`.
async fn connect() -> Result<sqlx::PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("BOOKSHOP_DATABASE_URL")?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}

async fn connect_store() -> Result<Store, Box<dyn std::error::Error>> {
    Ok(Store::postgres(connect().await?))
}
