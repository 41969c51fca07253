use crate::config::AppConfig;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
};
use std::time::Duration;
use tracing::{debug, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

/// Establishes a connection pool to the database.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, DbErr> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool with custom configuration.
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, DbErr> {
    debug!("configuring database connection: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    info!(
        max_connections = config.max_connections,
        "connecting to database"
    );

    Database::connect(opt).await
}

/// Establishes a connection using the application configuration.
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, DbErr> {
    let mut db_cfg = DbConfig {
        url: cfg.database_url.clone(),
        ..Default::default()
    };

    // In-memory SQLite keeps one database per connection; a larger pool would
    // hand each request a different empty database.
    if cfg.database_url.starts_with("sqlite::memory:") {
        db_cfg.max_connections = 1;
        db_cfg.min_connections = 1;
    }

    establish_connection_with_config(&db_cfg).await
}

/// Creates every table for the crate's entities. Used at startup when
/// `auto_create_schema` is enabled and by the test harness.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let statements = vec![
        schema.create_table_from_entity(crate::entities::user::Entity),
        schema.create_table_from_entity(crate::entities::supplier::Entity),
        schema.create_table_from_entity(crate::entities::location::Entity),
        schema.create_table_from_entity(crate::entities::inventory_item::Entity),
        schema.create_table_from_entity(crate::entities::stock_movement::Entity),
        schema.create_table_from_entity(crate::entities::delivery_company::Entity),
        schema.create_table_from_entity(crate::entities::delivery::Entity),
        schema.create_table_from_entity(crate::entities::supplier_invoice::Entity),
    ];

    for mut stmt in statements {
        db.execute(backend.build(stmt.if_not_exists())).await?;
    }

    info!("database schema ensured");
    Ok(())
}
