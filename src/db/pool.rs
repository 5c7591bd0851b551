use super::{Db, DbResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::str::FromStr;
use tokio_postgres::NoTls;

impl Db {
    /// Builds the connection pool. Connections are opened on first use, so a
    /// bad host only shows up at the first query (migrations, at startup).
    pub fn with_pool_size(url: &str, max_size: usize) -> DbResult<Self> {
        let pg = tokio_postgres::Config::from_str(url)?;
        let manager = Manager::from_config(
            pg,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(manager)
            .max_size(max_size.max(1))
            .runtime(Runtime::Tokio1)
            .build()?;
        tracing::debug!(max_size, "database pool ready");

        Ok(Self { pool })
    }
}
