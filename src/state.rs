use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::auth::{
    password::CredentialStore,
    repo::{MemoryUserStore, PgUserStore, UserStore},
};
use crate::config::AppConfig;

/// Applies `migrations/`. The unique index on `users.email` lives there,
/// so a failure here must stop startup.
pub async fn run_migrations(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub credentials: Arc<CredentialStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let users = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(config.database_max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                run_migrations(&db).await?;
                info!("using postgres user store");
                Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        let credentials = tokio::task::spawn_blocking({
            let hashing = config.hashing;
            move || CredentialStore::new(hashing)
        })
        .await
        .context("credential store setup task")?
        .context("build credential store")?;
        info!(
            m_cost = config.hashing.memory_kib,
            t_cost = config.hashing.iterations,
            p_cost = config.hashing.parallelism,
            "password hashing configured"
        );

        Ok(Self::from_parts(users, Arc::new(credentials), config))
    }

    pub fn from_parts(
        users: Arc<dyn UserStore>,
        credentials: Arc<CredentialStore>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            users,
            credentials,
            config,
        }
    }

    /// In-memory store and cheap hashing parameters, for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        let hashing = crate::auth::password::test_config();
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: None,
            database_max_connections: 1,
            hashing,
        });
        let credentials = Arc::new(CredentialStore::new(hashing).expect("test credential store"));
        Self::from_parts(Arc::new(MemoryUserStore::new()), credentials, config)
    }
}
