use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::{debug, info, warn};

use super::RelationStore;
use crate::config::DbConfig;
use crate::error::{EtlError, Result};

/// A single Postgres connection. Statements run in autocommit mode, one at a
/// time; call [`PgStore::close`] when done.
pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    pub async fn connect(cfg: &DbConfig) -> Result<Self> {
        let opts = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.user)
            .password(&cfg.password)
            .database(&cfg.database);
        let conn = opts.connect().await.map_err(EtlError::Connection)?;
        info!(host = %cfg.host, port = cfg.port, database = %cfg.database, "database connected");
        Ok(Self { conn })
    }

    /// Connect with a `postgres://` URL.
    pub async fn connect_url(url: &str) -> Result<Self> {
        let conn = PgConnection::connect(url)
            .await
            .map_err(EtlError::Connection)?;
        Ok(Self { conn })
    }

    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.conn
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await.map_err(EtlError::Connection)
    }
}

#[async_trait]
impl RelationStore for PgStore {
    async fn execute(&mut self, statement: &str) -> std::result::Result<(), sqlx::Error> {
        debug!(statement, "execute");
        sqlx::query(statement).execute(&mut self.conn).await?;
        Ok(())
    }

    async fn copy_in(&mut self, statement: &str, data: &[u8]) -> std::result::Result<u64, sqlx::Error> {
        debug!(statement, bytes = data.len(), "copy in");
        let mut copy = self.conn.copy_in_raw(statement).await?;
        let sent = copy.send(data).await.map(|_| ());
        if let Err(e) = sent {
            if let Err(abort_err) = copy.abort(e.to_string()).await {
                warn!(error = %abort_err, "aborting COPY failed");
            }
            return Err(e);
        }
        copy.finish().await
    }
}
