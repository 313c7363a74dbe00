use anyhow::Context;
use time::OffsetDateTime;

use crate::Database;

const LEDGER_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS _shelf_migrations (
    module     TEXT NOT NULL,
    id         TEXT NOT NULL,
    applied_at TEXT NOT NULL,
    PRIMARY KEY (module, id)
)
"#;

/// Migration definition contributed by a module.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

impl Database {
    /// Apply every migration not yet recorded in the ledger, in the given order.
    ///
    /// Each migration runs in its own transaction together with its ledger row,
    /// so a failed script leaves neither schema changes nor a ledger entry.
    /// Returns the number of migrations applied.
    pub async fn run_migrations(&self, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
        sqlx::query(LEDGER_DDL)
            .execute(self.pool())
            .await
            .context("failed to create migration ledger")?;

        let mut applied = 0;

        for (module, migration) in migrations {
            let already_applied: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM _shelf_migrations WHERE module = ? AND id = ?",
            )
            .bind(module)
            .bind(migration.id)
            .fetch_one(self.pool())
            .await
            .context("failed to read migration ledger")?;

            if already_applied > 0 {
                tracing::debug!(
                    target: "shelf-db",
                    module = %module,
                    migration = migration.id,
                    "migration already applied"
                );
                continue;
            }

            let mut tx = self.pool().begin().await?;

            sqlx::raw_sql(migration.up)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("migration '{}/{}' failed", module, migration.id))?;

            sqlx::query("INSERT INTO _shelf_migrations (module, id, applied_at) VALUES (?, ?, ?)")
                .bind(module)
                .bind(migration.id)
                .bind(OffsetDateTime::now_utc())
                .execute(&mut *tx)
                .await
                .context("failed to record migration")?;

            tx.commit().await?;

            tracing::info!(
                target: "shelf-db",
                module = %module,
                migration = migration.id,
                "migration applied"
            );
            applied += 1;
        }

        Ok(applied)
    }
}
