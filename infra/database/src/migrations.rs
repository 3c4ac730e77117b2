use crate::error::{DatabaseError, DatabaseErrorExt};
use fxhash::FxHashMap;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::types::SurrealValue;

/// One schema migration, keyed by slice and version.
#[derive(Debug)]
pub(crate) struct Migration {
    pub slice: &'static str,
    pub version: &'static str,
    pub script: &'static str,
}

impl Migration {
    fn key(&self) -> String {
        format!("{}:{}", self.slice, self.version)
    }

    fn checksum(&self) -> String {
        format!("{:016x}", fxhash::hash64(self.script))
    }

    fn to_applied(&self) -> AppliedMigration {
        AppliedMigration {
            slice: self.slice.to_owned(),
            version: self.version.to_owned(),
            checksum: self.checksum(),
        }
    }
}

/// The built-in migration set. Scripts are idempotent (`IF NOT EXISTS`), but the
/// ledger still records what ran so checksum drift is caught early.
const MIGRATIONS: &[Migration] = &[
    Migration {
        slice: "engine",
        version: "0001",
        script: "
            DEFINE TABLE IF NOT EXISTS migration SCHEMAFULL;
            DEFINE FIELD IF NOT EXISTS slice ON migration TYPE string;
            DEFINE FIELD IF NOT EXISTS version ON migration TYPE string;
            DEFINE FIELD IF NOT EXISTS checksum ON migration TYPE string;
            DEFINE FIELD IF NOT EXISTS applied_at ON migration TYPE datetime DEFAULT time::now();
        ",
    },
    Migration {
        slice: "places",
        version: "0001",
        script: "
            DEFINE TABLE IF NOT EXISTS place SCHEMALESS;
            DEFINE FIELD IF NOT EXISTS name ON place TYPE string;
            DEFINE FIELD IF NOT EXISTS vicinity ON place TYPE string DEFAULT '';
            DEFINE FIELD IF NOT EXISTS external_id ON place TYPE option<string>;
            DEFINE FIELD IF NOT EXISTS coordinates ON place TYPE geometry<point>;
            DEFINE FIELD IF NOT EXISTS tags ON place TYPE array<string> DEFAULT [];
            DEFINE FIELD IF NOT EXISTS updated_at ON place TYPE datetime VALUE time::now();
            DEFINE INDEX IF NOT EXISTS place_external_idx ON place FIELDS external_id;
        ",
    },
    Migration {
        slice: "reference",
        version: "0001",
        script: "
            DEFINE TABLE IF NOT EXISTS category SCHEMAFULL;
            DEFINE FIELD IF NOT EXISTS name ON category TYPE string;
            DEFINE FIELD IF NOT EXISTS updated_at ON category TYPE datetime VALUE time::now();
            DEFINE TABLE IF NOT EXISTS condition SCHEMAFULL;
            DEFINE FIELD IF NOT EXISTS name ON condition TYPE string;
            DEFINE FIELD IF NOT EXISTS updated_at ON condition TYPE datetime VALUE time::now();
        ",
    },
];

#[derive(Debug, Default)]
pub(crate) struct MigrationReport {
    pub applied: Vec<AppliedMigration>,
    pub skipped: Vec<AppliedMigration>,
}

#[derive(Debug, SurrealValue)]
pub(crate) struct AppliedMigration {
    pub slice: String,
    pub version: String,
    pub checksum: String,
}

#[derive(Debug)]
pub(crate) struct MigrationRunner {
    db: Surreal<Any>,
}

impl MigrationRunner {
    #[must_use]
    pub(crate) const fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    pub(crate) async fn run(&self) -> Result<MigrationReport, DatabaseError> {
        let mut report = MigrationReport::default();
        let applied = self.applied_map().await?;

        for migration in MIGRATIONS {
            if let Some(existing) = applied.get(&migration.key()) {
                if existing.checksum != migration.checksum() {
                    return Err(DatabaseError::Migration {
                        message: format!(
                            "Checksum mismatch for {} (expected {}, got {})",
                            migration.key(),
                            existing.checksum,
                            migration.checksum()
                        )
                        .into(),
                        context: Some("Migration already applied with different checksum".into()),
                    });
                }
                report.skipped.push(migration.to_applied());
                continue;
            }

            self.apply(migration).await?;
            report.applied.push(migration.to_applied());
        }

        Ok(report)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), DatabaseError> {
        let query = format!(
            "BEGIN TRANSACTION;
            {}
            CREATE migration CONTENT {{ slice: $slice, version: $version, checksum: $checksum }};
            COMMIT TRANSACTION;",
            migration.script,
        );

        self.db
            .query(&query)
            .bind(("slice", migration.slice))
            .bind(("version", migration.version))
            .bind(("checksum", migration.checksum()))
            .await
            .context(format!("SQL execution failed at {}", migration.key()))?
            .check()
            .map_err(surrealdb::Error::from)
            .context(format!("Migration rejected at {}", migration.key()))?;

        Ok(())
    }

    async fn applied_map(&self) -> Result<FxHashMap<String, AppliedMigration>, DatabaseError> {
        // On a fresh database the ledger table does not exist yet; the select
        // simply yields no rows.
        let entries = self
            .db
            .query("SELECT slice, version, checksum FROM migration")
            .await
            .context("Loading applied migrations")?
            .take::<Vec<AppliedMigration>>(0)
            .context("Parsing migrations map")?;

        Ok(entries
            .into_iter()
            .map(|entry| (format!("{}:{}", entry.slice, entry.version), entry))
            .collect())
    }
}
