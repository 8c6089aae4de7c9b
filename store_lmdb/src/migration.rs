//! Schema versioning for the LMDB environment.
//!
//! A fresh environment reads as version 0 and is stamped with
//! [`CURRENT_SCHEMA_VERSION`] on first open. Each entry in [`MIGRATIONS`]
//! upgrades stored data by exactly one version.

use gavel_store::MetaStore;

use crate::LmdbError;

/// The schema version this build reads and writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

struct Migration {
    /// Version the data is at after this step.
    to: u32,
    description: &'static str,
    apply: fn(&dyn MetaStore) -> Result<(), LmdbError>,
}

/// Ordered by `to`; `MIGRATIONS[i].to == i + 1`.
const MIGRATIONS: &[Migration] = &[Migration {
    to: 1,
    description: "proposals keyed by big-endian id, single treasury record",
    apply: |_| Ok(()),
}];

pub struct Migrator;

impl Migrator {
    /// Bring the stored schema up to [`CURRENT_SCHEMA_VERSION`].
    ///
    /// Refuses data written by a newer build.
    pub fn run(meta: &dyn MetaStore) -> Result<(), LmdbError> {
        let found = meta.schema_version()?;
        if found > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::UnsupportedSchema {
                found,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if found == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = found, "schema up to date");
            return Ok(());
        }

        for version in found..CURRENT_SCHEMA_VERSION {
            let step = MIGRATIONS
                .iter()
                .find(|m| m.to == version + 1)
                .ok_or(LmdbError::MissingMigration(version))?;
            tracing::info!(from = version, to = step.to, step = step.description, "migrating schema");
            (step.apply)(meta)?;
            meta.set_schema_version(step.to)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    #[test]
    fn migrations_cover_every_version() {
        for (i, m) in MIGRATIONS.iter().enumerate() {
            assert_eq!(m.to, i as u32 + 1);
        }
        assert_eq!(MIGRATIONS.len() as u32, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn fresh_environment_is_stamped_with_current_version() {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap();
        assert_eq!(
            env.meta_store().schema_version().unwrap(),
            CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap();
        let meta = env.meta_store();
        meta.set_schema_version(CURRENT_SCHEMA_VERSION + 1).unwrap();
        assert!(matches!(
            Migrator::run(&meta),
            Err(LmdbError::UnsupportedSchema { found: 2, supported: 1 })
        ));
    }
}
