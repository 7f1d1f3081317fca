use std::path::Path;

use crate::config::Config;
use crate::db::Database;
use crate::dedupe;
use crate::error::Result;
use crate::import::{self, LegacyImport};

pub struct Startup {
    pub db: Database,
    pub duplicates_removed: usize,
    pub legacy: Option<LegacyImport>,
    /// Why the legacy CSV could not be migrated. The file is left in place.
    pub legacy_error: Option<String>,
}

pub fn open_store(path: &Path, config: &Config) -> Result<Database> {
    let db = Database::open(path)?
        .with_busy_timeout(config.store.busy_timeout())?
        .with_duplicate_policy(config.store.duplicate_policy);
    db.init()?;
    log::info!(
        "opened card store at {} (duplicate policy: {})",
        path.display(),
        db.duplicate_policy().as_str()
    );
    Ok(db)
}

/// Opens (or creates) the store, runs the one-time legacy CSV migration if the
/// configured file is still around, and collapses duplicate cards. A failed
/// migration and the number of duplicates removed are diagnostics, not errors.
pub fn initialize(config: &Config) -> Result<Startup> {
    let db = open_store(&config.db_path(), config)?;

    let (legacy, legacy_error) = match &config.store.legacy_csv {
        Some(path) if path.exists() => match import::import_legacy_csv(&db, path) {
            Ok(legacy) => (Some(legacy), None),
            Err(e) => {
                log::error!("legacy migration of {} failed: {}", path.display(), e);
                (None, Some(e.to_string()))
            }
        },
        _ => (None, None),
    };

    let duplicates_removed = dedupe::resolve_duplicates(&db)?;
    if duplicates_removed > 0 {
        log::info!("startup removed {} duplicate cards", duplicates_removed);
    }

    Ok(Startup {
        db,
        duplicates_removed,
        legacy,
        legacy_error,
    })
}
