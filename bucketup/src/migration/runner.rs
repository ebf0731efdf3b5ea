use crate::common::ERROR_PREFIX;
use crate::errors::{BucketupError, BucketupResult, ErrorKind};
use crate::migration::{current_version, Migration, VersionBucket};
use crate::store::Store;
use crate::transaction::LimitedTx;

/// Result of a successful [`up`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The store was already at the latest version; nothing was written.
    AlreadyCurrent { version: u64 },
    /// Migrations `from..to` were applied and the version was set to `to`.
    Migrated { from: u64, to: u64 },
}

impl MigrationOutcome {
    /// Version of the store after the run.
    pub fn version(&self) -> u64 {
        match self {
            MigrationOutcome::AlreadyCurrent { version } => *version,
            MigrationOutcome::Migrated { to, .. } => *to,
        }
    }

    /// Number of migrations applied by the run.
    pub fn applied(&self) -> u64 {
        match self {
            MigrationOutcome::AlreadyCurrent { .. } => 0,
            MigrationOutcome::Migrated { from, to } => to - from,
        }
    }
}

/// Brings `store` up to date with `migrations`.
///
/// The version of the library is the number of migrations. Every migration
/// from the stored version onwards runs, in order, inside one write
/// transaction together with the version update, so a run either applies all
/// pending migrations or none of them.
///
/// # Errors
/// Every error message starts with `bucketup: ` and carries the underlying
/// error as its cause.
/// * `VersionMismatch` if the stored version is ahead of the library version
/// * `MigrationError` if a migration fails
/// * otherwise the kind of the underlying store or transaction error
///
/// # Examples
///
/// ```rust
/// use bucketup::migration::{up, Migration, MigrationOutcome};
/// use bucketup::store::memory::InMemoryStore;
/// use bucketup::store::Store;
/// use bucketup::transaction::TxOperations;
///
/// let store = Store::open(InMemoryStore::new()).unwrap();
/// let migrations = vec![
///     Migration::new(|tx| tx.create_bucket(b"test").map(|_| ())),
///     Migration::new(|tx| match tx.bucket(b"test")? {
///         Some(bucket) => bucket.put(b"value", b"1"),
///         None => Ok(()),
///     }),
/// ];
///
/// assert_eq!(up(&store, &migrations).unwrap(), MigrationOutcome::Migrated { from: 0, to: 2 });
/// assert_eq!(up(&store, &migrations).unwrap(), MigrationOutcome::AlreadyCurrent { version: 2 });
/// ```
pub fn up(store: &Store, migrations: &[Migration]) -> BucketupResult<MigrationOutcome> {
    let lib_version = migrations.len() as u64;
    log::info!("Checking store against {} migrations", lib_version);

    let tx = store
        .begin_write()
        .map_err(|err| runner_error("failed to create transaction", err))?;

    // every early return below drops `tx`, which rolls it back
    let versions = VersionBucket::ensure(&tx)
        .map_err(|err| runner_error("failed to get db version", err))?;
    let db_version = versions
        .read()
        .map_err(|err| runner_error("failed to get db version", err))?;

    if db_version > lib_version {
        let err = BucketupError::new(
            &format!(
                "{}db version {} is greater than library version {}",
                ERROR_PREFIX, db_version, lib_version
            ),
            ErrorKind::VersionMismatch,
        );
        log::error!("{}", err);
        return Err(err);
    }

    if db_version == lib_version {
        tx.rollback()?;
        log::info!("Store is already at version {}", db_version);
        return Ok(MigrationOutcome::AlreadyCurrent {
            version: db_version,
        });
    }

    let limited = LimitedTx::new(&tx);
    for (index, migration) in migrations.iter().enumerate().skip(db_version as usize) {
        let from = index as u64;
        match migration.description() {
            Some(description) => {
                log::debug!("Migrating from version {} to {}: {}", from, from + 1, description)
            }
            None => log::debug!("Migrating from version {} to {}", from, from + 1),
        }

        if let Err(cause) = migration.apply(&limited) {
            let err = BucketupError::new_with_cause(
                &format!(
                    "{}failed to migrate from version {} to {}",
                    ERROR_PREFIX,
                    from,
                    from + 1
                ),
                ErrorKind::MigrationError,
                cause,
            );
            log::error!("{}: {}", err, err.root_cause());
            return Err(err);
        }
    }

    versions.write(lib_version).map_err(|err| {
        runner_error(
            &format!("failed to update migration version to {}", lib_version),
            err,
        )
    })?;

    tx.commit()
        .map_err(|err| runner_error("failed to commit transaction", err))?;

    log::info!(
        "Migrated store from version {} to {}",
        db_version,
        lib_version
    );
    Ok(MigrationOutcome::Migrated {
        from: db_version,
        to: lib_version,
    })
}

fn runner_error(message: &str, cause: BucketupError) -> BucketupError {
    let err = BucketupError::new_with_cause(
        &format!("{}{}", ERROR_PREFIX, message),
        cause.kind().clone(),
        cause,
    );
    log::error!("{}: {}", err, err.root_cause());
    err
}

/// Collects migrations for a store and runs them.
///
/// ```rust
/// use bucketup::migration::Migrator;
/// use bucketup::store::memory::InMemoryStore;
/// use bucketup::store::Store;
/// use bucketup::transaction::TxOperations;
///
/// let store = Store::open(InMemoryStore::new()).unwrap();
/// let migrator = Migrator::new(&store)
///     .add_named("create users", |tx| tx.create_bucket(b"users").map(|_| ()))
///     .add_named("create groups", |tx| tx.create_bucket(b"groups").map(|_| ()));
///
/// assert_eq!(migrator.pending().unwrap(), 2);
/// migrator.up().unwrap();
/// assert_eq!(migrator.pending().unwrap(), 0);
/// ```
pub struct Migrator {
    store: Store,
    migrations: Vec<Migration>,
}

impl Migrator {
    pub fn new(store: &Store) -> Self {
        Migrator {
            store: store.clone(),
            migrations: Vec::new(),
        }
    }

    pub fn add<M: Into<Migration>>(mut self, migration: M) -> Self {
        self.migrations.push(migration.into());
        self
    }

    pub fn add_named<F>(self, description: &str, apply: F) -> Self
    where
        F: Fn(&LimitedTx<'_>) -> BucketupResult<()> + Send + Sync + 'static,
    {
        self.add(Migration::named(description, apply))
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Version the store will be at after a successful [`Migrator::up`].
    pub fn target_version(&self) -> u64 {
        self.migrations.len() as u64
    }

    /// Number of migrations the next run would apply. Uses a read
    /// transaction and never writes.
    pub fn pending(&self) -> BucketupResult<u64> {
        let stored = current_version(&self.store)?;
        let target = self.target_version();
        if stored > target {
            return Err(BucketupError::new(
                &format!(
                    "{}db version {} is greater than library version {}",
                    ERROR_PREFIX, stored, target
                ),
                ErrorKind::VersionMismatch,
            ));
        }
        Ok(target - stored)
    }

    pub fn up(&self) -> BucketupResult<MigrationOutcome> {
        up(&self.store, &self.migrations)
    }
}
