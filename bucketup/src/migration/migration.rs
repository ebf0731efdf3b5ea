use crate::errors::BucketupResult;
use crate::transaction::LimitedTx;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Signature of a migration step.
pub type MigrationFn = dyn Fn(&LimitedTx<'_>) -> BucketupResult<()> + Send + Sync;

/// One schema-evolution step.
///
/// A migration is identified only by its position in the list passed to
/// [`up`](crate::migration::up): the migration at index `i` takes the store
/// from version `i` to `i + 1`. The optional description is used in log
/// output and never persisted.
///
/// # Examples
///
/// ```rust
/// use bucketup::migration::Migration;
/// use bucketup::transaction::TxOperations;
///
/// let create_users = Migration::named("create users bucket", |tx| {
///     tx.create_bucket(b"users")?;
///     Ok(())
/// });
/// assert_eq!(create_users.description(), Some("create users bucket"));
/// ```
#[derive(Clone)]
pub struct Migration {
    description: Option<String>,
    apply: Arc<MigrationFn>,
}

impl Migration {
    pub fn new<F>(apply: F) -> Self
    where
        F: Fn(&LimitedTx<'_>) -> BucketupResult<()> + Send + Sync + 'static,
    {
        Migration {
            description: None,
            apply: Arc::new(apply),
        }
    }

    /// Creates a migration with a description for log output.
    pub fn named<F>(description: &str, apply: F) -> Self
    where
        F: Fn(&LimitedTx<'_>) -> BucketupResult<()> + Send + Sync + 'static,
    {
        Migration {
            description: Some(description.to_string()),
            apply: Arc::new(apply),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub(crate) fn apply(&self, tx: &LimitedTx<'_>) -> BucketupResult<()> {
        (self.apply)(tx)
    }
}

impl<F> From<F> for Migration
where
    F: Fn(&LimitedTx<'_>) -> BucketupResult<()> + Send + Sync + 'static,
{
    fn from(apply: F) -> Self {
        Migration::new(apply)
    }
}

impl Debug for Migration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use crate::store::Store;
    use crate::transaction::TxOperations;

    #[test]
    fn test_named_migration_has_description() {
        let migration = Migration::named("noop", |_| Ok(()));
        assert_eq!(migration.description(), Some("noop"));
        assert!(format!("{:?}", migration).contains("noop"));

        let anonymous = Migration::new(|_| Ok(()));
        assert_eq!(anonymous.description(), None);
    }

    #[test]
    fn test_apply_calls_function_with_transaction() {
        fn create_test(tx: &LimitedTx<'_>) -> BucketupResult<()> {
            tx.create_bucket(b"test")?;
            Ok(())
        }

        let store = Store::open(InMemoryStore::new()).unwrap();
        let migration = Migration::from(create_test);

        let tx = store.begin_write().unwrap();
        migration.apply(&LimitedTx::new(&tx)).unwrap();
        assert!(tx.bucket(b"test").unwrap().is_some());
    }

    #[test]
    fn test_clones_share_function() {
        let migration = Migration::named("fails", |_| Err("boom".into()));
        let clone = migration.clone();

        let store = Store::open(InMemoryStore::new()).unwrap();
        let tx = store.begin_write().unwrap();
        let err = clone.apply(&LimitedTx::new(&tx)).unwrap_err();
        assert_eq!(err.message(), "boom");
        assert_eq!(clone.description(), Some("fails"));
    }
}
