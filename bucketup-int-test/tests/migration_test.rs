use bucketup::common::{MIGRATIONS_BUCKET, VERSION_KEY};
use bucketup::errors::ErrorKind;
use bucketup::migration::{current_version, encode_version, up, Migration, MigrationOutcome, Migrator};
use bucketup::transaction::TxOperations;
use bucketup_int_test::test_util::{
    bucket_exists, bucket_value, cleanup, create_bucket, create_test_context, failing, put_value,
    reopen, run_test,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[ctor::ctor]
fn init() {
    colog::init();
}

fn counting(calls: &Arc<AtomicUsize>) -> Migration {
    let calls = calls.clone();
    Migration::new(move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn test_up_no_migrations() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let outcome = up(&store, &[])?;
            assert_eq!(outcome, MigrationOutcome::AlreadyCurrent { version: 0 });
            assert_eq!(current_version(&store)?, 0);
            assert!(!bucket_exists(&store, "migrations")?);
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_up_single_migration() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            up(&store, &[create_bucket("test")])?;
            assert!(bucket_exists(&store, "test")?);
            assert_eq!(current_version(&store)?, 1);
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_up_multiple_migrations() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let outcome = up(
                &store,
                &[
                    create_bucket("test"),
                    put_value("test", "value", "1"),
                    put_value("test", "value", "2"),
                ],
            )?;
            assert_eq!(outcome, MigrationOutcome::Migrated { from: 0, to: 3 });
            assert_eq!(bucket_value(&store, "test", "value")?, Some(b"2".to_vec()));
            assert_eq!(current_version(&store)?, 3);
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_up_failed_migration() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let err = up(&store, &[create_bucket("test"), failing()]).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::MigrationError);
            assert_eq!(
                err.message(),
                "bucketup: failed to migrate from version 1 to 2"
            );

            assert!(!bucket_exists(&store, "test")?);
            assert!(!bucket_exists(&store, "migrations")?);
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_up_existing_migrations() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            up(&store, &[create_bucket("test")])?;

            let outcome = up(
                &store,
                &[create_bucket("test"), put_value("test", "value", "1")],
            )?;
            assert_eq!(outcome, MigrationOutcome::Migrated { from: 1, to: 2 });
            assert_eq!(bucket_value(&store, "test", "value")?, Some(b"1".to_vec()));
            assert_eq!(current_version(&store)?, 2);
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_up_existing_migrations_failed_migration() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            up(&store, &[create_bucket("test")])?;

            assert!(up(&store, &[create_bucket("test"), failing()]).is_err());
            assert!(bucket_exists(&store, "test")?);
            assert_eq!(current_version(&store)?, 1);
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_up_existing_migrations_bad_version() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            up(
                &store,
                &[create_bucket("test"), put_value("test", "value", "1")],
            )?;

            let err = up(&store, &[create_bucket("bad")]).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::VersionMismatch);
            assert_eq!(
                err.message(),
                "bucketup: db version 2 is greater than library version 1"
            );
            assert!(!bucket_exists(&store, "bad")?);
            assert_eq!(current_version(&store)?, 2);
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_up_runs_only_pending_suffix() {
    const LIB_VERSION: usize = 4;

    for start in 0..=LIB_VERSION {
        run_test(
            create_test_context,
            move |ctx| {
                let store = ctx.store();
                let calls: Vec<Arc<AtomicUsize>> =
                    (0..LIB_VERSION).map(|_| Arc::new(AtomicUsize::new(0))).collect();
                let migrations: Vec<Migration> = calls.iter().map(counting).collect();

                up(&store, &migrations[..start])?;
                for counter in &calls {
                    counter.store(0, Ordering::SeqCst);
                }

                up(&store, &migrations)?;
                for (index, counter) in calls.iter().enumerate() {
                    let expected = if index >= start { 1 } else { 0 };
                    assert_eq!(counter.load(Ordering::SeqCst), expected, "migration {}", index);
                }
                assert_eq!(current_version(&store)?, LIB_VERSION as u64);
                Ok(())
            },
            cleanup,
        );
    }
}

#[test]
fn test_up_is_idempotent() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let calls = Arc::new(AtomicUsize::new(0));
            let migrations = vec![create_bucket("test"), counting(&calls)];

            up(&store, &migrations)?;
            let outcome = up(&store, &migrations)?;
            assert_eq!(outcome, MigrationOutcome::AlreadyCurrent { version: 2 });
            assert_eq!(outcome.applied(), 0);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_failed_migration_discards_earlier_steps() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            up(&store, &[create_bucket("test"), put_value("test", "value", "1")])?;

            let err = up(
                &store,
                &[
                    create_bucket("test"),
                    put_value("test", "value", "1"),
                    put_value("test", "value", "2"),
                    create_bucket("other"),
                    failing(),
                ],
            )
            .unwrap_err();
            assert_eq!(
                err.message(),
                "bucketup: failed to migrate from version 4 to 5"
            );
            assert_eq!(err.root_cause().message(), "Something went wrong");

            assert_eq!(bucket_value(&store, "test", "value")?, Some(b"1".to_vec()));
            assert!(!bucket_exists(&store, "other")?);
            assert_eq!(current_version(&store)?, 2);
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_version_is_stored_big_endian() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            up(&store, &[create_bucket("a"), create_bucket("b"), create_bucket("c")])?;

            let raw = store.view(|tx| match tx.bucket(MIGRATIONS_BUCKET)? {
                Some(bucket) => bucket.get(VERSION_KEY),
                None => Ok(None),
            })?;
            assert_eq!(raw, Some(encode_version(3).to_vec()));
            assert_eq!(raw, Some(vec![0, 0, 0, 0, 0, 0, 0, 3]));
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_migration_deleting_version_bucket_fails() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            up(&store, &[create_bucket("test")])?;

            let drop_versions = Migration::named("drop versions", |tx| {
                tx.delete_bucket(MIGRATIONS_BUCKET)
            });
            let err = up(&store, &[create_bucket("test"), drop_versions]).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::BucketNotFound);
            assert_eq!(
                err.message(),
                "bucketup: failed to update migration version to 2"
            );

            assert_eq!(current_version(&store)?, 1);
            Ok(())
        },
        cleanup,
    );
}

#[test]
fn test_version_survives_reopen() {
    run_test(
        create_test_context,
        |ctx| {
            up(
                &ctx.store(),
                &[create_bucket("test"), put_value("test", "value", "2")],
            )?;

            let reopened = reopen(&ctx)?;
            let store = reopened.store();
            assert_eq!(current_version(&store)?, 2);
            assert_eq!(bucket_value(&store, "test", "value")?, Some(b"2".to_vec()));

            let outcome = up(
                &store,
                &[create_bucket("test"), put_value("test", "value", "2")],
            )?;
            assert_eq!(outcome, MigrationOutcome::AlreadyCurrent { version: 2 });
            cleanup(reopened)
        },
        |_| Ok(()),
    );
}

#[test]
fn test_migrator_tracks_pending() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();
            let migrator = Migrator::new(&store)
                .add(create_bucket("users"))
                .add_named("seed admin", |tx| match tx.bucket(b"users")? {
                    Some(users) => users.put(b"admin", b"root"),
                    None => Ok(()),
                });

            assert_eq!(migrator.target_version(), 2);
            assert_eq!(migrator.pending()?, 2);

            let outcome = migrator.up()?;
            assert_eq!(outcome.applied(), 2);
            assert_eq!(outcome.version(), 2);
            assert_eq!(migrator.pending()?, 0);
            assert_eq!(bucket_value(&store, "users", "admin")?, Some(b"root".to_vec()));

            let behind = Migrator::new(&store).add(create_bucket("users"));
            assert_eq!(behind.pending().unwrap_err().kind(), &ErrorKind::VersionMismatch);
            Ok(())
        },
        cleanup,
    );
}
