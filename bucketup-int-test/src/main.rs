use bucketup::errors::BucketupResult;
use bucketup::migration::{current_version, Migration, Migrator};
use bucketup::transaction::TxOperations;
use bucketup_int_test::test_util::{cleanup, create_test_context};

fn main() -> BucketupResult<()> {
    colog::init();
    println!("Starting migration stress test...");
    let ctx = create_test_context()?;
    let store = ctx.store();

    let count = 10_000;
    let entries_per_migration = 10;
    let mut migrator = Migrator::new(&store);
    for step in 0..count {
        migrator = migrator.add(Migration::new(move |tx| {
            let bucket = tx.create_bucket_if_not_exists(b"stress")?;
            for i in 0..entries_per_migration {
                let key = format!("{:06}-{:02}", step, i);
                bucket.put(key.as_bytes(), uuid::Uuid::new_v4().as_bytes())?;
            }
            Ok(())
        }));
    }

    let start = std::time::Instant::now();
    let outcome = migrator.up()?;
    let elapsed = start.elapsed();
    log::info!("Outcome: {:?}", outcome);
    println!(
        "Applied {} migrations ({} entries) in {:?}",
        outcome.applied(),
        outcome.applied() * entries_per_migration,
        elapsed
    );

    let start = std::time::Instant::now();
    let outcome = migrator.up()?;
    println!("Second run: {:?} in {:?}", outcome, start.elapsed());
    println!("Store version: {}", current_version(&store)?);

    cleanup(ctx)
}
