use bucketup::errors::BucketupResult;
use bucketup::migration::Migration;
use bucketup::store::Store;
use bucketup::transaction::TxOperations;
use std::time::{Duration, Instant};
use std::{env, fs, thread};

/// Runs a test with retry logic and error handling.
///
/// `after` runs even when `test` returns an error, so the store is always
/// cleaned up. Panics are caught and reported with the attempt number.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> BucketupResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> BucketupResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> BucketupResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| match before() {
            Ok(ctx) => match test(ctx.clone()) {
                Ok(_) => after(ctx).map_err(|e| format!("After run failed: {:?}", e)),
                Err(e) => {
                    let _ = after(ctx);
                    Err(format!("Test failed: {:?}", e))
                }
            },
            Err(e) => Err(format!("Before run failed: {:?}", e)),
        });

        let elapsed = start_time.elapsed();
        let error = match result {
            Ok(Ok(_)) => return,
            Ok(Err(e)) => e,
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    format!("Unknown panic: {:?}", panic_err.type_id())
                };
                format!("Panic: {}", err_msg)
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("{}", error);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(error);
    }

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    path: String,
    store: Store,
}

impl TestContext {
    pub fn new(path: String, store: Store) -> Self {
        Self { path, store }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn store(&self) -> Store {
        self.store.clone()
    }
}

pub fn random_path() -> String {
    let id = uuid::Uuid::new_v4();
    let temp_dir = env::temp_dir();
    temp_dir
        .join("bucketup")
        .join(id.to_string())
        .to_string_lossy()
        .to_string()
}

/// Opens a fresh Fjall-backed store in a random directory.
#[cfg(feature = "fjall")]
pub fn create_test_context() -> BucketupResult<TestContext> {
    let path = random_path();
    let store = open_store(&path)?;
    Ok(TestContext::new(path, store))
}

/// Opens a fresh in-memory store.
#[cfg(not(feature = "fjall"))]
pub fn create_test_context() -> BucketupResult<TestContext> {
    use bucketup::store::memory::InMemoryStore;

    let store = Store::open(InMemoryStore::new())?;
    Ok(TestContext::new(random_path(), store))
}

/// Opens the Fjall store at `path`, creating it if needed.
#[cfg(feature = "fjall")]
pub fn open_store(path: &str) -> BucketupResult<Store> {
    use bucketup_fjall_adapter::FjallStore;

    // one flush and one compaction worker per store keeps the thread count low
    FjallStore::with_config()
        .low_memory_preset()
        .db_path(path)
        .build()
}

/// Closes the store and reopens it from disk. The in-memory store has no
/// disk, so the same store is returned.
#[cfg(feature = "fjall")]
pub fn reopen(ctx: &TestContext) -> BucketupResult<TestContext> {
    ctx.store().close()?;
    let store = open_store(ctx.path())?;
    Ok(TestContext::new(ctx.path().to_string(), store))
}

#[cfg(not(feature = "fjall"))]
pub fn reopen(ctx: &TestContext) -> BucketupResult<TestContext> {
    Ok(ctx.clone())
}

pub fn cleanup(ctx: TestContext) -> BucketupResult<()> {
    if let Err(e) = ctx.store().close() {
        eprintln!("Warning: Failed to close store: {:?}", e);
    }

    let path = ctx.path();
    let max_retries = 10;
    let mut delay_ms = 50u64;

    for _ in 0..max_retries {
        match fs::remove_dir_all(path) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(_) => {
                thread::sleep(Duration::from_millis(delay_ms));
                delay_ms = std::cmp::min(delay_ms * 2, 1000);
            }
        }
    }

    eprintln!(
        "Warning: Failed to remove test directory {} after {} attempts",
        path, max_retries
    );
    Ok(())
}

/// Migration creating `name`.
pub fn create_bucket(name: &'static str) -> Migration {
    Migration::named(&format!("create {}", name), move |tx| {
        tx.create_bucket(name.as_bytes())?;
        Ok(())
    })
}

/// Migration setting `key` to `value` in an existing bucket.
pub fn put_value(bucket: &'static str, key: &'static str, value: &'static str) -> Migration {
    Migration::named(&format!("set {}.{}", bucket, key), move |tx| {
        match tx.bucket(bucket.as_bytes())? {
            Some(b) => b.put(key.as_bytes(), value.as_bytes()),
            None => Err(format!("bucket {} does not exist", bucket).into()),
        }
    })
}

/// Migration that always fails.
pub fn failing() -> Migration {
    Migration::named("fail", |_| Err("Something went wrong".into()))
}

pub fn bucket_exists(store: &Store, name: &str) -> BucketupResult<bool> {
    store.view(|tx| Ok(tx.bucket(name.as_bytes())?.is_some()))
}

pub fn bucket_value(store: &Store, bucket: &str, key: &str) -> BucketupResult<Option<Vec<u8>>> {
    store.view(|tx| match tx.bucket(bucket.as_bytes())? {
        Some(b) => b.get(key.as_bytes()),
        None => Ok(None),
    })
}
