//! Free-key generator worker (§4.A): a periodic task that keeps each
//! algo's free-key pool topped up so that latency-sensitive encryption
//! calls can consume a pre-generated pair instead of paying keygen cost
//! inline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::keystore::Keystore;
use crate::types::{KeyAlgo, KEY_ALGOS_BY_ORDINAL};

/// Tuning knobs for one generator worker.
#[derive(Clone, Copy, Debug)]
pub struct GeneratorConfig {
    pub max_free_keys_per_algo: usize,
    pub sleep_on_overflow: Duration,
    pub tick_interval: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_free_keys_per_algo: 10,
            sleep_on_overflow: Duration::from_secs(60),
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// A stop handle for a spawned generator task. Dropping this handle does
/// NOT stop the task (the task keeps its own `Arc`); call `stop()` explicitly
/// to cancel it.
pub struct GeneratorHandle {
    stopped: Arc<AtomicBool>,
    join: tokio::task::JoinHandle<()>,
}

impl GeneratorHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub async fn join(self) {
        let _ = self.join.await;
    }
}

/// Spawn the free-key generator as a `tokio::task` driven by
/// `tokio::time::interval`. Each tick, it picks the algo with the smallest
/// free count (ties broken by `KeyAlgo::ordinal`, i.e. `KEY_ALGOS_BY_ORDINAL`
/// order); if that count is still below `max_free_keys_per_algo` it
/// generates one pair and adds it, otherwise it sleeps `sleep_on_overflow`.
pub fn spawn(keystore: Arc<Keystore>, config: GeneratorConfig) -> GeneratorHandle {
    let stopped = Arc::new(AtomicBool::new(false));
    let task_stopped = stopped.clone();

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.tick_interval);
        loop {
            ticker.tick().await;
            if task_stopped.load(Ordering::SeqCst) {
                break;
            }

            match smallest_free_algo(&keystore) {
                Ok((algo, count)) if count < config.max_free_keys_per_algo => {
                    let (public, private) = algo.generate_keypair();
                    if let Err(e) = keystore.add_free_keypair(algo, public, private) {
                        warn!(algo = algo.as_str(), error = %e, "free-key generation failed");
                    } else {
                        debug!(algo = algo.as_str(), new_count = count + 1, "generated free keypair");
                    }
                }
                Ok((algo, count)) => {
                    debug!(
                        algo = algo.as_str(),
                        count,
                        max = config.max_free_keys_per_algo,
                        "free-key pools full, sleeping"
                    );
                    tokio::time::sleep(config.sleep_on_overflow).await;
                }
                Err(e) => {
                    warn!(error = %e, "could not read free-key pool counts");
                }
            }
        }
    });

    GeneratorHandle { stopped, join }
}

/// Pick the algo with the smallest free-key count, ties broken by ordinal.
fn smallest_free_algo(keystore: &Keystore) -> Result<(KeyAlgo, usize), crate::error::KeystoreError> {
    let mut best: Option<(KeyAlgo, usize)> = None;
    for algo in KEY_ALGOS_BY_ORDINAL {
        let count = keystore.get_free_keypairs_count(algo)?;
        best = match best {
            Some((_, best_count)) if best_count <= count => best,
            _ => Some((algo, count)),
        };
    }
    best.ok_or_else(|| crate::error::KeystoreError::StorageError("no algos configured".into()))
}
