use crate::model::PackageStatus;
use crate::probe::Prober;
use crate::CurationError;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Download url → status of the blocked package served there.
pub type StatusMap = HashMap<String, PackageStatus>;

/// Probes every id with at most `parallelism` requests in flight and
/// waits for all of them. One failing probe does not stop the others; the
/// failures come back next to whatever was gathered.
pub async fn fetch_statuses(
    prober: Arc<Prober>,
    ids: Vec<String>,
    skip: &BTreeSet<String>,
    parallelism: usize,
) -> (StatusMap, Vec<CurationError>) {
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let statuses: Arc<Mutex<StatusMap>> = Arc::new(Mutex::new(HashMap::new()));
    let mut tasks = JoinSet::new();

    for id in ids.into_iter().filter(|id| !skip.contains(id)) {
        let prober = Arc::clone(&prober);
        let semaphore = Arc::clone(&semaphore);
        let statuses = Arc::clone(&statuses);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|err| CurationError::Task(err.to_string()))?;
            if let Some(status) = prober.probe(&id).await? {
                let mut statuses = statuses
                    .lock()
                    .map_err(|_| CurationError::Task("status map poisoned".to_string()))?;
                statuses
                    .entry(status.blocked_package_url.clone())
                    .or_insert(status);
            }
            Ok::<(), CurationError>(())
        });
    }

    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::debug!("{err}");
                errors.push(err);
            }
            Err(err) => errors.push(CurationError::Task(err.to_string())),
        }
    }
    let statuses = match Arc::try_unwrap(statuses) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
        Err(shared) => shared
            .lock()
            .map(|map| map.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone()),
    };
    (statuses, errors)
}
