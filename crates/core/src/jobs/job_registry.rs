use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use super::domain::job_key::JobKey;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobRegistryError {
    #[error("a transcription job is already running for {0}")]
    AlreadyRunning(JobKey),
}

/// Opaque reference to a running external job.
///
/// The process id is attached once the tool has been spawned; a handle
/// registered ahead of the spawn carries none.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobHandle {
    pid: Option<u32>,
}

impl JobHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Thread-safe map of running jobs, one entry per [`JobKey`].
///
/// A single lock guards every read and write. It is held only for the map
/// operation itself, never across the external tool's execution.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobKey, JobHandle>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handle` for `key`, failing if the key is already present.
    pub fn register(&self, key: JobKey, handle: JobHandle) -> Result<(), JobRegistryError> {
        let mut jobs = self.lock();
        if jobs.contains_key(&key) {
            return Err(JobRegistryError::AlreadyRunning(key));
        }
        log::debug!("Registered job {key}");
        jobs.insert(key, handle);
        Ok(())
    }

    /// Remove `key` if present. No-op otherwise.
    pub fn unregister(&self, key: &JobKey) {
        if self.lock().remove(key).is_some() {
            log::debug!("Unregistered job {key}");
        }
    }

    pub fn is_running(&self, key: &JobKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn handle(&self, key: &JobKey) -> Option<JobHandle> {
        self.lock().get(key).cloned()
    }

    /// Record the spawned process id on an existing entry.
    pub fn attach_pid(&self, key: &JobKey, pid: u32) {
        if let Some(handle) = self.lock().get_mut(key) {
            handle.pid = Some(pid);
        }
    }


    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Register `key` and return a guard that unregisters it when dropped,
    /// including during unwinding.
    pub fn acquire(self: &Arc<Self>, key: JobKey) -> Result<JobGuard, JobRegistryError> {
        self.register(key.clone(), JobHandle::new())?;
        Ok(JobGuard {
            registry: Arc::clone(self),
            key,
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobKey, JobHandle>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped registration of one job. Dropping the guard releases the key.
#[derive(Debug)]
pub struct JobGuard {
    registry: Arc<JobRegistry>,
    key: JobKey,
}

impl JobGuard {
    pub fn key(&self) -> &JobKey {
        &self.key
    }

    pub fn attach_pid(&self, pid: u32) {
        self.registry.attach_pid(&self.key, pid);
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.key);
    }
}
