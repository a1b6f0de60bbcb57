//! Per-case exclusive locks
//!
//! A tick and a webhook delivery for the same case must never run
//! concurrently; different cases are independent. Lock entries are
//! created on first use and kept for the process lifetime (the case
//! population is small and stable).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
pub struct CaseLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, case_ref: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(case_ref.to_string()).or_default().clone()
    }

    /// Wait for exclusive access to a case
    pub async fn acquire(&self, case_ref: &str) -> OwnedMutexGuard<()> {
        self.entry(case_ref).lock_owned().await
    }

    /// Take the lock only if it is free
    pub fn try_acquire(&self, case_ref: &str) -> Option<OwnedMutexGuard<()>> {
        self.entry(case_ref).try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_case_is_exclusive() {
        let locks = CaseLocks::new();
        let guard = locks.acquire("MAND_001").await;
        assert!(locks.try_acquire("MAND_001").is_none());
        drop(guard);
        assert!(locks.try_acquire("MAND_001").is_some());
    }

    #[tokio::test]
    async fn test_different_cases_are_independent() {
        let locks = CaseLocks::new();
        let _a = locks.acquire("MAND_001").await;
        assert!(locks.try_acquire("MAND_002").is_some());
    }
}
