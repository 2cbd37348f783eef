//! 키별 비동기 임계 구역
//!
//! 같은 키에 대한 작업은 순서대로 실행되고, 다른 키끼리는 서로 기다리지 않습니다.
//! 기다리는 작업이 없어진 키의 락은 맵에서 제거되므로 키 수만큼 메모리가 쌓이지 않습니다.
//!
//! ```rust,ignore
//! let locks = KeyedLocks::new();
//! let total = locks.with_lock(&"visitor".to_string(), || async { read_modify_write().await }).await;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::lock::Mutex as AsyncMutex;

type LockMap<K> = Mutex<HashMap<K, Arc<AsyncMutex<()>>>>;

pub struct KeyedLocks<K> {
    locks: LockMap<K>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `key`의 락을 잡은 상태로 `task`를 실행합니다.
    pub async fn with_lock<F, Fut, T>(&self, key: &K, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let held = HeldKey::acquire(&self.locks, key);
        let _guard = held.mutex().lock().await;
        task().await
    }

    /// 현재 맵에 남아 있는 키 수
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 락 참조를 쥐고 있다가 drop 시 필요 없어진 키를 정리합니다.
/// 작업 future가 중간에 취소되어도 정리됩니다.
struct HeldKey<'a, K: Eq + Hash + Clone> {
    locks: &'a LockMap<K>,
    key: K,
    mutex: Arc<AsyncMutex<()>>,
}

impl<'a, K: Eq + Hash + Clone> HeldKey<'a, K> {
    fn acquire(locks: &'a LockMap<K>, key: &K) -> Self {
        let mutex = locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        Self {
            locks,
            key: key.clone(),
            mutex,
        }
    }

    fn mutex(&self) -> &AsyncMutex<()> {
        &self.mutex
    }
}

impl<K: Eq + Hash + Clone> Drop for HeldKey<'_, K> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // 맵과 자신만 참조하고 있으면 더 이상 기다리는 작업이 없음
        if locks.get(&self.key).is_some_and(|held| Arc::strong_count(held) == 2) {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[actix_web::test]
    async fn test_same_key_runs_one_at_a_time() {
        let locks = KeyedLocks::new();
        let (inside, overlaps) = (AtomicUsize::new(0), AtomicUsize::new(0));
        let (inside, overlaps) = (&inside, &overlaps);
        let key = "visitor".to_string();

        let tasks = (0..8).map(|_| {
            locks.with_lock(&key, move || async move {
                if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                actix_web::rt::time::sleep(std::time::Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            })
        });
        join_all(tasks).await;

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert!(locks.is_empty());
    }

    #[actix_web::test]
    async fn test_cancelled_task_releases_key() {
        let locks: KeyedLocks<String> = KeyedLocks::new();
        let key = "visitor".to_string();

        {
            let pending = locks.with_lock(&key, || futures_util::future::pending::<()>());
            let mut pending = Box::pin(pending);
            // 한 번 poll해서 락을 잡은 뒤 취소
            assert!(futures_util::poll!(pending.as_mut()).is_pending());
            assert_eq!(locks.len(), 1);
        }

        assert!(locks.is_empty());
        assert_eq!(locks.with_lock(&key, || async { 7 }).await, 7);
    }
}
