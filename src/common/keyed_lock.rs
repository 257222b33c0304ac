// src/common/keyed_lock.rs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

// Um mutex por chave (aqui, por CPF). Serializa operações sobre a mesma
// chave dentro do processo; chaves diferentes não se bloqueiam.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entradas que ninguém segura podem sair do mapa
            locks.retain(|k, l| k == key || Arc::strong_count(l) > 1);
            Arc::clone(
                locks
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_waits_for_release() {
        let locks = KeyedLocks::new();
        let guard = locks.acquire("61767735120").await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.acquire("61767735120").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire("11111111111").await;
        tokio::time::timeout(Duration::from_millis(200), locks.acquire("22222222222"))
            .await
            .unwrap();
    }
}
