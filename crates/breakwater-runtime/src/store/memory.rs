//! In-process store implementation.
//!
//! [`MemoryStore`] keeps the whole key space behind one mutex; holding
//! the lock for the duration of a batch is what makes the batch atomic.
//! Entries carry an optional deadline and read as absent once it has
//! passed.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::time::Instant;

use super::{Store, StoreCommand, StoreError, StoreReply};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    deadline: Option<Instant>,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.deadline.map_or(true, |deadline| deadline > now)
    }
}

/// Mutex-guarded map with per-entry expiry.
///
/// Suitable as the test double for any [`Store`] consumer and as a real
/// store for single-process deployments. Time comes from
/// [`tokio::time::Instant`], so paused-clock tests can drive expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn apply(&self, commands: &[StoreCommand]) -> Result<Vec<StoreReply>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        // Reap up front so every command in the batch sees the same
        // notion of "absent".
        entries.retain(|_, entry| entry.live(now));

        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            replies.push(apply_one(&mut entries, command, now)?);
        }
        Ok(replies)
    }
}

fn apply_one(
    entries: &mut HashMap<String, Entry>,
    command: &StoreCommand,
    now: Instant,
) -> Result<StoreReply, StoreError> {
    match command {
        StoreCommand::SetIfAbsent { key, value } => {
            if entries.contains_key(key) {
                Ok(StoreReply::Integer(0))
            } else {
                entries.insert(
                    key.clone(),
                    Entry {
                        value: value.clone(),
                        deadline: None,
                    },
                );
                Ok(StoreReply::Integer(1))
            }
        }
        StoreCommand::Get { key } => Ok(StoreReply::Value(
            entries.get(key).map(|entry| entry.value.clone()),
        )),
        StoreCommand::Set { key, value, ttl } => {
            entries.insert(
                key.clone(),
                Entry {
                    value: value.clone(),
                    deadline: ttl.map(|ttl| now + ttl),
                },
            );
            Ok(StoreReply::Unit)
        }
        StoreCommand::Incr { key } => {
            let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
                value: "0".to_string(),
                deadline: None,
            });
            let current: i64 = entry
                .value
                .parse()
                .map_err(|_| StoreError::Reply(format!("key `{key}` does not hold an integer")))?;
            entry.value = (current + 1).to_string();
            Ok(StoreReply::Integer(current + 1))
        }
        StoreCommand::Delete { key } => {
            Ok(StoreReply::Integer(i64::from(entries.remove(key).is_some())))
        }
        StoreCommand::ExpireIfUnset { key, ttl } => match entries.get_mut(key) {
            Some(entry) if entry.deadline.is_none() => {
                entry.deadline = Some(now + *ttl);
                Ok(StoreReply::Integer(1))
            }
            _ => Ok(StoreReply::Integer(0)),
        },
        StoreCommand::RemainingTtl { key } => {
            let remaining = entries
                .get(key)
                .and_then(|entry| entry.deadline)
                .map(|deadline| deadline.saturating_duration_since(now))
                .filter(|remaining| !remaining.is_zero());
            Ok(StoreReply::Ttl(remaining))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn get(store: &MemoryStore, key: &str) -> Option<String> {
        let replies = store
            .apply(&[StoreCommand::Get {
                key: key.to_string(),
            }])
            .await
            .unwrap();
        match replies.into_iter().next() {
            Some(StoreReply::Value(value)) => value,
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_if_absent_only_creates_once() {
        let store = MemoryStore::new();
        let cmd = StoreCommand::SetIfAbsent {
            key: "k".to_string(),
            value: "first".to_string(),
        };
        assert_eq!(
            store.apply(&[cmd.clone()]).await.unwrap(),
            vec![StoreReply::Integer(1)]
        );
        assert_eq!(
            store
                .apply(&[StoreCommand::SetIfAbsent {
                    key: "k".to_string(),
                    value: "second".to_string(),
                }])
                .await
                .unwrap(),
            vec![StoreReply::Integer(0)]
        );
        assert_eq!(get(&store, "k").await.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_incr_creates_then_counts() {
        let store = MemoryStore::new();
        let cmd = StoreCommand::Incr {
            key: "n".to_string(),
        };
        assert_eq!(
            store.apply(&[cmd.clone()]).await.unwrap(),
            vec![StoreReply::Integer(1)]
        );
        assert_eq!(
            store.apply(&[cmd]).await.unwrap(),
            vec![StoreReply::Integer(2)]
        );
    }

    #[tokio::test]
    async fn test_incr_rejects_non_integer() {
        let store = MemoryStore::new();
        store
            .apply(&[StoreCommand::Set {
                key: "k".to_string(),
                value: "not-a-number".to_string(),
                ttl: None,
            }])
            .await
            .unwrap();
        let err = store
            .apply(&[StoreCommand::Incr {
                key: "k".to_string(),
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Reply(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_reads_as_absent() {
        let store = MemoryStore::new();
        store
            .apply(&[StoreCommand::Set {
                key: "k".to_string(),
                value: "v".to_string(),
                ttl: Some(Duration::from_secs(5)),
            }])
            .await
            .unwrap();
        assert_eq!(get(&store, "k").await.as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(get(&store, "k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_if_unset_does_not_reset_a_running_window() {
        let store = MemoryStore::new();
        store
            .apply(&[
                StoreCommand::Incr {
                    key: "n".to_string(),
                },
                StoreCommand::ExpireIfUnset {
                    key: "n".to_string(),
                    ttl: Duration::from_secs(10),
                },
            ])
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;

        // A second touch must not push the deadline out.
        let replies = store
            .apply(&[
                StoreCommand::Incr {
                    key: "n".to_string(),
                },
                StoreCommand::ExpireIfUnset {
                    key: "n".to_string(),
                    ttl: Duration::from_secs(10),
                },
                StoreCommand::RemainingTtl {
                    key: "n".to_string(),
                },
            ])
            .await
            .unwrap();
        assert_eq!(replies[1], StoreReply::Integer(0));
        assert_eq!(
            replies[2],
            StoreReply::Ttl(Some(Duration::from_secs(6)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_replaces_value_and_expiry() {
        let store = MemoryStore::new();
        store
            .apply(&[StoreCommand::Set {
                key: "k".to_string(),
                value: "old".to_string(),
                ttl: Some(Duration::from_secs(2)),
            }])
            .await
            .unwrap();
        store
            .apply(&[StoreCommand::Set {
                key: "k".to_string(),
                value: "new".to_string(),
                ttl: Some(Duration::from_secs(10)),
            }])
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(get(&store, "k").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_delete_reports_removal() {
        let store = MemoryStore::new();
        store
            .apply(&[StoreCommand::Set {
                key: "k".to_string(),
                value: "v".to_string(),
                ttl: None,
            }])
            .await
            .unwrap();
        assert_eq!(
            store
                .apply(&[StoreCommand::Delete {
                    key: "k".to_string(),
                }])
                .await
                .unwrap(),
            vec![StoreReply::Integer(1)]
        );
        assert_eq!(
            store
                .apply(&[StoreCommand::Delete {
                    key: "k".to_string(),
                }])
                .await
                .unwrap(),
            vec![StoreReply::Integer(0)]
        );
    }

    #[tokio::test]
    async fn test_remaining_ttl_absent_or_unset() {
        let store = MemoryStore::new();
        // Absent key.
        assert_eq!(
            store
                .apply(&[StoreCommand::RemainingTtl {
                    key: "k".to_string(),
                }])
                .await
                .unwrap(),
            vec![StoreReply::Ttl(None)]
        );
        // Present without expiry.
        store
            .apply(&[StoreCommand::Set {
                key: "k".to_string(),
                value: "v".to_string(),
                ttl: None,
            }])
            .await
            .unwrap();
        assert_eq!(
            store
                .apply(&[StoreCommand::RemainingTtl {
                    key: "k".to_string(),
                }])
                .await
                .unwrap(),
            vec![StoreReply::Ttl(None)]
        );
    }
}
