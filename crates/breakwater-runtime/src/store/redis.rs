//! Redis-backed store implementation.
//!
//! Each batch becomes one `MULTI`/`EXEC` pipeline, so the whole batch
//! applies in order with no interleaving from other clients.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Value;
use std::time::Duration;

use super::{Store, StoreCommand, StoreError, StoreReply};

/// Store backed by a Redis server.
///
/// The connection manager (and whatever pool sits behind it) is owned
/// by the caller; the store borrows it for one pipeline at a time and
/// never holds it across a wrapped call.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Wrap an established connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn apply(&self, commands: &[StoreCommand]) -> Result<Vec<StoreReply>, StoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for command in commands {
            match command {
                StoreCommand::SetIfAbsent { key, value } => {
                    pipe.cmd("SETNX").arg(key).arg(value);
                }
                StoreCommand::Get { key } => {
                    pipe.cmd("GET").arg(key);
                }
                StoreCommand::Set { key, value, ttl } => {
                    let cmd = pipe.cmd("SET").arg(key).arg(value);
                    if let Some(ttl) = ttl {
                        cmd.arg("PX").arg(ttl.as_millis() as u64);
                    }
                }
                StoreCommand::Incr { key } => {
                    pipe.cmd("INCR").arg(key);
                }
                StoreCommand::Delete { key } => {
                    pipe.cmd("UNLINK").arg(key);
                }
                StoreCommand::ExpireIfUnset { key, ttl } => {
                    pipe.cmd("PEXPIRE")
                        .arg(key)
                        .arg(ttl.as_millis() as u64)
                        .arg("NX");
                }
                StoreCommand::RemainingTtl { key } => {
                    pipe.cmd("PTTL").arg(key);
                }
            }
        }

        let mut conn = self.conn.clone();
        let values: Vec<Value> = pipe.query_async(&mut conn).await?;
        if values.len() != commands.len() {
            return Err(StoreError::Reply(format!(
                "expected {} replies, got {}",
                commands.len(),
                values.len()
            )));
        }

        commands
            .iter()
            .zip(values)
            .map(|(command, value)| reply_for(command, value))
            .collect()
    }
}

fn reply_for(command: &StoreCommand, value: Value) -> Result<StoreReply, StoreError> {
    match command {
        StoreCommand::Get { .. } => match value {
            Value::Nil => Ok(StoreReply::Value(None)),
            Value::BulkString(bytes) => Ok(StoreReply::Value(Some(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))),
            Value::SimpleString(text) => Ok(StoreReply::Value(Some(text))),
            other => Err(unexpected("GET", &other)),
        },
        StoreCommand::Set { .. } => Ok(StoreReply::Unit),
        StoreCommand::RemainingTtl { .. } => match value {
            // PTTL answers -2 for a missing key and -1 for no expiry;
            // both mean "no remaining life" here.
            Value::Int(millis) if millis > 0 => {
                Ok(StoreReply::Ttl(Some(Duration::from_millis(millis as u64))))
            }
            Value::Int(_) => Ok(StoreReply::Ttl(None)),
            other => Err(unexpected("PTTL", &other)),
        },
        _ => match value {
            Value::Int(n) => Ok(StoreReply::Integer(n)),
            other => Err(unexpected("counter", &other)),
        },
    }
}

fn unexpected(what: &str, value: &Value) -> StoreError {
    StoreError::Reply(format!("unexpected {what} reply: {value:?}"))
}
