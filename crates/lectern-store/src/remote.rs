//! Redis-backed [`SharedStore`].
//!
//! Connection handling uses the async [`ConnectionManager`], which
//! multiplexes and reconnects internally; per-operation handles are cheap
//! clones of it. Batch publishes go through an atomic `MULTI`/`EXEC`
//! pipeline, and the conditional pointer clear runs as a server-side Lua
//! script so the compare and the delete are one step.

use std::time::Duration;

use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, Script};

use crate::error::StoreResult;
use crate::SharedStore;

/// Lua: delete KEYS[1] only when it currently holds ARGV[1].
const CLEAR_IF_EQ: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('DEL', KEYS[1])
    return 1
end
return 0
";

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// ## Summary
    /// Opens a managed connection to the Redis instance at `url`.
    ///
    /// ## Errors
    /// Returns an error if the URL is invalid or the initial connection
    /// cannot be established.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(3)
            .set_connection_timeout(Duration::from_secs(2));

        let client = Client::open(url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        tracing::info!(url, "connected to shared store");
        Ok(Self { connection })
    }

    fn handle(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

impl SharedStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.handle();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_value(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut conn = self.handle();
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn set_many(
        &self,
        entries: &[(String, String)],
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.handle();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            match ttl {
                Some(ttl) => {
                    pipe.cmd("SET")
                        .arg(key)
                        .arg(value)
                        .arg("EX")
                        .arg(ttl_secs(ttl))
                        .ignore();
                }
                None => {
                    pipe.set(key, value).ignore();
                }
            }
        }
        let () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.handle();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut conn = self.handle();
        conn.sadd::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut conn = self.handle();
        conn.srem::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.handle();
        let member: bool = conn.sismember(key, member).await?;
        Ok(member)
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.handle();
        let members: Vec<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.handle();
        conn.expire::<_, ()>(key, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn clear_value_if_eq(&self, key: &str, expected: &str) -> StoreResult<bool> {
        let mut conn = self.handle();
        let cleared: i64 = Script::new(CLEAR_IF_EQ)
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(cleared == 1)
    }
}
