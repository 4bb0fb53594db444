//! Redis-backed failure counters.

use async_trait::async_trait;
use ::redis::Script;

use super::HealthCounterStore;
use crate::error::StoreError;

const KEY_PREFIX: &str = "breakIntegration";

// The counter is stored as a JSON object so other services can read it.
const INCREMENT_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
local count = 1
if raw then
  local ok, decoded = pcall(cjson.decode, raw)
  if ok and type(decoded) == 'table' and tonumber(decoded['count']) then
    count = tonumber(decoded['count']) + 1
  end
end
redis.call('SET', KEYS[1], cjson.encode({count = count}))
return count
"#;

#[derive(Clone)]
pub struct RedisHealthStore {
    client: ::redis::Client,
}

impl RedisHealthStore {
    pub fn new(client: ::redis::Client) -> Self {
        Self { client }
    }

    fn key_for(integration_id: &str) -> String {
        format!("{KEY_PREFIX}:{integration_id}")
    }
}

#[async_trait]
impl HealthCounterStore for RedisHealthStore {
    async fn increment(&self, integration_id: &str) -> Result<u32, StoreError> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;

        let count: i64 = Script::new(INCREMENT_SCRIPT)
            .key(Self::key_for(integration_id))
            .invoke_async(&mut connection)
            .await?;

        u32::try_from(count).map_err(|e| StoreError::Other(format!("invalid failure count {count}: {e}")))
    }

    async fn reset(&self, integration_id: &str) -> Result<(), StoreError> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        ::redis::cmd("DEL")
            .arg(Self::key_for(integration_id))
            .query_async::<()>(&mut connection)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_key_is_prefixed() {
        assert_eq!(RedisHealthStore::key_for("int-1"), "breakIntegration:int-1");
    }
}
