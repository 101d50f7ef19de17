//! `CacheManager` (§4.2): one continuous `CacheSegment` per `(symbol,
//! timeframe)` key in a Redis-compatible store, with partial-hit merging,
//! LRU eviction, and native TTL.
//!
//! Redis wiring follows `kamoussa-solbot::persistence::RedisPersistence`:
//! a `ConnectionManager` built with a bounded connect timeout. The storage
//! shape differs from solbot's per-bar sorted set — this module stores one
//! JSON-serialized `CacheSegment` per key (GET/SET/EXPIRE), because that is
//! the schema §6 specifies ("one entry per key containing a serialized
//! CacheSegment... plus a native TTL").

use crate::config::CacheConfig;
use crate::segment::CacheSegment;
use analysis_core::{AnalysisError, Bar, Timeframe};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;

const STATS_KEY: &str = "_stats";
const KEY_REGISTRY: &str = "_keys";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Full,
    Partial,
    None,
}

/// Inclusive timestamp range, expressed as `(from, to)` in epoch-ms,
/// separated by the timeframe duration.
pub type TimestampRange = (i64, i64);

#[derive(Debug, Clone, Default)]
pub struct MissingRanges {
    pub before: Option<TimestampRange>,
    pub after: Option<TimestampRange>,
}

#[derive(Debug, Clone)]
pub struct CacheGetResult {
    pub coverage: Coverage,
    pub bars: Vec<Bar>,
    pub missing: Option<MissingRanges>,
}

#[derive(Debug, Clone, Default)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub partial_hits: u64,
    pub extensions: u64,
    pub merges: u64,
    pub evictions: u64,
}

#[derive(Debug, Clone)]
pub struct KeyStats {
    pub key: String,
    pub bar_count: usize,
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub keys: Vec<KeyStats>,
    pub counters: CacheCounters,
}

enum Backend {
    Redis(ConnectionManager),
    Disabled,
}

pub struct CacheManager {
    backend: Backend,
    config: CacheConfig,
}

impl CacheManager {
    pub async fn connect(config: CacheConfig) -> Result<Self, AnalysisError> {
        if !config.enabled {
            return Ok(CacheManager {
                backend: Backend::Disabled,
                config,
            });
        }

        let url = config.redis_url();
        let client = Client::open(url.clone())
            .map_err(|e| AnalysisError::CacheError(format!("invalid redis url {url}: {e}")))?;

        let conn = timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| AnalysisError::CacheError(format!("redis connect timeout: {url}")))?
            .map_err(|e| AnalysisError::CacheError(format!("redis connect failed: {e}")))?;

        tracing::info!(redis_url = %url, "cache-manager connected to redis");

        Ok(CacheManager {
            backend: Backend::Redis(conn),
            config,
        })
    }

    fn key(symbol: &str, timeframe: Timeframe) -> String {
        format!("{symbol}:{timeframe}")
    }

    /// `get(symbol, timeframe, count, endTimestamp?)`.
    pub async fn get(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
        end_timestamp: Option<i64>,
    ) -> Result<CacheGetResult, AnalysisError> {
        let conn = match &mut self.backend {
            Backend::Disabled => {
                return Ok(CacheGetResult {
                    coverage: Coverage::None,
                    bars: vec![],
                    missing: None,
                })
            }
            Backend::Redis(conn) => conn,
        };

        let key = Self::key(symbol, timeframe);
        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| {
                tracing::warn!(%key, error = %e, "cache lookup failed, treating as miss");
                e
            })
            .unwrap_or(None);

        let Some(raw) = raw else {
            self.bump(CounterField::Misses);
            return Ok(CacheGetResult {
                coverage: Coverage::None,
                bars: vec![],
                missing: None,
            });
        };

        let segment: CacheSegment = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(%key, error = %e, "corrupt cache segment, treating as miss");
                self.bump(CounterField::Misses);
                return Ok(CacheGetResult {
                    coverage: Coverage::None,
                    bars: vec![],
                    missing: None,
                });
            }
        };

        let effective_end = end_timestamp.unwrap_or(segment.end);
        if effective_end < segment.start {
            self.bump(CounterField::Misses);
            return Ok(CacheGetResult {
                coverage: Coverage::None,
                bars: vec![],
                missing: None,
            });
        }

        let mut bars = segment.range(effective_end);
        if bars.len() > count {
            bars = bars.split_off(bars.len() - count);
        }

        if bars.len() >= count {
            self.bump(CounterField::Hits);
            return Ok(CacheGetResult {
                coverage: Coverage::Full,
                bars,
                missing: None,
            });
        }

        let duration = timeframe.to_millis();
        let needed_before = count - bars.len();
        let before = if needed_before > 0 {
            Some((
                segment.start - needed_before as i64 * duration,
                segment.start - duration,
            ))
        } else {
            None
        };
        let after = if effective_end > segment.end {
            Some((segment.end + duration, effective_end))
        } else {
            None
        };

        self.bump(CounterField::PartialHits);
        Ok(CacheGetResult {
            coverage: Coverage::Partial,
            bars,
            missing: Some(MissingRanges { before, after }),
        })
    }

    /// `set(symbol, timeframe, bars[])`.
    pub async fn set(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    ) -> Result<(), AnalysisError> {
        let conn = match &mut self.backend {
            Backend::Disabled => return Ok(()),
            Backend::Redis(conn) => conn,
        };
        if bars.is_empty() {
            return Ok(());
        }

        let key = Self::key(symbol, timeframe);
        let raw: Option<String> = conn.get(&key).await.ok().flatten();
        let mut segment = match raw.and_then(|r| serde_json::from_str::<CacheSegment>(&r).ok()) {
            Some(existing) => existing,
            None => CacheSegment::new(vec![]),
        };

        let is_new_segment = segment.count == 0;
        let inserted = segment.merge(bars);
        let evicted = segment.evict_to(self.config.max_bars_per_key);

        let serialized = serde_json::to_string(&segment)
            .map_err(|e| AnalysisError::CacheError(format!("segment serialize failed: {e}")))?;

        conn.set_ex::<_, _, ()>(&key, serialized, self.config.ttl_seconds)
            .await
            .map_err(|e| AnalysisError::CacheError(format!("segment write failed for {key}: {e}")))?;

        let _: Result<(), _> = conn.sadd(KEY_REGISTRY, &key).await;

        if is_new_segment {
            tracing::debug!(%key, bars = inserted, "created cache segment");
        } else if inserted > 0 {
            tracing::debug!(%key, bars = inserted, "extended cache segment");
            self.bump(CounterField::Extensions);
            if inserted > 0 {
                self.bump(CounterField::Merges);
            }
        }
        if evicted > 0 {
            tracing::debug!(%key, evicted, "evicted oldest bars from cache segment");
            self.bump(CounterField::Evictions);
        }

        Ok(())
    }

    /// `clear(symbol?, timeframe?)` — deletes one key, or every tracked key.
    pub async fn clear(
        &mut self,
        symbol: Option<&str>,
        timeframe: Option<Timeframe>,
    ) -> Result<(), AnalysisError> {
        let conn = match &mut self.backend {
            Backend::Disabled => return Ok(()),
            Backend::Redis(conn) => conn,
        };

        match (symbol, timeframe) {
            (Some(s), Some(tf)) => {
                let key = Self::key(s, tf);
                let _: () = conn.del(&key).await.map_err(|e| {
                    AnalysisError::CacheError(format!("clear failed for {key}: {e}"))
                })?;
                let _: Result<(), _> = conn.srem(KEY_REGISTRY, &key).await;
            }
            _ => {
                let keys: Vec<String> = conn.smembers(KEY_REGISTRY).await.unwrap_or_default();
                if !keys.is_empty() {
                    let _: () = conn
                        .del(&keys)
                        .await
                        .map_err(|e| AnalysisError::CacheError(format!("clear-all failed: {e}")))?;
                }
                let _: Result<(), _> = conn.del(KEY_REGISTRY).await;
            }
        }
        Ok(())
    }

    /// `getStats()`.
    pub async fn get_stats(&mut self) -> Result<CacheStats, AnalysisError> {
        let conn = match &mut self.backend {
            Backend::Disabled => return Ok(CacheStats::default()),
            Backend::Redis(conn) => conn,
        };

        let keys: Vec<String> = conn.smembers(KEY_REGISTRY).await.unwrap_or_default();
        let mut key_stats = Vec::with_capacity(keys.len());
        for key in keys {
            let raw: Option<String> = conn.get(&key).await.ok().flatten();
            let Some(raw) = raw else { continue };
            let Ok(segment) = serde_json::from_str::<CacheSegment>(&raw) else {
                continue;
            };
            let ttl: i64 = conn.ttl(&key).await.unwrap_or(-1);
            key_stats.push(KeyStats {
                key,
                bar_count: segment.count,
                ttl_seconds: if ttl >= 0 { Some(ttl) } else { None },
            });
        }

        let counters = self.load_counters().await;
        Ok(CacheStats {
            keys: key_stats,
            counters,
        })
    }

    async fn load_counters(&mut self) -> CacheCounters {
        let conn = match &mut self.backend {
            Backend::Disabled => return CacheCounters::default(),
            Backend::Redis(conn) => conn,
        };
        let raw: HashMap<String, u64> = conn.hgetall(STATS_KEY).await.unwrap_or_default();
        CacheCounters {
            hits: raw.get("hits").copied().unwrap_or(0),
            misses: raw.get("misses").copied().unwrap_or(0),
            partial_hits: raw.get("partialHits").copied().unwrap_or(0),
            extensions: raw.get("extensions").copied().unwrap_or(0),
            merges: raw.get("merges").copied().unwrap_or(0),
            evictions: raw.get("evictions").copied().unwrap_or(0),
        }
    }

    /// Fire-and-forget counter increment: spawned so it never blocks
    /// request-serving; failures are logged, never propagated. The `_stats`
    /// hash carries the same TTL as segments, so counters are naturally
    /// zeroed (by Redis expiry) once `now - lastActivity > TTL`, matching
    /// the "restore only if still fresh" rule without extra bookkeeping.
    fn bump(&self, field: CounterField) {
        let Backend::Redis(conn) = &self.backend else {
            return;
        };
        let mut conn = conn.clone();
        let ttl = self.config.ttl_seconds;
        tokio::spawn(async move {
            let field_name = field.as_field();
            if let Err(e) = conn
                .hincr::<_, _, _, ()>(STATS_KEY, field_name, 1i64)
                .await
            {
                tracing::warn!(field = field_name, error = %e, "stats counter update failed");
                return;
            }
            let _: Result<(), _> = conn.expire(STATS_KEY, ttl as i64).await;
        });
    }
}

#[derive(Debug, Clone, Copy)]
enum CounterField {
    Hits,
    Misses,
    PartialHits,
    Extensions,
    Merges,
    Evictions,
}

impl CounterField {
    fn as_field(&self) -> &'static str {
        match self {
            CounterField::Hits => "hits",
            CounterField::Misses => "misses",
            CounterField::PartialHits => "partialHits",
            CounterField::Extensions => "extensions",
            CounterField::Merges => "merges",
            CounterField::Evictions => "evictions",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let mut manager = CacheManager::connect(config).await.unwrap();
        let tf = Timeframe::parse("1h").unwrap();
        let result = manager.get("BTCUSDT", tf, 10, None).await.unwrap();
        assert_eq!(result.coverage, Coverage::None);
        assert!(result.bars.is_empty());
    }

    // Live-Redis tests follow kamoussa-solbot's convention: #[ignore]-gated
    // so `cargo test` stays hermetic without a running Redis instance.

    #[tokio::test]
    #[ignore]
    async fn full_hit_after_set() {
        let mut manager = CacheManager::connect(CacheConfig::default()).await.unwrap();
        let tf = Timeframe::parse("1h").unwrap();
        let base = chrono::Utc::now();
        let bars: Vec<Bar> = (0..500)
            .map(|i| Bar {
                timestamp: base + chrono::Duration::hours(i),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.5,
                volume: 10.0,
                vwap: None,
            })
            .collect();
        let last_ts = bars.last().unwrap().timestamp.timestamp_millis();
        manager.set("S1-TEST", tf, bars).await.unwrap();

        let result = manager.get("S1-TEST", tf, 200, Some(last_ts)).await.unwrap();
        assert_eq!(result.coverage, Coverage::Full);
        assert_eq!(result.bars.len(), 200);

        manager.clear(Some("S1-TEST"), Some(tf)).await.unwrap();
    }
}
