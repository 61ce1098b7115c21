//! In-memory reference implementation of the [`KvStore`] port.
//!
//! Entries expire lazily: reads, scans, and type checks treat an expired
//! entry as absent and remove it on touch. Sorted sets are kept unordered
//! internally and sorted at query time; fine for the cache's working set
//! sizes and keeps writes O(1).

use crate::error::Result;
use crate::kv::{KvStore, KvValueKind, ScoredMember};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory KV store with TTL expiry and sorted sets.
#[derive(Default)]
pub struct MemoryKv {
    strings: RwLock<HashMap<String, Entry>>,
    zsets: RwLock<HashMap<String, HashMap<String, f64>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining TTL of a live key (test/diagnostic helper, not on the port).
    pub async fn ttl_of(&self, key: &str) -> Option<Duration> {
        let strings = self.strings.read().await;
        let entry = strings.get(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.expires_at.duration_since(Instant::now()))
    }
}

impl std::fmt::Debug for MemoryKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKv").finish_non_exhaustive()
    }
}

/// Glob match supporting `*` (any run) and `?` (any single char).
fn glob_match(pattern: &str, input: &str) -> bool {
    fn inner(p: &[u8], s: &[u8]) -> bool {
        match (p.first(), s.first()) {
            (None, None) => true,
            (Some(b'*'), _) => inner(&p[1..], s) || (!s.is_empty() && inner(p, &s[1..])),
            (Some(b'?'), Some(_)) => inner(&p[1..], &s[1..]),
            (Some(pc), Some(sc)) if pc == sc => inner(&p[1..], &s[1..]),
            _ => false,
        }
    }
    inner(pattern.as_bytes(), input.as_bytes())
}

/// Sort ascending by (score, member); reverse flips the whole order.
fn rank_sorted(members: &HashMap<String, f64>, reverse: bool) -> Vec<ScoredMember> {
    let mut out: Vec<ScoredMember> = members
        .iter()
        .map(|(m, s)| ScoredMember {
            member: m.clone(),
            score: *s,
        })
        .collect();
    out.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.member.cmp(&b.member))
    });
    if reverse {
        out.reverse();
    }
    out
}

/// Resolve Redis-style inclusive range indices against a list length.
fn resolve_range(start: isize, stop: isize, len: usize) -> Option<(usize, usize)> {
    let len = len as isize;
    let s = if start < 0 { (len + start).max(0) } else { start };
    let e = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if s > e || s >= len || e < 0 {
        return None;
    }
    Some((s as usize, e as usize))
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        {
            let strings = self.strings.read().await;
            match strings.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: drop it under the write lock
        self.strings.write().await.remove(key);
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: Instant::now() + ttl,
        };
        self.strings.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut strings = self.strings.write().await;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = strings.remove(key) {
                if !entry.is_expired() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let strings = self.strings.read().await;
        let mut keys: Vec<String> = strings
            .iter()
            .filter(|(k, e)| !e.is_expired() && glob_match(pattern, k))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn key_type(&self, key: &str) -> Result<Option<KvValueKind>> {
        {
            let strings = self.strings.read().await;
            if let Some(entry) = strings.get(key) {
                if !entry.is_expired() {
                    return Ok(Some(KvValueKind::String));
                }
            }
        }
        let zsets = self.zsets.read().await;
        if zsets.contains_key(key) {
            return Ok(Some(KvValueKind::SortedSet));
        }
        Ok(None)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut strings = self.strings.write().await;
        match strings.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.expires_at = Instant::now() + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn zadd(&self, set: &str, member: &str, score: f64) -> Result<()> {
        let mut zsets = self.zsets.write().await;
        zsets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrange(
        &self,
        set: &str,
        start: isize,
        stop: isize,
        reverse: bool,
    ) -> Result<Vec<ScoredMember>> {
        let zsets = self.zsets.read().await;
        let Some(members) = zsets.get(set) else {
            return Ok(Vec::new());
        };
        let ranked = rank_sorted(members, reverse);
        let Some((s, e)) = resolve_range(start, stop, ranked.len()) else {
            return Ok(Vec::new());
        };
        Ok(ranked[s..=e].to_vec())
    }

    async fn zrange_by_score(&self, set: &str, min: f64, max: f64) -> Result<Vec<ScoredMember>> {
        let zsets = self.zsets.read().await;
        let Some(members) = zsets.get(set) else {
            return Ok(Vec::new());
        };
        Ok(rank_sorted(members, false)
            .into_iter()
            .filter(|m| m.score >= min && m.score <= max)
            .collect())
    }

    async fn zrem(&self, set: &str, members: &[String]) -> Result<u64> {
        let mut zsets = self.zsets.write().await;
        let Some(entries) = zsets.get_mut(set) else {
            return Ok(0);
        };
        let mut removed = 0;
        for m in members {
            if entries.remove(m).is_some() {
                removed += 1;
            }
        }
        if entries.is_empty() {
            zsets.remove(set);
        }
        Ok(removed)
    }

    async fn zrem_range_by_score(&self, set: &str, min: f64, max: f64) -> Result<u64> {
        let mut zsets = self.zsets.write().await;
        let Some(entries) = zsets.get_mut(set) else {
            return Ok(0);
        };
        let before = entries.len();
        entries.retain(|_, s| *s < min || *s > max);
        let removed = (before - entries.len()) as u64;
        if entries.is_empty() {
            zsets.remove(set);
        }
        Ok(removed)
    }

    async fn flush_all(&self) -> Result<()> {
        self.strings.write().await.clear();
        self.zsets.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_del() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("k1", b"v1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(kv.get("k1").await.unwrap(), Some(b"v1".to_vec()));
        assert_eq!(kv.del(&["k1".to_string()]).await.unwrap(), 1);
        assert_eq!(kv.get("k1").await.unwrap(), None);
        assert_eq!(kv.del(&["k1".to_string()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("k", b"v", Duration::from_millis(20))
            .await
            .unwrap();
        assert!(kv.get("k").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(kv.get("k").await.unwrap().is_none());
        assert!(kv.scan("*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expire_resets_ttl() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("k", b"v", Duration::from_millis(20))
            .await
            .unwrap();
        assert!(kv.expire("k", Duration::from_secs(60)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(kv.get("k").await.unwrap().is_some());
        assert!(!kv.expire("missing", Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_glob() {
        let kv = MemoryKv::new();
        for key in ["geo:abc:5", "geo:abc:10", "geo:xyz:5", "other"] {
            kv.set_with_ttl(key, b"v", Duration::from_secs(60))
                .await
                .unwrap();
        }
        assert_eq!(
            kv.scan("geo:abc:*").await.unwrap(),
            vec!["geo:abc:10", "geo:abc:5"]
        );
        assert_eq!(kv.scan("geo:*").await.unwrap().len(), 3);
        assert_eq!(kv.scan("geo:???:5").await.unwrap().len(), 2);
        assert_eq!(kv.scan("nomatch:*").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_zset_ordering_and_ranges() {
        let kv = MemoryKv::new();
        kv.zadd("idx", "a", 0.3).await.unwrap();
        kv.zadd("idx", "b", 0.9).await.unwrap();
        kv.zadd("idx", "c", 0.6).await.unwrap();

        let asc = kv.zrange("idx", 0, -1, false).await.unwrap();
        let names: Vec<&str> = asc.iter().map(|m| m.member.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "b"]);

        let top2 = kv.zrange("idx", 0, 1, true).await.unwrap();
        let names: Vec<&str> = top2.iter().map(|m| m.member.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);

        let mid = kv.zrange_by_score("idx", 0.5, 0.7).await.unwrap();
        assert_eq!(mid.len(), 1);
        assert_eq!(mid[0].member, "c");
    }

    #[tokio::test]
    async fn test_zadd_updates_score() {
        let kv = MemoryKv::new();
        kv.zadd("idx", "a", 0.2).await.unwrap();
        kv.zadd("idx", "a", 0.8).await.unwrap();
        let all = kv.zrange("idx", 0, -1, false).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!((all[0].score - 0.8).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_zrem_and_range_removal() {
        let kv = MemoryKv::new();
        for (m, s) in [("a", 0.1), ("b", 0.4), ("c", 0.8)] {
            kv.zadd("idx", m, s).await.unwrap();
        }
        assert_eq!(kv.zrem("idx", &["a".to_string()]).await.unwrap(), 1);
        assert_eq!(
            kv.zrem_range_by_score("idx", f64::NEG_INFINITY, 0.5)
                .await
                .unwrap(),
            1
        );
        let rest = kv.zrange("idx", 0, -1, false).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].member, "c");
    }

    #[tokio::test]
    async fn test_key_type() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("s", b"v", Duration::from_secs(60))
            .await
            .unwrap();
        kv.zadd("z", "m", 1.0).await.unwrap();
        assert_eq!(kv.key_type("s").await.unwrap(), Some(KvValueKind::String));
        assert_eq!(kv.key_type("z").await.unwrap(), Some(KvValueKind::SortedSet));
        assert_eq!(kv.key_type("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_flush_all() {
        let kv = MemoryKv::new();
        kv.set_with_ttl("s", b"v", Duration::from_secs(60))
            .await
            .unwrap();
        kv.zadd("z", "m", 1.0).await.unwrap();
        kv.flush_all().await.unwrap();
        assert!(kv.get("s").await.unwrap().is_none());
        assert!(kv.zrange("z", 0, -1, false).await.unwrap().is_empty());
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("geo:*", "geo:abc:5"));
        assert!(glob_match("geo:abc:*", "geo:abc:5"));
        assert!(!glob_match("geo:abc:*", "geo:abd:5"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("", ""));
        assert!(!glob_match("", "x"));
    }
}
