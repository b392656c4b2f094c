//! In-memory username index: a cuckoo filter answers "definitely free" fast,
//! a moka cache answers "recently seen as taken" fast, and the database is
//! the fallback for everything in between.

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static USERNAME_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// true => username is TAKEN
static USERNAME_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000)
        .time_to_live(Duration::from_secs(86400))
        .build()
});

#[inline]
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

fn filter_read() -> RwLockReadGuard<'static, CuckooFilter<String>> {
    USERNAME_FILTER.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn filter_write() -> RwLockWriteGuard<'static, CuckooFilter<String>> {
    USERNAME_FILTER.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Check if a username might exist (false positives possible)
pub fn might_exist(username: &str) -> bool {
    filter_read().contains(&normalize(username))
}

/// Records a newly created username in both layers.
pub async fn remember(username: &str) {
    let username = normalize(username);
    filter_write().add(&username);
    USERNAME_CACHE.insert(username, true).await;
}

/// Drops a deleted or renamed username from both layers.
pub async fn forget(username: &str) {
    let username = normalize(username);
    filter_write().remove(&username);
    USERNAME_CACHE.invalidate(&username).await;
}

pub async fn is_cached_taken(username: &str) -> bool {
    USERNAME_CACHE
        .get(&normalize(username))
        .await
        .unwrap_or(false)
}

/// true  => username AVAILABLE
/// false => username TAKEN
pub async fn is_username_available(username: &str, pool: &MySqlPool) -> bool {
    let username = normalize(username);

    if !might_exist(&username) {
        return true;
    }

    if is_cached_taken(&username).await {
        return false;
    }

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = ? LIMIT 1)",
    )
    .bind(&username)
    .fetch_one(pool)
    .await
    .map(|found| found != 0)
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "Username lookup failed, treating as taken");
        true
    });

    if exists {
        USERNAME_CACHE.insert(username, true).await;
    }

    !exists
}

/// Loads every username into the filter, and recently active ones into the cache.
pub async fn warmup(pool: &MySqlPool, batch_size: usize, recent_days: u32) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT username,
               COALESCE(last_login_at >= NOW() - INTERVAL ? DAY, 0) AS recent
        FROM users
        "#,
    )
    .bind(recent_days)
    .fetch(pool);

    let mut batch: Vec<(String, bool)> = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username, recent) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
        batch.push((normalize(&username), recent != 0));
        total += 1;

        if batch.len() >= batch_size {
            insert_batch(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch).await;
    }

    tracing::info!(total, recent_days, "Username index warmup complete");
    Ok(())
}

async fn insert_batch(usernames: &[(String, bool)]) {
    {
        let mut filter = filter_write();
        for (username, _) in usernames {
            filter.add(username);
        }
    }

    let inserts: Vec<_> = usernames
        .iter()
        .filter(|(_, recent)| *recent)
        .map(|(u, _)| USERNAME_CACHE.insert(u.clone(), true))
        .collect();
    futures::future::join_all(inserts).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn remember_then_forget() {
        let name = "  Index.Test.User ";
        remember(name).await;
        assert!(might_exist("index.test.user"));
        assert!(is_cached_taken("INDEX.TEST.USER").await);

        forget(name).await;
        assert!(!is_cached_taken("index.test.user").await);
    }

    #[test]
    fn unknown_name_is_not_in_filter() {
        assert!(!might_exist("nobody-has-this-name-8c1f"));
    }
}
