//! Purge policy (SPEC_FULL.md §4.H): after every successful write, trim the
//! storage directory so it simultaneously satisfies the configured
//! count/age/quota limits. Policies union: an entry survives only if every
//! *configured* policy keeps it; an unconfigured (`None`) policy imposes no
//! constraint. A zero or negative limit purges everything under that policy.
//!
//! Kept as pure functions over an in-memory entry list so the scanning (and
//! its fallible `fs::metadata` calls) stays in `storage.rs`, where the
//! errors already have somewhere to go.

use std::collections::BTreeSet;
use std::time::SystemTime;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CryptainerEntry {
    pub name: String,
    pub mtime: SystemTime,
    pub size_bytes: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PurgeLimits {
    pub max_cryptainer_count: Option<i64>,
    pub max_cryptainer_age_secs: Option<i64>,
    pub max_cryptainer_quota_bytes: Option<i64>,
}

/// Names to delete, given the directory's current entries and `now`. The
/// returned set is the union of each configured policy's rejects.
pub fn entries_to_purge(entries: &[CryptainerEntry], limits: PurgeLimits, now: SystemTime) -> BTreeSet<String> {
    let mut doomed = BTreeSet::new();

    if let Some(max_count) = limits.max_cryptainer_count {
        doomed.extend(purge_by_count(entries, max_count));
    }
    if let Some(max_age_secs) = limits.max_cryptainer_age_secs {
        doomed.extend(purge_by_age(entries, max_age_secs, now));
    }
    if let Some(max_quota) = limits.max_cryptainer_quota_bytes {
        doomed.extend(purge_by_quota(entries, max_quota));
    }

    doomed
}

fn purge_by_count(entries: &[CryptainerEntry], max_count: i64) -> Vec<String> {
    if max_count <= 0 {
        return entries.iter().map(|e| e.name.clone()).collect();
    }
    let keep = max_count as usize;
    if entries.len() <= keep {
        return Vec::new();
    }

    let mut sorted: Vec<&CryptainerEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.mtime.cmp(&b.mtime).then_with(|| a.name.cmp(&b.name)));
    let excess = sorted.len() - keep;
    sorted.into_iter().take(excess).map(|e| e.name.clone()).collect()
}

fn purge_by_age(entries: &[CryptainerEntry], max_age_secs: i64, now: SystemTime) -> Vec<String> {
    if max_age_secs <= 0 {
        return entries.iter().map(|e| e.name.clone()).collect();
    }
    let max_age = std::time::Duration::from_secs(max_age_secs as u64);
    entries
        .iter()
        .filter(|e| now.duration_since(e.mtime).map(|age| age > max_age).unwrap_or(false))
        .map(|e| e.name.clone())
        .collect()
}

fn purge_by_quota(entries: &[CryptainerEntry], max_quota: i64) -> Vec<String> {
    if max_quota <= 0 {
        return entries.iter().map(|e| e.name.clone()).collect();
    }
    let quota = max_quota as u64;

    let mut sorted: Vec<&CryptainerEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| b.mtime.cmp(&a.mtime).then_with(|| a.name.cmp(&b.name)));

    let mut running = 0u64;
    let mut doomed = Vec::new();
    for entry in sorted {
        running += entry.size_bytes;
        if running > quota {
            doomed.push(entry.name.clone());
        }
    }
    doomed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(name: &str, mtime_offset_secs: u64, size: u64) -> CryptainerEntry {
        CryptainerEntry {
            name: name.to_string(),
            mtime: SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_offset_secs),
            size_bytes: size,
        }
    }

    #[test]
    fn count_policy_keeps_newest_and_breaks_ties_by_name() {
        let entries = vec![entry("a", 10, 1), entry("b", 10, 1), entry("c", 20, 1)];
        let limits = PurgeLimits { max_cryptainer_count: Some(2), ..Default::default() };
        let doomed = entries_to_purge(&entries, limits, SystemTime::UNIX_EPOCH + Duration::from_secs(100));
        assert_eq!(doomed, BTreeSet::from(["a".to_string()]));
    }

    #[test]
    fn age_policy_drops_anything_older_than_the_window() {
        let entries = vec![entry("fresh", 95, 1), entry("stale", 10, 1)];
        let limits = PurgeLimits { max_cryptainer_age_secs: Some(20), ..Default::default() };
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let doomed = entries_to_purge(&entries, limits, now);
        assert_eq!(doomed, BTreeSet::from(["stale".to_string()]));
    }

    #[test]
    fn quota_policy_keeps_newest_entries_under_the_byte_budget() {
        let entries = vec![entry("newest", 30, 40), entry("middle", 20, 40), entry("oldest", 10, 40)];
        let limits = PurgeLimits { max_cryptainer_quota_bytes: Some(50), ..Default::default() };
        let doomed = entries_to_purge(&entries, limits, SystemTime::UNIX_EPOCH + Duration::from_secs(100));
        assert_eq!(doomed, BTreeSet::from(["middle".to_string(), "oldest".to_string()]));
    }

    #[test]
    fn zero_limit_purges_everything_under_that_policy() {
        let entries = vec![entry("a", 10, 1)];
        let limits = PurgeLimits { max_cryptainer_count: Some(0), ..Default::default() };
        let doomed = entries_to_purge(&entries, limits, SystemTime::UNIX_EPOCH + Duration::from_secs(100));
        assert_eq!(doomed, BTreeSet::from(["a".to_string()]));
    }

    #[test]
    fn policies_union_their_rejects() {
        let entries = vec![entry("a", 10, 100), entry("b", 20, 1)];
        let limits = PurgeLimits {
            max_cryptainer_count: Some(5),
            max_cryptainer_quota_bytes: Some(50),
            ..Default::default()
        };
        let doomed = entries_to_purge(&entries, limits, SystemTime::UNIX_EPOCH + Duration::from_secs(100));
        assert_eq!(doomed, BTreeSet::from(["a".to_string()]));
    }
}
