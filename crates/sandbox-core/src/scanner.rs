//! Artifact Scanner: snapshots the data directory and
//! diffs two snapshots to compute an artifact delta.

use crate::driver::{ContainerDriver, ExecOutput};
use crate::error::SandboxError;
use crate::models::Snapshot;
use std::collections::HashSet;

/// Shell one-liner that lists top-level regular files under `/mnt/data/`
/// as `name\tsize\tmtime` lines — a single exec round trip per snapshot.
pub const SNAPSHOT_CMD: &str =
    "for f in /mnt/data/*; do [ -f \"$f\" ] && stat -c '%n\t%s\t%Y' \"$f\"; done";

pub async fn snapshot<D: ContainerDriver>(
    driver: &D,
    handle: &D::Handle,
) -> Result<Snapshot, SandboxError> {
    let argv = vec![
        "sh".to_string(),
        "-c".to_string(),
        SNAPSHOT_CMD.to_string(),
    ];
    let ExecOutput { stdout, .. } = driver
        .exec(handle, &argv, "/")
        .await
        .map_err(SandboxError::from)?;

    parse_snapshot(&String::from_utf8_lossy(&stdout))
}

fn parse_snapshot(raw: &str) -> Result<Snapshot, SandboxError> {
    let mut snapshot = Snapshot::new();
    for line in raw.lines() {
        let mut parts = line.splitn(3, '\t');
        let (Some(name), Some(size), Some(mtime)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        // `stat -c '%n'` prints the full glob match, e.g. "/mnt/data/out.csv".
        let name = name.rsplit('/').next().unwrap_or(name).to_string();
        let size: u64 = size.trim().parse().unwrap_or(0);
        let mtime: f64 = mtime.trim().parse().unwrap_or(0.0);
        snapshot.insert(name, (size, mtime));
    }
    Ok(snapshot)
}

/// New-or-changed files: absent in `before`, or present with a different
/// mtime. Deletions are never reported; size+mtime ties are treated as
/// unchanged even if contents differ — an accepted limitation, since `list`
/// remains the authoritative enumeration.
pub fn diff(before: &Snapshot, after: &Snapshot) -> HashSet<String> {
    after
        .iter()
        .filter(|(name, (_, mtime))| match before.get(*name) {
            None => true,
            Some((_, before_mtime)) => before_mtime != mtime,
        })
        .map(|(name, _)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tab_separated_listing() {
        let raw = "/mnt/data/a.csv\t10\t1000\n/mnt/data/b.png\t2048\t1001\n";
        let snap = parse_snapshot(raw).unwrap();
        assert_eq!(snap.get("a.csv"), Some(&(10, 1000.0)));
        assert_eq!(snap.get("b.png"), Some(&(2048, 1001.0)));
    }

    #[test]
    fn diff_reports_new_and_changed_not_deleted() {
        let mut before = Snapshot::new();
        before.insert("in.csv".to_string(), (8, 100.0));
        before.insert("stale.txt".to_string(), (1, 100.0));

        let mut after = Snapshot::new();
        after.insert("in.csv".to_string(), (8, 100.0)); // unchanged
        after.insert("out.txt".to_string(), (2, 200.0)); // new
        // stale.txt deleted — must not appear in diff

        let changed = diff(&before, &after);
        assert_eq!(changed, HashSet::from(["out.txt".to_string()]));
    }

    #[test]
    fn diff_treats_equal_size_and_mtime_as_unchanged() {
        let mut before = Snapshot::new();
        before.insert("f.txt".to_string(), (5, 100.0));
        let mut after = Snapshot::new();
        // Same size and mtime even though a real overwrite would have
        // changed contents — the accepted false negative.
        after.insert("f.txt".to_string(), (5, 100.0));

        assert!(diff(&before, &after).is_empty());
    }
}
