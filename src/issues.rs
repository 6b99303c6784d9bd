//! Pure grouping and ordering helpers over in-memory issue lists.

use std::collections::BTreeMap;

use crate::types::{Issue, Priority, UNKNOWN_PRIORITY_ORDER};

/// Bucket issues by status id, keeping input order inside each bucket.
pub fn group_by_status(issues: &[Issue]) -> BTreeMap<String, Vec<Issue>> {
    let mut buckets: BTreeMap<String, Vec<Issue>> = BTreeMap::new();
    for issue in issues {
        buckets
            .entry(issue.status.id.clone())
            .or_default()
            .push(issue.clone());
    }
    buckets
}

/// Sort position for a stored priority id. Unknown ids sort after every known
/// level and are reported, never rejected.
pub fn priority_order(priority_id: &str) -> u8 {
    match Priority::from_slug(priority_id) {
        Some(priority) => priority.sort_order(),
        None => {
            tracing::warn!(priority = priority_id, "unknown priority, sorting last");
            UNKNOWN_PRIORITY_ORDER
        }
    }
}

/// Stable sort by priority into a new list; the input is left untouched.
pub fn sort_by_priority(issues: &[Issue]) -> Vec<Issue> {
    let mut keyed: Vec<(u8, &Issue)> = issues
        .iter()
        .map(|issue| (priority_order(&issue.priority.id), issue))
        .collect();
    keyed.sort_by_key(|(order, _)| *order);
    keyed.into_iter().map(|(_, issue)| issue.clone()).collect()
}

/// Order issues by rank, the display order inside a status column.
pub fn sort_by_rank(issues: &[Issue]) -> Vec<Issue> {
    let mut sorted = issues.to_vec();
    sorted.sort_by(|a, b| a.rank.cmp(&b.rank));
    sorted
}

pub fn sort_by_created(issues: &[Issue]) -> Vec<Issue> {
    let mut sorted = issues.to_vec();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted
}

/// Count items per key.
pub fn tally<I, K>(keys: I) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.into()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::rank::Rank;
    use crate::types::{Issue, PriorityInfo, Status};

    pub fn issue(id: &str, status: &str, priority: &str) -> Issue {
        issue_ranked(id, status, priority, "a3c")
    }

    pub fn issue_ranked(id: &str, status: &str, priority: &str, rank: &str) -> Issue {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Issue {
            id: id.to_string(),
            identifier: format!("ENG-{id}"),
            team_id: "team-eng".to_string(),
            title: format!("Issue {id}"),
            description: None,
            status: Status::unresolved(status),
            priority: PriorityInfo::unresolved(priority),
            assignee: None,
            labels: Vec::new(),
            project: None,
            parent: None,
            subissues: Vec::new(),
            rank: Rank::parse(rank).unwrap(),
            created_at: created,
            updated_at: created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{issue, issue_ranked};
    use super::*;

    fn ids(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.id.as_str()).collect()
    }

    fn priorities(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.priority.id.as_str()).collect()
    }

    #[test]
    fn group_by_status_of_empty_list_is_empty() {
        assert!(group_by_status(&[]).is_empty());
    }

    #[test]
    fn group_by_status_partitions_and_keeps_order() {
        let issues = vec![
            issue("1", "todo", "high"),
            issue("2", "in-progress", "low"),
            issue("3", "todo", "medium"),
            issue("4", "done", "urgent"),
        ];

        let grouped = group_by_status(&issues);

        assert_eq!(grouped.len(), 3);
        assert_eq!(ids(&grouped["todo"]), vec!["1", "3"]);
        assert_eq!(ids(&grouped["in-progress"]), vec!["2"]);
        assert_eq!(ids(&grouped["done"]), vec!["4"]);
        let total: usize = grouped.values().map(Vec::len).sum();
        assert_eq!(total, issues.len());
    }

    #[test]
    fn sort_by_priority_orders_known_levels() {
        let issues = vec![
            issue("1", "todo", "low"),
            issue("2", "todo", "urgent"),
            issue("3", "todo", "high"),
            issue("4", "todo", "medium"),
        ];

        let sorted = sort_by_priority(&issues);

        assert_eq!(priorities(&sorted), vec!["urgent", "high", "medium", "low"]);
    }

    #[test]
    fn sort_by_priority_puts_unknown_last() {
        let issues = vec![
            issue("1", "todo", "mystery"),
            issue("2", "todo", "no-priority"),
            issue("3", "todo", "high"),
        ];

        let sorted = sort_by_priority(&issues);

        assert_eq!(priorities(&sorted), vec!["high", "no-priority", "mystery"]);
    }

    #[test]
    fn sort_by_priority_does_not_touch_input() {
        let issues = vec![issue("1", "todo", "low"), issue("2", "todo", "high")];
        let before = issues.clone();

        let sorted = sort_by_priority(&issues);

        assert_eq!(issues, before);
        assert_eq!(ids(&sorted), vec!["2", "1"]);
    }

    #[test]
    fn sort_by_priority_is_stable_and_idempotent() {
        let issues = vec![
            issue("1", "todo", "high"),
            issue("2", "todo", "normal"),
            issue("3", "todo", "high"),
            issue("4", "todo", "medium"),
        ];

        let once = sort_by_priority(&issues);
        let twice = sort_by_priority(&once);

        assert_eq!(ids(&once), vec!["1", "3", "2", "4"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn sort_by_rank_orders_lexicographically() {
        let issues = vec![
            issue_ranked("1", "todo", "low", "a3e"),
            issue_ranked("2", "todo", "low", "a3c"),
            issue_ranked("3", "todo", "low", "a3ci"),
            issue_ranked("4", "todo", "low", "a3d"),
        ];

        assert_eq!(ids(&sort_by_rank(&issues)), vec!["2", "3", "4", "1"]);
    }

    #[test]
    fn tally_counts_keys() {
        let counts = tally(["a", "b", "a"]);
        assert_eq!(counts["a"], 2);
        assert_eq!(counts["b"], 1);
        assert_eq!(counts.values().sum::<u64>(), 3);
    }
}
