//! Bounded recent-alerts list with filtered, paginated listing.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::alert::{AlertRecord, SoundAlert};
use super::priority::Priority;

/// Listing request.  `page` is 1-based; `0` is treated as `1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertQuery {
    pub priority: Option<Priority>,
    pub page: usize,
    pub limit: usize,
}

impl Default for AlertQuery {
    fn default() -> Self {
        Self {
            priority: None,
            page: 1,
            limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPage {
    /// Matching alerts before pagination.
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub alerts: Vec<AlertRecord>,
}

/// Oldest alert is evicted once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct AlertFeed {
    alerts: VecDeque<SoundAlert>,
    capacity: usize,
}

impl AlertFeed {
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "AlertFeed capacity must be > 0");
        Self {
            alerts: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, alert: SoundAlert) {
        if self.alerts.len() == self.capacity {
            self.alerts.pop_front();
        }
        self.alerts.push_back(alert);
    }

    /// Copy of every retained alert, oldest first.
    pub fn snapshot(&self) -> Vec<SoundAlert> {
        self.alerts.iter().cloned().collect()
    }

    /// Newest first, filtered by priority, then paginated.
    pub fn query(&self, query: &AlertQuery) -> AlertPage {
        let page = query.page.max(1);
        let matching: Vec<&SoundAlert> = self
            .alerts
            .iter()
            .rev()
            .filter(|a| query.priority.map_or(true, |p| a.priority == p))
            .collect();

        let alerts = matching
            .iter()
            .skip((page - 1).saturating_mul(query.limit))
            .take(query.limit)
            .map(|a| a.to_record())
            .collect();

        AlertPage {
            total: matching.len(),
            page,
            limit: query.limit,
            alerts,
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(id: u64, priority: Priority) -> SoundAlert {
        SoundAlert {
            id,
            event_id: id,
            sound_label: format!("sound {id}"),
            confidence: 0.9,
            direction: None,
            priority,
            timestamp_ms: id * 100,
        }
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut feed = AlertFeed::new(3);
        for id in 1..=5 {
            feed.push(alert(id, Priority::Normal));
        }
        let ids: Vec<u64> = feed.snapshot().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut feed = AlertFeed::new(4);
        feed.push(alert(1, Priority::Low));
        let snap = feed.snapshot();
        feed.push(alert(2, Priority::Low));
        assert_eq!(snap.len(), 1);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn query_is_newest_first_and_paginated() {
        let mut feed = AlertFeed::new(100);
        for id in 1..=25 {
            feed.push(alert(id, Priority::Normal));
        }
        let first = feed.query(&AlertQuery::default());
        assert_eq!(first.total, 25);
        assert_eq!(first.alerts.len(), 10);
        assert_eq!(first.alerts[0].id, 25);

        let last = feed.query(&AlertQuery {
            page: 3,
            ..AlertQuery::default()
        });
        let ids: Vec<u64> = last.alerts.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);

        let beyond = feed.query(&AlertQuery {
            page: 9,
            ..AlertQuery::default()
        });
        assert!(beyond.alerts.is_empty());
        assert_eq!(beyond.total, 25);
    }

    #[test]
    fn query_filters_by_priority() {
        let mut feed = AlertFeed::new(10);
        feed.push(alert(1, Priority::Critical));
        feed.push(alert(2, Priority::Low));
        feed.push(alert(3, Priority::Critical));
        let page = feed.query(&AlertQuery {
            priority: Some(Priority::Critical),
            page: 0,
            limit: 10,
        });
        assert_eq!(page.total, 2);
        assert_eq!(page.page, 1);
        let ids: Vec<u64> = page.alerts.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn zero_capacity_panics() {
        AlertFeed::new(0);
    }
}
