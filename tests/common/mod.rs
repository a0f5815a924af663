#![allow(dead_code)]

use anyhow::{anyhow, Result};
use awsusers::directory::{Directory, Page, Principal};
use awsusers::progress::ProgressReporter;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory directory serving fixed pages and group memberships
#[derive(Default)]
pub struct FakeDirectory {
    pages: Vec<Vec<Principal>>,
    groups: HashMap<String, Vec<String>>,
    failing_users: HashSet<String>,
    failing_page: Option<usize>,
    max_latency_ms: u64,
    pub page_calls: AtomicUsize,
    pub group_calls: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl FakeDirectory {
    /// Single page holding `names`
    pub fn with_users(names: &[&str]) -> Self {
        Self::with_pages(&[names])
    }

    /// One page per slice; page `i` links to page `i + 1` with token `"page-{i+1}"`
    pub fn with_pages(pages: &[&[&str]]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|names| names.iter().map(|n| Principal::new(*n)).collect())
                .collect(),
            ..Self::default()
        }
    }

    pub fn groups(mut self, user: &str, groups: &[&str]) -> Self {
        self.groups.insert(
            user.to_string(),
            groups.iter().map(|g| g.to_string()).collect(),
        );
        self
    }

    pub fn failing_groups_for(mut self, user: &str) -> Self {
        self.failing_users.insert(user.to_string());
        self
    }

    pub fn failing_page(mut self, index: usize) -> Self {
        self.failing_page = Some(index);
        self
    }

    pub fn random_latency(mut self, max_ms: u64) -> Self {
        self.max_latency_ms = max_ms;
        self
    }
}

impl Directory for FakeDirectory {
    async fn list_principals_page(&self, token: Option<String>) -> Result<Page> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);

        let index = match token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| anyhow!("unknown token {}", token))?,
        };

        if self.failing_page == Some(index) {
            return Err(anyhow!("page {} unavailable", index));
        }

        let principals = self.pages.get(index).cloned().unwrap_or_default();
        if index + 1 < self.pages.len() {
            Ok(Page::with_next(principals, format!("page-{}", index + 1)))
        } else {
            Ok(Page::last(principals))
        }
    }

    async fn list_groups_for_principal(&self, name: &str) -> Result<Vec<String>> {
        self.group_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        if self.max_latency_ms > 0 {
            let delay = {
                let mut rng = rand::thread_rng();
                rng.gen_range(0..=self.max_latency_ms)
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing_users.contains(name) {
            return Err(anyhow!("Throttling: rate exceeded for {}", name));
        }
        Ok(self.groups.get(name).cloned().unwrap_or_default())
    }
}

/// Progress reporter that records every call
#[derive(Default)]
pub struct RecordingProgress {
    pub calls: Mutex<Vec<(usize, usize)>>,
}

impl RecordingProgress {
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, completed: usize, total: usize) {
        self.calls.lock().unwrap().push((completed, total));
    }
}
