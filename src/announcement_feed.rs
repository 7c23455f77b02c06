//! Announcement Feed
//!
//! Polls the panel's announcements for every visible registry entry and
//! hands out each announcement once per process.

use crate::panel_client::{Announcement, PanelClient};
use crate::server_registry::ServerSummary;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Source of per-server announcements
#[async_trait]
pub trait AnnouncementSource: Send + Sync {
    async fn announcements(&self, server_id: &str) -> crate::Result<Vec<Announcement>>;
}

#[async_trait]
impl AnnouncementSource for PanelClient {
    async fn announcements(&self, server_id: &str) -> crate::Result<Vec<Announcement>> {
        PanelClient::announcements(self, server_id).await
    }
}

/// An unseen announcement and the server it came from
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub server: ServerSummary,
    pub announcement: Announcement,
}

impl FeedItem {
    /// `[server] title`
    pub fn heading(&self) -> String {
        format!("[{}] {}", self.server.name, self.announcement.title)
    }
}

/// Tracks announcement ids already handed out
#[derive(Debug, Default)]
pub struct AnnouncementTracker {
    seen: HashSet<String>,
}

impl AnnouncementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Keep only announcements not handed out before and mark them seen.
    /// Announcements without an id are dropped.
    pub fn filter_unseen(&mut self, announcements: Vec<Announcement>) -> Vec<Announcement> {
        announcements
            .into_iter()
            .filter(|a| match &a.id {
                Some(id) => self.seen.insert(id.clone()),
                None => {
                    debug!(title = %a.title, "Announcement without id ignored");
                    false
                }
            })
            .collect()
    }

    /// Poll every non-hidden server. A failing server is logged and skipped.
    pub async fn poll(
        &mut self,
        source: &dyn AnnouncementSource,
        servers: &[ServerSummary],
    ) -> Vec<FeedItem> {
        let mut items = Vec::new();

        for server in servers.iter().filter(|s| !s.hidden) {
            match source.announcements(&server.remote_id).await {
                Ok(announcements) => {
                    for announcement in self.filter_unseen(announcements) {
                        items.push(FeedItem {
                            server: server.clone(),
                            announcement,
                        });
                    }
                }
                Err(e) => {
                    warn!(
                        server_id = %server.remote_id,
                        server_name = %server.name,
                        error = %e,
                        "Failed to check announcements"
                    );
                }
            }
        }

        if !items.is_empty() {
            debug!(new_announcements = items.len(), "Announcement poll finished");
        }
        items
    }
}

/// Strip markup from an announcement body and decode common entities
pub fn plain_text(raw_html: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());

    tags.replace_all(raw_html, "")
        .trim()
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
