use crate::db::repo::ProfileRepo;
use crate::models::profile::SitemapEntry;
use crate::services::callback::SETUP_PROFILE_PATH;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;
use std::sync::Arc;
use tracing::error;
use url::Url;

struct UrlEntry {
    loc: String,
    lastmod: DateTime<Utc>,
    changefreq: &'static str,
    priority: &'static str,
}

pub struct SitemapService {
    profiles: Arc<dyn ProfileRepo>,
    base_url: String,
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn render(entries: &[UrlEntry]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for e in entries {
        // writing into a String cannot fail
        let _ = write!(
            xml,
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>\n",
            xml_escape(&e.loc),
            e.lastmod.to_rfc3339_opts(SecondsFormat::Millis, true),
            e.changefreq,
            e.priority,
        );
    }
    xml.push_str("</urlset>\n");
    xml
}

impl SitemapService {
    pub fn new(profiles: Arc<dyn ProfileRepo>, base_url: &str) -> Self {
        Self {
            profiles,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn generate(&self) -> String {
        self.generate_at(Utc::now()).await
    }

    /// Static pages first, then one entry per profile. If the profiles cannot be
    /// read the static part is still served.
    pub async fn generate_at(&self, now: DateTime<Utc>) -> String {
        let mut entries = self.static_entries(now);
        match self.profiles.sitemap_entries().await {
            Ok(profiles) => entries.extend(profiles.iter().map(|p| self.profile_entry(p))),
            Err(e) => error!(error = %e, "[SitemapService] failed to load profiles, serving basic sitemap"),
        }
        render(&entries)
    }

    fn static_entries(&self, now: DateTime<Utc>) -> Vec<UrlEntry> {
        vec![
            UrlEntry {
                loc: self.base_url.clone(),
                lastmod: now,
                changefreq: "weekly",
                priority: "1.0",
            },
            UrlEntry {
                loc: format!("{}{}", self.base_url, SETUP_PROFILE_PATH),
                lastmod: now,
                changefreq: "monthly",
                priority: "0.7",
            },
        ]
    }

    fn profile_entry(&self, entry: &SitemapEntry) -> UrlEntry {
        UrlEntry {
            loc: self.profile_url(&entry.username),
            lastmod: entry.updated_at,
            changefreq: "weekly",
            priority: "0.8",
        }
    }

    fn profile_url(&self, username: &str) -> String {
        let Ok(mut url) = Url::parse(&self.base_url) else {
            return format!("{}/{}", self.base_url, username);
        };
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().push(username);
            }
            Err(()) => return format!("{}/{}", self.base_url, username),
        }
        url.to_string()
    }
}
