//! Format writers: one envelope and one item renderer per syndication format.

use serde::Serialize;
use time::{
    OffsetDateTime,
    format_description::well_known::{Rfc2822, Rfc3339},
};

use crate::domain::types::FeedFormat;

use super::text::{cdata, comment_text, html_to_text, xml_escape};

/// RSS `<ttl>` when the feed cache is disabled.
const DEFAULT_RSS_TTL_MINUTES: u32 = 60;

/// Feed-level values shared by every format.
#[derive(Debug, Clone)]
pub struct EnvelopeHead {
    pub title: String,
    pub subtitle: String,
    /// Public site URL without trailing slash.
    pub site_url: String,
    pub self_link: String,
    pub rights: String,
    pub generator: String,
    pub updated: OffsetDateTime,
    pub ttl_minutes: Option<u32>,
}

/// One entry as handed to an item renderer.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub url: String,
    pub title: String,
    pub body_html: String,
    pub published_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedWriter {
    Atom,
    Rss,
    Json,
}

impl From<FeedFormat> for FeedWriter {
    fn from(format: FeedFormat) -> Self {
        match format {
            FeedFormat::Atom => FeedWriter::Atom,
            FeedFormat::Rss => FeedWriter::Rss,
            FeedFormat::Json => FeedWriter::Json,
        }
    }
}

impl FeedWriter {
    /// Wrap already rendered `items` in the format's envelope.
    pub fn render_envelope(self, head: &EnvelopeHead, items: &str) -> String {
        match self {
            FeedWriter::Atom => atom_envelope(head, items),
            FeedWriter::Rss => rss_envelope(head, items),
            FeedWriter::Json => json_envelope(head, items),
        }
    }

    /// Render one entry. `is_last` controls the JSON list separator.
    pub fn render_item(self, entry: &FeedEntry, is_last: bool) -> String {
        match self {
            FeedWriter::Atom => atom_item(entry),
            FeedWriter::Rss => rss_item(entry),
            FeedWriter::Json => json_item(entry, is_last),
        }
    }

    /// An annotation inside the item list, or `None` when the format has no comments.
    pub fn render_comment(self, message: &str) -> Option<String> {
        match self {
            FeedWriter::Atom | FeedWriter::Rss => {
                Some(format!("<!-- {} -->\n", comment_text(message)))
            }
            FeedWriter::Json => None,
        }
    }
}

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

fn rfc2822(at: OffsetDateTime) -> String {
    at.format(&Rfc2822).unwrap_or_else(|_| at.to_string())
}

fn atom_envelope(head: &EnvelopeHead, items: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<feed xmlns=\"http://www.w3.org/2005/Atom\">\n  <title>{}</title>\n  <subtitle>{}</subtitle>\n  <link href=\"{}\" rel=\"self\" type=\"application/atom+xml\" />\n  <link href=\"{}/\" rel=\"alternate\" type=\"text/html\" />\n  <id>{}</id>\n  <updated>{}</updated>\n  <rights>{}</rights>\n  <generator>{}</generator>\n{}</feed>\n",
        xml_escape(&head.title),
        xml_escape(&head.subtitle),
        xml_escape(&head.self_link),
        xml_escape(&head.site_url),
        xml_escape(&head.self_link),
        rfc3339(head.updated),
        xml_escape(&head.rights),
        xml_escape(&head.generator),
        items,
    )
}

fn atom_item(entry: &FeedEntry) -> String {
    let authors: String = entry
        .authors
        .iter()
        .map(|name| format!("    <author><name>{}</name></author>\n", xml_escape(name)))
        .collect();

    format!(
        "  <entry>\n    <title>{}</title>\n    <id>{}</id>\n    <updated>{}</updated>\n    <published>{}</published>\n    <link href=\"{}\" />\n    <content type=\"html\">{}</content>\n{}  </entry>\n",
        xml_escape(&entry.title),
        xml_escape(&entry.url),
        rfc3339(entry.modified_at),
        rfc3339(entry.published_at),
        xml_escape(&entry.url),
        cdata(&entry.body_html),
        authors,
    )
}

fn rss_envelope(head: &EnvelopeHead, items: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">\n  <channel>\n    <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\" />\n    <title>{}</title>\n    <link>{}/</link>\n    <description>{}</description>\n    <copyright>{}</copyright>\n    <lastBuildDate>{}</lastBuildDate>\n    <generator>{}</generator>\n    <ttl>{}</ttl>\n{}  </channel>\n</rss>\n",
        xml_escape(&head.self_link),
        xml_escape(&head.title),
        xml_escape(&head.site_url),
        xml_escape(&head.subtitle),
        xml_escape(&head.rights),
        rfc2822(head.updated),
        xml_escape(&head.generator),
        head.ttl_minutes.unwrap_or(DEFAULT_RSS_TTL_MINUTES),
        items,
    )
}

fn rss_item(entry: &FeedEntry) -> String {
    format!(
        "    <item>\n      <title>{}</title>\n      <link>{}</link>\n      <description>{}</description>\n      <guid isPermaLink=\"true\">{}</guid>\n      <pubDate>{}</pubDate>\n    </item>\n",
        xml_escape(&entry.title),
        xml_escape(&entry.url),
        xml_escape(&entry.body_html),
        xml_escape(&entry.url),
        rfc2822(entry.published_at),
    )
}

#[derive(Serialize)]
struct JsonAuthor<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct JsonItem<'a> {
    id: &'a str,
    url: &'a str,
    title: &'a str,
    content_html: &'a str,
    content_text: String,
    date_published: String,
    date_modified: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<JsonAuthor<'a>>,
}

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn json_envelope(head: &EnvelopeHead, items: &str) -> String {
    let user_comment = format!(
        "This feed allows you to read the posts from this site in any feed reader that supports the JSON Feed format. To add this feed to your reader, copy the following URL, {}, and add it your reader.",
        head.self_link
    );

    format!(
        "{{\n\"version\": \"https://jsonfeed.org/version/1\",\n\"user_comment\": {},\n\"title\": {},\n\"description\": {},\n\"home_page_url\": {},\n\"feed_url\": {},\n\"items\": [\n{}]\n}}\n",
        json_string(&user_comment),
        json_string(&head.title),
        json_string(&head.subtitle),
        json_string(&head.site_url),
        json_string(&head.self_link),
        items,
    )
}

fn json_item(entry: &FeedEntry, is_last: bool) -> String {
    let item = JsonItem {
        id: &entry.url,
        url: &entry.url,
        title: &entry.title,
        content_html: &entry.body_html,
        content_text: html_to_text(&entry.body_html),
        date_published: rfc3339(entry.published_at),
        date_modified: rfc3339(entry.modified_at),
        author: entry
            .authors
            .first()
            .map(|name| JsonAuthor { name: name.as_str() }),
    };

    let mut rendered = serde_json::to_string(&item).unwrap_or_else(|_| "{}".to_string());
    rendered.push_str(if is_last { "\n" } else { ",\n" });
    rendered
}
