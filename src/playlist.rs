use std::collections::HashSet;

use crate::resolver::{StreamEntry, StreamStatus};

pub const HEADER: &str = "#EXTM3U";
pub const UPCOMING_MARKER: &str = "[UPCOMING] ";

#[derive(Debug, Clone, Default)]
pub struct PlaylistOptions {
    /// Fixed `group-title` for every entry instead of the channel name.
    pub group_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub text: String,
    pub count: usize,
}

impl Playlist {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Accumulates entries into an extended M3U document, one `#EXTINF` line
/// and one URL line per stream.
pub struct PlaylistBuilder {
    options: PlaylistOptions,
    text: String,
    count: usize,
    seen: HashSet<String>,
}

/// Makes a value safe to interpolate into an `#EXTINF` line. Commas end the
/// attribute list, quotes end an attribute value and line breaks end the
/// entry.
pub fn sanitize(field: &str) -> String {
    field
        .chars()
        .map(|c| match c {
            ',' => ' ',
            '"' => '\'',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

impl PlaylistBuilder {
    pub fn new(options: PlaylistOptions) -> Self {
        Self {
            options,
            text: format!("{}\n", HEADER),
            count: 0,
            seen: HashSet::new(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Appends an entry. Returns false when the id was already written or
    /// the URL cannot be put on a single line.
    pub fn push(&mut self, entry: &StreamEntry) -> bool {
        let url = entry.url.trim();
        if url.is_empty() || url.chars().any(char::is_whitespace) {
            warn!("Refusing unusable URL for {}", entry.id);
            return false;
        }
        if !self.seen.insert(entry.id.clone()) {
            return false;
        }

        let channel = sanitize(&entry.channel);
        let group = self
            .options
            .group_title
            .as_deref()
            .map(sanitize)
            .unwrap_or_else(|| channel.clone());
        let marker = match entry.status {
            StreamStatus::Live => "",
            StreamStatus::Upcoming => UPCOMING_MARKER,
        };

        self.text.push_str(&format!(
            "#EXTINF:-1 group-title=\"{}\", {} | {}{}\n{}\n",
            group,
            channel,
            marker,
            sanitize(&entry.title),
            url,
        ));
        self.count += 1;

        true
    }

    pub fn finish(self) -> Playlist {
        Playlist {
            text: self.text,
            count: self.count,
        }
    }
}
