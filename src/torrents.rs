use crate::qbittorrent::{Error, Torrent, TorrentApi, TorrentFile};

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt::Display;

use chrono::{Local, TimeZone};
use chrono_tz::Tz;

/// Longer names are cut in listings
pub const NAME_DISPLAY_LEN: usize = 60;

const BYTES_PER_GB: f64 = 1e9;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d, %I:%M:%S %p %Z";

/// High level torrent operations, formatted for chat.
pub struct Torrents<A> {
    api: A,
    default_category: String,
}

impl<A: TorrentApi> Torrents<A> {
    pub fn new(api: A, default_category: impl Into<String>) -> Self {
        Self {
            api,
            default_category: default_category.into(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// One line per torrent, in the order qBittorrent returns them.
    pub async fn list(&self) -> Result<String, Error> {
        let torrents = self.api.torrents().await?;
        Ok(torrents
            .iter()
            .map(|t| {
                format!(
                    "{}: {} ({}/{})\n",
                    t.short_hash(),
                    display_name(&t.name),
                    t.category,
                    t.state
                )
            })
            .collect())
    }

    pub async fn info(&self, short_hash: &str) -> Result<String, Error> {
        let torrent = self.find(short_hash).await?;
        Ok(match local_zone() {
            Some(zone) => report(&torrent, &zone),
            None => report(&torrent, &Local),
        })
    }

    async fn find(&self, short_hash: &str) -> Result<Torrent, Error> {
        let mut matches = self
            .api
            .torrents()
            .await?
            .into_iter()
            .filter(|t| t.short_hash().eq_ignore_ascii_case(short_hash));

        match (matches.next(), matches.next()) {
            (Some(torrent), None) => Ok(torrent),
            (Some(_), Some(_)) => Err(Error::Ambiguous(short_hash.to_string())),
            (None, _) => Err(Error::NotFound),
        }
    }

    pub async fn add(&self, links: &[String]) -> Result<(), Error> {
        self.api.add(links, &self.default_category).await
    }

    pub async fn delete(&self, hashes: &[String]) -> Result<(), Error> {
        self.api.delete(hashes, true).await
    }

    pub async fn pause(&self, hashes: &[String]) -> Result<(), Error> {
        self.api.pause(hashes).await
    }

    pub async fn resume(&self, hashes: &[String]) -> Result<(), Error> {
        self.api.resume(hashes).await
    }

    pub async fn rename(&self, hash: &str, name: &str) -> Result<(), Error> {
        self.api.rename(hash, name).await
    }

    pub async fn change_category(&self, category: &str, hashes: &[String]) -> Result<(), Error> {
        self.api.set_category(hashes, category).await
    }

    pub async fn file_info(&self, hash: &str) -> Result<String, Error> {
        let files = self.api.files(hash).await?;
        Ok(files
            .iter()
            .map(|f| {
                format!(
                    "{} ({:.2}GB) ({:.3})\n",
                    f.name,
                    f.size as f64 / BYTES_PER_GB,
                    f.progress
                )
            })
            .collect())
    }

    pub async fn rename_file(&self, hash: &str, old_path: &str, new_path: &str) -> Result<(), Error> {
        self.api.rename_file(hash, old_path, new_path).await
    }

    /// Removes `substring` from every file path and from the torrent name.
    ///
    /// Every new name is computed and checked before anything is renamed.
    /// Once renaming starts, a failure leaves earlier renames in place.
    pub async fn strip(&self, hash: &str, substring: &str) -> Result<(), Error> {
        let files = self.api.files(hash).await?;
        let torrent = self
            .api
            .torrents()
            .await?
            .into_iter()
            .find(|t| t.hash.eq_ignore_ascii_case(hash))
            .ok_or(Error::NotFound)?;

        let plan = StripPlan::new(&torrent.name, &files, substring)?;
        log::info!(
            "Stripping `{substring}` from {}: {} file(s) to rename",
            torrent.short_hash(),
            plan.files.len()
        );

        for (old_path, new_path) in &plan.files {
            self.api.rename_file(hash, old_path, new_path).await?;
        }
        if let Some(name) = &plan.name {
            self.api.rename(hash, name).await?;
        }

        Ok(())
    }
}

pub fn display_name(name: &str) -> Cow<'_, str> {
    match name.char_indices().nth(NAME_DISPLAY_LEN) {
        Some((cut, _)) => Cow::Owned(format!("{}...", &name[..cut])),
        None => Cow::Borrowed(name),
    }
}

/// The system's IANA zone, whose offsets print as abbreviations (`CEST`)
fn local_zone() -> Option<Tz> {
    match iana_time_zone::get_timezone() {
        Ok(name) => name.parse().ok(),
        Err(err) => {
            log::debug!("Unable to find the local time zone: {err}");
            None
        }
    }
}

pub fn format_timestamp<Z>(secs: i64, tz: &Z) -> String
where
    Z: TimeZone,
    Z::Offset: Display,
{
    tz.timestamp_opt(secs, 0)
        .single()
        .map(|time| time.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

pub fn report<Z>(torrent: &Torrent, tz: &Z) -> String
where
    Z: TimeZone,
    Z::Offset: Display,
{
    let completed_on = if torrent.is_completed() {
        format!(" {}", format_timestamp(torrent.completion_on, tz))
    } else {
        String::new()
    };

    format!(
        "Name: {}\nHash: {}\nCategory: {}\nState: {}\nProgress: {:.1}%\nSize: {:.2}GB\nAdded On: {}\nCompleted On:{}\n",
        torrent.name,
        torrent.hash,
        torrent.category,
        torrent.state,
        torrent.progress * 100.0,
        torrent.total_size as f64 / BYTES_PER_GB,
        format_timestamp(torrent.added_on, tz),
        completed_on,
    )
}

/// Renames needed to strip a substring from a torrent.
#[derive(Debug, PartialEq)]
pub struct StripPlan {
    /// `(old_path, new_path)`, unchanged files left out
    pub files: Vec<(String, String)>,
    pub name: Option<String>,
}

impl StripPlan {
    pub fn new(name: &str, files: &[TorrentFile], substring: &str) -> Result<Self, Error> {
        let mut targets = HashSet::with_capacity(files.len());
        let mut renames = Vec::new();

        for file in files {
            let new_path = file.name.replace(substring, "");
            if !is_valid_path(&new_path) {
                return Err(Error::InvalidArgument(format!(
                    "`{}` would become `{new_path}`",
                    file.name
                )));
            }
            if !targets.insert(new_path.clone()) {
                return Err(Error::Conflict(format!(
                    "more than one file would be named `{new_path}`"
                )));
            }
            if new_path != file.name {
                renames.push((file.name.clone(), new_path));
            }
        }

        let new_name = name.replace(substring, "");
        if new_name.trim().is_empty() {
            return Err(Error::InvalidArgument(format!(
                "torrent `{name}` would lose its name"
            )));
        }

        Ok(StripPlan {
            files: renames,
            name: (new_name != name).then_some(new_name),
        })
    }
}

fn is_valid_path(path: &str) -> bool {
    !path.is_empty() && path.split('/').all(|segment| !segment.trim().is_empty())
}
