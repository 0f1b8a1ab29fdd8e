use crate::config;

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::multipart::Form;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Length of the hash prefix shown to users
pub const SHORT_HASH_LEN: usize = 7;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Torrent {
    pub hash: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub state: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub total_size: i64,
    #[serde(default)]
    pub added_on: i64,
    /// Negative until the download completes
    #[serde(default = "not_completed")]
    pub completion_on: i64,
}

fn not_completed() -> i64 {
    -1
}

impl Torrent {
    pub fn short_hash(&self) -> &str {
        self.hash.get(..SHORT_HASH_LEN).unwrap_or(&self.hash)
    }

    pub fn is_completed(&self) -> bool {
        self.completion_on >= 0
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TorrentFile {
    /// Path relative to the torrent's save path
    pub name: String,
    pub size: i64,
    pub progress: f64,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no such torrent or file")]
    NotFound,
    #[error("short hash `{0}` matches more than one torrent")]
    Ambiguous(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("qBittorrent refused the request")]
    Rejected,
    #[error("qBittorrent rejected the credentials")]
    Unauthorized,
    #[error("unexpected response from qBittorrent: {0}")]
    UnexpectedStatus(StatusCode),
    #[error("unable to reach qBittorrent: {0}")]
    RemoteUnavailable(#[from] reqwest::Error),
}

/// Remote operations the bot needs from a torrent client.
#[async_trait]
pub trait TorrentApi: Send + Sync {
    async fn torrents(&self) -> Result<Vec<Torrent>, Error>;

    async fn files(&self, hash: &str) -> Result<Vec<TorrentFile>, Error>;

    async fn add(&self, urls: &[String], category: &str) -> Result<(), Error>;

    /// `hashes` may be the single literal `all`
    async fn delete(&self, hashes: &[String], delete_files: bool) -> Result<(), Error>;

    async fn pause(&self, hashes: &[String]) -> Result<(), Error>;

    async fn resume(&self, hashes: &[String]) -> Result<(), Error>;

    async fn rename(&self, hash: &str, name: &str) -> Result<(), Error>;

    async fn set_category(&self, hashes: &[String], category: &str) -> Result<(), Error>;

    async fn rename_file(&self, hash: &str, old_path: &str, new_path: &str) -> Result<(), Error>;
}

/// qBittorrent WebUI API v2 client.
///
/// The `SID` session cookie is kept in reqwest's cookie store. Login happens
/// on first use and again whenever the WebUI answers `403 Forbidden`.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    logged_in: AtomicBool,
}

impl Client {
    pub fn new(cfg: &config::QBittorrent) -> Result<Self, Error> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;

        Ok(Self {
            http,
            base_url: cfg.url.to_string(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            logged_in: AtomicBool::new(false),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}api/v2/{method}", self.base_url)
    }

    fn post(&self, method: &str) -> RequestBuilder {
        // The WebUI's CSRF protection wants a Referer matching its host
        self.http
            .post(self.endpoint(method))
            .header(REFERER, &self.base_url)
    }

    fn get(&self, method: &str) -> RequestBuilder {
        self.http
            .get(self.endpoint(method))
            .header(REFERER, &self.base_url)
    }

    async fn login(&self) -> Result<(), Error> {
        let response = self
            .post("auth/login")
            .form(&[("username", &self.username), ("password", &self.password)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.is_success() && body.trim() == "Ok." {
            log::debug!("Logged into qBittorrent as {}", self.username);
            self.logged_in.store(true, Ordering::Release);
            Ok(())
        } else {
            self.logged_in.store(false, Ordering::Release);
            log::error!("qBittorrent login failed ({status}): {}", body.trim());
            Err(Error::Unauthorized)
        }
    }

    /// Sends the request built by `build`, logging in again and resending it
    /// once if the session has expired.
    async fn send<F>(&self, build: F) -> Result<Response, Error>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        if !self.logged_in.load(Ordering::Acquire) {
            self.login().await?;
        }

        let response = build().send().await?;
        if response.status() != StatusCode::FORBIDDEN {
            return classify(response).await;
        }

        log::info!("qBittorrent session expired, logging in again");
        self.login().await?;
        match build().send().await? {
            response if response.status() == StatusCode::FORBIDDEN => Err(Error::Unauthorized),
            response => classify(response).await,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let response = self.send(|| self.get(method).query(query)).await?;
        Ok(response.json().await?)
    }

    async fn post_form(&self, method: &str, form: &[(&str, &str)]) -> Result<String, Error> {
        let response = self.send(|| self.post(method).form(form)).await?;
        Ok(response.text().await?)
    }

    /// qBittorrent 5 renamed pause/resume to stop/start
    async fn post_form_or(
        &self,
        method: &str,
        fallback: &str,
        form: &[(&str, &str)],
    ) -> Result<String, Error> {
        match self.post_form(method, form).await {
            Err(Error::NotFound) => self.post_form(fallback, form).await,
            other => other,
        }
    }
}

async fn classify(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let reason = if body.trim().is_empty() {
        status.to_string()
    } else {
        body.trim().to_string()
    };

    Err(match status {
        StatusCode::NOT_FOUND => Error::NotFound,
        StatusCode::BAD_REQUEST => Error::InvalidArgument(reason),
        StatusCode::CONFLICT => Error::Conflict(reason),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => Error::Rejected,
        StatusCode::FORBIDDEN => Error::Unauthorized,
        status => Error::UnexpectedStatus(status),
    })
}

fn join_hashes(hashes: &[String]) -> String {
    hashes.join("|")
}

#[async_trait]
impl TorrentApi for Client {
    async fn torrents(&self) -> Result<Vec<Torrent>, Error> {
        self.get_json("torrents/info", &[]).await
    }

    async fn files(&self, hash: &str) -> Result<Vec<TorrentFile>, Error> {
        self.get_json("torrents/files", &[("hash", hash)]).await
    }

    async fn add(&self, urls: &[String], category: &str) -> Result<(), Error> {
        let urls = urls.join("\n");
        let response = self
            .send(|| {
                let form = Form::new()
                    .text("urls", urls.clone())
                    .text("category", category.to_string())
                    .text("autoTMM", "true");
                self.post("torrents/add").multipart(form)
            })
            .await?;

        match response.text().await?.trim() {
            "Fails." => Err(Error::Rejected),
            _ => Ok(()),
        }
    }

    async fn delete(&self, hashes: &[String], delete_files: bool) -> Result<(), Error> {
        let hashes = join_hashes(hashes);
        let delete_files = if delete_files { "true" } else { "false" };
        self.post_form(
            "torrents/delete",
            &[("hashes", &hashes), ("deleteFiles", delete_files)],
        )
        .await?;
        Ok(())
    }

    async fn pause(&self, hashes: &[String]) -> Result<(), Error> {
        let hashes = join_hashes(hashes);
        self.post_form_or("torrents/pause", "torrents/stop", &[("hashes", &hashes)])
            .await?;
        Ok(())
    }

    async fn resume(&self, hashes: &[String]) -> Result<(), Error> {
        let hashes = join_hashes(hashes);
        self.post_form_or("torrents/resume", "torrents/start", &[("hashes", &hashes)])
            .await?;
        Ok(())
    }

    async fn rename(&self, hash: &str, name: &str) -> Result<(), Error> {
        self.post_form("torrents/rename", &[("hash", hash), ("name", name)])
            .await?;
        Ok(())
    }

    async fn set_category(&self, hashes: &[String], category: &str) -> Result<(), Error> {
        let hashes = join_hashes(hashes);
        self.post_form(
            "torrents/setCategory",
            &[("hashes", &hashes), ("category", category)],
        )
        .await?;
        Ok(())
    }

    async fn rename_file(&self, hash: &str, old_path: &str, new_path: &str) -> Result<(), Error> {
        self.post_form(
            "torrents/renameFile",
            &[("hash", hash), ("oldPath", old_path), ("newPath", new_path)],
        )
        .await?;
        Ok(())
    }
}
