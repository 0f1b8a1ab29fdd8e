use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.json";

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Discord bot token
    #[serde(rename = "TOKEN")]
    pub token: String,
    #[serde(rename = "PREFIX", default = "default_prefix")]
    pub prefix: String,
    /// Category given to every torrent added through the bot
    #[serde(rename = "DEFAULT_CATEGORY", default = "default_category")]
    pub default_category: String,
    pub qbittorrent: QBittorrent,
}

fn default_prefix() -> String {
    "$".to_string()
}

fn default_category() -> String {
    "other".to_string()
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unable to read password file {path:?}: {source}")]
    PasswordFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid qBittorrent host `{host}`: {source}")]
    InvalidHost {
        host: String,
        source: url::ParseError,
    },
    #[error("qBittorrent host `{0}` can't carry a port")]
    CannotBeBase(String),
}

#[derive(Deserialize, Debug, Clone)]
#[serde(try_from = "RawQBittorrent")]
pub struct QBittorrent {
    /// Base of the WebUI, e.g. `http://localhost:8080/`
    pub url: Url,
    pub username: String,
    pub password: String,
}

impl TryFrom<RawQBittorrent> for QBittorrent {
    type Error = Error;

    fn try_from(value: RawQBittorrent) -> Result<Self, Self::Error> {
        let password = match value.password {
            QBittorrentPassword::Raw { password } => password,
            QBittorrentPassword::File { password_file } => read_to_string(&password_file)
                .map_err(|source| Error::PasswordFile {
                    path: password_file,
                    source,
                })?
                .trim()
                .to_string(),
        };
        Ok(QBittorrent {
            url: base_url(&value.host, value.port, value.https)?,
            username: value.username,
            password,
        })
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RawQBittorrent {
    #[serde(rename = "HOST")]
    pub host: String,
    #[serde(rename = "PORT")]
    pub port: u16,
    #[serde(rename = "USER")]
    pub username: String,
    #[serde(rename = "HTTPS", default)]
    pub https: bool,
    #[serde(flatten)]
    pub password: QBittorrentPassword,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum QBittorrentPassword {
    Raw {
        #[serde(rename = "PASS")]
        password: String,
    },
    File {
        #[serde(rename = "PASS_FILE")]
        password_file: PathBuf,
    },
}

/// Hosts may be given bare (`localhost`) or with a scheme
/// (`https://seedbox.example/qbt`); `PORT` always wins.
fn base_url(host: &str, port: u16, https: bool) -> Result<Url, Error> {
    let raw = if host.contains("://") {
        host.to_string()
    } else {
        let scheme = if https { "https" } else { "http" };
        format!("{scheme}://{host}")
    };

    let mut url = Url::parse(&raw).map_err(|source| Error::InvalidHost {
        host: host.to_string(),
        source,
    })?;
    url.set_port(Some(port))
        .map_err(|()| Error::CannotBeBase(host.to_string()))?;

    // Url::join drops the last segment unless the path ends with a slash
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

pub fn load(path: &Path) -> anyhow::Result<Config> {
    let file =
        read_to_string(path).with_context(|| format!("Failed to open config file {path:?}"))?;

    serde_json::from_str(&file).context("Config file is invalid")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_minimal_settings() {
        let file = write_config(
            r#"{
                "TOKEN": "discord-token",
                "qbittorrent": { "HOST": "localhost", "PORT": 8080, "USER": "admin", "PASS": "adminadmin" }
            }"#,
        );

        let cfg = load(file.path()).unwrap();
        assert_eq!(cfg.token, "discord-token");
        assert_eq!(cfg.prefix, "$");
        assert_eq!(cfg.default_category, "other");
        assert_eq!(cfg.qbittorrent.url.as_str(), "http://localhost:8080/");
        assert_eq!(cfg.qbittorrent.username, "admin");
        assert_eq!(cfg.qbittorrent.password, "adminadmin");
    }

    #[test]
    fn reads_password_from_file() {
        let password = write_config("s3cret\n");
        let file = write_config(&format!(
            r#"{{
                "TOKEN": "t",
                "DEFAULT_CATEGORY": "movies",
                "qbittorrent": {{ "HOST": "nas", "PORT": 9000, "USER": "u", "PASS_FILE": {:?} }}
            }}"#,
            password.path()
        ));

        let cfg = load(file.path()).unwrap();
        assert_eq!(cfg.default_category, "movies");
        assert_eq!(cfg.qbittorrent.password, "s3cret");
    }

    #[test]
    fn host_with_scheme_and_path_keeps_them() {
        let url = base_url("https://seedbox.example/qbt", 443, false).unwrap();
        assert_eq!(url.as_str(), "https://seedbox.example/qbt/");

        let url = base_url("10.0.0.2", 8443, true).unwrap();
        assert_eq!(url.as_str(), "https://10.0.0.2:8443/");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load(Path::new("/nonexistent/settings.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to open config file"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = write_config(r#"{ "TOKEN": "t" }"#);
        let err = load(file.path()).unwrap_err();
        assert_eq!(err.to_string(), "Config file is invalid");
    }
}
