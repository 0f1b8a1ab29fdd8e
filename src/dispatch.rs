use crate::command::Command;
use crate::qbittorrent::{Error, TorrentApi};
use crate::torrents::Torrents;

pub const OK: &str = "Ok.";
pub const HELLO: &str = "Hey!\nI'm a BOT & I'm very happy to serve you.";
pub const INVALID_SHORT_HASH: &str = "INVALID SHORT HASH!";
pub const AMBIGUOUS_SHORT_HASH: &str = "AMBIGUOUS SHORT HASH!";
pub const INVALID_HASH: &str = "INVALID HASH";
pub const INVALID_RENAME_HASH: &str = "INVALID HASH!";
pub const INVALID_CATEGORY: &str = "INVALID CATEGORY";
pub const INVALID_FILE: &str = "INVALID HASH/NO SUCH FILE";
pub const FAILED_TO_ADD: &str = "FAILED TO ADD";
pub const UNSAFE_STRIP: &str = "STRIP WOULD BREAK FILE NAMES";

/// A chat message, reduced to what matters for dispatching.
#[derive(Debug, Clone, Copy)]
pub struct Message<'a> {
    /// Whether the bot itself wrote the message
    pub from_self: bool,
    pub content: &'a str,
    /// URLs of the attached files
    pub attachments: &'a [String],
}

pub struct Dispatcher<A> {
    torrents: Torrents<A>,
    prefix: String,
}

impl<A: TorrentApi> Dispatcher<A> {
    pub fn new(torrents: Torrents<A>, prefix: impl Into<String>) -> Self {
        Self {
            torrents,
            prefix: prefix.into(),
        }
    }

    /// Returns the reply to `message`, empty when the bot stays silent.
    pub async fn dispatch(&self, message: &Message<'_>) -> String {
        if message.from_self {
            return String::new();
        }

        match Command::parse(&self.prefix, message.content, message.attachments) {
            Some(command) => {
                log::info!("Running {command:?}");
                self.execute(command).await
            }
            None => String::new(),
        }
    }

    pub async fn execute(&self, command: Command) -> String {
        let t = &self.torrents;
        match command {
            Command::Hello => HELLO.to_string(),
            Command::Help => help(&self.prefix),
            Command::List => t.list().await.unwrap_or_else(silent),
            Command::Info { short_hash } => match t.info(&short_hash).await {
                Ok(report) => report,
                Err(Error::NotFound) => INVALID_SHORT_HASH.to_string(),
                Err(err @ Error::Ambiguous(_)) => reply(err, AMBIGUOUS_SHORT_HASH),
                Err(err) => silent(err),
            },
            Command::Add { links } => added(t.add(&links).await),
            Command::AddFile { url } => added(t.add(&[url]).await),
            Command::Delete { hashes } => ok_or_silent(t.delete(&hashes).await),
            Command::Pause { hashes } => ok_or_silent(t.pause(&hashes).await),
            Command::Resume { hashes } => ok_or_silent(t.resume(&hashes).await),
            Command::FileInfo { hash } => match t.file_info(&hash).await {
                Ok(files) => files,
                Err(err) => reply(err, INVALID_HASH),
            },
            Command::ChangeCategory { category, hashes } => {
                ok_or(t.change_category(&category, &hashes).await, INVALID_CATEGORY)
            }
            Command::Rename { hash, name } => {
                ok_or(t.rename(&hash, &name).await, INVALID_RENAME_HASH)
            }
            Command::RenameFile {
                hash,
                old_path,
                new_path,
            } => ok_or(
                t.rename_file(&hash, &old_path, &new_path).await,
                INVALID_FILE,
            ),
            Command::Strip { hash, substring } => match t.strip(&hash, &substring).await {
                Ok(()) => OK.to_string(),
                Err(err @ (Error::Conflict(_) | Error::InvalidArgument(_))) => {
                    reply(err, UNSAFE_STRIP)
                }
                Err(err) => reply(err, INVALID_HASH),
            },
        }
    }
}

fn reply(err: Error, text: &str) -> String {
    log::warn!("{err}");
    text.to_string()
}

fn silent(err: Error) -> String {
    log::error!("{err}");
    String::new()
}

fn ok_or(result: Result<(), Error>, text: &str) -> String {
    match result {
        Ok(()) => OK.to_string(),
        Err(err) => reply(err, text),
    }
}

fn ok_or_silent(result: Result<(), Error>) -> String {
    result.map_or_else(silent, |()| OK.to_string())
}

fn added(result: Result<(), Error>) -> String {
    match result {
        Ok(()) => OK.to_string(),
        Err(err @ Error::Rejected) => reply(err, FAILED_TO_ADD),
        Err(err) => silent(err),
    }
}

pub fn help(prefix: &str) -> String {
    [
        ("hello", "say hi"),
        ("list", "list every torrent as `<short hash>: <name> (<category>/<state>)`"),
        ("info <short hash>", "details about one torrent"),
        ("add <magnet> [<magnet>...]", "add torrents from magnet links or URLs"),
        ("addfile", "add the attached .torrent file"),
        ("del <hash>... | all", "delete torrents along with their files"),
        ("pause <hash>... | all", "pause torrents"),
        ("resume <hash>... | all", "resume torrents"),
        ("fileinfo <hash>", "list the files of a torrent"),
        ("changecategory <category> <hash>...", "move torrents to a category"),
        ("rename <hash> <new name>", "rename a torrent"),
        ("renamefile <hash> <old path> <new path>", "rename a file, quote paths with spaces"),
        ("strip <hash> <text>", "remove <text> (3+ chars) from the torrent and file names"),
        ("help", "show this message"),
    ]
    .iter()
    .map(|(usage, what)| format!("{prefix}{usage}: {what}\n"))
    .collect()
}
