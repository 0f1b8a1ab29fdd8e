//! Discord bot driving a qBittorrent instance through `$`-prefixed chat commands.

pub mod chunk;
pub mod command;
pub mod config;
pub mod discord;
pub mod dispatch;
pub mod qbittorrent;
pub mod torrents;
