/// Minimum length, in characters, of the text removed by `strip`
pub const MIN_STRIP_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Hello,
    Help,
    List,
    Info { short_hash: String },
    /// Magnet links or URLs of .torrent files
    Add { links: Vec<String> },
    AddFile { url: String },
    Delete { hashes: Vec<String> },
    Pause { hashes: Vec<String> },
    Resume { hashes: Vec<String> },
    FileInfo { hash: String },
    ChangeCategory { category: String, hashes: Vec<String> },
    Rename { hash: String, name: String },
    RenameFile { hash: String, old_path: String, new_path: String },
    Strip { hash: String, substring: String },
}

/// Shell-style split, or a plain whitespace split when the quoting is broken
/// or a word starts with `#` (which shlex would read as a comment).
pub fn tokenize(content: &str) -> Vec<String> {
    let split_whitespace =
        || -> Vec<String> { content.split_whitespace().map(str::to_string).collect() };
    if content.split_whitespace().any(|word| word.starts_with('#')) {
        return split_whitespace();
    }
    shlex::split(content).unwrap_or_else(split_whitespace)
}

impl Command {
    /// Matches a message against the command grammar. `attachments` holds the
    /// URLs of the files attached to the message.
    pub fn parse(prefix: &str, content: &str, attachments: &[String]) -> Option<Self> {
        let tokens = tokenize(content);
        let (verb, args) = tokens.split_first()?;
        let verb = verb.strip_prefix(prefix)?;

        let command = match (verb, args) {
            ("hello", []) => Command::Hello,
            ("help", []) => Command::Help,
            ("list", []) => Command::List,
            ("info", [short_hash]) => Command::Info {
                short_hash: short_hash.clone(),
            },
            ("add", links) if !links.is_empty() => Command::Add {
                links: links.to_vec(),
            },
            ("addfile", []) => Command::AddFile {
                url: attachments.first()?.clone(),
            },
            ("del", hashes) if !hashes.is_empty() => Command::Delete {
                hashes: hashes.to_vec(),
            },
            ("pause", hashes) if !hashes.is_empty() => Command::Pause {
                hashes: hashes.to_vec(),
            },
            ("resume", hashes) if !hashes.is_empty() => Command::Resume {
                hashes: hashes.to_vec(),
            },
            ("fileinfo", [hash]) => Command::FileInfo { hash: hash.clone() },
            ("changecategory", [category, hashes @ ..]) if !hashes.is_empty() => {
                Command::ChangeCategory {
                    category: category.clone(),
                    hashes: hashes.to_vec(),
                }
            }
            ("rename", [hash, name @ ..]) if !name.is_empty() => Command::Rename {
                hash: hash.clone(),
                name: name.join(" "),
            },
            ("renamefile", [hash, old_path, new_path]) => Command::RenameFile {
                hash: hash.clone(),
                old_path: old_path.clone(),
                new_path: new_path.clone(),
            },
            ("strip", [hash, substring]) if substring.chars().count() >= MIN_STRIP_LEN => {
                Command::Strip {
                    hash: hash.clone(),
                    substring: substring.clone(),
                }
            }
            _ => return None,
        };

        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Option<Command> {
        Command::parse("$", content, &[])
    }

    #[test]
    fn tokenizes_quoted_arguments() {
        assert_eq!(
            tokenize(r#"$renamefile abc "old name.mkv" 'new name.mkv'"#),
            vec!["$renamefile", "abc", "old name.mkv", "new name.mkv"]
        );
    }

    #[test]
    fn unbalanced_quotes_fall_back_to_whitespace() {
        assert_eq!(
            tokenize(r#"$rename abc it's   fine"#),
            vec!["$rename", "abc", "it's", "fine"]
        );
    }

    #[test]
    fn hash_signs_are_kept_as_text() {
        assert_eq!(
            tokenize("$rename abc Season #1 Remux"),
            vec!["$rename", "abc", "Season", "#1", "Remux"]
        );
        assert_eq!(
            parse("$rename abc Season #1 Remux"),
            Some(Command::Rename {
                hash: "abc".to_string(),
                name: "Season #1 Remux".to_string()
            })
        );
        assert_eq!(
            parse("$rename abc #1 Best"),
            Some(Command::Rename {
                hash: "abc".to_string(),
                name: "#1 Best".to_string()
            })
        );
        assert_eq!(tokenize("$fileinfo a#b"), vec!["$fileinfo", "a#b"]);
    }

    #[test]
    fn exact_arity_is_enforced() {
        assert_eq!(parse("$list"), Some(Command::List));
        assert_eq!(parse("$list extra"), None);
        assert_eq!(parse("$hello"), Some(Command::Hello));
        assert_eq!(parse("$info"), None);
        assert_eq!(parse("$info a b"), None);
        assert_eq!(
            parse("$renamefile h a"),
            None,
            "renamefile needs both paths"
        );
    }

    #[test]
    fn minimum_arity_collects_every_argument() {
        assert_eq!(
            parse("$del all"),
            Some(Command::Delete {
                hashes: vec!["all".to_string()]
            })
        );
        assert_eq!(
            parse("$pause aaa bbb"),
            Some(Command::Pause {
                hashes: vec!["aaa".to_string(), "bbb".to_string()]
            })
        );
        assert_eq!(parse("$resume"), None);
        assert_eq!(parse("$changecategory movies"), None);
        assert_eq!(
            parse("$changecategory movies aaa bbb"),
            Some(Command::ChangeCategory {
                category: "movies".to_string(),
                hashes: vec!["aaa".to_string(), "bbb".to_string()]
            })
        );
    }

    #[test]
    fn rename_joins_the_new_name() {
        assert_eq!(
            parse("$rename abc multi   word name"),
            Some(Command::Rename {
                hash: "abc".to_string(),
                name: "multi word name".to_string()
            })
        );
        assert_eq!(parse("$rename abc"), None);
    }

    #[test]
    fn strip_needs_a_long_enough_substring() {
        assert_eq!(parse("$strip abc xy"), None);
        assert_eq!(
            parse("$strip abc xyz"),
            Some(Command::Strip {
                hash: "abc".to_string(),
                substring: "xyz".to_string()
            })
        );
    }

    #[test]
    fn addfile_needs_an_attachment() {
        assert_eq!(parse("$addfile"), None);

        let attachments = vec!["https://cdn.example/a.torrent".to_string()];
        assert_eq!(
            Command::parse("$", "$addfile", &attachments),
            Some(Command::AddFile {
                url: attachments[0].clone()
            })
        );
    }

    #[test]
    fn ignores_unknown_or_unprefixed_messages() {
        assert_eq!(parse("$unknown foo"), None);
        assert_eq!(parse("list"), None);
        assert_eq!(parse("$listing"), None);
        assert_eq!(parse(""), None);
        assert_eq!(Command::parse("!", "!list", &[]), Some(Command::List));
    }
}
