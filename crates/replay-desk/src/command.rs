//! Line commands understood by the desk

use anyhow::{bail, Result};
use replay_core::ReplayTag;

pub const HELP: &str = "\
Commands:
  list                      show all replays
  show <replay>             show one replay with its comments
  html <replay>             print the replay's comments as HTML
  refresh                   reload the collection from the server
  play <replay>             start playback on the server
  stop                      stop every running replay
  comment <replay> <text>   add a comment (\\n starts a new line)
  tag <replay> <name>       add a label
  untag <replay> <name>     remove the first label with that name
  help                      show this help
  quit                      leave the desk";

/// A parsed user command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Show(ReplayTag),
    Html(ReplayTag),
    Refresh,
    Play(ReplayTag),
    Stop,
    Comment { replay: ReplayTag, text: String },
    Tag { replay: ReplayTag, name: String },
    Untag { replay: ReplayTag, name: String },
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = split_word(line);
        let command = match verb {
            "list" | "ls" => Command::List,
            "refresh" => Command::Refresh,
            "stop" => Command::Stop,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "show" => Command::Show(replay_arg(verb, rest)?),
            "html" => Command::Html(replay_arg(verb, rest)?),
            "play" => Command::Play(replay_arg(verb, rest)?),
            "comment" => {
                let (replay, text) = replay_and_text(verb, rest)?;
                Command::Comment {
                    replay,
                    text: text.replace("\\n", "\n"),
                }
            }
            "tag" => {
                let (replay, name) = replay_and_text(verb, rest)?;
                Command::Tag { replay, name }
            }
            "untag" => {
                let (replay, name) = replay_and_text(verb, rest)?;
                Command::Untag { replay, name }
            }
            other => bail!("Unknown command '{}', type 'help' for a list", other),
        };
        Ok(Some(command))
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

fn replay_arg(verb: &str, rest: &str) -> Result<ReplayTag> {
    let (replay, extra) = split_word(rest);
    if replay.is_empty() {
        bail!("Usage: {} <replay>", verb);
    }
    if !extra.is_empty() {
        bail!("Unexpected argument '{}' for {}", extra, verb);
    }
    Ok(ReplayTag::new(replay))
}

fn replay_and_text(verb: &str, rest: &str) -> Result<(ReplayTag, String)> {
    let (replay, text) = split_word(rest);
    if replay.is_empty() || text.trim().is_empty() {
        bail!("Usage: {} <replay> <text>", verb);
    }
    Ok((ReplayTag::new(replay), text.trim_end().to_string()))
}
