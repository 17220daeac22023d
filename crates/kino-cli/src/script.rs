//! Player script parsing
//!
//! One command per line. A comment is a line starting with `#`, or a
//! standalone `#` word and everything after it, so values such as `#333`
//! or `a.mp4#t=1` are kept:
//!
//! ```text
//! attr video src              # read
//! attr wrapper data-id 42     # write, value parsed as JSON when possible
//! ready duration=120 paused=true
//! request container
//! fullscreen off
//! ```

use anyhow::{bail, Context};
use serde_json::Value;

/// A parsed script command. Targets stay strings so that an unknown target
/// is reported by the player when the line runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Attr { target: String, key: String, value: Option<Value> },
    Css { target: String, key: String, value: Option<Value> },
    Fullscreen(Option<bool>),
    Request(String),
    Exit,
    Focus,
    Play,
    Pause,
    Load(String),
    Box(String),
    Ready(Vec<(String, Value)>),
    Emit { name: String, args: Vec<Value> },
    Destroy,
}

impl Command {
    /// Event name emitted by `emit`, if any
    pub fn emitted_event(&self) -> Option<&str> {
        match self {
            Command::Emit { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A command with its 1-based source line
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub line: usize,
    pub source: String,
    pub command: Command,
}

/// JSON when it parses, otherwise the raw word as a string
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_property(kind: &str, args: &[&str]) -> anyhow::Result<(String, String, Option<Value>)> {
    match args {
        [target, key] => Ok((target.to_string(), key.to_string(), None)),
        [target, key, rest @ ..] => {
            Ok((target.to_string(), key.to_string(), Some(parse_value(&rest.join(" ")))))
        }
        _ => bail!("usage: {kind} TARGET KEY [VALUE]"),
    }
}

/// The line without its trailing comment, trimmed
fn strip_comment(line: &str) -> &str {
    let line = line.trim();
    if line.starts_with('#') {
        return "";
    }
    let end = line
        .char_indices()
        .find(|&(i, c)| {
            c == '#'
                && line[..i].ends_with(char::is_whitespace)
                && line[i + 1..].chars().next().map_or(true, char::is_whitespace)
        })
        .map_or(line.len(), |(i, _)| i);
    line[..end].trim_end()
}

fn parse_line(line: &str) -> anyhow::Result<Option<Command>> {
    let line = strip_comment(line);
    if line.is_empty() {
        return Ok(None);
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    let (name, args) = words.split_first().context("empty command")?;

    let command = match (*name, args) {
        ("attr", args) => {
            let (target, key, value) = parse_property("attr", args)?;
            Command::Attr { target, key, value }
        }
        ("css", args) => {
            let (target, key, value) = parse_property("css", args)?;
            Command::Css { target, key, value }
        }
        ("fullscreen", []) => Command::Fullscreen(None),
        ("fullscreen", ["on"]) => Command::Fullscreen(Some(true)),
        ("fullscreen", ["off"]) => Command::Fullscreen(Some(false)),
        ("fullscreen", _) => bail!("usage: fullscreen [on|off]"),
        ("request", [target]) => Command::Request(target.to_string()),
        ("request", _) => bail!("usage: request TARGET"),
        ("exit", []) => Command::Exit,
        ("focus", []) => Command::Focus,
        ("play", []) => Command::Play,
        ("pause", []) => Command::Pause,
        ("destroy", []) => Command::Destroy,
        ("load", [src]) => Command::Load(src.to_string()),
        ("load", _) => bail!("usage: load SRC"),
        ("box", [kind]) => Command::Box(kind.to_string()),
        ("box", _) => bail!("usage: box KIND"),
        ("ready", pairs) => Command::Ready(
            pairs
                .iter()
                .map(|pair| {
                    let (key, value) = pair
                        .split_once('=')
                        .with_context(|| format!("expected key=value, got {pair:?}"))?;
                    Ok((key.to_string(), parse_value(value)))
                })
                .collect::<anyhow::Result<_>>()?,
        ),
        ("emit", [name, args @ ..]) => Command::Emit {
            name: name.to_string(),
            args: args.iter().map(|a| parse_value(a)).collect(),
        },
        ("emit", []) => bail!("usage: emit NAME [ARG...]"),
        (other @ ("exit" | "focus" | "play" | "pause" | "destroy"), _) => {
            bail!("{other} takes no arguments")
        }
        (other, _) => bail!("unknown command: {other}"),
    };
    Ok(Some(command))
}

/// Parse a whole script, failing on the first bad line
pub fn parse(source: &str) -> anyhow::Result<Vec<Step>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, text)| {
            parse_line(text)
                .with_context(|| format!("line {}: {}", index + 1, text.trim()))
                .transpose()
                .map(|command| {
                    command.map(|command| Step {
                        line: index + 1,
                        source: strip_comment(text).to_string(),
                        command,
                    })
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_script() {
        let steps = parse(
            "# demo\n\
             attr video src\n\
             attr wrapper data-id 42   # numeric\n\
             css container z-index 10\n\
             \n\
             fullscreen\n\
             fullscreen off\n\
             request video\n\
             ready duration=120 src=a.mp4\n\
             emit custom 1 two\n",
        )
        .unwrap();

        assert_eq!(steps.len(), 8);
        assert_eq!(steps[0].line, 2);
        assert_eq!(
            steps[0].command,
            Command::Attr { target: "video".into(), key: "src".into(), value: None }
        );
        assert_eq!(steps[1].source, "attr wrapper data-id 42");
        assert_eq!(
            steps[1].command,
            Command::Attr { target: "wrapper".into(), key: "data-id".into(), value: Some(json!(42)) }
        );
        assert_eq!(steps[3].command, Command::Fullscreen(None));
        assert_eq!(steps[4].command, Command::Fullscreen(Some(false)));
        assert_eq!(steps[5].command, Command::Request("video".into()));
        assert_eq!(
            steps[6].command,
            Command::Ready(vec![("duration".into(), json!(120)), ("src".into(), json!("a.mp4"))])
        );
        assert_eq!(steps[7].command.emitted_event(), Some("custom"));
    }

    #[test]
    fn test_value_with_spaces() {
        let steps = parse("attr wrapper title Lost Star").unwrap();
        assert_eq!(
            steps[0].command,
            Command::Attr { target: "wrapper".into(), key: "title".into(), value: Some(json!("Lost Star")) }
        );
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = parse("play\nfullscreen maybe\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));

        assert!(parse("rewind").is_err());
        assert!(parse("play now").is_err());
        assert!(parse("ready duration").is_err());
    }

    #[test]
    fn test_hash_inside_value_is_not_a_comment() {
        let steps = parse(
            "css container color #333\n\
             load blob:http://localhost/1#t=1   # jump ahead\n\
             #play\n",
        )
        .unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(
            steps[0].command,
            Command::Css { target: "container".into(), key: "color".into(), value: Some(json!("#333")) }
        );
        assert_eq!(steps[1].command, Command::Load("blob:http://localhost/1#t=1".into()));
        assert_eq!(steps[1].source, "load blob:http://localhost/1#t=1");
    }

    #[test]
    fn test_unknown_target_is_not_a_parse_error() {
        let steps = parse("attr body id").unwrap();
        assert_eq!(
            steps[0].command,
            Command::Attr { target: "body".into(), key: "id".into(), value: None }
        );
    }
}
