//! CLI command implementations

use crate::output::{format_rows, format_transcript, Entry, OutputFormat};
use crate::script::{self, Command, Step};
use anyhow::Context;
use kino_player::{
    fullscreen::{BEFORE_FULLSCREEN, FULLSCREEN, FULLSCREEN_CHANGE},
    dispatcher::{DESTROY, LOAD, PAUSE, PLAY},
    BoxKind, Flow, FullscreenTarget, Handler, Host, Player, PlayerConfig, PluginDefinition,
    Target, VideoConfig, VideoPropertyKind, WatchKey, VIDEO_PROPERTIES,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use tabled::Tabled;
use tracing::{debug, info};

const VETO_PLUGIN: &str = "stopFullscreen";

const OBSERVED_EVENTS: [&str; 7] = [
    BEFORE_FULLSCREEN,
    FULLSCREEN,
    FULLSCREEN_CHANGE,
    PLAY,
    PAUSE,
    LOAD,
    DESTROY,
];

type Transcript = Rc<RefCell<Vec<Entry>>>;

/// Build a headless player, optionally with a plugin that vetoes every
/// fullscreen request
pub fn build_player(mut config: PlayerConfig, veto_fullscreen: bool) -> anyhow::Result<Player> {
    let host = Host::headless();
    if veto_fullscreen {
        host.plugins.install(
            PluginDefinition::new(VETO_PLUGIN)
                .on(BEFORE_FULLSCREEN, Handler::new(|_| Ok(Flow::Cancel))),
        )?;
        config.plugins.push(VETO_PLUGIN.to_string());
    }
    Ok(Player::new(config, &host)?)
}

/// Record events and watch transitions into the transcript
fn observe(player: &Player, transcript: &Transcript, extra_events: &[String]) -> anyhow::Result<()> {
    let names = OBSERVED_EVENTS
        .iter()
        .map(|name| name.to_string())
        .chain(extra_events.iter().cloned());

    for name in names {
        let sink = transcript.clone();
        let event = name.clone();
        player.on(
            &name,
            Handler::observer(move |e| {
                sink.borrow_mut().push(Entry::Event {
                    name: event.clone(),
                    args: e.args.to_vec(),
                })
            }),
        );
    }

    for key in [WatchKey::IsFullscreen, WatchKey::FullscreenElement] {
        let sink = transcript.clone();
        player.watch(key.as_str(), move |new, old| {
            sink.borrow_mut().push(Entry::Watch {
                property: key.as_str().to_string(),
                new: new.clone(),
                old: old.clone(),
            })
        })?;
    }
    Ok(())
}

/// Run one script command against the player
pub async fn execute(player: &Player, command: &Command) -> kino_player::Result<Value> {
    Ok(match command {
        Command::Attr { target, key, value: None } => json!(player.attr(target.parse::<Target>()?, key)),
        Command::Attr { target, key, value: Some(value) } => {
            player.set_attr(target.parse::<Target>()?, key, value.clone())?;
            Value::Null
        }
        Command::Css { target, key, value: None } => json!(player.css(target.parse::<Target>()?, key)),
        Command::Css { target, key, value: Some(value) } => {
            player.set_css(target.parse::<Target>()?, key, value.clone())?;
            Value::Null
        }
        Command::Fullscreen(flag) => json!(player.fullscreen(*flag)?),
        Command::Request(target) => {
            json!(player.request_fullscreen(target.parse::<FullscreenTarget>()?)?)
        }
        Command::Exit => json!(player.exit_fullscreen()?),
        Command::Focus => {
            player.focus()?;
            Value::Null
        }
        Command::Play => {
            player.play().await?;
            Value::Null
        }
        Command::Pause => {
            player.pause().await?;
            Value::Null
        }
        Command::Load(src) => {
            player.load(src)?;
            Value::Null
        }
        Command::Box(kind) => {
            player.set_box(BoxKind::from(kind.as_str()))?;
            json!(player.box_kind().to_string())
        }
        Command::Ready(pairs) => {
            let snapshot: VideoConfig = pairs.iter().cloned().collect();
            player.video_config_ready(snapshot);
            Value::Null
        }
        Command::Emit { name, args } => json!(player.emit(name, args)),
        Command::Destroy => {
            player.destroy();
            json!(player.is_destroyed())
        }
    })
}

/// Execute parsed steps, returning the transcript
pub async fn run_steps(player: &Player, steps: &[Step]) -> anyhow::Result<Vec<Entry>> {
    let transcript: Transcript = Rc::new(RefCell::new(Vec::new()));
    let extra: Vec<String> = steps
        .iter()
        .filter_map(|step| step.command.emitted_event())
        .filter(|name| !OBSERVED_EVENTS.contains(name))
        .map(str::to_string)
        .collect();
    observe(player, &transcript, &extra)?;

    for step in steps {
        let index = {
            let mut entries = transcript.borrow_mut();
            entries.push(Entry::Command {
                line: step.line,
                command: step.source.clone(),
                result: None,
                error: None,
            });
            entries.len() - 1
        };

        debug!(line = step.line, command = %step.source, "Executing");
        let outcome = execute(player, &step.command).await;

        if let Some(Entry::Command { result, error, .. }) = transcript.borrow_mut().get_mut(index) {
            match outcome {
                Ok(value) => *result = Some(value),
                Err(e) => *error = Some(format!("{} ({})", e, e.error_code())),
            }
        }
    }

    let entries = transcript.borrow().clone();
    Ok(entries)
}

/// `run` subcommand
pub async fn run(
    script_path: &Path,
    config_path: Option<&Path>,
    veto_fullscreen: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(script_path)
        .with_context(|| format!("reading {}", script_path.display()))?;
    let steps = script::parse(&source)?;

    let config = match config_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            PlayerConfig::from_json(&json)?
        }
        None => PlayerConfig::default(),
    };

    let player = build_player(config, veto_fullscreen)?;
    info!(player = %player.id(), steps = steps.len(), "Running script");

    let entries = run_steps(&player, &steps).await?;
    println!("{}", format_transcript(&entries, format));
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
pub struct ProbeRow {
    #[tabled(rename = "MIME type")]
    pub mime: String,
    #[tabled(rename = "Box")]
    pub box_kind: String,
    #[tabled(rename = "canPlayType")]
    pub answer: String,
}

/// `canPlayType` answers of a box
pub fn probe_rows(mimes: &[String], box_kind: Option<&str>) -> anyhow::Result<Vec<ProbeRow>> {
    let mut config = PlayerConfig::default();
    if let Some(kind) = box_kind {
        config = config.with_box(kind);
    }
    let player = build_player(config, false)?;

    Ok(mimes
        .iter()
        .map(|mime| ProbeRow {
            mime: mime.clone(),
            box_kind: player.box_kind().to_string(),
            answer: match player.can_play_type(mime).as_str() {
                "" => "(no)".to_string(),
                answer => answer.to_string(),
            },
        })
        .collect())
}

/// `probe` subcommand
pub fn probe(mimes: &[String], box_kind: Option<&str>, format: OutputFormat) -> anyhow::Result<()> {
    let rows = probe_rows(mimes, box_kind)?;
    println!("{}", format_rows(&rows, format));
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
pub struct PropertyRow {
    #[tabled(rename = "Property")]
    pub name: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Writable")]
    pub writable: bool,
    #[tabled(rename = "Mirrored on <video>")]
    pub mirrored: bool,
}

pub fn property_rows() -> Vec<PropertyRow> {
    VIDEO_PROPERTIES
        .iter()
        .map(|(name, kind)| PropertyRow {
            name: name.to_string(),
            kind: format!("{kind:?}"),
            writable: *kind != VideoPropertyKind::ReadOnly,
            mirrored: matches!(
                kind,
                VideoPropertyKind::Attribute | VideoPropertyKind::BooleanAttribute
            ),
        })
        .collect()
}

/// `properties` subcommand
pub fn properties(format: OutputFormat) {
    println!("{}", format_rows(&property_rows(), format));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_script(source: &str, veto: bool) -> Vec<Entry> {
        let steps = script::parse(source).unwrap();
        let player = build_player(PlayerConfig::new("http://cdn.example.com/lostStar.mp4"), veto)
            .unwrap();
        tokio_test::block_on(run_steps(&player, &steps)).unwrap()
    }

    fn results(entries: &[Entry]) -> Vec<(Option<Value>, Option<String>)> {
        entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Command { result, error, .. } => Some((result.clone(), error.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_attr_script() {
        let entries = run_script("attr wrapper data-id 7\nattr wrapper data-id\nattr body id\n", false);
        let results = results(&entries);

        assert_eq!(results[0], (Some(Value::Null), None));
        assert_eq!(results[1], (Some(json!("7")), None));
        assert!(results[2].1.as_deref().unwrap().contains("INVALID_TARGET"));
    }

    #[test]
    fn test_fullscreen_transcript_order() {
        let entries = run_script("request wrapper\n", false);

        assert!(matches!(&entries[0], Entry::Command { line: 1, .. }));
        assert!(matches!(&entries[1], Entry::Event { name, .. } if name == BEFORE_FULLSCREEN));
        assert!(matches!(&entries[2], Entry::Watch { property, .. } if property == "isFullscreen"));
        assert!(matches!(&entries[3], Entry::Watch { property, .. } if property == "fullscreenElement"));
        assert!(matches!(&entries[4], Entry::Event { name, .. } if name == FULLSCREEN));
        assert!(matches!(&entries[5], Entry::Event { name, .. } if name == FULLSCREEN_CHANGE));
    }

    #[test]
    fn test_veto_flag() {
        let entries = run_script("fullscreen on\n", true);
        assert_eq!(results(&entries), vec![(Some(json!(false)), None)]);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_play_after_destroy() {
        let entries = run_script("play\ndestroy\nplay\n", false);
        let results = results(&entries);

        assert_eq!(results[0], (Some(Value::Null), None));
        assert_eq!(results[1], (Some(json!(true)), None));
        assert!(results[2].1.as_deref().unwrap().contains("DESTROYED"));
    }

    #[test]
    fn test_custom_events_observed() {
        let entries = run_script("emit ping 1\n", false);
        assert!(entries
            .iter()
            .any(|e| matches!(e, Entry::Event { name, args } if name == "ping" && args == &vec![json!(1)])));
    }

    #[test]
    fn test_probe_rows() {
        let rows = probe_rows(&["video/x-flv".to_string()], Some("flv")).unwrap();
        assert_eq!(rows[0].answer, "probably");
        assert_eq!(rows[0].box_kind, "flv");

        assert!(probe_rows(&["video/mp4".to_string()], Some("dash")).is_err());
    }

    #[test]
    fn test_property_rows() {
        let rows = property_rows();
        let duration = rows.iter().find(|r| r.name == "duration").unwrap();
        assert!(!duration.writable);
        let controls = rows.iter().find(|r| r.name == "controls").unwrap();
        assert!(controls.writable && controls.mirrored);
    }
}
