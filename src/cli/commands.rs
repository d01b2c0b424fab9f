use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Deserialize;

use crate::api::{ApiError, UserPreview};
use crate::clock::ManualClock;
use crate::config::{AppConfig, ConfigLoader, HoverConfig};
use crate::preview::geometry::{AnchorKind, BoundingBox};
use crate::preview::{FetchTicket, HoverScheduler, HoverTarget, SchedulerEvent};

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Scenario file (JSON) describing pointer events and fetch results
    pub scenario: PathBuf,
    /// Override the scenario's viewport width
    #[arg(long)]
    pub viewport_width: Option<f64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file location
    Path,
}

/// A timed script of pointer events for one scheduler.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,
    pub steps: Vec<Step>,
}

fn default_viewport_width() -> f64 {
    1280.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    pub event: ScenarioEvent,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AnchorRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioEvent {
    Enter {
        user: String,
        #[serde(default = "default_anchor_kind")]
        kind: AnchorKind,
        anchor: AnchorRect,
    },
    Leave,
    EnterCard,
    LeaveCard,
    /// Resolves a fetch. `generation` picks an older ticket; default is the latest.
    FetchOk {
        #[serde(default)]
        generation: Option<u64>,
        followers: i64,
        #[serde(default)]
        following: bool,
    },
    FetchErr {
        #[serde(default)]
        generation: Option<u64>,
        #[serde(default)]
        code: Option<i32>,
    },
    Resize {
        width: f64,
    },
}

fn default_anchor_kind() -> AnchorKind {
    AnchorKind::Post
}

pub fn replay(config: &AppConfig, args: ReplayArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading scenario {}", args.scenario.display()))?;
    let mut scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("parsing scenario {}", args.scenario.display()))?;
    if let Some(width) = args.viewport_width {
        scenario.viewport_width = width;
    }
    let output = run_replay(&config.hover, &scenario)?;
    print!("{output}");
    Ok(())
}

pub fn handle_config_command(
    loader: &ConfigLoader,
    config: &AppConfig,
    command: ConfigCommand,
) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let rendered = toml::to_string_pretty(config).context("rendering config")?;
            print!("{rendered}");
        }
        ConfigCommand::Path => println!("{}", loader.paths().config_file.display()),
    }
    Ok(())
}

/// Drives a scheduler on a manual clock and returns the transition trace.
/// Timers fire at their exact deadlines, between scripted steps.
pub fn run_replay(config: &HoverConfig, scenario: &Scenario) -> Result<String> {
    let clock = ManualClock::new();
    let mut scheduler = HoverScheduler::new(clock.clone(), config, scenario.viewport_width);
    let mut tickets: Vec<FetchTicket> = Vec::new();
    let mut out = String::new();
    let mut last_at = 0;

    for step in &scenario.steps {
        if step.at_ms < last_at {
            bail!(
                "scenario steps must be in time order ({}ms after {}ms)",
                step.at_ms,
                last_at
            );
        }
        last_at = step.at_ms;
        let at = Duration::from_millis(step.at_ms);
        fire_due(&clock, &mut scheduler, at, &mut tickets, &mut out)?;
        clock.set(at);

        let label = match &step.event {
            ScenarioEvent::Enter { user, kind, anchor } => {
                let rect = BoundingBox::new(anchor.left, anchor.top, anchor.width, anchor.height);
                scheduler.pointer_enter(HoverTarget::new(user.as_str(), rect, *kind));
                format!("enter {user} ({kind})")
            }
            ScenarioEvent::Leave => {
                scheduler.pointer_leave();
                "leave".to_owned()
            }
            ScenarioEvent::EnterCard => {
                scheduler.pointer_enter_card();
                "enter card".to_owned()
            }
            ScenarioEvent::LeaveCard => {
                scheduler.pointer_leave_card();
                "leave card".to_owned()
            }
            ScenarioEvent::FetchOk {
                generation,
                followers,
                following,
            } => {
                let ticket = pick_ticket(&tickets, *generation)?;
                let payload = UserPreview {
                    id: ticket.user_id.clone(),
                    username: ticket.user_id.to_string(),
                    icon: None,
                    introduction: None,
                    follower_count: *followers,
                    following_count: 0,
                    is_follow: *following,
                    like_count: 0,
                };
                let disposition = scheduler.complete_fetch(&ticket, Ok(payload));
                format!(
                    "fetch ok {}#{} -> {disposition:?}",
                    ticket.user_id, ticket.generation
                )
            }
            ScenarioEvent::FetchErr { generation, code } => {
                let ticket = pick_ticket(&tickets, *generation)?;
                let err = match code {
                    Some(code) => ApiError::Status {
                        code: *code,
                        message: "scripted failure".into(),
                    },
                    None => ApiError::Transport("scripted failure".into()),
                };
                let disposition = scheduler.complete_fetch(&ticket, Err(err));
                format!(
                    "fetch err {}#{} -> {disposition:?}",
                    ticket.user_id, ticket.generation
                )
            }
            ScenarioEvent::Resize { width } => {
                scheduler.set_viewport_width(*width);
                format!("resize {width}")
            }
        };
        trace_line(&mut out, at, &label, &scheduler)?;
    }

    // let whatever is still armed run out
    while let Some(deadline) = scheduler.next_deadline() {
        fire_due(&clock, &mut scheduler, deadline, &mut tickets, &mut out)?;
    }
    Ok(out)
}

fn fire_due(
    clock: &ManualClock,
    scheduler: &mut HoverScheduler<ManualClock>,
    until: Duration,
    tickets: &mut Vec<FetchTicket>,
    out: &mut String,
) -> Result<()> {
    while let Some(deadline) = scheduler.next_deadline().filter(|d| *d <= until) {
        clock.set(deadline);
        let Some(event) = scheduler.poll() else {
            break;
        };
        let label = match event {
            SchedulerEvent::FetchRequested(ticket) => {
                let position = scheduler.state().position;
                let label = format!(
                    "show {}#{} at ({}, {})",
                    ticket.user_id, ticket.generation, position.top, position.left
                );
                tickets.push(ticket);
                label
            }
            SchedulerEvent::Hidden => "hide".to_owned(),
        };
        trace_line(out, deadline, &label, scheduler)?;
    }
    Ok(())
}

fn pick_ticket(tickets: &[FetchTicket], generation: Option<u64>) -> Result<FetchTicket> {
    let found = match generation {
        Some(generation) => tickets.iter().find(|t| t.generation == generation),
        None => tickets.last(),
    };
    found
        .cloned()
        .context("fetch result scripted before any fetch was requested")
}

fn trace_line(
    out: &mut String,
    at: Duration,
    label: &str,
    scheduler: &HoverScheduler<ManualClock>,
) -> Result<()> {
    writeln!(
        out,
        "{:>6}ms  {:<36} {}",
        at.as_millis(),
        label,
        scheduler.phase()
    )
    .context("formatting trace line")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    fn scenario(raw: &str) -> Scenario {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn replay_shows_card_after_delay() -> TestResult {
        let scenario = scenario(
            r#"{
                "viewport_width": 1280,
                "steps": [
                    {"at_ms": 0, "event": {"type": "enter", "user": "ada",
                        "anchor": {"left": 100, "top": 50, "width": 40, "height": 40}}},
                    {"at_ms": 450, "event": {"type": "fetch_ok", "followers": 10}}
                ]
            }"#,
        );
        let output = run_replay(&HoverConfig::default(), &scenario)?;
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 3, "{output}");
        assert!(lines[0].contains("enter ada (post)") && lines[0].ends_with("PendingShow"));
        assert!(lines[1].starts_with("   400ms"));
        assert!(lines[1].contains("show ada#1 at (98, 100)"));
        assert!(lines[1].ends_with("Visible(loading)"));
        assert!(lines[2].contains("Applied") && lines[2].ends_with("Visible(loaded)"));
        Ok(())
    }

    #[test]
    fn replay_quick_leave_never_shows() -> TestResult {
        let scenario = scenario(
            r#"{"steps": [
                {"at_ms": 0, "event": {"type": "enter", "user": "ada",
                    "anchor": {"left": 0, "top": 0, "width": 10, "height": 10}}},
                {"at_ms": 200, "event": {"type": "leave"}}
            ]}"#,
        );
        let output = run_replay(&HoverConfig::default(), &scenario)?;
        assert!(!output.contains("show"), "{output}");
        assert!(output.trim_end().ends_with("Hidden"));
        Ok(())
    }

    #[test]
    fn replay_reports_stale_results() -> TestResult {
        let scenario = scenario(include_str!("../../demos/stale-fetch.json"));
        let output = run_replay(&HoverConfig::default(), &scenario)?;
        assert!(output.contains("fetch ok a#1 -> Stale"), "{output}");
        assert!(output.contains("fetch ok b#2 -> Applied"), "{output}");
        Ok(())
    }

    #[test]
    fn replay_drains_trailing_timers() -> TestResult {
        let scenario = scenario(
            r#"{"steps": [
                {"at_ms": 0, "event": {"type": "enter", "user": "ada", "kind": "reply",
                    "anchor": {"left": 0, "top": 0, "width": 10, "height": 10}}},
                {"at_ms": 500, "event": {"type": "leave"}}
            ]}"#,
        );
        let output = run_replay(&HoverConfig::default(), &scenario)?;
        let last = output.lines().last().unwrap_or_default();
        assert!(last.starts_with("   800ms") && last.contains("hide"), "{output}");
        Ok(())
    }

    #[test]
    fn replay_rejects_out_of_order_steps() {
        let scenario = scenario(
            r#"{"steps": [
                {"at_ms": 100, "event": {"type": "leave"}},
                {"at_ms": 50, "event": {"type": "leave"}}
            ]}"#,
        );
        let err = run_replay(&HoverConfig::default(), &scenario).unwrap_err();
        assert!(err.to_string().contains("time order"));
    }

    #[test]
    fn fetch_without_ticket_is_an_error() {
        let scenario = scenario(r#"{"steps": [{"at_ms": 0, "event": {"type": "fetch_err"}}]}"#);
        assert!(run_replay(&HoverConfig::default(), &scenario).is_err());
    }

    #[test]
    fn replay_reads_scenario_file_with_width_override() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("scenario.json");
        fs::write(&path, include_str!("../../demos/stale-fetch.json"))?;
        let args = ReplayArgs {
            scenario: path,
            viewport_width: Some(320.0),
        };
        replay(&AppConfig::default(), args)
    }
}
