use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use declutter::rank::{apply_ranks, sort_by_rank};
use declutter::{
    DeclutterConfig, DeclutterEngine, DeclutterFrame, Event, EventId, Interaction, MarkerIcon,
    Placement, RenderTier, WebMercatorProjector, load_events_json,
};
use foundation::bounds::GeoBounds;
use foundation::time::Millis;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "declutter", about = "Declutter and rank geolocated events for a map viewport")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one resolution pass and print the partition as JSON.
    Resolve {
        #[command(flatten)]
        input: Input,
        /// south,west,north,east in degrees
        #[arg(long, value_parser = parse_bounds, allow_hyphen_values = true, default_value = "-90,-180,90,180")]
        bounds: GeoBounds,
        #[arg(long, default_value_t = 3.0)]
        zoom: f64,
        /// Overrides visibleBudget from the config.
        #[arg(long)]
        budget: Option<usize>,
        /// Include marker visuals for visible events.
        #[arg(long)]
        icons: bool,
    },
    /// Print events ordered by rank.
    Rank {
        #[command(flatten)]
        input: Input,
    },
    /// Drive the engine through a timed script, printing one JSON line per pass.
    Replay {
        #[command(flatten)]
        input: Input,
        #[arg(long)]
        script: PathBuf,
    },
}

#[derive(Args)]
struct Input {
    /// JSON array of event records.
    #[arg(long)]
    events: PathBuf,
    /// JSON configuration; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    match Cli::parse().command {
        Command::Resolve {
            input,
            bounds,
            zoom,
            budget,
            icons,
        } => cmd_resolve(&input, bounds, zoom, budget, icons),
        Command::Rank { input } => cmd_rank(&input),
        Command::Replay { input, script } => cmd_replay(&input, &script),
    }
}

fn cmd_resolve(
    input: &Input,
    bounds: GeoBounds,
    zoom: f64,
    budget: Option<usize>,
    icons: bool,
) -> Result<(), String> {
    let mut config = load_config(input.config.as_deref())?;
    if let Some(b) = budget {
        config.visible_budget = b;
    }
    let events = load_events(&input.events)?;

    let mut engine = DeclutterEngine::new(config, WebMercatorProjector, Millis::ZERO)
        .map_err(|e| e.to_string())?;
    engine.on_events_changed(events);
    engine
        .on_viewport_changed(bounds, zoom, Millis::ZERO)
        .map_err(|e| e.to_string())?;
    let frame = engine
        .resolve_now()
        .cloned()
        .ok_or_else(|| "no viewport to resolve".to_string())?;

    let mut report = FrameReport::new(&frame, None);
    if icons {
        for (out, placement) in report.visible.iter_mut().zip(&frame.visible) {
            out.icon = engine.icon(placement).cloned();
        }
    }
    print_json(&report)
}

fn cmd_rank(input: &Input) -> Result<(), String> {
    let mut events = load_events(&input.events)?;
    apply_ranks(&mut events);
    sort_by_rank(&mut events);

    let rows: Vec<RankRow> = events
        .iter()
        .map(|e| RankRow {
            id: e.id.to_string(),
            score: e.score,
            rank: e.rank,
        })
        .collect();
    print_json(&rows)
}

fn cmd_replay(input: &Input, script: &Path) -> Result<(), String> {
    let config = load_config(input.config.as_deref())?;
    let settle = config.debounce_ms;
    let events = load_events(&input.events)?;

    let text = fs::read_to_string(script).map_err(|e| format!("read {script:?}: {e}"))?;
    let mut steps: Vec<Step> =
        serde_json::from_str(&text).map_err(|e| format!("parse {script:?}: {e}"))?;
    steps.sort_by_key(|s| s.at);

    let mut engine = DeclutterEngine::new(config, WebMercatorProjector, Millis::ZERO)
        .map_err(|e| e.to_string())?;
    engine.on_events_changed(events);

    let mut passes = 0;
    for step in &steps {
        let now = Millis(step.at);
        if let Some(frame) = engine.poll(now) {
            passes += 1;
            print_line(&FrameReport::new(frame, Some(step.at)))?;
        }
        apply_step(&mut engine, step, now)?;
    }

    let end = steps.last().map_or(0, |s| s.at) + settle;
    if let Some(frame) = engine.poll(Millis(end)) {
        passes += 1;
        print_line(&FrameReport::new(frame, Some(end)))?;
    }
    info!("replayed {} steps, {passes} passes", steps.len());
    Ok(())
}

fn apply_step(
    engine: &mut DeclutterEngine<WebMercatorProjector>,
    step: &Step,
    now: Millis,
) -> Result<(), String> {
    if let Some(v) = &step.viewport {
        let [south, west, north, east] = v.bounds;
        engine
            .on_viewport_changed(GeoBounds::new(south, west, north, east), v.zoom, now)
            .map_err(|e| format!("step at {}: {e}", step.at))?;
    }
    if let Some(i) = &step.interact
        && !engine.interact(&EventId::new(i.id.as_str()), i.kind.into())
    {
        return Err(format!("step at {}: unknown event {}", step.at, i.id));
    }
    if let Some(s) = &step.score
        && !engine.on_score_mutation(&EventId::new(s.id.as_str()), s.delta)
    {
        return Err(format!("step at {}: unknown event {}", step.at, s.id));
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DeclutterConfig, String> {
    match path {
        Some(p) => DeclutterConfig::from_path(p).map_err(|e| e.to_string()),
        None => Ok(DeclutterConfig::default()),
    }
}

fn load_events(path: &Path) -> Result<Vec<Event>, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    load_events_json(&text).map_err(|e| format!("{path:?}: {e}"))
}

fn parse_bounds(s: &str) -> Result<GeoBounds, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        &[south, west, north, east] => Ok(GeoBounds::new(south, west, north, east)),
        _ => Err(format!("expected south,west,north,east, got {s:?}")),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

fn print_line<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

#[derive(Deserialize)]
struct Step {
    at: u64,
    #[serde(default)]
    viewport: Option<ViewportStep>,
    #[serde(default)]
    interact: Option<InteractStep>,
    #[serde(default)]
    score: Option<ScoreStep>,
}

#[derive(Deserialize)]
struct ViewportStep {
    /// south, west, north, east
    bounds: [f64; 4],
    zoom: f64,
}

#[derive(Deserialize)]
struct InteractStep {
    id: String,
    kind: InteractionKind,
}

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum InteractionKind {
    Hover,
    Click,
    Like,
    Comment,
}

impl From<InteractionKind> for Interaction {
    fn from(kind: InteractionKind) -> Self {
        match kind {
            InteractionKind::Hover => Interaction::Hover,
            InteractionKind::Click => Interaction::Click,
            InteractionKind::Like => Interaction::Like,
            InteractionKind::Comment => Interaction::Comment,
        }
    }
}

#[derive(Deserialize)]
struct ScoreStep {
    id: String,
    delta: f64,
}

#[derive(Serialize)]
struct RankRow {
    id: String,
    score: f64,
    rank: u32,
}

#[derive(Serialize)]
struct PlacementReport {
    id: String,
    rank: u32,
    score: f64,
    tier: RenderTier,
    lat: f64,
    lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<MarkerIcon>,
}

impl From<&Placement> for PlacementReport {
    fn from(p: &Placement) -> Self {
        Self {
            id: p.event.id.to_string(),
            rank: p.event.rank,
            score: p.event.score,
            tier: p.tier,
            lat: p.event.location.lat,
            lng: p.event.location.lng,
            icon: None,
        }
    }
}

#[derive(Serialize)]
struct ClusterReport {
    id: String,
    size: usize,
    representative: String,
    center: [f64; 2],
    bounds: [f64; 4],
    /// min x, min y, max x, max y in world pixels
    extent_px: [f64; 4],
}

#[derive(Serialize)]
struct FrameReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    at: Option<u64>,
    pass: u64,
    zoom: f64,
    bounds: [f64; 4],
    visible: Vec<PlacementReport>,
    hidden: Vec<PlacementReport>,
    clusters: Vec<ClusterReport>,
}

impl FrameReport {
    fn new(frame: &DeclutterFrame, at: Option<u64>) -> Self {
        let b = frame.viewport.bounds;
        Self {
            at,
            pass: frame.pass,
            zoom: frame.viewport.zoom,
            bounds: [b.south, b.west, b.north, b.east],
            visible: frame.visible.iter().map(PlacementReport::from).collect(),
            hidden: frame.hidden.iter().map(PlacementReport::from).collect(),
            clusters: frame
                .clusters
                .iter()
                .map(|c| ClusterReport {
                    id: c.id.to_string(),
                    size: c.len(),
                    representative: c.representative.to_string(),
                    center: [c.center.lat, c.center.lng],
                    bounds: [c.bounds.south, c.bounds.west, c.bounds.north, c.bounds.east],
                    extent_px: [c.extent.min.x, c.extent.min.y, c.extent.max.x, c.extent.max.y],
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bounds_argument() {
        assert_eq!(
            parse_bounds("-10, -20.5, 10, 20").unwrap(),
            GeoBounds::new(-10.0, -20.5, 10.0, 20.0)
        );
        assert!(parse_bounds("1,2,3").is_err());
        assert!(parse_bounds("a,b,c,d").is_err());
    }

    #[test]
    fn replay_script_steps_deserialize() {
        let steps: Vec<Step> = serde_json::from_str(
            r#"[
                {"at": 0, "viewport": {"bounds": [-10, -10, 10, 10], "zoom": 6}},
                {"at": 250, "interact": {"id": "a", "kind": "like"}},
                {"at": 400, "score": {"id": "a", "delta": -2.5}}
            ]"#,
        )
        .unwrap();
        assert_eq!(steps.len(), 3);
        assert!(steps[0].viewport.is_some());
        assert!(matches!(
            steps[1].interact.as_ref().map(|i| Interaction::from(i.kind)),
            Some(Interaction::Like)
        ));
        assert_eq!(steps[2].score.as_ref().map(|s| s.delta), Some(-2.5));
    }
}
