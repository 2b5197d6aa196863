//! Topology CLI - inspect an orchestration topology from the terminal
//!
//! Fetches one snapshot from the topology service (or a JSON file) and
//! prints summaries, layouts, search results and failed objects.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::{style, Emoji, StyledObject};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use topology_studio::config::StudioConfig;
use topology_studio::provider::{source_from_config, FeedUpdate, PollInterval, TopologyFeed};
use topology_studio::topology::highlight::{problem_ids, search_matches};
use topology_studio::topology::{
    compute_layout, layout_bounds, GraphNode, HealthState, NodeKind, ParentMap, TopologySnapshot,
};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "+ ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");
static ARROW: Emoji<'_, '_> = Emoji("→ ", "-> ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "! ");

#[derive(Parser)]
#[command(name = "topology-cli")]
#[command(author = "e421")]
#[command(version)]
#[command(about = "Topology CLI - Inspect orchestration topologies from the terminal")]
#[command(long_about = r#"
Topology CLI fetches a topology snapshot and reports on it.

Examples:
  topology-cli summary                          # Counts per kind and health
  topology-cli layout --expand-all              # Node positions, everything expanded
  topology-cli layout --expand hub-1 --json     # Positions as JSON
  topology-cli search webapp                    # Find nodes by name or kind
  topology-cli problems                         # List failed objects
  topology-cli --file demos/sample_topology.json summary
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Topology service base URL (overrides config)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Read a JSON snapshot instead of calling the service
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// Only include objects in this namespace
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show node counts per kind and health
    Summary,

    /// Print computed node positions
    Layout {
        /// Expand this node (repeatable)
        #[arg(short, long)]
        expand: Vec<String>,

        /// Expand every connector and template
        #[arg(short = 'A', long)]
        expand_all: bool,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Find nodes whose name or kind contains QUERY
    Search {
        query: String,
    },

    /// List failed objects with their ancestry
    Problems,
}

#[derive(Serialize)]
struct PlacedNode<'a> {
    id: &'a str,
    kind: NodeKind,
    name: &'a str,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    visible: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = StudioConfig::load();
    if let Some(url) = cli.url {
        config.api_url = url;
        config.snapshot_file = None;
    }
    if let Some(file) = cli.file {
        config.snapshot_file = Some(file);
    }
    if cli.namespace.is_some() {
        config.namespace = cli.namespace;
    }

    let snapshot = fetch_snapshot(&config)?;
    let parents = ParentMap::build(&snapshot.nodes, &snapshot.edges);

    match cli.command {
        Commands::Summary => cmd_summary(&snapshot, &parents),
        Commands::Layout {
            expand,
            expand_all,
            json,
        } => cmd_layout(&snapshot, &expand, expand_all, json),
        Commands::Search { query } => cmd_search(&snapshot, &parents, &query),
        Commands::Problems => cmd_problems(&snapshot, &parents),
    }
}

fn fetch_snapshot(config: &StudioConfig) -> Result<TopologySnapshot> {
    let source = source_from_config(config).context("Failed to create topology source")?;
    let description = source.describe();
    let mut feed = TopologyFeed::new(source, config.namespace.clone(), PollInterval::Off);

    let timeout = config.request_timeout() + Duration::from_secs(5);
    match feed.wait_for_update(timeout) {
        Some(FeedUpdate::Loaded(snapshot)) => Ok(snapshot),
        Some(FeedUpdate::Failed(e)) => {
            Err(e).with_context(|| format!("Failed to load topology from {}", description))
        }
        None => bail!("Timed out waiting for topology from {}", description),
    }
}

fn health_style(health: HealthState) -> StyledObject<&'static str> {
    match health {
        HealthState::Ready => style(health.label()).green(),
        HealthState::Pending => style(health.label()).yellow(),
        HealthState::Failed => style(health.label()).red().bold(),
        HealthState::Skipped => style(health.label()).dim(),
    }
}

/// `crm → webapp → webapp-0` style path for a node
fn ancestry(snapshot: &TopologySnapshot, parents: &ParentMap, node: &GraphNode) -> String {
    let mut names: Vec<&str> = parents
        .ancestors(&node.id)
        .iter()
        .rev()
        .filter_map(|id| snapshot.node(id).map(|n| n.display_name.as_str()))
        .collect();
    names.push(&node.display_name);
    names.join(" → ")
}

fn cmd_summary(snapshot: &TopologySnapshot, parents: &ParentMap) -> Result<()> {
    println!("\n{}", style("Topology Summary").bold().underlined());
    println!();

    for (kind, count) in snapshot.kind_counts() {
        println!("  {:<12} {}", kind.label(), style(count).white().bold());
    }

    println!();
    for health in [
        HealthState::Ready,
        HealthState::Pending,
        HealthState::Failed,
        HealthState::Skipped,
    ] {
        let count = snapshot.nodes.iter().filter(|n| n.health == health).count();
        println!("  {:<12} {}", health_style(health), count);
    }

    println!();
    println!("  {} {} edges", ARROW, snapshot.edges.len());
    if parents.ignored_edges() > 0 {
        println!(
            "  {}{} edges ignored (unknown endpoint or out-of-order levels)",
            WARN,
            style(parents.ignored_edges()).yellow()
        );
    }
    for dup in parents.duplicates() {
        println!(
            "  {}{} claimed by {} and {} (kept {})",
            WARN,
            style(&dup.child).yellow(),
            dup.kept,
            dup.rejected,
            dup.kept
        );
    }
    println!();
    Ok(())
}

fn cmd_layout(snapshot: &TopologySnapshot, expand: &[String], expand_all: bool, json: bool) -> Result<()> {
    let mut expanded: HashSet<String> = expand.iter().cloned().collect();
    if expand_all {
        expanded.extend(
            snapshot
                .nodes
                .iter()
                .filter(|n| matches!(n.kind, NodeKind::Connector | NodeKind::Template))
                .map(|n| n.id.clone()),
        );
    }
    for id in expand {
        if snapshot.node(id).is_none() {
            eprintln!("{}{} is not in the topology", WARN, style(id).yellow());
        }
    }

    let layout = compute_layout(&snapshot.nodes, &snapshot.edges, &expanded);

    if json {
        let placed: Vec<PlacedNode> = layout
            .iter()
            .map(|n| PlacedNode {
                id: &n.node.id,
                kind: n.node.kind,
                name: &n.node.display_name,
                x: n.pos.x,
                y: n.pos.y,
                width: n.size.x,
                height: n.size.y,
                visible: n.visible,
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&placed).context("Failed to serialize layout")?
        );
        return Ok(());
    }

    println!("\n{}", style("Layout").bold().underlined());
    println!();
    for n in layout.iter().filter(|n| n.visible) {
        let indent = "  ".repeat(n.node.kind.level().unwrap_or(0));
        let chevron = if !n.node.kind.is_expandable() {
            " "
        } else if expanded.contains(&n.node.id) {
            "▾"
        } else {
            "▸"
        };
        println!(
            "  {}{} {} {} {}",
            indent,
            chevron,
            style(&n.node.display_name).white().bold(),
            style(format!("[{}]", n.node.kind.label())).dim(),
            style(format!("({:.0}, {:.0})", n.pos.x, n.pos.y)).cyan()
        );
    }

    let hidden = layout.iter().filter(|n| !n.visible).count();
    println!();
    if let Some(bounds) = layout_bounds(&layout) {
        println!(
            "  {} visible, {} hidden, bounds {:.0}×{:.0}",
            layout.len() - hidden,
            hidden,
            bounds.width(),
            bounds.height()
        );
    } else {
        println!("  {}", style("Nothing to lay out").dim());
    }
    println!();
    Ok(())
}

fn cmd_search(snapshot: &TopologySnapshot, parents: &ParentMap, query: &str) -> Result<()> {
    let matches = search_matches(&snapshot.nodes, query);
    if matches.is_empty() {
        println!("{}No nodes match {}", CROSS, style(query).yellow());
        return Ok(());
    }

    println!(
        "\n{}{} matching {}",
        CHECK,
        style(matches.len()).green().bold(),
        style(query).cyan()
    );
    println!();
    for (index, id) in matches.iter().enumerate() {
        if let Some(node) = snapshot.node(id) {
            println!(
                "  {:>3}. {} {} {}",
                index + 1,
                ancestry(snapshot, parents, node),
                style(format!("[{}]", node.kind.label())).dim(),
                health_style(node.health)
            );
        }
    }
    println!();
    Ok(())
}

fn cmd_problems(snapshot: &TopologySnapshot, parents: &ParentMap) -> Result<()> {
    let failed = problem_ids(&snapshot.nodes);
    if failed.is_empty() {
        println!("{}No problems detected", CHECK);
        return Ok(());
    }

    println!(
        "\n{}{} failed objects",
        WARN,
        style(failed.len()).red().bold()
    );
    println!();
    for id in &failed {
        if let Some(node) = snapshot.node(id) {
            println!(
                "  {}{} {}",
                CROSS,
                ancestry(snapshot, parents, node),
                style(format!("[{}]", node.kind.label())).dim()
            );
            if let Some(reason) = node.metadata.as_ref().and_then(|m| m.orphaned_reason.as_ref()) {
                println!("      {}", style(reason).dim());
            }
        }
    }
    println!();
    Ok(())
}
