use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use dockwright::core_types::{Rect, WatcherState};
use dockwright::dom_port::{Document, ElementRef};
use dockwright::input_locator::{AnchorSource, Candidate, InputLocator};
use dockwright::profile_center::{Profile, ProfileCatalog};
use dockwright::{load_profiles, DockwrightConfig, LifecycleWatcher};
use serde::Serialize;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::info;

use super::output::{emit, OutputFormat};
use super::runtime::load_page;

#[derive(Args, Debug)]
pub struct ProfilesArgs {
    /// Validate a profile file (JSON or YAML) and save it to the store first
    #[arg(long, value_name = "FILE")]
    pub import: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// URL to resolve against the loaded profiles
    pub url: String,
}

#[derive(Args, Debug)]
pub struct LocateArgs {
    /// JSON page fixture
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,

    /// How many heuristic candidates to list
    #[arg(long, default_value_t = 5)]
    pub top: usize,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// JSON page fixture
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,

    /// How long to run the watcher, e.g. `3s` or `1500ms`
    #[arg(long = "for", value_name = "DURATION", value_parser = humantime::parse_duration, default_value = "3s")]
    pub duration: Duration,

    /// Remove every element matching SELECTOR once mounted, to exercise repair
    #[arg(long, value_name = "SELECTOR")]
    pub remove: Vec<String>,
}

pub fn cmd_profiles(args: ProfilesArgs, catalog: &ProfileCatalog, output: OutputFormat) -> Result<()> {
    if let Some(path) = args.import {
        let profiles = load_profiles(&path)
            .with_context(|| format!("Failed to import profiles from {}", path.display()))?;
        catalog.save(&profiles).context("Failed to save profiles")?;
        info!(count = profiles.len(), path = %path.display(), "profiles imported");
    }

    let profiles = catalog.snapshot();
    emit(output, profiles.as_ref(), || {
        let mut text = format!("{} profiles ({:?})\n", profiles.len(), catalog.source());
        for profile in profiles.iter() {
            let _ = writeln!(
                text,
                "  {:<16} {:<28} {:<14} {:<10} {}{}",
                profile.id,
                profile.domain_pattern,
                profile.path_pattern.as_deref().unwrap_or("-"),
                profile.platform.as_deref().unwrap_or("generic"),
                profile.placement_mode.name(),
                if profile.enabled { "" } else { " (disabled)" }
            );
        }
        text
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchReport {
    url: String,
    tier: Option<&'static str>,
    profile: Option<Profile>,
}

pub fn cmd_match(args: MatchArgs, catalog: &ProfileCatalog, output: OutputFormat) -> Result<()> {
    let resolved = catalog.resolve(&args.url);
    let report = MatchReport {
        url: args.url,
        tier: resolved.as_ref().map(|(tier, _)| tier.name()),
        profile: resolved.map(|(_, profile)| profile),
    };
    emit(output, &report, || match (&report.profile, report.tier) {
        (Some(profile), Some(tier)) => format!("{} -> {} ({tier})", report.url, profile.id),
        _ => format!("{} -> no profile (heuristic)", report.url),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FoundInput {
    source: AnchorSource,
    element: String,
    rect: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    anchor: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CandidateReport {
    element: String,
    size_score: f64,
    position_score: f64,
    semantic_score: f64,
    total: f64,
}

impl From<&Candidate> for CandidateReport {
    fn from(candidate: &Candidate) -> Self {
        Self {
            element: describe(&candidate.element),
            size_score: round(candidate.size_score),
            position_score: round(candidate.position_score),
            semantic_score: round(candidate.semantic_score),
            total: round(candidate.total),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocateReport {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<String>,
    found: Option<FoundInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    candidates: Vec<CandidateReport>,
}

pub fn cmd_locate(
    args: LocateArgs,
    config: &DockwrightConfig,
    catalog: &ProfileCatalog,
    output: OutputFormat,
) -> Result<()> {
    let page = load_page(&args.page)?;
    let url = page.url();
    let profile = catalog.resolve(&url).map(|(_, profile)| profile);
    let locator = InputLocator::new(config.heuristic.clone());

    let (found, error) = match locator.try_locate(&page, profile.as_ref()) {
        Ok(result) => (
            Some(FoundInput {
                source: result.anchor_source,
                element: describe(&result.element),
                rect: result.element.bounding_box(),
                anchor: result.anchor.as_ref().map(describe),
            }),
            None,
        ),
        Err(err) => (None, Some(err.to_string())),
    };

    let mut ranked = locator.scorer().rank(&page);
    ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
    let report = LocateReport {
        url,
        profile: profile.map(|profile| profile.id),
        found,
        error,
        candidates: ranked.iter().take(args.top).map(CandidateReport::from).collect(),
    };

    emit(output, &report, || {
        let mut text = String::new();
        let _ = writeln!(text, "url: {}", report.url);
        match &report.found {
            Some(found) => {
                let _ = writeln!(text, "found: {} via {}", found.element, found.source);
                if let Some(anchor) = &found.anchor {
                    let _ = writeln!(text, "anchor: {anchor}");
                }
            }
            None => {
                let _ = writeln!(
                    text,
                    "no input found ({})",
                    report.error.as_deref().unwrap_or("unknown")
                );
            }
        }
        for candidate in &report.candidates {
            let _ = writeln!(
                text,
                "  {:<32} total {:.3}  size {:.3}  position {:.3}  semantic {:.3}",
                candidate.element,
                candidate.total,
                candidate.size_score,
                candidate.position_score,
                candidate.semantic_score
            );
        }
        text
    })
}

pub async fn cmd_watch(
    args: WatchArgs,
    config: &DockwrightConfig,
    catalog: Arc<ProfileCatalog>,
    output: OutputFormat,
) -> Result<()> {
    let page = load_page(&args.page)?;
    let deadline = Instant::now() + args.duration;
    let watcher = LifecycleWatcher::new(Arc::new(page.clone()), catalog, config);
    let mut states = watcher.subscribe_state();
    watcher.start();

    let settled = matches!(
        timeout(
            args.duration,
            states.wait_for(|state| matches!(state, WatcherState::Mounted | WatcherState::Degraded)),
        )
        .await,
        Ok(Ok(_))
    );

    if settled && watcher.state() == WatcherState::Mounted && !args.remove.is_empty() {
        for selector in &args.remove {
            let matched = page
                .query_selector_all(selector)
                .with_context(|| format!("Invalid selector {selector:?}"))?;
            for element in &matched {
                page.remove(element);
            }
            info!(selector = %selector, removed = matched.len(), "removed elements");
        }
    }

    sleep_until(deadline).await;
    let snapshot = watcher.debug_snapshot();
    watcher.stop();
    emit(output, &snapshot, || snapshot.to_string())
}

fn describe(element: &ElementRef) -> String {
    let mut label = element.tag_name();
    if let Some(id) = element.attribute("id").filter(|id| !id.is_empty()) {
        label.push('#');
        label.push_str(&id);
    }
    if let Some(class) = element
        .attribute("class")
        .and_then(|class| class.split_whitespace().next().map(str::to_string))
    {
        label.push('.');
        label.push_str(&class);
    }
    label
}

fn round(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
