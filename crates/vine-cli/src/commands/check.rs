//! `vine check` command implementation.
//!
//! Loads the project and layered settings, runs every analyzer unit against a
//! shared registry client, and renders the merged result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Args;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, warn};
use vine_analyzer::{default_units, AnalysisContext, MergedResult, Orchestrator, ProgressEvent};
use vine_config::{ProjectLoader, Settings, SettingsLayering, SettingsLoader};
use vine_core::{VineError, VineResult};
use vine_registry::{AuthConfig, MetadataCache, RegistryClient, RegistryOptions, RetryConfig};
use vine_resolver::Exclusions;

use super::{CommandContext, Outcome};
use crate::output::progress::ProgressBar;
use crate::output::report::ReportRenderer;

#[derive(Debug, Clone, Default, Args)]
pub struct CheckArgs {
    /// Project directory (defaults to the current directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Use cached registry data only
    #[arg(long)]
    pub offline: bool,

    /// Dependency levels to follow beyond the manifest, or "unbounded"
    #[arg(long, value_name = "N", conflicts_with = "deep")]
    pub depth: Option<String>,

    /// Follow the whole dependency graph
    #[arg(long)]
    pub deep: bool,

    /// Skip packages matching a name or glob (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Registry base URL
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Print the merged result as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not read or write the on-disk registry cache
    #[arg(long)]
    pub no_cache: bool,
}

impl CheckArgs {
    /// Flags as settings overrides, the highest-priority layer
    pub fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if self.offline {
            overrides.insert("offline".to_string(), "true".to_string());
        }
        if self.no_cache {
            overrides.insert("no-cache".to_string(), "true".to_string());
        }
        if self.deep {
            overrides.insert("depth".to_string(), "unbounded".to_string());
        } else if let Some(ref depth) = self.depth {
            overrides.insert("depth".to_string(), depth.clone());
        }
        if let Some(ref registry) = self.registry {
            overrides.insert("registry".to_string(), registry.clone());
        }
        if !self.exclude.is_empty() {
            overrides.insert("exclude".to_string(), self.exclude.join(","));
        }
        overrides
    }
}

/// Execute the `vine check` command
pub async fn execute(args: CheckArgs, ctx: &CommandContext) -> VineResult<Outcome> {
    let root = project_root(&ctx.cwd, args.path.as_deref())?;

    let base = SettingsLoader::new(root.clone()).load().await?;
    let settings = SettingsLayering::merge(
        base,
        &SettingsLayering::collect_env_overrides(),
        &args.overrides(),
    )?;
    debug!(
        registry = %settings.registry.url,
        depth = %settings.analysis.depth,
        offline = settings.registry.offline,
        "effective settings"
    );

    let merged = run_analysis(&root, &settings, args.json || !ctx.output.is_interactive()).await?;

    if args.json {
        let json = serde_json::to_string_pretty(&merged)
            .map_err(|e| VineError::io("Failed to render JSON report".to_string(), e.into()))?;
        println!("{}", json);
    } else {
        let renderer = ReportRenderer::new(ctx.output.colors());
        print!("{}", renderer.render(&root, &merged));
    }
    if !merged.failures.is_empty() {
        ctx.output.warn(&format!(
            "{} analyzer(s) did not complete; results are partial",
            merged.failures.len()
        ));
    }

    Ok(if merged.has_errors() {
        Outcome::Findings
    } else {
        Outcome::Clean
    })
}

/// Load the project, run every unit and persist the cache
pub async fn run_analysis(root: &Utf8PathBuf, settings: &Settings, quiet: bool) -> VineResult<MergedResult> {
    let model = ProjectLoader::new()
        .with_overlap(settings.analysis.overlap)
        .with_dev(settings.analysis.include_dev)
        .load(root)
        .await?;
    let exclusions = Exclusions::new(&settings.analysis.exclude)?;

    let cache_path = settings.cache_path();
    let cache = Arc::new(match cache_path {
        Some(ref path) => MetadataCache::load(path, settings.cache_ttl()).await,
        None => MetadataCache::with_ttl(settings.cache_ttl()),
    });
    let registry = RegistryClient::with_cache(registry_options(settings), Arc::clone(&cache))?;

    let context = AnalysisContext::new(model, registry.clone())
        .with_depth(settings.analysis.depth)
        .with_exclusions(exclusions);

    let (sender, receiver) = mpsc::unbounded_channel();
    let progress = tokio::spawn(show_progress(receiver, !quiet));

    let orchestrator = Orchestrator::new(context)
        .with_concurrency(settings.analysis.unit_concurrency)
        .with_timeout(settings.run_timeout())
        .with_progress(sender);
    let merged = orchestrator.run(default_units()).await;
    drop(orchestrator);
    let _ = progress.await;

    debug!(requests = registry.request_count(), "registry requests issued");
    if let Some(path) = cache_path {
        if let Err(error) = cache.persist(&path).await {
            warn!(path = %path, error = %error, "could not persist registry cache");
        }
    }

    Ok(merged)
}

/// Registry client options from settings
pub fn registry_options(settings: &Settings) -> RegistryOptions {
    let registry = &settings.registry;
    RegistryOptions {
        base_url: registry.url.clone(),
        concurrency: registry.concurrency,
        timeout: settings.request_timeout(),
        retry: RetryConfig {
            max_retries: registry.retries,
            ..RetryConfig::default()
        },
        offline: registry.offline,
        auth: registry.token.clone().map(|token| AuthConfig {
            token: Some(token),
            ..AuthConfig::default()
        }),
        proxy: registry.proxy.clone(),
        ..RegistryOptions::default()
    }
}

fn project_root(cwd: &Path, path: Option<&Path>) -> VineResult<Utf8PathBuf> {
    let root = match path {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd.to_path_buf(),
    };
    Utf8PathBuf::from_path_buf(root).map_err(|path| {
        VineError::validation("path", format!("{} is not valid UTF-8", path.display()))
    })
}

async fn show_progress(mut receiver: UnboundedReceiver<ProgressEvent>, visible: bool) {
    let mut bar: Option<ProgressBar> = None;
    while let Some(event) = receiver.recv().await {
        if !visible {
            continue;
        }
        match event {
            ProgressEvent::Started { unit, total } => {
                bar.get_or_insert_with(|| ProgressBar::new(total as u64, "Analyzing".to_string()))
                    .set_message(format!("Analyzing ({})", unit));
            },
            ProgressEvent::Finished { completed, total, .. } => {
                let bar = bar.get_or_insert_with(|| ProgressBar::new(total as u64, "Analyzing".to_string()));
                bar.update(completed as u64);
                if completed == total {
                    bar.finish();
                }
            },
        }
    }
}
