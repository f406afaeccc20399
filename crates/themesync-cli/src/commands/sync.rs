//! Pull and push command handlers

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::warn;

use themesync_core::{
    resolve_theme, Config, IgnoreFilter, IncludeFilter, SyncContext, Syncer, Theme, ThemeSelector,
    ThemeStore,
};

use crate::output::Output;
use crate::prompt;

/// Which way assets flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Remote to local
    Pull,
    /// Local to remote
    Push,
}

impl Direction {
    fn verb(self) -> &'static str {
        match self {
            Direction::Pull => "pull",
            Direction::Push => "push",
        }
    }

    fn done(self) -> &'static str {
        match self {
            Direction::Pull => "Theme pulled",
            Direction::Push => "Theme pushed",
        }
    }

    fn preposition(self) -> &'static str {
        match self {
            Direction::Pull => "from",
            Direction::Push => "to",
        }
    }
}

/// Flags shared by `pull` and `push`
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Theme root directory
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Theme ID or name
    #[arg(short = 't', long, group = "selector")]
    pub theme: Option<String>,

    /// Theme ID (deprecated, use --theme)
    #[arg(short = 'i', long = "theme-id", group = "selector", hide = true)]
    pub theme_id: Option<String>,

    /// Use the live theme
    #[arg(short = 'l', long, group = "selector")]
    pub live: bool,

    /// Use the development theme
    #[arg(short = 'd', long, group = "selector")]
    pub development: bool,

    /// Keep files missing on the other side
    #[arg(short = 'n', long)]
    pub nodelete: bool,

    /// Only sync paths matching PATTERN (repeatable)
    #[arg(short = 'o', long = "only", value_name = "PATTERN")]
    pub only: Vec<String>,

    /// Skip paths matching PATTERN (repeatable)
    #[arg(short = 'x', long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,
}

/// Result of one pull or push
#[derive(Debug)]
pub struct SyncSummary {
    pub theme: Theme,
    pub queued: usize,
    pub errors: Vec<String>,
}

/// Run `pull` or `push` against the configured store
pub async fn run(
    direction: Direction,
    args: SyncArgs,
    config: &Config,
    output: &Output,
) -> Result<ExitCode> {
    let store = super::connect(config)?;

    let theme = match selector(&args, config, output) {
        Some(selector) => match resolve_theme(store.as_ref(), &selector)
            .await
            .context("Failed to look up themes")?
        {
            Some(theme) => theme,
            None => {
                output.error(&format!("Theme not found: {}", selector));
                return Ok(ExitCode::FAILURE);
            }
        },
        None => ask_for_theme(direction, store.as_ref(), config, output).await?,
    };

    let summary = sync_theme(direction, &args, config, store, theme, output).await?;
    report(direction, &summary, output);
    Ok(ExitCode::SUCCESS)
}

/// Selector from the command line, if one was given
pub fn selector(args: &SyncArgs, config: &Config, output: &Output) -> Option<ThemeSelector> {
    if let Some(id) = &args.theme_id {
        output.warn("The -i/--theme-id flag is deprecated. Use -t/--theme instead.");
        return Some(ThemeSelector::Identifier(id.clone()));
    }
    if let Some(identifier) = &args.theme {
        return Some(ThemeSelector::Identifier(identifier.clone()));
    }
    if args.live {
        return Some(ThemeSelector::Live);
    }
    if args.development {
        return Some(ThemeSelector::Development(config.development_theme_id));
    }
    None
}

async fn ask_for_theme(
    direction: Direction,
    store: &dyn ThemeStore,
    config: &Config,
    output: &Output,
) -> Result<Theme> {
    if !output.should_prompt() {
        bail!("No theme selected. Use --theme, --live, or --development.");
    }

    let themes = store.list_themes().await.context("Failed to list themes")?;
    let question = format!(
        "Select a theme to {} {} {}",
        direction.verb(),
        direction.preposition(),
        config.store.as_deref().unwrap_or("the store")
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    prompt::select_theme(&question, &themes, &mut stdin.lock(), &mut stdout.lock())
}

/// Build filters and a Syncer, run one verb, and drain
pub async fn sync_theme(
    direction: Direction,
    args: &SyncArgs,
    config: &Config,
    store: Arc<dyn ThemeStore>,
    theme: Theme,
    output: &Output,
) -> Result<SyncSummary> {
    let mut ignore_filter =
        IgnoreFilter::from_path(&args.root).context("Failed to load ignore patterns")?;
    ignore_filter
        .add_patterns(&args.ignore)
        .context("Invalid --ignore pattern")?;
    let include_filter =
        IncludeFilter::new(&args.root, &args.only).context("Invalid --only pattern")?;

    let ctx = SyncContext::new(&args.root, store)
        .with_workers(config.worker_count())
        .with_retry_policy(config.retry_policy());
    let mut syncer = Syncer::new(ctx, theme.clone(), include_filter, ignore_filter);

    let progress = syncer.take_events().map(|mut events| {
        let output = *output;
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                output.print_event(&event);
            }
        })
    });

    syncer.start_threads()?;

    let delete = !args.nodelete;
    let queued = {
        // Hold progress back until the header is out
        let _io = syncer.lock_io();
        let result = match direction {
            Direction::Pull => syncer.download_theme(delete).await,
            Direction::Push => syncer.upload_theme(delete).await,
        };
        if let (Ok(count), false) = (&result, output.is_json()) {
            output.message(&format!(
                "{}ing {} file(s) {} {}",
                capitalize(direction.verb()),
                count,
                direction.preposition(),
                theme
            ));
        }
        result
    };

    syncer.shutdown().await;
    let queued = queued?;
    let errors = syncer.error_messages();

    // Dropping the syncer closes the event channel
    drop(syncer);
    if let Some(progress) = progress {
        if let Err(e) = progress.await {
            warn!("Progress reporter ended abnormally: {}", e);
        }
    }

    Ok(SyncSummary {
        theme,
        queued,
        errors,
    })
}

fn report(direction: Direction, summary: &SyncSummary, output: &Output) {
    if output.is_json() {
        let status = if summary.errors.is_empty() {
            "success"
        } else {
            "error"
        };
        println!(
            "{}",
            serde_json::json!({
                "status": status,
                "message": direction.done(),
                "theme": summary.theme,
                "operations": summary.queued,
                "errors": summary.errors,
            })
        );
        return;
    }

    if summary.errors.is_empty() {
        output.success(direction.done());
        let link = match direction {
            Direction::Pull => summary.theme.preview_url(),
            Direction::Push => summary.theme.editor_url(),
        };
        output.message(&format!("  {}", link));
    } else {
        output.warn(&format!(
            "{} with errors ({} of {} operation(s) failed):",
            direction.done(),
            summary.errors.len(),
            summary.queued
        ));
        for message in &summary.errors {
            output.error(&format!("  {}", message));
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
