use alarmtrail::local_filter::display_timestamp;
use alarmtrail::{
    AlarmHistoryEngine, Config, Credential, EngineSettings, FetchOutcome, FilterPatch, HttpHistoryApi,
    SortOrder,
};
use anyhow::{bail, Context};
use std::sync::Arc;
use tracing::{error, info};

const USAGE: &str = "Usage: alarmtrail <config.yaml> <identity> \
[--status active|acknowledged|resolved|all] [--window 24h|3d|7d|30d] \
[--search TEXT] [--asc] [--all]";

struct Args {
    config_path: String,
    identity: String,
    patch: FilterPatch,
    all_pages: bool,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let config_path = raw.next().context(USAGE)?;
    let identity = raw.next().context(USAGE)?;
    let mut patch = FilterPatch::default();
    let mut all_pages = false;

    while let Some(flag) = raw.next() {
        match flag.as_str() {
            "--status" => patch.status = Some(raw.next().context("--status needs a value")?.parse()?),
            "--window" => patch.time = Some(raw.next().context("--window needs a value")?.parse()?),
            "--search" => patch.search = Some(raw.next().context("--search needs a value")?),
            "--asc" => patch.sort = Some(SortOrder::Asc),
            "--all" => all_pages = true,
            other => bail!("Unknown argument '{}'\n{}", other, USAGE),
        }
    }

    Ok(Args { config_path, identity, patch, all_pages })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    alarmtrail::logging::init();
    info!("alarmtrail v{} starting", alarmtrail::VERSION);

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    let config = Config::from_file(&args.config_path)
        .and_then(Config::with_env_overrides)
        .with_context(|| format!("loading {}", args.config_path))?;

    let api = Arc::new(HttpHistoryApi::new(&config.api)?);
    let engine = AlarmHistoryEngine::new(api, EngineSettings::from_config(&config), &args.identity)
        .with_credential(Credential::from(config.api.bearer_token.clone()));

    // Local-only refinements do not need the first page to exist yet.
    engine.set_filter(args.patch).await?;
    if engine.held_pages().await == 0 {
        engine.open().await?;
    }

    if args.all_pages {
        while let FetchOutcome::Loaded { .. } = engine.load_more().await? {}
    }

    let view = engine.snapshot().await;
    if let Some(advice) = &view.validation_error {
        info!("Custom range ignored: {}", advice);
    }

    match &view.summary {
        Some(latest) => println!(
            "{} - {} {} ({})",
            view.target,
            latest.value,
            latest.unit.as_deref().unwrap_or(""),
            latest.status
        ),
        None => println!("{} - no occurrences in window", view.target),
    }

    for instance in &view.instances {
        println!(
            "{}  {:<12}  {:>10}  {}",
            display_timestamp(&instance.timestamp),
            instance.status.as_str(),
            instance.value.to_string(),
            instance.description
        );
    }

    let total = view
        .server_total
        .map(|t| format!(" of {} on server", t))
        .unwrap_or_default();
    println!(
        "{} occurrences{}{}",
        view.total_count,
        total,
        if view.has_more { " (more available)" } else { "" }
    );

    Ok(())
}
