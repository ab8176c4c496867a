use anyhow::{Context, Result};
use chrono::{Local, Utc};
use sponsorbox::config::{Config, SourceKind};
use sponsorbox::gmail::GmailSource;
use sponsorbox::mailbox::{MailboxFilter, sorted_newest_first};
use sponsorbox::refresh::{ClassificationSource, RawMessageSource, RefreshOutcome, refresh};
use sponsorbox::stats::{DerivedStats, aggregate};
use sponsorbox::store::{Store, load_working_set};
use sponsorbox::sync::{RefreshState, SharedRefreshState, lock};
use sponsorbox::webhook::{WebhookClassifier, WebhookSync};
use sponsorbox::{Category, EnrichedRecord, logging, usable};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let has_flag = |flag: &str| args.iter().any(|arg| arg == flag);

    logging::init(has_flag("--debug"))?;
    let config = Config::load();

    let store = Store::new(&config.store.database_url)
        .await
        .context("Failed to open store")?;
    store.run_migrations().await?;

    if has_flag("--reset-store") {
        store.clear().await?;
        println!("Stored datasets cleared.");
        return Ok(());
    }

    let state = RefreshState::shared();
    let stored = load_working_set(&store, Utc::now()).await?;
    lock(&state).hydrate(stored);

    if !has_flag("--offline") {
        run_refresh(&config, &store, &state).await?;
    }

    let working = lock(&state).current();
    let records = usable(working.records.clone());
    let stats = aggregate(&records, &Local::now(), &config.stats.high_value());

    let filter = MailboxFilter {
        category: flag_value(&args, "--category").map(Category::from),
        search: flag_value(&args, "--search"),
    };

    if has_flag("--json") {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    print_mailbox(&filter, &records);

    Ok(())
}

/// Failed refreshes are reported and otherwise ignored; whatever was
/// loaded from the store stays on screen.
async fn run_refresh(config: &Config, store: &Store, state: &SharedRefreshState) -> Result<()> {
    let Some(credential) = config.auth.access_token() else {
        eprintln!(
            "No access token in ${}; showing stored data.",
            config.auth.access_token_env
        );
        return Ok(());
    };

    let classifier = WebhookClassifier::new(config.sources.classify_url.clone());
    let raw_source: Box<dyn RawMessageSource> = match config.sources.kind {
        SourceKind::Webhook => Box::new(WebhookSync::new(config.sources.sync_url.clone())),
        SourceKind::Gmail => Box::new(GmailSource::new(
            config.sources.gmail_label.clone(),
            config.sources.gmail_max_results,
            config.sources.gmail_concurrency,
        )),
    };

    let classifier: &dyn ClassificationSource = &classifier;
    match refresh(state, classifier, &*raw_source, &credential).await {
        Ok(RefreshOutcome::Installed {
            working,
            classified,
            raw,
        }) => {
            store
                .save_classified(&classified)
                .await
                .context("Failed to persist classification results")?;
            store
                .save_raw(&raw)
                .await
                .context("Failed to persist raw sync results")?;
            info!(generation = working.generation, "refresh persisted");
        }
        Ok(RefreshOutcome::Superseded(ticket)) => {
            debug!(generation = ticket.generation, "refresh superseded");
        }
        Err(e) => {
            eprintln!("Refresh failed: {}. Showing previously stored data.", e);
        }
    }
    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .filter(|value| !value.starts_with("--"))
        .cloned()
}

fn print_stats(stats: &DerivedStats) {
    println!("Total:        {}", stats.total);
    for (category, count) in &stats.by_category {
        println!("  {:<12}{}", category.display_name(), count);
    }
    println!(
        "{} ratio: {:.1}%",
        stats.high_value_category.display_name(),
        stats.ratio
    );
    println!("Today:        {}", stats.today);
    println!("Last 7 days:  {}", stats.recent);
}

fn print_mailbox(filter: &MailboxFilter, records: &[EnrichedRecord]) {
    let shown = sorted_newest_first(filter.apply(records));
    println!(
        "--------------------------------------------------------------------------------"
    );
    if shown.is_empty() {
        println!("No messages match.");
        return;
    }
    for record in shown {
        let category = record
            .category()
            .map(|c| c.display_name())
            .unwrap_or_default();
        println!(
            "{}  [{}]  {}  {}",
            record.received_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            category,
            record.sender_parts().short(),
            record.subject()
        );
        println!("    {}", record.classified.summary);
    }
}
