use chrono::{Local, Utc};
use sponsorbox::config::Config;
use sponsorbox::store::{Store, load_working_set};
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <search_query>", args[0]);
        eprintln!("Search query matches against Sender or Subject.");
        std::process::exit(1);
    }

    let query = args[1].to_lowercase();
    let config = Config::load();
    let store = Store::new(&config.store.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
    store.run_migrations().await?;

    let records = load_working_set(&store, Utc::now()).await?;
    let found = records
        .iter()
        .filter(|r| {
            r.subject().to_lowercase().contains(&query)
                || r.sender.to_lowercase().contains(&query)
        })
        .max_by_key(|r| r.received_at);

    let Some(record) = found else {
        println!("No stored messages found matching '{}'", args[1]);
        return Ok(());
    };

    println!("Found Message:");
    println!("Mail ID: {}", record.mail_id());
    println!("Thread ID: {:?}", record.thread_id);
    println!("Matched By: {:?}", record.matched_by);
    println!("From: {}", record.sender);
    println!("Subject: {}", record.subject());
    println!(
        "Category: {}",
        record.category().map(|c| c.label()).unwrap_or("(none)")
    );
    println!(
        "Received: {}",
        record.received_at.with_timezone(&Local).to_rfc2822()
    );
    println!(
        "--------------------------------------------------------------------------------"
    );
    println!("CLASSIFICATION REASON:");
    println!("{}", record.classified.classification_reason);
    println!("SUMMARY:");
    println!("{}", record.classified.summary);
    println!(
        "--------------------------------------------------------------------------------"
    );
    println!("BODY PLAIN (Raw Debug):");
    println!("{:?}", record.plain_text);
    println!(
        "--------------------------------------------------------------------------------"
    );
    println!("BODY PLAIN (Display):");
    match &record.plain_text {
        Some(text) => println!("{}", text),
        None => println!("(None)"),
    }

    Ok(())
}
