// Walk a group's full history and print one line per record.
//
// Usage: fetch_history <seed-url> [start-trx-id]

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use quill_client::{classify_item, LightClient, TraverseOptions, TrxKind};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(seed_url) = args.next() else {
        bail!("usage: fetch_history <seed-url> [start-trx-id]");
    };
    let start_cursor = args.next();

    let client = LightClient::from_seed_url(&seed_url).context("decoding seed")?;
    println!("group {}", client.group_id());

    let options = TraverseOptions {
        start_cursor,
        deep_reply: true,
        ..TraverseOptions::default()
    };

    let mut total = 0usize;
    for item in client.traverse(options) {
        let item = item.context("fetching history")?;
        total += 1;
        match &item {
            Ok(record) => {
                let kind = classify_item(&item, true);
                let text = record
                    .content
                    .get("content")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                println!("{} {:>16} {} {}", record.trx_id, kind.to_string(), record.publisher, text);
            }
            Err(trx) => {
                println!("{} {:>16}", trx.trx_id, TrxKind::Encrypted.to_string());
            }
        }
    }
    println!("{total} records");
    Ok(())
}
