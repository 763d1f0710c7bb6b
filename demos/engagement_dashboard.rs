//! Engagement Dashboard
//!
//! Prints the full engagement report for a posts dataset: the best post
//! type, weekday and hour, the ranking behind each, and the strongly
//! correlated metrics.
//!
//! With a file argument the dataset is loaded using an optional JSON config.
//! Without a config, `EngineConfig::default()` applies: Facebook export
//! columns, comma-separated. For the semicolon-separated UCI download pass a
//! config such as `{ "csv": { "delimiter": ";" } }`. Without any argument, a
//! synthetic dataset is generated.
//!
//! Run with:
//!   cargo run --example engagement_dashboard
//!   cargo run --example engagement_dashboard -- dataset_Facebook.csv [config.json]
//!
//! Set `RUST_LOG=engagement_insights=debug` to see skipped rows and
//! undefined correlations.

use anyhow::Context;
use arrow::util::pretty::pretty_format_batches;
use engagement_insights::config::EngineConfig;
use engagement_insights::dataset::{Dataset, PostRecord};
use engagement_insights::insights::{EngagementReport, InsightsEngine};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let (dataset, engine, preview_rows) = match args.as_slice() {
        [] => {
            println!("No dataset given, generating 500 synthetic posts\n");
            let dataset = synthetic_posts(500)?;
            (dataset, InsightsEngine::builder().build()?, 5)
        }
        [data, rest @ ..] => {
            let config = match rest.first() {
                Some(path) => EngineConfig::from_json_file(path)
                    .with_context(|| format!("loading config {path}"))?,
                None => EngineConfig::default(),
            };
            let dataset = config
                .load_dataset(data)
                .with_context(|| format!("loading dataset {data}"))?;
            (dataset, InsightsEngine::from_config(&config)?, config.preview_rows)
        }
    };

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 Dataset Preview ({preview_rows} rows)");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let preview = dataset.head(preview_rows);
    println!("{}", pretty_format_batches(&[preview])?);
    println!(
        "  Showing {} of {} rows",
        preview_rows.min(dataset.num_rows()),
        dataset.num_rows()
    );
    println!();

    let start = Instant::now();
    let report = engine.report(&dataset)?;
    let elapsed = start.elapsed();

    print_report(&report);

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("⏱️  Report generated in {elapsed:.2?}");
    println!();
    println!("JSON:");
    println!("{}", report.to_json()?);

    Ok(())
}

fn print_report(report: &EngagementReport) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("💡 Insights");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print!("{report}");
    println!();

    for insight in &report.dimensions {
        println!("🏆 {} ranking", insight.recommendation.label);
        for group in &insight.ranking {
            println!(
                "  {:>3}. {:<12} {:>10.1} avg  ({} posts)",
                group.rank, group.key, group.mean, group.count
            );
        }
        println!();
    }
}

/// Posts whose engagement depends on type, weekday and hour
fn synthetic_posts(rows: usize) -> anyhow::Result<Dataset> {
    const POST_TYPES: [(&str, f64); 4] =
        [("Photo", 180.0), ("Status", 220.0), ("Link", 60.0), ("Video", 320.0)];

    let mut rng = StdRng::seed_from_u64(2014);
    let records: Vec<PostRecord> = (0..rows)
        .map(|_| {
            let (post_type, base) = POST_TYPES[rng.gen_range(0..POST_TYPES.len())];
            let weekday: i64 = rng.gen_range(1..=7);
            let hour: i64 = rng.gen_range(0..24);
            let weekend = if weekday >= 6 { 1.3 } else { 1.0 };
            let evening = if (17..=21).contains(&hour) { 1.2 } else { 1.0 };

            let like = base * weekend * evening * rng.gen_range(0.5..1.5);
            let share = like * rng.gen_range(0.08..0.15);
            let comment = like * rng.gen_range(0.0..0.05);

            PostRecord::builder()
                .post_type(post_type)
                .weekday(weekday)
                .hour(hour)
                .total_interactions(like + share + comment)
                .metric("like", like)
                .metric("share", share)
                .metric("comment", comment)
                .build()
        })
        .collect();

    Ok(Dataset::from_records(&records)?)
}
