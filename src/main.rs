use anyhow::{Result, bail};
use price_finder::{EngineConfig, PriceFinder};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = EngineConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(country) = args.next() else {
        bail!("usage: price-finder <COUNTRY> <QUERY...>");
    };
    let query = args.collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        bail!("usage: price-finder <COUNTRY> <QUERY...>");
    }

    let schedule = config.watch_schedule.clone();
    let finder = PriceFinder::connect(config).await?;

    let Some(schedule) = schedule else {
        let result = finder.search_and_save(&country, &query).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    };

    info!("Starting price watch for '{}' in {}", query, country);

    // Run once immediately
    if let Err(e) = finder.search(&country, &query).await {
        error!("Error during initial search: {}", e);
    }

    let sched = JobScheduler::new().await?;

    let job_finder = finder.clone();
    sched
        .add(Job::new_async(schedule.as_str(), move |_uuid, _l| {
            let finder = job_finder.clone();
            let country = country.clone();
            let query = query.clone();
            Box::pin(async move {
                match finder.search(&country, &query).await {
                    Ok(result) => info!(
                        "Refreshed '{}': {} products",
                        result.query, result.total_results
                    ),
                    Err(e) => error!("Error refreshing prices: {}", e),
                }
            })
        })?)
        .await?;

    info!("Scheduler started with schedule '{}'", schedule);
    sched.start().await?;

    // Keep the program running
    loop {
        tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;
    }
}
