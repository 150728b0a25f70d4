use anyhow::Context;
use clap::Parser;
use duofarm::api::ApiClient;
use duofarm::settings::{self, Settings};
use duofarm::status;
use duofarm::{CdpPage, Config, FarmController};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "duofarm")]
#[command(about = "Lesson-farming automation")]
#[command(version)]
struct Cli {
    /// Config file to use (YAML); defaults apply when omitted
    config: Option<PathBuf>,

    /// Run in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Target URL (overrides config)
    #[arg(long)]
    url: Option<String>,

    /// XP goal; persisted for future runs
    #[arg(long)]
    target_xp: Option<u32>,

    /// Pick answers at random instead of via answer discovery; persisted
    #[arg(long)]
    safe_mode: Option<bool>,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("loading config {}", path.display()))?
        }
        None => Config::default(),
    };
    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(url) = cli.url {
        config.target.url = url;
    }

    // Durable settings carry the panel knobs across runs; CLI overrides win
    // and are written back.
    match Settings::open_default() {
        Ok(mut store) => {
            if let Some(xp) = cli.target_xp {
                if let Err(e) = store.set(settings::TARGET_XP, xp) {
                    warn!("could not persist target_xp: {e}");
                }
            }
            if let Some(safe) = cli.safe_mode {
                if let Err(e) = store.set(settings::SAFE_MODE, safe) {
                    warn!("could not persist safe_mode: {e}");
                }
            }
            config.farm.target_xp = store.get(settings::TARGET_XP, config.farm.target_xp);
            config.farm.safe_mode = store.get(settings::SAFE_MODE, config.farm.safe_mode);
        }
        Err(e) => {
            warn!("settings store unavailable: {e}");
            if let Some(xp) = cli.target_xp {
                config.farm.target_xp = xp;
            }
            if let Some(safe) = cli.safe_mode {
                config.farm.safe_mode = safe;
            }
        }
    }

    let stealth = eoka::StealthConfig {
        headless: config.browser.headless,
        proxy: config.browser.proxy.clone(),
        user_agent: config.browser.user_agent.clone(),
        viewport_width: config.browser.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
        viewport_height: config.browser.viewport.as_ref().map(|v| v.height).unwrap_or(720),
        ..Default::default()
    };
    let browser = eoka::Browser::launch_with_config(stealth).await?;
    let page = browser.new_page("about:blank").await?;

    info!("navigating to {}", config.target.url);
    page.goto(&config.target.url).await?;
    // best effort; the host polls constantly and never fully idles
    let _ = page.wait_for_network_idle(500, 10_000).await;

    let cdp = Arc::new(CdpPage::new(page));
    match ApiClient::from_page(cdp.as_ref(), &config.target.url).await {
        Ok(_) => info!("authenticated, API client available"),
        Err(e) => warn!("{e}"),
    }

    let controller = FarmController::new(Arc::clone(&cdp), config.farm.clone());
    let handle = controller.handle();
    let _status = status::spawn_status_logger(handle.clone(), Duration::from_secs(5));

    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt, stopping after the current tick");
            interrupt.stop();
        }
    });

    let stats = controller.run().await;

    println!();
    if stats.xp_earned >= stats.target_xp {
        println!("✓ Goal reached");
    } else {
        println!("✗ Stopped before the goal");
    }
    println!("  XP: {}/{}", stats.xp_earned, stats.target_xp);
    println!("  Lessons: {}", stats.lessons_completed);
    println!("  Confident answers: {}", stats.correct_answers);
    println!(
        "  Session time: {} (started {})",
        stats.clock(),
        stats.started_at.format("%H:%M:%S")
    );

    browser.close().await?;
    Ok(())
}
