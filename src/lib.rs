//! # duofarm
//!
//! Lesson-farming automation for Duolingo-style apps. Observes the page over
//! CDP, classifies what it's looking at, solves the current challenge, and
//! keeps going until the XP goal is reached.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use duofarm::{CdpPage, FarmController, FarmOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> duofarm::Result<()> {
//! let browser = eoka::Browser::launch().await?;
//! let page = browser.new_page("https://www.duolingo.com").await?;
//!
//! let controller = FarmController::new(
//!     Arc::new(CdpPage::new(page)),
//!     FarmOptions::default(),
//! );
//! let stats = controller.run().await;
//! println!("{}", stats);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod classify;
pub mod config;
pub mod farm;
pub mod inspect;
pub mod page;
pub mod settings;
pub mod snapshot;
pub mod solve;
pub mod status;

pub use classify::{classify, PageState};
pub use config::{Config, DelayRange, FarmOptions};
pub use farm::{FarmController, FarmHandle, FarmSession};
pub use page::{CdpPage, ChallengePage};
pub use snapshot::PageSnapshot;
pub use solve::{ChallengeType, Outcome, SolveReport, Solver};
pub use status::FarmStats;

/// Result type for duofarm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading configuration or driving the page.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("snapshot parse error: {0}")]
    Snapshot(String),

    #[error("settings error: {0}")]
    Settings(String),

    #[error("not authenticated: no session token in the cookie store")]
    NotAuthenticated,

    #[error("action failed: {0}")]
    ActionFailed(String),
}
