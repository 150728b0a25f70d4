//! The seam between the farm core and the browser.
//!
//! The classifier, solver, and controller only ever talk to [`ChallengePage`];
//! [`CdpPage`] is the live implementation over an `eoka::Page`. Tests swap in
//! a scripted fake.

use crate::snapshot::{self, PageSnapshot};
use crate::Result;
use async_trait::async_trait;

/// Minimal page surface the farm core needs: observe, click, read a cookie.
#[async_trait]
pub trait ChallengePage: Send + Sync {
    /// Snapshot the page for one tick.
    async fn snapshot(&self) -> Result<PageSnapshot>;

    /// Click the element at `selector`. `Ok(false)` means the element is no
    /// longer there, which is a stale snapshot and not an error.
    async fn click(&self, selector: &str) -> Result<bool>;

    /// Read a cookie value by name.
    async fn cookie(&self, name: &str) -> Result<Option<String>>;
}

/// Live page driven over CDP.
pub struct CdpPage {
    page: eoka::Page,
}

impl CdpPage {
    pub fn new(page: eoka::Page) -> Self {
        Self { page }
    }

    /// The underlying page, for navigation and waits the core doesn't own.
    pub fn page(&self) -> &eoka::Page {
        &self.page
    }
}

#[async_trait]
impl ChallengePage for CdpPage {
    async fn snapshot(&self) -> Result<PageSnapshot> {
        let json: String = self.page.evaluate(&snapshot::snapshot_js()).await?;
        snapshot::parse_snapshot(&json)
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        Ok(self.page.try_click(selector).await?)
    }

    async fn cookie(&self, name: &str) -> Result<Option<String>> {
        let jar: String = self.page.evaluate("document.cookie").await?;
        Ok(cookie_value(&jar, name))
    }
}

/// Pull one cookie's value out of a `document.cookie` string.
fn cookie_value(jar: &str, name: &str) -> Option<String> {
    jar.split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .map(|v| v.to_string())
        .filter(|v| !v.is_empty())
}
