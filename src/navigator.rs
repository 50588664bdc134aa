//! Hand-off of the authorization URL to the browser.
//!
//! Navigation is fire-and-forget: the authorization endpoint is a separate
//! page load and nothing here waits for its response.

use url::Url;

use crate::error::NavigationError;

pub trait Navigator: Send + Sync {
    /// Navigate to `target`, which may be relative to the login page.
    fn navigate(&self, target: &str) -> Result<(), NavigationError>;
}

/// Resolve a possibly relative target against the login page URL.
pub fn resolve_target(base: &Url, target: &str) -> Result<Url, NavigationError> {
    base.join(target)
        .map_err(|e| NavigationError::InvalidTarget {
            target: target.to_string(),
            message: e.to_string(),
        })
}

/// Opens the authorization URL in the system browser.
#[derive(Debug, Clone)]
pub struct BrowserNavigator {
    base: Url,
}

impl BrowserNavigator {
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

impl Navigator for BrowserNavigator {
    fn navigate(&self, target: &str) -> Result<(), NavigationError> {
        let url = resolve_target(&self.base, target)?;
        tracing::info!(url = %url, "Opening authorization endpoint");
        println!("  {url}");
        open::that_detached(url.as_str()).map_err(|e| {
            tracing::debug!("Could not open browser automatically: {}", e);
            NavigationError::Launch(e.to_string())
        })
    }
}

/// Prints the authorization URL instead of opening it.
#[derive(Debug, Clone)]
pub struct StdoutNavigator {
    base: Url,
}

impl StdoutNavigator {
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

impl Navigator for StdoutNavigator {
    fn navigate(&self, target: &str) -> Result<(), NavigationError> {
        let url = resolve_target(&self.base, target)?;
        println!("{url}");
        Ok(())
    }
}
