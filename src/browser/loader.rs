use std::ops::{Deref, DerefMut};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dom::dom_model::Document;
use crate::error::NavigationError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 768,
        }
    }
}

/// How a page context navigates and decides the document is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub user_agent: String,
    pub viewport: Viewport,
    /// Network counts as quiet with at most this many requests in flight...
    pub idle_connections: u32,
    /// ...for at least this long.
    pub idle_window: Duration,
    pub navigation_timeout: Duration,
    /// Selector that must match before the document is considered ready.
    pub ready_selector: String,
    pub ready_timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport: Viewport::default(),
            idle_connections: 2,
            idle_window: Duration::from_millis(500),
            navigation_timeout: Duration::from_secs(30),
            ready_selector: "form".to_string(),
            ready_timeout: Duration::from_secs(10),
        }
    }
}

// ============================================================================
// PageContext capability
// ============================================================================

/// A page that can be pointed at a URL and then evaluated as a `Document`.
pub trait PageContext: Document {
    /// Navigate and block until the document is ready or a timeout elapses.
    fn load(&mut self, url: &str, options: &LoadOptions) -> Result<(), NavigationError>;

    /// Release the context. Must be safe to call more than once.
    fn close(&mut self);
}

/// Owns a page context for the length of one run and closes it on drop,
/// whichever way the run ends.
pub struct ScopedContext<P: PageContext> {
    inner: P,
}

impl<P: PageContext> ScopedContext<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: PageContext> Deref for ScopedContext<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.inner
    }
}

impl<P: PageContext> DerefMut for ScopedContext<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.inner
    }
}

impl<P: PageContext> Drop for ScopedContext<P> {
    fn drop(&mut self) {
        debug!("Closing page context");
        self.inner.close();
    }
}

/// Load `url` into `context` with the given options.
pub fn load_document<P: PageContext + ?Sized>(
    context: &mut P,
    url: &str,
    options: &LoadOptions,
) -> Result<(), NavigationError> {
    debug!(
        "Navigating to {} (timeout {:?}, ready '{}' within {:?})",
        url, options.navigation_timeout, options.ready_selector, options.ready_timeout
    );
    context.load(url, options)?;
    info!("Page loaded: {}", url);
    Ok(())
}
