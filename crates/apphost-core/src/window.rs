//! Window manager surface trait.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::SurfaceResult;

/// Identifier of a native window, unique within one window manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// Options for a new native window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowOptions {
    /// Window title.
    #[serde(default)]
    pub title: Option<String>,
    /// Width in logical pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Height in logical pixels.
    #[serde(default)]
    pub height: Option<u32>,
    /// URL loaded once the window is ready.
    #[serde(default)]
    pub url: Option<String>,
}

impl WindowOptions {
    /// Create empty window options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the window size.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the URL to load.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A window freshly created by the window manager.
#[derive(Debug)]
pub struct NativeWindow {
    /// The window's id.
    pub id: WindowId,
    /// Resolves when the window is closed natively (by the user or by
    /// `destroy_window`). A dropped sender counts as closed.
    pub closed: oneshot::Receiver<()>,
}

/// The shared native window manager.
#[async_trait]
pub trait WindowManager: Send + Sync {
    /// Create a window. Resolution may happen arbitrarily later.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::WindowFailed`](crate::SurfaceError::WindowFailed)
    /// if the window could not be opened.
    async fn create_window(&self, options: WindowOptions) -> SurfaceResult<NativeWindow>;

    /// Destroy a window. Fire-and-forget; returns `false` if the window was
    /// already gone.
    fn destroy_window(&self, id: WindowId) -> bool;
}
