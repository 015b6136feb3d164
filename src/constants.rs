// Constants module for cosmic-pipup
// Centralizes magic numbers for better maintainability

use std::time::Duration;

// ============================================================================
// UI Layout Constants
// ============================================================================

/// Largest popup surface in either direction
pub(crate) const POPUP_MAX_SIZE: f32 = 1920.0;

/// Margin between the popup and the screen edge (pixels)
pub(crate) const POPUP_MARGIN: i32 = 16;

/// Corner radius of the popup background
pub(crate) const POPUP_RADIUS: f32 = 8.0;

/// Space between title, message and media
pub(crate) const ELEMENT_SPACING: u16 = 8;

// ============================================================================
// Animation Constants
// ============================================================================

/// Redraw interval while an animated image is shown (~30 FPS)
pub(crate) const ANIMATION_TICK: Duration = Duration::from_millis(33);

// ============================================================================
// D-Bus Constants
// ============================================================================

/// Attempts to claim the session bus name
pub(crate) const CONNECT_ATTEMPTS: usize = 5;

/// Pause between connection attempts
pub(crate) const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Maximum popups per minute per sender
pub(crate) const RATE_LIMIT_PER_MINUTE: u32 = 60;

/// Maximum number of senders tracked by the rate limiter
pub(crate) const RATE_LIMIT_MAX_SENDERS: usize = 1000;

/// Interval for rate limiter cleanup (in popup ids)
pub(crate) const RATE_LIMIT_CLEANUP_INTERVAL: u32 = 100;

// ============================================================================
// Channel and Buffer Constants
// ============================================================================

/// Buffer size for subscription channels
pub(crate) const CHANNEL_BUFFER_SIZE: usize = 100;
