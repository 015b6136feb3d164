use crate::subscriptions::{media, popups};
use std::time::Instant;

/// Application message types
#[derive(Debug, Clone)]
pub enum Message {
    /// Event from the D-Bus popup source
    Popups(popups::Event),
    /// Media completion or queue setup
    Media(media::Event),
    /// Popup lifetime elapsed
    Timeout(u32),
    /// Popup media did not arrive before its reveal deadline
    RevealTimeout(u32),
    /// Popup clicked away by the user
    Dismissed(u32),
    /// Open a web popup's page outside the popup
    OpenPage(u32),
    /// Configuration updated
    Config(cosmic_pipup_config::PopupsConfig),
    /// Animation frame update
    Frame(Instant),
}
