mod popups;

pub use popups::{ActivePopup, PopupState, Shown};
