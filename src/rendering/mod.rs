mod popup;

pub use popup::popup_view;
