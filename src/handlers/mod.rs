mod messages;

pub use messages::Message;
