pub mod bottom_bar;
pub mod connection;
pub mod event_feed;
pub mod forms;
pub mod top;
pub mod util;
