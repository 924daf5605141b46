pub mod api;
pub mod purchase;
pub mod realtime;
