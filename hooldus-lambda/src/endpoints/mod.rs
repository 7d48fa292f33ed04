pub mod notify;
pub mod status;
