pub mod device_token;
pub mod errors;
pub mod notifications;
pub mod roles;
pub mod ticket;
