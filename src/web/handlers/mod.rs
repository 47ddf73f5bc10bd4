pub mod account;
pub mod channel;
pub mod devices;
pub mod health;
pub mod oauth;
