pub mod app;
pub mod channel;
pub mod clock;
pub mod config;
pub mod models;
pub mod platform;
pub mod repos;
pub mod security;
pub mod web;
