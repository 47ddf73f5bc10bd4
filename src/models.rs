pub mod device;
pub mod token;
