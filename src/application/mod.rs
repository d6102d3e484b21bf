pub mod dto;
pub mod imaging;
pub mod ports;
pub mod sampler;
pub mod services;
