pub mod catalog;
pub mod detection;
pub mod errors;
pub mod model;
pub mod summary;
pub mod upload;
