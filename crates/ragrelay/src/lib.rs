pub mod decoder;
pub mod encoder;
pub mod errors;
pub mod frame;
pub mod models;
pub mod segment;
pub mod upstream;
