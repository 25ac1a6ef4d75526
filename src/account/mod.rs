pub mod errors;
pub mod saga;
pub mod services;
