pub mod aggregate;
pub mod entities;
pub mod error;
pub mod projection;
pub mod store;
