pub mod controller;
pub mod requests;
pub mod status;
pub mod workspace;
