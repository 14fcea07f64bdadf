pub mod api;
pub mod client;
pub mod db;
pub mod error;
pub mod forest;
pub mod models;
pub mod render;
