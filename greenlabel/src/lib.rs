pub mod barcode;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod imaging;
pub mod models;
pub mod ocr;
pub mod search;
pub mod services;
pub mod sources;
