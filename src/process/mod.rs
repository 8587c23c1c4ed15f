// src/process/mod.rs

pub mod cases;
pub mod date_parser;
pub mod pivot;
pub mod population;
pub mod utils;
