pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod inputs;
pub mod kotlin;
pub mod locate;
pub mod model;
pub mod module;
pub mod parsers;
pub mod report_paths;
pub mod scan;
pub mod tree;
