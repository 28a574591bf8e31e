pub mod audit;
pub mod candidates;
pub mod config;
pub mod export;
pub mod mapping_file;
pub mod model;
pub mod paths;
pub mod reconcile;
pub mod resolver;
pub mod sanitize;
pub mod source;
pub mod store;
pub mod urls;
pub mod util;
