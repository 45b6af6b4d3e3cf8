//! Library half of the `subproxy` command line tool

pub mod config;
pub mod error;
pub mod output;
pub mod paths;
pub mod terminal;
