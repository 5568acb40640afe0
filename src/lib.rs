pub mod app;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod executor;
pub mod filter;
pub mod generator;
pub mod output;
pub mod runner;
pub mod skip;
pub mod stop;
pub mod template;
pub mod utils;
pub mod wordlist;

#[cfg(test)]
mod tests;
