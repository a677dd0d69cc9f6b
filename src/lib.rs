#![allow(warnings)]

pub mod arguments;
pub mod auth;
pub mod config;
pub mod core;
pub mod fanout;
pub mod global;
pub mod logger;
pub mod paths;
pub mod run;
pub mod services;
pub mod store;
pub mod sweeper;
pub mod webserver;
