mod callback;
mod config;
mod kdb;
