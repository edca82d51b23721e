pub mod api_clients;
pub mod bootstrap;
pub mod config;
pub mod csv;
pub mod db;
pub mod storage;
