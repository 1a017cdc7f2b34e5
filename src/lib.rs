// ABOUTME: Library module for mysql2sqlite
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod conversion;
pub mod mysql;
pub mod utils;
