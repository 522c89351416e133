// ABOUTME: Main library file for the imgup image uploader
// ABOUTME: Exports all public modules and types

pub mod config;
pub mod ledger;
pub mod extract;
pub mod vault;
pub mod resolve;
pub mod editor;
pub mod patch;
pub mod note;
pub mod uploader;
pub mod deleter;
pub mod workflow;
pub mod download;
pub mod delete;
pub mod commands;

pub use anyhow::{Result, Error};
