//! Valentot Bot Library
//!
//! A Telegram bot for anonymous valentines.
//!
//! This crate provides the core functionality for:
//! - Personal links that anyone can use to write to their owner anonymously
//! - Anonymous replies and optional author reveal
//! - Message listing with filters, pagination and statistics
//! - PostgreSQL persistence of users, links, messages and dialog state

pub mod bot;
pub mod config;
pub mod domain;
pub mod i18n;
pub mod maintenance;
pub mod services;
pub mod storage;
pub mod telegram;
