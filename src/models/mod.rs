//! Data models for the Shelfmark server

pub mod book;
pub mod borrower;
pub mod borrowing;
pub mod user;
