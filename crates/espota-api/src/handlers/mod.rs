//! HTTP request handlers for the update API

pub mod update;
