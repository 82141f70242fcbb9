//! Graphchat - Conversational Session Service
//!
//! This crate mediates streaming chat sessions between clients and a
//! graph-backed answering engine: it runs the fixed three-value handshake,
//! brokers each turn to the engine, persists conversation history, and
//! enforces role-based access to stored conversations.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
