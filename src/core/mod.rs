//! Core modules: the store, its broker and schema, and the generic integrity
//! machinery (registry, guard, hooks, repository, graph) every entity shares.

pub mod access;
pub mod broker;
pub mod config;
pub mod credential;
pub mod db;
pub mod error;
pub mod graph;
pub mod guard;
pub mod hooks;
pub mod registry;
pub mod repo;
pub mod schemas;
pub mod store;
pub mod time;
