// src/lib.rs

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod persona;
pub mod state;
