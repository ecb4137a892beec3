// src/ingest/providers/mod.rs
pub mod overpass;
pub mod scripted;
