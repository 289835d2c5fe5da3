#![allow(dead_code)]

pub mod memory_store;
pub mod recording_transport;
