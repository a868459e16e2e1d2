// src/domain/ports/mod.rs

pub mod loader;

pub use loader::RegistryLoader;
