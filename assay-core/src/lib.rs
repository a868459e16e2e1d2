// assay-core/src/lib.rs

// 1. Mandatory documentation for production code
#![allow(missing_docs)] // On autorise le manque de doc pour le moment

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- MODULES HEXAGONAUX ---

// 1. Ports (Interfaces / Traits)
// Ce dont le pipeline a besoin côté données (RowSource)
pub mod ports;

// 2. Domain (Cœur du métier)
// Registre de modèles, graphe de dépendances, évaluation des contraintes, rapport.
// Ne dépend de RIEN d'autre (ni infra, ni app).
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB, fichiers YAML/CSV, découverte des schémas.
pub mod infrastructure;

// 4. Application (Use Cases)
// Orchestration (Validation, Clean)
pub mod application;

// --- GESTION DES ERREURS GLOBALE ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// use assay_core::AssayError;
pub use error::AssayError;
