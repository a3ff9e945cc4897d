//! Gestor 360° financial diagnostic: questionnaire scoring, loss estimation and the HTTP
//! workflow around them.

pub mod api;
pub mod backend;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod telemetry;
