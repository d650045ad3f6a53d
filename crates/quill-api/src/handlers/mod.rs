//! HTTP handlers, one module per feature area.

pub mod accounts;
pub mod brainstorm;
pub mod dashboard;
pub mod documents;
pub mod outline;
pub mod planning;
pub mod references;
pub mod settings;
pub mod tags;
