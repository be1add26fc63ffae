//! PrivacyScrub Console
//!
//! Client for the PrivacyScrub redaction API: submits images and videos with
//! an operator-chosen compliance profile and redaction mode, and follows
//! asynchronous video jobs until they finish.

pub mod config;
pub mod console;
pub mod contract;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;

pub use error::ConsoleError;
