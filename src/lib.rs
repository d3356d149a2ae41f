//! Inventory the leaf certificates served by a list of TLS endpoints.
//!
//! Each `host,port` line of the input is dialed, a TLS handshake is run and the
//! leaf certificate is decoded into an [`record::InventoryRecord`] appended to
//! the output. Failures are appended to the log file and the batch moves on.

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod inventory;
pub mod record;
pub mod report;
pub mod tls;
