//! PianoPIR: a Rust library implementation of the Piano single-server **P**rivate **I**nformation **R**etrieval protocol, described in <https://ia.cr/2023/452>.
//!
//! A client fetches a record from a database held by a server without revealing which record it asked for,
//! while keeping the server's per-query work sublinear on average. An offline preprocessing phase streams the
//! whole database once and distills it into compact XOR parity hints on the client; each online query then
//! costs the server a single record read per chunk.
//!
//! ## Features
//!
//! * **Single-server privacy:** Every online query is one fixed-shape offset vector, one offset per chunk,
//!   regardless of the target index. Dummy queries with the same shape are available for traffic padding.
//! * **Amortized hints:** Consumed hints are refreshed from per-chunk backup tables, so one preprocessing
//!   pass serves a budget of roughly √N·ln N queries before the next epoch.
//! * **Error handling:** All protocol outcomes, including the expected bounded-probability hint miss, are
//!   reported as explicit error values.
//!
//! ## Usage
//!
//! Add PianoPIR as dependency to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! piano_pir = "=0.1.0"
//! ```
//!
//! Then, you can use it in your code:
//!
//! ```rust
//! use piano_pir::{PianoPIRConfig, pir::PianoPIR, DEFAULT_FAILURE_PROB_LOG2};
//!
//! fn main() {
//!     // Example database (replace with your own): 1024 records of one 64-bit word each
//!     let raw_db: Vec<Vec<u64>> = (0..1024u64).map(|i| vec![i.wrapping_mul(0x9e3779b97f4a7c15)]).collect();
//!
//!     let config = PianoPIRConfig::new(raw_db.len(), 1, 8, 4, DEFAULT_FAILURE_PROB_LOG2).expect("Config must be valid");
//!     let mut pir = PianoPIR::new(config, raw_db.clone()).expect("Database must fit the configuration");
//!
//!     // Offline phase: build the hint tables
//!     pir.preprocessing().expect("Preprocessing failed");
//!
//!     // Online phase
//!     match pir.query(42) {
//!         Ok(record) => assert_eq!(record[0], raw_db[42][0]),
//!         Err(e) => println!("Query failed: {}", e), // e.g. a bounded-probability hint miss
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! * `server`: Contains the `Server` struct owning the raw database and answering plaintext and batch-offset fetches.
//! * `client`: Contains the stateful `Client` struct owning all cryptographic state and driving the protocol.
//! * `pir`: Contains the `PianoPIR` facade pairing one client with one server and re-running preprocessing on exhaustion.

pub use pir_internals::error::PianoPIRError;
pub use pir_internals::params::{DEFAULT_FAILURE_PROB_LOG2, PianoPIRConfig};
pub mod client;
pub mod pir;
pub mod server;

mod pir_internals;

mod test_pir;
