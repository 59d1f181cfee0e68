//! HTTP front end for the offline Pwned Passwords database.
//!
//! Serves an API compatible with the hosted Pwned Passwords service from a
//! local [`hibp_offline::OfflineDatabase`]: point queries under
//! `/pwnedpassword/` and k-anonymity range queries under `/range/`. Every
//! lookup is answered from the memory-mapped database file; no network
//! calls happen at query time.

pub mod conversion;
mod routes;

pub use routes::router;
