#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! crates/observer/src/lib.rs
//!
//! Observer side of the wire protocol.
//!
//! An observer collects records from any number of logging instances and
//! holds the authoritative copy of their scope tables. It answers scope and
//! instance queries itself, mirrors priority changes before forwarding them
//! to the instance concerned, and stamps every received record with its
//! reception time. Transport and storage stay with the embedder; this crate
//! only interprets decoded [`WireMessage`](protocol::WireMessage)s.

mod mirror;
mod processor;

pub use mirror::InstanceMirror;
pub use processor::{ObserverMessageProcessor, ObserverOutcome};
