#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! Wire protocol spoken between logging instances and a remote observer.
//!
//! Every message is a fixed 20-byte routing header followed by a payload
//! whose shape depends on the [`WireKind`]. Scope tables travel as
//! count-prefixed lists; log records travel in a fixed layout with
//! fixed-capacity text buffers. Decoding never reads past a declared bound:
//! oversized names and texts are truncated, short payloads are rejected.
//!
//! # Examples
//!
//! Announce a scope table and read it back on the observer side.
//!
//! ```
//! use logging::{Priority, ScopeId, ScopeSnapshot};
//! use protocol::{Routing, WireBody, WireMessage, read_message, write_message};
//!
//! let scopes = vec![ScopeSnapshot {
//!     id: ScopeId::of("ThreadCentral"),
//!     name: "ThreadCentral".into(),
//!     priority: Priority::DEBUG | Priority::SCOPE,
//! }];
//! let announce = WireMessage::new(Routing::new(0, 17, 0), WireBody::RegisterScopes(scopes));
//!
//! let mut wire = Vec::new();
//! write_message(&mut wire, &announce)?;
//! let received = read_message(&mut wire.as_slice())?;
//! assert_eq!(received, announce);
//! # Ok::<(), std::io::Error>(())
//! ```

#[cfg(feature = "async")]
mod codec;
mod error;
mod header;
mod kind;
mod message;
mod payload;
mod record;
mod stream;

#[cfg(feature = "async")]
pub use codec::WireCodec;
pub use error::WireError;
pub use header::{HEADER_LEN, MAX_PAYLOAD_LENGTH, MessageHeader, Routing};
pub use kind::WireKind;
pub use message::{WireBody, WireMessage};
pub use payload::SCOPE_NAME_CAPACITY;
pub use record::{RECORD_WIRE_LEN, encode_record};
pub use stream::{read_message, write_message};
