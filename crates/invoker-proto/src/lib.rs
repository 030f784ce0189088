#![cfg_attr(docsrs, feature(doc_auto_cfg))]
//! This crate contains the generated protobuf files for the callback protocol
//! spoken between the function runtime and its messaging sidecar.
//!
//! The sidecar drives four operations on the function side: listing the input
//! bindings and topic subscriptions the function is interested in, and
//! delivering binding and topic events. Event deliveries answer with a stream
//! of empty acknowledgements, one per handler that processed the event.
//!
//! # Feature flags
//!
//! ## Code generation
//! - `gen-tonic-messages`: Generate message types using [prost](https://github.com/tokio-rs/prost)
//! - `gen-tonic`: Generate gRPC client/server code using [tonic](https://github.com/hyperium/tonic) (includes `gen-tonic-messages`)
//!
//! ## Misc
//! - `full`: Enable all features above
//!
//! By default, the `full` feature is enabled.

// Tonic generated code - skip formatting and lint checks
#[rustfmt::skip]
#[allow(warnings)]
#[allow(clippy::all)]
#[doc(hidden)]
#[cfg(feature = "gen-tonic-messages")]
pub mod tonic {
    pub mod functions {
        pub mod callback {
            pub mod v1 {
                include!("proto/tonic/functions.callback.v1.rs");
            }
        }
    }
}

// Re-export the generated types for easier access
#[cfg(feature = "gen-tonic-messages")]
pub use crate::tonic::functions::callback::v1;
