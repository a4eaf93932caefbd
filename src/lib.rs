//! # coresdk - Rust client for the Core motion-capture host
//!
//! Connects to a Core host, loads skeletons built from nodes and chains, and
//! receives the host's skeleton and tracker streams. Provides:
//! - Host discovery and connection with retry
//! - Skeleton setup building with local validation before each SDK call
//! - Lock-protected handoff of streamed frames to the polling thread
//! - A ready-made 21-node hand skeleton and keypoint extraction
//! - An in-process simulated host for development and tests
//!
//! The vendor library is bound with the `vendor-sdk` feature.
//!
//! ## Quick Start
//! ```no_run
//! use coresdk::{Client, ClientConfig, Host, SimulatedCore};
//!
//! let sdk = SimulatedCore::new().with_host(Host::new("localhost", "127.0.0.1"));
//! let mut client = Client::new(sdk, ClientConfig::from_env());
//! client.initialize().unwrap();
//! client.connect().unwrap();
//! client.setup_skeletons().unwrap();
//! client
//!     .run(|frame| {
//!         for skeleton in &frame.skeletons {
//!             println!("skeleton {}: {} nodes", skeleton.info.id, skeleton.nodes.len());
//!         }
//!     })
//!     .unwrap();
//! client.shut_down().unwrap();
//! ```

pub mod error;
pub mod types;
pub mod protocol;
pub mod sdk;
pub mod setup;
pub mod skeleton;
pub mod hand;
pub mod buffer;
pub mod stream;
pub mod keypoints;
pub mod platform;
pub mod config;
pub mod client;
pub mod sim;
#[cfg(feature = "vendor-sdk")]
pub mod vendor;

pub use client::{Client, ClientState, StopHandle};
pub use config::{ClientConfig, SetupFailurePolicy};
pub use error::{ClientError, SdkReturnCode};
pub use sdk::CoreSdk;
pub use sim::{SimCall, SimulatedCore};
pub use skeleton::{SetupHandle, SkeletonId};
pub use stream::{ClientSkeleton, RawSkeletonFrame, SkeletonFrame, TrackerFrame};
pub use types::*;
#[cfg(feature = "vendor-sdk")]
pub use vendor::VendorCore;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
