//! The Core SDK boundary.
//!
//! Everything the client needs from the vendor middleware goes through
//! [`CoreSdk`]. Implementations: [`crate::sim::SimulatedCore`] (in-process host)
//! and, with the `vendor-sdk` feature, `crate::vendor::VendorCore`.

use crate::error::SdkReturnCode;
use crate::types::{
    ChainSetup, ColliderSetup, CoordinateSystem, Host, NodeSetup, RawSkeletonInfo, SessionType,
    SkeletonInfo, SkeletonNode, SkeletonSetupInfo, SkeletonStreamInfo, TrackerData,
    TrackerStreamInfo,
};

/// Result of a single boundary call.
pub type SdkResult<T> = std::result::Result<T, SdkReturnCode>;

/// Per-element data of the skeleton stream, valid only inside the callback.
pub trait SkeletonStreamAccess {
    fn skeleton_info(&self, index: u32) -> SdkResult<SkeletonInfo>;

    /// `nodes.len()` must equal the node count from [`Self::skeleton_info`].
    fn skeleton_data(&self, index: u32, nodes: &mut [SkeletonNode]) -> SdkResult<()>;
}

/// Per-element data of the raw (estimation) skeleton stream.
pub trait RawSkeletonStreamAccess {
    fn raw_skeleton_info(&self, index: u32) -> SdkResult<RawSkeletonInfo>;

    fn raw_skeleton_data(&self, index: u32, nodes: &mut [SkeletonNode]) -> SdkResult<()>;
}

pub trait TrackerStreamAccess {
    fn tracker_data(&self, index: u32) -> SdkResult<TrackerData>;
}

pub type SkeletonStreamCallback =
    Box<dyn Fn(&SkeletonStreamInfo, &dyn SkeletonStreamAccess) + Send + Sync>;
pub type RawSkeletonStreamCallback =
    Box<dyn Fn(&SkeletonStreamInfo, &dyn RawSkeletonStreamAccess) + Send + Sync>;
pub type TrackerStreamCallback =
    Box<dyn Fn(&TrackerStreamInfo, &dyn TrackerStreamAccess) + Send + Sync>;

/// Call contract of the Core SDK.
///
/// `initialize` precedes every other call and `shut_down` follows all of
/// them. Callbacks may run on any thread; implementations must not hold
/// internal locks while invoking them.
pub trait CoreSdk: Send + Sync {
    fn initialize(&self, session: SessionType) -> SdkResult<()>;

    fn shut_down(&self) -> SdkResult<()>;

    /// Must succeed before the first connect, or connecting fails with
    /// `NoCoordinateSystemSet`.
    fn initialize_coordinate_system(
        &self,
        coordinate_system: CoordinateSystem,
        world_space: bool,
    ) -> SdkResult<()>;

    /// First step of discovery. Blocks for up to `wait_seconds`.
    fn look_for_hosts(&self, wait_seconds: u32, loopback_only: bool) -> SdkResult<()>;

    /// Second step of discovery; `InvalidSequence` before `look_for_hosts`.
    fn number_of_hosts_found(&self) -> SdkResult<u32>;

    /// Third step; `out.len()` must equal [`Self::number_of_hosts_found`].
    fn hosts_found(&self, out: &mut [Host]) -> SdkResult<()>;

    fn connect_to_host(&self, host: &Host) -> SdkResult<()>;

    fn disconnect(&self) -> SdkResult<()>;

    fn is_connected(&self) -> SdkResult<bool>;

    fn register_skeleton_stream(&self, callback: SkeletonStreamCallback) -> SdkResult<()>;

    fn register_raw_skeleton_stream(&self, callback: RawSkeletonStreamCallback) -> SdkResult<()>;

    fn register_tracker_stream(&self, callback: TrackerStreamCallback) -> SdkResult<()>;

    /// Returns the setup index of the new, empty setup.
    fn create_skeleton_setup(&self, info: &SkeletonSetupInfo) -> SdkResult<u32>;

    fn add_node_to_setup(&self, setup_index: u32, node: &NodeSetup) -> SdkResult<()>;

    fn add_chain_to_setup(&self, setup_index: u32, chain: &ChainSetup) -> SdkResult<()>;

    fn add_collider_to_setup(&self, setup_index: u32, collider: &ColliderSetup) -> SdkResult<()>;

    fn overwrite_node_in_setup(&self, setup_index: u32, node: &NodeSetup) -> SdkResult<()>;

    fn overwrite_chain_in_setup(&self, setup_index: u32, chain: &ChainSetup) -> SdkResult<()>;

    /// Realizes the setup and returns the new skeleton id. The setup index is
    /// invalid afterwards.
    fn load_skeleton(&self, setup_index: u32) -> SdkResult<u32>;

    fn unload_skeleton(&self, skeleton_id: u32) -> SdkResult<()>;

    /// Discards a setup that was never loaded.
    fn clear_skeleton_setup(&self, setup_index: u32) -> SdkResult<()>;
}
