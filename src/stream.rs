//! Frames assembled from the SDK stream callbacks and the buffers they are
//! handed through.
//!
//! A callback copies everything it needs out of the boundary while it runs
//! (the accessors are only valid inside the callback) and publishes the
//! finished frame. A frame that cannot be assembled completely is dropped;
//! the consumer keeps the previous one.

use crate::buffer::{frame_buffer, FrameConsumer, FramePublisher};
use crate::sdk::{
    CoreSdk, RawSkeletonStreamAccess, RawSkeletonStreamCallback, SdkResult, SkeletonStreamAccess,
    SkeletonStreamCallback, TrackerStreamAccess, TrackerStreamCallback,
};
use crate::types::{
    RawSkeletonInfo, SkeletonInfo, SkeletonNode, SkeletonStreamInfo, Timestamp, TrackerData,
    TrackerStreamInfo,
};
use crate::{ClientError, Result};

/// One streamed skeleton with all of its nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSkeleton {
    pub info: SkeletonInfo,
    pub nodes: Vec<SkeletonNode>,
}

impl ClientSkeleton {
    pub fn node(&self, id: u32) -> Option<&SkeletonNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkeletonFrame {
    pub publish_time: Timestamp,
    pub skeletons: Vec<ClientSkeleton>,
}

impl SkeletonFrame {
    pub fn skeleton(&self, id: u32) -> Option<&ClientSkeleton> {
        self.skeletons.iter().find(|s| s.info.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSkeleton {
    pub info: RawSkeletonInfo,
    pub nodes: Vec<SkeletonNode>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSkeletonFrame {
    pub publish_time: Timestamp,
    pub skeletons: Vec<RawSkeleton>,
}

impl RawSkeletonFrame {
    pub fn for_glove(&self, glove_id: u32) -> Option<&RawSkeleton> {
        self.skeletons.iter().find(|s| s.info.glove_id == glove_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackerFrame {
    pub publish_time: Timestamp,
    pub trackers: Vec<TrackerData>,
}

pub fn collect_skeletons(
    info: &SkeletonStreamInfo,
    access: &dyn SkeletonStreamAccess,
) -> SdkResult<SkeletonFrame> {
    let mut skeletons = Vec::with_capacity(info.skeletons_count as usize);
    for index in 0..info.skeletons_count {
        let skeleton_info = access.skeleton_info(index)?;
        let mut nodes = vec![SkeletonNode::default(); skeleton_info.nodes_count as usize];
        access.skeleton_data(index, &mut nodes)?;
        skeletons.push(ClientSkeleton {
            info: skeleton_info,
            nodes,
        });
    }
    Ok(SkeletonFrame {
        publish_time: info.publish_time,
        skeletons,
    })
}

pub fn collect_raw_skeletons(
    info: &SkeletonStreamInfo,
    access: &dyn RawSkeletonStreamAccess,
) -> SdkResult<RawSkeletonFrame> {
    let mut skeletons = Vec::with_capacity(info.skeletons_count as usize);
    for index in 0..info.skeletons_count {
        let raw_info = access.raw_skeleton_info(index)?;
        let mut nodes = vec![SkeletonNode::default(); raw_info.nodes_count as usize];
        access.raw_skeleton_data(index, &mut nodes)?;
        skeletons.push(RawSkeleton {
            info: raw_info,
            nodes,
        });
    }
    Ok(RawSkeletonFrame {
        publish_time: info.publish_time,
        skeletons,
    })
}

pub fn collect_trackers(
    info: &TrackerStreamInfo,
    access: &dyn TrackerStreamAccess,
) -> SdkResult<TrackerFrame> {
    let trackers = (0..info.tracker_count)
        .map(|index| access.tracker_data(index))
        .collect::<SdkResult<Vec<_>>>()?;
    Ok(TrackerFrame {
        publish_time: info.publish_time,
        trackers,
    })
}

pub fn skeleton_callback(publisher: FramePublisher<SkeletonFrame>) -> SkeletonStreamCallback {
    Box::new(move |info, access| match collect_skeletons(info, access) {
        Ok(frame) => publisher.publish(Box::new(frame)),
        Err(code) => log::warn!("dropping skeleton frame: {}", code),
    })
}

pub fn raw_skeleton_callback(
    publisher: FramePublisher<RawSkeletonFrame>,
) -> RawSkeletonStreamCallback {
    Box::new(move |info, access| match collect_raw_skeletons(info, access) {
        Ok(frame) => publisher.publish(Box::new(frame)),
        Err(code) => log::warn!("dropping raw skeleton frame: {}", code),
    })
}

pub fn tracker_callback(publisher: FramePublisher<TrackerFrame>) -> TrackerStreamCallback {
    Box::new(move |info, access| match collect_trackers(info, access) {
        Ok(frame) => publisher.publish(Box::new(frame)),
        Err(code) => log::warn!("dropping tracker frame: {}", code),
    })
}

/// Write ends of the three stream buffers.
pub struct StreamPublishers {
    pub skeletons: FramePublisher<SkeletonFrame>,
    pub raw_skeletons: FramePublisher<RawSkeletonFrame>,
    pub trackers: FramePublisher<TrackerFrame>,
}

impl StreamPublishers {
    /// Register one callback per stream, each feeding its own buffer.
    pub fn register<S: CoreSdk + ?Sized>(&self, sdk: &S) -> Result<()> {
        sdk.register_skeleton_stream(skeleton_callback(self.skeletons.clone()))
            .map_err(ClientError::sdk("register skeleton stream callback"))?;
        sdk.register_raw_skeleton_stream(raw_skeleton_callback(self.raw_skeletons.clone()))
            .map_err(ClientError::sdk("register raw skeleton stream callback"))?;
        sdk.register_tracker_stream(tracker_callback(self.trackers.clone()))
            .map_err(ClientError::sdk("register tracker stream callback"))?;
        Ok(())
    }
}

/// Read ends of the three stream buffers.
pub struct StreamConsumers {
    pub skeletons: FrameConsumer<SkeletonFrame>,
    pub raw_skeletons: FrameConsumer<RawSkeletonFrame>,
    pub trackers: FrameConsumer<TrackerFrame>,
}

pub fn stream_buffers() -> (StreamPublishers, StreamConsumers) {
    let (skeletons_tx, skeletons_rx) = frame_buffer();
    let (raw_tx, raw_rx) = frame_buffer();
    let (trackers_tx, trackers_rx) = frame_buffer();
    (
        StreamPublishers {
            skeletons: skeletons_tx,
            raw_skeletons: raw_tx,
            trackers: trackers_tx,
        },
        StreamConsumers {
            skeletons: skeletons_rx,
            raw_skeletons: raw_rx,
            trackers: trackers_rx,
        },
    )
}
