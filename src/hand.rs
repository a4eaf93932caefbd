//! The minimal hand skeleton: a root node, five fingers of four joints each,
//! one hand chain and five finger chains.
//!
//! Node ids are 0 for the root and `1 + finger * 4 + joint` for the digits,
//! which is the layout the streamed node ids follow.

use crate::protocol::NUM_FINGERS_ON_HAND;
use crate::types::{
    ChainSettings, ChainSetup, ChainType, HandMotion, NodeSetup, Side, SkeletonSettings,
    SkeletonSetupInfo, SkeletonTarget, SkeletonType, Vec3,
};

pub const JOINTS_PER_FINGER: usize = 4;
pub const HAND_NODE_COUNT: usize = 1 + NUM_FINGERS_ON_HAND * JOINTS_PER_FINGER;
pub const ROOT_NODE_ID: u32 = 0;
pub const HAND_CHAIN_ID: u32 = 0;

/// Rest offsets of each digit relative to its parent, for a hand lying flat.
/// Metacarpals are left out; the MCP joints hang off the root directly.
const DIGIT_OFFSETS: [[f32; 3]; NUM_FINGERS_ON_HAND * JOINTS_PER_FINGER] = [
    // Thumb: CMC, MCP, IP, tip
    [0.024950, 0.0, 0.025320],
    [0.0, 0.0, 0.032742],
    [0.0, 0.0, 0.028739],
    [0.0, 0.0, 0.028739],
    // Index: MCP, PIP, DIP, tip
    [0.011181, 0.0, 0.052904],
    [0.0, 0.0, 0.038257],
    [0.0, 0.0, 0.020884],
    [0.0, 0.0, 0.018759],
    // Middle
    [0.0, 0.0, 0.051287],
    [0.0, 0.0, 0.041861],
    [0.0, 0.0, 0.024766],
    [0.0, 0.0, 0.019683],
    // Ring
    [-0.011274, 0.0, 0.049802],
    [0.0, 0.0, 0.039736],
    [0.0, 0.0, 0.023564],
    [0.0, 0.0, 0.019868],
    // Pinky
    [-0.020145, 0.0, 0.047309],
    [0.0, 0.0, 0.033175],
    [0.0, 0.0, 0.018020],
    [0.0, 0.0, 0.019129],
];

/// Node id of `joint` (0 = proximal) on `finger` (0 = thumb).
pub const fn digit_node_id(finger: usize, joint: usize) -> u32 {
    (1 + finger * JOINTS_PER_FINGER + joint) as u32
}

pub fn setup_info(side: Side, user_index: u32) -> SkeletonSetupInfo {
    let name = match side {
        Side::Right => "RightHand",
        _ => "LeftHand",
    };
    SkeletonSetupInfo {
        name: name.to_string(),
        skeleton_type: SkeletonType::Hand,
        settings: SkeletonSettings {
            scale_to_target: true,
            target: SkeletonTarget::UserIndex(user_index),
            ..SkeletonSettings::default()
        },
    }
}

/// Nodes in insertion order: every parent precedes its children.
pub fn nodes() -> Vec<NodeSetup> {
    let mut nodes = Vec::with_capacity(HAND_NODE_COUNT);
    nodes.push(NodeSetup::joint(ROOT_NODE_ID, ROOT_NODE_ID, "Hand", Vec3::ZERO));
    for finger in 0..NUM_FINGERS_ON_HAND {
        let mut parent = ROOT_NODE_ID;
        for joint in 0..JOINTS_PER_FINGER {
            let id = digit_node_id(finger, joint);
            let [x, y, z] = DIGIT_OFFSETS[finger * JOINTS_PER_FINGER + joint];
            nodes.push(NodeSetup::joint(id, parent, "fingerdigit", Vec3::new(x, y, z)));
            parent = id;
        }
    }
    nodes
}

/// The hand chain (id 0) followed by the thumb..pinky chains (ids 1..=5).
pub fn chains(side: Side) -> Vec<ChainSetup> {
    let mut chains = Vec::with_capacity(1 + NUM_FINGERS_ON_HAND);
    chains.push(ChainSetup {
        id: HAND_CHAIN_ID,
        chain_type: ChainType::Hand,
        data_type: ChainType::Hand,
        data_index: 0,
        node_ids: vec![ROOT_NODE_ID],
        side,
        settings: ChainSettings::Hand {
            finger_chain_ids: (1..=NUM_FINGERS_ON_HAND as i32).collect(),
            hand_motion: HandMotion::Imu,
        },
    });
    for (finger, &finger_type) in ChainType::FINGERS.iter().enumerate() {
        chains.push(ChainSetup {
            id: finger as u32 + 1,
            chain_type: finger_type,
            data_type: finger_type,
            data_index: 0,
            node_ids: (0..JOINTS_PER_FINGER)
                .map(|joint| digit_node_id(finger, joint))
                .collect(),
            side,
            settings: ChainSettings::Finger {
                use_leaf_at_end: false,
                metacarpal_bone_id: -1,
                hand_chain_id: HAND_CHAIN_ID as i32,
                finger_width: 0.0,
            },
        });
    }
    chains
}
