//! 21 hand keypoints from a streamed hand skeleton.
//!
//! Streamed node transforms are local to their parent. Walking each finger
//! from the root and accumulating transforms yields the keypoints in the
//! skeleton's space; [`to_canonical`] then re-expresses them in a frame
//! fixed to the palm so that poses from different hands and wrist
//! orientations line up.

use crate::hand::{digit_node_id, HAND_NODE_COUNT, JOINTS_PER_FINGER, ROOT_NODE_ID};
use crate::protocol::NUM_FINGERS_ON_HAND;
use crate::stream::ClientSkeleton;
use crate::types::{Quaternion, Transform, Vec3};
use glam::{Mat3, Mat4};

pub type Keypoints = [glam::Vec3; HAND_NODE_COUNT];

impl From<Vec3> for glam::Vec3 {
    fn from(v: Vec3) -> Self {
        glam::Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Quaternion> for glam::Quat {
    fn from(q: Quaternion) -> Self {
        let q = glam::Quat::from_xyzw(q.x, q.y, q.z, q.w);
        // The host sends all-zero rotations for untracked nodes.
        if q.length_squared() < f32::EPSILON {
            glam::Quat::IDENTITY
        } else {
            q.normalize()
        }
    }
}

fn local_matrix(transform: &Transform) -> Mat4 {
    Mat4::from_rotation_translation(transform.rotation.into(), transform.position.into())
}

/// Accumulate the local transforms (indexed by node id) down each finger.
/// Scale is ignored.
pub fn forward_kinematics(local: &[Transform; HAND_NODE_COUNT]) -> Keypoints {
    let root = local_matrix(&local[ROOT_NODE_ID as usize]);
    let mut points = [glam::Vec3::ZERO; HAND_NODE_COUNT];
    points[ROOT_NODE_ID as usize] = root.w_axis.truncate();
    for finger in 0..NUM_FINGERS_ON_HAND {
        let mut acc = root;
        for joint in 0..JOINTS_PER_FINGER {
            let id = digit_node_id(finger, joint) as usize;
            acc *= local_matrix(&local[id]);
            points[id] = acc.w_axis.truncate();
        }
    }
    points
}

/// Keypoints of a streamed hand, or `None` when any of the 21 node ids is missing.
pub fn hand_keypoints(skeleton: &ClientSkeleton) -> Option<Keypoints> {
    let mut local = [Transform::IDENTITY; HAND_NODE_COUNT];
    for (id, slot) in local.iter_mut().enumerate() {
        *slot = skeleton.node(id as u32)?.transform;
    }
    Some(forward_kinematics(&local))
}

/// Express keypoints in the palm frame: origin at the root, +z towards the
/// middle finger MCP, +y from the ring towards the index MCP.
///
/// Returns `None` for a degenerate palm (coincident MCP joints).
pub fn to_canonical(points: &Keypoints) -> Option<Keypoints> {
    let origin = points[ROOT_NODE_ID as usize];
    let index_mcp = points[digit_node_id(1, 0) as usize];
    let middle_mcp = points[digit_node_id(2, 0) as usize];
    let ring_mcp = points[digit_node_id(3, 0) as usize];

    let z = (middle_mcp - origin).try_normalize()?;
    let y_aux = (index_mcp - ring_mcp).try_normalize()?;
    let x = y_aux.cross(z).try_normalize()?;
    let y = z.cross(x);
    let inverse = Mat3::from_cols(x, y, z).transpose();

    let mut canonical = [glam::Vec3::ZERO; HAND_NODE_COUNT];
    for (out, p) in canonical.iter_mut().zip(points.iter()) {
        *out = inverse * (*p - origin);
    }
    Some(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand;
    use crate::types::{SkeletonInfo, SkeletonNode, Timestamp};

    const EPS: f32 = 1e-5;

    fn rest_pose() -> [Transform; HAND_NODE_COUNT] {
        let mut local = [Transform::IDENTITY; HAND_NODE_COUNT];
        for node in hand::nodes() {
            local[node.id as usize] = node.transform;
        }
        local
    }

    #[test]
    fn test_rest_pose_sums_offsets() {
        let points = forward_kinematics(&rest_pose());
        assert!(points[0].length() < EPS);
        let thumb_tip = points[digit_node_id(0, 3) as usize];
        let expected = glam::Vec3::new(0.024950, 0.0, 0.025320 + 0.032742 + 0.028739 + 0.028739);
        assert!((thumb_tip - expected).length() < EPS, "{:?}", thumb_tip);
    }

    #[test]
    fn test_root_rotation_carries_fingers() {
        let mut local = rest_pose();
        // 90 degrees about +y maps +z onto +x.
        let half = std::f32::consts::FRAC_PI_4;
        local[0].rotation = Quaternion::new(half.cos(), 0.0, half.sin(), 0.0);
        local[0].position = Vec3::new(1.0, 2.0, 3.0);
        let points = forward_kinematics(&local);
        let middle_mcp = points[digit_node_id(2, 0) as usize];
        assert!((middle_mcp - glam::Vec3::new(1.051287, 2.0, 3.0)).length() < EPS);
    }

    #[test]
    fn test_canonical_frame_of_rest_pose() {
        let canonical = to_canonical(&forward_kinematics(&rest_pose())).unwrap();
        assert!(canonical[0].length() < EPS);
        for joint in 0..JOINTS_PER_FINGER {
            let p = canonical[digit_node_id(2, joint) as usize];
            assert!(p.x.abs() < EPS && p.y.abs() < EPS);
            assert!(p.z > 0.0);
        }
        assert!(canonical[digit_node_id(1, 0) as usize].y > 0.0);
        assert!(canonical[digit_node_id(4, 0) as usize].y < 0.0);
    }

    #[test]
    fn test_canonical_is_pose_invariant() {
        let base = to_canonical(&forward_kinematics(&rest_pose())).unwrap();
        let mut moved = rest_pose();
        let angle: f32 = 0.7;
        moved[0].rotation = Quaternion::new((angle / 2.0).cos(), (angle / 2.0).sin(), 0.0, 0.0);
        moved[0].position = Vec3::new(-0.3, 0.1, 0.5);
        let canonical = to_canonical(&forward_kinematics(&moved)).unwrap();
        for (a, b) in base.iter().zip(canonical.iter()) {
            assert!((*a - *b).length() < 1e-4);
        }
    }

    #[test]
    fn test_degenerate_palm() {
        let points = [glam::Vec3::ZERO; HAND_NODE_COUNT];
        assert!(to_canonical(&points).is_none());
    }

    #[test]
    fn test_missing_node_yields_none() {
        let mut nodes: Vec<SkeletonNode> = hand::nodes()
            .into_iter()
            .map(|n| SkeletonNode {
                id: n.id,
                transform: n.transform,
            })
            .collect();
        let skeleton = ClientSkeleton {
            info: SkeletonInfo {
                id: 1,
                nodes_count: nodes.len() as u32,
                publish_time: Timestamp(0),
            },
            nodes: nodes.clone(),
        };
        assert!(hand_keypoints(&skeleton).is_some());

        nodes.pop();
        let partial = ClientSkeleton { nodes, ..skeleton };
        assert!(hand_keypoints(&partial).is_none());
    }
}
