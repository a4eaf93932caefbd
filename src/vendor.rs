//! Binding to the vendor Core SDK shared library (feature `vendor-sdk`).
//!
//! The C API keeps its session in process-global state and its stream
//! callbacks carry no user data, so this module holds one callback slot per
//! stream and only one [`VendorCore`] can exist at a time.

use crate::error::SdkReturnCode;
use crate::protocol::{
    copy_to_fixed, extract_string, MAX_CHAIN_LENGTH, MAX_NUM_CHARS_IN_HOST_NAME,
    MAX_NUM_CHARS_IN_IP_ADDRESS, MAX_NUM_CHARS_IN_NODE_NAME, MAX_NUM_CHARS_IN_SKELETON_NAME,
    MAX_NUM_CHARS_IN_TARGET_ID, MAX_NUM_CHARS_IN_TRACKER_ID, MAX_NUM_CHARS_IN_VERSION,
    MAX_NUM_FINGER_IDS, MAX_NUM_TOE_IDS,
};
use crate::sdk::{
    CoreSdk, RawSkeletonStreamAccess, RawSkeletonStreamCallback, SdkResult, SkeletonStreamAccess,
    SkeletonStreamCallback, TrackerStreamAccess, TrackerStreamCallback,
};
use crate::types::{
    ChainSettings, ChainSetup, ColliderSetup, ColliderShape, CoordinateSystem, Host, NodeSetup,
    Quaternion, RawSkeletonInfo, SessionType, SkeletonInfo, SkeletonNode, SkeletonSetupInfo,
    SkeletonStreamInfo, SkeletonTarget, Timestamp, TrackerData, TrackerStreamInfo, TrackerType,
    TrackingQuality, Transform, Vec3, Version,
};
use std::ffi::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

// -- C layouts. Enums cross the boundary as plain ints. --

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CVec3 {
    x: f32,
    y: f32,
    z: f32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CQuaternion {
    w: f32,
    x: f32,
    y: f32,
    z: f32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CTransform {
    position: CVec3,
    rotation: CQuaternion,
    scale: CVec3,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CTimestamp {
    time: u64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CVersion {
    major: u32,
    minor: u32,
    patch: u32,
    label: [c_char; MAX_NUM_CHARS_IN_VERSION],
    sha: [c_char; MAX_NUM_CHARS_IN_VERSION],
    tag: [c_char; MAX_NUM_CHARS_IN_VERSION],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CHost {
    host_name: [c_char; MAX_NUM_CHARS_IN_HOST_NAME],
    ip_address: [c_char; MAX_NUM_CHARS_IN_IP_ADDRESS],
    core_version: CVersion,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CCoordinateSystemVuh {
    view: i32,
    up: i32,
    handedness: i32,
    unit_scale: f32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CCoordinateSystemDirection {
    x: i32,
    y: i32,
    z: i32,
    unit_scale: f32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CNodeSettings {
    used_settings: i32,
    ik_aim: f32,
    height_from_ground: f32,
    rotation_offset: CQuaternion,
    leaf_direction: CVec3,
    leaf_length: f32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CNodeSetup {
    id: u32,
    name: [c_char; MAX_NUM_CHARS_IN_NODE_NAME],
    node_type: i32,
    transform: CTransform,
    parent_id: u32,
    settings: CNodeSettings,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CPelvis {
    hip_height: f32,
    hip_bend_offset: f32,
    thickness_multiplier: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CLeg {
    reverse_knee_direction: bool,
    knee_rotation_offset: f32,
    foot_forward_offset: f32,
    foot_side_offset: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CHead {
    pitch_offset: f32,
    yaw_offset: f32,
    tilt_offset: f32,
    use_leaf_at_end: bool,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CArm {
    length_multiplier: f32,
    elbow_rotation_offset: f32,
    rotation_offset: CVec3,
    position_multiplier: CVec3,
    position_offset: CVec3,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CShoulder {
    forward_offset: f32,
    shrug_offset: f32,
    forward_multiplier: f32,
    shrug_multiplier: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CFinger {
    use_leaf_at_end: bool,
    metacarpal_bone_id: i32,
    hand_chain_id: i32,
    finger_width: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CHand {
    finger_chain_ids: [i32; MAX_NUM_FINGER_IDS],
    finger_chain_ids_used: i32,
    hand_motion: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CFoot {
    toe_chain_ids: [i32; MAX_NUM_TOE_IDS],
    toe_chain_ids_used: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CToe {
    foot_chain_id: i32,
    use_leaf_at_end: bool,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CChainSettings {
    used_settings: i32,
    pelvis: CPelvis,
    leg: CLeg,
    spine_bend_offset: f32,
    neck_bend_offset: f32,
    head: CHead,
    arm: CArm,
    shoulder: CShoulder,
    finger: CFinger,
    hand: CHand,
    foot: CFoot,
    toe: CToe,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CChainSetup {
    id: u32,
    chain_type: i32,
    data_type: i32,
    data_index: u32,
    node_id_count: u32,
    node_ids: [u32; MAX_CHAIN_LENGTH],
    settings: CChainSettings,
    side: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CColliderSetup {
    node_id: u32,
    local_position: CVec3,
    local_rotation: CVec3,
    collider_type: i32,
    sphere_radius: f32,
    capsule_radius: f32,
    capsule_length: f32,
    box_size: CVec3,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CSkeletonSettings {
    scale_to_target: bool,
    use_end_point_approximations: bool,
    collision_type: i32,
    target_type: i32,
    user_id: u32,
    user_index: u32,
    animation_id: [c_char; MAX_NUM_CHARS_IN_TARGET_ID],
    glove_id: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CSkeletonSetupInfo {
    id: u32,
    skeleton_type: i32,
    settings: CSkeletonSettings,
    name: [c_char; MAX_NUM_CHARS_IN_SKELETON_NAME],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CSkeletonStreamInfo {
    publish_time: CTimestamp,
    skeletons_count: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CSkeletonInfo {
    id: u32,
    nodes_count: u32,
    publish_time: CTimestamp,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CRawSkeletonInfo {
    glove_id: u32,
    nodes_count: u32,
    publish_time: CTimestamp,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CSkeletonNode {
    id: u32,
    transform: CTransform,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CTrackerData {
    last_update_time: CTimestamp,
    tracker_id: [c_char; MAX_NUM_CHARS_IN_TRACKER_ID],
    user_id: u32,
    is_hmd: bool,
    tracker_type: i32,
    rotation: CQuaternion,
    position: CVec3,
    quality: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CTrackerStreamInfo {
    publish_time: CTimestamp,
    tracker_count: u32,
}

type CSkeletonCallback = extern "C" fn(*const CSkeletonStreamInfo);
type CTrackerCallback = extern "C" fn(*const CTrackerStreamInfo);

#[allow(non_snake_case)]
extern "C" {
    fn CoreSdk_Initialize(session_type: i32) -> i32;
    fn CoreSdk_ShutDown() -> i32;
    fn CoreSdk_InitializeCoordinateSystemWithVUH(cs: CCoordinateSystemVuh, world: bool) -> i32;
    fn CoreSdk_InitializeCoordinateSystemWithDirection(
        cs: CCoordinateSystemDirection,
        world: bool,
    ) -> i32;
    fn CoreSdk_LookForHosts(wait_seconds: u32, loopback_only: bool) -> i32;
    fn CoreSdk_GetNumberOfAvailableHostsFound(count: *mut u32) -> i32;
    fn CoreSdk_GetAvailableHostsFound(hosts: *mut CHost, count: u32) -> i32;
    fn CoreSdk_ConnectToHost(host: CHost) -> i32;
    fn CoreSdk_Disconnect() -> i32;
    fn CoreSdk_GetIsConnectedToCore(connected: *mut bool) -> i32;
    fn CoreSdk_RegisterCallbackForSkeletonStream(callback: CSkeletonCallback) -> i32;
    fn CoreSdk_RegisterCallbackForRawSkeletonStream(callback: CSkeletonCallback) -> i32;
    fn CoreSdk_RegisterCallbackForTrackerStream(callback: CTrackerCallback) -> i32;
    fn CoreSdk_GetSkeletonInfo(index: u32, info: *mut CSkeletonInfo) -> i32;
    fn CoreSdk_GetSkeletonData(index: u32, nodes: *mut CSkeletonNode, count: u32) -> i32;
    fn CoreSdk_GetRawSkeletonInfo(index: u32, info: *mut CRawSkeletonInfo) -> i32;
    fn CoreSdk_GetRawSkeletonData(index: u32, nodes: *mut CSkeletonNode, count: u32) -> i32;
    fn CoreSdk_GetTrackerData(index: u32, data: *mut CTrackerData) -> i32;
    fn CoreSdk_CreateSkeletonSetup(info: CSkeletonSetupInfo, index: *mut u32) -> i32;
    fn CoreSdk_AddNodeToSkeletonSetup(index: u32, node: CNodeSetup) -> i32;
    fn CoreSdk_AddChainToSkeletonSetup(index: u32, chain: CChainSetup) -> i32;
    fn CoreSdk_AddColliderToSkeletonSetup(index: u32, collider: CColliderSetup) -> i32;
    fn CoreSdk_OverwriteNodeToSkeletonSetup(index: u32, node: CNodeSetup) -> i32;
    fn CoreSdk_OverwriteChainToSkeletonSetup(index: u32, chain: CChainSetup) -> i32;
    fn CoreSdk_LoadSkeleton(index: u32, skeleton_id: *mut u32) -> i32;
    fn CoreSdk_UnloadSkeleton(skeleton_id: u32) -> i32;
    fn CoreSdk_GetSessionId(session_id: *mut u32) -> i32;
    fn CoreSdk_ClearTemporarySkeleton(index: u32, session_id: u32) -> i32;
}

fn check(raw: i32) -> SdkResult<()> {
    SdkReturnCode::check(raw as u32)
}

// -- Conversions --

fn fixed<const N: usize>(value: &str) -> [c_char; N] {
    copy_to_fixed::<N>(value).map(|b| b as c_char)
}

fn unfixed(value: &[c_char]) -> String {
    let bytes: Vec<u8> = value.iter().map(|&c| c as u8).collect();
    extract_string(&bytes)
}

impl From<Vec3> for CVec3 {
    fn from(v: Vec3) -> Self {
        CVec3 { x: v.x, y: v.y, z: v.z }
    }
}

impl From<CVec3> for Vec3 {
    fn from(v: CVec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Quaternion> for CQuaternion {
    fn from(q: Quaternion) -> Self {
        CQuaternion { w: q.w, x: q.x, y: q.y, z: q.z }
    }
}

impl From<CQuaternion> for Quaternion {
    fn from(q: CQuaternion) -> Self {
        Quaternion::new(q.w, q.x, q.y, q.z)
    }
}

impl From<Transform> for CTransform {
    fn from(t: Transform) -> Self {
        CTransform {
            position: t.position.into(),
            rotation: t.rotation.into(),
            scale: t.scale.into(),
        }
    }
}

impl From<CTransform> for Transform {
    fn from(t: CTransform) -> Self {
        Transform {
            position: t.position.into(),
            rotation: t.rotation.into(),
            scale: t.scale.into(),
        }
    }
}

impl From<&Host> for CHost {
    fn from(host: &Host) -> Self {
        let v = &host.core_version;
        CHost {
            host_name: fixed(&host.host_name),
            ip_address: fixed(&host.ip_address),
            core_version: CVersion {
                major: v.major,
                minor: v.minor,
                patch: v.patch,
                label: fixed(&v.label),
                sha: fixed(&v.sha),
                tag: fixed(&v.tag),
            },
        }
    }
}

impl From<&CHost> for Host {
    fn from(host: &CHost) -> Self {
        let v = &host.core_version;
        Host {
            host_name: unfixed(&host.host_name),
            ip_address: unfixed(&host.ip_address),
            core_version: Version {
                major: v.major,
                minor: v.minor,
                patch: v.patch,
                label: unfixed(&v.label),
                sha: unfixed(&v.sha),
                tag: unfixed(&v.tag),
            },
        }
    }
}

fn empty_host() -> CHost {
    CHost::from(&Host::default())
}

fn node_to_c(node: &NodeSetup) -> CNodeSetup {
    CNodeSetup {
        id: node.id,
        name: fixed(&node.name),
        node_type: node.node_type as i32,
        transform: node.transform.into(),
        parent_id: node.parent_id,
        settings: CNodeSettings {
            used_settings: node.settings.used.bits() as i32,
            ik_aim: node.settings.ik_aim,
            height_from_ground: node.settings.foot_height,
            rotation_offset: node.settings.rotation_offset.into(),
            leaf_direction: node.settings.leaf_direction.into(),
            leaf_length: node.settings.leaf_length,
        },
    }
}

fn id_list<const N: usize>(ids: &[i32]) -> ([i32; N], i32) {
    let mut out = [0i32; N];
    let used = ids.len().min(N);
    out[..used].copy_from_slice(&ids[..used]);
    (out, used as i32)
}

fn chain_to_c(chain: &ChainSetup) -> CChainSetup {
    let mut settings = CChainSettings {
        used_settings: chain.chain_type as i32,
        ..CChainSettings::default()
    };
    match &chain.settings {
        ChainSettings::Pelvis {
            hip_height,
            hip_bend_offset,
            thickness_multiplier,
        } => {
            settings.pelvis = CPelvis {
                hip_height: *hip_height,
                hip_bend_offset: *hip_bend_offset,
                thickness_multiplier: *thickness_multiplier,
            }
        }
        ChainSettings::Leg {
            reverse_knee_direction,
            knee_rotation_offset,
            foot_forward_offset,
            foot_side_offset,
        } => {
            settings.leg = CLeg {
                reverse_knee_direction: *reverse_knee_direction,
                knee_rotation_offset: *knee_rotation_offset,
                foot_forward_offset: *foot_forward_offset,
                foot_side_offset: *foot_side_offset,
            }
        }
        ChainSettings::Spine { spine_bend_offset } => settings.spine_bend_offset = *spine_bend_offset,
        ChainSettings::Neck { neck_bend_offset } => settings.neck_bend_offset = *neck_bend_offset,
        ChainSettings::Head {
            head_pitch_offset,
            head_yaw_offset,
            head_tilt_offset,
            use_leaf_at_end,
        } => {
            settings.head = CHead {
                pitch_offset: *head_pitch_offset,
                yaw_offset: *head_yaw_offset,
                tilt_offset: *head_tilt_offset,
                use_leaf_at_end: *use_leaf_at_end,
            }
        }
        ChainSettings::Arm {
            arm_length_multiplier,
            elbow_rotation_offset,
            arm_rotation_offset,
            position_multiplier,
            position_offset,
        } => {
            settings.arm = CArm {
                length_multiplier: *arm_length_multiplier,
                elbow_rotation_offset: *elbow_rotation_offset,
                rotation_offset: (*arm_rotation_offset).into(),
                position_multiplier: (*position_multiplier).into(),
                position_offset: (*position_offset).into(),
            }
        }
        ChainSettings::Shoulder {
            forward_offset,
            shrug_offset,
            forward_multiplier,
            shrug_multiplier,
        } => {
            settings.shoulder = CShoulder {
                forward_offset: *forward_offset,
                shrug_offset: *shrug_offset,
                forward_multiplier: *forward_multiplier,
                shrug_multiplier: *shrug_multiplier,
            }
        }
        ChainSettings::Finger {
            use_leaf_at_end,
            metacarpal_bone_id,
            hand_chain_id,
            finger_width,
        } => {
            settings.finger = CFinger {
                use_leaf_at_end: *use_leaf_at_end,
                metacarpal_bone_id: *metacarpal_bone_id,
                hand_chain_id: *hand_chain_id,
                finger_width: *finger_width,
            }
        }
        ChainSettings::Hand {
            finger_chain_ids,
            hand_motion,
        } => {
            let (ids, used) = id_list::<MAX_NUM_FINGER_IDS>(finger_chain_ids);
            settings.hand = CHand {
                finger_chain_ids: ids,
                finger_chain_ids_used: used,
                hand_motion: *hand_motion as i32,
            }
        }
        ChainSettings::Foot { toe_chain_ids } => {
            let (ids, used) = id_list::<MAX_NUM_TOE_IDS>(toe_chain_ids);
            settings.foot = CFoot {
                toe_chain_ids: ids,
                toe_chain_ids_used: used,
            }
        }
        ChainSettings::Toe {
            foot_chain_id,
            use_leaf_at_end,
        } => {
            settings.toe = CToe {
                foot_chain_id: *foot_chain_id,
                use_leaf_at_end: *use_leaf_at_end,
            }
        }
    }

    let mut node_ids = [0u32; MAX_CHAIN_LENGTH];
    let count = chain.node_ids.len().min(MAX_CHAIN_LENGTH);
    node_ids[..count].copy_from_slice(&chain.node_ids[..count]);
    CChainSetup {
        id: chain.id,
        chain_type: chain.chain_type as i32,
        data_type: chain.data_type as i32,
        data_index: chain.data_index,
        node_id_count: count as u32,
        node_ids,
        settings,
        side: chain.side as i32,
    }
}

fn collider_to_c(collider: &ColliderSetup) -> CColliderSetup {
    let mut c = CColliderSetup {
        node_id: collider.node_id,
        local_position: collider.local_position.into(),
        local_rotation: collider.local_rotation.into(),
        collider_type: 0,
        sphere_radius: 0.0,
        capsule_radius: 0.0,
        capsule_length: 0.0,
        box_size: CVec3::default(),
    };
    match collider.shape {
        ColliderShape::Sphere { radius } => {
            c.collider_type = 1;
            c.sphere_radius = radius;
        }
        ColliderShape::Capsule { radius, length } => {
            c.collider_type = 2;
            c.capsule_radius = radius;
            c.capsule_length = length;
        }
        ColliderShape::Box { size } => {
            c.collider_type = 3;
            c.box_size = size.into();
        }
    }
    c
}

fn setup_info_to_c(info: &SkeletonSetupInfo) -> CSkeletonSetupInfo {
    let s = &info.settings;
    let mut settings = CSkeletonSettings {
        scale_to_target: s.scale_to_target,
        use_end_point_approximations: s.use_end_point_approximations,
        collision_type: s.collision_type as i32,
        target_type: 0,
        user_id: 0,
        user_index: 0,
        animation_id: [0; MAX_NUM_CHARS_IN_TARGET_ID],
        glove_id: 0,
    };
    match &s.target {
        SkeletonTarget::UserId(id) => {
            settings.target_type = 1;
            settings.user_id = *id;
        }
        SkeletonTarget::UserIndex(index) => {
            settings.target_type = 2;
            settings.user_index = *index;
        }
        SkeletonTarget::Animation(id) => {
            settings.target_type = 3;
            settings.animation_id = fixed(id);
        }
        SkeletonTarget::GloveId(id) => {
            settings.target_type = 4;
            settings.glove_id = *id;
        }
    }
    CSkeletonSetupInfo {
        id: 0,
        skeleton_type: info.skeleton_type as i32,
        settings,
        name: fixed(&info.name),
    }
}

fn tracker_type_from_raw(raw: i32) -> TrackerType {
    const TYPES: [TrackerType; 13] = [
        TrackerType::Unknown,
        TrackerType::Head,
        TrackerType::Waist,
        TrackerType::LeftHand,
        TrackerType::RightHand,
        TrackerType::LeftFoot,
        TrackerType::RightFoot,
        TrackerType::LeftUpperArm,
        TrackerType::RightUpperArm,
        TrackerType::LeftUpperLeg,
        TrackerType::RightUpperLeg,
        TrackerType::Controller,
        TrackerType::Camera,
    ];
    usize::try_from(raw)
        .ok()
        .and_then(|i| TYPES.get(i).copied())
        .unwrap_or_default()
}

fn quality_from_raw(raw: i32) -> TrackingQuality {
    match raw {
        1 => TrackingQuality::BadTracking,
        2 => TrackingQuality::Trackable,
        _ => TrackingQuality::Untrackable,
    }
}

fn nodes_from_c(raw: &[CSkeletonNode], out: &mut [SkeletonNode]) {
    for (dst, src) in out.iter_mut().zip(raw) {
        dst.id = src.id;
        dst.transform = src.transform.into();
    }
}

fn zeroed_nodes(count: usize) -> Vec<CSkeletonNode> {
    vec![
        CSkeletonNode {
            id: 0,
            transform: Transform::IDENTITY.into(),
        };
        count
    ]
}

// -- Stream callbacks --

type Slot<T> = RwLock<Option<Arc<T>>>;

static SKELETON_CALLBACK: Slot<SkeletonStreamCallback> = RwLock::new(None);
static RAW_SKELETON_CALLBACK: Slot<RawSkeletonStreamCallback> = RwLock::new(None);
static TRACKER_CALLBACK: Slot<TrackerStreamCallback> = RwLock::new(None);
static INSTANCE: AtomicBool = AtomicBool::new(false);

fn load<T>(slot: &Slot<T>) -> Option<Arc<T>> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn store<T>(slot: &Slot<T>, value: Option<Arc<T>>) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = value;
}

struct VendorSkeletons;

impl SkeletonStreamAccess for VendorSkeletons {
    fn skeleton_info(&self, index: u32) -> SdkResult<SkeletonInfo> {
        let mut info = CSkeletonInfo::default();
        check(unsafe { CoreSdk_GetSkeletonInfo(index, &mut info) })?;
        Ok(SkeletonInfo {
            id: info.id,
            nodes_count: info.nodes_count,
            publish_time: Timestamp(info.publish_time.time),
        })
    }

    fn skeleton_data(&self, index: u32, nodes: &mut [SkeletonNode]) -> SdkResult<()> {
        let mut raw = zeroed_nodes(nodes.len());
        check(unsafe { CoreSdk_GetSkeletonData(index, raw.as_mut_ptr(), raw.len() as u32) })?;
        nodes_from_c(&raw, nodes);
        Ok(())
    }
}

impl RawSkeletonStreamAccess for VendorSkeletons {
    fn raw_skeleton_info(&self, index: u32) -> SdkResult<RawSkeletonInfo> {
        let mut info = CRawSkeletonInfo::default();
        check(unsafe { CoreSdk_GetRawSkeletonInfo(index, &mut info) })?;
        Ok(RawSkeletonInfo {
            glove_id: info.glove_id,
            nodes_count: info.nodes_count,
            publish_time: Timestamp(info.publish_time.time),
        })
    }

    fn raw_skeleton_data(&self, index: u32, nodes: &mut [SkeletonNode]) -> SdkResult<()> {
        let mut raw = zeroed_nodes(nodes.len());
        check(unsafe { CoreSdk_GetRawSkeletonData(index, raw.as_mut_ptr(), raw.len() as u32) })?;
        nodes_from_c(&raw, nodes);
        Ok(())
    }
}

struct VendorTrackers;

impl TrackerStreamAccess for VendorTrackers {
    fn tracker_data(&self, index: u32) -> SdkResult<TrackerData> {
        let mut raw = CTrackerData {
            last_update_time: CTimestamp::default(),
            tracker_id: [0; MAX_NUM_CHARS_IN_TRACKER_ID],
            user_id: 0,
            is_hmd: false,
            tracker_type: 0,
            rotation: Quaternion::IDENTITY.into(),
            position: CVec3::default(),
            quality: 0,
        };
        check(unsafe { CoreSdk_GetTrackerData(index, &mut raw) })?;
        Ok(TrackerData {
            last_update_time: Timestamp(raw.last_update_time.time),
            tracker_id: unfixed(&raw.tracker_id),
            user_id: raw.user_id,
            is_hmd: raw.is_hmd,
            tracker_type: tracker_type_from_raw(raw.tracker_type),
            rotation: raw.rotation.into(),
            position: raw.position.into(),
            quality: quality_from_raw(raw.quality),
        })
    }
}

fn skeleton_stream_info(info: *const CSkeletonStreamInfo) -> Option<SkeletonStreamInfo> {
    // SAFETY: the SDK passes a pointer valid for the duration of the callback.
    let info = unsafe { info.as_ref() }?;
    Some(SkeletonStreamInfo {
        publish_time: Timestamp(info.publish_time.time),
        skeletons_count: info.skeletons_count,
    })
}

// Panics must not unwind into the SDK's thread.
fn guarded(stream: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        log::error!("{} callback panicked", stream);
    }
}

extern "C" fn on_skeleton_stream(info: *const CSkeletonStreamInfo) {
    guarded("skeleton stream", || {
        if let (Some(info), Some(callback)) = (skeleton_stream_info(info), load(&SKELETON_CALLBACK)) {
            callback(&info, &VendorSkeletons);
        }
    });
}

extern "C" fn on_raw_skeleton_stream(info: *const CSkeletonStreamInfo) {
    guarded("raw skeleton stream", || {
        if let (Some(info), Some(callback)) =
            (skeleton_stream_info(info), load(&RAW_SKELETON_CALLBACK))
        {
            callback(&info, &VendorSkeletons);
        }
    });
}

extern "C" fn on_tracker_stream(info: *const CTrackerStreamInfo) {
    guarded("tracker stream", || {
        // SAFETY: valid for the duration of the callback.
        let Some(raw) = (unsafe { info.as_ref() }) else {
            return;
        };
        let info = TrackerStreamInfo {
            publish_time: Timestamp(raw.publish_time.time),
            tracker_count: raw.tracker_count,
        };
        if let Some(callback) = load(&TRACKER_CALLBACK) {
            callback(&info, &VendorTrackers);
        }
    });
}

/// The process-wide vendor SDK session.
pub struct VendorCore {
    _private: (),
}

impl VendorCore {
    /// `None` while another `VendorCore` is alive.
    pub fn acquire() -> Option<VendorCore> {
        INSTANCE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| VendorCore { _private: () })
    }
}

impl Drop for VendorCore {
    fn drop(&mut self) {
        store(&SKELETON_CALLBACK, None);
        store(&RAW_SKELETON_CALLBACK, None);
        store(&TRACKER_CALLBACK, None);
        INSTANCE.store(false, Ordering::SeqCst);
    }
}

impl CoreSdk for VendorCore {
    fn initialize(&self, session: SessionType) -> SdkResult<()> {
        check(unsafe { CoreSdk_Initialize(session as i32) })
    }

    fn shut_down(&self) -> SdkResult<()> {
        check(unsafe { CoreSdk_ShutDown() })
    }

    fn initialize_coordinate_system(
        &self,
        coordinate_system: CoordinateSystem,
        world_space: bool,
    ) -> SdkResult<()> {
        let code = match coordinate_system {
            CoordinateSystem::Vuh {
                view,
                up,
                handedness,
                unit_scale,
            } => unsafe {
                CoreSdk_InitializeCoordinateSystemWithVUH(
                    CCoordinateSystemVuh {
                        view: view as i32,
                        up: up as i32,
                        handedness: handedness as i32,
                        unit_scale,
                    },
                    world_space,
                )
            },
            CoordinateSystem::Direction { x, y, z, unit_scale } => unsafe {
                CoreSdk_InitializeCoordinateSystemWithDirection(
                    CCoordinateSystemDirection {
                        x: x as i32,
                        y: y as i32,
                        z: z as i32,
                        unit_scale,
                    },
                    world_space,
                )
            },
        };
        check(code)
    }

    fn look_for_hosts(&self, wait_seconds: u32, loopback_only: bool) -> SdkResult<()> {
        check(unsafe { CoreSdk_LookForHosts(wait_seconds, loopback_only) })
    }

    fn number_of_hosts_found(&self) -> SdkResult<u32> {
        let mut count = 0u32;
        check(unsafe { CoreSdk_GetNumberOfAvailableHostsFound(&mut count) })?;
        Ok(count)
    }

    fn hosts_found(&self, out: &mut [Host]) -> SdkResult<()> {
        let mut raw = vec![empty_host(); out.len()];
        check(unsafe { CoreSdk_GetAvailableHostsFound(raw.as_mut_ptr(), raw.len() as u32) })?;
        for (dst, src) in out.iter_mut().zip(&raw) {
            *dst = Host::from(src);
        }
        Ok(())
    }

    fn connect_to_host(&self, host: &Host) -> SdkResult<()> {
        check(unsafe { CoreSdk_ConnectToHost(CHost::from(host)) })
    }

    fn disconnect(&self) -> SdkResult<()> {
        check(unsafe { CoreSdk_Disconnect() })
    }

    fn is_connected(&self) -> SdkResult<bool> {
        let mut connected = false;
        check(unsafe { CoreSdk_GetIsConnectedToCore(&mut connected) })?;
        Ok(connected)
    }

    fn register_skeleton_stream(&self, callback: SkeletonStreamCallback) -> SdkResult<()> {
        store(&SKELETON_CALLBACK, Some(Arc::new(callback)));
        check(unsafe { CoreSdk_RegisterCallbackForSkeletonStream(on_skeleton_stream) })
    }

    fn register_raw_skeleton_stream(&self, callback: RawSkeletonStreamCallback) -> SdkResult<()> {
        store(&RAW_SKELETON_CALLBACK, Some(Arc::new(callback)));
        check(unsafe { CoreSdk_RegisterCallbackForRawSkeletonStream(on_raw_skeleton_stream) })
    }

    fn register_tracker_stream(&self, callback: TrackerStreamCallback) -> SdkResult<()> {
        store(&TRACKER_CALLBACK, Some(Arc::new(callback)));
        check(unsafe { CoreSdk_RegisterCallbackForTrackerStream(on_tracker_stream) })
    }

    fn create_skeleton_setup(&self, info: &SkeletonSetupInfo) -> SdkResult<u32> {
        let mut index = 0u32;
        check(unsafe { CoreSdk_CreateSkeletonSetup(setup_info_to_c(info), &mut index) })?;
        Ok(index)
    }

    fn add_node_to_setup(&self, setup_index: u32, node: &NodeSetup) -> SdkResult<()> {
        check(unsafe { CoreSdk_AddNodeToSkeletonSetup(setup_index, node_to_c(node)) })
    }

    fn add_chain_to_setup(&self, setup_index: u32, chain: &ChainSetup) -> SdkResult<()> {
        check(unsafe { CoreSdk_AddChainToSkeletonSetup(setup_index, chain_to_c(chain)) })
    }

    fn add_collider_to_setup(&self, setup_index: u32, collider: &ColliderSetup) -> SdkResult<()> {
        check(unsafe {
            CoreSdk_AddColliderToSkeletonSetup(setup_index, collider_to_c(collider))
        })
    }

    fn overwrite_node_in_setup(&self, setup_index: u32, node: &NodeSetup) -> SdkResult<()> {
        check(unsafe { CoreSdk_OverwriteNodeToSkeletonSetup(setup_index, node_to_c(node)) })
    }

    fn overwrite_chain_in_setup(&self, setup_index: u32, chain: &ChainSetup) -> SdkResult<()> {
        check(unsafe { CoreSdk_OverwriteChainToSkeletonSetup(setup_index, chain_to_c(chain)) })
    }

    fn load_skeleton(&self, setup_index: u32) -> SdkResult<u32> {
        let mut id = 0u32;
        check(unsafe { CoreSdk_LoadSkeleton(setup_index, &mut id) })?;
        Ok(id)
    }

    fn unload_skeleton(&self, skeleton_id: u32) -> SdkResult<()> {
        check(unsafe { CoreSdk_UnloadSkeleton(skeleton_id) })
    }

    fn clear_skeleton_setup(&self, setup_index: u32) -> SdkResult<()> {
        let mut session_id = 0u32;
        check(unsafe { CoreSdk_GetSessionId(&mut session_id) })?;
        check(unsafe { CoreSdk_ClearTemporarySkeleton(setup_index, session_id) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand;
    use crate::types::Side;

    #[test]
    fn test_hand_chain_conversion() {
        let chains = hand::chains(Side::Left);
        let c = chain_to_c(&chains[0]);
        assert_eq!(c.chain_type, 13);
        assert_eq!(c.node_id_count, 1);
        assert_eq!(c.settings.hand.finger_chain_ids_used, 5);
        assert_eq!(&c.settings.hand.finger_chain_ids[..5], &[1, 2, 3, 4, 5]);
        assert_eq!(c.settings.hand.hand_motion, 1);

        let thumb = chain_to_c(&chains[1]);
        assert_eq!(thumb.settings.used_settings, 5);
        assert_eq!(thumb.settings.finger.metacarpal_bone_id, -1);
        assert_eq!(&thumb.node_ids[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_host_strings_survive_fixed_buffers() {
        let host = Host::new("studio-pc", "192.168.1.20");
        let back = Host::from(&CHost::from(&host));
        assert_eq!(back, host);
    }

    #[test]
    fn test_setup_info_target() {
        let c = setup_info_to_c(&hand::setup_info(Side::Right, 2));
        assert_eq!(c.settings.target_type, 2);
        assert_eq!(c.settings.user_index, 2);
        assert!(c.settings.scale_to_target);
        assert_eq!(unfixed(&c.name), "RightHand");
    }

    #[test]
    fn test_only_one_instance() {
        let first = VendorCore::acquire().unwrap();
        assert!(VendorCore::acquire().is_none());
        drop(first);
        assert!(VendorCore::acquire().is_some());
    }
}
