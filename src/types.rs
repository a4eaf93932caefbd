/// A 3D vector, used for translations and scales.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const ONE: Vec3 = Vec3::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A rotation quaternion, stored `w` first like the boundary does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion { w: 1.0, x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position, rotation and scale of a node.
///
/// Whether this is local to the parent or in world space depends on the flag
/// passed when the coordinate system was initialized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quaternion,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quaternion::IDENTITY,
        scale: Vec3::ONE,
    };

    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quaternion::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Compressed host timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Timestamp(pub u64);

/// Identifies the kind of client in the host's session list.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionType {
    #[default]
    Unknown = 0,
    UnityPlugin = 1,
    UnrealPlugin = 2,
    CoreSdk = 3,
    Xsens = 4,
    Optitrack = 5,
    MotionBuilder = 6,
    Vred = 7,
    OpenXr = 8,
    Qualisys = 9,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Side {
    #[default]
    Invalid = 0,
    Left = 1,
    Right = 2,
    Center = 3,
}

/// Axis pointing away from or towards a viewer sitting in front of the screen.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisView {
    Invalid = 0,
    ZFromViewer = 1,
    YFromViewer = 2,
    XFromViewer = 3,
    XToViewer = 4,
    YToViewer = 5,
    ZToViewer = 6,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisPolarity {
    Invalid = 0,
    NegativeZ = 1,
    NegativeY = 2,
    NegativeX = 3,
    PositiveX = 4,
    PositiveY = 5,
    PositiveZ = 6,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisDirection {
    Invalid = 0,
    Backward = 1,
    Left = 2,
    Down = 3,
    Up = 4,
    Right = 5,
    Forward = 6,
}

/// Coordinate convention the host converts all streamed data into.
///
/// Must be set before the first connect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateSystem {
    /// View axis, up axis and handedness.
    Vuh {
        view: AxisView,
        up: AxisPolarity,
        handedness: Side,
        /// 1.0 is meters, 0.01 centimeters, 0.001 millimeters.
        unit_scale: f32,
    },
    /// Explicit direction for each axis.
    Direction {
        x: AxisDirection,
        y: AxisDirection,
        z: AxisDirection,
        unit_scale: f32,
    },
}

impl CoordinateSystem {
    /// Left handed, Y up, Z away from the viewer, meters.
    pub const fn unreal() -> Self {
        CoordinateSystem::Vuh {
            view: AxisView::ZFromViewer,
            up: AxisPolarity::PositiveY,
            handedness: Side::Left,
            unit_scale: 1.0,
        }
    }

    pub fn unit_scale(&self) -> f32 {
        match *self {
            CoordinateSystem::Vuh { unit_scale, .. } => unit_scale,
            CoordinateSystem::Direction { unit_scale, .. } => unit_scale,
        }
    }

    /// Every axis is specified and the unit scale is positive.
    pub fn is_valid(&self) -> bool {
        let axes_ok = match *self {
            CoordinateSystem::Vuh { view, up, handedness, .. } => {
                view != AxisView::Invalid
                    && up != AxisPolarity::Invalid
                    && matches!(handedness, Side::Left | Side::Right)
            }
            CoordinateSystem::Direction { x, y, z, .. } => {
                x != AxisDirection::Invalid
                    && y != AxisDirection::Invalid
                    && z != AxisDirection::Invalid
            }
        };
        axes_ok && self.unit_scale() > 0.0
    }
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        Self::unreal()
    }
}

/// Version of a Core host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub label: String,
    pub sha: String,
    pub tag: String,
}

/// A running Core host found by discovery.
///
/// When either the host name or the IP address is blank the other one is used
/// to connect.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Host {
    pub host_name: String,
    pub ip_address: String,
    pub core_version: Version,
}

impl Host {
    pub fn new(host_name: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            ip_address: ip_address.into(),
            core_version: Version::default(),
        }
    }
}

// -- Skeleton setup --

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkeletonType {
    #[default]
    Invalid = 0,
    Hand = 1,
    Body = 2,
    Both = 3,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeType {
    #[default]
    Invalid = 0,
    Joint = 1,
    Mesh = 2,
    Leaf = 3,
    Collider = 4,
}

bitflags::bitflags! {
    /// Selects which fields of [`NodeSettings`] are in use.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeSettingsFlag: u32 {
        const IK              = 1 << 0;
        const FOOT            = 1 << 1;
        const ROTATION_OFFSET = 1 << 2;
        const LEAF            = 1 << 3;
    }
}

/// Optional per-node tuning. Only fields whose flag is set are read by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSettings {
    pub used: NodeSettingsFlag,
    /// 1 is default, -1 inverts the IK solve.
    pub ik_aim: f32,
    /// Height of the model's ankle from the ground.
    pub foot_height: f32,
    pub rotation_offset: Quaternion,
    /// Relative to the previous node in the chain.
    pub leaf_direction: Vec3,
    pub leaf_length: f32,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            used: NodeSettingsFlag::empty(),
            ik_aim: 1.0,
            foot_height: 0.0,
            rotation_offset: Quaternion::IDENTITY,
            leaf_direction: Vec3::ZERO,
            leaf_length: 0.0,
        }
    }
}

/// One segment of a skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSetup {
    pub id: u32,
    pub name: String,
    pub node_type: NodeType,
    pub transform: Transform,
    /// Equal to `id` for the root node.
    pub parent_id: u32,
    pub settings: NodeSettings,
}

impl NodeSetup {
    /// A joint without settings at `position` relative to its parent.
    pub fn joint(id: u32, parent_id: u32, name: impl Into<String>, position: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            node_type: NodeType::Joint,
            transform: Transform::from_position(position),
            parent_id,
            settings: NodeSettings::default(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id == self.id
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum ChainType {
    #[default]
    Invalid = 0,
    Arm = 1,
    Leg = 2,
    Neck = 3,
    Spine = 4,
    FingerThumb = 5,
    FingerIndex = 6,
    FingerMiddle = 7,
    FingerRing = 8,
    FingerPinky = 9,
    Pelvis = 10,
    Head = 11,
    Shoulder = 12,
    Hand = 13,
    Foot = 14,
    Toe = 15,
}

impl ChainType {
    pub const FINGERS: [ChainType; 5] = [
        ChainType::FingerThumb,
        ChainType::FingerIndex,
        ChainType::FingerMiddle,
        ChainType::FingerRing,
        ChainType::FingerPinky,
    ];

    pub fn is_finger(self) -> bool {
        Self::FINGERS.contains(&self)
    }
}

/// Which sensor data drives the hand.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandMotion {
    #[default]
    None = 0,
    Imu = 1,
    Tracker = 2,
    TrackerRotationOnly = 3,
    Auto = 4,
}

/// Per-chain tuning, one variant per chain kind.
///
/// Chain references use `-1` for "none", as the host does.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainSettings {
    Pelvis {
        hip_height: f32,
        hip_bend_offset: f32,
        thickness_multiplier: f32,
    },
    Leg {
        reverse_knee_direction: bool,
        knee_rotation_offset: f32,
        foot_forward_offset: f32,
        foot_side_offset: f32,
    },
    Spine {
        spine_bend_offset: f32,
    },
    Neck {
        neck_bend_offset: f32,
    },
    Head {
        head_pitch_offset: f32,
        head_yaw_offset: f32,
        head_tilt_offset: f32,
        use_leaf_at_end: bool,
    },
    Arm {
        arm_length_multiplier: f32,
        elbow_rotation_offset: f32,
        arm_rotation_offset: Vec3,
        position_multiplier: Vec3,
        position_offset: Vec3,
    },
    Shoulder {
        forward_offset: f32,
        shrug_offset: f32,
        forward_multiplier: f32,
        shrug_multiplier: f32,
    },
    Finger {
        use_leaf_at_end: bool,
        /// -1 when there is no metacarpal bone or the chain is a thumb.
        metacarpal_bone_id: i32,
        hand_chain_id: i32,
        finger_width: f32,
    },
    Hand {
        finger_chain_ids: Vec<i32>,
        hand_motion: HandMotion,
    },
    Foot {
        toe_chain_ids: Vec<i32>,
    },
    Toe {
        foot_chain_id: i32,
        use_leaf_at_end: bool,
    },
}

impl ChainSettings {
    /// Whether this settings variant belongs to a chain of `chain_type`.
    pub fn matches(&self, chain_type: ChainType) -> bool {
        match self {
            ChainSettings::Pelvis { .. } => chain_type == ChainType::Pelvis,
            ChainSettings::Leg { .. } => chain_type == ChainType::Leg,
            ChainSettings::Spine { .. } => chain_type == ChainType::Spine,
            ChainSettings::Neck { .. } => chain_type == ChainType::Neck,
            ChainSettings::Head { .. } => chain_type == ChainType::Head,
            ChainSettings::Arm { .. } => chain_type == ChainType::Arm,
            ChainSettings::Shoulder { .. } => chain_type == ChainType::Shoulder,
            ChainSettings::Finger { .. } => chain_type.is_finger(),
            ChainSettings::Hand { .. } => chain_type == ChainType::Hand,
            ChainSettings::Foot { .. } => chain_type == ChainType::Foot,
            ChainSettings::Toe { .. } => chain_type == ChainType::Toe,
        }
    }
}

/// A group of nodes forming one animatable body part.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSetup {
    pub id: u32,
    pub chain_type: ChainType,
    /// Which data source feeds this chain.
    pub data_type: ChainType,
    pub data_index: u32,
    /// Proximal to distal.
    pub node_ids: Vec<u32>,
    pub side: Side,
    pub settings: ChainSettings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Capsule { radius: f32, length: f32 },
    Box { size: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderSetup {
    pub node_id: u32,
    pub local_position: Vec3,
    /// Euler angles.
    pub local_rotation: Vec3,
    pub shape: ColliderShape,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionType {
    #[default]
    None = 0,
    Discrete = 1,
    Continuous = 2,
}

/// The data source a loaded skeleton is animated from.
///
/// A skeleton bound to a user or glove that does not exist loads fine but is
/// never animated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkeletonTarget {
    UserId(u32),
    UserIndex(u32),
    /// Named animation data.
    Animation(String),
    GloveId(u32),
}

impl Default for SkeletonTarget {
    fn default() -> Self {
        SkeletonTarget::UserIndex(0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkeletonSettings {
    pub scale_to_target: bool,
    pub use_end_point_approximations: bool,
    pub collision_type: CollisionType,
    pub target: SkeletonTarget,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkeletonSetupInfo {
    pub name: String,
    pub skeleton_type: SkeletonType,
    pub settings: SkeletonSettings,
}

// -- Streamed data --

/// Current transform of one node of a streamed skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SkeletonNode {
    pub id: u32,
    pub transform: Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkeletonInfo {
    pub id: u32,
    pub nodes_count: u32,
    pub publish_time: Timestamp,
}

/// Skeleton produced by the host's estimation system for one glove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSkeletonInfo {
    pub glove_id: u32,
    pub nodes_count: u32,
    pub publish_time: Timestamp,
}

/// Metadata handed to a skeleton or raw skeleton stream callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkeletonStreamInfo {
    pub publish_time: Timestamp,
    pub skeletons_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerType {
    #[default]
    Unknown = 0,
    Head = 1,
    Waist = 2,
    LeftHand = 3,
    RightHand = 4,
    LeftFoot = 5,
    RightFoot = 6,
    LeftUpperArm = 7,
    RightUpperArm = 8,
    LeftUpperLeg = 9,
    RightUpperLeg = 10,
    Controller = 11,
    Camera = 12,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingQuality {
    #[default]
    Untrackable = 0,
    BadTracking = 1,
    Trackable = 2,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackerData {
    pub last_update_time: Timestamp,
    pub tracker_id: String,
    pub user_id: u32,
    pub is_hmd: bool,
    pub tracker_type: TrackerType,
    pub rotation: Quaternion,
    pub position: Vec3,
    pub quality: TrackingQuality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerStreamInfo {
    pub publish_time: Timestamp,
    pub tracker_count: u32,
}
