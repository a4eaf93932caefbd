//! Local, validated mirror of a skeleton setup under construction.
//!
//! Every mutation is checked here before it is sent across the boundary, so
//! the host only ever sees setups that satisfy the referential invariants.

use crate::protocol::{
    self, MAX_CHAIN_LENGTH, MAX_NUM_CHARS_IN_NODE_NAME, MAX_NUM_CHARS_IN_SKELETON_NAME,
    MAX_NUM_CHARS_IN_TARGET_ID, MAX_NUM_FINGER_IDS, MAX_NUM_TOE_IDS,
};
use crate::types::{
    ChainSettings, ChainSetup, ChainType, ColliderSetup, NodeSetup, SkeletonSetupInfo,
    SkeletonTarget, SkeletonType,
};
use crate::{ClientError, Result};

/// A skeleton definition: ordered nodes, ordered chains and colliders.
#[derive(Debug, Clone)]
pub struct SkeletonSetup {
    info: SkeletonSetupInfo,
    nodes: Vec<NodeSetup>,
    chains: Vec<ChainSetup>,
    colliders: Vec<ColliderSetup>,
}

impl SkeletonSetup {
    pub fn new(info: SkeletonSetupInfo) -> Result<Self> {
        check_info(&info)?;
        Ok(Self {
            info,
            nodes: Vec::new(),
            chains: Vec::new(),
            colliders: Vec::new(),
        })
    }

    pub fn info(&self) -> &SkeletonSetupInfo {
        &self.info
    }

    pub fn nodes(&self) -> &[NodeSetup] {
        &self.nodes
    }

    pub fn chains(&self) -> &[ChainSetup] {
        &self.chains
    }

    pub fn colliders(&self) -> &[ColliderSetup] {
        &self.colliders
    }

    pub fn node(&self, id: u32) -> Option<&NodeSetup> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn chain(&self, id: u32) -> Option<&ChainSetup> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn root(&self) -> Option<&NodeSetup> {
        self.nodes.iter().find(|n| n.is_root())
    }

    /// Check that `node` may be appended.
    pub fn check_add_node(&self, node: &NodeSetup) -> Result<()> {
        protocol::check_fixed_string("node name", &node.name, MAX_NUM_CHARS_IN_NODE_NAME)?;
        if self.node(node.id).is_some() {
            return Err(ClientError::InvalidReference(format!(
                "node id {} is already in the setup",
                node.id
            )));
        }
        if node.is_root() {
            if let Some(root) = self.root() {
                return Err(ClientError::InvalidReference(format!(
                    "node {} claims to be a root, but node {} already is",
                    node.id, root.id
                )));
            }
        } else if self.node(node.parent_id).is_none() {
            return Err(ClientError::InvalidReference(format!(
                "parent {} of node {} has not been added",
                node.parent_id, node.id
            )));
        }
        Ok(())
    }

    /// Append a node. Its parent must already be present unless it is the root.
    pub fn add_node(&mut self, node: NodeSetup) -> Result<()> {
        self.check_add_node(&node)?;
        self.nodes.push(node);
        Ok(())
    }

    pub fn check_add_chain(&self, chain: &ChainSetup) -> Result<()> {
        if self.chain(chain.id).is_some() {
            return Err(ClientError::InvalidReference(format!(
                "chain id {} is already in the setup",
                chain.id
            )));
        }
        self.check_chain_shape(chain)
    }

    /// Append a chain. Its nodes must already be present; references to
    /// other chains are checked at load time.
    pub fn add_chain(&mut self, chain: ChainSetup) -> Result<()> {
        self.check_add_chain(&chain)?;
        self.chains.push(chain);
        Ok(())
    }

    pub fn check_add_collider(&self, collider: &ColliderSetup) -> Result<()> {
        if self.node(collider.node_id).is_none() {
            return Err(ClientError::InvalidReference(format!(
                "collider node {} has not been added",
                collider.node_id
            )));
        }
        Ok(())
    }

    pub fn add_collider(&mut self, collider: ColliderSetup) -> Result<()> {
        self.check_add_collider(&collider)?;
        self.colliders.push(collider);
        Ok(())
    }

    pub fn check_overwrite_node(&self, node: &NodeSetup) -> Result<()> {
        protocol::check_fixed_string("node name", &node.name, MAX_NUM_CHARS_IN_NODE_NAME)?;
        if self.node(node.id).is_none() {
            return Err(ClientError::InvalidReference(format!(
                "node {} is not in the setup",
                node.id
            )));
        }
        if node.is_root() {
            if let Some(root) = self.root().filter(|r| r.id != node.id) {
                return Err(ClientError::InvalidReference(format!(
                    "node {} cannot become a root, node {} already is",
                    node.id, root.id
                )));
            }
            return Ok(());
        }
        if self.node(node.parent_id).is_none() {
            return Err(ClientError::InvalidReference(format!(
                "parent {} of node {} is not in the setup",
                node.parent_id, node.id
            )));
        }
        // Walk up from the new parent; reaching the node itself means a cycle.
        let mut cursor = node.parent_id;
        for _ in 0..self.nodes.len() {
            if cursor == node.id {
                return Err(ClientError::InvalidReference(format!(
                    "node {} would become its own ancestor",
                    node.id
                )));
            }
            match self.node(cursor) {
                Some(parent) if !parent.is_root() => cursor = parent.parent_id,
                _ => break,
            }
        }
        Ok(())
    }

    /// Replace the node with the same id.
    pub fn overwrite_node(&mut self, node: NodeSetup) -> Result<()> {
        self.check_overwrite_node(&node)?;
        if let Some(slot) = self.nodes.iter_mut().find(|n| n.id == node.id) {
            *slot = node;
        }
        Ok(())
    }

    pub fn check_overwrite_chain(&self, chain: &ChainSetup) -> Result<()> {
        if self.chain(chain.id).is_none() {
            return Err(ClientError::InvalidReference(format!(
                "chain {} is not in the setup",
                chain.id
            )));
        }
        self.check_chain_shape(chain)
    }

    /// Replace the chain with the same id.
    pub fn overwrite_chain(&mut self, chain: ChainSetup) -> Result<()> {
        self.check_overwrite_chain(&chain)?;
        if let Some(slot) = self.chains.iter_mut().find(|c| c.id == chain.id) {
            *slot = chain;
        }
        Ok(())
    }

    /// Check that the setup is complete enough to be loaded.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(ClientError::NotReady("the setup has no nodes".into()));
        }
        if self.root().is_none() {
            return Err(ClientError::NotReady("the setup has no root node".into()));
        }

        let has = |t: ChainType| self.chains.iter().any(|c| c.chain_type == t);
        let required: &[ChainType] = match self.info.skeleton_type {
            SkeletonType::Hand => &[ChainType::Hand],
            SkeletonType::Body => &[ChainType::Pelvis],
            SkeletonType::Both => &[ChainType::Pelvis, ChainType::Hand],
            SkeletonType::Invalid => {
                return Err(ClientError::NotReady("skeleton type is invalid".into()))
            }
        };
        if let Some(missing) = required.iter().find(|t| !has(**t)) {
            return Err(ClientError::NotReady(format!(
                "a {:?} skeleton needs a {:?} chain",
                self.info.skeleton_type, missing
            )));
        }

        for chain in &self.chains {
            self.check_chain_links(chain)?;
        }
        Ok(())
    }

    fn check_chain_shape(&self, chain: &ChainSetup) -> Result<()> {
        if chain.chain_type == ChainType::Invalid {
            return Err(ClientError::InvalidArgument(format!(
                "chain {} has no type",
                chain.id
            )));
        }
        if !chain.settings.matches(chain.chain_type) {
            return Err(ClientError::InvalidArgument(format!(
                "chain {} is a {:?} chain but carries settings for another kind",
                chain.id, chain.chain_type
            )));
        }
        if chain.node_ids.is_empty() || chain.node_ids.len() > MAX_CHAIN_LENGTH {
            return Err(ClientError::InvalidArgument(format!(
                "chain {} has {} nodes (expected 1..={})",
                chain.id,
                chain.node_ids.len(),
                MAX_CHAIN_LENGTH
            )));
        }
        match &chain.settings {
            ChainSettings::Hand { finger_chain_ids, .. }
                if finger_chain_ids.len() > MAX_NUM_FINGER_IDS =>
            {
                return Err(ClientError::InvalidArgument(format!(
                    "hand chain {} lists {} fingers (maximum {})",
                    chain.id,
                    finger_chain_ids.len(),
                    MAX_NUM_FINGER_IDS
                )));
            }
            ChainSettings::Foot { toe_chain_ids } if toe_chain_ids.len() > MAX_NUM_TOE_IDS => {
                return Err(ClientError::InvalidArgument(format!(
                    "foot chain {} lists {} toes (maximum {})",
                    chain.id,
                    toe_chain_ids.len(),
                    MAX_NUM_TOE_IDS
                )));
            }
            _ => {}
        }
        if let Some(missing) = chain.node_ids.iter().find(|id| self.node(**id).is_none()) {
            return Err(ClientError::InvalidReference(format!(
                "chain {} references node {} which has not been added",
                chain.id, missing
            )));
        }
        Ok(())
    }

    fn check_chain_links(&self, chain: &ChainSetup) -> Result<()> {
        let dangling = |what: &str, target: i32| {
            ClientError::NotReady(format!(
                "chain {} references {} {} which is not in the setup",
                chain.id, what, target
            ))
        };
        let chain_of_kind = |id: i32, pred: &dyn Fn(ChainType) -> bool| {
            u32::try_from(id)
                .ok()
                .and_then(|id| self.chain(id))
                .is_some_and(|c| pred(c.chain_type))
        };

        match &chain.settings {
            ChainSettings::Hand { finger_chain_ids, .. } => {
                for &id in finger_chain_ids {
                    if !chain_of_kind(id, &|t: ChainType| t.is_finger()) {
                        return Err(dangling("finger chain", id));
                    }
                }
            }
            ChainSettings::Finger {
                hand_chain_id,
                metacarpal_bone_id,
                ..
            } => {
                let is_hand = |t: ChainType| t == ChainType::Hand;
                if *hand_chain_id >= 0 && !chain_of_kind(*hand_chain_id, &is_hand) {
                    return Err(dangling("hand chain", *hand_chain_id));
                }
                if *metacarpal_bone_id >= 0
                    && self.node(*metacarpal_bone_id as u32).is_none()
                {
                    return Err(dangling("metacarpal node", *metacarpal_bone_id));
                }
            }
            ChainSettings::Foot { toe_chain_ids } => {
                for &id in toe_chain_ids {
                    if !chain_of_kind(id, &|t: ChainType| t == ChainType::Toe) {
                        return Err(dangling("toe chain", id));
                    }
                }
            }
            ChainSettings::Toe { foot_chain_id, .. } => {
                let is_foot = |t: ChainType| t == ChainType::Foot;
                if *foot_chain_id >= 0 && !chain_of_kind(*foot_chain_id, &is_foot) {
                    return Err(dangling("foot chain", *foot_chain_id));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn check_info(info: &SkeletonSetupInfo) -> Result<()> {
    protocol::check_fixed_string("skeleton name", &info.name, MAX_NUM_CHARS_IN_SKELETON_NAME)?;
    if info.skeleton_type == SkeletonType::Invalid {
        return Err(ClientError::InvalidArgument("skeleton type is invalid".into()));
    }
    if let SkeletonTarget::Animation(id) = &info.settings.target {
        protocol::check_fixed_string("animation target id", id, MAX_NUM_CHARS_IN_TARGET_ID)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HandMotion, Side, SkeletonSettings, Vec3};

    fn hand_info() -> SkeletonSetupInfo {
        SkeletonSetupInfo {
            name: "LeftHand".into(),
            skeleton_type: SkeletonType::Hand,
            settings: SkeletonSettings::default(),
        }
    }

    fn hand_chain(id: u32, fingers: Vec<i32>) -> ChainSetup {
        ChainSetup {
            id,
            chain_type: ChainType::Hand,
            data_type: ChainType::Hand,
            data_index: 0,
            node_ids: vec![0],
            side: Side::Left,
            settings: ChainSettings::Hand {
                finger_chain_ids: fingers,
                hand_motion: HandMotion::Imu,
            },
        }
    }

    fn finger_chain(id: u32, nodes: Vec<u32>) -> ChainSetup {
        ChainSetup {
            id,
            chain_type: ChainType::FingerIndex,
            data_type: ChainType::FingerIndex,
            data_index: 0,
            node_ids: nodes,
            side: Side::Left,
            settings: ChainSettings::Finger {
                use_leaf_at_end: false,
                metacarpal_bone_id: -1,
                hand_chain_id: 0,
                finger_width: 0.0,
            },
        }
    }

    fn with_root() -> SkeletonSetup {
        let mut setup = SkeletonSetup::new(hand_info()).unwrap();
        setup.add_node(NodeSetup::joint(0, 0, "Hand", Vec3::ZERO)).unwrap();
        setup
    }

    #[test]
    fn test_root_on_empty_setup() {
        let mut setup = SkeletonSetup::new(hand_info()).unwrap();
        setup.add_node(NodeSetup::joint(7, 7, "Hand", Vec3::ZERO)).unwrap();
        assert_eq!(setup.root().map(|n| n.id), Some(7));
    }

    #[test]
    fn test_missing_parent_rejected() {
        let mut setup = with_root();
        let err = setup
            .add_node(NodeSetup::joint(2, 1, "digit", Vec3::ZERO))
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidReference(_)));
        assert_eq!(setup.nodes().len(), 1);
    }

    #[test]
    fn test_duplicate_node_and_second_root_rejected() {
        let mut setup = with_root();
        assert!(matches!(
            setup.add_node(NodeSetup::joint(0, 0, "again", Vec3::ZERO)),
            Err(ClientError::InvalidReference(_))
        ));
        assert!(matches!(
            setup.add_node(NodeSetup::joint(5, 5, "other root", Vec3::ZERO)),
            Err(ClientError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_chain_node_references() {
        let mut setup = with_root();
        setup.add_node(NodeSetup::joint(1, 0, "a", Vec3::ZERO)).unwrap();
        assert!(matches!(
            setup.add_chain(finger_chain(1, vec![1, 2])),
            Err(ClientError::InvalidReference(_))
        ));
        setup.add_chain(finger_chain(1, vec![1])).unwrap();
        assert!(matches!(
            setup.add_chain(finger_chain(1, vec![1])),
            Err(ClientError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_chain_shape_checks() {
        let mut setup = with_root();
        let mut chain = hand_chain(0, vec![]);
        chain.node_ids.clear();
        assert!(matches!(
            setup.add_chain(chain),
            Err(ClientError::InvalidArgument(_))
        ));

        let mut chain = hand_chain(0, vec![]);
        chain.chain_type = ChainType::Spine;
        assert!(matches!(
            setup.add_chain(chain),
            Err(ClientError::InvalidArgument(_))
        ));

        let chain = hand_chain(0, (1..=11).collect());
        assert!(matches!(
            setup.add_chain(chain),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_finger_links_resolve_at_validate() {
        let mut setup = with_root();
        setup.add_node(NodeSetup::joint(1, 0, "a", Vec3::ZERO)).unwrap();
        // Hand listed before its finger exists.
        setup.add_chain(hand_chain(0, vec![1])).unwrap();
        assert!(matches!(setup.validate(), Err(ClientError::NotReady(_))));

        setup.add_chain(finger_chain(1, vec![1])).unwrap();
        setup.validate().unwrap();
    }

    #[test]
    fn test_validate_requires_hand_chain() {
        let mut setup = with_root();
        setup.add_node(NodeSetup::joint(1, 0, "a", Vec3::ZERO)).unwrap();
        let mut finger = finger_chain(1, vec![1]);
        finger.settings = ChainSettings::Finger {
            use_leaf_at_end: false,
            metacarpal_bone_id: -1,
            hand_chain_id: -1,
            finger_width: 0.0,
        };
        setup.add_chain(finger).unwrap();
        assert!(matches!(setup.validate(), Err(ClientError::NotReady(_))));

        let empty = SkeletonSetup::new(hand_info()).unwrap();
        assert!(matches!(empty.validate(), Err(ClientError::NotReady(_))));
    }

    #[test]
    fn test_overwrite_by_id() {
        let mut setup = with_root();
        setup.add_node(NodeSetup::joint(1, 0, "a", Vec3::ZERO)).unwrap();
        setup.add_node(NodeSetup::joint(2, 1, "b", Vec3::ZERO)).unwrap();

        setup
            .overwrite_node(NodeSetup::joint(2, 0, "b2", Vec3::new(0.0, 0.0, 0.1)))
            .unwrap();
        assert_eq!(setup.node(2).map(|n| n.name.as_str()), Some("b2"));
        assert_eq!(setup.nodes()[2].parent_id, 0);

        // 1 -> 2 -> 1 would be a cycle.
        setup
            .overwrite_node(NodeSetup::joint(2, 1, "b", Vec3::ZERO))
            .unwrap();
        assert!(matches!(
            setup.overwrite_node(NodeSetup::joint(1, 2, "a", Vec3::ZERO)),
            Err(ClientError::InvalidReference(_))
        ));
        assert!(matches!(
            setup.overwrite_node(NodeSetup::joint(9, 0, "x", Vec3::ZERO)),
            Err(ClientError::InvalidReference(_))
        ));
        assert!(matches!(
            setup.overwrite_chain(finger_chain(4, vec![1])),
            Err(ClientError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_collider_needs_node() {
        use crate::types::ColliderShape;
        let mut setup = with_root();
        let collider = ColliderSetup {
            node_id: 3,
            local_position: Vec3::ZERO,
            local_rotation: Vec3::ZERO,
            shape: ColliderShape::Sphere { radius: 0.01 },
        };
        assert!(setup.add_collider(collider).is_err());
        setup
            .add_collider(ColliderSetup { node_id: 0, ..collider })
            .unwrap();
        assert_eq!(setup.colliders().len(), 1);
    }

    #[test]
    fn test_info_checks() {
        let mut info = hand_info();
        info.skeleton_type = SkeletonType::Invalid;
        assert!(SkeletonSetup::new(info).is_err());

        let mut info = hand_info();
        info.settings.target = SkeletonTarget::Animation("a".repeat(40));
        assert!(SkeletonSetup::new(info).is_err());
    }
}
