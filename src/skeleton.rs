use crate::protocol::MAX_NUMBER_OF_SKELETONS_PER_SESSION;
use crate::sdk::CoreSdk;
use crate::setup::SkeletonSetup;
use crate::types::{ChainSetup, ColliderSetup, NodeSetup, SkeletonSetupInfo};
use crate::{ClientError, Result};
use std::collections::{BTreeSet, HashMap};

/// Setup index handed out by the host for a skeleton under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetupHandle(pub u32);

/// Host-assigned id of a loaded skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkeletonId(pub u32);

/// Tracks the setups in flight and the skeletons loaded in this session.
///
/// Each operation validates against the local mirror, forwards to the
/// boundary and only then commits locally, so a boundary failure leaves the
/// mirror as it was.
#[derive(Debug, Default)]
pub struct SetupRegistry {
    setups: HashMap<SetupHandle, SkeletonSetup>,
    loaded: BTreeSet<SkeletonId>,
}

impl SetupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.setups.len()
    }

    pub fn setup(&self, handle: SetupHandle) -> Option<&SkeletonSetup> {
        self.setups.get(&handle)
    }

    pub fn loaded(&self) -> impl Iterator<Item = SkeletonId> + '_ {
        self.loaded.iter().copied()
    }

    pub fn is_loaded(&self, id: SkeletonId) -> bool {
        self.loaded.contains(&id)
    }

    pub fn begin<S: CoreSdk + ?Sized>(
        &mut self,
        sdk: &S,
        info: SkeletonSetupInfo,
    ) -> Result<SetupHandle> {
        if self.setups.len() >= MAX_NUMBER_OF_SKELETONS_PER_SESSION {
            return Err(ClientError::ResourceExhausted {
                what: "skeleton setups in flight",
                max: MAX_NUMBER_OF_SKELETONS_PER_SESSION,
            });
        }
        let setup = SkeletonSetup::new(info)?;
        let index = sdk
            .create_skeleton_setup(setup.info())
            .map_err(ClientError::sdk("create skeleton setup"))?;
        let handle = SetupHandle(index);
        if self.setups.insert(handle, setup).is_some() {
            log::warn!("host reused setup index {} while it was in flight", index);
        }
        log::debug!("created skeleton setup {}", index);
        Ok(handle)
    }

    pub fn add_node<S: CoreSdk + ?Sized>(
        &mut self,
        sdk: &S,
        handle: SetupHandle,
        node: NodeSetup,
    ) -> Result<()> {
        let setup = self.setup_mut(handle)?;
        setup.check_add_node(&node)?;
        sdk.add_node_to_setup(handle.0, &node)
            .map_err(ClientError::sdk("add node to skeleton setup"))?;
        setup.add_node(node)
    }

    pub fn add_chain<S: CoreSdk + ?Sized>(
        &mut self,
        sdk: &S,
        handle: SetupHandle,
        chain: ChainSetup,
    ) -> Result<()> {
        let setup = self.setup_mut(handle)?;
        setup.check_add_chain(&chain)?;
        sdk.add_chain_to_setup(handle.0, &chain)
            .map_err(ClientError::sdk("add chain to skeleton setup"))?;
        setup.add_chain(chain)
    }

    pub fn add_collider<S: CoreSdk + ?Sized>(
        &mut self,
        sdk: &S,
        handle: SetupHandle,
        collider: ColliderSetup,
    ) -> Result<()> {
        let setup = self.setup_mut(handle)?;
        setup.check_add_collider(&collider)?;
        sdk.add_collider_to_setup(handle.0, &collider)
            .map_err(ClientError::sdk("add collider to skeleton setup"))?;
        setup.add_collider(collider)
    }

    pub fn overwrite_node<S: CoreSdk + ?Sized>(
        &mut self,
        sdk: &S,
        handle: SetupHandle,
        node: NodeSetup,
    ) -> Result<()> {
        let setup = self.setup_mut(handle)?;
        setup.check_overwrite_node(&node)?;
        sdk.overwrite_node_in_setup(handle.0, &node)
            .map_err(ClientError::sdk("overwrite node in skeleton setup"))?;
        setup.overwrite_node(node)
    }

    pub fn overwrite_chain<S: CoreSdk + ?Sized>(
        &mut self,
        sdk: &S,
        handle: SetupHandle,
        chain: ChainSetup,
    ) -> Result<()> {
        let setup = self.setup_mut(handle)?;
        setup.check_overwrite_chain(&chain)?;
        sdk.overwrite_chain_in_setup(handle.0, &chain)
            .map_err(ClientError::sdk("overwrite chain in skeleton setup"))?;
        setup.overwrite_chain(chain)
    }

    /// Realize the setup on the host. The handle is invalid afterwards.
    pub fn load<S: CoreSdk + ?Sized>(
        &mut self,
        sdk: &S,
        handle: SetupHandle,
    ) -> Result<SkeletonId> {
        self.setup_mut(handle)?.validate()?;
        let id = sdk
            .load_skeleton(handle.0)
            .map_err(ClientError::sdk("load skeleton"))?;
        self.setups.remove(&handle);
        let id = SkeletonId(id);
        self.loaded.insert(id);
        log::info!("loaded skeleton setup {} as skeleton {}", handle.0, id.0);
        Ok(id)
    }

    /// Discard a setup without loading it.
    pub fn clear<S: CoreSdk + ?Sized>(&mut self, sdk: &S, handle: SetupHandle) -> Result<()> {
        self.setup_mut(handle)?;
        sdk.clear_skeleton_setup(handle.0)
            .map_err(ClientError::sdk("clear skeleton setup"))?;
        self.setups.remove(&handle);
        log::debug!("cleared skeleton setup {}", handle.0);
        Ok(())
    }

    pub fn unload<S: CoreSdk + ?Sized>(&mut self, sdk: &S, id: SkeletonId) -> Result<()> {
        if !self.loaded.contains(&id) {
            return Err(ClientError::SkeletonNotLoaded(id.0));
        }
        sdk.unload_skeleton(id.0)
            .map_err(ClientError::sdk("unload skeleton"))?;
        self.loaded.remove(&id);
        log::info!("unloaded skeleton {}", id.0);
        Ok(())
    }

    /// Forget everything; the host drops setups and skeletons on disconnect.
    pub fn reset(&mut self) {
        self.setups.clear();
        self.loaded.clear();
    }

    fn setup_mut(&mut self, handle: SetupHandle) -> Result<&mut SkeletonSetup> {
        self.setups.get_mut(&handle).ok_or_else(|| {
            ClientError::InvalidReference(format!(
                "setup {} is not in flight (loaded, cleared or never created)",
                handle.0
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkReturnCode;
    use crate::hand;
    use crate::sim::{SimCall, SimulatedCore};
    use crate::types::{CoordinateSystem, Host, SessionType, Side};
    use std::time::Duration;

    fn connected(core: SimulatedCore) -> SimulatedCore {
        let host = Host::new("studio", "10.0.0.5");
        let core = core
            .with_host(host.clone())
            .with_frame_interval(Duration::from_secs(3600));
        core.initialize(SessionType::CoreSdk).unwrap();
        core.initialize_coordinate_system(CoordinateSystem::unreal(), false)
            .unwrap();
        core.connect_to_host(&host).unwrap();
        core
    }

    fn counts(registry: &SetupRegistry, handle: SetupHandle) -> (usize, usize) {
        let setup = registry.setup(handle).unwrap();
        (setup.nodes().len(), setup.chains().len())
    }

    #[test]
    fn test_failed_add_node_keeps_mirror() {
        let core = connected(
            SimulatedCore::new().with_failing_call(SimCall::AddNode, SdkReturnCode::InternalError),
        );
        let mut registry = SetupRegistry::new();
        let handle = registry.begin(&core, hand::setup_info(Side::Left, 0)).unwrap();

        let err = registry
            .add_node(&core, handle, hand::nodes().remove(0))
            .unwrap_err();
        assert_eq!(err.sdk_code(), Some(SdkReturnCode::InternalError));
        assert_eq!(counts(&registry, handle), (0, 0));
        assert_eq!(registry.in_flight(), 1);
    }

    #[test]
    fn test_failed_add_chain_keeps_mirror() {
        let core = connected(
            SimulatedCore::new().with_failing_call(SimCall::AddChain, SdkReturnCode::InvalidArgument),
        );
        let mut registry = SetupRegistry::new();
        let handle = registry.begin(&core, hand::setup_info(Side::Left, 0)).unwrap();
        for node in hand::nodes() {
            registry.add_node(&core, handle, node).unwrap();
        }

        let err = registry
            .add_chain(&core, handle, hand::chains(Side::Left).remove(0))
            .unwrap_err();
        assert_eq!(err.sdk_code(), Some(SdkReturnCode::InvalidArgument));
        assert_eq!(counts(&registry, handle), (hand::HAND_NODE_COUNT, 0));
        assert_eq!(registry.in_flight(), 1);
    }

    #[test]
    fn test_failed_load_keeps_handle() {
        let core = connected(
            SimulatedCore::new().with_failing_call(SimCall::LoadSkeleton, SdkReturnCode::InternalError),
        );
        let mut registry = SetupRegistry::new();
        let handle = registry.begin(&core, hand::setup_info(Side::Right, 0)).unwrap();
        for node in hand::nodes() {
            registry.add_node(&core, handle, node).unwrap();
        }
        for chain in hand::chains(Side::Right) {
            registry.add_chain(&core, handle, chain).unwrap();
        }

        let err = registry.load(&core, handle).unwrap_err();
        assert_eq!(err.sdk_code(), Some(SdkReturnCode::InternalError));
        assert_eq!(counts(&registry, handle), (hand::HAND_NODE_COUNT, 6));
        assert_eq!(registry.in_flight(), 1);
        assert_eq!(registry.loaded().count(), 0);

        // Still a live handle on both sides.
        registry.clear(&core, handle).unwrap();
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn test_failed_create_claims_no_slot() {
        let core = connected(
            SimulatedCore::new()
                .with_failing_call(SimCall::CreateSkeletonSetup, SdkReturnCode::MemoryError),
        );
        let mut registry = SetupRegistry::new();
        assert!(registry.begin(&core, hand::setup_info(Side::Left, 0)).is_err());
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn test_unload_unknown_skeleton() {
        let core = connected(SimulatedCore::new());
        let mut registry = SetupRegistry::new();
        assert!(matches!(
            registry.unload(&core, SkeletonId(4)),
            Err(ClientError::SkeletonNotLoaded(4))
        ));
    }
}
