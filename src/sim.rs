//! An in-process Core host.
//!
//! [`SimulatedCore`] implements the whole [`CoreSdk`] call contract,
//! including its ordering rules and return codes, and streams generated
//! frames from a background thread while connected. Discovery returns
//! immediately instead of waiting the requested number of seconds.

use crate::error::SdkReturnCode;
use crate::hand;
use crate::protocol::MAX_NUMBER_OF_SKELETONS_PER_SESSION;
use crate::sdk::{
    CoreSdk, RawSkeletonStreamAccess, RawSkeletonStreamCallback, SdkResult, SkeletonStreamAccess,
    SkeletonStreamCallback, TrackerStreamAccess, TrackerStreamCallback,
};
use crate::types::{
    ChainSetup, ColliderSetup, CoordinateSystem, Host, NodeSetup, Quaternion, RawSkeletonInfo,
    SessionType, SkeletonInfo, SkeletonNode, SkeletonSetupInfo, SkeletonStreamInfo, Timestamp,
    TrackerData, TrackerStreamInfo, Transform,
};
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
enum Discovery {
    #[default]
    Idle,
    Searched(Vec<Host>),
    Counted(Vec<Host>),
}

/// Boundary calls that can be made to fail with
/// [`SimulatedCore::with_failing_call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimCall {
    LookForHosts,
    CreateSkeletonSetup,
    AddNode,
    AddChain,
    AddCollider,
    LoadSkeleton,
}

#[derive(Debug, Default)]
struct PendingSetup {
    nodes: Vec<NodeSetup>,
    chains: Vec<ChainSetup>,
    colliders: Vec<ColliderSetup>,
}

struct State {
    initialized: bool,
    fail_initialize: Option<SdkReturnCode>,
    coordinate_system: Option<(CoordinateSystem, bool)>,
    hosts: Vec<Host>,
    hosts_hidden_for: u32,
    connect_failures: u32,
    failing: HashMap<SimCall, SdkReturnCode>,
    discovery: Discovery,
    connected: Option<Host>,
    setups: HashMap<u32, PendingSetup>,
    skeletons: BTreeMap<u32, Vec<NodeSetup>>,
    next_skeleton_id: u32,
    raw_glove_id: Option<u32>,
    trackers: Vec<TrackerData>,
    skeleton_callback: Option<Arc<SkeletonStreamCallback>>,
    raw_skeleton_callback: Option<Arc<RawSkeletonStreamCallback>>,
    tracker_callback: Option<Arc<TrackerStreamCallback>>,
    tick: u64,
    look_for_hosts_calls: u32,
    connect_attempts: u32,
}

impl Default for State {
    fn default() -> Self {
        Self {
            initialized: false,
            fail_initialize: None,
            coordinate_system: None,
            hosts: Vec::new(),
            hosts_hidden_for: 0,
            connect_failures: 0,
            failing: HashMap::new(),
            discovery: Discovery::Idle,
            connected: None,
            setups: HashMap::new(),
            skeletons: BTreeMap::new(),
            next_skeleton_id: 1,
            raw_glove_id: None,
            trackers: Vec::new(),
            skeleton_callback: None,
            raw_skeleton_callback: None,
            tracker_callback: None,
            tick: 0,
            look_for_hosts_calls: 0,
            connect_attempts: 0,
        }
    }
}

impl State {
    fn injected(&self, call: SimCall) -> SdkResult<()> {
        match self.failing.get(&call) {
            Some(&code) => Err(code),
            None => Ok(()),
        }
    }
}

type Shared = Arc<Mutex<State>>;

fn lock(shared: &Shared) -> MutexGuard<'_, State> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Generator {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Generator {
    fn start(shared: Shared, interval: Duration) -> SdkResult<Generator> {
        let (stop, stopped) = crossbeam_channel::bounded::<()>(1);
        let thread = std::thread::Builder::new()
            .name("coresdk-sim".into())
            .spawn(move || {
                log::debug!("simulated frame generator started");
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => emit_frames(&shared),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("simulated frame generator stopped");
            })
            .map_err(|e| {
                log::error!("failed to spawn simulated frame generator: {}", e);
                SdkReturnCode::InternalError
            })?;
        Ok(Generator {
            stop: Some(stop),
            thread: Some(thread),
        })
    }

    fn stop(&mut self) {
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Simulated Core host. See the module docs.
pub struct SimulatedCore {
    shared: Shared,
    generator: Mutex<Option<Generator>>,
    frame_interval: Duration,
}

impl Default for SimulatedCore {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCore {
    /// A host with no discoverable Core instances.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(State::default())),
            generator: Mutex::new(None),
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }

    pub fn with_host(self, host: Host) -> Self {
        self.state().hosts.push(host);
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Hosts stay invisible to the first `searches` discovery rounds.
    pub fn with_hosts_hidden_for(self, searches: u32) -> Self {
        self.state().hosts_hidden_for = searches;
        self
    }

    /// The first `attempts` connects time out.
    pub fn with_connect_failures(self, attempts: u32) -> Self {
        self.state().connect_failures = attempts;
        self
    }

    /// `initialize` fails with `code`.
    pub fn with_initialize_failure(self, code: SdkReturnCode) -> Self {
        self.state().fail_initialize = Some(code);
        self
    }

    /// Every `call` fails with `code`.
    pub fn with_failing_call(self, call: SimCall, code: SdkReturnCode) -> Self {
        self.state().failing.insert(call, code);
        self
    }

    /// Stream a raw hand skeleton for `glove_id` while connected.
    pub fn with_raw_glove(self, glove_id: u32) -> Self {
        self.state().raw_glove_id = Some(glove_id);
        self
    }

    pub fn with_tracker(self, tracker: TrackerData) -> Self {
        self.state().trackers.push(tracker);
        self
    }

    pub fn look_for_hosts_calls(&self) -> u32 {
        self.state().look_for_hosts_calls
    }

    pub fn connect_attempts(&self) -> u32 {
        self.state().connect_attempts
    }

    pub fn loaded_skeletons(&self) -> Vec<u32> {
        self.state().skeletons.keys().copied().collect()
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    /// Produce one round of frames on the calling thread.
    pub fn emit_frames(&self) {
        emit_frames(&self.shared);
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.shared)
    }

    fn initialized_state(&self) -> SdkResult<MutexGuard<'_, State>> {
        let state = self.state();
        if !state.initialized {
            return Err(SdkReturnCode::SdkNotAvailable);
        }
        Ok(state)
    }

    fn connected_state(&self) -> SdkResult<MutexGuard<'_, State>> {
        let state = self.initialized_state()?;
        if state.connected.is_none() {
            return Err(SdkReturnCode::NotConnected);
        }
        Ok(state)
    }

    fn stop_generator(&self) {
        let generator = self
            .generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        // Joined outside both locks; the generator thread takes the state lock.
        if let Some(mut generator) = generator {
            generator.stop();
        }
    }
}

impl Drop for SimulatedCore {
    fn drop(&mut self) {
        self.stop_generator();
    }
}

fn is_loopback(host: &Host) -> bool {
    host.host_name == "localhost" || host.ip_address.starts_with("127.")
}

fn setup_mut(state: &mut State, setup_index: u32) -> SdkResult<&mut PendingSetup> {
    state
        .setups
        .get_mut(&setup_index)
        .ok_or(SdkReturnCode::InvalidId)
}

impl CoreSdk for SimulatedCore {
    fn initialize(&self, session: SessionType) -> SdkResult<()> {
        let mut state = self.state();
        if let Some(code) = state.fail_initialize {
            return Err(code);
        }
        if state.initialized {
            return Err(SdkReturnCode::FunctionCalledAtWrongTime);
        }
        if session == SessionType::Unknown {
            return Err(SdkReturnCode::InvalidArgument);
        }
        state.initialized = true;
        log::debug!("simulated core initialized for {:?}", session);
        Ok(())
    }

    fn shut_down(&self) -> SdkResult<()> {
        {
            let mut state = self.initialized_state()?;
            let callbacks = (
                state.skeleton_callback.take(),
                state.raw_skeleton_callback.take(),
                state.tracker_callback.take(),
            );
            let defaults = State {
                hosts: std::mem::take(&mut state.hosts),
                raw_glove_id: state.raw_glove_id,
                trackers: std::mem::take(&mut state.trackers),
                failing: std::mem::take(&mut state.failing),
                look_for_hosts_calls: state.look_for_hosts_calls,
                connect_attempts: state.connect_attempts,
                ..State::default()
            };
            *state = defaults;
            drop(state);
            drop(callbacks);
        }
        self.stop_generator();
        log::debug!("simulated core shut down");
        Ok(())
    }

    fn initialize_coordinate_system(
        &self,
        coordinate_system: CoordinateSystem,
        world_space: bool,
    ) -> SdkResult<()> {
        let mut state = self.initialized_state()?;
        if state.connected.is_some() {
            return Err(SdkReturnCode::FunctionCalledAtWrongTime);
        }
        if !coordinate_system.is_valid() {
            return Err(SdkReturnCode::InvalidArgument);
        }
        state.coordinate_system = Some((coordinate_system, world_space));
        Ok(())
    }

    fn look_for_hosts(&self, _wait_seconds: u32, loopback_only: bool) -> SdkResult<()> {
        let mut state = self.initialized_state()?;
        state.look_for_hosts_calls += 1;
        state.injected(SimCall::LookForHosts)?;
        let found = if state.hosts_hidden_for > 0 {
            state.hosts_hidden_for -= 1;
            Vec::new()
        } else {
            state
                .hosts
                .iter()
                .filter(|h| !loopback_only || is_loopback(h))
                .cloned()
                .collect()
        };
        state.discovery = Discovery::Searched(found);
        Ok(())
    }

    fn number_of_hosts_found(&self) -> SdkResult<u32> {
        let mut state = self.initialized_state()?;
        match std::mem::take(&mut state.discovery) {
            Discovery::Searched(found) | Discovery::Counted(found) => {
                let count = found.len() as u32;
                state.discovery = Discovery::Counted(found);
                Ok(count)
            }
            Discovery::Idle => Err(SdkReturnCode::InvalidSequence),
        }
    }

    fn hosts_found(&self, out: &mut [Host]) -> SdkResult<()> {
        let mut state = self.initialized_state()?;
        let found = match &state.discovery {
            Discovery::Counted(found) => found,
            _ => return Err(SdkReturnCode::InvalidSequence),
        };
        if out.len() != found.len() {
            return Err(SdkReturnCode::ArgumentSizeMismatch);
        }
        out.clone_from_slice(found);
        state.discovery = Discovery::Idle;
        Ok(())
    }

    fn connect_to_host(&self, host: &Host) -> SdkResult<()> {
        {
            let mut state = self.initialized_state()?;
            state.connect_attempts += 1;
            if state.coordinate_system.is_none() {
                return Err(SdkReturnCode::NoCoordinateSystemSet);
            }
            if state.connected.is_some() {
                return Err(SdkReturnCode::FunctionCalledAtWrongTime);
            }
            if !state.hosts.contains(host) {
                return Err(SdkReturnCode::NotConnected);
            }
            if state.connect_failures > 0 {
                state.connect_failures -= 1;
                return Err(SdkReturnCode::ConnectionTimeout);
            }
            state.connected = Some(host.clone());
        }
        let generator = Generator::start(self.shared.clone(), self.frame_interval)?;
        *self
            .generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(generator);
        log::info!("simulated core connected to {}", host.host_name);
        Ok(())
    }

    fn disconnect(&self) -> SdkResult<()> {
        {
            let mut state = self.connected_state()?;
            state.connected = None;
            state.setups.clear();
            state.skeletons.clear();
        }
        self.stop_generator();
        Ok(())
    }

    fn is_connected(&self) -> SdkResult<bool> {
        Ok(self.initialized_state()?.connected.is_some())
    }

    fn register_skeleton_stream(&self, callback: SkeletonStreamCallback) -> SdkResult<()> {
        let mut state = self.initialized_state()?;
        if state.connected.is_some() {
            return Err(SdkReturnCode::FunctionCalledAtWrongTime);
        }
        state.skeleton_callback = Some(Arc::new(callback));
        Ok(())
    }

    fn register_raw_skeleton_stream(&self, callback: RawSkeletonStreamCallback) -> SdkResult<()> {
        let mut state = self.initialized_state()?;
        if state.connected.is_some() {
            return Err(SdkReturnCode::FunctionCalledAtWrongTime);
        }
        state.raw_skeleton_callback = Some(Arc::new(callback));
        Ok(())
    }

    fn register_tracker_stream(&self, callback: TrackerStreamCallback) -> SdkResult<()> {
        let mut state = self.initialized_state()?;
        if state.connected.is_some() {
            return Err(SdkReturnCode::FunctionCalledAtWrongTime);
        }
        state.tracker_callback = Some(Arc::new(callback));
        Ok(())
    }

    fn create_skeleton_setup(&self, _info: &SkeletonSetupInfo) -> SdkResult<u32> {
        let mut state = self.connected_state()?;
        state.injected(SimCall::CreateSkeletonSetup)?;
        let index = (0..MAX_NUMBER_OF_SKELETONS_PER_SESSION as u32)
            .find(|i| !state.setups.contains_key(i))
            .ok_or(SdkReturnCode::MemoryError)?;
        state.setups.insert(index, PendingSetup::default());
        Ok(index)
    }

    fn add_node_to_setup(&self, setup_index: u32, node: &NodeSetup) -> SdkResult<()> {
        let mut state = self.connected_state()?;
        state.injected(SimCall::AddNode)?;
        let setup = setup_mut(&mut state, setup_index)?;
        if setup.nodes.iter().any(|n| n.id == node.id) {
            return Err(SdkReturnCode::InvalidArgument);
        }
        setup.nodes.push(node.clone());
        Ok(())
    }

    fn add_chain_to_setup(&self, setup_index: u32, chain: &ChainSetup) -> SdkResult<()> {
        let mut state = self.connected_state()?;
        state.injected(SimCall::AddChain)?;
        let setup = setup_mut(&mut state, setup_index)?;
        if setup.chains.iter().any(|c| c.id == chain.id) {
            return Err(SdkReturnCode::InvalidArgument);
        }
        setup.chains.push(chain.clone());
        Ok(())
    }

    fn add_collider_to_setup(&self, setup_index: u32, collider: &ColliderSetup) -> SdkResult<()> {
        let mut state = self.connected_state()?;
        state.injected(SimCall::AddCollider)?;
        setup_mut(&mut state, setup_index)?.colliders.push(*collider);
        Ok(())
    }

    fn overwrite_node_in_setup(&self, setup_index: u32, node: &NodeSetup) -> SdkResult<()> {
        let mut state = self.connected_state()?;
        let setup = setup_mut(&mut state, setup_index)?;
        let slot = setup
            .nodes
            .iter_mut()
            .find(|n| n.id == node.id)
            .ok_or(SdkReturnCode::InvalidId)?;
        *slot = node.clone();
        Ok(())
    }

    fn overwrite_chain_in_setup(&self, setup_index: u32, chain: &ChainSetup) -> SdkResult<()> {
        let mut state = self.connected_state()?;
        let setup = setup_mut(&mut state, setup_index)?;
        let slot = setup
            .chains
            .iter_mut()
            .find(|c| c.id == chain.id)
            .ok_or(SdkReturnCode::InvalidId)?;
        *slot = chain.clone();
        Ok(())
    }

    fn load_skeleton(&self, setup_index: u32) -> SdkResult<u32> {
        let mut state = self.connected_state()?;
        state.injected(SimCall::LoadSkeleton)?;
        let setup = setup_mut(&mut state, setup_index)?;
        if setup.nodes.is_empty() || setup.chains.is_empty() {
            return Err(SdkReturnCode::InvalidArgument);
        }
        let nodes = std::mem::take(&mut setup.nodes);
        state.setups.remove(&setup_index);
        let id = state.next_skeleton_id;
        state.next_skeleton_id += 1;
        state.skeletons.insert(id, nodes);
        Ok(id)
    }

    fn unload_skeleton(&self, skeleton_id: u32) -> SdkResult<()> {
        let mut state = self.connected_state()?;
        state
            .skeletons
            .remove(&skeleton_id)
            .map(|_| ())
            .ok_or(SdkReturnCode::SkeletonNotLoaded)
    }

    fn clear_skeleton_setup(&self, setup_index: u32) -> SdkResult<()> {
        let mut state = self.connected_state()?;
        state
            .setups
            .remove(&setup_index)
            .map(|_| ())
            .ok_or(SdkReturnCode::InvalidId)
    }
}

// -- Frame generation --

struct Snapshot<I> {
    skeletons: Vec<(I, Vec<SkeletonNode>)>,
}

impl<I: Copy> Snapshot<I> {
    fn info(&self, index: u32) -> SdkResult<I> {
        self.skeletons
            .get(index as usize)
            .map(|(info, _)| *info)
            .ok_or(SdkReturnCode::InvalidId)
    }

    fn data(&self, index: u32, out: &mut [SkeletonNode]) -> SdkResult<()> {
        let (_, nodes) = self
            .skeletons
            .get(index as usize)
            .ok_or(SdkReturnCode::InvalidId)?;
        if out.len() != nodes.len() {
            return Err(SdkReturnCode::ArgumentSizeMismatch);
        }
        out.copy_from_slice(nodes);
        Ok(())
    }
}

impl SkeletonStreamAccess for Snapshot<SkeletonInfo> {
    fn skeleton_info(&self, index: u32) -> SdkResult<SkeletonInfo> {
        self.info(index)
    }

    fn skeleton_data(&self, index: u32, nodes: &mut [SkeletonNode]) -> SdkResult<()> {
        self.data(index, nodes)
    }
}

impl RawSkeletonStreamAccess for Snapshot<RawSkeletonInfo> {
    fn raw_skeleton_info(&self, index: u32) -> SdkResult<RawSkeletonInfo> {
        self.info(index)
    }

    fn raw_skeleton_data(&self, index: u32, nodes: &mut [SkeletonNode]) -> SdkResult<()> {
        self.data(index, nodes)
    }
}

struct TrackerSnapshot(Vec<TrackerData>);

impl TrackerStreamAccess for TrackerSnapshot {
    fn tracker_data(&self, index: u32) -> SdkResult<TrackerData> {
        self.0
            .get(index as usize)
            .cloned()
            .ok_or(SdkReturnCode::InvalidId)
    }
}

/// Curl every non-root node about its local x axis by an angle that
/// oscillates with the tick.
fn animate(nodes: &[NodeSetup], tick: u64) -> Vec<SkeletonNode> {
    let angle = 0.4 * (1.0 - (tick as f32 * 0.1).cos());
    let curl = Quaternion::new((angle / 2.0).cos(), (angle / 2.0).sin(), 0.0, 0.0);
    nodes
        .iter()
        .map(|node| SkeletonNode {
            id: node.id,
            transform: Transform {
                rotation: if node.is_root() {
                    node.transform.rotation
                } else {
                    curl
                },
                ..node.transform
            },
        })
        .collect()
}

fn emit_frames(shared: &Shared) {
    let (skeleton, raw, trackers) = {
        let mut state = lock(shared);
        if state.connected.is_none() {
            return;
        }
        state.tick += 1;
        let tick = state.tick;
        let publish_time = Timestamp(tick);

        let skeleton = state.skeleton_callback.clone().and_then(|callback| {
            if state.skeletons.is_empty() {
                return None;
            }
            let skeletons = state
                .skeletons
                .iter()
                .map(|(&id, nodes)| {
                    let info = SkeletonInfo {
                        id,
                        nodes_count: nodes.len() as u32,
                        publish_time,
                    };
                    (info, animate(nodes, tick))
                })
                .collect();
            Some((callback, Snapshot { skeletons }))
        });

        let raw = match (state.raw_skeleton_callback.clone(), state.raw_glove_id) {
            (Some(callback), Some(glove_id)) => {
                let nodes = animate(&hand::nodes(), tick);
                let info = RawSkeletonInfo {
                    glove_id,
                    nodes_count: nodes.len() as u32,
                    publish_time,
                };
                Some((callback, Snapshot { skeletons: vec![(info, nodes)] }))
            }
            _ => None,
        };

        let trackers = match state.tracker_callback.clone() {
            Some(callback) if !state.trackers.is_empty() => {
                let trackers: Vec<TrackerData> = state
                    .trackers
                    .iter()
                    .map(|t| TrackerData {
                        last_update_time: publish_time,
                        ..t.clone()
                    })
                    .collect();
                Some((callback, TrackerSnapshot(trackers)))
            }
            _ => None,
        };

        (skeleton, raw, trackers)
    };

    if let Some((callback, snapshot)) = skeleton {
        let info = SkeletonStreamInfo {
            publish_time: snapshot.skeletons[0].0.publish_time,
            skeletons_count: snapshot.skeletons.len() as u32,
        };
        callback(&info, &snapshot);
    }
    if let Some((callback, snapshot)) = raw {
        let info = SkeletonStreamInfo {
            publish_time: snapshot.skeletons[0].0.publish_time,
            skeletons_count: snapshot.skeletons.len() as u32,
        };
        callback(&info, &snapshot);
    }
    if let Some((callback, snapshot)) = trackers {
        let info = TrackerStreamInfo {
            publish_time: snapshot.0[0].last_update_time,
            tracker_count: snapshot.0.len() as u32,
        };
        callback(&info, &snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn host() -> Host {
        Host::new("studio", "10.0.0.5")
    }

    fn initialized(core: &SimulatedCore) {
        core.initialize(SessionType::CoreSdk).unwrap();
        core.initialize_coordinate_system(CoordinateSystem::unreal(), false)
            .unwrap();
    }

    fn connected() -> SimulatedCore {
        // Frames are emitted by hand in these tests.
        let core = SimulatedCore::new()
            .with_host(host())
            .with_frame_interval(Duration::from_secs(3600));
        initialized(&core);
        core.connect_to_host(&host()).unwrap();
        core
    }

    #[test]
    fn test_calls_before_initialize() {
        let core = SimulatedCore::new();
        assert_eq!(core.look_for_hosts(1, false), Err(SdkReturnCode::SdkNotAvailable));
        assert_eq!(core.shut_down(), Err(SdkReturnCode::SdkNotAvailable));
        core.initialize(SessionType::CoreSdk).unwrap();
        assert_eq!(
            core.initialize(SessionType::CoreSdk),
            Err(SdkReturnCode::FunctionCalledAtWrongTime)
        );
    }

    #[test]
    fn test_discovery_order() {
        let core = SimulatedCore::new().with_host(host());
        initialized(&core);
        assert_eq!(core.number_of_hosts_found(), Err(SdkReturnCode::InvalidSequence));
        let mut none: [Host; 0] = [];
        assert_eq!(core.hosts_found(&mut none), Err(SdkReturnCode::InvalidSequence));

        core.look_for_hosts(1, false).unwrap();
        assert_eq!(core.number_of_hosts_found(), Ok(1));
        let mut too_many = vec![Host::default(); 2];
        assert_eq!(
            core.hosts_found(&mut too_many),
            Err(SdkReturnCode::ArgumentSizeMismatch)
        );
        let mut hosts = vec![Host::default(); 1];
        core.hosts_found(&mut hosts).unwrap();
        assert_eq!(hosts[0], host());
    }

    #[test]
    fn test_loopback_only_filters_hosts() {
        let core = SimulatedCore::new()
            .with_host(host())
            .with_host(Host::new("localhost", "127.0.0.1"));
        initialized(&core);
        core.look_for_hosts(1, true).unwrap();
        assert_eq!(core.number_of_hosts_found(), Ok(1));
    }

    #[test]
    fn test_connect_requires_coordinate_system() {
        let core = SimulatedCore::new().with_host(host());
        core.initialize(SessionType::CoreSdk).unwrap();
        assert_eq!(
            core.connect_to_host(&host()),
            Err(SdkReturnCode::NoCoordinateSystemSet)
        );
        core.initialize_coordinate_system(CoordinateSystem::unreal(), false)
            .unwrap();
        core.connect_to_host(&host()).unwrap();
        assert_eq!(core.is_connected(), Ok(true));
        core.shut_down().unwrap();
    }

    #[test]
    fn test_callbacks_rejected_after_connect() {
        let core = connected();
        assert_eq!(
            core.register_tracker_stream(Box::new(|_, _| {})),
            Err(SdkReturnCode::FunctionCalledAtWrongTime)
        );
    }

    #[test]
    fn test_load_and_unload() {
        let core = connected();
        let index = core
            .create_skeleton_setup(&hand::setup_info(crate::types::Side::Left, 0))
            .unwrap();
        assert_eq!(core.load_skeleton(index), Err(SdkReturnCode::InvalidArgument));
        for node in hand::nodes() {
            core.add_node_to_setup(index, &node).unwrap();
        }
        for chain in hand::chains(crate::types::Side::Left) {
            core.add_chain_to_setup(index, &chain).unwrap();
        }
        let id = core.load_skeleton(index).unwrap();
        assert_eq!(id, 1);
        assert_eq!(core.load_skeleton(index), Err(SdkReturnCode::InvalidId));
        assert_eq!(core.loaded_skeletons(), vec![1]);

        core.unload_skeleton(id).unwrap();
        assert_eq!(core.unload_skeleton(id), Err(SdkReturnCode::SkeletonNotLoaded));
    }

    #[test]
    fn test_emitted_frames_reach_callbacks() {
        let core = SimulatedCore::new()
            .with_host(host())
            .with_raw_glove(7)
            .with_frame_interval(Duration::from_secs(3600));
        initialized(&core);

        let raw_frames = Arc::new(AtomicU32::new(0));
        let counter = raw_frames.clone();
        core.register_raw_skeleton_stream(Box::new(move |info, access| {
            let raw = access.raw_skeleton_info(0).unwrap();
            assert_eq!(raw.glove_id, 7);
            let mut nodes = vec![SkeletonNode::default(); raw.nodes_count as usize];
            access.raw_skeleton_data(0, &mut nodes).unwrap();
            let mut short = vec![SkeletonNode::default(); 3];
            assert_eq!(
                access.raw_skeleton_data(0, &mut short),
                Err(SdkReturnCode::ArgumentSizeMismatch)
            );
            assert_eq!(info.skeletons_count, 1);
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

        core.emit_frames();
        assert_eq!(raw_frames.load(Ordering::SeqCst), 0);

        core.connect_to_host(&host()).unwrap();
        core.emit_frames();
        core.emit_frames();
        assert_eq!(raw_frames.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disconnect_drops_skeletons() {
        let core = connected();
        let index = core
            .create_skeleton_setup(&hand::setup_info(crate::types::Side::Right, 0))
            .unwrap();
        core.add_node_to_setup(index, &hand::nodes()[0]).unwrap();
        core.add_chain_to_setup(index, &hand::chains(crate::types::Side::Right)[0])
            .unwrap();
        let id = core.load_skeleton(index).unwrap();
        core.disconnect().unwrap();
        assert!(core.loaded_skeletons().is_empty());
        assert_eq!(core.unload_skeleton(id), Err(SdkReturnCode::NotConnected));
    }
}
