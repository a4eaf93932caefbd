//! Client lifecycle: initialize, connect, load skeletons, stream, shut down.

use crate::buffer::FrameConsumer;
use crate::config::{ClientConfig, SetupFailurePolicy};
use crate::hand;
use crate::platform::{Platform, ShutdownRequest};
use crate::protocol::MAX_NUMBER_OF_HOSTS;
use crate::sdk::CoreSdk;
use crate::skeleton::{SetupHandle, SetupRegistry, SkeletonId};
use crate::stream::{
    stream_buffers, RawSkeletonFrame, SkeletonFrame, StreamConsumers, StreamPublishers,
    TrackerFrame,
};
use crate::types::{
    ChainSetup, ColliderSetup, Host, NodeSetup, Side, SkeletonSetupInfo,
};
use crate::{ClientError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initialized,
    /// Callbacks are registered; looking for a host.
    Connecting,
    Connected,
    Streaming,
    ShuttingDown,
    Terminated,
}

/// Clonable handle that ends `connect` and `run` from another thread.
///
/// Stopping is final: a stopped client refuses to connect or stream again
/// and can only be shut down.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    wake: Sender<ShutdownRequest>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        // A full channel already holds a wakeup.
        let _ = self.wake.try_send(ShutdownRequest::Stop);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub struct Client<S: CoreSdk> {
    sdk: S,
    config: ClientConfig,
    state: ClientState,
    sdk_initialized: bool,
    platform: Option<Platform>,
    registry: SetupRegistry,
    publishers: StreamPublishers,
    consumers: StreamConsumers,
    host: Option<Host>,
    hand_skeleton: Option<SkeletonId>,
    running: Arc<AtomicBool>,
    shutdown_tx: Sender<ShutdownRequest>,
    shutdown_rx: Receiver<ShutdownRequest>,
}

impl<S: CoreSdk> Client<S> {
    pub fn new(sdk: S, config: ClientConfig) -> Self {
        let (publishers, consumers) = stream_buffers();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        Self {
            sdk,
            config,
            state: ClientState::Uninitialized,
            sdk_initialized: false,
            platform: None,
            registry: SetupRegistry::new(),
            publishers,
            consumers,
            host: None,
            hand_skeleton: None,
            running: Arc::new(AtomicBool::new(true)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    pub fn host(&self) -> Option<&Host> {
        self.host.as_ref()
    }

    pub fn hand_skeleton(&self) -> Option<SkeletonId> {
        self.hand_skeleton
    }

    pub fn documents_dir(&self) -> Option<&PathBuf> {
        self.platform.as_ref().and_then(Platform::documents_dir)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
            wake: self.shutdown_tx.clone(),
        }
    }

    pub fn is_connected(&self) -> Result<bool> {
        self.sdk
            .is_connected()
            .map_err(ClientError::sdk("query connection"))
    }

    fn expect_state(&self, allowed: &[ClientState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ClientError::InvalidState(format!(
                "cannot {} while {:?}",
                operation, self.state
            )))
        }
    }

    /// Platform setup, SDK initialization and coordinate system.
    ///
    /// On failure everything done so far is undone and the client stays
    /// `Uninitialized`.
    pub fn initialize(&mut self) -> Result<()> {
        self.expect_state(&[ClientState::Uninitialized], "initialize")?;
        log::info!("initializing client");

        let platform = Platform::initialize(
            self.config.install_signal_handlers,
            self.shutdown_tx.clone(),
        )?;

        self.sdk
            .initialize(self.config.session_type)
            .map_err(ClientError::FailedToInitialize)?;

        if let Err(code) = self
            .sdk
            .initialize_coordinate_system(self.config.coordinate_system, self.config.world_space)
        {
            if let Err(shutdown) = self.sdk.shut_down() {
                log::warn!("shutdown after failed initialization: {}", shutdown);
            }
            return Err(ClientError::Sdk {
                call: "initialize coordinate system",
                code,
            });
        }

        self.platform = Some(platform);
        self.sdk_initialized = true;
        self.state = ClientState::Initialized;
        log::info!("client initialized");
        Ok(())
    }

    /// Register the skeleton, raw skeleton and tracker callbacks. Happens
    /// once, before the first connect.
    pub fn register_callbacks(&mut self) -> Result<()> {
        self.expect_state(&[ClientState::Initialized], "register callbacks")?;
        self.publishers.register(&self.sdk)?;
        self.state = ClientState::Connecting;
        Ok(())
    }

    /// Look for hosts and connect to the first one found, retrying transient
    /// failures until a connection is made or a shutdown is requested.
    ///
    /// Returns `Cancelled` without calling the SDK once the client was stopped.
    pub fn connect(&mut self) -> Result<Host> {
        if self.state == ClientState::Initialized {
            self.register_callbacks()?;
        }
        self.expect_state(&[ClientState::Connecting], "connect")?;

        loop {
            if !self.running.load(Ordering::SeqCst) {
                return Err(ClientError::Cancelled);
            }
            match self.try_connect() {
                Ok(host) => {
                    log::info!("connected to {} ({})", host.host_name, host.ip_address);
                    self.host = Some(host.clone());
                    self.state = ClientState::Connected;
                    return Ok(host);
                }
                Err(e) if e.is_transient() => {
                    log::warn!(
                        "{}; retrying in {} ms",
                        e,
                        self.config.connect_retry_delay.as_millis()
                    );
                    self.wait(self.config.connect_retry_delay)?;
                }
                Err(e) => {
                    log::error!("giving up on connecting: {}", e);
                    return Err(e);
                }
            }
        }
    }

    fn try_connect(&self) -> Result<Host> {
        self.sdk
            .look_for_hosts(self.config.host_search_seconds, self.config.loopback_only)
            .map_err(ClientError::sdk("look for hosts"))?;
        let count = self
            .sdk
            .number_of_hosts_found()
            .map_err(ClientError::sdk("get number of hosts found"))? as usize;
        if count == 0 {
            return Err(ClientError::FailedToFindHosts(
                "no Core hosts answered".into(),
            ));
        }
        if count > MAX_NUMBER_OF_HOSTS {
            return Err(ClientError::ResourceExhausted {
                what: "hosts found",
                max: MAX_NUMBER_OF_HOSTS,
            });
        }

        let mut hosts = vec![Host::default(); count];
        self.sdk
            .hosts_found(&mut hosts)
            .map_err(ClientError::sdk("get hosts found"))?;
        log::debug!("found {} host(s)", count);

        let host = hosts.swap_remove(0);
        self.sdk
            .connect_to_host(&host)
            .map_err(ClientError::FailedToConnect)?;
        Ok(host)
    }

    /// Sleep for `delay` unless a shutdown request arrives first.
    fn wait(&self, delay: Duration) -> Result<()> {
        match self.shutdown_rx.recv_timeout(delay) {
            Ok(request) => {
                log::info!("shutdown requested ({:?})", request);
                self.running.store(false, Ordering::SeqCst);
                Err(ClientError::Cancelled)
            }
            Err(RecvTimeoutError::Timeout) => Ok(()),
            // The client holds a sender, so this does not happen.
            Err(RecvTimeoutError::Disconnected) => Err(ClientError::Cancelled),
        }
    }

    fn expect_connected(&self, operation: &str) -> Result<()> {
        self.expect_state(
            &[ClientState::Connected, ClientState::Streaming],
            operation,
        )
    }

    pub fn begin_setup(&mut self, info: SkeletonSetupInfo) -> Result<SetupHandle> {
        self.expect_connected("begin a skeleton setup")?;
        self.registry.begin(&self.sdk, info)
    }

    pub fn add_node(&mut self, handle: SetupHandle, node: NodeSetup) -> Result<()> {
        self.expect_connected("add a node")?;
        self.registry.add_node(&self.sdk, handle, node)
    }

    pub fn add_chain(&mut self, handle: SetupHandle, chain: ChainSetup) -> Result<()> {
        self.expect_connected("add a chain")?;
        self.registry.add_chain(&self.sdk, handle, chain)
    }

    pub fn add_collider(&mut self, handle: SetupHandle, collider: ColliderSetup) -> Result<()> {
        self.expect_connected("add a collider")?;
        self.registry.add_collider(&self.sdk, handle, collider)
    }

    pub fn overwrite_node(&mut self, handle: SetupHandle, node: NodeSetup) -> Result<()> {
        self.expect_connected("overwrite a node")?;
        self.registry.overwrite_node(&self.sdk, handle, node)
    }

    pub fn overwrite_chain(&mut self, handle: SetupHandle, chain: ChainSetup) -> Result<()> {
        self.expect_connected("overwrite a chain")?;
        self.registry.overwrite_chain(&self.sdk, handle, chain)
    }

    pub fn load(&mut self, handle: SetupHandle) -> Result<SkeletonId> {
        self.expect_connected("load a skeleton")?;
        self.registry.load(&self.sdk, handle)
    }

    pub fn clear_setup(&mut self, handle: SetupHandle) -> Result<()> {
        self.expect_connected("clear a skeleton setup")?;
        self.registry.clear(&self.sdk, handle)
    }

    pub fn unload(&mut self, id: SkeletonId) -> Result<()> {
        self.expect_connected("unload a skeleton")?;
        self.registry.unload(&self.sdk, id)?;
        if self.hand_skeleton == Some(id) {
            self.hand_skeleton = None;
        }
        Ok(())
    }

    /// Build and load the example hand skeleton. A setup that fails halfway
    /// is cleared again.
    pub fn load_hand_skeleton(&mut self, side: Side, user_index: u32) -> Result<SkeletonId> {
        let handle = self.begin_setup(hand::setup_info(side, user_index))?;
        let result = self.fill_hand_setup(handle, side);
        match result {
            Ok(id) => Ok(id),
            Err(e) => {
                if self.registry.setup(handle).is_some() {
                    if let Err(clear) = self.registry.clear(&self.sdk, handle) {
                        log::warn!("could not clear failed hand setup: {}", clear);
                    }
                }
                Err(e)
            }
        }
    }

    fn fill_hand_setup(&mut self, handle: SetupHandle, side: Side) -> Result<SkeletonId> {
        for node in hand::nodes() {
            self.registry.add_node(&self.sdk, handle, node)?;
        }
        for chain in hand::chains(side) {
            self.registry.add_chain(&self.sdk, handle, chain)?;
        }
        self.registry.load(&self.sdk, handle)
    }

    /// Load the hand skeleton for the configured user, handling a failure
    /// according to the configured [`SetupFailurePolicy`], and start streaming.
    pub fn setup_skeletons(&mut self) -> Result<()> {
        self.expect_state(&[ClientState::Connected], "set up skeletons")?;
        let side = self.config.hand_side;
        let user_index = self.config.user_index;

        let attempts = match self.config.setup_failure_policy {
            SetupFailurePolicy::Retry { attempts } => attempts.max(1),
            _ => 1,
        };
        let mut outcome = Err(ClientError::NotReady("hand skeleton not attempted".into()));
        for attempt in 1..=attempts {
            outcome = self.load_hand_skeleton(side, user_index);
            match &outcome {
                Ok(_) => break,
                Err(e) if attempt < attempts => {
                    log::warn!("loading hand skeleton failed (attempt {}): {}", attempt, e)
                }
                Err(_) => {}
            }
        }

        match outcome {
            Ok(id) => {
                log::info!("hand skeleton loaded as {}", id.0);
                self.hand_skeleton = Some(id);
            }
            Err(e) => match self.config.setup_failure_policy {
                SetupFailurePolicy::Ignore => {
                    log::warn!("loading hand skeleton failed, streaming without it: {}", e)
                }
                SetupFailurePolicy::Abort | SetupFailurePolicy::Retry { .. } => {
                    log::error!("loading hand skeleton failed: {}", e);
                    return Err(e);
                }
            },
        }
        self.state = ClientState::Streaming;
        Ok(())
    }

    /// Adopt the newest skeleton frame, if one arrived since the last call.
    pub fn run_once(&mut self) -> Option<&SkeletonFrame> {
        self.consumers.skeletons.try_adopt()
    }

    /// Poll the skeleton stream every `poll_interval` and hand each new frame
    /// to `on_frame`, until stopped or a shutdown is requested. `Cancelled`
    /// if the client was already stopped.
    pub fn run<F>(&mut self, mut on_frame: F) -> Result<()>
    where
        F: FnMut(&SkeletonFrame),
    {
        self.expect_state(&[ClientState::Streaming], "run")?;
        if !self.running.load(Ordering::SeqCst) {
            return Err(ClientError::Cancelled);
        }
        log::info!("streaming");
        while self.running.load(Ordering::SeqCst) {
            if let Some(frame) = self.consumers.skeletons.try_adopt() {
                on_frame(frame);
            }
            match self.shutdown_rx.recv_timeout(self.config.poll_interval) {
                Ok(request) => {
                    log::info!("shutdown requested ({:?})", request);
                    self.running.store(false, Ordering::SeqCst);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::info!(
            "stopped streaming after {} frame(s), {} superseded",
            self.consumers.skeletons.adopted_frames(),
            self.consumers.skeletons.dropped_frames()
        );
        Ok(())
    }

    pub fn skeletons(&mut self) -> &mut FrameConsumer<SkeletonFrame> {
        &mut self.consumers.skeletons
    }

    pub fn raw_skeletons(&mut self) -> &mut FrameConsumer<RawSkeletonFrame> {
        &mut self.consumers.raw_skeletons
    }

    pub fn trackers(&mut self) -> &mut FrameConsumer<TrackerFrame> {
        &mut self.consumers.trackers
    }

    /// Shut down the SDK and release the platform, attempting both even when
    /// the first fails. Returns the first failure.
    pub fn shut_down(&mut self) -> Result<()> {
        if self.state == ClientState::Terminated {
            return Ok(());
        }
        self.state = ClientState::ShuttingDown;
        self.running.store(false, Ordering::SeqCst);
        log::info!("shutting down");

        let sdk_result = if self.sdk_initialized {
            self.sdk_initialized = false;
            self.sdk.shut_down().map_err(ClientError::FailedToShutDownSdk)
        } else {
            Ok(())
        };
        self.registry.reset();
        self.hand_skeleton = None;
        self.host = None;

        let platform_result = match self.platform.take() {
            Some(platform) => platform.shut_down(),
            None => Ok(()),
        };

        self.state = ClientState::Terminated;
        sdk_result.and(platform_result)
    }
}

impl<S: CoreSdk> Drop for Client<S> {
    fn drop(&mut self) {
        if self.state == ClientState::Uninitialized || self.state == ClientState::Terminated {
            return;
        }
        if let Err(e) = self.shut_down() {
            log::error!("shutdown on drop failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkReturnCode;
    use crate::sim::{SimCall, SimulatedCore};
    use crate::types::{ChainType, SkeletonType};
    use std::thread;

    fn test_config() -> ClientConfig {
        ClientConfig {
            install_signal_handlers: false,
            connect_retry_delay: Duration::from_millis(5),
            poll_interval: Duration::from_millis(2),
            ..ClientConfig::default()
        }
    }

    fn studio() -> Host {
        Host::new("studio", "10.0.0.5")
    }

    fn connected_client(sdk: SimulatedCore) -> Client<SimulatedCore> {
        let mut client = Client::new(sdk, test_config());
        client.initialize().unwrap();
        client.connect().unwrap();
        client
    }

    #[test]
    fn test_initialize_failure_stays_uninitialized() {
        let sdk = SimulatedCore::new().with_initialize_failure(SdkReturnCode::SdkNotAvailable);
        let mut client = Client::new(sdk, test_config());
        assert!(matches!(
            client.initialize(),
            Err(ClientError::FailedToInitialize(SdkReturnCode::SdkNotAvailable))
        ));
        assert_eq!(client.state(), ClientState::Uninitialized);
    }

    #[test]
    fn test_setup_before_connect_is_invalid_state() {
        let mut client = Client::new(SimulatedCore::new(), test_config());
        client.initialize().unwrap();
        assert!(matches!(
            client.begin_setup(hand::setup_info(Side::Left, 0)),
            Err(ClientError::InvalidState(_))
        ));
    }

    #[test]
    fn test_connect_retries_until_host_appears() {
        let sdk = SimulatedCore::new()
            .with_host(studio())
            .with_hosts_hidden_for(3)
            .with_connect_failures(1);
        let client = connected_client(sdk);
        assert_eq!(client.state(), ClientState::Connected);
        // Three empty rounds, one timed-out connect, then success.
        assert_eq!(client.sdk().look_for_hosts_calls(), 5);
        assert_eq!(client.sdk().connect_attempts(), 2);
        assert_eq!(client.host(), Some(&studio()));
    }

    #[test]
    fn test_zero_hosts_never_connects_and_stop_cancels() {
        let mut client = Client::new(SimulatedCore::new(), test_config());
        client.initialize().unwrap();
        let stop = client.stop_handle();

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stop.stop();
        });
        assert!(matches!(client.connect(), Err(ClientError::Cancelled)));
        stopper.join().unwrap();

        assert!(client.sdk().look_for_hosts_calls() > 1);
        assert_eq!(client.sdk().connect_attempts(), 0);
        assert_eq!(client.state(), ClientState::Connecting);
        assert!(!client.is_connected().unwrap());
    }

    #[test]
    fn test_reference_error_during_discovery_is_not_retried() {
        let sdk = SimulatedCore::new()
            .with_host(studio())
            .with_failing_call(SimCall::LookForHosts, SdkReturnCode::InvalidArgument);
        let mut client = Client::new(sdk, test_config());
        client.initialize().unwrap();
        assert!(matches!(
            client.connect(),
            Err(ClientError::Sdk {
                code: SdkReturnCode::InvalidArgument,
                ..
            })
        ));
        assert_eq!(client.sdk().look_for_hosts_calls(), 1);
        assert_eq!(client.state(), ClientState::Connecting);
    }

    #[test]
    fn test_stopped_client_stays_stopped() {
        let mut client = Client::new(SimulatedCore::new().with_host(studio()), test_config());
        client.initialize().unwrap();
        let stop = client.stop_handle();
        stop.stop();
        assert!(!stop.is_running());

        assert!(matches!(client.connect(), Err(ClientError::Cancelled)));
        assert!(matches!(client.connect(), Err(ClientError::Cancelled)));
        assert_eq!(client.sdk().look_for_hosts_calls(), 0);
        client.shut_down().unwrap();
    }

    #[test]
    fn test_run_after_stop_is_cancelled() {
        let mut client = connected_client(SimulatedCore::new().with_host(studio()));
        client.setup_skeletons().unwrap();
        client.stop_handle().stop();
        let mut frames = 0;
        assert!(matches!(
            client.run(|_| frames += 1),
            Err(ClientError::Cancelled)
        ));
        assert_eq!(frames, 0);
    }

    #[test]
    fn test_hand_load_and_unload() {
        let mut client = connected_client(SimulatedCore::new().with_host(studio()));
        let handle = client.begin_setup(hand::setup_info(Side::Left, 0)).unwrap();
        for node in hand::nodes() {
            client.add_node(handle, node).unwrap();
        }
        for chain in hand::chains(Side::Left) {
            client.add_chain(handle, chain).unwrap();
        }
        let id = client.load(handle).unwrap();
        assert_ne!(id.0, 0);
        assert_ne!(id.0, handle.0);

        // The handle is gone once loaded.
        assert!(matches!(client.load(handle), Err(ClientError::InvalidReference(_))));

        client.unload(id).unwrap();
        assert!(matches!(
            client.unload(id),
            Err(ClientError::SkeletonNotLoaded(n)) if n == id.0
        ));
    }

    #[test]
    fn test_load_incomplete_setup_is_not_ready() {
        let mut client = connected_client(SimulatedCore::new().with_host(studio()));
        let handle = client.begin_setup(hand::setup_info(Side::Left, 0)).unwrap();
        assert!(matches!(client.load(handle), Err(ClientError::NotReady(_))));

        for node in hand::nodes() {
            client.add_node(handle, node).unwrap();
        }
        // Finger chains without their hand chain.
        for chain in hand::chains(Side::Left).into_iter().skip(1) {
            client.add_chain(handle, chain).unwrap();
        }
        assert!(matches!(client.load(handle), Err(ClientError::NotReady(_))));
        assert!(client.sdk().loaded_skeletons().is_empty());

        client.clear_setup(handle).unwrap();
        assert!(matches!(
            client.add_node(handle, hand::nodes().remove(0)),
            Err(ClientError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_setups_in_flight_are_capped() {
        let mut client = connected_client(SimulatedCore::new().with_host(studio()));
        let info = SkeletonSetupInfo {
            name: "Body".into(),
            skeleton_type: SkeletonType::Body,
            ..SkeletonSetupInfo::default()
        };
        for _ in 0..32 {
            client.begin_setup(info.clone()).unwrap();
        }
        assert!(matches!(
            client.begin_setup(info),
            Err(ClientError::ResourceExhausted { max: 32, .. })
        ));
    }

    #[test]
    fn test_unknown_chain_node_rejected_locally() {
        let mut client = connected_client(SimulatedCore::new().with_host(studio()));
        let handle = client.begin_setup(hand::setup_info(Side::Left, 0)).unwrap();
        client.add_node(handle, hand::nodes().remove(0)).unwrap();
        let mut chain = hand::chains(Side::Left).remove(1);
        assert_eq!(chain.chain_type, ChainType::FingerThumb);
        chain.node_ids = vec![0, 99];
        assert!(matches!(
            client.add_chain(handle, chain),
            Err(ClientError::InvalidReference(_))
        ));
        assert!(client.registry.setup(handle).unwrap().chains().is_empty());
    }

    #[test]
    fn test_stream_until_stopped() {
        let sdk = SimulatedCore::new()
            .with_host(studio())
            .with_frame_interval(Duration::from_millis(1));
        let mut client = connected_client(sdk);
        client.setup_skeletons().unwrap();
        assert_eq!(client.state(), ClientState::Streaming);
        let hand_id = client.hand_skeleton().unwrap();

        let stop = client.stop_handle();
        let mut frames = 0;
        client
            .run(|frame| {
                let skeleton = frame.skeleton(hand_id.0).unwrap();
                assert_eq!(skeleton.nodes.len(), hand::HAND_NODE_COUNT);
                frames += 1;
                if frames == 3 {
                    stop.stop();
                }
            })
            .unwrap();
        assert_eq!(frames, 3);

        client.shut_down().unwrap();
        assert_eq!(client.state(), ClientState::Terminated);
        assert!(!client.sdk().is_initialized());
    }

    #[test]
    fn test_raw_and_tracker_streams() {
        let tracker = crate::types::TrackerData {
            tracker_id: "hmd".into(),
            is_hmd: true,
            ..Default::default()
        };
        let sdk = SimulatedCore::new()
            .with_host(studio())
            .with_raw_glove(3)
            .with_tracker(tracker)
            .with_frame_interval(Duration::from_secs(3600));
        let mut client = connected_client(sdk);
        client.sdk().emit_frames();

        let raw = client.raw_skeletons().try_adopt().unwrap();
        assert_eq!(raw.for_glove(3).unwrap().nodes.len(), hand::HAND_NODE_COUNT);
        let trackers = client.trackers().try_adopt().unwrap();
        assert!(trackers.trackers[0].is_hmd);
        // No skeleton loaded, so no skeleton frame.
        assert!(client.run_once().is_none());
    }

    #[test]
    fn test_abort_policy_surfaces_setup_failure() {
        let mut config = test_config();
        config.setup_failure_policy = SetupFailurePolicy::Abort;
        let mut client = Client::new(SimulatedCore::new().with_host(studio()), config);
        client.initialize().unwrap();
        client.connect().unwrap();
        // Fill every setup slot so the hand cannot be created.
        for _ in 0..32 {
            client.begin_setup(hand::setup_info(Side::Left, 0)).unwrap();
        }
        assert!(matches!(
            client.setup_skeletons(),
            Err(ClientError::ResourceExhausted { .. })
        ));
        assert_eq!(client.state(), ClientState::Connected);
    }

    #[test]
    fn test_ignore_policy_streams_anyway() {
        let mut client = connected_client(SimulatedCore::new().with_host(studio()));
        for _ in 0..32 {
            client.begin_setup(hand::setup_info(Side::Left, 0)).unwrap();
        }
        client.setup_skeletons().unwrap();
        assert_eq!(client.state(), ClientState::Streaming);
        assert!(client.hand_skeleton().is_none());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut client = connected_client(SimulatedCore::new().with_host(studio()));
        client.shut_down().unwrap();
        client.shut_down().unwrap();
        assert!(matches!(client.initialize(), Err(ClientError::InvalidState(_))));
    }
}
