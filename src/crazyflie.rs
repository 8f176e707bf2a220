use crate::axes::AxisSource;
use crate::config::{CommanderConfig, PacketFormat, Tuning};
use crate::link::{BleLink, Delivery, GattHost, GattService, LinkEndpoint};
use crate::subsystems::commander::Setpoint;
use crate::subsystems::interlock::ThrustLock;
use crate::{Error, Result};
use futures::lock::Mutex;
use log::{debug, error, info, warn};
use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// State of the commander link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Not started, or the last start failed
    Idle,
    /// Resolving the CRTP service and characteristics
    Linking,
    /// The commander loop is sending setpoints
    Running,
    /// The commander loop was stopped, a new start is possible
    Stopped,
}

/// Packet counters of a commander link run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStatistics {
    /// Packets handed to the basic characteristic
    pub packets_sent: u64,
    /// Packets acknowledged by the Crazyflie
    pub packets_delivered: u64,
    /// Packets reported unreachable
    pub packets_unreachable: u64,
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    unreachable: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> LinkStatistics {
        let delivered = self.delivered.load(Relaxed);
        let unreachable = self.unreachable.load(Relaxed);

        LinkStatistics {
            packets_sent: delivered + unreachable,
            packets_delivered: delivered,
            packets_unreachable: unreachable,
        }
    }
}

struct Run {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Session {
    run: Option<Run>,
    counters: Arc<Counters>,
}

/// # The Crazyflie, over BLE
///
/// Sends commander setpoints to a Crazyflie as fast as the BLE link acknowledges them. The setpoints are computed
/// from an [AxisSource] chosen at creation.
///
/// Every call to [Crazyflie::start()] resolves the CRTP service again and starts a new commander loop on its own
/// task, [Crazyflie::stop()] ends it. The first packets of each run are gated by a
/// [ThrustLock](crate::subsystems::interlock::ThrustLock) so that the motors cannot spin up on connection.
///
/// The resolved endpoint is owned by the commander loop alone, nothing else can write on it while it runs.
///
/// Link failures never escape the loop: an unreachable Crazyflie is logged and counted in [LinkStatistics], the
/// loop keeps sending. The firmware stops the motors by itself when it stops receiving setpoints.
pub struct Crazyflie<H: GattHost> {
    link: BleLink<H>,
    source: Arc<dyn AxisSource>,
    format: PacketFormat,
    disarm_on_stop: bool,
    tuning: watch::Sender<Tuning>,
    state: std::sync::Mutex<LinkState>,
    session: Mutex<Session>,
}

impl<H: GattHost> Crazyflie<H> {
    /// Create an idle commander link
    ///
    /// An error is returned if the tuning of `config` is out of range.
    pub fn new(host: H, source: Arc<dyn AxisSource>, config: CommanderConfig) -> Result<Self> {
        config.tuning.validate()?;
        let (tuning, _) = watch::channel(config.tuning);

        Ok(Self {
            link: BleLink::new(host),
            source,
            format: config.format,
            disarm_on_stop: config.disarm_on_stop,
            tuning,
            state: std::sync::Mutex::new(LinkState::Idle),
            session: Mutex::new(Session::default()),
        })
    }

    /// Returns true if a Crazyflie exposing the CRTP service is known to the host
    ///
    /// This does not mean that the Crazyflie is connected or even connectable.
    pub async fn is_paired(&self) -> bool {
        self.link.is_paired().await
    }

    /// Start sending setpoints
    ///
    /// Resolves the CRTP service and starts the commander loop. The link falls back to [LinkState::Idle] and the
    /// resolution error is returned if the service or one of its characteristics cannot be found.
    pub async fn start(&self) -> Result<()> {
        let mut session = self.session.lock().await;

        match self.state() {
            LinkState::Linking | LinkState::Running => return Err(Error::AlreadyRunning),
            LinkState::Idle | LinkState::Stopped => (),
        }

        self.set_state(LinkState::Linking);
        let endpoint = match self.link.resolve().await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                warn!("Cannot start the commander link: {}", e);
                self.set_state(LinkState::Idle);
                return Err(e);
            }
        };

        let stop = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());
        let commander = CommanderLoop {
            endpoint,
            source: self.source.clone(),
            format: self.format,
            disarm_on_stop: self.disarm_on_stop,
            tuning: self.tuning.subscribe(),
            stop: stop.clone(),
            counters: counters.clone(),
        };
        let task = tokio::spawn(commander.run());

        session.run = Some(Run { stop, task });
        session.counters = counters;
        self.set_state(LinkState::Running);
        info!("Commander link running with {:?} setpoints", self.format);

        Ok(())
    }

    /// Stop sending setpoints
    ///
    /// Requests the commander loop to stop and waits for it to finish. The loop checks the request before every
    /// packet, so at most the write in flight completes. The wait can be bounded with `tokio::time::timeout()`, the
    /// loop still ends on its own if the wait is abandoned.
    ///
    /// Does nothing if the link is not running.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;

        if let Some(run) = session.run.take() {
            run.stop.store(true, Relaxed);
            if let Err(e) = run.task.await {
                error!("Commander loop ended abnormally: {}", e);
            }
            self.set_state(LinkState::Stopped);
            info!("Commander link stopped");
        }
    }

    /// Current state of the link
    pub fn state(&self) -> LinkState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: LinkState) {
        debug!("Commander link state: {:?}", state);
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Packet format sent by this link
    pub fn format(&self) -> PacketFormat {
        self.format
    }

    /// Current scaling of the axes
    pub fn tuning(&self) -> Tuning {
        *self.tuning.borrow()
    }

    /// Change the scaling of the axes
    ///
    /// Applies from the next packet if the link is running.
    pub fn set_tuning(&self, tuning: Tuning) -> Result<()> {
        tuning.validate()?;
        self.tuning.send_replace(tuning);
        Ok(())
    }

    /// Packet counters of the current run, or of the last one if stopped
    pub async fn statistics(&self) -> LinkStatistics {
        self.session.lock().await.counters.snapshot()
    }
}

impl<H: GattHost> Drop for Crazyflie<H> {
    fn drop(&mut self) {
        if let Some(run) = self.session.get_mut().run.as_ref() {
            run.stop.store(true, Relaxed);
        }
    }
}

struct CommanderLoop<S: GattService> {
    endpoint: LinkEndpoint<S>,
    source: Arc<dyn AxisSource>,
    format: PacketFormat,
    disarm_on_stop: bool,
    tuning: watch::Receiver<Tuning>,
    stop: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl<S: GattService> CommanderLoop<S> {
    async fn run(self) {
        let mut lock = ThrustLock::new(self.format.into());
        let mut reachable = true;

        while !self.stop.load(Relaxed) {
            let axes = self.source.sample().await;

            // Stop may have been requested while sampling
            if self.stop.load(Relaxed) {
                break;
            }

            let tuning = *self.tuning.borrow();
            let setpoint = Setpoint::from_axes(&axes, self.format, &tuning);
            let setpoint = lock.gate(&axes, setpoint);

            self.send(&setpoint, &mut reachable).await;
            lock.written();

            tokio::task::yield_now().await;
        }

        if self.disarm_on_stop {
            debug!("Sending de-energized setpoint before stopping");
            self.send(&Setpoint::de_energized(self.format), &mut reachable)
                .await;
        }

        self.endpoint.close().await;
    }

    async fn send(&self, setpoint: &Setpoint, reachable: &mut bool) {
        let packet = setpoint.encode();

        match self.endpoint.write(&packet).await {
            Ok(Delivery::Delivered) => {
                self.counters.delivered.fetch_add(1, Relaxed);
                if !*reachable {
                    info!("Crazyflie reachable again");
                    *reachable = true;
                }
            }
            Ok(Delivery::Unreachable) => {
                self.counters.unreachable.fetch_add(1, Relaxed);
                if *reachable {
                    warn!("Crazyflie unreachable, still sending setpoints");
                    *reachable = false;
                } else {
                    debug!("Crazyflie still unreachable");
                }
            }
            Err(e) => error!("Commander packet not sent: {}", e),
        }
    }
}
