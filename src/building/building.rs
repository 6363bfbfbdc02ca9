/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{Builder, JoinHandle};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::SimulationConfig;
use crate::dispatcher::Dispatcher;
use crate::shared::{ConfigError, RegisterError, SchedulePair, Transition, ValidationError};
use crate::worker::Worker;

/***************************************/
/*             Public API              */
/***************************************/
/**
 * Entry point of the simulation for the outside world.
 *
 * The `Building` owns the dispatcher and every simulation thread. `start` brings the dispatcher
 * and its elevators to life and `register_worker` adds occupants while the simulation runs.
 * All threads listen to the same terminate channel, which is closed by `shutdown`.
 */
pub struct Building {
    dispatcher: Arc<Dispatcher>,
    config: SimulationConfig,
    state_tx: Option<cbc::Sender<Transition>>,
    terminate_tx: cbc::Sender<()>,
    terminate_rx: cbc::Receiver<()>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Building {
    /// Validates the building dimensions and seeds the dispatcher from `config.seed`, or from
    /// the operating system when no seed is configured.
    pub fn new(
        n_floors: i64,
        n_elevators: i64,
        config: &SimulationConfig,
        state_tx: Option<cbc::Sender<Transition>>,
    ) -> Result<Building, ConfigError> {
        let rng: Box<dyn RngCore + Send> = match config.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(StdRng::from_entropy()),
        };
        Building::with_rng(n_floors, n_elevators, config, rng, state_tx)
    }

    pub fn with_rng(
        n_floors: i64,
        n_elevators: i64,
        config: &SimulationConfig,
        rng: Box<dyn RngCore + Send>,
        state_tx: Option<cbc::Sender<Transition>>,
    ) -> Result<Building, ConfigError> {
        let n_floors = u8::try_from(n_floors)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| ConfigError::InvalidFloorCount(n_floors.to_string()))?;
        let n_elevators = u8::try_from(n_elevators)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| ConfigError::InvalidElevatorCount(n_elevators.to_string()))?;
        if !(config.speed.is_finite() && config.speed > 0.0) {
            return Err(ConfigError::InvalidSpeed(config.speed));
        }

        let (terminate_tx, terminate_rx) = cbc::unbounded::<()>();
        let dispatcher = Dispatcher::new(n_floors, n_elevators, config, rng, state_tx.clone());

        Ok(Building {
            dispatcher: Arc::new(dispatcher),
            config: config.clone(),
            state_tx,
            terminate_tx,
            terminate_rx,
            threads: Mutex::new(Vec::new()),
        })
    }

    /// Spawns the dispatcher thread, which in turn starts the elevators.
    pub fn start(&self) -> io::Result<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let terminate_rx = self.terminate_rx.clone();
        let dispatcher_thread = Builder::new().name("dispatcher".into());
        let handle = dispatcher_thread.spawn(move || dispatcher.run(terminate_rx))?;
        self.threads().push(handle);
        Ok(())
    }

    /// Creates a worker on floor 1 with the given itinerary and starts it.
    ///
    /// Every activity is checked. When any destination is outside the building the worker is
    /// not started and the error lists all offending floors.
    pub fn register_worker(
        &self,
        name: &str,
        schedule: &[SchedulePair],
    ) -> Result<String, RegisterError> {
        let mut worker = Worker::new(
            name.to_string(),
            1,
            Arc::clone(&self.dispatcher),
            &self.config,
            self.state_tx.clone(),
        );

        let mut invalid = Vec::new();
        for pair in schedule {
            if let Err(e) = worker.add_activity(pair.floor, pair.seconds) {
                warn!("{}: {}", name, e);
                invalid.push(pair.floor);
            }
        }
        if !invalid.is_empty() {
            return Err(ValidationError::InvalidItinerary {
                name: name.to_string(),
                floors: invalid,
            }
            .into());
        }

        let terminate_rx = self.terminate_rx.clone();
        let worker_thread = Builder::new().name(format!("worker-{}", name));
        let handle = worker_thread.spawn(move || worker.run(terminate_rx))?;
        self.threads().push(handle);

        info!("{} registered with {} activities", name, schedule.len());
        Ok(format!("{} started doing the job", name))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Closes the terminate channel and waits for every simulation thread.
    pub fn shutdown(self) {
        let Building {
            terminate_tx,
            threads,
            ..
        } = self;
        drop(terminate_tx);

        let handles = threads.into_inner().unwrap_or_else(PoisonError::into_inner);
        for handle in handles {
            let _ = handle.join();
        }
        info!("Building shut down");
    }

    fn threads(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
