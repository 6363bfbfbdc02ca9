use crate::config::SimulationConfig;
use crate::dispatcher::Dispatcher;
use crate::elevator::Elevator;
use crate::shared::{Activity, Direction, Transition, ValidationError, WorkerBehaviour};
use crossbeam_channel as cbc;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/**
 * Simulates one building occupant working through an itinerary.
 *
 * The worker requests a lift at its current floor, waits for an elevator to be ready there,
 * rides it to the next destination, works for the activity's duration and repeats until the
 * itinerary is empty. The run loop ends when the worker leaves.
 *
 * # Fields
 * - `name`:        Display name given at registration.
 * - `level`:       Floor the worker is currently on.
 * - `behaviour`:   Current lifecycle state.
 * - `schedule`:    Remaining activities, next one first.
 * - `dispatcher`:  Building dispatcher used for calls and elevator lookups.
 * - `elevator`:    Elevator being ridden, if any.
 * - `tick`:        Polling interval of the run loop.
 * - `work_unit`:   Wall-clock length of one activity time unit.
 * - `work_start`:  When the current activity began.
 * - `work_time`:   Length of the current activity, saturating at `Duration::MAX`.
 * - `state_tx`:    Optional sink for behaviour changes.
 */
pub struct Worker {
    name: String,
    level: u8,
    behaviour: WorkerBehaviour,
    schedule: VecDeque<Activity>,
    dispatcher: Arc<Dispatcher>,
    elevator: Option<Arc<Elevator>>,
    tick: Duration,
    work_unit: Duration,
    work_start: Instant,
    work_time: Duration,
    state_tx: Option<cbc::Sender<Transition>>,
}

impl Worker {
    pub fn new(
        name: String,
        level: u8,
        dispatcher: Arc<Dispatcher>,
        config: &SimulationConfig,
        state_tx: Option<cbc::Sender<Transition>>,
    ) -> Worker {
        Worker {
            name,
            level,
            behaviour: WorkerBehaviour::Lazing,
            schedule: VecDeque::new(),
            dispatcher,
            elevator: None,
            tick: config.tick(),
            work_unit: config.work_unit(),
            work_start: Instant::now(),
            work_time: Duration::ZERO,
            state_tx,
        }
    }

    /// Appends an activity, rejecting floors outside the building.
    pub fn add_activity(&mut self, floor: i64, duration: u32) -> Result<(), ValidationError> {
        let n_floors = self.dispatcher.n_floors();
        let invalid = ValidationError::InvalidFloor { floor, n_floors };
        let floor = u8::try_from(floor).map_err(|_| invalid.clone())?;
        if floor < 1 || floor > n_floors {
            return Err(invalid);
        }

        self.schedule.push_back(Activity { floor, duration });
        Ok(())
    }

    pub fn run(mut self, terminate_rx: cbc::Receiver<()>) {
        let ticker = cbc::tick(self.tick);
        loop {
            cbc::select! {
                recv(ticker) -> _ => {
                    if self.step() == WorkerBehaviour::Done {
                        break;
                    }
                }
                recv(terminate_rx) -> _ => break,
            }
        }
        debug!("{} stopped", self.name);
    }

    /// Evaluates the lifecycle once and returns the resulting behaviour.
    pub fn step(&mut self) -> WorkerBehaviour {
        let from = self.behaviour;

        match self.behaviour {
            WorkerBehaviour::Lazing => {
                if self.schedule.is_empty() {
                    info!("{} leaving", self.name);
                    self.behaviour = WorkerBehaviour::Done;
                } else {
                    self.behaviour = WorkerBehaviour::Request;
                }
            }
            WorkerBehaviour::Request => {
                info!("{} requests a lift at {}", self.name, self.level);
                self.make_request();
                self.behaviour = WorkerBehaviour::Waiting;
            }
            WorkerBehaviour::Waiting => {
                if let Some(elevator) = self.dispatcher.ready_elevator(self.level) {
                    if let Some(activity) = self.schedule.front() {
                        info!(
                            "{} boards {} at {} heading to {}",
                            self.name,
                            elevator.name(),
                            self.level,
                            activity.floor
                        );
                        elevator.push_button(activity.floor);
                        self.elevator = Some(elevator);
                        self.behaviour = WorkerBehaviour::Riding;
                    }
                } else if !self.dispatcher.is_call_pending(self.level) {
                    warn!("{} lost its call at {}, requesting again", self.name, self.level);
                    self.make_request();
                }
            }
            WorkerBehaviour::Riding => {
                let arrived = match (&self.elevator, self.schedule.front()) {
                    (Some(elevator), Some(activity)) => elevator
                        .ready_at_level(activity.floor)
                        .then_some(*activity),
                    _ => None,
                };
                if let Some(activity) = arrived {
                    info!(
                        "{} arrived at {}, working for {} units",
                        self.name, activity.floor, activity.duration
                    );
                    self.elevator = None;
                    self.level = activity.floor;
                    self.work_start = Instant::now();
                    self.work_time = self.work_unit.saturating_mul(activity.duration);
                    self.behaviour = WorkerBehaviour::Working;
                }
            }
            WorkerBehaviour::Working => {
                if self.work_start.elapsed() >= self.work_time {
                    self.schedule.pop_front();
                    info!("{} done with the work, going idle", self.name);
                    self.behaviour = WorkerBehaviour::Lazing;
                }
            }
            WorkerBehaviour::Done => {}
        }

        let to = self.behaviour;
        if from != to {
            if let Some(tx) = &self.state_tx {
                let _ = tx.send(Transition::Worker {
                    name: self.name.clone(),
                    from,
                    to,
                });
            }
        }
        to
    }

    fn make_request(&self) {
        if let Some(activity) = self.schedule.front() {
            let direction = Direction::towards(self.level, activity.floor);
            self.dispatcher.request_lift(self.level, direction);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn behaviour(&self) -> WorkerBehaviour {
        self.behaviour
    }

    pub fn schedule(&self) -> &VecDeque<Activity> {
        &self.schedule
    }

    pub fn elevator(&self) -> Option<&Arc<Elevator>> {
        self.elevator.as_ref()
    }
}
