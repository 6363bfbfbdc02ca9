/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, error, info};
use rand::seq::SliceRandom;
use rand::RngCore;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{Builder, JoinHandle};
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::SimulationConfig;
use crate::elevator::Elevator;
use crate::shared::{Direction, ElevatorBehaviour, MoveRequest, Transition};

/***************************************/
/*               Enums                 */
/***************************************/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Running,
}

enum Event {
    Tick,
    RequestQueued,
    Terminate,
}

/***************************************/
/*             Public API              */
/***************************************/
/**
 * Owns the elevator roster and the FIFO of unassigned floor requests.
 *
 * Workers enqueue requests through `request_lift`; the dispatcher loop pairs the request at the
 * front of the queue with an elevator and presses that elevator's button for the requested floor.
 * The loop wakes on every tick and also whenever a new request is accepted.
 *
 * # Fields
 * - `elevators`:   Fixed roster, created at construction.
 * - `n_floors`:    Number of floors in the building.
 * - `tick`:        Polling interval of the assignment loop.
 * - `phase`:       `Start` until the elevator threads are spawned, `Running` afterwards.
 * - `queue`:       Pending requests, oldest first.
 * - `rng`:         Source of randomness for tie-breaking between equally good elevators.
 * - `request_tx`:  Coalescing wake-up signal for the assignment loop.
 */
pub struct Dispatcher {
    elevators: Vec<Arc<Elevator>>,
    n_floors: u8,
    tick: Duration,
    phase: Mutex<Phase>,
    queue: Mutex<VecDeque<MoveRequest>>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    request_tx: cbc::Sender<()>,
    request_rx: cbc::Receiver<()>,
}

impl Dispatcher {
    /// Builds a dispatcher with `n_elevators` cars named `Elevator1..N`, all resting at floor 1.
    pub fn new(
        n_floors: u8,
        n_elevators: u8,
        config: &SimulationConfig,
        rng: Box<dyn RngCore + Send>,
        state_tx: Option<cbc::Sender<Transition>>,
    ) -> Dispatcher {
        let elevators = (1..=n_elevators)
            .map(|i| {
                Arc::new(Elevator::new(
                    format!("Elevator{}", i),
                    1,
                    n_floors,
                    config,
                    state_tx.clone(),
                ))
            })
            .collect();
        Dispatcher::with_elevators(n_floors, elevators, config, rng)
    }

    pub fn with_elevators(
        n_floors: u8,
        elevators: Vec<Arc<Elevator>>,
        config: &SimulationConfig,
        rng: Box<dyn RngCore + Send>,
    ) -> Dispatcher {
        let (request_tx, request_rx) = cbc::bounded::<()>(1);
        Dispatcher {
            elevators,
            n_floors,
            tick: config.tick(),
            phase: Mutex::new(Phase::Start),
            queue: Mutex::new(VecDeque::new()),
            rng: Mutex::new(rng),
            request_tx,
            request_rx,
        }
    }

    /// Spawns one thread per elevator and moves to `Running`. Does nothing once running.
    pub fn start(&self, terminate_rx: &cbc::Receiver<()>) -> io::Result<Vec<JoinHandle<()>>> {
        let mut phase = lock(&self.phase);
        if *phase == Phase::Running {
            return Ok(Vec::new());
        }

        info!("Dispatcher started with {} elevators", self.elevators.len());
        let mut handles = Vec::with_capacity(self.elevators.len());
        for elevator in &self.elevators {
            let elevator_thread = Builder::new().name(elevator.name().to_lowercase());
            let elevator = Arc::clone(elevator);
            let terminate_rx = terminate_rx.clone();
            handles.push(elevator_thread.spawn(move || elevator.run(terminate_rx))?);
        }

        *phase = Phase::Running;
        Ok(handles)
    }

    /// Runs the `Start` phase if needed, then assigns requests until terminated.
    /// Elevator threads share `terminate_rx` and are joined before returning.
    pub fn run(self: Arc<Self>, terminate_rx: cbc::Receiver<()>) {
        let elevator_threads = match self.start(&terminate_rx) {
            Ok(handles) => handles,
            Err(e) => {
                error!("Failed to spawn elevator threads: {}", e);
                return;
            }
        };

        let ticker = cbc::tick(self.tick);
        loop {
            match self.wait_for_event(&ticker, &terminate_rx) {
                Event::Tick | Event::RequestQueued => {
                    self.step();
                }
                Event::Terminate => break,
            }
        }

        for handle in elevator_threads {
            let _ = handle.join();
        }
        debug!("Dispatcher stopped");
    }

    fn wait_for_event(
        &self,
        ticker: &cbc::Receiver<Instant>,
        terminate_rx: &cbc::Receiver<()>,
    ) -> Event {
        cbc::select! {
            recv(self.request_rx) -> _ => Event::RequestQueued,
            recv(ticker) -> _ => Event::Tick,
            recv(terminate_rx) -> _ => Event::Terminate,
        }
    }

    /// Tries to assign an elevator to the request at the front of the queue.
    ///
    /// Returns the elevator that was sent, or `None` when the queue is empty or no elevator
    /// qualifies yet. An unserved request stays at the front and is retried on the next call.
    /// The queue stays locked until the button is pressed, so the call is always visible
    /// either as a queued request or as a pressed button.
    pub fn step(&self) -> Option<Arc<Elevator>> {
        let mut queue = self.queue();
        let request = *queue.front()?;
        let elevator = self.idle_elevator_closest(request.floor)?;

        info!(
            "Dispatcher sending {} to floor {} ({:?})",
            elevator.name(),
            request.floor,
            request.direction
        );
        elevator.push_button(request.floor);
        queue.pop_front();
        Some(elevator)
    }

    /// Picks an elevator for `level`.
    ///
    /// A car already `Ready` at the floor wins outright. Otherwise the available cars closest to
    /// the floor are collected and one of them is chosen at random.
    pub fn idle_elevator_closest(&self, level: u8) -> Option<Arc<Elevator>> {
        let mut closest: Vec<&Arc<Elevator>> = Vec::new();
        let mut closest_dist = u8::MAX;

        for elevator in &self.elevators {
            let (behaviour, elevator_level) = elevator.snapshot();
            let dist = elevator_level.abs_diff(level);

            if dist == 0 && behaviour == ElevatorBehaviour::Ready {
                return Some(Arc::clone(elevator));
            }
            if behaviour != ElevatorBehaviour::Idle || elevator.has_button_pressed() {
                continue;
            }

            if closest.is_empty() || dist < closest_dist {
                closest_dist = dist;
                closest.clear();
                closest.push(elevator);
            } else if dist == closest_dist {
                closest.push(elevator);
            }
        }

        closest.choose(&mut *self.rng()).map(|e| Arc::clone(*e))
    }

    /// A random elevator among those `Ready` at `level`, if any.
    pub fn ready_elevator(&self, level: u8) -> Option<Arc<Elevator>> {
        let ready: Vec<&Arc<Elevator>> = self
            .elevators
            .iter()
            .filter(|e| e.ready_at_level(level))
            .collect();
        ready.choose(&mut *self.rng()).map(|e| Arc::clone(*e))
    }

    /// Queues a call from `level`. Returns false when a car is already ready there.
    pub fn request_lift(&self, level: u8, direction: Direction) -> bool {
        if self.has_elevator_ready(level) {
            debug!("Elevator already waiting at {}, request dropped", level);
            return false;
        }

        self.queue().push_back(MoveRequest {
            floor: level,
            direction,
        });
        // A full channel already holds a pending wake-up.
        let _ = self.request_tx.try_send(());
        true
    }

    pub fn has_elevator_ready(&self, level: u8) -> bool {
        self.elevators.iter().any(|e| e.ready_at_level(level))
    }

    /// Whether a call from `level` is still going to be answered: a request for it is queued,
    /// an elevator has its button pressed, or an elevator is ready there.
    ///
    /// Checked in the order a call moves through, so a call advancing between two checks is
    /// seen by the later one.
    pub fn is_call_pending(&self, level: u8) -> bool {
        self.in_queue(level)
            || self.elevators.iter().any(|e| e.has_button_for(level))
            || self.has_elevator_ready(level)
    }

    /// Whether some queued request is for `level`.
    pub fn in_queue(&self, level: u8) -> bool {
        self.queue().iter().any(|r| r.floor == level)
    }

    pub fn has_queue(&self) -> bool {
        !self.queue().is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.queue().len()
    }

    pub fn peek_request(&self) -> Option<MoveRequest> {
        self.queue().front().copied()
    }

    pub fn dequeue_request(&self) -> Option<MoveRequest> {
        self.queue().pop_front()
    }

    pub fn elevators(&self) -> &[Arc<Elevator>] {
        &self.elevators
    }

    pub fn n_floors(&self) -> u8 {
        self.n_floors
    }

    pub fn phase(&self) -> Phase {
        *lock(&self.phase)
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<MoveRequest>> {
        lock(&self.queue)
    }

    fn rng(&self) -> MutexGuard<'_, Box<dyn RngCore + Send>> {
        lock(&self.rng)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
