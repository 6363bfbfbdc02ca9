use crate::config::SimulationConfig;
use crate::shared::{ElevatorBehaviour, Transition};
use crossbeam_channel as cbc;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/**
 * Simulates one elevator car.
 *
 * The `Elevator` owns the car's door/motion state machine and its per-floor button panel. It is
 * shared behind an `Arc` between its own run loop, the dispatcher and the workers riding it.
 * Callers outside the run loop may only press buttons and query state; position, level and
 * behaviour are written exclusively by `step`.
 *
 * # Fields
 * - `name`:            Display name, e.g. `Elevator1`.
 * - `speed`:           Distance in floors travelled per tick.
 * - `tick`:            Interval between two evaluations of the state machine.
 * - `door_open_time`:  How long the car stays `Ready` before going back to `Idle`.
 * - `cabin`:           Behaviour, position, level and goal, guarded by one lock.
 * - `buttons`:         One flag per floor, index = floor - 1, guarded by its own lock.
 * - `state_tx`:        Optional sink for behaviour changes.
 *
 * Lock order is `cabin` before `buttons`.
 */
pub struct Elevator {
    name: String,
    speed: f64,
    tick: Duration,
    door_open_time: Duration,
    cabin: Mutex<Cabin>,
    buttons: Mutex<Vec<bool>>,
    state_tx: Option<cbc::Sender<Transition>>,
}

struct Cabin {
    behaviour: ElevatorBehaviour,
    position: f64,
    level: u8,
    goal: u8,
    settled: bool,
    door_timer: Instant,
}

impl Elevator {
    pub fn new(
        name: String,
        start: u8,
        n_floors: u8,
        config: &SimulationConfig,
        state_tx: Option<cbc::Sender<Transition>>,
    ) -> Elevator {
        Elevator {
            name,
            speed: config.speed,
            tick: config.tick(),
            door_open_time: config.door_open_time(),
            cabin: Mutex::new(Cabin {
                behaviour: ElevatorBehaviour::Idle,
                position: f64::from(start),
                level: start,
                goal: start,
                settled: true,
                door_timer: Instant::now(),
            }),
            buttons: Mutex::new(vec![false; n_floors as usize]),
            state_tx,
        }
    }

    pub fn run(self: Arc<Self>, terminate_rx: cbc::Receiver<()>) {
        let ticker = cbc::tick(self.tick);
        loop {
            cbc::select! {
                recv(ticker) -> _ => self.step(),
                recv(terminate_rx) -> _ => break,
            }
        }
        debug!("{} stopped", self.name);
    }

    /// Evaluates the state machine once.
    pub fn step(&self) {
        let mut cabin = self.cabin();
        let from = cabin.behaviour;

        match cabin.behaviour {
            ElevatorBehaviour::Idle => {
                if self.has_button_pressed() {
                    cabin.behaviour = ElevatorBehaviour::CheckButton;
                }
            }
            ElevatorBehaviour::CheckButton => {
                cabin.goal = self.goal_level(cabin.level);
                if cabin.goal != cabin.level {
                    cabin.settled = false;
                    info!("{} moving towards {}", self.name, cabin.goal);
                    cabin.behaviour = ElevatorBehaviour::Moving;
                } else {
                    self.reset_button(cabin.goal);
                    self.open_doors(&mut cabin);
                }
            }
            ElevatorBehaviour::Moving => {
                if cabin.settled {
                    self.open_doors(&mut cabin);
                } else if self.advance(&mut cabin) {
                    self.open_doors(&mut cabin);
                }
            }
            ElevatorBehaviour::Ready => {
                if Instant::now() >= cabin.door_timer {
                    info!("{} closing doors", self.name);
                    cabin.behaviour = ElevatorBehaviour::Idle;
                }
            }
        }

        let to = cabin.behaviour;
        drop(cabin);
        if from != to {
            if let Some(tx) = &self.state_tx {
                let _ = tx.send(Transition::Elevator {
                    name: self.name.clone(),
                    from,
                    to,
                });
            }
        }
    }

    /// Moves one increment towards the goal. Returns true when the car settled this tick.
    fn advance(&self, cabin: &mut Cabin) -> bool {
        let goal = f64::from(cabin.goal);
        let current = round_hundredths(cabin.position);

        if current < goal {
            cabin.position = (cabin.position + self.speed).min(goal);
            debug!("{} moving up ({:.2})", self.name, cabin.position);
        } else if current > goal {
            cabin.position = (cabin.position - self.speed).max(goal);
            debug!("{} moving down ({:.2})", self.name, cabin.position);
        }

        if round_hundredths(cabin.position) != goal {
            return false;
        }

        info!("{} arrived at {}", self.name, cabin.goal);
        cabin.position = goal;
        cabin.level = cabin.goal;
        cabin.settled = true;
        self.reset_button(cabin.goal);
        true
    }

    fn open_doors(&self, cabin: &mut Cabin) {
        info!("{} opening doors at {}", self.name, cabin.level);
        cabin.door_timer = Instant::now() + self.door_open_time;
        cabin.behaviour = ElevatorBehaviour::Ready;
    }

    /// Nearest pressed floor from `level`; the lowest floor wins a tie. Falls back to `level`.
    fn goal_level(&self, level: u8) -> u8 {
        let buttons = self.buttons();
        let mut closest: Option<(u8, u8)> = None;

        for (i, pressed) in buttons.iter().enumerate() {
            if !pressed {
                continue;
            }
            let floor = (i + 1) as u8;
            let dist = floor.abs_diff(level);
            match closest {
                Some((_, best)) if dist >= best => {}
                _ => closest = Some((floor, dist)),
            }
        }

        closest.map_or(level, |(floor, _)| floor)
    }

    pub fn has_button_pressed(&self) -> bool {
        self.buttons().iter().any(|&pressed| pressed)
    }

    pub fn has_button_for(&self, level: u8) -> bool {
        self.buttons()
            .get(usize::from(level).wrapping_sub(1))
            .copied()
            .unwrap_or(false)
    }

    pub fn ready_at_level(&self, level: u8) -> bool {
        let cabin = self.cabin();
        cabin.behaviour == ElevatorBehaviour::Ready && cabin.level == level
    }

    pub fn push_button(&self, level: u8) {
        let mut buttons = self.buttons();
        match buttons.get_mut(usize::from(level).wrapping_sub(1)) {
            Some(button) => {
                debug!("{} button requested for {}", self.name, level);
                *button = true;
            }
            None => warn!("{} has no button for floor {}", self.name, level),
        }
    }

    fn reset_button(&self, level: u8) {
        if let Some(button) = self.buttons().get_mut(usize::from(level) - 1) {
            *button = false;
        }
    }

    /// True when the car is `Idle` and has no pending button, i.e. free to take a new call.
    pub fn is_available(&self) -> bool {
        self.behaviour() == ElevatorBehaviour::Idle && !self.has_button_pressed()
    }

    /// Behaviour and resting level read under one lock.
    pub fn snapshot(&self) -> (ElevatorBehaviour, u8) {
        let cabin = self.cabin();
        (cabin.behaviour, cabin.level)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn behaviour(&self) -> ElevatorBehaviour {
        self.cabin().behaviour
    }

    pub fn level(&self) -> u8 {
        self.cabin().level
    }

    pub fn position(&self) -> f64 {
        self.cabin().position
    }

    pub fn goal(&self) -> u8 {
        self.cabin().goal
    }

    pub fn buttons_snapshot(&self) -> Vec<bool> {
        self.buttons().clone()
    }

    fn cabin(&self) -> MutexGuard<'_, Cabin> {
        self.cabin.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn buttons(&self) -> MutexGuard<'_, Vec<bool>> {
        self.buttons.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
