/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use serde::Serialize;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Direction of travel needed to get from `from` to `to`. Equal floors count as down.
    pub fn towards(from: u8, to: u8) -> Direction {
        if to > from {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

/// A floor call waiting in the dispatcher queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub floor: u8,
    pub direction: Direction,
}

/// One itinerary entry: go to `floor`, then stay there for `duration` time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
    pub floor: u8,
    pub duration: u32,
}

/// An unvalidated itinerary entry as it arrives from a remote caller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePair {
    pub floor: i64,
    pub seconds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevatorBehaviour {
    Idle,
    CheckButton,
    Moving,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerBehaviour {
    Lazing,
    Request,
    Waiting,
    Riding,
    Working,
    Done,
}

/// A state change published by an elevator or a worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Elevator {
        name: String,
        from: ElevatorBehaviour,
        to: ElevatorBehaviour,
    },
    Worker {
        name: String,
        from: WorkerBehaviour,
        to: WorkerBehaviour,
    },
}
