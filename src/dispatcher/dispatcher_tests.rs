/*
 * Unit tests for dispatcher module
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 *
 * Tests:
 *  - test_dispatcher_init
 *  - test_request_lift_enqueues
 *  - test_request_lift_suppressed_when_ready
 *  - test_queue_is_fifo
 *  - test_step_empty_queue
 *  - test_ready_elevator_has_priority
 *  - test_closest_idle_elevator
 *  - test_busy_elevator_keeps_request_queued
 *  - test_tie_break_reaches_every_candidate
 *  - test_tie_break_is_reproducible
 *  - test_geometric_assignment_both_orders
 *  - test_ready_elevator_lookup
 *  - test_start_is_one_shot
 *  - test_run_loop_serves_request
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod dispatcher_tests {
    use crate::config::SimulationConfig;
    use crate::dispatcher::{Dispatcher, Phase};
    use crate::elevator::Elevator;
    use crate::shared::Direction::{Down, Up};
    use crate::shared::ElevatorBehaviour::Ready;
    use crate::shared::{MoveRequest, Transition};
    use crossbeam_channel::unbounded;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread::Builder;
    use std::time::Duration;

    fn test_config() -> SimulationConfig {
        SimulationConfig {
            tick_ms: 1,
            door_open_ms: 10_000,
            speed: 0.5,
            work_unit_ms: 1,
            seed: Some(3),
        }
    }

    fn seeded(seed: u64) -> Box<StdRng> {
        Box::new(StdRng::seed_from_u64(seed))
    }

    /// Builds a dispatcher whose elevators rest at the given floors.
    fn setup_dispatcher(n_floors: u8, starts: &[u8], seed: u64) -> Dispatcher {
        let config = test_config();
        let elevators = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                Arc::new(Elevator::new(
                    format!("Elevator{}", i + 1),
                    start,
                    n_floors,
                    &config,
                    None,
                ))
            })
            .collect();
        Dispatcher::with_elevators(n_floors, elevators, &config, seeded(seed))
    }

    /// Opens the doors of `elevator` at its current level.
    fn make_ready(elevator: &Elevator) {
        elevator.push_button(elevator.level());
        elevator.step();
        elevator.step();
        assert_eq!(elevator.behaviour(), Ready);
    }

    #[test]
    fn test_dispatcher_init() {
        // Purpose: Verify the roster, floor count and phase of a new dispatcher

        // Arrange + Act
        let dispatcher = Dispatcher::new(6, 3, &test_config(), seeded(1), None);

        // Assert
        assert_eq!(dispatcher.n_floors(), 6);
        assert_eq!(dispatcher.phase(), Phase::Start);
        assert!(!dispatcher.has_queue());
        let names: Vec<_> = dispatcher.elevators().iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["Elevator1", "Elevator2", "Elevator3"]);
        assert!(dispatcher.elevators().iter().all(|e| e.level() == 1));
    }

    #[test]
    fn test_request_lift_enqueues() {
        // Purpose: Verify that each accepted request grows the queue by one, duplicates included

        // Arrange
        let dispatcher = setup_dispatcher(5, &[1], 1);

        // Act + Assert
        assert!(dispatcher.request_lift(3, Up));
        assert_eq!(dispatcher.queue_len(), 1);
        assert!(dispatcher.request_lift(3, Up));
        assert_eq!(dispatcher.queue_len(), 2);
        assert!(dispatcher.in_queue(3));
        assert!(!dispatcher.in_queue(4));
        assert!(dispatcher.has_queue());
    }

    #[test]
    fn test_request_lift_suppressed_when_ready() {
        // Purpose: Verify that a call from a floor with a ready elevator is a no-op

        // Arrange
        let dispatcher = setup_dispatcher(5, &[2], 1);
        make_ready(&dispatcher.elevators()[0]);

        // Act
        let accepted = dispatcher.request_lift(2, Down);

        // Assert
        assert!(!accepted);
        assert_eq!(dispatcher.queue_len(), 0);
        assert!(dispatcher.has_elevator_ready(2));
        assert!(dispatcher.request_lift(3, Down));
        assert_eq!(dispatcher.queue_len(), 1);
    }

    #[test]
    fn test_queue_is_fifo() {
        // Purpose: Verify that peek and dequeue both look at the oldest request

        // Arrange
        let dispatcher = setup_dispatcher(9, &[1], 1);
        dispatcher.request_lift(3, Up);
        dispatcher.request_lift(7, Down);

        // Act + Assert
        assert_eq!(dispatcher.peek_request(), Some(MoveRequest { floor: 3, direction: Up }));
        assert_eq!(dispatcher.dequeue_request(), Some(MoveRequest { floor: 3, direction: Up }));
        assert_eq!(dispatcher.peek_request(), Some(MoveRequest { floor: 7, direction: Down }));
        assert_eq!(dispatcher.dequeue_request(), Some(MoveRequest { floor: 7, direction: Down }));
        assert_eq!(dispatcher.peek_request(), None);
        assert_eq!(dispatcher.dequeue_request(), None);
    }

    #[test]
    fn test_step_empty_queue() {
        // Purpose: Verify that stepping with nothing queued presses no button
        let dispatcher = setup_dispatcher(4, &[1, 1], 1);
        assert!(dispatcher.step().is_none());
        assert!(dispatcher.elevators().iter().all(|e| !e.has_button_pressed()));
    }

    #[test]
    fn test_ready_elevator_has_priority() {
        // Purpose: Verify that a car ready at the floor beats an idle car at the same floor

        // Arrange
        let dispatcher = setup_dispatcher(6, &[3, 3], 1);
        let ready = Arc::clone(&dispatcher.elevators()[1]);
        make_ready(&ready);

        // Act
        let chosen = (0..20).map(|_| dispatcher.idle_elevator_closest(3).unwrap());

        // Assert
        for elevator in chosen {
            assert_eq!(elevator.name(), "Elevator2");
        }
    }

    #[test]
    fn test_closest_idle_elevator() {
        // Purpose: Verify that the nearest idle elevator is assigned and its button pressed

        // Arrange
        let dispatcher = setup_dispatcher(10, &[1, 5, 9], 1);
        dispatcher.request_lift(6, Up);

        // Act
        let assigned = dispatcher.step().unwrap();

        // Assert
        assert_eq!(assigned.name(), "Elevator2");
        assert!(assigned.buttons_snapshot()[5]);
        assert!(!dispatcher.has_queue());
    }

    #[test]
    fn test_busy_elevator_keeps_request_queued() {
        // Purpose: Verify that a request waits while no elevator is available and is served later

        // Arrange
        let config = SimulationConfig { door_open_ms: 0, ..test_config() };
        let elevator = Arc::new(Elevator::new("Elevator1".into(), 1, 5, &config, None));
        let dispatcher =
            Dispatcher::with_elevators(5, vec![Arc::clone(&elevator)], &config, seeded(1));
        elevator.push_button(2);
        dispatcher.request_lift(4, Up);

        // Act + Assert
        assert!(dispatcher.step().is_none());
        assert_eq!(dispatcher.queue_len(), 1);

        // Serve floor 2 and let the doors close
        for _ in 0..5 {
            elevator.step();
        }
        assert!(elevator.is_available());
        assert_eq!(elevator.level(), 2);

        assert_eq!(dispatcher.step().unwrap().name(), "Elevator1");
        assert_eq!(dispatcher.queue_len(), 0);
        assert!(elevator.buttons_snapshot()[3]);
    }

    #[test]
    fn test_tie_break_reaches_every_candidate() {
        // Purpose: Verify that each of two equally distant idle elevators gets picked

        // Arrange
        let dispatcher = setup_dispatcher(5, &[1, 5], 42);
        let mut picks: HashMap<String, usize> = HashMap::new();

        // Act
        for _ in 0..200 {
            let elevator = dispatcher.idle_elevator_closest(3).unwrap();
            *picks.entry(elevator.name().to_string()).or_default() += 1;
        }

        // Assert
        assert_eq!(picks.len(), 2);
        assert!(picks["Elevator1"] > 0);
        assert!(picks["Elevator2"] > 0);
    }

    #[test]
    fn test_tie_break_is_reproducible() {
        // Purpose: Verify that an injected seed makes tie-breaking deterministic

        // Arrange
        let first = setup_dispatcher(5, &[1, 5, 1, 5], 7);
        let second = setup_dispatcher(5, &[1, 5, 1, 5], 7);

        // Act
        let a: Vec<String> = (0..30)
            .map(|_| first.idle_elevator_closest(3).unwrap().name().to_string())
            .collect();
        let b: Vec<String> = (0..30)
            .map(|_| second.idle_elevator_closest(3).unwrap().name().to_string())
            .collect();

        // Assert
        assert_eq!(a, b);
    }

    #[test]
    fn test_geometric_assignment_both_orders() {
        // Purpose: Verify that calls at 2 and 8 go to the cars at 1 and 10 whatever the queue order

        for floors in [[2u8, 8u8], [8, 2]] {
            // Arrange
            let dispatcher = setup_dispatcher(10, &[1, 10], 1);
            for floor in floors {
                dispatcher.request_lift(floor, Up);
            }

            // Act
            dispatcher.step().unwrap();
            dispatcher.step().unwrap();

            // Assert
            let low = &dispatcher.elevators()[0];
            let high = &dispatcher.elevators()[1];
            let mut expected_low = vec![false; 10];
            expected_low[1] = true;
            let mut expected_high = vec![false; 10];
            expected_high[7] = true;
            assert_eq!(low.buttons_snapshot(), expected_low);
            assert_eq!(high.buttons_snapshot(), expected_high);
            assert!(!dispatcher.has_queue());
        }
    }

    #[test]
    fn test_ready_elevator_lookup() {
        // Purpose: Verify that only elevators ready at the asked floor are returned

        // Arrange
        let dispatcher = setup_dispatcher(5, &[1, 4], 1);

        // Act + Assert
        assert!(dispatcher.ready_elevator(4).is_none());
        make_ready(&dispatcher.elevators()[1]);
        assert_eq!(dispatcher.ready_elevator(4).unwrap().name(), "Elevator2");
        assert!(dispatcher.ready_elevator(1).is_none());
    }

    #[test]
    fn test_start_is_one_shot() {
        // Purpose: Verify that Start spawns the elevators once and moves to Running

        // Arrange
        let dispatcher = Dispatcher::new(4, 2, &test_config(), seeded(1), None);
        let (terminate_tx, terminate_rx) = unbounded::<()>();

        // Act
        let handles = dispatcher.start(&terminate_rx).unwrap();
        let again = dispatcher.start(&terminate_rx).unwrap();

        // Assert
        assert_eq!(handles.len(), 2);
        assert!(again.is_empty());
        assert_eq!(dispatcher.phase(), Phase::Running);

        // Cleanup
        drop(terminate_tx);
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_run_loop_serves_request() {
        // Purpose: Verify that the threaded dispatcher sends an elevator to a queued floor

        // Arrange
        let config = SimulationConfig { door_open_ms: 0, ..test_config() };
        let (state_tx, state_rx) = unbounded::<Transition>();
        let (terminate_tx, terminate_rx) = unbounded::<()>();
        let dispatcher = Arc::new(Dispatcher::new(5, 2, &config, seeded(1), Some(state_tx)));
        let runner = Arc::clone(&dispatcher);
        let dispatcher_thread = Builder::new()
            .name("dispatcher_test".into())
            .spawn(move || runner.run(terminate_rx))
            .unwrap();

        // Act
        assert!(dispatcher.request_lift(4, Down));

        // Assert
        let arrived = loop {
            match state_rx.recv_timeout(Duration::from_secs(3)) {
                Ok(Transition::Elevator { name, to: Ready, .. }) => break name,
                Ok(_) => {}
                Err(e) => panic!("Timed out waiting for an elevator: {:?}", e),
            }
        };
        let elevator = dispatcher
            .elevators()
            .iter()
            .find(|e| e.name() == arrived)
            .unwrap();
        assert_eq!(elevator.level(), 4);
        assert!(!dispatcher.has_queue());

        // Cleanup
        drop(terminate_tx);
        dispatcher_thread.join().unwrap();
    }
}
