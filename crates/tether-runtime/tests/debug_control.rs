use std::sync::mpsc::{channel, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tether_runtime::debug::{ControlAction, DebugControl, StepKind, StopReason};
use tether_runtime::RuntimeError;

struct Run {
    done: Receiver<usize>,
    stops: Receiver<StopReason>,
    handle: JoinHandle<Result<(), RuntimeError>>,
}

/// Run `(depth, breakpoint_hit)` statements on thread 1, reporting each
/// completed statement index.
fn run(control: &DebugControl, statements: Vec<(usize, bool)>) -> Run {
    let (done_tx, done) = channel();
    let (stop_tx, stops) = channel();
    let hook = control.clone();
    let handle = thread::spawn(move || {
        for (idx, (depth, hit)) in statements.into_iter().enumerate() {
            hook.on_statement(1, depth, hit, |reason| {
                let _ = stop_tx.send(reason);
            })?;
            let _ = done_tx.send(idx);
        }
        Ok(())
    });
    Run {
        done,
        stops,
        handle,
    }
}

fn recv<T>(rx: &Receiver<T>) -> T {
    rx.recv_timeout(Duration::from_millis(250)).unwrap()
}

fn silent<T>(rx: &Receiver<T>) -> bool {
    rx.recv_timeout(Duration::from_millis(100)).is_err()
}

#[test]
fn breakpoint_pauses_until_resume() {
    let control = DebugControl::new(false);
    let run = run(&control, vec![(1, true)]);

    assert_eq!(recv(&run.stops), StopReason::Breakpoint);
    assert!(silent(&run.done));
    assert!(control.is_suspended());
    assert_eq!(control.current_thread(), Some(1));

    control.apply_action(ControlAction::Resume).unwrap();
    assert_eq!(recv(&run.done), 0);
    run.handle.join().unwrap().unwrap();
    assert!(!control.is_suspended());
}

#[test]
fn step_over_skips_deeper_statements() {
    let control = DebugControl::new(false);
    let run = run(
        &control,
        vec![(1, true), (2, false), (2, false), (1, false), (1, false)],
    );
    assert_eq!(recv(&run.stops), StopReason::Breakpoint);

    control
        .apply_action(ControlAction::Step(StepKind::Over))
        .unwrap();
    assert_eq!(recv(&run.done), 0);
    assert_eq!(recv(&run.done), 1);
    assert_eq!(recv(&run.done), 2);
    assert_eq!(recv(&run.stops), StopReason::Step);
    assert!(silent(&run.done));

    control.apply_action(ControlAction::Resume).unwrap();
    assert_eq!(recv(&run.done), 3);
    assert_eq!(recv(&run.done), 4);
    run.handle.join().unwrap().unwrap();
}

#[test]
fn step_into_stops_at_the_next_statement() {
    let control = DebugControl::new(false);
    let run = run(&control, vec![(1, true), (2, false), (1, false)]);
    assert_eq!(recv(&run.stops), StopReason::Breakpoint);

    control
        .apply_action(ControlAction::Step(StepKind::Into))
        .unwrap();
    assert_eq!(recv(&run.done), 0);
    assert_eq!(recv(&run.stops), StopReason::Step);
    assert!(silent(&run.done));

    control.apply_action(ControlAction::Resume).unwrap();
    assert_eq!(recv(&run.done), 1);
    assert_eq!(recv(&run.done), 2);
    run.handle.join().unwrap().unwrap();
}

#[test]
fn step_out_stops_in_the_caller() {
    let control = DebugControl::new(false);
    let run = run(&control, vec![(2, true), (3, false), (2, false), (1, false)]);
    assert_eq!(recv(&run.stops), StopReason::Breakpoint);

    control
        .apply_action(ControlAction::Step(StepKind::Out))
        .unwrap();
    assert_eq!(recv(&run.done), 0);
    assert_eq!(recv(&run.done), 1);
    assert_eq!(recv(&run.done), 2);
    assert_eq!(recv(&run.stops), StopReason::Step);

    control.apply_action(ControlAction::Resume).unwrap();
    assert_eq!(recv(&run.done), 3);
    run.handle.join().unwrap().unwrap();
}

#[test]
fn suspend_takes_effect_at_the_next_boundary() {
    let control = DebugControl::new(false);
    control.apply_action(ControlAction::Suspend).unwrap();
    assert!(control.is_suspended());

    let run = run(&control, vec![(1, false), (1, false)]);
    assert_eq!(recv(&run.stops), StopReason::Suspend);
    assert!(silent(&run.done));
    assert!(control.suspended_threads().contains(&1));

    control.apply_action(ControlAction::Resume).unwrap();
    assert_eq!(recv(&run.done), 0);
    assert_eq!(recv(&run.done), 1);
    assert!(silent(&run.stops));
    run.handle.join().unwrap().unwrap();
}

#[test]
fn held_threads_wait_for_start() {
    let control = DebugControl::new(true);
    let (tx, rx) = channel();
    let hook = control.clone();
    let handle = thread::spawn(move || {
        hook.await_start()?;
        tx.send(()).unwrap();
        Ok::<_, RuntimeError>(())
    });

    assert!(silent(&rx));
    control.start().unwrap();
    recv(&rx);
    handle.join().unwrap().unwrap();
}

#[test]
fn step_only_stops_the_stepping_thread() {
    let control = DebugControl::new(false);
    let (stop_tx, stops) = channel();
    let (gate_tx, gate) = channel::<()>();

    let hook = control.clone();
    let first = thread::spawn(move || {
        hook.on_statement(1, 1, true, |reason| {
            let _ = stop_tx.send((1, reason));
        })?;
        let _ = gate.recv();
        hook.on_statement(1, 1, false, |reason| {
            let _ = stop_tx.send((1, reason));
        })
    });
    assert_eq!(recv(&stops), (1, StopReason::Breakpoint));

    control
        .apply_action(ControlAction::Step(StepKind::Into))
        .unwrap();

    let hook = control.clone();
    let second = thread::spawn(move || hook.on_statement(2, 1, false, |_| {}));
    second.join().unwrap().unwrap();
    assert!(silent(&stops));

    gate_tx.send(()).unwrap();
    assert_eq!(recv(&stops), (1, StopReason::Step));
    control.apply_action(ControlAction::Resume).unwrap();
    first.join().unwrap().unwrap();
}
