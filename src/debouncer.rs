//! Update debouncer: coalesces bursts of work into throttled runs.
//!
//! Tasks never run closer together than `interval`. The first task after a
//! quiet period runs synchronously inside the call that submitted it; later
//! ones wait for a single one-shot timer on the host's event loop. Nothing
//! here spawns threads.
//!
//! ```rust,ignore
//! let debouncer = UpdateDebouncer::new(interval, clock, event_loop.clone());
//! for registration in burst {
//!     let index = index.clone();
//!     debouncer.add(move || { let _ = index.borrow_mut().register(registration); });
//! }
//! event_loop.run_until_idle();
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::error::panic_message;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Instant;
    /// Block (or pretend to) until `duration` has passed.
    fn sleep(&self, duration: Duration);
}

pub type TimerCallback = Box<dyn FnOnce()>;

/// Something that can call back once at a deadline, on the same thread.
pub trait TimerHost {
    fn schedule(&self, deadline: Instant, callback: TimerCallback);
}

type Task = Box<dyn FnOnce()>;

enum Item {
    Single(Task),
    Batch(Vec<Task>),
}

impl Item {
    fn len(&self) -> usize {
        match self {
            Item::Single(_) => 1,
            Item::Batch(tasks) => tasks.len(),
        }
    }

    fn run(self) {
        match self {
            Item::Single(task) => task(),
            Item::Batch(tasks) => tasks.into_iter().for_each(|task| task()),
        }
    }
}

#[derive(Default)]
struct State {
    queue: VecDeque<Item>,
    last_run: Option<Instant>,
    timer_armed: bool,
    running: bool,
}

struct Inner {
    state: RefCell<State>,
    interval: Duration,
    clock: Rc<dyn Clock>,
    timers: Rc<dyn TimerHost>,
}

/// Cheap to clone; clones share one queue.
#[derive(Clone)]
pub struct UpdateDebouncer {
    inner: Rc<Inner>,
}

impl UpdateDebouncer {
    pub fn new(interval: Duration, clock: Rc<dyn Clock>, timers: Rc<dyn TimerHost>) -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(State::default()),
                interval,
                clock,
                timers,
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Append a task that runs on its own tick.
    pub fn queue(&self, task: impl FnOnce() + 'static) {
        self.inner
            .state
            .borrow_mut()
            .queue
            .push_back(Item::Single(Box::new(task)));
        Inner::pump(&self.inner);
    }

    /// Add a task to the batch at the tail of the queue. The whole batch
    /// runs on one tick.
    pub fn add(&self, task: impl FnOnce() + 'static) {
        {
            let mut state = self.inner.state.borrow_mut();
            let task: Task = Box::new(task);
            match state.queue.pop_back() {
                Some(Item::Batch(mut tasks)) => {
                    tasks.push(task);
                    state.queue.push_back(Item::Batch(tasks));
                }
                Some(Item::Single(previous)) => {
                    state.queue.push_back(Item::Batch(vec![previous, task]));
                }
                None => state.queue.push_back(Item::Batch(vec![task])),
            }
        }
        Inner::pump(&self.inner);
    }

    /// Drop the most recently queued item that has not run yet and queue
    /// `task` in its place.
    pub fn replace(&self, task: impl FnOnce() + 'static) {
        {
            let mut state = self.inner.state.borrow_mut();
            if let Some(dropped) = state.queue.pop_back() {
                debug!(tasks = dropped.len(), "Replacing queued update");
            }
            state.queue.push_back(Item::Single(Box::new(task)));
        }
        Inner::pump(&self.inner);
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.inner.state.borrow().queue.iter().map(Item::len).sum()
    }
}

impl Inner {
    fn pump(this: &Rc<Inner>) {
        loop {
            let now = this.clock.now();
            let mut state = this.state.borrow_mut();
            if state.running || state.timer_armed || state.queue.is_empty() {
                return;
            }

            if let Some(last_run) = state.last_run {
                let due = last_run + this.interval;
                if now < due {
                    state.timer_armed = true;
                    drop(state);
                    debug!(wait_ms = (due - now).as_millis() as u64, "Deferring update");
                    let weak: Weak<Inner> = Rc::downgrade(this);
                    this.timers.schedule(
                        due,
                        Box::new(move || {
                            if let Some(inner) = weak.upgrade() {
                                inner.state.borrow_mut().timer_armed = false;
                                Inner::pump(&inner);
                            }
                        }),
                    );
                    return;
                }
            }

            let Some(item) = state.queue.pop_front() else {
                return;
            };
            state.last_run = Some(now);
            state.running = true;
            drop(state);

            let tasks = item.len();
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| item.run())) {
                error!(
                    tasks,
                    panic = %panic_message(payload.as_ref()),
                    "Debounced task panicked"
                );
            }
            this.state.borrow_mut().running = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::{EventLoop, ManualClock};
    use std::cell::RefCell;

    struct Harness {
        clock: Rc<ManualClock>,
        event_loop: Rc<EventLoop>,
        debouncer: UpdateDebouncer,
        log: Rc<RefCell<Vec<String>>>,
    }

    fn harness(interval_ms: u64) -> Harness {
        let clock = Rc::new(ManualClock::new());
        let event_loop = Rc::new(EventLoop::new(clock.clone()));
        let debouncer = UpdateDebouncer::new(
            Duration::from_millis(interval_ms),
            clock.clone(),
            event_loop.clone(),
        );
        Harness {
            clock,
            event_loop,
            debouncer,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    impl Harness {
        fn task(&self, label: &str) -> impl FnOnce() + 'static {
            let log = self.log.clone();
            let label = label.to_string();
            move || log.borrow_mut().push(label)
        }

        fn ran(&self) -> Vec<String> {
            self.log.borrow().clone()
        }
    }

    #[test]
    fn test_first_task_runs_synchronously() {
        let h = harness(250);
        h.debouncer.queue(h.task("a"));
        assert_eq!(h.ran(), vec!["a"]);
        assert_eq!(h.event_loop.pending(), 0);
    }

    #[test]
    fn test_queue_is_fifo_one_per_tick() {
        let h = harness(250);
        h.debouncer.queue(h.task("a"));
        h.debouncer.queue(h.task("b"));
        h.debouncer.queue(h.task("c"));
        assert_eq!(h.ran(), vec!["a"]);
        assert_eq!(h.event_loop.pending(), 1, "only one timer may be armed");

        h.clock.advance(Duration::from_millis(249));
        h.event_loop.run_due();
        assert_eq!(h.ran(), vec!["a"]);

        h.clock.advance(Duration::from_millis(1));
        h.event_loop.run_due();
        assert_eq!(h.ran(), vec!["a", "b"]);

        h.event_loop.run_until_idle();
        assert_eq!(h.ran(), vec!["a", "b", "c"]);
        assert_eq!(h.debouncer.pending(), 0);
    }

    #[test]
    fn test_add_batches_burst() {
        let h = harness(250);
        h.debouncer.add(h.task("first"));
        for i in 0..5 {
            h.debouncer.add(h.task(&format!("burst-{}", i)));
        }
        assert_eq!(h.ran(), vec!["first"]);
        assert_eq!(h.debouncer.pending(), 5);

        h.clock.advance(Duration::from_millis(250));
        h.event_loop.run_due();
        assert_eq!(h.ran().len(), 6, "the whole burst runs on one tick");
        assert_eq!(h.event_loop.pending(), 0);
    }

    #[test]
    fn test_add_promotes_trailing_single() {
        let h = harness(100);
        h.debouncer.queue(h.task("a"));
        h.debouncer.queue(h.task("b"));
        h.debouncer.add(h.task("c"));
        assert_eq!(h.debouncer.pending(), 2);

        h.clock.advance(Duration::from_millis(100));
        h.event_loop.run_due();
        assert_eq!(h.ran(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_replace_discards_latest_pending() {
        let h = harness(100);
        h.debouncer.queue(h.task("a"));
        h.debouncer.queue(h.task("resize-1"));
        h.debouncer.replace(h.task("resize-2"));
        h.debouncer.replace(h.task("resize-3"));

        h.event_loop.run_until_idle();
        assert_eq!(h.ran(), vec!["a", "resize-3"]);
    }

    #[test]
    fn test_runs_immediately_after_quiet_period() {
        let h = harness(100);
        h.debouncer.queue(h.task("a"));
        h.clock.advance(Duration::from_millis(500));
        h.debouncer.queue(h.task("b"));
        assert_eq!(h.ran(), vec!["a", "b"]);
    }

    #[test]
    fn test_task_can_enqueue_more_work() {
        let h = harness(50);
        let debouncer = h.debouncer.clone();
        let follow_up = h.task("follow-up");
        let log = h.log.clone();
        h.debouncer.queue(move || {
            log.borrow_mut().push("outer".to_string());
            debouncer.queue(follow_up);
        });
        assert_eq!(h.ran(), vec!["outer"]);

        h.event_loop.run_until_idle();
        assert_eq!(h.ran(), vec!["outer", "follow-up"]);
    }

    #[test]
    fn test_panicking_task_does_not_wedge_queue() {
        let h = harness(10);
        h.debouncer.queue(|| panic!("bad update"));
        h.debouncer.queue(h.task("after"));
        h.event_loop.run_until_idle();
        assert_eq!(h.ran(), vec!["after"]);
    }
}
