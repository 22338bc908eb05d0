//! A minimal single-threaded timer loop and the clocks that drive it.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::debouncer::{Clock, TimerCallback, TimerHost};

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when told to. Sleeping advances it.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// One-shot timers ordered by deadline (ties fire in scheduling order).
pub struct EventLoop {
    clock: Rc<dyn Clock>,
    timers: RefCell<BTreeMap<(Instant, u64), TimerCallback>>,
    next_seq: Cell<u64>,
}

impl EventLoop {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            timers: RefCell::new(BTreeMap::new()),
            next_seq: Cell::new(0),
        }
    }

    pub fn pending(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.borrow().keys().next().map(|(deadline, _)| *deadline)
    }

    /// Fire every timer whose deadline has passed, including timers armed
    /// by the callbacks themselves. Returns how many fired.
    pub fn run_due(&self) -> usize {
        let mut fired = 0;
        loop {
            let now = self.clock.now();
            let callback = {
                let mut timers = self.timers.borrow_mut();
                let due = timers
                    .keys()
                    .next()
                    .is_some_and(|(deadline, _)| *deadline <= now);
                if due {
                    timers.pop_first().map(|(_, callback)| callback)
                } else {
                    None
                }
            };
            match callback {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }
        if fired > 0 {
            trace!(fired, remaining = self.pending(), "Timers fired");
        }
        fired
    }

    /// Sleep until each pending deadline and fire it, until no timers remain.
    pub fn run_until_idle(&self) {
        while let Some(deadline) = self.next_deadline() {
            let now = self.clock.now();
            if deadline > now {
                self.clock.sleep(deadline - now);
            }
            self.run_due();
        }
    }
}

impl TimerHost for EventLoop {
    fn schedule(&self, deadline: Instant, callback: TimerCallback) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.timers.borrow_mut().insert((deadline, seq), callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let clock = Rc::new(ManualClock::new());
        let event_loop = EventLoop::new(clock.clone());
        let log = Rc::new(RefCell::new(Vec::new()));
        let start = clock.now();

        for (label, offset) in [("late", 30), ("early", 10), ("middle", 20)] {
            let log = log.clone();
            event_loop.schedule(
                start + Duration::from_millis(offset),
                Box::new(move || log.borrow_mut().push(label)),
            );
        }

        assert_eq!(event_loop.run_due(), 0);
        clock.advance(Duration::from_millis(20));
        assert_eq!(event_loop.run_due(), 2);
        assert_eq!(*log.borrow(), vec!["early", "middle"]);

        event_loop.run_until_idle();
        assert_eq!(*log.borrow(), vec!["early", "middle", "late"]);
        assert_eq!(event_loop.pending(), 0);
    }

    #[test]
    fn test_run_until_idle_advances_manual_clock() {
        let clock = Rc::new(ManualClock::new());
        let event_loop = EventLoop::new(clock.clone());
        let start = clock.now();
        event_loop.schedule(start + Duration::from_secs(5), Box::new(|| {}));

        event_loop.run_until_idle();
        assert!(clock.now() >= start + Duration::from_secs(5));
    }
}
