//! A deduplicating delaying work queue.
//!
//! Items become visible to [`DelayingQueue::get`] only once their delay has
//! elapsed. The queue tracks presence, not count: an item that is already
//! pending (waiting for its deadline or ready to be taken) is never queued a
//! second time. When an item already waiting is added again, its deadline only
//! moves if the new one is sooner (keep-earliest).
//!
//! Deadlines live in one min-heap. A deadline superseded by a sooner one stays
//! in the heap until it reaches the top and is then discarded, so the heap
//! never outgrows the number of adds within one delay window.

use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashMap, HashSet, VecDeque},
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    sync::Notify,
    time::{Instant, sleep_until},
};

/// Longest delay honored by [`DelayingQueue::add_after`]; longer ones are
/// clamped so the deadline stays representable.
pub const MAX_DELAY: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

struct Deadline<T> {
    at: Instant,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Deadline<T> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<T> Eq for Deadline<T> {}

impl<T> PartialOrd for Deadline<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Deadline<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

struct State<T> {
    /// Items waiting for their deadline, with the deadline that counts.
    waiting: HashMap<T, Instant>,
    deadlines: BinaryHeap<Reverse<Deadline<T>>>,
    /// Items whose deadline passed, in deadline order.
    ready: VecDeque<T>,
    /// Membership of `ready`.
    queued: HashSet<T>,
    seq: u64,
    shutting_down: bool,
}

impl<T> State<T>
where
    T: Eq + Hash + Clone,
{
    fn new() -> Self {
        Self {
            waiting: HashMap::new(),
            deadlines: BinaryHeap::new(),
            ready: VecDeque::new(),
            queued: HashSet::new(),
            seq: 0,
            shutting_down: false,
        }
    }

    fn push_ready(&mut self, item: T) {
        if self.queued.insert(item.clone()) {
            self.ready.push_back(item);
        }
    }

    /// Moves every item due at `now` to the ready list and returns the next
    /// pending deadline, if any.
    fn promote(&mut self, now: Instant) -> Option<Instant> {
        loop {
            match self.deadlines.peek() {
                Some(Reverse(next)) if next.at > now => return Some(next.at),
                Some(_) => {}
                None => return None,
            }

            let Some(Reverse(Deadline { at, item, .. })) = self.deadlines.pop() else {
                return None;
            };
            // Superseded by a sooner deadline, or already made ready.
            if self.waiting.get(&item) != Some(&at) {
                continue;
            }
            self.waiting.remove(&item);
            self.push_ready(item);
        }
    }

    fn clear(&mut self) {
        self.waiting.clear();
        self.deadlines.clear();
        self.ready.clear();
        self.queued.clear();
    }
}

struct Inner<T> {
    state: Mutex<State<T>>,
    notify: Notify,
}

/// Cloneable handle to a delaying queue shared by producers and consumers.
pub struct DelayingQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for DelayingQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for DelayingQueue<T>
where
    T: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DelayingQueue<T>
where
    T: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::new()),
                notify: Notify::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes `item` available to consumers immediately.
    pub fn add(&self, item: T) {
        self.add_after(item, Duration::ZERO);
    }

    /// Schedules `item` to become available no earlier than `delay` from now.
    ///
    /// Adding an item that is already ready is a no-op. Adding an item that
    /// is already waiting keeps the earlier of the two deadlines. Delays
    /// beyond [`MAX_DELAY`] are clamped to it. Adds after
    /// [`shutdown`](Self::shutdown) are dropped.
    pub fn add_after(&self, item: T, delay: Duration) {
        {
            let mut state = self.lock();
            if state.shutting_down || state.queued.contains(&item) {
                return;
            }

            if delay.is_zero() {
                state.waiting.remove(&item);
                state.push_ready(item);
            } else {
                let at = Instant::now() + delay.min(MAX_DELAY);
                if let Some(&existing) = state.waiting.get(&item) {
                    if existing <= at {
                        return;
                    }
                }
                state.seq += 1;
                let seq = state.seq;
                state.waiting.insert(item.clone(), at);
                state.deadlines.push(Reverse(Deadline { at, seq, item }));
            }
        }
        self.inner.notify.notify_waiters();
    }

    /// Waits for the next ready item.
    ///
    /// Returns `None` once the queue is shut down, both for consumers already
    /// waiting and for later calls.
    pub async fn get(&self) -> Option<T> {
        loop {
            // Register for wakeups before inspecting the state so an add or
            // shutdown racing with this check is not missed.
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next_deadline = {
                let mut state = self.lock();
                if state.shutting_down {
                    return None;
                }
                let next_deadline = state.promote(Instant::now());
                if let Some(item) = state.ready.pop_front() {
                    state.queued.remove(&item);
                    return Some(item);
                }
                next_deadline
            };

            match next_deadline {
                Some(at) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = sleep_until(at) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Wakes every consumer with `None` and drops all pending items.
    pub fn shutdown(&self) {
        {
            let mut state = self.lock();
            state.shutting_down = true;
            state.clear();
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }

    /// Number of pending items, waiting or ready.
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.waiting.len() + state.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
