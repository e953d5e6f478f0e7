//! Background I/O worker - one thread draining one FIFO queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};

use crate::common::{Error, Result};

use super::request::IoRequest;

/// A dedicated thread servicing requests in arrival order.
///
/// A request stays at the head of the queue while it is processed, so
/// [`find`](Self::find) still sees it until the I/O is done.
///
/// # Lifecycle
/// ```text
/// start() ──▶ Idle ◀──────────┐
///               │ submit()    │
///               ▼             │
///          Processing ────────┘
///               │ stop()
///               ▼
///            Stopped ──▶ join()
/// ```
pub struct IoWorker<R: IoRequest> {
    name: String,
    shared: Arc<WorkerShared<R>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct WorkerShared<R> {
    queue: Mutex<WorkerQueue<R>>,
    ready: Condvar,
}

struct WorkerQueue<R> {
    requests: VecDeque<Arc<R>>,
    running: bool,
}

impl<R: IoRequest> IoWorker<R> {
    /// Spawn the worker thread.
    pub fn start(name: &str) -> Result<Self> {
        let shared = Arc::new(WorkerShared {
            queue: Mutex::new(WorkerQueue {
                requests: VecDeque::new(),
                running: true,
            }),
            ready: Condvar::new(),
        });

        let handle = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(name.to_string())
                .spawn(move || shared.run())?
        };

        info!("{} worker started", name);
        Ok(Self {
            name: name.to_string(),
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queue a request.
    ///
    /// # Errors
    /// `Error::PoolClosed` if the worker has been stopped; the request is
    /// cancelled.
    pub fn submit(&self, request: Arc<R>) -> Result<()> {
        let mut queue = self.shared.queue.lock();
        if !queue.running {
            request.cancel();
            return Err(Error::PoolClosed);
        }
        debug!("{}: queued {}", self.name, request.key());
        queue.requests.push_back(request);
        self.shared.ready.notify_one();
        Ok(())
    }

    /// The most recently queued request matching `pred`.
    pub fn find(&self, pred: impl Fn(&R) -> bool) -> Option<Arc<R>> {
        let queue = self.shared.queue.lock();
        queue.requests.iter().rev().find(|r| pred(r)).cloned()
    }

    /// Number of queued requests, including one being processed.
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().requests.len()
    }

    /// Stop accepting work and cancel everything still queued.
    ///
    /// A request being processed is cancelled too; its waiter wakes at once
    /// and the outcome of the I/O is discarded. Does not wait for the thread.
    pub fn stop(&self) {
        let cancelled: Vec<Arc<R>> = {
            let mut queue = self.shared.queue.lock();
            if !queue.running {
                return;
            }
            queue.running = false;
            self.shared.ready.notify_all();
            queue.requests.drain(..).collect()
        };

        if !cancelled.is_empty() {
            debug!("{}: cancelled {} requests", self.name, cancelled.len());
        }
        for request in cancelled {
            request.cancel();
        }
    }

    /// Wait for the thread to exit. Call after [`stop`](Self::stop).
    pub fn join(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("{} worker panicked", self.name);
        } else {
            info!("{} worker stopped", self.name);
        }
    }
}

impl<R: IoRequest> WorkerShared<R> {
    fn run(&self) {
        while let Some(request) = self.next() {
            request.process();

            let mut queue = self.queue.lock();
            if queue
                .requests
                .front()
                .is_some_and(|head| Arc::ptr_eq(head, &request))
            {
                queue.requests.pop_front();
            }
        }
    }

    /// Wait for the head of the queue; `None` once stopped.
    fn next(&self) -> Option<Arc<R>> {
        let mut queue = self.queue.lock();
        loop {
            if !queue.running {
                return None;
            }
            if let Some(head) = queue.requests.front() {
                return Some(Arc::clone(head));
            }
            self.ready.wait(&mut queue);
        }
    }
}

impl<R: IoRequest> Drop for IoWorker<R> {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::io::request::Completion;
    use crate::common::{CacheKey, ResourceId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records the order requests are processed in.
    struct TestRequest {
        key: CacheKey,
        log: Arc<Mutex<Vec<u32>>>,
        gate: Option<Gate>,
        completion: Completion<()>,
        cancels: AtomicUsize,
    }

    type Gate = Arc<(Mutex<bool>, Condvar)>;

    impl TestRequest {
        fn new(page: u32, log: &Arc<Mutex<Vec<u32>>>) -> Arc<Self> {
            Self::gated(page, log, None)
        }

        fn gated(page: u32, log: &Arc<Mutex<Vec<u32>>>, gate: Option<Gate>) -> Arc<Self> {
            Arc::new(Self {
                key: CacheKey::new(ResourceId::new(1), page),
                log: Arc::clone(log),
                gate,
                completion: Completion::new(),
                cancels: AtomicUsize::new(0),
            })
        }
    }

    impl IoRequest for TestRequest {
        fn key(&self) -> CacheKey {
            self.key
        }

        fn process(&self) {
            if let Some(gate) = &self.gate {
                let (open, cv) = &**gate;
                let mut open = open.lock();
                while !*open {
                    cv.wait(&mut open);
                }
            }
            self.log.lock().push(self.key.page_number);
            self.completion.complete(Ok(()));
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            self.completion.complete(Err(Error::PoolClosed));
        }
    }

    #[test]
    fn test_worker_processes_in_order() {
        let worker = IoWorker::start("test-io").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let requests: Vec<_> = (0..5).map(|n| TestRequest::new(n, &log)).collect();
        for request in &requests {
            worker.submit(Arc::clone(request)).unwrap();
        }
        for request in &requests {
            request.completion.wait().unwrap();
        }

        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
        worker.stop();
        worker.join();
    }

    #[test]
    fn test_request_visible_while_processing() {
        let worker = IoWorker::start("test-io").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new((Mutex::new(false), Condvar::new()));

        let blocked = TestRequest::gated(9, &log, Some(Arc::clone(&gate)));
        worker.submit(Arc::clone(&blocked)).unwrap();

        thread::sleep(std::time::Duration::from_millis(30));
        let found = worker.find(|r| r.key.page_number == 9);
        assert!(found.is_some_and(|r| Arc::ptr_eq(&r, &blocked)));

        *gate.0.lock() = true;
        gate.1.notify_all();
        blocked.completion.wait().unwrap();
        worker.stop();
        worker.join();
        assert_eq!(worker.queued(), 0);
    }

    #[test]
    fn test_stop_cancels_queued() {
        let worker = IoWorker::start("test-io").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new((Mutex::new(false), Condvar::new()));

        let blocked = TestRequest::gated(0, &log, Some(Arc::clone(&gate)));
        let queued = TestRequest::new(1, &log);
        worker.submit(Arc::clone(&blocked)).unwrap();
        worker.submit(Arc::clone(&queued)).unwrap();
        thread::sleep(std::time::Duration::from_millis(30));

        worker.stop();
        assert!(matches!(blocked.completion.wait(), Err(Error::PoolClosed)));
        assert!(matches!(queued.completion.wait(), Err(Error::PoolClosed)));

        *gate.0.lock() = true;
        gate.1.notify_all();
        worker.join();

        // The blocked request finished its I/O, the queued one never ran
        assert_eq!(*log.lock(), vec![0]);
        assert_eq!(queued.cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_submit_after_stop() {
        let worker = IoWorker::<TestRequest>::start("test-io").unwrap();
        worker.stop();

        let log = Arc::new(Mutex::new(Vec::new()));
        let request = TestRequest::new(3, &log);
        assert!(matches!(
            worker.submit(Arc::clone(&request)),
            Err(Error::PoolClosed)
        ));
        assert!(matches!(request.completion.wait(), Err(Error::PoolClosed)));
    }
}
