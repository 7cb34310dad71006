use crate::config::Config;
use crate::engine::Engine;
use crate::model::FileAnalysis;
use anyhow::{bail, Result};
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// One file submitted for analysis.
#[derive(Debug, Clone)]
pub struct FileTask {
    pub absolute_path: PathBuf,
    pub relative_path: String,
}

/// Internal task message sent to a worker. Tagged with a correlation id so
/// results can be matched to pending work regardless of arrival order.
#[derive(Debug, Clone)]
struct ParseTask {
    task_id: u64,
    absolute_filename: PathBuf,
    relative_filename: String,
    project_id: u64,
}

/// One completed task, echoing the task id it was submitted under. Callers
/// must key on `task_id`, never on arrival position.
#[derive(Debug)]
pub struct TaskResult {
    pub task_id: u64,
    pub project_id: u64,
    pub relative_filename: String,
    pub analysis: Result<FileAnalysis>,
}

enum WorkerMessage {
    Done { result: TaskResult },
    Crashed { worker_id: usize, task_id: u64 },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PoolStats {
    pub completed: usize,
    pub failed: usize,
    pub replaced_workers: usize,
}

type Runner = Arc<dyn Fn(&mut Engine, &ParseTask) -> Result<FileAnalysis> + Send + Sync>;

struct Worker {
    tx: Sender<ParseTask>,
    handle: JoinHandle<()>,
}

/// Fixed-size pool of analysis worker threads with a sliding admission
/// window of `2 × pool_size` in-flight files. Each worker owns its own
/// [`Engine`]; workers share nothing and communicate only by message
/// passing. A worker that panics is removed, its unfinished tasks are
/// returned to the backlog, and a replacement is spawned in its slot, so a
/// crash never stalls the remaining files.
pub struct ParsePool {
    pool_size: usize,
    workers: Vec<Worker>,
    results_tx: Sender<WorkerMessage>,
    results_rx: Receiver<WorkerMessage>,
    runner: Runner,
    next_task_id: u64,
    replaced_workers: usize,
    shut_down: bool,
}

impl ParsePool {
    pub fn new(pool_size: usize) -> Self {
        let runner: Runner = Arc::new(|engine, task| {
            engine.analyze_file(&task.absolute_filename, &task.relative_filename)
        });
        Self::with_runner(pool_size, runner)
    }

    pub fn with_default_size() -> Self {
        Self::new(Config::get().pool_size)
    }

    fn with_runner(pool_size: usize, runner: Runner) -> Self {
        let pool_size = pool_size.max(1);
        let (results_tx, results_rx) = channel();
        let mut pool = Self {
            pool_size,
            workers: Vec::with_capacity(pool_size),
            results_tx,
            results_rx,
            runner,
            next_task_id: 0,
            replaced_workers: 0,
            shut_down: false,
        };
        pool.workers = (0..pool_size).map(|id| pool.spawn_worker(id)).collect();
        pool
    }

    fn spawn_worker(&self, worker_id: usize) -> Worker {
        let (tx, rx) = channel();
        let results = self.results_tx.clone();
        let runner = Arc::clone(&self.runner);
        let handle = std::thread::spawn(move || worker_loop(worker_id, rx, results, runner));
        Worker { tx, handle }
    }

    /// Analyze a batch of files across the pool. `on_complete` is invoked
    /// once per file, in completion order, with
    /// `(result, completed_count, total)`. Returns once every submitted
    /// file has produced exactly one result.
    pub fn parse_files<F>(
        &mut self,
        files: Vec<FileTask>,
        project_id: u64,
        mut on_complete: F,
    ) -> Result<PoolStats>
    where
        F: FnMut(&TaskResult, usize, usize),
    {
        if self.shut_down {
            bail!("parse pool is shut down");
        }

        let total = files.len();
        let mut backlog: VecDeque<ParseTask> = files
            .into_iter()
            .map(|file| {
                let task_id = self.next_task_id;
                self.next_task_id += 1;
                ParseTask {
                    task_id,
                    absolute_filename: file.absolute_path,
                    relative_filename: file.relative_path,
                    project_id,
                }
            })
            .collect();

        let window = self.pool_size * 2;
        let mut in_flight: HashMap<u64, (ParseTask, usize)> = HashMap::new();
        let mut completed = 0usize;
        let mut failed = 0usize;
        let mut round_robin = 0usize;

        while completed < total {
            // Keep the window full: admit one task per free slot.
            while in_flight.len() < window {
                let Some(task) = backlog.pop_front() else {
                    break;
                };
                let worker_id = round_robin % self.workers.len();
                round_robin += 1;
                self.dispatch(task, worker_id, &mut in_flight);
            }

            match self.results_rx.recv() {
                Ok(WorkerMessage::Done { result }) => {
                    in_flight.remove(&result.task_id);
                    completed += 1;
                    if result.analysis.is_err() {
                        failed += 1;
                    }
                    on_complete(&result, completed, total);
                }
                Ok(WorkerMessage::Crashed { worker_id, task_id }) => {
                    eprintln!(
                        "srcgraph: worker {worker_id} crashed on task {task_id}, spawning replacement"
                    );
                    self.workers[worker_id] = self.spawn_worker(worker_id);
                    self.replaced_workers += 1;

                    // The dead worker's unfinished tasks go back to the
                    // backlog, the crashing one included. Results it sent
                    // before crashing were already drained in order, so
                    // nothing runs twice.
                    let orphaned: Vec<u64> = in_flight
                        .iter()
                        .filter(|(_, (_, owner))| *owner == worker_id)
                        .map(|(id, _)| *id)
                        .collect();
                    for id in orphaned {
                        if let Some((task, _)) = in_flight.remove(&id) {
                            backlog.push_front(task);
                        }
                    }
                }
                Err(_) => bail!("parse pool result channel closed unexpectedly"),
            }
        }

        Ok(PoolStats {
            completed,
            failed,
            replaced_workers: self.replaced_workers,
        })
    }

    fn dispatch(
        &mut self,
        task: ParseTask,
        worker_id: usize,
        in_flight: &mut HashMap<u64, (ParseTask, usize)>,
    ) {
        let task_id = task.task_id;
        in_flight.insert(task_id, (task.clone(), worker_id));
        if self.workers[worker_id].tx.send(task).is_err() {
            // Worker died without reporting; replace it and leave the task
            // in flight so the crash message path requeues it, or resend
            // directly to the replacement.
            self.workers[worker_id] = self.spawn_worker(worker_id);
            self.replaced_workers += 1;
            if let Some((task, _)) = in_flight.remove(&task_id) {
                in_flight.insert(task_id, (task.clone(), worker_id));
                let _ = self.workers[worker_id].tx.send(task);
            }
        }
    }

    /// Terminal state: reject all future batches and stop every worker.
    pub fn shutdown(&mut self) {
        self.shut_down = true;
        for worker in self.workers.drain(..) {
            drop(worker.tx);
            let _ = worker.handle.join();
        }
    }
}

impl Drop for ParsePool {
    fn drop(&mut self) {
        if !self.shut_down {
            self.shutdown();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    tasks: Receiver<ParseTask>,
    results: Sender<WorkerMessage>,
    runner: Runner,
) {
    let mut engine = Engine::new();
    while let Ok(task) = tasks.recv() {
        let task_id = task.task_id;
        let outcome = catch_unwind(AssertUnwindSafe(|| runner(&mut engine, &task)));
        match outcome {
            Ok(analysis) => {
                let result = TaskResult {
                    task_id,
                    project_id: task.project_id,
                    relative_filename: task.relative_filename,
                    analysis,
                };
                if results.send(WorkerMessage::Done { result }).is_err() {
                    return;
                }
            }
            Err(_) => {
                // Engine state is suspect after a panic; report and exit so
                // the coordinator replaces this worker.
                let _ = results.send(WorkerMessage::Crashed { worker_id, task_id });
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    fn write_files(dir: &tempfile::TempDir, count: usize) -> Vec<FileTask> {
        (0..count)
            .map(|i| {
                let name = format!("mod_{i}.py");
                let path = dir.path().join(&name);
                std::fs::write(&path, format!("def fn_{i}():\n    return {i}\n")).unwrap();
                FileTask {
                    absolute_path: path,
                    relative_path: name,
                }
            })
            .collect()
    }

    #[test]
    fn every_file_gets_exactly_one_result() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_files(&dir, 10);

        let mut pool = ParsePool::new(3);
        let seen = Mutex::new(Vec::new());
        let stats = pool
            .parse_files(files, 1, |result, completed, total| {
                assert!(completed <= total);
                seen.lock().unwrap().push(result.task_id);
            })
            .unwrap();

        let mut ids = seen.into_inner().unwrap();
        assert_eq!(stats.completed, 10);
        assert_eq!(ids.len(), 10);
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 10, "task ids must be unique");
    }

    #[test]
    fn unreadable_file_fails_without_stalling_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = write_files(&dir, 4);
        files.push(FileTask {
            absolute_path: dir.path().join("missing.py"),
            relative_path: "missing.py".to_string(),
        });

        let mut pool = ParsePool::new(2);
        let stats = pool.parse_files(files, 1, |_, _, _| {}).unwrap();
        assert_eq!(stats.completed, 5);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn crashed_worker_is_replaced_and_task_resubmitted() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_files(&dir, 8);

        let panicked = Arc::new(AtomicBool::new(false));
        let trigger = Arc::clone(&panicked);
        let runner: Runner = Arc::new(move |engine, task| {
            if task.relative_filename == "mod_3.py"
                && !trigger.swap(true, Ordering::SeqCst)
            {
                panic!("induced worker crash");
            }
            engine.analyze_file(&task.absolute_filename, &task.relative_filename)
        });

        let mut pool = ParsePool::with_runner(2, runner);
        let stats = pool.parse_files(files, 1, |_, _, _| {}).unwrap();

        assert_eq!(stats.completed, 8, "crash must not drop any file");
        assert_eq!(stats.failed, 0);
        assert!(stats.replaced_workers >= 1);
        assert!(panicked.load(Ordering::SeqCst));
    }

    #[test]
    fn shutdown_rejects_new_batches() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_files(&dir, 2);

        let mut pool = ParsePool::new(2);
        pool.shutdown();
        let err = pool.parse_files(files, 1, |_, _, _| {}).unwrap_err();
        assert!(err.to_string().contains("shut down"));
    }

    #[test]
    fn empty_batch_completes_immediately() {
        let mut pool = ParsePool::new(1);
        let stats = pool.parse_files(Vec::new(), 1, |_, _, _| {}).unwrap();
        assert_eq!(stats.completed, 0);
    }
}
