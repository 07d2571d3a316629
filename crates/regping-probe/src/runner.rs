use crate::prober::RegionProber;
use anyhow::Result;
use regping_model::{SampleSet, Target};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Number of probe cycles; 0 runs until cancelled.
    pub cycles: u32,
    /// Pause between cycles.
    pub interval: Duration,
    /// Targets probed in parallel within one cycle.
    pub concurrency: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            cycles: 64,
            interval: Duration::from_secs(1),
            concurrency: 1,
        }
    }
}

/// Cooperative cancellation shared between the run loop and a signal
/// handler. Checked before every probe dispatch and during the inter-cycle
/// sleep, so shutdown waits for at most one in-flight probe.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress reported while the run loop executes.
pub enum CycleEvent<'a> {
    /// One probe finished; failures carry the error that caused them.
    Probe {
        cycle: u32,
        target: &'a Target,
        outcome: &'a Result<f64>,
    },
    /// Every target in `cycle` has been probed.
    CycleEnd {
        cycle: u32,
        sample_sets: &'a [SampleSet],
    },
}

#[derive(Debug)]
pub struct RunOutcome {
    /// One sample set per input target, in target order.
    pub sample_sets: Vec<SampleSet>,
    /// Fully completed cycles.
    pub cycles_run: u32,
    pub cancelled: bool,
}

/// Drive the prober over every target for the configured cycles.
///
/// Each cycle probes the targets once in input order and appends the
/// outcome (`Some(ms)` or the `None` failure marker) to that target's
/// sample set. With `concurrency > 1` the probes of one cycle fan out to
/// worker threads, but results are appended in target order, so sample i
/// always reflects cycle i regardless of scheduling. A cancelled run
/// returns whatever was collected; partial sample sets are a normal
/// outcome.
pub fn run_cycles<P, F>(
    targets: &[Target],
    settings: &RunSettings,
    prober: Arc<P>,
    cancel: &CancelFlag,
    mut on_event: F,
) -> RunOutcome
where
    P: RegionProber + ?Sized + 'static,
    F: FnMut(CycleEvent),
{
    let mut sample_sets = vec![SampleSet::default(); targets.len()];
    let mut cycles_run = 0u32;

    'run: while settings.cycles == 0 || cycles_run < settings.cycles {
        if cancel.is_cancelled() {
            break;
        }

        let concurrency = settings.concurrency.max(1);
        if concurrency == 1 {
            for (index, target) in targets.iter().enumerate() {
                if cancel.is_cancelled() {
                    break 'run;
                }
                let outcome = prober.probe(target);
                on_event(CycleEvent::Probe {
                    cycle: cycles_run,
                    target,
                    outcome: &outcome,
                });
                sample_sets[index].push(outcome.ok());
            }
        } else {
            let indices: Vec<usize> = (0..targets.len()).collect();
            for batch in indices.chunks(concurrency) {
                if cancel.is_cancelled() {
                    break 'run;
                }
                for (index, outcome) in probe_batch(targets, batch, &prober) {
                    on_event(CycleEvent::Probe {
                        cycle: cycles_run,
                        target: &targets[index],
                        outcome: &outcome,
                    });
                    sample_sets[index].push(outcome.ok());
                }
            }
        }

        cycles_run += 1;
        on_event(CycleEvent::CycleEnd {
            cycle: cycles_run - 1,
            sample_sets: &sample_sets,
        });

        let more_cycles = settings.cycles == 0 || cycles_run < settings.cycles;
        if more_cycles && !settings.interval.is_zero() {
            sleep_cancellable(settings.interval, cancel);
        }
    }

    RunOutcome {
        sample_sets,
        cycles_run,
        cancelled: cancel.is_cancelled(),
    }
}

fn probe_batch<P>(targets: &[Target], batch: &[usize], prober: &Arc<P>) -> Vec<(usize, Result<f64>)>
where
    P: RegionProber + ?Sized + 'static,
{
    let (tx, rx) = mpsc::channel();
    let mut handles = Vec::with_capacity(batch.len());

    for &index in batch {
        let tx = tx.clone();
        let prober = Arc::clone(prober);
        let target = targets[index].clone();
        handles.push(thread::spawn(move || {
            let outcome = prober.probe(&target);
            let _ = tx.send((index, outcome));
        }));
    }
    drop(tx);

    let mut results: Vec<(usize, Result<f64>)> = rx.iter().collect();
    for handle in handles {
        let _ = handle.join();
    }

    // Report in target order regardless of completion order.
    results.sort_by_key(|(index, _)| *index);
    results
}

// Sleep in short slices so a cancellation request interrupts the pause
// instead of waiting out the full interval.
fn sleep_cancellable(interval: Duration, cancel: &CancelFlag) {
    const SLICE: Duration = Duration::from_millis(50);
    let deadline = Instant::now() + interval;
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SLICE.min(deadline - now));
    }
}
