use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use tracing::{debug, info, warn};

use crate::client::{GenerationError, ShaderGenerator};

/// Why a prompt was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("a shader is already being generated")]
    Busy,
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("generation worker has stopped")]
    Stopped,
}

/// Result of one generation request, delivered to the completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub prompt: String,
    pub result: Result<String, GenerationError>,
}

/// Runs generation requests on a background thread, one at a time.
///
/// While a request is in flight further submissions are rejected with
/// [`SubmitError::Busy`]. The in-flight flag is cleared before the completion
/// callback runs, so the callback may submit again.
pub struct GenerationWorker {
    jobs: Option<Sender<String>>,
    in_flight: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl GenerationWorker {
    pub fn spawn<G, F>(generator: G, mut on_complete: F) -> io::Result<Self>
    where
        G: ShaderGenerator + 'static,
        F: FnMut(GenerationOutcome) + Send + 'static,
    {
        let (jobs_tx, jobs_rx) = unbounded::<String>();
        let in_flight = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&in_flight);
        let handle = thread::Builder::new()
            .name("shaderlab-generate".into())
            .spawn(move || {
                for prompt in jobs_rx.iter() {
                    info!(%prompt, "generating shader");
                    let result = generator.generate(&prompt);
                    match &result {
                        Ok(fragment) => info!(bytes = fragment.len(), "shader generated"),
                        Err(err) => warn!("shader generation failed: {err}"),
                    }
                    flag.store(false, Ordering::SeqCst);
                    on_complete(GenerationOutcome { prompt, result });
                }
                debug!("generation worker exiting");
            })?;

        Ok(Self {
            jobs: Some(jobs_tx),
            in_flight,
            handle: Some(handle),
        })
    }

    /// Queues `prompt` unless it is blank or another request is in flight.
    pub fn submit(&self, prompt: &str) -> Result<(), SubmitError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SubmitError::EmptyPrompt);
        }
        let jobs = self.jobs.as_ref().ok_or(SubmitError::Stopped)?;
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SubmitError::Busy);
        }
        if jobs.send(prompt.to_string()).is_err() {
            self.in_flight.store(false, Ordering::SeqCst);
            return Err(SubmitError::Stopped);
        }
        Ok(())
    }

    /// True from a successful [`submit`](Self::submit) until its outcome is
    /// about to be delivered.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Closes the queue. An idle worker is joined; one still waiting on a request
/// is detached, and its outcome goes to a callback nobody listens to anymore.
impl Drop for GenerationWorker {
    fn drop(&mut self) {
        self.jobs.take();
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.is_loading() {
            debug!("detaching generation worker with a request in flight");
        } else {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use crossbeam_channel::{bounded, Receiver};
    use reqwest::StatusCode;

    use super::*;
    use crate::client::interpret_response;

    type Gate = Sender<Result<String, GenerationError>>;

    /// Blocks each request until the test releases it.
    struct GatedGenerator {
        gate: Receiver<Result<String, GenerationError>>,
    }

    impl ShaderGenerator for GatedGenerator {
        fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.gate
                .recv()
                .unwrap_or_else(|_| Err(GenerationError::Transport("gate closed".into())))
        }
    }

    /// Each delivered outcome is paired with the in-flight flag as the
    /// callback saw it.
    fn gated_worker() -> (GenerationWorker, Gate, Receiver<(GenerationOutcome, bool)>) {
        let (gate_tx, gate_rx) = bounded(1);
        let (done_tx, done_rx) = unbounded();
        let flag: Arc<Mutex<Option<Arc<AtomicBool>>>> = Arc::default();
        let seen = Arc::clone(&flag);
        let worker = GenerationWorker::spawn(GatedGenerator { gate: gate_rx }, move |outcome| {
            let loading = seen
                .lock()
                .unwrap()
                .as_ref()
                .map(|flag| flag.load(Ordering::SeqCst))
                .unwrap_or(true);
            let _ = done_tx.send((outcome, loading));
        })
        .unwrap();
        *flag.lock().unwrap() = Some(Arc::clone(&worker.in_flight));
        (worker, gate_tx, done_rx)
    }

    #[test]
    fn rejects_blank_prompts() {
        let (worker, _gate, _done) = gated_worker();
        assert_eq!(worker.submit("   "), Err(SubmitError::EmptyPrompt));
        assert!(!worker.is_loading());
    }

    #[test]
    fn second_submit_while_loading_is_busy() {
        let (worker, gate, done) = gated_worker();

        worker.submit("first").unwrap();
        assert!(worker.is_loading());
        assert_eq!(worker.submit("second"), Err(SubmitError::Busy));

        gate.send(Ok("void main() {}".into())).unwrap();
        let (outcome, _) = done.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.prompt, "first");
        assert_eq!(outcome.result, Ok("void main() {}".to_string()));
        assert!(!worker.is_loading());

        worker.submit("third").unwrap();
        gate.send(Ok("void main() {}".into())).unwrap();
        let (outcome, _) = done.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.prompt, "third");
    }

    #[test]
    fn server_error_is_delivered_and_flag_resets() {
        let (worker, gate, done) = gated_worker();
        worker.submit("make it pulse").unwrap();

        let reported = interpret_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"rate limited"}"#,
        );
        gate.send(reported).unwrap();

        let (outcome, _) = done.recv_timeout(Duration::from_secs(5)).unwrap();
        let err = outcome.result.unwrap_err();
        assert_eq!(err.to_string(), "rate limited");
        assert!(!worker.is_loading());
    }

    #[test]
    fn flag_is_clear_when_callback_runs() {
        let (worker, gate, done) = gated_worker();
        worker.submit("stripes").unwrap();
        gate.send(Ok("void main() {}".into())).unwrap();

        let (_, loading) = done.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!loading);
    }

    #[test]
    fn dropping_with_request_in_flight_does_not_wait() {
        let (worker, gate, _done) = gated_worker();
        worker.submit("slow").unwrap();

        let started = Instant::now();
        drop(worker);
        assert!(started.elapsed() < Duration::from_secs(1));

        drop(gate);
    }

    #[test]
    fn dropping_idle_worker_joins_thread() {
        let (worker, gate, done) = gated_worker();
        worker.submit("quick").unwrap();
        gate.send(Ok("void main() {}".into())).unwrap();
        done.recv_timeout(Duration::from_secs(5)).unwrap();

        drop(worker);
        assert!(done.recv_timeout(Duration::from_secs(5)).is_err());
    }
}
