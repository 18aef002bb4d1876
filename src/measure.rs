//! Labelled, optionally timed results.

use std::{
    fmt,
    future::Future,
    time::{Duration, Instant},
};

use crate::trace::MEASUREMENT_TRACING_EVENT_TARGET;

/// The outcome of a labelled computation.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement<T> {
    pub label: String,
    pub value: T,
    /// Wall-clock time taken, when the computation was timed.
    pub elapsed: Option<Duration>,
}

impl<T> Measurement<T> {
    /// The elapsed time in whole milliseconds, when timed.
    pub fn elapsed_ms(&self) -> Option<u128> {
        self.elapsed.map(|elapsed| elapsed.as_millis())
    }
}

impl<T: fmt::Display> fmt::Display for Measurement<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: total page count {}", self.label, self.value)?;
        if let Some(ms) = self.elapsed_ms() {
            write!(f, " ({ms} ms)")?;
        }
        Ok(())
    }
}

/// Runs `op` and times it, logging the label, value and duration on success.
pub async fn timed<T, E, F, Fut>(label: impl Into<String>, op: F) -> Result<Measurement<T>, E>
where
    T: fmt::Debug,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let label = label.into();
    let start = Instant::now();
    let value = op().await?;
    let elapsed = start.elapsed();

    tracing::info!(
        target: MEASUREMENT_TRACING_EVENT_TARGET,
        label = label.as_str(),
        value = ?value,
        elapsed_ms = elapsed.as_millis() as u64,
        "measured"
    );

    Ok(Measurement {
        label,
        value,
        elapsed: Some(elapsed),
    })
}

/// Runs `op` without timing it.
pub async fn untimed<T, E, F, Fut>(label: impl Into<String>, op: F) -> Result<Measurement<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    Ok(Measurement {
        label: label.into(),
        value: op().await?,
        elapsed: None,
    })
}
