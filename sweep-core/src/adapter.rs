//! Interface to the external simulation, and scoped session handling.

use std::path::{Path, PathBuf};

use linked_hash_map::LinkedHashMap;

use crate::error::{Call, Error, Result};
use crate::{Float, Value};

/// Reporter values sampled after a single step, keyed by reporter name.
pub type SampleRow = LinkedHashMap<String, Float>;

/// Defines the interface used for driving an external simulation.
///
/// Calls are synchronous: each one returns only once the simulation has
/// responded. Implementations hold the simulation state between calls, so a
/// single adapter must never serve more than one run at a time.
pub trait SimAdapter {
    /// Loads the model, one-time setup done before any runs.
    fn load_model(&mut self, path: &Path) -> Result<()>;

    /// Sets a single named input.
    fn apply_parameter(&mut self, name: &str, value: &Value) -> Result<()>;

    /// Reinitializes the model to its start state.
    fn reset(&mut self) -> Result<()>;

    /// Advances the model one step at a time, sampling all requested
    /// reporters after each step. Returns `steps` rows in step order.
    fn sample_over_steps(&mut self, reporters: &[String], steps: usize) -> Result<Vec<SampleRow>>;

    /// Releases the session.
    fn close(&mut self) -> Result<()>;
}

impl<A: SimAdapter + ?Sized> SimAdapter for Box<A> {
    fn load_model(&mut self, path: &Path) -> Result<()> {
        (**self).load_model(path)
    }
    fn apply_parameter(&mut self, name: &str, value: &Value) -> Result<()> {
        (**self).apply_parameter(name, value)
    }
    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }
    fn sample_over_steps(&mut self, reporters: &[String], steps: usize) -> Result<Vec<SampleRow>> {
        (**self).sample_over_steps(reporters, steps)
    }
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Open simulation session with a loaded model.
///
/// `close` is called on the underlying adapter exactly once, either
/// explicitly through [`Session::close`] or when the session is dropped.
///
/// [`Session::close`]: struct.Session.html#method.close
pub struct Session<A: SimAdapter> {
    adapter: A,
    model: PathBuf,
    closed: bool,
}

impl<A: SimAdapter> Session<A> {
    /// Opens a session by loading the model at the given path.
    ///
    /// If loading fails the adapter is closed before returning the error.
    pub fn open(adapter: A, model: &Path) -> Result<Self> {
        let mut session = Session {
            adapter,
            model: model.to_path_buf(),
            closed: false,
        };
        debug!("loading model: {}", model.to_string_lossy());
        session.adapter.load_model(model)?;
        Ok(session)
    }

    pub fn model_path(&self) -> &Path {
        &self.model
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Closes the session, returning any error reported by the adapter.
    pub fn close(mut self) -> Result<()> {
        self.close_inner()
    }

    fn close_inner(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("closing simulation session");
        self.adapter.close()
    }
}

impl<A: SimAdapter> Drop for Session<A> {
    fn drop(&mut self) {
        if let Err(e) = self.close_inner() {
            warn!("failed closing simulation session: {}", e);
        }
    }
}

/// Runs `f` within a session, closing the session afterwards regardless of
/// the outcome.
///
/// An error returned by `f` takes precedence over an error from closing.
pub fn with_session<A, T, F>(adapter: A, model: &Path, f: F) -> Result<T>
where
    A: SimAdapter,
    F: FnOnce(&mut Session<A>) -> Result<T>,
{
    let mut session = Session::open(adapter, model)?;
    let out = f(&mut session);
    let closed = session.close();
    match (out, closed) {
        (Ok(t), Ok(())) => Ok(t),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            error!("failed closing simulation session: {}", close_err);
            Err(e)
        }
    }
}

/// Checks a batch of sampled rows against the requested reporters.
///
/// Missing or unexpected reporters are treated as a rejected sample call,
/// never silently filled in.
pub(crate) fn check_rows(rows: &[SampleRow], reporters: &[String], steps: usize) -> Result<()> {
    if rows.len() != steps {
        return Err(Error::command(
            Call::SampleOverSteps,
            format!("expected {} rows, got {}", steps, rows.len()),
        ));
    }
    for (step, row) in rows.iter().enumerate() {
        if row.len() != reporters.len() {
            let extra = row
                .keys()
                .find(|k| !reporters.contains(k))
                .cloned()
                .unwrap_or_default();
            return Err(Error::command(
                Call::SampleOverSteps,
                format!("unexpected reporter at step {}: {}", step, extra),
            ));
        }
        for reporter in reporters {
            if !row.contains_key(reporter) {
                return Err(Error::command(
                    Call::SampleOverSteps,
                    format!("missing reporter at step {}: {}", step, reporter),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Log, StubAdapter};

    #[test]
    fn session_closes_once_on_drop() {
        let adapter = StubAdapter::linear();
        let log = adapter.log();
        {
            let _session = Session::open(adapter, Path::new("model.nlogo")).unwrap();
        }
        assert_eq!(log.count(&Log::Close), 1);
    }

    #[test]
    fn explicit_close_is_not_repeated_on_drop() {
        let adapter = StubAdapter::linear();
        let log = adapter.log();
        let session = Session::open(adapter, Path::new("model.nlogo")).unwrap();
        session.close().unwrap();
        assert_eq!(log.count(&Log::Close), 1);
    }

    #[test]
    fn with_session_closes_on_failure() {
        let adapter = StubAdapter::linear();
        let log = adapter.log();
        let out: Result<()> = with_session(adapter, Path::new("model.nlogo"), |_| {
            Err(Error::command(Call::Reset, "boom"))
        });
        assert!(out.is_err());
        assert_eq!(log.count(&Log::Close), 1);
    }

    #[test]
    fn failed_load_still_closes() {
        let adapter = StubAdapter::linear().fail_on_load();
        let log = adapter.log();
        assert!(Session::open(adapter, Path::new("missing.nlogo")).is_err());
        assert_eq!(log.count(&Log::Close), 1);
    }

    #[test]
    fn rows_with_missing_reporter_rejected() {
        let reporters = vec!["x".to_string(), "y".to_string()];
        let mut row = SampleRow::new();
        row.insert("x".to_string(), 1.0);
        row.insert("z".to_string(), 1.0);
        assert!(check_rows(&[row], &reporters, 1).is_err());
        assert!(check_rows(&[], &reporters, 1).is_err());
    }
}
