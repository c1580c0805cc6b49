//! In-process adapter used by unit tests.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::adapter::{SampleRow, SimAdapter};
use crate::error::{Call, Error, Result};
use crate::{Float, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Log {
    LoadModel,
    Apply(String, Value),
    Reset,
    Sample(usize),
    Close,
}

#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Log>>>);

impl CallLog {
    pub fn count(&self, entry: &Log) -> usize {
        self.0.borrow().iter().filter(|l| *l == entry).count()
    }

    pub fn entries(&self) -> Vec<Log> {
        self.0.borrow().clone()
    }

    fn push(&self, entry: Log) {
        self.0.borrow_mut().push(entry)
    }
}

type ValueFn = Box<dyn Fn(usize, usize, &str) -> Option<Float>>;

/// Deterministic stand-in for a simulation session.
///
/// Reporter values are computed from the replication number (counted by
/// resets) and the tick.
pub struct StubAdapter {
    values: ValueFn,
    log: CallLog,
    resets: usize,
    samples: usize,
    fail_load: bool,
    fail_sample: Option<usize>,
    reject_param: Option<String>,
}

impl StubAdapter {
    pub fn new(values: ValueFn) -> Self {
        StubAdapter {
            values,
            log: CallLog::default(),
            resets: 0,
            samples: 0,
            fail_load: false,
            fail_sample: None,
            reject_param: None,
        }
    }

    /// Reports `x = t` and `y = 2t` for every replication.
    pub fn linear() -> Self {
        Self::new(Box::new(|_, tick, reporter| match reporter {
            "x" => Some(tick as Float),
            "y" => Some(2.0 * tick as Float),
            _ => None,
        }))
    }

    pub fn fail_on_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Fails the n-th (zero based) sample call.
    pub fn fail_on_sample(mut self, n: usize) -> Self {
        self.fail_sample = Some(n);
        self
    }

    pub fn reject_param(mut self, name: &str) -> Self {
        self.reject_param = Some(name.to_string());
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl SimAdapter for StubAdapter {
    fn load_model(&mut self, _path: &Path) -> Result<()> {
        self.log.push(Log::LoadModel);
        if self.fail_load {
            return Err(Error::command(Call::LoadModel, "no such model"));
        }
        Ok(())
    }

    fn apply_parameter(&mut self, name: &str, value: &Value) -> Result<()> {
        self.log.push(Log::Apply(name.to_string(), value.clone()));
        if self.reject_param.as_deref() == Some(name) {
            return Err(Error::command(
                Call::ApplyParameter(name.to_string()),
                "nothing named this way",
            ));
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.log.push(Log::Reset);
        self.resets += 1;
        Ok(())
    }

    fn sample_over_steps(&mut self, reporters: &[String], steps: usize) -> Result<Vec<SampleRow>> {
        self.log.push(Log::Sample(steps));
        let n = self.samples;
        self.samples += 1;
        if self.fail_sample == Some(n) {
            return Err(Error::command(Call::SampleOverSteps, "runtime error"));
        }
        let replication = self.resets.saturating_sub(1);
        let mut rows = Vec::with_capacity(steps);
        for tick in 0..steps {
            let mut row = SampleRow::new();
            for reporter in reporters {
                let value = (self.values)(replication, tick, reporter).ok_or_else(|| {
                    Error::command(
                        Call::SampleOverSteps,
                        format!("unknown reporter: {}", reporter),
                    )
                })?;
                row.insert(reporter.clone(), value);
            }
            rows.push(row);
        }
        Ok(rows)
    }

    fn close(&mut self) -> Result<()> {
        self.log.push(Log::Close);
        Ok(())
    }
}
