use std::time::SystemTime;

use thiserror::Error;

use crate::{Job, JobMsg, JobStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("job is not running (status: {0})")]
    NotRunning(JobStatus),
    #[error("counters may not go backwards (current {current} -> {next_current}, ok {ok} -> {next_ok})")]
    CounterRegression {
        current: usize,
        ok: usize,
        next_current: usize,
        next_ok: usize,
    },
    #[error("counters out of range (ok {ok}, current {current}, total {total})")]
    CounterOutOfRange {
        ok: usize,
        current: usize,
        total: usize,
    },
}

/// Applies a message to a job. Rejected messages leave the job untouched.
///
/// `running` is the only state that accepts anything but `Log`; `done`,
/// `error` and `cancelled` are terminal.
pub fn update(job: &mut Job, msg: JobMsg) -> Result<(), TransitionError> {
    match msg {
        JobMsg::Log(line) => {
            job.logs.push(line);
        }
        _ if job.status.is_terminal() => {
            return Err(TransitionError::NotRunning(job.status));
        }
        JobMsg::Started { total } => {
            if total < job.current {
                return Err(TransitionError::CounterOutOfRange {
                    ok: job.ok,
                    current: job.current,
                    total,
                });
            }
            job.total = total;
        }
        JobMsg::Progress { current, ok } => {
            if current < job.current || ok < job.ok {
                return Err(TransitionError::CounterRegression {
                    current: job.current,
                    ok: job.ok,
                    next_current: current,
                    next_ok: ok,
                });
            }
            if ok > current || current > job.total {
                return Err(TransitionError::CounterOutOfRange {
                    ok,
                    current,
                    total: job.total,
                });
            }
            job.current = current;
            job.ok = ok;
        }
        JobMsg::CancelRequested => {
            job.cancel_requested = true;
        }
        JobMsg::Completed { archive } => {
            job.archive_path = Some(archive);
            finish(job, JobStatus::Done);
        }
        JobMsg::Failed { message } => {
            job.error = Some(message);
            finish(job, JobStatus::Error);
        }
        JobMsg::Cancelled => {
            finish(job, JobStatus::Cancelled);
        }
    }
    Ok(())
}

fn finish(job: &mut Job, status: JobStatus) {
    job.status = status;
    job.finished_at = Some(SystemTime::now());
}
