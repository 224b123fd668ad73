use log::debug;

/// Receives human readable status lines, one stream per worker.
pub(crate) trait Progress: Sync {
    fn report(&self, worker: usize, message: &str);
}

/// Forwards progress lines to the `log` facade at debug level.
#[derive(Debug, Default)]
pub(crate) struct LogProgress;

impl Progress for LogProgress {
    fn report(&self, worker: usize, message: &str) {
        debug!("[worker {:>3}] {}", worker, message);
    }
}
