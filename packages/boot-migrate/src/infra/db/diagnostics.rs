/// Process-wide counters for startup migration runs.
pub mod migration_counters {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static ATTEMPTS_TOTAL: AtomicUsize = AtomicUsize::new(0);
    static RETRIES_TOTAL: AtomicUsize = AtomicUsize::new(0);
    static ACQUISITION_FAILED_TOTAL: AtomicUsize = AtomicUsize::new(0);
    static VALIDATION_FAILED_TOTAL: AtomicUsize = AtomicUsize::new(0);
    static ENGINE_FAILED_TOTAL: AtomicUsize = AtomicUsize::new(0);
    static RELEASE_FAILED_TOTAL: AtomicUsize = AtomicUsize::new(0);
    static RUNS_SUCCEEDED_TOTAL: AtomicUsize = AtomicUsize::new(0);
    static RUNS_FAILED_TOTAL: AtomicUsize = AtomicUsize::new(0);

    pub fn attempt() {
        ATTEMPTS_TOTAL.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retry() {
        RETRIES_TOTAL.fetch_add(1, Ordering::Relaxed);
    }

    pub fn acquisition_failed() {
        ACQUISITION_FAILED_TOTAL.fetch_add(1, Ordering::Relaxed);
    }

    pub fn validation_failed() {
        VALIDATION_FAILED_TOTAL.fetch_add(1, Ordering::Relaxed);
    }

    pub fn engine_failed() {
        ENGINE_FAILED_TOTAL.fetch_add(1, Ordering::Relaxed);
    }

    pub fn release_failed() {
        RELEASE_FAILED_TOTAL.fetch_add(1, Ordering::Relaxed);
    }

    pub fn run_succeeded() {
        RUNS_SUCCEEDED_TOTAL.fetch_add(1, Ordering::Relaxed);
    }

    pub fn run_failed() {
        RUNS_FAILED_TOTAL.fetch_add(1, Ordering::Relaxed);
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct Snapshot {
        pub attempts_total: usize,
        pub retries_total: usize,
        pub acquisition_failed_total: usize,
        pub validation_failed_total: usize,
        pub engine_failed_total: usize,
        pub release_failed_total: usize,
        pub runs_succeeded_total: usize,
        pub runs_failed_total: usize,
    }

    pub fn snapshot() -> Snapshot {
        Snapshot {
            attempts_total: ATTEMPTS_TOTAL.load(Ordering::Relaxed),
            retries_total: RETRIES_TOTAL.load(Ordering::Relaxed),
            acquisition_failed_total: ACQUISITION_FAILED_TOTAL.load(Ordering::Relaxed),
            validation_failed_total: VALIDATION_FAILED_TOTAL.load(Ordering::Relaxed),
            engine_failed_total: ENGINE_FAILED_TOTAL.load(Ordering::Relaxed),
            release_failed_total: RELEASE_FAILED_TOTAL.load(Ordering::Relaxed),
            runs_succeeded_total: RUNS_SUCCEEDED_TOTAL.load(Ordering::Relaxed),
            runs_failed_total: RUNS_FAILED_TOTAL.load(Ordering::Relaxed),
        }
    }

    pub fn log_snapshot(context: &str) {
        let s = snapshot();
        tracing::info!(
            context = context,
            attempts_total = s.attempts_total,
            retries_total = s.retries_total,
            acquisition_failed_total = s.acquisition_failed_total,
            validation_failed_total = s.validation_failed_total,
            engine_failed_total = s.engine_failed_total,
            release_failed_total = s.release_failed_total,
            runs_succeeded_total = s.runs_succeeded_total,
            runs_failed_total = s.runs_failed_total,
            "boot_migration_counters_snapshot"
        );
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn counters_only_grow() {
            let before = snapshot();
            attempt();
            retry();
            release_failed();
            let after = snapshot();

            assert!(after.attempts_total > before.attempts_total);
            assert!(after.retries_total > before.retries_total);
            assert!(after.release_failed_total > before.release_failed_total);
            assert!(after.runs_succeeded_total >= before.runs_succeeded_total);
        }
    }
}
