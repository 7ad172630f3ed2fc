/// Where the observer sends what it recognized. Implementations must not
/// block: the observer calls these from its event path.
pub trait UsageSink: Send {
    /// One recognized scroll of `distance_meters` in `package`.
    fn record_scroll(&self, package: &str, distance_meters: f64);

    /// Foreground time of a finished (or checkpointed) session.
    fn record_usage(&self, package: &str, elapsed_millis: i64);

    fn record_tracking_app(&self, package: Option<&str>);
}

#[cfg(test)]
pub mod recording {
    use super::UsageSink;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum Recorded {
        Scroll(String, f64),
        Usage(String, i64),
        TrackingApp(Option<String>),
    }

    /// Sink that keeps every call for assertions.
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub calls: Arc<Mutex<Vec<Recorded>>>,
    }

    impl RecordingSink {
        pub fn calls(&self) -> Vec<Recorded> {
            self.calls.lock().unwrap().clone()
        }

        pub fn scrolls(&self) -> Vec<(String, f64)> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Recorded::Scroll(p, m) => Some((p, m)),
                    _ => None,
                })
                .collect()
        }

        pub fn usages(&self) -> Vec<(String, i64)> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Recorded::Usage(p, ms) => Some((p, ms)),
                    _ => None,
                })
                .collect()
        }
    }

    impl UsageSink for RecordingSink {
        fn record_scroll(&self, package: &str, distance_meters: f64) {
            self.calls.lock().unwrap().push(Recorded::Scroll(package.to_string(), distance_meters));
        }

        fn record_usage(&self, package: &str, elapsed_millis: i64) {
            self.calls.lock().unwrap().push(Recorded::Usage(package.to_string(), elapsed_millis));
        }

        fn record_tracking_app(&self, package: Option<&str>) {
            self.calls
                .lock()
                .unwrap()
                .push(Recorded::TrackingApp(package.map(str::to_string)));
        }
    }
}
