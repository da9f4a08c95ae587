use chrono_tz::Tz;
use std::path::PathBuf;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn port(&self) -> String;
    /// Timezone the slot dates and times are entered in.
    fn timezone(&self) -> Tz;
    fn poll_interval_secs(&self) -> u64;
    fn example_data(&self) -> bool;
    /// JSON file with the sessions slots can be attached to.
    fn sessions_file(&self) -> Option<PathBuf>;
}
