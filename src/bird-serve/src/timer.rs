use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

/// Wall-clock stopwatch that logs when a named step starts and how long it took.
pub struct Timer {
    name: String,
    tstamp: Option<DateTime<Utc>>,
    duration: Option<Duration>,
}

impl Timer {
    /// Create a new, stopped timer
    pub fn new(name: &str) -> Self {
        Timer {
            name: name.to_owned(),
            tstamp: None,
            duration: None,
        }
    }

    pub fn new_start(name: &str) -> Self {
        let mut t = Timer::new(name);
        t.start();
        t
    }

    /// Start the timer
    pub fn start(&mut self) {
        debug!("{}: starting", self.name);

        self.tstamp = Some(Utc::now());
        self.duration = None;
    }

    /// Stop the timer and log the elapsed time
    pub fn stop(&mut self) {
        match self.tstamp {
            None => debug!("{}: not running!", self.name),
            Some(tstamp) => {
                let d = Utc::now() - tstamp;

                self.duration = Some(d);
                self.tstamp = None;
                info!("{} duration: {} msec", self.name, d.num_milliseconds());
            }
        }
    }

    /// Duration of the last completed run in milliseconds, 0 if it never stopped
    pub fn millis(&self) -> i64 {
        self.duration.map_or(0, |d| d.num_milliseconds())
    }

    pub fn is_running(&self) -> bool {
        self.tstamp.is_some()
    }
}
