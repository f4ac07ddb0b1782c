//! Simulated database and its performance tracer (typed layer)

use std::thread;
use std::time::{Duration, Instant};

use surrogate::{delegatable, Proxy};
use tracing::info;

/// A database connection
#[delegatable(pointers)]
pub trait Database {
    /// Open the connection, returning a status line
    fn connect(&mut self) -> String;
    /// Close the connection
    fn disconnect(&mut self);
    /// Run a query, returning its result
    fn execute_query(&mut self, query: &str) -> String;
}

/// Database that sleeps instead of doing I/O
#[derive(Debug)]
pub struct SimulatedDatabase {
    label: String,
    latency: Duration,
    connected: bool,
    executed: usize,
}

impl SimulatedDatabase {
    pub fn new(label: impl Into<String>, latency: Duration) -> Self {
        SimulatedDatabase {
            label: label.into(),
            latency,
            connected: false,
            executed: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn executed(&self) -> usize {
        self.executed
    }
}

impl Database for SimulatedDatabase {
    fn connect(&mut self) -> String {
        info!("{}: Connecting to database...", self.label);
        self.connected = true;
        "Connected".to_string()
    }

    fn disconnect(&mut self) {
        info!("{}: Disconnecting from database...", self.label);
        self.connected = false;
    }

    fn execute_query(&mut self, query: &str) -> String {
        info!("{}: Executing query: {}", self.label, query);
        thread::sleep(self.latency);
        self.executed += 1;
        format!("Result for '{}'", query)
    }
}

/// Times every query; everything else is forwarded untouched.
#[derive(Debug, Default)]
pub struct PerformanceTracer {
    total: Duration,
    queries: usize,
}

impl PerformanceTracer {
    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn queries(&self) -> usize {
        self.queries
    }

    pub fn summary(&self) -> String {
        format!(
            "Total time: {:.2}ms over {} queries",
            self.total.as_secs_f64() * 1000.0,
            self.queries
        )
    }
}

impl<S: Database> DatabaseOverrides<S> for PerformanceTracer {
    fn execute_query(this: &mut Proxy<Self, S>, query: &str) -> String {
        info!("[PERF_TRACE]: before execute {}", query);
        let start = Instant::now();
        let result = this.get_mut().execute_query(query);
        let elapsed = start.elapsed();
        info!(
            "[PERF_TRACE]: after execute {}, query took {:.2}ms",
            query,
            elapsed.as_secs_f64() * 1000.0
        );
        this.total += elapsed;
        this.queries += 1;
        result
    }
}

/// A database wrapped by a [`PerformanceTracer`]
pub type TracedDatabase<S> = Proxy<PerformanceTracer, S>;
