//! `surrogate trace` - run queries through a traced database.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use surrogate::{proxy, Proxy, Value};

use crate::config::DemoConfig;
use crate::database::{Database, SimulatedDatabase, TracedDatabase};
use crate::dynamic::DynamicDemo;

pub struct TraceOptions<'a> {
    pub config: Option<&'a Path>,
    pub latency_ms: Option<u64>,
    pub queries: Vec<String>,
    pub dynamic: bool,
}

pub fn execute(options: TraceOptions<'_>) -> anyhow::Result<()> {
    let config = match options.config {
        Some(path) => DemoConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DemoConfig::default(),
    };
    let config = config.with_overrides(options.latency_ms, options.queries);
    config.validate()?;
    tracing::debug!(?config, dynamic = options.dynamic, "trace configuration");

    if options.dynamic {
        run_dynamic(&config)
    } else {
        run_typed(&config)
    }
}

fn run_typed(config: &DemoConfig) -> anyhow::Result<()> {
    println!("--- Using {} with performance tracing proxy ---", config.label);
    let mut real = SimulatedDatabase::new(&config.label, Duration::from_millis(config.latency_ms));
    let expected: *const SimulatedDatabase = &real;

    {
        let mut db: TracedDatabase<&mut SimulatedDatabase> = Proxy::wrap(&mut real);
        println!("{}", db.connect());
        for query in &config.queries {
            println!("{}", db.execute_query(query));
        }
        db.disconnect();
        tracing::debug!(
            total_ms = db.total().as_secs_f64() * 1000.0,
            queries = db.queries(),
            connected = db.get().is_connected(),
            "tracer totals"
        );
        println!("{}", db.summary());

        println!();
        println!("--- Accessing the underlying database ---");
        let same = std::ptr::eq(&**db.get(), expected);
        println!("Underlying database is the one supplied: {}", same);
    }

    // Direct calls bypass the tracer.
    if let Some(query) = config.queries.first() {
        real.execute_query(query);
    }
    println!("Queries executed by the database: {}", real.executed());
    Ok(())
}

fn run_dynamic(config: &DemoConfig) -> anyhow::Result<()> {
    println!(
        "--- Using {} with performance tracing proxy (dynamic) ---",
        config.label
    );
    let demo = DynamicDemo::new();
    let real = demo.database(&config.label, Duration::from_millis(config.latency_ms))?;
    let db = demo.trace(real.clone())?;

    println!("{}", db.call_method("connect", &[])?);
    for query in &config.queries {
        let result = db.call_method("execute_query", &[Value::from(query.as_str())])?;
        println!("{}", result);
    }
    db.call_method("disconnect", &[])?;
    println!("{}", db.call_method("summary", &[])?);

    println!();
    println!("--- Accessing the underlying database ---");
    let original = proxy::get(&demo.database, &db)?;
    println!(
        "Underlying database is the one supplied: {}",
        original.ptr_eq(&real)
    );
    Ok(())
}
