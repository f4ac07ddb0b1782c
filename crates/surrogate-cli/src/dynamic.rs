//! The traced database, built on the dynamic object model

use std::thread;
use std::time::{Duration, Instant};

use surrogate::{check_arity, proxy, Args, Class, ClassRef, ObjectRef, Signature, Value};
use tracing::info;

/// Classes of the dynamic demo
pub struct DynamicDemo {
    pub database: ClassRef,
    pub tracer: ClassRef,
}

impl DynamicDemo {
    pub fn new() -> Self {
        let database = database_class();
        let tracer = tracer_class(&database);
        DynamicDemo { database, tracer }
    }

    /// A database instance with the given label and latency
    pub fn database(&self, label: &str, latency: Duration) -> surrogate::Result<ObjectRef> {
        Class::instantiate(
            &self.database,
            Args::new()
                .arg(label)
                .arg(i64::try_from(latency.as_millis()).unwrap_or(i64::MAX)),
        )
    }

    /// Wrap `database` in a tracer proxy
    pub fn trace(&self, database: ObjectRef) -> surrogate::Result<ObjectRef> {
        proxy::create(&self.tracer, database, Args::new())
    }
}

impl Default for DynamicDemo {
    fn default() -> Self {
        Self::new()
    }
}

fn database_class() -> ClassRef {
    Class::builder("Database")
        .method("connect", |this, args| {
            check_arity("connect", args, 0)?;
            let label = this.get_attr("label")?;
            info!("{}: Connecting to database...", label);
            this.set_attr("connected", true);
            Ok(Value::from("Connected"))
        })
        .method("disconnect", |this, args| {
            check_arity("disconnect", args, 0)?;
            let label = this.get_attr("label")?;
            info!("{}: Disconnecting from database...", label);
            this.set_attr("connected", false);
            Ok(Value::None)
        })
        .method("execute_query", |this, args| {
            check_arity("execute_query", args, 1)?;
            let query = args[0].extract::<String>()?;
            let label = this.get_attr("label")?;
            let latency = this.get_attr("latency_ms")?.extract::<i64>()?;
            info!("{}: Executing query: {}", label, query);
            thread::sleep(Duration::from_millis(latency.max(0) as u64));
            Ok(Value::from(format!("Result for '{}'", query)))
        })
        .constructor(
            Signature::new()
                .param_with_default("label", "Database")
                .param_with_default("latency_ms", 0),
            |this, args| {
                this.set_attr("label", args.value("label"));
                this.set_attr("latency_ms", args.value("latency_ms"));
                this.set_attr("connected", false);
                Ok(())
            },
        )
        .build()
}

fn tracer_class(database: &ClassRef) -> ClassRef {
    let base = database.clone();
    let declared = Class::builder("DatabasePerformanceTracer")
        .base(database)
        .method("execute_query", move |this, args| {
            let query = args.first().cloned().unwrap_or_default();
            info!("[PERF_TRACE]: before execute {}", query);
            let start = Instant::now();
            let result = proxy::get(&base, this)?.call_method("execute_query", args)?;
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            info!(
                "[PERF_TRACE]: after execute {}, query took {:.2}ms",
                query, elapsed_ms
            );
            let total = this.get_attr("total_time")?.extract::<f64>()?;
            this.set_attr("total_time", total + elapsed_ms);
            Ok(result)
        })
        .method("summary", |this, args| {
            check_arity("summary", args, 0)?;
            let total = this.get_attr("total_time")?.extract::<f64>()?;
            Ok(Value::from(format!("Total time: {:.2}ms", total)))
        })
        .constructor(Signature::new(), |this, _| {
            this.set_attr("total_time", 0.0);
            Ok(())
        })
        .build();
    proxy::make_proxy_type(database, &declared)
}
