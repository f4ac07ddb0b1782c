//! `surrogate members` - show what the tracer proxy enumerates.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;

use crate::dynamic::DynamicDemo;

#[derive(Debug, Serialize)]
struct Listing {
    proxy_type: String,
    proxied_type: String,
    type_members: BTreeSet<String>,
    instance_members: BTreeSet<String>,
}

pub fn execute(json: bool) -> anyhow::Result<()> {
    let demo = DynamicDemo::new();
    let db = demo.trace(demo.database("Database", Duration::ZERO)?)?;

    let listing = Listing {
        proxy_type: demo.tracer.name().to_string(),
        proxied_type: demo.database.name().to_string(),
        type_members: demo.tracer.dir(),
        instance_members: db.dir()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("{} (proxies {})", listing.proxy_type, listing.proxied_type);
    println!();
    println!("Type members:");
    for name in &listing.type_members {
        println!("  {}", name);
    }
    println!();
    println!("Instance members:");
    for name in &listing.instance_members {
        let marker = if listing.type_members.contains(name) { "" } else { "  (storage)" };
        println!("  {}{}", name, marker);
    }
    Ok(())
}
