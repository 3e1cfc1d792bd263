use pacer_engine::{Config, OverflowPolicy, RouteConfig};
use std::path::Path;

pub fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(path).map_err(|e| format!("{}: {}", path.display(), e))?;

    println!("Configuration OK: {}", path.display());
    println!("  Tick: {:?}", config.effective_tick());
    if let Some(control) = config.control {
        println!("  Control: {}", control);
    }
    println!();
    println!(
        "{:<16} {:>8} {:>10} {:>12} {:<12} {:<22} {:<22}",
        "ROUTE", "CAPACITY", "THRESHOLD", "MAX LATENCY", "OVERFLOW", "LISTEN", "FORWARD"
    );
    for route in &config.routes {
        println!("{}", format_route(route));
    }

    Ok(())
}

fn format_route(route: &RouteConfig) -> String {
    let overflow = match route.overflow {
        OverflowPolicy::Reject => "reject",
        OverflowPolicy::DropOldest => "drop-oldest",
    };
    let addr = |a: Option<std::net::SocketAddr>| {
        a.map(|a| a.to_string()).unwrap_or_else(|| "-".into())
    };
    format!(
        "{:<16} {:>8} {:>10} {:>12} {:<12} {:<22} {:<22}",
        route.name.as_str(),
        route.capacity,
        route.occupancy_threshold,
        format!("{:?}", route.max_latency),
        overflow,
        addr(route.listen),
        addr(route.forward),
    )
}
