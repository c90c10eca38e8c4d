use std::fmt::Write;

use crate::state::Snapshot;

pub trait Formatter {
    fn write(&self, snapshot: &Snapshot) -> String;
}

pub struct HumanFormatter;
pub struct SummaryFormatter;
pub struct JsonFormatter;

impl Formatter for HumanFormatter {
    fn write(&self, snapshot: &Snapshot) -> String {
        let mut out = String::new();
        write_metadata(&mut out, snapshot);
        write_metrics(&mut out, snapshot);

        out.push_str("Stockyards:\n");
        for yard in &snapshot.stockyards {
            let stock = yard
                .materials
                .iter()
                .map(|(material, tons)| format!("{} {}t", material, tons))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                out,
                "- {}: {} (loading {}/{}, waiting {})",
                yard.name,
                stock,
                yard.current_loading.len(),
                yard.loading_capacity,
                yard.waiting.len()
            );
        }

        out.push_str("Rakes:\n");
        for rake in &snapshot.rakes {
            let _ = write!(
                out,
                "- {} {} at ({:.1}, {:.1})",
                rake.id, rake.status, rake.position.x, rake.position.y
            );
            if let Some(order) = &rake.current_order {
                let _ = write!(out, " with {}", order);
            }
            if rake.load_progress > 0 {
                let _ = write!(out, " [{}%]", rake.load_progress);
            }
            out.push('\n');
        }

        out.push_str("Active orders:\n");
        if snapshot.active_orders.is_empty() {
            out.push_str("(none)\n");
        }
        for order in &snapshot.active_orders {
            let _ = write!(
                out,
                "- {} {}t {} to {} ({}) {}",
                order.id,
                order.quantity,
                order.material,
                order.destination,
                order.priority,
                order.status
            );
            if let Some(rake) = &order.assigned_rake {
                let _ = write!(out, " by {}", rake);
            }
            out.push('\n');
        }

        out.push_str("Recent events:\n");
        if snapshot.events.is_empty() {
            out.push_str("(none)\n");
        }
        for entry in &snapshot.events {
            let _ = writeln!(
                out,
                "[{}] {}",
                format_clock(entry.time_ms),
                entry.message
            );
        }

        out
    }
}

impl Formatter for SummaryFormatter {
    fn write(&self, snapshot: &Snapshot) -> String {
        let mut out = String::new();
        write_metadata(&mut out, snapshot);
        write_metrics(&mut out, snapshot);
        out
    }
}

impl Formatter for JsonFormatter {
    fn write(&self, snapshot: &Snapshot) -> String {
        match serde_json::to_string_pretty(snapshot) {
            Ok(json) => format!("{}\n", json),
            Err(err) => format!("{{\"error\":\"{}\"}}\n", err),
        }
    }
}

/// One-line progress report used by the live driver.
pub fn status_line(snapshot: &Snapshot) -> String {
    let metrics = &snapshot.metrics;
    format!(
        "[{}] orders {}/{} delivered, {} pending, on-time {:.1}%, cost {:.2}",
        format_clock(snapshot.time_ms),
        metrics.completed_orders,
        metrics.total_orders,
        metrics.pending_orders,
        metrics.on_time_rate(),
        metrics.total_cost()
    )
}

fn write_metadata(out: &mut String, snapshot: &Snapshot) {
    out.push_str("Metadata:\n");
    let _ = writeln!(out, "strategy: {}", snapshot.strategy);
    let _ = writeln!(out, "time: {}", format_clock(snapshot.time_ms));
    let _ = writeln!(out, "rakes: {}", snapshot.rakes.len());
}

fn write_metrics(out: &mut String, snapshot: &Snapshot) {
    let metrics = &snapshot.metrics;
    out.push_str("Summary:\n");
    let _ = writeln!(out, "total orders: {}", metrics.total_orders);
    let _ = writeln!(out, "completed orders: {}", metrics.completed_orders);
    let _ = writeln!(out, "pending orders: {}", metrics.pending_orders);
    let _ = writeln!(
        out,
        "on-time deliveries: {} ({:.1}%)",
        metrics.on_time_deliveries,
        metrics.on_time_rate()
    );
    let _ = writeln!(out, "transport costs: {:.2}", metrics.transport_costs);
    let _ = writeln!(out, "penalty costs: {:.2}", metrics.penalty_costs);
    let _ = writeln!(out, "total cost: {:.2}", metrics.total_cost());
    for (material, tons) in &metrics.material_delivered {
        let _ = writeln!(out, "delivered {}: {}t", material, tons);
    }
}

/// Formats virtual milliseconds as `HH:MM:SS`.
pub fn format_clock(time_ms: u64) -> String {
    let secs = time_ms / 1_000;
    format!("{:02}:{:02}:{:02}", secs / 3_600, secs / 60 % 60, secs % 60)
}
