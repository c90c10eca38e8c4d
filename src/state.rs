use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use crate::models::{Position, Priority, StockyardConfig};

/// Lifecycle order; later stages compare greater.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    Loading,
    Loaded,
    InTransit,
    Delivering,
    Delivered,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Loading => "loading",
            OrderStatus::Loaded => "loaded",
            OrderStatus::InTransit => "in-transit",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Delivered => "delivered",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub material: String,
    pub quantity: u32,
    pub priority: Priority,
    pub destination: String,
    pub status: OrderStatus,
    pub created_at: u64,
    pub assigned_rake: Option<String>,
    pub stockyard: Option<String>,
    pub estimated_delivery: Option<u64>,
    pub actual_delivery: Option<u64>,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_delivered(&self) -> bool {
        self.status == OrderStatus::Delivered
    }
}

/// An order as submitted to the engine, before it gets an id and timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub material: String,
    pub quantity: u32,
    pub priority: Priority,
    pub destination: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RakeStatus {
    Available,
    Assigned,
    MovingToLoad,
    Loading,
    Loaded,
    InTransit,
    Delivering,
    Returning,
}

impl fmt::Display for RakeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RakeStatus::Available => "available",
            RakeStatus::Assigned => "assigned",
            RakeStatus::MovingToLoad => "moving-to-load",
            RakeStatus::Loading => "loading",
            RakeStatus::Loaded => "loaded",
            RakeStatus::InTransit => "in-transit",
            RakeStatus::Delivering => "delivering",
            RakeStatus::Returning => "returning",
        };
        f.write_str(label)
    }
}

/// A timed movement between two points, interpolated on demand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    pub from: Position,
    pub to: Position,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl Motion {
    pub fn fraction_at(&self, time_ms: u64) -> f64 {
        if self.end_ms <= self.start_ms || time_ms >= self.end_ms {
            return 1.0;
        }
        if time_ms <= self.start_ms {
            return 0.0;
        }
        (time_ms - self.start_ms) as f64 / (self.end_ms - self.start_ms) as f64
    }

    pub fn position_at(&self, time_ms: u64) -> Position {
        self.from.lerp(&self.to, self.fraction_at(time_ms))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rake {
    pub id: String,
    pub capacity: u32,
    pub status: RakeStatus,
    pub position: Position,
    /// Index into `EngineState::orders`.
    pub current_order: Option<usize>,
    /// Index into `EngineState::stockyards` for the current trip.
    pub stockyard: Option<usize>,
    pub load_progress: u8,
    pub motion: Option<Motion>,
    pub loading_window: Option<(u64, u64)>,
}

impl Rake {
    pub fn new(id: String, capacity: u32, position: Position) -> Self {
        Self {
            id,
            capacity,
            status: RakeStatus::Available,
            position,
            current_order: None,
            stockyard: None,
            load_progress: 0,
            motion: None,
            loading_window: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == RakeStatus::Available
    }

    pub fn position_at(&self, time_ms: u64) -> Position {
        match self.motion {
            Some(motion) => motion.position_at(time_ms),
            None => self.position,
        }
    }

    pub fn load_progress_at(&self, time_ms: u64) -> u8 {
        match (self.status, self.loading_window) {
            (RakeStatus::Loading, Some((start, end))) => {
                let motion = Motion {
                    from: Position::default(),
                    to: Position::default(),
                    start_ms: start,
                    end_ms: end,
                };
                (motion.fraction_at(time_ms) * 100.0).round() as u8
            }
            _ => self.load_progress,
        }
    }

    /// Starts a movement at `now`, settling any movement in progress first.
    pub fn begin_motion(&mut self, to: Position, now: u64, duration_ms: u64) {
        let from = self.position_at(now);
        self.position = from;
        self.motion = Some(Motion {
            from,
            to,
            start_ms: now,
            end_ms: now + duration_ms,
        });
    }

    pub fn settle_at(&mut self, now: u64) {
        self.position = self.position_at(now);
        self.motion = None;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stockyard {
    pub name: String,
    pub position: Position,
    pub materials: BTreeMap<String, u32>,
    /// Stock promised to assigned orders that have not finished loading.
    pub reserved: BTreeMap<String, u32>,
    pub loading_capacity: usize,
    /// Rake indices occupying loading slots.
    pub current_loading: Vec<usize>,
    /// Rake indices waiting for a free slot, FIFO.
    pub waiting: VecDeque<usize>,
}

impl Stockyard {
    pub fn from_config(config: &StockyardConfig) -> Self {
        Self {
            name: config.name.clone(),
            position: config.position,
            materials: config.materials.clone(),
            reserved: BTreeMap::new(),
            loading_capacity: config.loading_capacity,
            current_loading: Vec::new(),
            waiting: VecDeque::new(),
        }
    }

    pub fn stock(&self, material: &str) -> u32 {
        self.materials.get(material).copied().unwrap_or(0)
    }

    /// Stock not yet promised to an assigned order.
    pub fn unreserved(&self, material: &str) -> u32 {
        let reserved = self.reserved.get(material).copied().unwrap_or(0);
        self.stock(material).saturating_sub(reserved)
    }

    pub fn can_supply(&self, material: &str, quantity: u32) -> bool {
        quantity > 0 && self.unreserved(material) >= quantity
    }

    pub fn has_free_slot(&self) -> bool {
        self.current_loading.len() < self.loading_capacity
    }

    pub fn reserve(&mut self, material: &str, quantity: u32) {
        *self.reserved.entry(material.to_string()).or_insert(0) += quantity;
    }

    /// Removes a finished load from stock and releases its reservation.
    pub fn withdraw(&mut self, material: &str, quantity: u32) {
        if let Some(reserved) = self.reserved.get_mut(material) {
            *reserved = reserved.saturating_sub(quantity);
        }
        if let Some(stock) = self.materials.get_mut(material) {
            *stock = stock.saturating_sub(quantity);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_orders: u64,
    pub completed_orders: u64,
    pub pending_orders: u64,
    pub on_time_deliveries: u64,
    pub transport_costs: f64,
    pub penalty_costs: f64,
    pub material_delivered: BTreeMap<String, u64>,
}

impl Metrics {
    pub fn total_cost(&self) -> f64 {
        self.transport_costs + self.penalty_costs
    }

    pub fn on_time_rate(&self) -> f64 {
        if self.completed_orders == 0 {
            return 0.0;
        }
        self.on_time_deliveries as f64 / self.completed_orders as f64 * 100.0
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogKind {
    Order,
    Assignment,
    Loading,
    Transit,
    Delay,
    Delivery,
    Advisory,
    Control,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    pub time_ms: u64,
    pub kind: LogKind,
    pub message: String,
}

/// Most-recent-first bounded log.
#[derive(Clone, Debug)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, time_ms: u64, kind: LogKind, message: String) {
        tracing::debug!(time_ms, ?kind, "{}", message);
        self.entries.push_front(LogEntry {
            time_ms,
            kind,
            message,
        });
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        self.entries.iter().take(count).cloned().collect()
    }
}

#[derive(Clone, Debug)]
pub struct EngineState {
    pub time_ms: u64,
    pub rakes: Vec<Rake>,
    pub stockyards: Vec<Stockyard>,
    pub orders: Vec<Order>,
    pub metrics: Metrics,
    pub log: EventLog,
}

impl EngineState {
    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == id)
    }

    pub fn rake(&self, id: &str) -> Option<&Rake> {
        self.rakes.iter().find(|rake| rake.id == id)
    }

    pub fn stockyard(&self, name: &str) -> Option<&Stockyard> {
        self.stockyards.iter().find(|yard| yard.name == name)
    }

    /// Describes every broken data-model invariant; empty when consistent.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for order in &self.orders {
            if order.is_pending() != order.assigned_rake.is_none() {
                violations.push(format!(
                    "{} is {} with assigned rake {:?}",
                    order.id, order.status, order.assigned_rake
                ));
            }
            if order.is_delivered() != order.actual_delivery.is_some() {
                violations.push(format!(
                    "{} is {} with actual delivery {:?}",
                    order.id, order.status, order.actual_delivery
                ));
            }
        }

        for rake in &self.rakes {
            if rake.is_available() == rake.current_order.is_some() {
                violations.push(format!(
                    "{} is {} with current order {:?}",
                    rake.id, rake.status, rake.current_order
                ));
            }
            if rake.is_available() && rake.load_progress != 0 {
                violations.push(format!(
                    "{} is available with load progress {}",
                    rake.id, rake.load_progress
                ));
            }
        }

        for yard in &self.stockyards {
            if yard.current_loading.len() > yard.loading_capacity {
                violations.push(format!(
                    "{} has {} rakes loading with {} slots",
                    yard.name,
                    yard.current_loading.len(),
                    yard.loading_capacity
                ));
            }
            for (material, reserved) in &yard.reserved {
                if *reserved > yard.stock(material) {
                    violations.push(format!(
                        "{} reserves {} of {} with {} in stock",
                        yard.name,
                        reserved,
                        material,
                        yard.stock(material)
                    ));
                }
            }
        }

        let open = self.orders.iter().filter(|order| !order.is_delivered()).count() as u64;
        if open != self.metrics.pending_orders {
            violations.push(format!(
                "pending_orders is {} with {} undelivered orders",
                self.metrics.pending_orders, open
            ));
        }

        violations
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RakeView {
    pub id: String,
    pub capacity: u32,
    pub status: RakeStatus,
    pub position: Position,
    pub current_order: Option<String>,
    pub load_progress: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockyardView {
    pub name: String,
    pub position: Position,
    pub materials: BTreeMap<String, u32>,
    pub loading_capacity: usize,
    pub current_loading: Vec<String>,
    pub waiting: Vec<String>,
}

/// Pure view of the engine at one instant, ready to render or broadcast.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub time_ms: u64,
    pub is_running: bool,
    pub is_paused: bool,
    pub speed: f64,
    pub strategy: String,
    pub rakes: Vec<RakeView>,
    pub stockyards: Vec<StockyardView>,
    pub active_orders: Vec<Order>,
    pub metrics: Metrics,
    pub events: Vec<LogEntry>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            time_ms: 0,
            is_running: false,
            is_paused: false,
            speed: 1.0,
            strategy: String::new(),
            rakes: Vec::new(),
            stockyards: Vec::new(),
            active_orders: Vec::new(),
            metrics: Metrics::default(),
            events: Vec::new(),
        }
    }
}
