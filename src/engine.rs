use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::algorithms::{build_strategy, rake_fits, AssignmentContext, AssignmentStrategy};
use crate::error::{Error, Result};
use crate::events::{Event, Scheduler};
use crate::models::{Position, Priority, SimConfig, MIN_DELAY_MS};
use crate::state::{
    EngineState, EventLog, LogKind, Metrics, Order, OrderRequest, OrderStatus, Rake, RakeStatus,
    RakeView, Snapshot, Stockyard, StockyardView,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Stall {
    NoStock,
    NoRake,
}

pub struct SimulationEngine {
    config: SimConfig,
    state: EngineState,
    scheduler: Scheduler,
    strategy: Box<dyn AssignmentStrategy>,
    rng: StdRng,
    running: bool,
    paused: bool,
    stopped: bool,
    speed: f64,
    stalls: HashMap<usize, Stall>,
}

impl SimulationEngine {
    pub fn new(config: SimConfig, strategy: Box<dyn AssignmentStrategy>) -> Result<Self> {
        validate_config(&config)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = init_state(&config);

        Ok(Self {
            config,
            state,
            scheduler: Scheduler::new(),
            strategy,
            rng,
            running: false,
            paused: false,
            stopped: false,
            speed: 1.0,
            stalls: HashMap::new(),
        })
    }

    pub fn from_config(config: SimConfig) -> Result<Self> {
        let strategy = build_strategy(config.strategy);
        Self::new(config, strategy)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn metrics(&self) -> &Metrics {
        &self.state.metrics
    }

    pub fn now_ms(&self) -> u64 {
        self.state.time_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    /// Starts order generation. A stopped engine is reset first.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        if self.stopped {
            self.reset();
        }
        self.running = true;
        self.paused = false;
        info!(strategy = self.strategy.name(), "simulation started");
        self.log(LogKind::Control, "Simulation started".to_string());
        if self.config.generation.enabled {
            self.schedule_generation();
        }
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            info!(time_ms = self.state.time_ms, "simulation paused");
            self.log(LogKind::Control, "Simulation paused".to_string());
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            info!(time_ms = self.state.time_ms, "simulation resumed");
            self.log(LogKind::Control, "Simulation resumed".to_string());
        }
    }

    /// Cancels every scheduled event; state is kept until the next `start`.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.scheduler.clear();
        self.running = false;
        self.paused = false;
        self.stopped = true;
        info!(time_ms = self.state.time_ms, "simulation stopped");
        self.log(LogKind::Control, "Simulation stopped".to_string());
    }

    /// Rebuilds the initial state; the rng keeps its position.
    pub fn reset(&mut self) {
        self.scheduler.clear();
        self.state = init_state(&self.config);
        self.stalls.clear();
        self.running = false;
        self.paused = false;
        self.stopped = false;
        debug!("simulation reset");
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(Error::InvalidSpeed(speed));
        }
        self.speed = speed;
        self.log(LogKind::Control, format!("Speed set to {}x", speed));
        Ok(())
    }

    /// Creates an order at the current time and tries to assign it.
    pub fn submit_order(&mut self, request: OrderRequest) -> Result<String> {
        if self.destination_position(&request.destination).is_none() {
            return Err(Error::UnknownDestination(request.destination));
        }
        if request.quantity == 0 {
            return Err(Error::InvalidQuantity(request.quantity));
        }

        let idx = self.state.orders.len();
        let id = format!("ORD-{:04}", idx + 1);
        self.state.orders.push(Order {
            id: id.clone(),
            material: request.material,
            quantity: request.quantity,
            priority: request.priority,
            destination: request.destination,
            status: OrderStatus::Pending,
            created_at: self.state.time_ms,
            assigned_rake: None,
            stockyard: None,
            estimated_delivery: None,
            actual_delivery: None,
        });
        self.state.metrics.total_orders += 1;
        self.state.metrics.pending_orders += 1;

        let order = &self.state.orders[idx];
        let message = format!(
            "{} created: {}t {} to {} ({} priority)",
            order.id, order.quantity, order.material, order.destination, order.priority
        );
        self.log(LogKind::Order, message);
        self.try_assign(idx);

        Ok(id)
    }

    /// Processes the next scheduled event regardless of its time.
    pub fn step(&mut self) -> Option<u64> {
        if self.paused {
            return None;
        }
        let scheduled = self.scheduler.pop()?;
        self.state.time_ms = self.state.time_ms.max(scheduled.time_ms);
        self.handle(scheduled.event);
        Some(self.state.time_ms)
    }

    /// Processes every event due by `until_ms` and moves the clock there.
    /// Returns the number of events handled; a paused engine does nothing.
    pub fn run_until(&mut self, until_ms: u64) -> usize {
        if self.paused {
            return 0;
        }
        let mut handled = 0;
        while let Some(scheduled) = self.scheduler.pop_due(until_ms) {
            self.state.time_ms = self.state.time_ms.max(scheduled.time_ms);
            self.handle(scheduled.event);
            handled += 1;
        }
        self.state.time_ms = self.state.time_ms.max(until_ms);
        handled
    }

    pub fn advance(&mut self, delta_ms: u64) -> usize {
        let until = self.state.time_ms.saturating_add(delta_ms);
        self.run_until(until)
    }

    pub fn snapshot(&self) -> Snapshot {
        let now = self.state.time_ms;
        let rakes = self
            .state
            .rakes
            .iter()
            .map(|rake| RakeView {
                id: rake.id.clone(),
                capacity: rake.capacity,
                status: rake.status,
                position: rake.position_at(now),
                current_order: rake
                    .current_order
                    .map(|idx| self.state.orders[idx].id.clone()),
                load_progress: rake.load_progress_at(now),
            })
            .collect();
        let stockyards = self
            .state
            .stockyards
            .iter()
            .map(|yard| StockyardView {
                name: yard.name.clone(),
                position: yard.position,
                materials: yard.materials.clone(),
                loading_capacity: yard.loading_capacity,
                current_loading: self.rake_ids(yard.current_loading.iter()),
                waiting: self.rake_ids(yard.waiting.iter()),
            })
            .collect();
        let mut active_orders: Vec<Order> = self
            .state
            .orders
            .iter()
            .rev()
            .filter(|order| !order.is_delivered())
            .take(self.config.view.active_orders)
            .cloned()
            .collect();
        active_orders.reverse();

        Snapshot {
            time_ms: now,
            is_running: self.running,
            is_paused: self.paused,
            speed: self.speed,
            strategy: self.strategy.name().to_string(),
            rakes,
            stockyards,
            active_orders,
            metrics: self.state.metrics.clone(),
            events: self.state.log.recent(self.config.view.recent_events),
        }
    }

    fn rake_ids<'a>(&self, indices: impl Iterator<Item = &'a usize>) -> Vec<String> {
        indices
            .map(|idx| self.state.rakes[*idx].id.clone())
            .collect()
    }

    fn handle(&mut self, event: Event) {
        debug!(time_ms = self.state.time_ms, ?event, "handling event");
        match event {
            Event::GenerateOrder => self.on_generate(),
            Event::DispatchRake { rake } => self.on_dispatch(rake),
            Event::ArriveAtStockyard { rake } => self.on_arrive_at_stockyard(rake),
            Event::LoadingComplete { rake } => self.on_loading_complete(rake),
            Event::Depart { rake } => self.on_depart(rake),
            Event::ArriveAtDestination { rake } => self.on_arrive_at_destination(rake),
            Event::DeliveryComplete { rake } => self.on_delivery_complete(rake),
            Event::RakeReturned { rake } => self.on_rake_returned(rake),
        }
    }

    fn on_generate(&mut self) {
        if !self.running {
            return;
        }
        self.retry_pending();
        let request = self.random_order();
        if let Err(err) = self.submit_order(request) {
            warn!(%err, "generated order rejected");
        }
        self.schedule_generation();
    }

    fn on_dispatch(&mut self, rake_idx: usize) {
        let Some(yard_idx) = self.state.rakes[rake_idx].stockyard else {
            warn!(rake = rake_idx, "dispatch without stockyard");
            return;
        };
        let now = self.state.time_ms;
        let travel = self.config.timing.move_to_load_ms;
        let target = self.state.stockyards[yard_idx].position;
        let rake = &mut self.state.rakes[rake_idx];
        rake.status = RakeStatus::MovingToLoad;
        rake.begin_motion(target, now, travel);
        let message = format!(
            "{} moving to {}",
            rake.id, self.state.stockyards[yard_idx].name
        );
        self.log(LogKind::Transit, message);
        self.scheduler
            .schedule(now + travel, Event::ArriveAtStockyard { rake: rake_idx });
    }

    fn on_arrive_at_stockyard(&mut self, rake_idx: usize) {
        let now = self.state.time_ms;
        let Some(yard_idx) = self.state.rakes[rake_idx].stockyard else {
            warn!(rake = rake_idx, "arrival without stockyard");
            return;
        };
        self.state.rakes[rake_idx].settle_at(now);

        if self.state.stockyards[yard_idx].has_free_slot() {
            self.start_loading(rake_idx, yard_idx);
        } else {
            self.state.stockyards[yard_idx].waiting.push_back(rake_idx);
            let message = format!(
                "{} waiting for a loading slot at {}",
                self.state.rakes[rake_idx].id, self.state.stockyards[yard_idx].name
            );
            self.log(LogKind::Advisory, message);
        }
    }

    fn start_loading(&mut self, rake_idx: usize, yard_idx: usize) {
        let Some(order_idx) = self.state.rakes[rake_idx].current_order else {
            warn!(rake = rake_idx, "loading without order");
            return;
        };
        let now = self.state.time_ms;
        let timing = &self.config.timing;
        let duration = self
            .rng
            .gen_range(timing.min_loading_ms..=timing.max_loading_ms);

        self.state.stockyards[yard_idx]
            .current_loading
            .push(rake_idx);
        let rake = &mut self.state.rakes[rake_idx];
        rake.status = RakeStatus::Loading;
        rake.load_progress = 0;
        rake.loading_window = Some((now, now + duration));
        let order = &mut self.state.orders[order_idx];
        order.status = OrderStatus::Loading;

        let message = format!(
            "{} loading {}t {} at {} ({})",
            self.state.rakes[rake_idx].id,
            order.quantity,
            order.material,
            self.state.stockyards[yard_idx].name,
            format_secs(duration)
        );
        self.log(LogKind::Loading, message);
        self.scheduler
            .schedule(now + duration, Event::LoadingComplete { rake: rake_idx });
    }

    fn on_loading_complete(&mut self, rake_idx: usize) {
        let (Some(order_idx), Some(yard_idx)) = (
            self.state.rakes[rake_idx].current_order,
            self.state.rakes[rake_idx].stockyard,
        ) else {
            warn!(rake = rake_idx, "loading finished without order");
            return;
        };
        let now = self.state.time_ms;

        let order = &mut self.state.orders[order_idx];
        order.status = OrderStatus::Loaded;
        let yard = &mut self.state.stockyards[yard_idx];
        yard.withdraw(&order.material, order.quantity);
        yard.current_loading.retain(|idx| *idx != rake_idx);
        let rake = &mut self.state.rakes[rake_idx];
        rake.status = RakeStatus::Loaded;
        rake.load_progress = 100;
        rake.loading_window = None;

        let message = format!(
            "{} loaded {} at {} ({} {}t left)",
            rake.id,
            order.id,
            yard.name,
            order.material,
            yard.stock(&order.material)
        );
        self.log(LogKind::Loading, message);
        self.scheduler.schedule(
            now + self.config.timing.departure_ms,
            Event::Depart { rake: rake_idx },
        );

        if let Some(next) = self.state.stockyards[yard_idx].waiting.pop_front() {
            self.start_loading(next, yard_idx);
        }
    }

    fn on_depart(&mut self, rake_idx: usize) {
        let Some(order_idx) = self.state.rakes[rake_idx].current_order else {
            warn!(rake = rake_idx, "departure without order");
            return;
        };
        let now = self.state.time_ms;
        let timing = self.config.timing.clone();
        let base = self
            .rng
            .gen_range(timing.min_transit_ms..=timing.max_transit_ms);
        let delay = if self.rng.gen_bool(timing.delay_probability) {
            self.rng.gen_range(MIN_DELAY_MS..=timing.max_delay_ms)
        } else {
            0
        };
        let destination = self.state.orders[order_idx].destination.clone();
        let target = self
            .destination_position(&destination)
            .unwrap_or(self.config.depot);

        let order = &mut self.state.orders[order_idx];
        order.status = OrderStatus::InTransit;
        order.estimated_delivery = Some(now + base);
        let rake = &mut self.state.rakes[rake_idx];
        rake.status = RakeStatus::InTransit;
        rake.begin_motion(target, now, base + delay);

        let message = format!(
            "{} departed for {} with {} (transit {})",
            rake.id,
            destination,
            order.id,
            format_secs(base)
        );
        self.log(LogKind::Transit, message);
        if delay > 0 {
            let message = format!(
                "{} delayed by {} en route to {}",
                self.state.rakes[rake_idx].id,
                format_secs(delay),
                destination
            );
            self.log(LogKind::Delay, message);
        }
        self.scheduler.schedule(
            now + base + delay,
            Event::ArriveAtDestination { rake: rake_idx },
        );
    }

    fn on_arrive_at_destination(&mut self, rake_idx: usize) {
        let Some(order_idx) = self.state.rakes[rake_idx].current_order else {
            warn!(rake = rake_idx, "arrival without order");
            return;
        };
        let now = self.state.time_ms;
        let rake = &mut self.state.rakes[rake_idx];
        rake.settle_at(now);
        rake.status = RakeStatus::Delivering;
        let order = &mut self.state.orders[order_idx];
        order.status = OrderStatus::Delivering;

        let message = format!(
            "{} arrived at {} with {}; unloading",
            rake.id, order.destination, order.id
        );
        self.log(LogKind::Delivery, message);
        self.scheduler.schedule(
            now + self.config.timing.unloading_ms,
            Event::DeliveryComplete { rake: rake_idx },
        );
    }

    fn on_delivery_complete(&mut self, rake_idx: usize) {
        let Some(order_idx) = self.state.rakes[rake_idx].current_order else {
            warn!(rake = rake_idx, "delivery without order");
            return;
        };
        let now = self.state.time_ms;
        let costs = &self.config.costs;

        let order = &mut self.state.orders[order_idx];
        order.status = OrderStatus::Delivered;
        order.actual_delivery = Some(now);
        let quantity = f64::from(order.quantity);
        let elapsed = now.saturating_sub(order.created_at);
        let on_time = elapsed <= costs.target_delivery_ms;

        let metrics = &mut self.state.metrics;
        metrics.completed_orders += 1;
        metrics.pending_orders = metrics.pending_orders.saturating_sub(1);
        *metrics
            .material_delivered
            .entry(order.material.clone())
            .or_insert(0) += u64::from(order.quantity);
        metrics.transport_costs += quantity * costs.transport_per_unit;
        let message = if on_time {
            metrics.on_time_deliveries += 1;
            format!(
                "{} delivered on time to {} ({})",
                order.id,
                order.destination,
                format_secs(elapsed)
            )
        } else {
            let penalty = quantity * costs.penalty_per_late_unit;
            metrics.penalty_costs += penalty;
            format!(
                "{} delivered late to {} ({}); penalty {:.2}",
                order.id,
                order.destination,
                format_secs(elapsed),
                penalty
            )
        };
        info!(order = %order.id, on_time, elapsed_ms = elapsed, "order delivered");
        self.log(LogKind::Delivery, message);

        let depot = self.config.depot;
        let return_ms = self.config.timing.return_ms;
        let rake = &mut self.state.rakes[rake_idx];
        rake.status = RakeStatus::Returning;
        rake.begin_motion(depot, now, return_ms);
        self.scheduler
            .schedule(now + return_ms, Event::RakeReturned { rake: rake_idx });
    }

    fn on_rake_returned(&mut self, rake_idx: usize) {
        let now = self.state.time_ms;
        let rake = &mut self.state.rakes[rake_idx];
        rake.settle_at(now);
        rake.status = RakeStatus::Available;
        rake.current_order = None;
        rake.stockyard = None;
        rake.load_progress = 0;
        rake.loading_window = None;

        let message = format!("{} returned and is available", rake.id);
        self.log(LogKind::Transit, message);
        self.retry_pending();
    }

    /// Retries pending orders by priority weight, then age.
    fn retry_pending(&mut self) {
        let mut pending: Vec<usize> = self
            .state
            .orders
            .iter()
            .enumerate()
            .filter(|(_, order)| order.is_pending())
            .map(|(idx, _)| idx)
            .collect();
        if pending.is_empty() {
            return;
        }
        let orders = &self.state.orders;
        pending.sort_by_key(|idx| {
            let order = &orders[*idx];
            (Reverse(order.priority.weight()), order.created_at, *idx)
        });

        for idx in pending {
            if !self.state.rakes.iter().any(Rake::is_available) {
                break;
            }
            self.try_assign(idx);
        }
    }

    fn try_assign(&mut self, order_idx: usize) -> bool {
        let now = self.state.time_ms;
        let order = &self.state.orders[order_idx];
        let ctx = AssignmentContext {
            stockyards: &self.state.stockyards,
            rakes: &self.state.rakes,
            time_ms: now,
        };

        let yard_idx = self
            .strategy
            .choose_stockyard(order, &ctx)
            .filter(|idx| {
                ctx.stockyards
                    .get(*idx)
                    .is_some_and(|yard| yard.can_supply(&order.material, order.quantity))
            });
        let Some(yard_idx) = yard_idx else {
            self.note_stall(order_idx, Stall::NoStock);
            return false;
        };
        let rake_idx = self
            .strategy
            .choose_rake(order, yard_idx, &ctx)
            .filter(|idx| ctx.rakes.get(*idx).is_some_and(|rake| rake_fits(order, rake)));
        let Some(rake_idx) = rake_idx else {
            self.note_stall(order_idx, Stall::NoRake);
            return false;
        };

        self.stalls.remove(&order_idx);
        let order = &mut self.state.orders[order_idx];
        let yard = &mut self.state.stockyards[yard_idx];
        let rake = &mut self.state.rakes[rake_idx];
        yard.reserve(&order.material, order.quantity);
        order.status = OrderStatus::Assigned;
        order.assigned_rake = Some(rake.id.clone());
        order.stockyard = Some(yard.name.clone());
        rake.status = RakeStatus::Assigned;
        rake.current_order = Some(order_idx);
        rake.stockyard = Some(yard_idx);

        let message = format!("{} assigned to {} from {}", rake.id, order.id, yard.name);
        self.log(LogKind::Assignment, message);
        self.scheduler.schedule(
            now + self.config.timing.dispatch_ms,
            Event::DispatchRake { rake: rake_idx },
        );
        true
    }

    /// Logs an advisory once per distinct reason an order stays pending.
    fn note_stall(&mut self, order_idx: usize, stall: Stall) {
        if self.stalls.get(&order_idx) == Some(&stall) {
            return;
        }
        self.stalls.insert(order_idx, stall);
        let order = &self.state.orders[order_idx];
        let message = match stall {
            Stall::NoStock => format!(
                "No stockyard can supply {}t of {} for {}; order pending",
                order.quantity, order.material, order.id
            ),
            Stall::NoRake => format!("No available rake for {}; order pending", order.id),
        };
        self.log(LogKind::Advisory, message);
    }

    fn random_order(&mut self) -> OrderRequest {
        let generation = &self.config.generation;
        let material = self.config.materials[self.rng.gen_range(0..self.config.materials.len())]
            .clone();
        let priority = Priority::ALL[self.rng.gen_range(0..Priority::ALL.len())];
        let destination = self.config.destinations
            [self.rng.gen_range(0..self.config.destinations.len())]
        .name
        .clone();
        let quantity = self
            .rng
            .gen_range(generation.min_quantity..=generation.max_quantity);

        OrderRequest {
            material,
            quantity,
            priority,
            destination,
        }
    }

    fn schedule_generation(&mut self) {
        let generation = &self.config.generation;
        let interval = self
            .rng
            .gen_range(generation.min_interval_ms..=generation.max_interval_ms);
        self.scheduler
            .schedule(self.state.time_ms + interval, Event::GenerateOrder);
    }

    fn destination_position(&self, name: &str) -> Option<Position> {
        self.config
            .destinations
            .iter()
            .find(|destination| destination.name == name)
            .map(|destination| destination.position)
    }

    fn log(&mut self, kind: LogKind, message: String) {
        self.state.log.push(self.state.time_ms, kind, message);
    }
}

/// Runs a fresh engine for `duration_ms` of virtual time and returns the final view.
pub fn run_simulation(config: &SimConfig, duration_ms: u64) -> Result<Snapshot> {
    let mut engine = SimulationEngine::from_config(config.clone())?;
    engine.start();
    engine.advance(duration_ms);
    Ok(engine.snapshot())
}

pub fn validate_config(config: &SimConfig) -> Result<()> {
    if config.rake_count == 0 {
        return Err(Error::NoRakes);
    }
    if config.rake_capacity == 0 {
        return Err(Error::InvalidRakeCapacity);
    }
    if config.stockyards.is_empty() {
        return Err(Error::NoStockyards);
    }
    let mut names = HashSet::new();
    for yard in &config.stockyards {
        if yard.loading_capacity == 0 {
            return Err(Error::InvalidLoadingCapacity(yard.name.clone()));
        }
        if !names.insert(yard.name.as_str()) {
            return Err(Error::DuplicateStockyard(yard.name.clone()));
        }
    }
    if config.materials.is_empty() {
        return Err(Error::NoMaterials);
    }
    if config.destinations.is_empty() {
        return Err(Error::NoDestinations);
    }

    let generation = &config.generation;
    if generation.min_interval_ms == 0 {
        return Err(Error::ZeroInterval("generation interval"));
    }
    check_range(
        "generation interval",
        generation.min_interval_ms,
        generation.max_interval_ms,
    )?;
    if generation.min_quantity == 0 {
        return Err(Error::InvalidQuantity(generation.min_quantity));
    }
    check_range(
        "quantity",
        u64::from(generation.min_quantity),
        u64::from(generation.max_quantity),
    )?;

    let timing = &config.timing;
    check_range("loading", timing.min_loading_ms, timing.max_loading_ms)?;
    check_range("transit", timing.min_transit_ms, timing.max_transit_ms)?;
    if !(0.0..=1.0).contains(&timing.delay_probability) {
        return Err(Error::InvalidProbability(timing.delay_probability));
    }
    if timing.delay_probability > 0.0 {
        check_range("delay", MIN_DELAY_MS, timing.max_delay_ms)?;
    }

    for rate in [
        config.costs.transport_per_unit,
        config.costs.penalty_per_late_unit,
    ] {
        if !rate.is_finite() || rate < 0.0 {
            return Err(Error::InvalidCostRate(rate));
        }
    }

    Ok(())
}

fn check_range(name: &'static str, min: u64, max: u64) -> Result<()> {
    if min > max {
        return Err(Error::InvalidRange { name, min, max });
    }
    Ok(())
}

fn init_state(config: &SimConfig) -> EngineState {
    let rakes = (0..config.rake_count)
        .map(|idx| Rake::new(format!("R-{:02}", idx + 1), config.rake_capacity, config.depot))
        .collect();
    let stockyards = config.stockyards.iter().map(Stockyard::from_config).collect();

    EngineState {
        time_ms: 0,
        rakes,
        stockyards,
        orders: Vec::new(),
        metrics: Metrics::default(),
        log: EventLog::new(config.view.event_log_capacity),
    }
}

fn format_secs(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}
