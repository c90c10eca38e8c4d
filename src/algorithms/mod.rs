mod first_fit;
mod largest_stock;
mod nearest_rake;

use crate::models::StrategyConfig;
use crate::state::{Order, Rake, Stockyard};

pub use first_fit::FirstFitStrategy;
pub use largest_stock::LargestStockStrategy;
pub use nearest_rake::NearestRakeStrategy;

/// Picks the source stockyard and the rake for a pending order.
///
/// Both methods return indices into the slices held by the context, or `None`
/// when nothing fits; the engine then leaves the order pending.
pub trait AssignmentStrategy: Send {
    fn name(&self) -> &'static str;

    fn choose_stockyard(&mut self, order: &Order, ctx: &AssignmentContext) -> Option<usize>;

    fn choose_rake(
        &mut self,
        order: &Order,
        stockyard: usize,
        ctx: &AssignmentContext,
    ) -> Option<usize>;
}

pub struct AssignmentContext<'a> {
    pub stockyards: &'a [Stockyard],
    pub rakes: &'a [Rake],
    pub time_ms: u64,
}

pub fn build_strategy(config: StrategyConfig) -> Box<dyn AssignmentStrategy> {
    match config {
        StrategyConfig::FirstFit => Box::new(FirstFitStrategy),
        StrategyConfig::NearestRake => Box::new(NearestRakeStrategy),
        StrategyConfig::LargestStock => Box::new(LargestStockStrategy),
    }
}

pub(crate) fn rake_fits(order: &Order, rake: &Rake) -> bool {
    rake.is_available() && rake.capacity >= order.quantity
}

pub(crate) fn first_fitting_rake(order: &Order, rakes: &[Rake]) -> Option<usize> {
    rakes.iter().position(|rake| rake_fits(order, rake))
}
