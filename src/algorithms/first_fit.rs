use crate::algorithms::{first_fitting_rake, AssignmentContext, AssignmentStrategy};
use crate::state::Order;

/// Greedy baseline: first stockyard that can supply, first available rake.
#[derive(Default)]
pub struct FirstFitStrategy;

impl AssignmentStrategy for FirstFitStrategy {
    fn name(&self) -> &'static str {
        "first-fit"
    }

    fn choose_stockyard(&mut self, order: &Order, ctx: &AssignmentContext) -> Option<usize> {
        ctx.stockyards
            .iter()
            .position(|yard| yard.can_supply(&order.material, order.quantity))
    }

    fn choose_rake(
        &mut self,
        order: &Order,
        _stockyard: usize,
        ctx: &AssignmentContext,
    ) -> Option<usize> {
        first_fitting_rake(order, ctx.rakes)
    }
}
