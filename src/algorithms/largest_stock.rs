use crate::algorithms::{first_fitting_rake, AssignmentContext, AssignmentStrategy};
use crate::state::Order;

/// Draws from the stockyard with the most unreserved stock of the material.
#[derive(Default)]
pub struct LargestStockStrategy;

impl AssignmentStrategy for LargestStockStrategy {
    fn name(&self) -> &'static str {
        "largest-stock"
    }

    fn choose_stockyard(&mut self, order: &Order, ctx: &AssignmentContext) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;

        for (idx, yard) in ctx.stockyards.iter().enumerate() {
            if !yard.can_supply(&order.material, order.quantity) {
                continue;
            }
            let available = yard.unreserved(&order.material);
            match best {
                Some((_, best_available)) if available <= best_available => {}
                _ => best = Some((idx, available)),
            }
        }

        best.map(|(idx, _)| idx)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::fixtures::{order, yard};

    #[test]
    fn largest_stock_accounts_for_reservations() {
        let mut yards = vec![
            yard("A", 0.0, &[("Iron Ore", 800)]),
            yard("B", 0.0, &[("Iron Ore", 600)]),
        ];
        yards[0].reserve("Iron Ore", 300);
        let ctx = AssignmentContext {
            stockyards: &yards,
            rakes: &[],
            time_ms: 0,
        };

        let mut strategy = LargestStockStrategy;
        assert_eq!(
            strategy.choose_stockyard(&order("Iron Ore", 100), &ctx),
            Some(1)
        );
    }

    #[test]
    fn largest_stock_skips_yards_that_cannot_supply() {
        let yards = vec![
            yard("A", 0.0, &[("Coal", 90)]),
            yard("B", 0.0, &[("Coal", 40)]),
        ];
        let ctx = AssignmentContext {
            stockyards: &yards,
            rakes: &[],
            time_ms: 0,
        };

        let mut strategy = LargestStockStrategy;
        assert_eq!(strategy.choose_stockyard(&order("Coal", 100), &ctx), None);
    }
}
