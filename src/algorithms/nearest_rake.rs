use crate::algorithms::{rake_fits, AssignmentContext, AssignmentStrategy, FirstFitStrategy};
use crate::state::Order;

/// First-fit stockyard, then the available rake closest to it.
#[derive(Default)]
pub struct NearestRakeStrategy;

impl AssignmentStrategy for NearestRakeStrategy {
    fn name(&self) -> &'static str {
        "nearest-rake"
    }

    fn choose_stockyard(&mut self, order: &Order, ctx: &AssignmentContext) -> Option<usize> {
        FirstFitStrategy.choose_stockyard(order, ctx)
    }

    fn choose_rake(
        &mut self,
        order: &Order,
        stockyard: usize,
        ctx: &AssignmentContext,
    ) -> Option<usize> {
        let target = ctx.stockyards.get(stockyard)?.position;
        let mut best: Option<(usize, f64)> = None;

        for (idx, rake) in ctx.rakes.iter().enumerate() {
            if !rake_fits(order, rake) {
                continue;
            }
            let distance = rake.position.distance_to(&target);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((idx, distance)),
            }
        }

        best.map(|(idx, _)| idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::fixtures::{order, rake, yard};
    use crate::state::RakeStatus;

    #[test]
    fn nearest_rake_prefers_closest_available() {
        let yards = vec![yard("A", 40.0, &[("Coal", 500)])];
        let rakes = vec![
            rake("R-01", 0.0, RakeStatus::Available),
            rake("R-02", 39.0, RakeStatus::Delivering),
            rake("R-03", 45.0, RakeStatus::Available),
            rake("R-04", 100.0, RakeStatus::Available),
        ];
        let ctx = AssignmentContext {
            stockyards: &yards,
            rakes: &rakes,
            time_ms: 0,
        };

        let mut strategy = NearestRakeStrategy;
        let order = order("Coal", 100);
        let yard_idx = strategy.choose_stockyard(&order, &ctx).unwrap();
        assert_eq!(strategy.choose_rake(&order, yard_idx, &ctx), Some(2));
    }

    #[test]
    fn nearest_rake_breaks_ties_by_pool_order() {
        let yards = vec![yard("A", 10.0, &[("Coal", 500)])];
        let rakes = vec![
            rake("R-01", 0.0, RakeStatus::Available),
            rake("R-02", 20.0, RakeStatus::Available),
        ];
        let ctx = AssignmentContext {
            stockyards: &yards,
            rakes: &rakes,
            time_ms: 0,
        };

        let mut strategy = NearestRakeStrategy;
        assert_eq!(strategy.choose_rake(&order("Coal", 100), 0, &ctx), Some(0));
    }
}
