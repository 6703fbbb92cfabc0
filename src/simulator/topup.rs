use crate::chart::{ChartResolver, ProgramId, Route};
use crate::evaluator::{evaluate_route, RouteEvaluation};
use crate::simulator::{TopUp, TopUpOutcome};
use crate::transfer::TransferGraph;
use crate::wallet::BalanceSheet;

/// Re-evaluates the route under a hypothetical top-up. The full evaluator
/// runs against the perturbed balances: a top-up can change what is
/// transferable into sibling programs, so patching a single row would leave
/// the row set inconsistent. A zero-amount or absent top-up is the
/// identity.
pub fn simulate_top_up(
    top_up: Option<TopUp>,
    route: &Route,
    balances: &BalanceSheet,
    resolver: &ChartResolver,
    graph: &TransferGraph,
) -> TopUpOutcome {
    let before = evaluate_route(route, balances, resolver, graph);
    let applied = top_up.filter(|t| t.amount > 0);

    let after = match applied {
        Some(top_up) => {
            let mut topped = balances.clone();
            topped.credit(top_up.program, top_up.amount);
            evaluate_route(route, &topped, resolver, graph)
        }
        None => before.clone(),
    };

    let newly_bookable = newly_bookable(&before, &after);
    TopUpOutcome {
        top_up: applied,
        before,
        after,
        newly_bookable,
    }
}

/// Tolerant normalization for top-up amounts arriving as raw numbers:
/// non-finite or negative input degrades to 0, which the simulator treats
/// as a no-op.
pub fn normalize_top_up_amount(raw: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    raw.floor() as u64
}

fn newly_bookable(before: &RouteEvaluation, after: &RouteEvaluation) -> Vec<ProgramId> {
    after
        .rows
        .iter()
        .filter(|row| row.bookable())
        .filter(|row| {
            before
                .row(row.program)
                .map(|old| !old.bookable())
                .unwrap_or(true)
        })
        .map(|row| row.program)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{normalize_top_up_amount, simulate_top_up};
    use crate::chart::{AwardChart, ChartResolver, ProgramId, ResolvePolicy, Route};
    use crate::evaluator::evaluate_route;
    use crate::simulator::TopUp;
    use crate::transfer::TransferGraph;
    use crate::wallet::BalanceSheet;

    fn lax_lhr() -> Route {
        "LAX-LHR".parse().expect("route parses")
    }

    fn resolver() -> ChartResolver {
        ChartResolver::new(AwardChart::builtin(), ResolvePolicy::Bidirectional)
    }

    #[test]
    fn zero_amount_and_absent_top_up_are_identities() {
        let balances = BalanceSheet::default().with_points(ProgramId::AmexMr, 40_000);
        let graph = TransferGraph::default();
        let resolver = resolver();
        let baseline = evaluate_route(&lax_lhr(), &balances, &resolver, &graph);

        let zero = simulate_top_up(
            Some(TopUp {
                program: ProgramId::AmexMr,
                amount: 0,
            }),
            &lax_lhr(),
            &balances,
            &resolver,
            &graph,
        );
        assert!(zero.top_up.is_none());
        assert_eq!(zero.after, baseline);
        assert!(zero.newly_bookable.is_empty());

        let absent = simulate_top_up(None, &lax_lhr(), &balances, &resolver, &graph);
        assert_eq!(absent.after, baseline);
    }

    #[test]
    fn negative_and_non_finite_amounts_normalize_to_no_op() {
        assert_eq!(normalize_top_up_amount(-5.0), 0);
        assert_eq!(normalize_top_up_amount(f64::NAN), 0);
        assert_eq!(normalize_top_up_amount(f64::NEG_INFINITY), 0);
        assert_eq!(normalize_top_up_amount(20_000.7), 20_000);
    }

    #[test]
    fn top_up_makes_the_target_directly_bookable() {
        // 40k amex + 20k top-up meets the 60k listing with no transfers.
        let balances = BalanceSheet::default().with_points(ProgramId::AmexMr, 40_000);
        let outcome = simulate_top_up(
            Some(TopUp {
                program: ProgramId::AmexMr,
                amount: 20_000,
            }),
            &lax_lhr(),
            &balances,
            &resolver(),
            &TransferGraph::default(),
        );

        assert_eq!(outcome.before.best_bookable_now, None);
        let row = outcome.after.row(ProgramId::AmexMr).expect("amex row");
        assert_eq!(row.direct_balance, 60_000);
        assert!(row.direct_enough);
        assert_eq!(row.transfer_shortfall, 0);
        assert_eq!(outcome.after.best_bookable_now, Some(ProgramId::AmexMr));
        assert_eq!(outcome.newly_bookable, vec![ProgramId::AmexMr]);
    }

    #[test]
    fn top_up_of_a_source_program_reaches_its_transfer_target() {
        // Topping up chase_ur changes what is transferable into amex_mr,
        // so the sibling row must be recomputed too.
        let balances = BalanceSheet::default().with_points(ProgramId::AmexMr, 40_000);
        let graph = TransferGraph::from_edges([(ProgramId::ChaseUr, ProgramId::AmexMr)]);
        let outcome = simulate_top_up(
            Some(TopUp {
                program: ProgramId::ChaseUr,
                amount: 25_000,
            }),
            &lax_lhr(),
            &balances,
            &resolver(),
            &graph,
        );

        let before_row = outcome.before.row(ProgramId::AmexMr).expect("amex row");
        assert!(!before_row.transfer_possible);
        let after_row = outcome.after.row(ProgramId::AmexMr).expect("amex row");
        assert!(after_row.transfer_possible);
        assert_eq!(
            after_row.transfer_sources.get(&ProgramId::ChaseUr),
            Some(&25_000)
        );
        assert!(outcome.newly_bookable.contains(&ProgramId::AmexMr));
    }

    #[test]
    fn top_up_is_monotone_for_the_target_row() {
        let graph = TransferGraph::with_defaults();
        let resolver = resolver();
        let balances = BalanceSheet::default()
            .with_points(ProgramId::AmexMr, 10_000)
            .with_points(ProgramId::ChaseUr, 5_000);
        let base = evaluate_route(&lax_lhr(), &balances, &resolver, &graph);

        for amount in [1u64, 10_000, 50_000, 100_000] {
            let outcome = simulate_top_up(
                Some(TopUp {
                    program: ProgramId::AmexMr,
                    amount,
                }),
                &lax_lhr(),
                &balances,
                &resolver,
                &graph,
            );
            let before = base.row(ProgramId::AmexMr).expect("amex row");
            let after = outcome.after.row(ProgramId::AmexMr).expect("amex row");
            assert!(after.direct_enough >= before.direct_enough);
            assert!(after.transfer_possible >= before.transfer_possible);
            assert!(after.transfer_shortfall <= before.transfer_shortfall);
        }
    }
}
