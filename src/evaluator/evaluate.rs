use std::collections::BTreeMap;

use crate::chart::{ChartResolver, ProgramId, Route};
use crate::evaluator::{EvaluationRow, RouteEvaluation};
use crate::transfer::TransferGraph;
use crate::wallet::BalanceSheet;

/// Evaluates every program priced on the route against the user's balances.
/// Pure and idempotent: identical inputs produce identical, order-stable
/// output. Rows come out in `ProgramId` order.
pub fn evaluate_route(
    route: &Route,
    balances: &BalanceSheet,
    resolver: &ChartResolver,
    graph: &TransferGraph,
) -> RouteEvaluation {
    let Some(prices) = resolver.lookup(route) else {
        return RouteEvaluation {
            route: route.clone(),
            rows: Vec::new(),
            cheapest_overall: None,
            best_bookable_now: None,
        };
    };

    let mut rows = Vec::with_capacity(prices.len());
    for (&program, &required) in prices {
        rows.push(evaluate_program(program, required, balances, graph));
    }

    let cheapest_overall = cheapest(&rows, |_| true);
    let best_bookable_now = cheapest(&rows, EvaluationRow::bookable);

    RouteEvaluation {
        route: route.clone(),
        rows,
        cheapest_overall,
        best_bookable_now,
    }
}

fn evaluate_program(
    program: ProgramId,
    required: u64,
    balances: &BalanceSheet,
    graph: &TransferGraph,
) -> EvaluationRow {
    let direct_balance = balances.points_in(program);
    if direct_balance >= required {
        // Transfer detail is only meaningful when direct alone is short.
        return EvaluationRow {
            program,
            required,
            direct_balance,
            direct_enough: true,
            transfer_possible: true,
            transfer_shortfall: 0,
            transfer_sources: BTreeMap::new(),
        };
    }

    let incoming = graph.transferable_into(program, balances);
    let combined = direct_balance.saturating_add(incoming.total);
    EvaluationRow {
        program,
        required,
        direct_balance,
        direct_enough: false,
        transfer_possible: combined >= required,
        transfer_shortfall: required.saturating_sub(combined),
        transfer_sources: incoming.sources,
    }
}

fn cheapest(rows: &[EvaluationRow], keep: impl Fn(&EvaluationRow) -> bool) -> Option<ProgramId> {
    rows.iter()
        .filter(|r| keep(r))
        .min_by(|a, b| a.required.cmp(&b.required).then(a.program.cmp(&b.program)))
        .map(|r| r.program)
}
