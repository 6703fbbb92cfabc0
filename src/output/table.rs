use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::chart::{ChartResolver, ProgramId};
use crate::evaluator::{EvaluationRow, RouteEvaluation};
use crate::simulator::TopUpOutcome;
use crate::wallet::{BalanceSheet, WalletRecord};

pub fn render_evaluation_table(eval: &RouteEvaluation, cents_per_point: f64) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Program",
        "Required",
        "Balance",
        "Transferable",
        "Shortfall",
        "Bookable",
        "Cash Top-Up",
    ]);

    for row in &eval.rows {
        let bookable = if row.bookable() { "YES" } else { "NO" };
        let bookable_cell = if row.bookable() {
            Cell::new(bookable).fg(Color::Green)
        } else {
            Cell::new(bookable).fg(Color::Red)
        };
        table.add_row(Row::from(vec![
            Cell::new(row.program.to_string()),
            Cell::new(row.required.to_string()),
            Cell::new(row.direct_balance.to_string()),
            Cell::new(transferable_label(row)),
            Cell::new(if row.transfer_shortfall > 0 {
                row.transfer_shortfall.to_string()
            } else {
                "-".to_string()
            }),
            bookable_cell,
            Cell::new(if row.transfer_shortfall > 0 {
                format!("${:.2}", row.cash_top_up_usd(cents_per_point))
            } else {
                "-".to_string()
            }),
        ]));
    }

    let mut out = table.to_string();
    out.push('\n');
    out.push_str(&render_ranking_summary(eval));
    out
}

pub fn render_ranking_summary(eval: &RouteEvaluation) -> String {
    if !eval.has_chart() {
        return format!("No chart data for {}.", eval.route);
    }
    let cheapest = ranking_label(eval, eval.cheapest_overall);
    let bookable = ranking_label(eval, eval.best_bookable_now);
    format!("Cheapest listed: {cheapest}\nBest bookable now: {bookable}")
}

pub fn render_topup_table(outcome: &TopUpOutcome) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Program", "Before", "After", "Shortfall Change"]);

    for before in &outcome.before.rows {
        if let Some(after) = outcome.after.row(before.program) {
            let delta = after.transfer_shortfall as i64 - before.transfer_shortfall as i64;
            table.add_row(vec![
                before.program.to_string(),
                bookable_label(before),
                bookable_label(after),
                format!("{delta:+}"),
            ]);
        }
    }

    let applied = outcome
        .top_up
        .map(|t| format!("+{} {}", t.amount, t.program))
        .unwrap_or_else(|| "none".to_string());
    let gained = if outcome.newly_bookable.is_empty() {
        "none".to_string()
    } else {
        outcome
            .newly_bookable
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = table.to_string();
    out.push_str(&format!(
        "\nTop-up applied: {applied}\nNewly bookable: {gained}\n{}",
        render_ranking_summary(&outcome.after)
    ));
    out
}

pub fn render_balances_table(sheet: &BalanceSheet, best: Option<ProgramId>) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Program", "Points", ""]);

    for (program, points) in &sheet.known {
        let marker = if best == Some(*program) { "best" } else { "" };
        table.add_row(vec![
            program.to_string(),
            points.to_string(),
            marker.to_string(),
        ]);
    }
    for (slug, points) in &sheet.unrecognized {
        table.add_row(vec![
            slug.clone(),
            points.to_string(),
            "unrecognized".to_string(),
        ]);
    }
    table.to_string()
}

pub fn render_wallets_table(records: &[WalletRecord]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Program", "Points", "Updated At"]);
    for record in records {
        table.add_row(vec![
            record.program.clone(),
            record.points.to_string(),
            record.updated_at.to_rfc3339(),
        ]);
    }
    table.to_string()
}

pub fn render_routes_table(resolver: &ChartResolver) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Route", "Programs Priced", "Cheapest Listed"]);
    for (route, prices) in resolver.routes() {
        let cheapest = prices
            .iter()
            .min_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(b.0)))
            .map(|(program, points)| format!("{program} ({points})"))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            route.to_string(),
            prices.len().to_string(),
            cheapest,
        ]);
    }
    table.to_string()
}

fn transferable_label(row: &EvaluationRow) -> String {
    if row.direct_enough {
        return "-".to_string();
    }
    if row.transfer_sources.is_empty() {
        return "0".to_string();
    }
    let detail = row
        .transfer_sources
        .iter()
        .map(|(source, amount)| format!("{source} {amount}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} ({detail})", row.transferable_total())
}

fn bookable_label(row: &EvaluationRow) -> String {
    if row.bookable() {
        format!("YES {}", row.required)
    } else {
        format!("NO -{}", row.transfer_shortfall)
    }
}

fn ranking_label(eval: &RouteEvaluation, pick: Option<ProgramId>) -> String {
    match pick.and_then(|program| eval.row(program)) {
        Some(row) => format!("{} ({} pts)", row.program, row.required),
        None => "none".to_string(),
    }
}
