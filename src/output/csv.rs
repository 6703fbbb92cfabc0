use anyhow::Result;

use crate::evaluator::RouteEvaluation;
use crate::wallet::WalletRecord;

pub fn evaluation_to_csv(eval: &RouteEvaluation) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "route",
        "program",
        "required",
        "direct_balance",
        "direct_enough",
        "transfer_possible",
        "transfer_shortfall",
        "transferable_total",
    ])?;
    for row in &eval.rows {
        writer.write_record([
            eval.route.to_string(),
            row.program.as_slug().to_string(),
            row.required.to_string(),
            row.direct_balance.to_string(),
            row.direct_enough.to_string(),
            row.transfer_possible.to_string(),
            row.transfer_shortfall.to_string(),
            row.transferable_total().to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn wallets_to_csv(records: &[WalletRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["user_email", "program", "points", "updated_at"])?;
    for record in records {
        writer.write_record([
            record.user_email.clone(),
            record.program.clone(),
            record.points.to_string(),
            record.updated_at.to_rfc3339(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
