use crate::evaluator::{BatchReport, EvaluationReport, ScopeMetrics};
use crate::metrics::AucInterval;
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

const MISSING: &str = "-";

fn fmt_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", v),
        None => MISSING.to_string(),
    }
}

fn fmt_interval(ci: Option<&AucInterval>) -> String {
    match ci {
        Some(AucInterval {
            lower: Some(lo),
            upper: Some(hi),
            ..
        }) => format!("[{:.3}, {:.3}]", lo, hi),
        _ => MISSING.to_string(),
    }
}

/// Colours an AUC by which side of chance it falls on.
fn auc_cell(value: Option<f64>) -> Cell {
    let cell = Cell::new(fmt_metric(value));
    match value {
        Some(v) if v >= 0.5 => cell.fg(Color::Green),
        Some(_) => cell.fg(Color::Red),
        None => cell,
    }
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .enumerate()
        .map(|(i, &l)| {
            let cell = Cell::new(l).add_attribute(Attribute::Bold);
            if i == 1 {
                cell.fg(Color::Cyan)
            } else {
                cell
            }
        })
        .collect()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn align_right(table: &mut Table, from: usize, to: usize) {
    for i in from..=to {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

fn scope_row(name: String, m: &ScopeMetrics) -> Vec<Cell> {
    vec![
        Cell::new(name).add_attribute(Attribute::Bold),
        auc_cell(m.auc),
        Cell::new(fmt_metric(m.tpr_at_zero)),
        Cell::new(fmt_interval(m.auc_ci.as_ref())),
        Cell::new(fmt_metric(m.true_vs_rest_auc)),
        Cell::new(m.pair_count),
        Cell::new(m.positives),
    ]
}

/// One row per scope: global first, then local radii in ascending order.
pub fn evaluation_table(report: &EvaluationReport) -> Table {
    let mut table = new_table();
    table.set_header(header(&[
        "Scope", "AUC", "Acc@0", "AUC CI", "True/Rest", "Pairs", "Pos",
    ]));

    table.add_row(scope_row("global".to_string(), &report.global));
    for (radius, m) in &report.local {
        table.add_row(scope_row(format!("local r={}", radius), m));
    }

    align_right(&mut table, 1, 6);
    table
}

/// Macro averages followed by a per-text AUC breakdown.
pub fn batch_table(batch: &BatchReport) -> Table {
    let agg = &batch.aggregate;
    let radii: Vec<usize> = agg.local.keys().copied().collect();

    let mut labels = vec!["Text".to_string(), "Len".to_string(), "Global".to_string()];
    labels.extend(radii.iter().map(|r| format!("r={}", r)));
    let mut table = new_table();
    table.set_header(header(
        &labels.iter().map(String::as_str).collect::<Vec<_>>(),
    ));

    for t in &batch.per_text {
        let mut row = vec![
            Cell::new(format!("#{}", t.id)),
            Cell::new(t.len),
            auc_cell(t.report.global.auc),
        ];
        row.extend(
            radii
                .iter()
                .map(|r| auc_cell(t.report.local.get(r).and_then(|m| m.auc))),
        );
        table.add_row(row);
    }

    let mut mean_row = vec![
        Cell::new("mean").add_attribute(Attribute::Bold),
        Cell::new(batch.per_text.len()),
        auc_cell(agg.global_auc).add_attribute(Attribute::Bold),
    ];
    mean_row.extend(
        agg.local
            .values()
            .map(|m| auc_cell(m.auc).add_attribute(Attribute::Bold)),
    );
    table.add_row(mean_row);

    let mut acc_row = vec![
        Cell::new("mean acc@0").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(fmt_metric(agg.global_tpr_at_zero)),
    ];
    acc_row.extend(agg.local.values().map(|m| Cell::new(fmt_metric(m.tpr_at_zero))));
    table.add_row(acc_row);

    align_right(&mut table, 1, 2 + radii.len());
    table
}
