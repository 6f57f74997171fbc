/// Output formatting: terminal table and JSON.
use serde::Serialize;
use versus_core::{Agreement, Comparison, SessionState};

#[derive(Serialize)]
struct JsonRankedItem {
    rank: usize,
    id: usize,
    name: String,
    chosen: usize,
    seen: usize,
    /// `null` for unranked items.
    agreement: Option<f64>,
}

#[derive(Serialize)]
struct JsonResults {
    items: Vec<JsonRankedItem>,
    total_comparisons: usize,
    comparison_budget: usize,
}

#[derive(Serialize)]
struct JsonComparison<'a> {
    comparison: &'a Comparison,
    placed: usize,
    remaining: usize,
    comparisons_made: usize,
    comparison_budget: usize,
}

fn ranked_items(session: &SessionState) -> Vec<JsonRankedItem> {
    let Some(outcome) = session.outcome() else {
        return Vec::new();
    };
    // Most preferred first.
    outcome
        .ranking
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &id)| {
            let score = &outcome.scores[id];
            JsonRankedItem {
                rank: i + 1,
                id,
                name: session.items()[id].payload.clone(),
                chosen: score.chosen,
                seen: score.seen,
                agreement: score.agreement.fraction(),
            }
        })
        .collect()
}

/// One-line progress prefix, e.g. "[3 placed, 5 to go, 7/24 comparisons] ".
pub fn progress_line(session: &SessionState) -> String {
    format!(
        "[{} placed, {} to go, {}/{} comparisons] ",
        session.placed_count(),
        session.remaining(),
        session.comparisons_made(),
        session.comparison_budget(),
    )
}

/// Render results as a terminal table. Empty until the session is complete.
pub fn render_table(session: &SessionState) -> String {
    let items = ranked_items(session);
    if items.is_empty() {
        return String::new();
    }

    let name_width = items.iter().map(|r| r.name.len()).max().unwrap_or(4).max(4);
    let mut out = String::new();
    out.push_str(&format!(" # | {:<name_width$} | Chosen/Seen | Agreement\n", "Item"));
    out.push_str(&format!("---|-{}-|-------------|----------\n", "-".repeat(name_width)));

    for r in &items {
        let agreement = match r.agreement {
            Some(f) => format!("{f:>9.3}"),
            None => format!("{:>9}", "unranked"),
        };
        out.push_str(&format!(
            "{:>2} | {:<name_width$} | {:>11} | {}\n",
            r.rank,
            r.name,
            format!("{}/{}", r.chosen, r.seen),
            agreement,
        ));
    }

    out.push_str(&format!(
        "\n{} items ranked with {} comparisons (budget {})\n",
        items.len(),
        session.comparisons_made(),
        session.comparison_budget(),
    ));
    out
}

pub fn render_json(session: &SessionState) -> String {
    let output = JsonResults {
        items: ranked_items(session),
        total_comparisons: session.comparisons_made(),
        comparison_budget: session.comparison_budget(),
    };
    serde_json::to_string_pretty(&output).unwrap_or_default()
}

pub fn render_comparison_json(session: &SessionState, comparison: &Comparison) -> String {
    let output = JsonComparison {
        comparison,
        placed: session.placed_count(),
        remaining: session.remaining(),
        comparisons_made: session.comparisons_made(),
        comparison_budget: session.comparison_budget(),
    };
    serde_json::to_string_pretty(&output).unwrap_or_default()
}

/// Print the outstanding comparison for `choose` to answer.
pub fn print_comparison(session: &SessionState, comparison: &Comparison, json: bool) {
    if json {
        println!("{}", render_comparison_json(session, comparison));
    } else {
        println!("{}Which do you prefer?", progress_line(session));
        println!("  1) {}", comparison.item_a.payload);
        println!("  2) {}", comparison.item_b.payload);
        println!("Answer with `versus choose 1` or `versus choose 2`.");
    }
}

/// Print final results.
pub fn print_results(session: &SessionState, json: bool) {
    if json {
        println!("{}", render_json(session));
    } else {
        print!("{}", render_table(session));
    }
}

/// Short agreement label used in verbose logs.
pub fn agreement_label(agreement: Agreement) -> String {
    match agreement {
        Agreement::Fraction(f) => format!("{f:.3}"),
        Agreement::Unranked => "unranked".to_string(),
    }
}
