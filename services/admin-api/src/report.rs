use screening_admin::screening::detail::{ResultView, RowDetail};
use screening_admin::screening::domain::{ModelInfo, ServerStatistics};
use screening_admin::screening::filter::FilteredResults;
use screening_admin::screening::join::Row;
use screening_admin::screening::snapshot::{DashboardView, RosterSnapshot};

pub(crate) fn render_dashboard(view: &DashboardView) {
    let stats = &view.statistics;
    println!("Screening dashboard ({})", view.loaded_at.format("%Y-%m-%d %H:%M UTC"));
    println!(
        "- {} tutors | {} tests | {} at risk | {} no risk",
        stats.total_users, stats.total_tests, stats.positive_tests, stats.negative_tests
    );
    println!("- average risk {:.1}%", stats.average_risk);

    println!("Outcomes:");
    for slice in &view.outcome_chart {
        println!("  - {}: {}", slice.label, slice.count);
    }

    println!("Risk tiers:");
    for bucket in &view.tier_chart {
        println!("  - {}: {}", bucket.label, bucket.count);
    }
}

pub(crate) fn render_roster(roster: &RosterSnapshot) {
    let summary = &roster.summary;
    println!(
        "Roster: {} tutors | {} children | {} tutors without children",
        summary.tutor_count, summary.child_count, summary.tutors_without_children
    );

    if roster.rows.is_empty() {
        println!("  (no users)");
        return;
    }

    println!("{:<12} {:<24} {:<24} {:>4}", "ID", "Tutor", "Child", "Age");
    for row in &roster.rows {
        println!("{}", roster_line(row));
    }
}

fn roster_line(row: &Row) -> String {
    format!(
        "{:<12} {:<24} {:<24} {:>4}",
        row.display_id(),
        row.tutor_name,
        row.child_name,
        row.child_age_label()
    )
}

pub(crate) fn render_results(filtered: &FilteredResults) {
    println!(
        "Results (outcome: {}, risk: {}): {} of {}",
        filtered.filter.outcome,
        filtered.filter.tier,
        filtered.len(),
        filtered.source_total
    );

    let views: Vec<ResultView> = filtered.results.iter().map(ResultView::from).collect();
    render_result_table(&views);
}

pub(crate) fn render_detail(detail: &RowDetail) {
    let tutor = detail
        .tutor
        .as_ref()
        .map_or(detail.tutor_id.as_str(), |tutor| tutor.name.as_str());
    match &detail.child_id {
        Some(child) => println!("Results for child {child} of {tutor}"),
        None => println!("Results for {tutor}"),
    }
    render_result_table(&detail.results);
}

fn render_result_table(views: &[ResultView]) {
    if views.is_empty() {
        println!("  (no results)");
        return;
    }

    println!(
        "{:<17} {:<24} {:<4} {:>7} {:<7} {:>6}",
        "Date", "Activity", "Risk", "Prob.", "Tier", "Time"
    );
    for view in views {
        println!("{}", result_line(view));
    }
}

fn result_line(view: &ResultView) -> String {
    let date = view.timestamp.map_or_else(
        || "-".to_string(),
        |timestamp| timestamp.format("%Y-%m-%d %H:%M").to_string(),
    );
    format!(
        "{:<17} {:<24} {:<4} {:>6.1}% {:<7} {:>6}",
        date,
        view.activity_name,
        view.outcome,
        view.probability,
        view.tier_label,
        view.duration_label
    )
}

pub(crate) fn render_model_info(statistics: &ServerStatistics, model: &ModelInfo) {
    println!("Server statistics");
    println!(
        "- {} users | {} children | {} tests ({} positive, {} negative)",
        statistics.total_users,
        statistics.total_children,
        statistics.total_tests,
        statistics.positive_tests,
        statistics.negative_tests
    );
    println!("- average risk {:.1}%", statistics.average_risk);

    println!("Model");
    if model.is_empty() {
        println!("  (no model metadata)");
    } else {
        println!("{:#}", model.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use screening_admin::screening::domain::{ChildId, UserId};

    #[test]
    fn roster_line_uses_display_id_and_age_sentinel() {
        let row = Row {
            tutor_id: UserId::from("7"),
            tutor_name: "Ana".to_string(),
            child_id: None,
            child_name: "N/A".to_string(),
            child_age: None,
            is_child: false,
        };
        let line = roster_line(&row);
        assert!(line.starts_with("7 "));
        assert!(line.trim_end().ends_with("N/A"));

        let child_row = Row {
            child_id: Some(ChildId::from("c-3")),
            child_name: "Sofia".to_string(),
            child_age: Some(6),
            is_child: true,
            ..row
        };
        let line = roster_line(&child_row);
        assert!(line.starts_with("c-3"));
        assert!(line.trim_end().ends_with('6'));
    }
}
