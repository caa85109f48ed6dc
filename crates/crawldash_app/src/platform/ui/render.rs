use std::fmt::Write;

use crawldash_core::{
    DashboardView, DetailState, DetailView, JobListView, NotificationLevel, StatsView,
};

const URL_WIDTH: usize = 48;

/// Renders the whole dashboard as plain text.
pub fn render(view: &DashboardView) -> String {
    let mut out = String::new();
    render_stats(&mut out, &view.stats);
    out.push('\n');
    render_list(&mut out, &view.list);
    if let Some(detail) = &view.detail {
        out.push('\n');
        render_detail(&mut out, detail);
    }

    out.push('\n');
    let _ = write!(out, "Add URL: [{}]", view.form.input);
    if view.form.submitting {
        out.push_str(" (submitting)");
    }
    out.push('\n');
    if let Some(error) = &view.form.field_error {
        let _ = writeln!(out, "  ! {error}");
    }
    if view.pending_mutations > 0 {
        let _ = writeln!(out, "Waiting for {} request(s)", view.pending_mutations);
    }

    for notification in &view.notifications {
        let tag = match notification.level {
            NotificationLevel::Success => "ok",
            NotificationLevel::Warning => "warn",
            NotificationLevel::Error => "error",
        };
        let _ = writeln!(out, "[{}] {}: {}", notification.id, tag, notification.text);
    }
    out
}

fn render_stats(out: &mut String, stats: &StatsView) {
    let total = match stats.total {
        Some(total) => total.to_string(),
        None if stats.loading => "...".to_string(),
        None => "-".to_string(),
    };
    let _ = write!(out, "Total: {total}");
    for (status, count) in &stats.breakdown {
        let _ = write!(out, " | {status}: {count}");
    }
    if stats.loading && stats.total.is_some() {
        out.push_str(" (refreshing)");
    }
    out.push('\n');
    if let Some(error) = &stats.error {
        let _ = writeln!(out, "  ! stats unavailable: {error}");
    }
}

fn render_list(out: &mut String, list: &JobListView) {
    let filter = list
        .filter_status
        .as_ref()
        .map_or("all", |status| status.as_str());
    let _ = write!(
        out,
        "Jobs (filter: {filter}, sort: {} {}",
        list.sort_by.as_str(),
        list.sort_order.as_str()
    );
    if !list.search.trim().is_empty() {
        let _ = write!(out, ", search: {:?}", list.search.trim());
    }
    out.push_str(")\n");

    if let Some(error) = &list.error {
        let _ = writeln!(out, "  ! {error}");
    }
    if list.rows.is_empty() {
        if list.loading {
            out.push_str("  loading...\n");
        } else if list.count.is_some() {
            out.push_str("  no jobs found\n");
        }
    }
    for row in &list.rows {
        let mark = if row.selected { 'x' } else { ' ' };
        let busy = if row.busy { " *" } else { "" };
        let _ = writeln!(
            out,
            "  [{mark}] {:>5}  {:<width$}  {}{busy}",
            row.id,
            truncate(&row.url, URL_WIDTH),
            row.status,
            width = URL_WIDTH
        );
    }

    let count = list
        .count
        .map_or_else(|| "?".to_string(), |count| count.to_string());
    let _ = write!(
        out,
        "Page {} of {} ({count} jobs)",
        list.page, list.total_pages
    );
    if list.loading && !list.rows.is_empty() {
        out.push_str(" (refreshing)");
    }
    if !list.selected.is_empty() {
        let _ = write!(out, ", {} selected", list.selected.len());
    }
    out.push('\n');
}

fn render_detail(out: &mut String, detail: &DetailView) {
    let _ = writeln!(out, "Analysis of job {}:", detail.id);
    match &detail.state {
        DetailState::Loading => out.push_str("  loading...\n"),
        DetailState::NoAnalysis => out.push_str("  No analysis found yet.\n"),
        DetailState::Unknown => out.push_str("  URL not found.\n"),
        DetailState::Failed(error) => {
            let _ = writeln!(out, "  ! {error}");
        }
        DetailState::Analyzed(analysis) => {
            let _ = writeln!(
                out,
                "  Title: {}",
                analysis.title.as_deref().unwrap_or("(none)")
            );
            let _ = writeln!(
                out,
                "  HTML version: {}",
                analysis.html_version.as_deref().unwrap_or("unknown")
            );
            let headings = (1..=6)
                .map(|level| format!("h{level}={}", analysis.heading_count(level)))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "  Headings: {headings}");
            let _ = writeln!(
                out,
                "  Links: {} internal, {} external, {} inaccessible",
                analysis.internal_links_count,
                analysis.external_links_count,
                analysis.inaccessible_links_count
            );
            let _ = writeln!(
                out,
                "  Login form: {}",
                if analysis.has_login_form { "yes" } else { "no" }
            );
            if analysis.broken_links.is_empty() {
                out.push_str("  No broken links.\n");
            }
            for link in &analysis.broken_links {
                let _ = writeln!(out, "  broken: {} ({})", link.link_url, link.status_code);
            }
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(3)).collect();
    short.push_str("...");
    short
}
