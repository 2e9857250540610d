//! Plain-text rendering of the explorer state.

use std::fmt::Write;

use crate::app::Explorer;
use crate::models::{Character, DialogueResult, Interpretation, Location, Note, SearchResult, Status};
use crate::narrator::script_lines;

const RULE: &str = "────────────────────────────────────────────────────────────";

pub fn page_label(page: u32, total_pages: u32) -> String {
    format!("Page {page} of {total_pages}")
}

pub fn search_banner(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("Showing {count} character{plural} for your query.")
}

fn status_badge(status: Status) -> &'static str {
    match status {
        Status::Alive => "●",
        Status::Dead => "✝",
        Status::Unknown => "?",
    }
}

fn character_row(c: &Character) -> String {
    let detail = if !c.species.is_empty() {
        c.species.as_str()
    } else {
        c.location.as_deref().unwrap_or("Unknown")
    };
    format!("  {} [{:>4}] {} ({}, {detail})", status_badge(c.status), c.id, c.name, c.status)
}

fn pass_fail(ok: bool) -> &'static str {
    if ok {
        "PASS"
    } else {
        "FAIL"
    }
}

pub fn render_locations(locations: &[Location]) -> String {
    let mut out = String::new();
    for loc in locations {
        let _ = writeln!(out, "{} <{}>", loc.name, loc.kind);
        for c in &loc.residents {
            let _ = writeln!(out, "{}", character_row(c));
        }
        out.push('\n');
    }
    out
}

fn render_interpretation(interp: &Interpretation) -> String {
    let any = |v: &Option<String>| v.clone().filter(|s| !s.is_empty()).unwrap_or_else(|| "Any".into());
    format!(
        "Interpreted filters: Status: {} | Species: {} | Episode: {} | Location: {}",
        any(&interp.status),
        any(&interp.species),
        any(&interp.episode_code),
        any(&interp.location_name),
    )
}

pub fn render_search(result: &SearchResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Search Results");
    let _ = writeln!(out, "{}", search_banner(result.count));
    if let Some(interp) = &result.interpretation {
        let _ = writeln!(out, "{}", render_interpretation(interp));
    }
    if result.results.is_empty() {
        let _ = writeln!(out, "No characters matched this query.");
    }
    for c in &result.results {
        let _ = writeln!(out, "{}", character_row(c));
    }
    out
}

/// Script lines with the currently spoken one marked.
pub fn render_script(dialogue: &str, spoken: Option<usize>) -> String {
    let mut out = String::new();
    for (i, line) in script_lines(dialogue).into_iter().enumerate() {
        let marker = if spoken == Some(i) { "▶" } else { " " };
        let _ = writeln!(out, " {marker} {line}");
    }
    out
}

pub fn render_metrics(result: &DialogueResult) -> String {
    let h = &result.metrics.heuristics;
    let r = &result.metrics.rubric;
    let stars = "★".repeat(usize::from(r.score.min(5)));
    format!(
        "Factual checks: Name {} | Status Check {}\nCreativity: {stars} / 5\nReason: {}\n",
        pass_fail(h.mentions_name),
        pass_fail(h.status_check),
        r.reason,
    )
}

pub fn render_notes(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "No notes yet.\n".into();
    }
    let mut out = String::new();
    for n in notes {
        let when = n.timestamp.format("%Y-%m-%d %H:%M");
        match &n.id {
            Some(id) => {
                let _ = writeln!(out, "  #{id} {when}  {}", n.text);
            }
            None => {
                let _ = writeln!(out, "  -  {when}  {}", n.text);
            }
        }
    }
    out
}

fn render_detail(app: &Explorer, c: &Character) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{} [{}] {} · {}", c.name, c.id, c.status, c.species);
    if app.is_ai_loading() {
        let _ = writeln!(out, "Consulting Rick...");
    }

    if let Some(result) = app.ai_result() {
        let narrator = app.narrator();
        let sound = if !narrator.is_supported() {
            "speech unavailable"
        } else if narrator.is_muted() {
            "muted"
        } else {
            "sound on"
        };
        let toggle = if app.is_script_collapsed() { "show" } else { "hide" };
        let _ = writeln!(out, "\nGenerated Script ({sound}, `script` to {toggle})");
        if !app.is_script_collapsed() {
            out.push_str(&render_script(&result.dialogue, narrator.spoken_index()));
        }
        out.push('\n');
        out.push_str(&render_metrics(result));
    }

    let _ = writeln!(out, "\nField Notes");
    out.push_str(&render_notes(app.selected_notes()));
    if !app.note_input().is_empty() {
        let _ = writeln!(out, "  (unsaved: {})", app.note_input());
    }
    let _ = writeln!(out, "{RULE}");
    out
}

/// Render the whole screen.
pub fn render(app: &Explorer) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Rick & Morty AI Explorer");
    if app.is_searching() {
        let _ = writeln!(out, "Thinking about {:?}...", app.search_query());
    }
    out.push('\n');

    if app.is_loading() {
        let _ = writeln!(out, "Loading the Multiverse...");
    } else if let Some(error) = app.error() {
        let _ = writeln!(out, "Error: {error}");
    } else if let Some(result) = app.search_result() {
        out.push_str(&render_search(result));
    } else if app.locations().is_empty() {
        let _ = writeln!(out, "No entities found based on your filters.");
    } else {
        out.push_str(&render_locations(app.locations()));
        if app.total_pages() > 1 {
            let prev = if app.has_prev() { "prev" } else { "----" };
            let next = if app.has_next() { "next" } else { "----" };
            let _ = writeln!(out, "{}   [{prev}] [{next}]", page_label(app.page(), app.total_pages()));
        }
    }

    if let Some(c) = app.selected() {
        out.push('\n');
        out.push_str(&render_detail(app, c));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Heuristics, Metrics, NoteId, Rubric};
    use chrono::{TimeZone, Utc};

    #[test]
    fn banner_pluralization() {
        assert_eq!(search_banner(2), "Showing 2 characters for your query.");
        assert_eq!(search_banner(1), "Showing 1 character for your query.");
        assert_eq!(search_banner(0), "Showing 0 characters for your query.");
    }

    #[test]
    fn script_marks_spoken_line_by_filtered_index() {
        let out = render_script("Rick: one\n\nMorty: two\n", Some(1));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, ["   Rick: one", " ▶ Morty: two"]);
    }

    #[test]
    fn interpretation_defaults_to_any() {
        let result = SearchResult {
            interpretation: Some(Interpretation {
                status: Some("Dead".into()),
                species: Some("Alien".into()),
                ..Interpretation::default()
            }),
            count: 0,
            results: vec![],
        };
        let out = render_search(&result);
        assert!(out.contains("Status: Dead | Species: Alien | Episode: Any | Location: Any"));
        assert!(out.contains("No characters matched this query."));
    }

    #[test]
    fn metrics_stars_and_checks() {
        let result = DialogueResult {
            dialogue: String::new(),
            metrics: Metrics {
                heuristics: Heuristics {
                    mentions_name: true,
                    status_check: false,
                },
                rubric: Rubric {
                    score: 4,
                    reason: "Snappy".into(),
                },
            },
            success: true,
        };
        let out = render_metrics(&result);
        assert!(out.contains("Name PASS | Status Check FAIL"));
        assert!(out.contains("★★★★ / 5"));
        assert!(out.contains("Reason: Snappy"));
    }

    #[test]
    fn notes_without_id_have_no_handle() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 0).unwrap();
        let notes = vec![
            Note { id: Some(NoteId::Int(12)), text: "Pickle".into(), timestamp: ts },
            Note { id: None, text: "Unsynced".into(), timestamp: ts },
        ];
        let out = render_notes(&notes);
        assert!(out.contains("#12 2025-03-04 05:06  Pickle"));
        assert!(out.contains("-  2025-03-04 05:06  Unsynced"));
        assert_eq!(render_notes(&[]), "No notes yet.\n");
    }
}
