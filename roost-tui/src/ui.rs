use chrono::Local;
use ratatui::{
    prelude::*,
    widgets::{
        Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap,
    },
};
use roost_core::{
    commute::CommuteTimes,
    coordinator::{EpochData, RefreshStatus, Snapshot},
    model::{LocationInsights, NearestInstitution},
};

use crate::app::{App, Screen};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();
    let snapshot = app.snapshot();

    // Outer layout: location header, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    frame.render_widget(header(&snapshot), *header_area);

    match app.screen {
        Screen::Search => draw_search(frame, app, *content_area),
        Screen::Insights => draw_insights(frame, app, &snapshot, *content_area),
        Screen::Categories => draw_categories(frame, app, &snapshot, *content_area),
    }

    // Status bar
    let nav_hint = match app.screen {
        Screen::Search => "Type to search · ↑/↓ pick · Enter go · Tab/Esc insights · Ctrl-C quit",
        Screen::Insights => {
            "↑/↓ listing · w/b/d route · +/- radius · [/] budget · g my location · / search · Tab categories · q quit"
        }
        Screen::Categories => "↑/↓ move · Enter/Space toggle · Tab/Esc back · q quit",
    };

    let failure = match &snapshot.status {
        RefreshStatus::Failed { message } => Some(message.as_str()),
        _ => None,
    };
    let message = app.error_message.as_deref().or(failure);

    let status_text = if app.is_loading() {
        format!("Loading… · {nav_hint}")
    } else if let Some(msg) = message {
        format!("{msg} · {nav_hint}")
    } else {
        nav_hint.to_owned()
    };

    let status_style = if message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_loading() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn header(snapshot: &Snapshot) -> Paragraph<'static> {
    let place = match (&snapshot.label, snapshot.params.center) {
        (Some(label), _) => label.clone(),
        (None, Some(center)) => center.to_string(),
        (None, None) => "no location yet".to_owned(),
    };
    let budget = snapshot
        .params
        .max_price
        .map_or_else(|| "any budget".to_owned(), |max| format!("≤ {max}/month"));
    let refreshed = snapshot.data.as_ref().map_or_else(String::new, |data| {
        format!(
            " · updated {}",
            data.refreshed_at.with_timezone(&Local).format("%H:%M:%S")
        )
    });

    Paragraph::new(format!(
        "{place} · radius {} m · {budget}{refreshed}",
        snapshot.params.radius_m
    ))
    .block(Block::default().borders(Borders::ALL).title("Roost"))
}

fn draw_search(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // input
            Constraint::Min(0),    // suggestions
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [input_area, results_area] = chunks else {
        return;
    };

    let input = Paragraph::new(app.query_input.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Search a neighbourhood, campus or landmark"),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(input, *input_area);

    let items = if app.suggestions.is_empty() {
        vec![ListItem::new(
            "No suggestions yet. Keep typing, or press Enter to search the text as is.",
        )]
    } else {
        app.suggestions
            .iter()
            .map(|found| ListItem::new(found.display_name.clone()))
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Suggestions (↑/↓, Enter)"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !app.suggestions.is_empty() {
        state.select(Some(app.suggestion_index));
    }
    frame.render_stateful_widget(list, *results_area, &mut state);
}

fn draw_insights(frame: &mut Frame<'_>, app: &App, snapshot: &Snapshot, area: Rect) {
    let Some(data) = snapshot.data.as_deref() else {
        let text = if app.is_loading() {
            "Loading nearby places…"
        } else {
            "No data yet. Search a place with / or press g to use your location."
        };
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Insights"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);
    let [left, right] = columns.as_ref() else {
        return;
    };

    let left_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(12), Constraint::Length(5)])
        .split(*left);
    let [scores_area, institution_area] = left_rows.as_ref() else {
        return;
    };

    match &data.insights {
        Some(insights) => frame.render_widget(scores_table(insights), *scores_area),
        None => {
            let paragraph = Paragraph::new("Scores unavailable for this location.")
                .block(Block::default().borders(Borders::ALL).title("Scores"))
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, *scores_area);
        }
    }
    frame.render_widget(institution_panel(data.nearest.as_ref()), *institution_area);

    let right_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(4)])
        .split(*right);
    let [listings_area, route_area] = right_rows.as_ref() else {
        return;
    };

    draw_listings(frame, app, data, *listings_area);

    let route_text = match &snapshot.route {
        Some(route) => {
            let source = if route.estimate.is_estimated {
                "estimated"
            } else {
                "routed"
            };
            format!(
                "{}: {} · {} by {} ({source})",
                route.listing_id,
                route.estimate.distance_text,
                route.estimate.duration_text,
                route.estimate.mode
            )
        }
        None => "Press w, b or d for a walking, cycling or driving route to the nearest institution."
            .to_owned(),
    };
    let route = Paragraph::new(route_text)
        .block(Block::default().borders(Borders::ALL).title("Route"))
        .wrap(Wrap { trim: true });
    frame.render_widget(route, *route_area);
}

fn scores_table(insights: &LocationInsights) -> Table<'static> {
    let mut rows: Vec<Row<'static>> = insights
        .scores
        .named()
        .into_iter()
        .map(|(name, score)| {
            Row::new(vec![Cell::from(name), Cell::from(score.to_string())])
                .style(Style::default().fg(score_color(score)))
        })
        .collect();

    rows.push(
        Row::new(vec![
            Cell::from("overall"),
            Cell::from(insights.scores.overall.to_string()),
        ])
        .style(Style::default().add_modifier(Modifier::BOLD)),
    );

    let cost = insights.cost_estimate;
    rows.push(Row::new(vec![
        Cell::from("monthly cost"),
        Cell::from(format!(
            "{} (food {}, transport {}, misc {})",
            cost.total, cost.food, cost.transport, cost.misc
        )),
    ]));
    if insights.is_24x7_available {
        rows.push(Row::new(vec![Cell::from("24/7"), Cell::from("available nearby")]));
    }

    Table::new(rows, [Constraint::Length(14), Constraint::Min(10)])
        .header(
            Row::new(vec!["Score", "Value"]).style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title("Scores"))
        .column_spacing(1)
}

fn institution_panel(nearest: Option<&NearestInstitution>) -> Paragraph<'static> {
    let text = nearest.map_or_else(
        || "No institution within the search radius.".to_owned(),
        |institution| {
            format!(
                "{} · {:.2} km away",
                institution.place.name, institution.distance_km
            )
        },
    );
    Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Nearest institution"),
        )
        .wrap(Wrap { trim: true })
}

fn draw_listings(frame: &mut Frame<'_>, app: &App, data: &EpochData, area: Rect) {
    let title = format!("Listings ({})", data.listings.len());

    if data.listings.is_empty() {
        let paragraph = Paragraph::new("No listings match the current radius and budget.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let rows = data.listings.iter().map(|listing| {
        let commute = data
            .commutes
            .iter()
            .find(|commute| commute.listing_id == listing.id);
        let minutes = |pick: fn(&CommuteTimes) -> u32| {
            commute.map_or_else(|| "-".to_owned(), |found| pick(&found.times).to_string())
        };
        let name = if listing.title.is_empty() {
            listing.id.to_string()
        } else {
            listing.title.clone()
        };

        Row::new(vec![
            Cell::from(name),
            Cell::from(listing.price.to_string()),
            Cell::from(minutes(|times| times.walking_min)),
            Cell::from(minutes(|times| times.cycling_min)),
            Cell::from(minutes(|times| times.driving_min)),
        ])
    });

    let column_widths = [
        Constraint::Min(20),
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Listing", "Price", "Walk", "Cycle", "Drive"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .column_spacing(1);

    let mut state = TableState::default();
    state.select(Some(app.listing_index));
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_categories(frame: &mut Frame<'_>, app: &App, snapshot: &Snapshot, area: Rect) {
    let counts = snapshot
        .data
        .as_ref()
        .and_then(|data| data.insights.as_ref());

    let items = snapshot
        .params
        .categories
        .iter()
        .map(|filter| {
            let mark = if filter.is_enabled() { "[x]" } else { "[ ]" };
            let found = counts.map_or_else(String::new, |insights| {
                format!(" · {}", insights.count(filter.id.as_str()))
            });
            let locked = if filter.id.is_institution() {
                " (always on)"
            } else {
                ""
            };
            ListItem::new(format!("{mark} {}{found}{locked}", filter.display_name))
        })
        .collect::<Vec<ListItem<'_>>>();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Categories (↑/↓, Enter to toggle)"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    state.select(Some(app.category_index));
    frame.render_stateful_widget(list, area, &mut state);
}

fn score_color(score: u8) -> Color {
    match score {
        70..=u8::MAX => Color::Green,
        40..=69 => Color::Yellow,
        _ => Color::Red,
    }
}
