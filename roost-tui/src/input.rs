use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use roost_core::{coordinator::Trigger, model::TravelMode};

use crate::app::{App, Screen, step_budget, step_radius};

#[derive(Debug, Clone)]
pub(crate) enum Action {
    None,
    Quit,
    /// Query text changed; ask for debounced suggestions
    InputChanged,
    /// Hand a trigger to the refresh coordinator
    Refresh(Trigger),
    /// Routed lookup for the highlighted listing
    RequestRoute(TravelMode),
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Backspace, Char, Down, Enter, Esc, Tab, Up};

    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    // Shortcuts shared by the non-typing screens
    if app.screen != Screen::Search
        && !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        match key.code {
            Char('q') => return Action::Quit,
            Char('/') => {
                app.screen = Screen::Search;
                return Action::None;
            }
            Char('g') => return use_current_location(app),
            Char('+' | '=') => {
                let radius_m = step_radius(app.radius_m(), true);
                return Action::Refresh(Trigger::RadiusChange(radius_m));
            }
            Char('-') => {
                let radius_m = step_radius(app.radius_m(), false);
                return Action::Refresh(Trigger::RadiusChange(radius_m));
            }
            Char(']') => {
                return Action::Refresh(Trigger::BudgetChange(step_budget(app.max_price(), true)));
            }
            Char('[') => {
                return Action::Refresh(Trigger::BudgetChange(step_budget(app.max_price(), false)));
            }
            _ => {}
        }
    }

    let mut action = Action::None;

    match app.screen {
        Screen::Search => match key.code {
            Up => {
                if app.suggestion_index > 0 {
                    app.suggestion_index -= 1;
                }
            }
            Down => {
                if app.suggestion_index + 1 < app.suggestions.len() {
                    app.suggestion_index += 1;
                }
            }
            Char(character) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT)
                {
                    app.query_input.push(character);
                    action = Action::InputChanged;
                }
            }
            Backspace => {
                app.query_input.pop();
                action = Action::InputChanged;
            }
            Enter => {
                action = if let Some(picked) = app.pick_suggestion() {
                    Action::Refresh(Trigger::SuggestionSelected(picked))
                } else if app.query_input.trim().is_empty() {
                    app.error_message = Some("Type a place name, then press Enter".into());
                    Action::None
                } else {
                    app.screen = Screen::Insights;
                    Action::Refresh(Trigger::ManualSearch(app.query_input.clone()))
                };
            }
            Tab | Esc => {
                app.screen = Screen::Insights;
            }
            _ => {}
        },

        Screen::Insights => match key.code {
            Up | Char('k') => {
                if app.listing_index > 0 {
                    app.listing_index -= 1;
                }
            }
            Down | Char('j') => {
                if app.listing_index + 1 < app.listing_count() {
                    app.listing_index += 1;
                }
            }
            Char('w') => action = Action::RequestRoute(TravelMode::Walking),
            Char('b') => action = Action::RequestRoute(TravelMode::Cycling),
            Char('d') => action = Action::RequestRoute(TravelMode::Driving),
            Tab => app.screen = Screen::Categories,
            Esc => app.screen = Screen::Search,
            _ => {}
        },

        Screen::Categories => match key.code {
            Up | Char('k') => {
                if app.category_index > 0 {
                    app.category_index -= 1;
                }
            }
            Down | Char('j') => {
                if app.category_index + 1 < app.category_count() {
                    app.category_index += 1;
                }
            }
            Enter | Char(' ') => {
                if let Some(id) = app.highlighted_category() {
                    action = Action::Refresh(Trigger::CategoryToggle(id));
                }
            }
            Tab | Esc => app.screen = Screen::Insights,
            _ => {}
        },
    }
    action
}

fn use_current_location(app: &mut App) -> Action {
    if let Some(home) = app.home {
        Action::Refresh(Trigger::UseCurrentLocation(home))
    } else {
        app.error_message =
            Some("Set ROOST_HOME_LAT and ROOST_HOME_LON to use your location".into());
        Action::None
    }
}
