//! Dispatch precedence for inbound events.
//!
//! Evaluated top-down, first match wins:
//! 1. an active meta-state claims every event
//! 2. commands nobody registered become an unknown-command meta-state
//! 3. universal commands (`/start`, `/cancel`)
//! 4. the handler registered for the exact (state, event) pair
//! 5. navigation commands valid in every dialog state
//! 6. the fallback of the state's family

use crate::dialogue::{DialogState, MetaKind, StateFamily};
use crate::fsm::event::{CallbackAction, Command, Event, SettingsFlag};
use crate::word_model::HintType;

/// Outcome of the top-level guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Meta(MetaKind),
    UnknownCommand(String),
    Dialog(Route),
}

/// Dialog handler selected for a non-meta event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Start,
    Cancel,
    Help,
    ChooseLanguage,
    OpenSettings,
    BeginStudy,
    NothingToRetry,
    SelectLanguage(String),
    EditStartWord,
    SubmitStartWord(String),
    ToggleSetting(SettingsFlag),
    Know,
    DontKnow,
    ConfirmKnown,
    RetractKnown,
    NextWord,
    BackToWord,
    SkipWord,
    ShowImage,
    ShowHint(HintType),
    CreateHint(HintType),
    EditHint(HintType),
    SubmitHint(String),
    Fallback(StateFamily),
}

pub fn classify(state: &DialogState, event: &Event) -> Dispatch {
    if let DialogState::Meta(kind) = state {
        return Dispatch::Meta(*kind);
    }
    if let Some(Command::Unknown(name)) = event.command() {
        return Dispatch::UnknownCommand(name.clone());
    }
    Dispatch::Dialog(route(state, event))
}

fn route(state: &DialogState, event: &Event) -> Route {
    match event.command() {
        Some(Command::Start) | Some(Command::Reset) => return Route::Start,
        Some(Command::Cancel) => return Route::Cancel,
        _ => {}
    }

    if let Some(route) = state_route(state, event) {
        return route;
    }

    match event.command() {
        Some(Command::Help) => Route::Help,
        Some(Command::Language) => Route::ChooseLanguage,
        Some(Command::Settings) => Route::OpenSettings,
        Some(Command::Study) => Route::BeginStudy,
        Some(Command::Retry) => Route::NothingToRetry,
        _ => Route::Fallback(state.family()),
    }
}

fn state_route(state: &DialogState, event: &Event) -> Option<Route> {
    use CallbackAction as A;
    use DialogState as S;

    let route = match (state, event) {
        (S::SelectingLanguage, Event::Callback(A::SelectLanguage(id))) => Route::SelectLanguage(id.clone()),

        (S::ViewingSettings, Event::Callback(A::EditStartWord)) => Route::EditStartWord,
        (S::ViewingSettings, Event::Callback(A::Toggle(flag))) => Route::ToggleSetting(*flag),
        (S::ViewingSettings, Event::Callback(A::StartStudy)) => Route::BeginStudy,
        (S::WaitingStartWord, Event::Text(text)) => Route::SubmitStartWord(text.clone()),

        (S::Studying, Event::Callback(A::Know)) => Route::Know,
        (S::Studying, Event::Callback(A::DontKnow)) => Route::DontKnow,
        (S::Studying, Event::Callback(A::Skip)) => Route::SkipWord,
        (S::Studying, Event::Callback(A::ShowImage)) => Route::ShowImage,
        (S::Studying, Event::Callback(A::Next)) => Route::NextWord,
        (S::ConfirmingWordKnowledge, Event::Callback(A::Confirm)) => Route::ConfirmKnown,
        (S::ConfirmingWordKnowledge, Event::Callback(A::Retract)) => Route::RetractKnown,
        (S::ViewingWordDetails, Event::Callback(A::Next | A::Back)) => Route::NextWord,
        (S::ViewingWordImage, Event::Callback(A::Back)) => Route::BackToWord,
        (S::ViewingWordImage, Event::Callback(A::Next)) => Route::NextWord,

        (s, Event::Callback(A::ShowHint(t))) if s.family() == StateFamily::Study => Route::ShowHint(*t),
        (s, Event::Callback(A::CreateHint(t))) if s.family() == StateFamily::Study => Route::CreateHint(*t),
        (s, Event::Callback(A::EditHint(t))) if s.family() == StateFamily::Study => Route::EditHint(*t),

        (S::CreatingHint { .. } | S::EditingHint { .. }, Event::Text(text)) => Route::SubmitHint(text.clone()),
        (S::CreatingHint { .. } | S::EditingHint { .. }, Event::Callback(A::Back)) => Route::BackToWord,

        _ => return None,
    };
    Some(route)
}
