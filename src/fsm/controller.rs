//! Dialog controller: the handlers behind every [`Route`].
//!
//! Handlers read and write the session, pull study items from the word queue
//! and call the scheduler on answers. Backend failures are returned as
//! `Err` untouched; turning them into meta-states is the recovery layer's job.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::backend::{BackendGateway, BackendUserId};
use crate::config::{QueueConfig, SchedulerPolicy};
use crate::dialogue::{validate_hint_text, validate_start_word, DialogState, StateFamily};
use crate::errors::{GatewayError, InputError};
use crate::fsm::event::{CallbackAction, SettingsFlag};
use crate::fsm::outbound::{Button, Outbound, Reply};
use crate::fsm::routing::Route;
use crate::scheduler::{next_progress, Answer};
use crate::session::{Session, StudyContext};
use crate::word_model::{HintType, Settings, SettingsPatch, StudyItem};
use crate::word_queue::WordQueue;

pub type HandlerResult = Result<Vec<Outbound>, GatewayError>;

/// Everything one turn of one user may touch
pub struct Turn<'a, B> {
    pub backend: &'a B,
    pub session: &'a mut Session,
    pub queue: &'a mut Option<WordQueue>,
    pub today: NaiveDate,
}

/// The dialog state machine
#[derive(Debug, Clone, Default)]
pub struct Controller {
    scheduler: SchedulerPolicy,
    queue: QueueConfig,
}

impl Controller {
    pub fn new(scheduler: SchedulerPolicy, queue: QueueConfig) -> Self {
        Self { scheduler, queue }
    }

    /// Run the handler selected by the router
    pub async fn apply<B: BackendGateway>(&self, turn: &mut Turn<'_, B>, route: Route) -> HandlerResult {
        let from = turn.session.state.clone();
        let submits = matches!(route, Route::SubmitStartWord(_) | Route::SubmitHint(_));
        debug!(user_id = turn.session.user_id, state = ?from, route = ?route, "Routing event");

        let replies = match route {
            Route::Start => self.start(turn).await?,
            Route::Cancel => self.cancel(turn).await?,
            Route::Help => vec![Reply::new("help-text").into()],
            Route::NothingToRetry => vec![Reply::new("retry-not-needed").into()],
            Route::ChooseLanguage => self.prompt_languages(turn, None).await?,
            Route::OpenSettings => self.open_settings(turn, None).await?,
            Route::BeginStudy => self.begin_study(turn).await?,
            Route::SelectLanguage(id) => self.select_language(turn, &id).await?,
            Route::EditStartWord => self.edit_start_word(turn),
            Route::SubmitStartWord(text) => self.submit_start_word(turn, &text).await?,
            Route::ToggleSetting(flag) => self.toggle_setting(turn, flag).await?,
            Route::Know => self.know(turn),
            Route::DontKnow => self.dont_know(turn).await?,
            Route::ConfirmKnown => self.confirm_known(turn).await?,
            Route::RetractKnown => self.retract_known(turn).await?,
            Route::NextWord => self.next_word(turn).await?,
            Route::BackToWord => self.back_to_word(turn).await?,
            Route::SkipWord => self.skip_word(turn).await?,
            Route::ShowImage => self.show_image(turn).await?,
            Route::ShowHint(hint_type) => self.show_hint(turn, hint_type).await?,
            Route::CreateHint(hint_type) => self.begin_hint_edit(turn, hint_type, false).await?,
            Route::EditHint(hint_type) => self.begin_hint_edit(turn, hint_type, true).await?,
            Route::SubmitHint(text) => self.submit_hint(turn, &text).await?,
            Route::Fallback(family) => self.fallback(turn, family).await?,
        };

        if turn.session.state != from {
            if from.is_waiting_for_input() && !submits {
                debug!(user_id = turn.session.user_id, state = ?from, "Pending edit abandoned");
            }
            info!(
                user_id = turn.session.user_id,
                from = ?from,
                to = ?turn.session.state,
                "Dialog state transition"
            );
        }
        Ok(replies)
    }

    /// Neutral state after a recovered outage, re-derived from the backend
    pub async fn restore_idle<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        *turn.queue = None;
        if turn.session.current_language.is_some() {
            turn.session.settings = None;
            self.open_settings(turn, None).await
        } else {
            self.prompt_languages(turn, None).await
        }
    }

    /// Fresh start from language selection
    pub async fn start_over<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        *turn.queue = None;
        self.prompt_languages(turn, Some("welcome")).await
    }

    // ---------------------------------------------------------------------
    // Universal and navigation commands
    // ---------------------------------------------------------------------

    async fn start<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        turn.session.reset();
        *turn.queue = None;
        self.ensure_user(turn).await?;

        if turn.session.current_language.is_some() {
            self.open_settings(turn, Some("welcome-back")).await
        } else {
            self.prompt_languages(turn, Some("welcome")).await
        }
    }

    async fn cancel<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        turn.session.study = StudyContext::default();
        if turn.session.current_language.is_none() {
            return self.prompt_languages(turn, Some("cancelled")).await;
        }
        self.open_settings(turn, Some("cancelled")).await
    }

    async fn prompt_languages<B: BackendGateway>(
        &self,
        turn: &mut Turn<'_, B>,
        intro: Option<&'static str>,
    ) -> HandlerResult {
        let languages = turn.backend.list_languages().await?;
        turn.session.study = StudyContext::default();
        turn.session.state = DialogState::SelectingLanguage;
        turn.session.available_languages = languages;

        let mut replies = intro_reply(intro);
        replies.push(language_prompt(turn.session).into());
        Ok(replies)
    }

    async fn open_settings<B: BackendGateway>(
        &self,
        turn: &mut Turn<'_, B>,
        intro: Option<&'static str>,
    ) -> HandlerResult {
        if turn.session.current_language.is_none() {
            return self.prompt_languages(turn, Some("language-required")).await;
        }
        let settings = self.ensure_settings(turn).await?;
        turn.session.study = StudyContext::default();
        turn.session.state = DialogState::ViewingSettings;

        let mut replies = intro_reply(intro);
        replies.push(settings_overview(turn.session, &settings).into());
        Ok(replies)
    }

    async fn begin_study<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        if turn.session.current_language.is_none() {
            return self.prompt_languages(turn, Some("language-required")).await;
        }
        self.ensure_settings(turn).await?;
        self.present_next(turn, Vec::new()).await
    }

    // ---------------------------------------------------------------------
    // Language and settings family
    // ---------------------------------------------------------------------

    async fn select_language<B: BackendGateway>(&self, turn: &mut Turn<'_, B>, id: &str) -> HandlerResult {
        let mut language = turn.session.available_languages.iter().find(|l| l.id == id).cloned();
        if language.is_none() {
            // Button from an older prompt; the catalogue may have changed since
            let languages = turn.backend.list_languages().await?;
            language = languages.iter().find(|l| l.id == id).cloned();
            turn.session.available_languages = languages;
        }

        let Some(language) = language else {
            warn!(user_id = turn.session.user_id, language_id = %id, "Unknown language selected");
            return Ok(vec![
                Reply::new("language-unknown").into(),
                language_prompt(turn.session).into(),
            ]);
        };

        info!(user_id = turn.session.user_id, language_id = %language.id, "Language selected");
        let name = language.name.clone();
        turn.session.current_language = Some(language);
        turn.session.settings = None;
        *turn.queue = None;

        let mut replies = self.open_settings(turn, None).await?;
        replies.insert(0, Reply::new("language-selected").arg("language", name).into());
        Ok(replies)
    }

    fn edit_start_word<B>(&self, turn: &mut Turn<'_, B>) -> Vec<Outbound> {
        turn.session.state = DialogState::WaitingStartWord;
        vec![start_word_prompt(turn.session).into()]
    }

    async fn submit_start_word<B: BackendGateway>(&self, turn: &mut Turn<'_, B>, text: &str) -> HandlerResult {
        let start_word = match validate_start_word(text) {
            Ok(n) => n,
            Err(e) => return Ok(self.reprompt(turn.session, e, start_word_prompt(turn.session))),
        };

        let patch = SettingsPatch {
            start_word: Some(start_word),
            ..Default::default()
        };
        let settings = self.save_settings(turn, &patch).await?;
        turn.session.state = DialogState::ViewingSettings;
        Ok(vec![
            Reply::new("settings-saved").into(),
            settings_overview(turn.session, &settings).into(),
        ])
    }

    async fn toggle_setting<B: BackendGateway>(&self, turn: &mut Turn<'_, B>, flag: SettingsFlag) -> HandlerResult {
        let current = self.ensure_settings(turn).await?;
        let mut patch = SettingsPatch::default();
        match flag {
            SettingsFlag::SkipMarked => patch.skip_marked = Some(!current.skip_marked),
            SettingsFlag::UseCheckDate => patch.use_check_date = Some(!current.use_check_date),
            SettingsFlag::ShowHints => patch.show_hints = Some(!current.show_hints),
            SettingsFlag::HintVisibility(hint_type) => {
                let visible = current.hint_visibility.get(&hint_type).copied().unwrap_or(true);
                patch.hint_visibility.insert(hint_type, !visible);
            }
        }

        let settings = self.save_settings(turn, &patch).await?;
        turn.session.state = DialogState::ViewingSettings;
        Ok(vec![settings_overview(turn.session, &settings).into()])
    }

    // ---------------------------------------------------------------------
    // Study family
    // ---------------------------------------------------------------------

    fn know<B>(&self, turn: &mut Turn<'_, B>) -> Vec<Outbound> {
        let study = &mut turn.session.study;
        let Some(item) = study.current_word.as_ref() else {
            return vec![Reply::new("study-no-word").into()];
        };
        if study.answer_recorded.is_some() {
            return vec![answered_card(item, &turn.session.settings).into()];
        }

        let reply = Reply::new("study-confirm-known")
            .arg("word", &item.foreign_text)
            .arg("translation", &item.translation)
            .row(vec![
                Button::key("button-confirm", CallbackAction::Confirm),
                Button::key("button-retract", CallbackAction::Retract),
            ]);
        study.pending_confirmation = true;
        turn.session.state = DialogState::ConfirmingWordKnowledge;
        vec![reply.into()]
    }

    async fn confirm_known<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        turn.session.study.pending_confirmation = false;
        self.record_answer(turn, Answer::Known).await?;
        self.present_next(turn, Vec::new()).await
    }

    async fn retract_known<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        turn.session.study.pending_confirmation = false;
        self.record_answer(turn, Answer::Unknown).await?;
        turn.session.state = DialogState::Studying;
        Ok(self.current_view(turn.session))
    }

    async fn dont_know<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        if turn.session.study.answer_recorded.is_none() {
            self.record_answer(turn, Answer::Unknown).await?;
        }
        turn.session.state = DialogState::ViewingWordDetails;
        Ok(self.current_view(turn.session))
    }

    async fn next_word<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        if turn.session.study.current_word.is_some() && turn.session.study.answer_recorded.is_none() {
            turn.session.state = DialogState::Studying;
            let mut replies = vec![Reply::new("study-answer-first").into()];
            replies.extend(self.current_view(turn.session));
            return Ok(replies);
        }
        self.present_next(turn, Vec::new()).await
    }

    async fn back_to_word<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        if turn.session.study.current_word.is_none() {
            return self.present_next(turn, Vec::new()).await;
        }
        turn.session.state = DialogState::Studying;
        Ok(self.current_view(turn.session))
    }

    async fn skip_word<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        let user_id = self.ensure_user(turn).await?;
        let Some(item) = turn.session.study.current_word.as_mut() else {
            return self.present_next(turn, Vec::new()).await;
        };

        let mut record = item.progress.clone();
        record.is_skipped = true;
        item.progress = turn.backend.put_progress(user_id, item.word_id, &record).await?;
        info!(user_id = turn.session.user_id, word_id = item.word_id, "Word marked as skipped");

        let notice = Reply::new("study-word-skipped").arg("word", &item.foreign_text);
        self.present_next(turn, vec![notice.into()]).await
    }

    async fn show_image<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> HandlerResult {
        if turn.session.study.current_word.is_none() {
            return self.present_next(turn, Vec::new()).await;
        }
        turn.session.state = DialogState::ViewingWordImage;
        Ok(self.current_view(turn.session))
    }

    async fn show_hint<B: BackendGateway>(&self, turn: &mut Turn<'_, B>, hint_type: HintType) -> HandlerResult {
        let study = &mut turn.session.study;
        let Some(item) = study.current_word.as_ref() else {
            return self.present_next(turn, Vec::new()).await;
        };

        let reply = match item.hints.get(&hint_type) {
            Some(text) => {
                study.hints_shown.insert(hint_type);
                debug!(user_id = turn.session.user_id, hint = %hint_type, "Hint revealed");
                Reply::new("hint-shown")
                    .arg("type", hint_type)
                    .arg("hint", text)
                    .row(vec![Button::key("button-edit-hint", CallbackAction::EditHint(hint_type))])
            }
            None => Reply::new("hint-missing")
                .arg("type", hint_type)
                .row(vec![Button::key("button-create-hint", CallbackAction::CreateHint(hint_type))]),
        };
        Ok(vec![reply.into()])
    }

    // ---------------------------------------------------------------------
    // Hint family
    // ---------------------------------------------------------------------

    async fn begin_hint_edit<B: BackendGateway>(
        &self,
        turn: &mut Turn<'_, B>,
        hint_type: HintType,
        editing: bool,
    ) -> HandlerResult {
        if turn.session.study.current_word.is_none() {
            return self.present_next(turn, Vec::new()).await;
        }
        turn.session.state = if editing {
            DialogState::EditingHint { hint_type }
        } else {
            DialogState::CreatingHint { hint_type }
        };
        Ok(vec![hint_prompt(turn.session, hint_type).into()])
    }

    async fn submit_hint<B: BackendGateway>(&self, turn: &mut Turn<'_, B>, text: &str) -> HandlerResult {
        let hint_type = match turn.session.state {
            DialogState::CreatingHint { hint_type } | DialogState::EditingHint { hint_type } => hint_type,
            _ => {
                let family = turn.session.state.family();
                return self.fallback(turn, family).await;
            }
        };
        let text = match validate_hint_text(text) {
            Ok(text) => text,
            Err(e) => return Ok(self.reprompt(turn.session, e, hint_prompt(turn.session, hint_type))),
        };

        let user_id = self.ensure_user(turn).await?;
        let Some(item) = turn.session.study.current_word.as_mut() else {
            return self.present_next(turn, Vec::new()).await;
        };
        turn.backend.put_hint(user_id, item.word_id, hint_type, &text).await?;
        item.hints.insert(hint_type, text);
        info!(user_id = turn.session.user_id, word_id = item.word_id, hint = %hint_type, "Hint saved");

        turn.session.state = DialogState::Studying;
        let mut replies = vec![Reply::new("hint-saved").arg("type", hint_type).into()];
        replies.extend(self.current_view(turn.session));
        Ok(replies)
    }

    // ---------------------------------------------------------------------
    // Fallbacks
    // ---------------------------------------------------------------------

    async fn fallback<B: BackendGateway>(&self, turn: &mut Turn<'_, B>, family: StateFamily) -> HandlerResult {
        debug!(user_id = turn.session.user_id, family = ?family, "Fallback handler");
        match family {
            StateFamily::Language => {
                if turn.session.available_languages.is_empty() {
                    return self.prompt_languages(turn, Some("use-buttons")).await;
                }
                Ok(vec![
                    Reply::new("use-buttons").into(),
                    language_prompt(turn.session).into(),
                ])
            }
            StateFamily::Settings => {
                if turn.session.state == DialogState::WaitingStartWord {
                    return Ok(vec![start_word_prompt(turn.session).into()]);
                }
                self.open_settings(turn, Some("use-buttons")).await
            }
            StateFamily::Study => {
                if turn.session.study.current_word.is_none() {
                    return self.present_next(turn, Vec::new()).await;
                }
                let mut replies = vec![Reply::new("use-buttons").into()];
                replies.extend(self.current_view(turn.session));
                Ok(replies)
            }
            StateFamily::Hint => match turn.session.state {
                DialogState::CreatingHint { hint_type } | DialogState::EditingHint { hint_type } => {
                    Ok(vec![hint_prompt(turn.session, hint_type).into()])
                }
                _ => Ok(Vec::new()),
            },
            // Never routed here; the recovery layer owns meta-states
            StateFamily::Meta => Ok(Vec::new()),
        }
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn reprompt(&self, session: &Session, error: InputError, prompt: Reply) -> Vec<Outbound> {
        warn!(user_id = session.user_id, state = ?session.state, error = %error, "Invalid input, re-prompting");
        vec![Reply::new(error.message_key()).into(), prompt.into()]
    }

    async fn ensure_user<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> Result<BackendUserId, GatewayError> {
        if let Some(id) = turn.session.backend_user_id {
            return Ok(id);
        }
        let id = turn.backend.resolve_user(turn.session.user_id).await?;
        turn.session.backend_user_id = Some(id);
        Ok(id)
    }

    async fn ensure_settings<B: BackendGateway>(&self, turn: &mut Turn<'_, B>) -> Result<Settings, GatewayError> {
        if let Some(settings) = &turn.session.settings {
            return Ok(settings.clone());
        }
        let user_id = self.ensure_user(turn).await?;
        let Some(language_id) = turn.session.language_id().map(str::to_string) else {
            return Ok(Settings::default());
        };
        let settings = turn.backend.get_settings(user_id, &language_id).await?;
        turn.session.settings = Some(settings.clone());
        Ok(settings)
    }

    async fn save_settings<B: BackendGateway>(
        &self,
        turn: &mut Turn<'_, B>,
        patch: &SettingsPatch,
    ) -> Result<Settings, GatewayError> {
        let user_id = self.ensure_user(turn).await?;
        let Some(language_id) = turn.session.language_id().map(str::to_string) else {
            return Ok(Settings::default());
        };
        let settings = turn.backend.put_settings(user_id, &language_id, patch).await?;
        if let Some(queue) = turn.queue.as_mut() {
            queue.set_filters(settings.filters());
        }
        info!(user_id = turn.session.user_id, language_id = %language_id, "Settings updated");
        turn.session.settings = Some(settings.clone());
        Ok(settings)
    }

    /// Store the scheduler's verdict for the current word
    async fn record_answer<B: BackendGateway>(&self, turn: &mut Turn<'_, B>, answer: Answer) -> Result<(), GatewayError> {
        let user_id = self.ensure_user(turn).await?;
        let study = &mut turn.session.study;
        let hint_used = study.hint_used();
        let Some(item) = study.current_word.as_mut() else {
            return Ok(());
        };

        let next = next_progress(&self.scheduler, &item.progress, answer, hint_used, turn.today);
        item.progress = turn.backend.put_progress(user_id, item.word_id, &next).await?;
        study.answer_recorded = Some(answer);
        info!(
            user_id = turn.session.user_id,
            word_id = item.word_id,
            answer = ?answer,
            hint_used,
            interval = item.progress.check_interval,
            "Answer recorded"
        );
        Ok(())
    }

    /// Pull the next item from the queue and show it, or finish the session
    async fn present_next<B: BackendGateway>(&self, turn: &mut Turn<'_, B>, mut replies: Vec<Outbound>) -> HandlerResult {
        let user_id = self.ensure_user(turn).await?;
        let settings = self.ensure_settings(turn).await?;
        let Some(language_id) = turn.session.language_id().map(str::to_string) else {
            return self.prompt_languages(turn, Some("language-required")).await;
        };

        let filters = settings.filters();
        if turn.queue.as_ref().is_some_and(|q| !q.matches(user_id, &language_id, filters)) {
            *turn.queue = None;
        }
        let page_size = self.queue.page_size;
        let queue = turn
            .queue
            .get_or_insert_with(|| WordQueue::new(user_id, &language_id, filters, page_size));

        match queue.ensure_available(turn.backend, turn.today).await? {
            Some(item) => {
                turn.session.study = StudyContext::for_item(item);
                turn.session.state = DialogState::Studying;
                replies.extend(self.current_view(turn.session));
            }
            None => {
                info!(user_id = turn.session.user_id, language_id = %language_id, "No more words to study");
                turn.session.study = StudyContext::default();
                turn.session.state = DialogState::ViewingSettings;
                replies.push(Reply::new("study-finished").into());
                replies.push(settings_overview(turn.session, &settings).into());
            }
        }
        Ok(replies)
    }

    /// Messages re-rendering the current study state
    fn current_view(&self, session: &Session) -> Vec<Outbound> {
        let Some(item) = session.study.current_word.as_ref() else {
            return vec![Reply::new("study-no-word").into()];
        };
        let settings = &session.settings;
        let reply = match session.state {
            DialogState::ConfirmingWordKnowledge => Reply::new("study-confirm-known")
                .arg("word", &item.foreign_text)
                .arg("translation", &item.translation)
                .row(vec![
                    Button::key("button-confirm", CallbackAction::Confirm),
                    Button::key("button-retract", CallbackAction::Retract),
                ]),
            DialogState::ViewingWordDetails => word_details(item, settings),
            DialogState::ViewingWordImage => Reply::new("study-word-large")
                .arg("word", &item.foreign_text)
                .row(vec![
                    Button::key("button-back", CallbackAction::Back),
                    Button::key("button-next", CallbackAction::Next),
                ]),
            _ if session.study.answer_recorded.is_some() => answered_card(item, settings),
            _ => word_card(item, settings),
        };
        vec![reply.into()]
    }
}

fn intro_reply(intro: Option<&'static str>) -> Vec<Outbound> {
    intro.map(|key| Outbound::from(Reply::new(key))).into_iter().collect()
}

fn language_prompt(session: &Session) -> Reply {
    if session.available_languages.is_empty() {
        return Reply::new("language-none-available");
    }
    session
        .available_languages
        .iter()
        .fold(Reply::new("language-prompt"), |reply, language| {
            reply.row(vec![Button::literal(
                format!("{} ({})", language.native_name, language.name),
                CallbackAction::SelectLanguage(language.id.clone()),
            )])
        })
}

fn settings_overview(session: &Session, settings: &Settings) -> Reply {
    let language = session
        .current_language
        .as_ref()
        .map(|l| l.name.clone())
        .unwrap_or_default();

    let mut reply = Reply::new("settings-overview")
        .arg("language", language)
        .arg("start_word", settings.start_word)
        .row(vec![Button::key("button-edit-start-word", CallbackAction::EditStartWord)])
        .row(vec![
            Button::toggle(
                "button-skip-marked",
                settings.skip_marked,
                CallbackAction::Toggle(SettingsFlag::SkipMarked),
            ),
            Button::toggle(
                "button-use-check-date",
                settings.use_check_date,
                CallbackAction::Toggle(SettingsFlag::UseCheckDate),
            ),
        ])
        .row(vec![Button::toggle(
            "button-show-hints",
            settings.show_hints,
            CallbackAction::Toggle(SettingsFlag::ShowHints),
        )]);

    if settings.show_hints {
        let hint_toggles = HintType::ALL
            .into_iter()
            .map(|t| {
                Button::toggle(
                    t.label_key(),
                    settings.hint_visibility.get(&t).copied().unwrap_or(true),
                    CallbackAction::Toggle(SettingsFlag::HintVisibility(t)),
                )
            })
            .collect::<Vec<_>>();
        for pair in hint_toggles.chunks(2) {
            reply = reply.row(pair.to_vec());
        }
    }

    reply.row(vec![Button::key("button-start-study", CallbackAction::StartStudy)])
}

fn start_word_prompt(session: &Session) -> Reply {
    let current = session.settings.as_ref().map(|s| s.start_word).unwrap_or(1);
    Reply::new("settings-enter-start-word").arg("current", current)
}

fn hint_prompt(session: &Session, hint_type: HintType) -> Reply {
    let existing = session
        .study
        .current_word
        .as_ref()
        .and_then(|item| item.hints.get(&hint_type));
    let reply = match existing {
        Some(text) => Reply::new("hint-enter-text-edit").arg("type", hint_type).arg("current", text),
        None => Reply::new("hint-enter-text").arg("type", hint_type),
    };
    reply.row(vec![Button::key("button-back", CallbackAction::Back)])
}

fn hint_buttons(settings: &Option<Settings>) -> Vec<Button> {
    let settings = settings.clone().unwrap_or_default();
    HintType::ALL
        .into_iter()
        .filter(|t| settings.hint_visible(*t))
        .map(|t| Button::key(t.label_key(), CallbackAction::ShowHint(t)))
        .collect()
}

fn word_card(item: &StudyItem, settings: &Option<Settings>) -> Reply {
    let mut reply = Reply::new("study-word")
        .arg("word", &item.foreign_text)
        .arg("number", item.word_number)
        .row(vec![
            Button::key("button-know", CallbackAction::Know),
            Button::key("button-dont-know", CallbackAction::DontKnow),
        ]);
    for pair in hint_buttons(settings).chunks(2) {
        reply = reply.row(pair.to_vec());
    }
    reply.row(vec![
        Button::key("button-show-image", CallbackAction::ShowImage),
        Button::key("button-skip", CallbackAction::Skip),
    ])
}

fn word_details(item: &StudyItem, settings: &Option<Settings>) -> Reply {
    let mut reply = Reply::new("study-word-details")
        .arg("word", &item.foreign_text)
        .arg("translation", &item.translation)
        .arg("transcription", item.transcription.clone().unwrap_or_default())
        .arg("interval", item.progress.check_interval);
    for pair in hint_buttons(settings).chunks(2) {
        reply = reply.row(pair.to_vec());
    }
    reply.row(vec![Button::key("button-next", CallbackAction::Next)])
}

fn answered_card(item: &StudyItem, settings: &Option<Settings>) -> Reply {
    let mut reply = Reply::new("study-word-answered")
        .arg("word", &item.foreign_text)
        .arg("translation", &item.translation);
    for pair in hint_buttons(settings).chunks(2) {
        reply = reply.row(pair.to_vec());
    }
    reply.row(vec![Button::key("button-next", CallbackAction::Next)])
}
