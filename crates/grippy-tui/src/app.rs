// TUI application state
use std::time::{Duration, Instant};

use grippy_core::{
    search::request_page, Debouncer, FavoriteItem, FavoritesView, Navigator, PageCursor,
    RequestToken, RequestTracker, Screen, SearchPage, SearchResult, Session,
};
use ratatui::widgets::ListState;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,   // Navigating lists
    Editing,  // Typing into the search box or a form
    PageJump, // Typing a page number
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Email,
    Password,
    Confirm,
}

/// Login and signup share one form; signup also uses `confirm`
#[derive(Debug, Clone)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    pub confirm: String,
    pub focus: FormField,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            confirm: String::new(),
            focus: FormField::Email,
        }
    }
}

impl AuthForm {
    fn fields(signup: bool) -> &'static [FormField] {
        if signup {
            &[FormField::Email, FormField::Password, FormField::Confirm]
        } else {
            &[FormField::Email, FormField::Password]
        }
    }

    pub fn next_field(&mut self, signup: bool) {
        let fields = Self::fields(signup);
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + 1) % fields.len()];
    }

    pub fn previous_field(&mut self, signup: bool) {
        let fields = Self::fields(signup);
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + fields.len() - 1) % fields.len()];
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Email => &mut self.email,
            FormField::Password => &mut self.password,
            FormField::Confirm => &mut self.confirm,
        }
    }

    pub fn push_char(&mut self, c: char) {
        self.focused_mut().push(c);
    }

    pub fn pop_char(&mut self) {
        self.focused_mut().pop();
    }

    /// Keep the email, drop anything secret
    pub fn clear_passwords(&mut self) {
        self.password.clear();
        self.confirm.clear();
        self.focus = FormField::Email;
    }

    pub fn clear(&mut self) {
        self.email.clear();
        self.clear_passwords();
    }
}

/// A finished search, tagged with the request it answers
#[derive(Debug)]
pub struct SearchReply {
    pub token: RequestToken,
    pub term: String,
    pub page: SearchPage,
}

pub struct App {
    pub should_quit: bool,
    pub navigator: Navigator,
    pub input_mode: InputMode,
    pub form: AuthForm,
    pub user_email: Option<String>,
    pub search_input: String,
    pub page_input: String,
    // Term the current results belong to, used for paging
    pub results_term: String,
    pub results: Vec<SearchResult>,
    pub cursor: PageCursor,
    pub selected_index: usize,
    pub list_state: ListState,
    pub favorites: FavoritesView,
    pub favorite_index: usize,
    pub favorites_state: ListState,
    pub loading: bool,
    pub status_message: Option<String>,
    pub error_message: Option<String>,
    pub debouncer: Debouncer<String>,
    pub requests: RequestTracker,
}

impl App {
    pub fn new(debounce_window: Duration) -> Self {
        Self {
            should_quit: false,
            navigator: Navigator::new(),
            input_mode: InputMode::Editing,
            form: AuthForm::default(),
            user_email: None,
            search_input: String::new(),
            page_input: String::new(),
            results_term: String::new(),
            results: Vec::new(),
            cursor: PageCursor::empty(grippy_core::models::DEFAULT_PAGE_SIZE),
            selected_index: 0,
            list_state: ListState::default(),
            favorites: FavoritesView::new(),
            favorite_index: 0,
            favorites_state: ListState::default(),
            loading: false,
            status_message: None,
            error_message: None,
            debouncer: Debouncer::new(debounce_window),
            requests: RequestTracker::new(),
        }
    }

    pub fn screen(&self) -> Screen {
        self.navigator.screen()
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn enter_normal_mode(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn enter_editing_mode(&mut self) {
        self.input_mode = InputMode::Editing;
    }

    /// Start typing a page number; only once there are pages to jump between
    pub fn enter_page_jump_mode(&mut self) -> bool {
        if self.results_term.is_empty() || self.cursor.page_count() == 0 {
            return false;
        }
        self.page_input.clear();
        self.input_mode = InputMode::PageJump;
        true
    }

    pub fn cancel_page_jump(&mut self) {
        self.page_input.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn push_page_digit(&mut self, c: char) {
        // u32::MAX has 10 digits
        if c.is_ascii_digit() && self.page_input.len() < 10 {
            self.page_input.push(c);
        }
    }

    pub fn pop_page_digit(&mut self) {
        self.page_input.pop();
    }

    /// Enter pressed in page jump mode: leave the mode and request the page
    pub fn take_page_jump(&mut self) -> Option<(String, u32)> {
        let typed = std::mem::take(&mut self.page_input);
        self.input_mode = InputMode::Normal;

        match typed.parse::<u32>() {
            Ok(page) => self.jump_to_page(page),
            Err(_) => {
                if !typed.is_empty() {
                    self.set_error(format!("'{}' is not a page number", typed));
                }
                None
            }
        }
    }

    /// React to a session notification; returns the screen now showing
    pub fn on_session_change(&mut self, session: Option<&Session>) -> Screen {
        let before = self.screen();
        let screen = self.navigator.on_session_change(session);

        if self.navigator.is_authenticated() {
            self.user_email = session.map(|s| s.email.clone());
            self.form.clear();
        } else {
            self.reset_user_state();
        }

        if screen != before {
            self.on_screen_entered(screen);
        }
        screen
    }

    /// Move to a screen, subject to the session gate
    pub fn enter_screen(&mut self, target: Screen) -> Screen {
        let screen = self.navigator.enter(target);
        self.on_screen_entered(screen);
        screen
    }

    fn on_screen_entered(&mut self, screen: Screen) {
        self.input_mode = match screen {
            Screen::Login | Screen::Signup => InputMode::Editing,
            Screen::Search if self.results.is_empty() => InputMode::Editing,
            _ => InputMode::Normal,
        };
        if matches!(screen, Screen::Login | Screen::Signup) {
            self.form.clear_passwords();
        }
    }

    /// Everything tied to the previous user goes
    fn reset_user_state(&mut self) {
        self.user_email = None;
        self.search_input.clear();
        self.page_input.clear();
        self.results_term.clear();
        self.results.clear();
        self.cursor = PageCursor::empty(self.cursor.page_size);
        self.selected_index = 0;
        self.list_state.select(None);
        self.favorites.clear();
        self.favorite_index = 0;
        self.favorites_state.select(None);
        self.loading = false;
        self.debouncer.cancel();
        self.requests.invalidate();
    }

    pub fn type_search_char(&mut self, c: char, now: Instant) {
        self.search_input.push(c);
        self.on_search_input_changed(now);
    }

    pub fn backspace_search(&mut self, now: Instant) {
        self.search_input.pop();
        self.on_search_input_changed(now);
    }

    /// Live input goes through the debouncer; an empty box searches nothing
    fn on_search_input_changed(&mut self, now: Instant) {
        let term = self.search_input.trim();
        if term.is_empty() {
            self.debouncer.cancel();
        } else {
            self.debouncer.push(term.to_string(), now);
        }
    }

    /// Enter pressed: search right away and drop any pending live search
    pub fn take_explicit_search(&mut self) -> Option<(String, u32)> {
        self.debouncer.cancel();
        let term = self.search_input.trim();
        if term.is_empty() {
            None
        } else {
            Some((term.to_string(), 0))
        }
    }

    /// Move `delta` pages from the current one. Returns the term and the
    /// zero-based page to request, or `None` when already at the edge.
    pub fn page_request(&mut self, delta: i64) -> Option<(String, u32)> {
        let page_count = self.cursor.page_count();
        if self.results_term.is_empty() || page_count == 0 {
            return None;
        }

        let current = i64::from(self.cursor.current_page());
        let target = (current + delta).clamp(1, i64::from(page_count));
        self.jump_to_page(u32::try_from(target).ok()?)
    }

    /// Go straight to 1-based `page` of the current results. Out of range
    /// pages set an error instead of requesting anything.
    pub fn jump_to_page(&mut self, page: u32) -> Option<(String, u32)> {
        let page_count = self.cursor.page_count();
        if self.results_term.is_empty() || page_count == 0 {
            return None;
        }

        if page == 0 || page > page_count {
            self.set_error(format!("No page {}, pick 1 to {}", page, page_count));
            return None;
        }
        if page == self.cursor.current_page() {
            return None;
        }

        self.debouncer.cancel();
        Some((self.results_term.clone(), request_page(page)))
    }

    pub fn begin_request(&mut self) -> RequestToken {
        self.loading = true;
        self.requests.issue()
    }

    /// Apply a finished search unless a newer one has been dispatched since
    pub fn apply_search_reply(&mut self, reply: SearchReply) -> bool {
        if !self.requests.is_current(reply.token) {
            debug!("Dropping stale results for '{}'", reply.term);
            return false;
        }

        self.loading = false;
        self.results_term = reply.term;
        self.results = reply.page.items;
        self.cursor = reply.page.cursor;
        self.selected_index = 0;
        self.list_state
            .select(if self.results.is_empty() { None } else { Some(0) });

        if self.results.is_empty() {
            self.set_status(format!("No GIFs found for '{}'", self.results_term));
        }
        true
    }

    pub fn next_result(&mut self) {
        if !self.results.is_empty() {
            self.selected_index = (self.selected_index + 1).min(self.results.len() - 1);
            self.list_state.select(Some(self.selected_index));
        }
    }

    pub fn previous_result(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
            self.list_state.select(Some(self.selected_index));
        }
    }

    pub fn selected_result(&self) -> Option<&SearchResult> {
        self.results.get(self.selected_index)
    }

    pub fn next_favorite(&mut self) {
        if !self.favorites.is_empty() {
            self.favorite_index = (self.favorite_index + 1).min(self.favorites.len() - 1);
            self.favorites_state.select(Some(self.favorite_index));
        }
    }

    pub fn previous_favorite(&mut self) {
        if self.favorite_index > 0 {
            self.favorite_index -= 1;
            self.favorites_state.select(Some(self.favorite_index));
        }
    }

    pub fn selected_favorite(&self) -> Option<&FavoriteItem> {
        self.favorites.get(self.favorite_index)
    }

    /// Keep the favorites selection inside the list after it changed
    pub fn fix_favorite_selection(&mut self) {
        if self.favorites.is_empty() {
            self.favorite_index = 0;
            self.favorites_state.select(None);
        } else {
            self.favorite_index = self.favorite_index.min(self.favorites.len() - 1);
            self.favorites_state.select(Some(self.favorite_index));
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.error_message = None;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
        self.status_message = None;
    }

    pub fn clear_messages(&mut self) {
        self.status_message = None;
        self.error_message = None;
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(grippy_core::debounce::DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session() -> Session {
        Session {
            uid: "uid-1".into(),
            email: "a@b.com".into(),
            id_token: None,
            refresh_token: None,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn page(term: &str, total: u32, offset: u32) -> SearchPage {
        SearchPage {
            items: vec![SearchResult {
                id: format!("{}-{}", term, offset),
                title: term.to_string(),
                preview_url: format!("https://media.giphy.com/{}.gif", term),
            }],
            cursor: PageCursor {
                total_count: total,
                count: 1,
                offset,
                page_size: 10,
            },
        }
    }

    fn signed_in_app() -> App {
        let mut app = App::default();
        app.on_session_change(Some(&session()));
        app
    }

    #[test]
    fn test_sign_in_switches_to_search() {
        let app = signed_in_app();
        assert_eq!(app.screen(), Screen::Search);
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.user_email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_favorites_gated_before_sign_in() {
        let mut app = App::default();
        assert_eq!(app.enter_screen(Screen::Favorites), Screen::Login);
    }

    #[test]
    fn test_stale_reply_is_dropped() {
        let mut app = signed_in_app();
        let old = app.begin_request();
        let new = app.begin_request();

        let applied = app.apply_search_reply(SearchReply {
            token: new,
            term: "dogs".into(),
            page: page("dogs", 45, 0),
        });
        assert!(applied);

        // "cats" was dispatched first but arrives last
        let applied = app.apply_search_reply(SearchReply {
            token: old,
            term: "cats".into(),
            page: page("cats", 45, 0),
        });
        assert!(!applied);
        assert_eq!(app.results_term, "dogs");
        assert!(!app.loading);
    }

    #[test]
    fn test_typing_is_debounced_until_window_passes() {
        let mut app = signed_in_app();
        let start = Instant::now();

        app.type_search_char('c', start);
        app.type_search_char('a', start + Duration::from_millis(100));
        app.type_search_char('t', start + Duration::from_millis(200));

        assert_eq!(app.debouncer.poll(start + Duration::from_millis(450)), None);
        assert_eq!(
            app.debouncer.poll(start + Duration::from_millis(500)),
            Some("cat".to_string())
        );
    }

    #[test]
    fn test_clearing_input_cancels_pending_search() {
        let mut app = signed_in_app();
        let start = Instant::now();

        app.type_search_char('c', start);
        app.backspace_search(start + Duration::from_millis(50));
        assert!(!app.debouncer.is_pending());
    }

    #[test]
    fn test_explicit_search_bypasses_debounce() {
        let mut app = signed_in_app();
        app.type_search_char('c', Instant::now());

        assert_eq!(app.take_explicit_search(), Some(("c".to_string(), 0)));
        assert!(!app.debouncer.is_pending());
    }

    #[test]
    fn test_page_requests_clamp_to_range() {
        let mut app = signed_in_app();
        let token = app.begin_request();
        app.apply_search_reply(SearchReply {
            token,
            term: "cats".into(),
            page: page("cats", 45, 0),
        });

        assert_eq!(app.page_request(-1), None);
        assert_eq!(app.page_request(1), Some(("cats".to_string(), 1)));
        assert_eq!(app.page_request(10), Some(("cats".to_string(), 4)));
    }

    fn app_with_cats() -> App {
        let mut app = signed_in_app();
        let token = app.begin_request();
        app.apply_search_reply(SearchReply {
            token,
            term: "cats".into(),
            page: page("cats", 45, 0),
        });
        app
    }

    #[test]
    fn test_jump_to_typed_page() {
        let mut app = app_with_cats();
        assert!(app.enter_page_jump_mode());
        assert_eq!(app.input_mode, InputMode::PageJump);

        app.push_page_digit('4');
        app.push_page_digit('x');
        assert_eq!(app.page_input, "4");

        assert_eq!(app.take_page_jump(), Some(("cats".to_string(), 3)));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.page_input.is_empty());
    }

    #[test]
    fn test_jump_out_of_range_sets_error() {
        let mut app = app_with_cats();

        assert_eq!(app.jump_to_page(6), None);
        assert_eq!(app.error_message.as_deref(), Some("No page 6, pick 1 to 5"));
        assert_eq!(app.jump_to_page(0), None);
        // Already there
        app.clear_messages();
        assert_eq!(app.jump_to_page(1), None);
        assert!(app.error_message.is_none());
        assert_eq!(app.jump_to_page(5), Some(("cats".to_string(), 4)));
    }

    #[test]
    fn test_page_jump_needs_results() {
        let mut app = signed_in_app();
        assert!(!app.enter_page_jump_mode());
        assert_eq!(app.input_mode, InputMode::Editing);

        let mut app = app_with_cats();
        app.enter_page_jump_mode();
        app.pop_page_digit();
        assert_eq!(app.take_page_jump(), None);
        assert!(app.error_message.is_none());
    }

    #[test]
    fn test_sign_out_clears_user_state() {
        let mut app = signed_in_app();
        let token = app.begin_request();
        app.apply_search_reply(SearchReply {
            token,
            term: "cats".into(),
            page: page("cats", 45, 0),
        });
        let in_flight = app.begin_request();

        assert_eq!(app.on_session_change(None), Screen::Login);
        assert!(app.results.is_empty());
        assert!(app.user_email.is_none());
        assert!(!app.requests.is_current(in_flight));
    }

    #[test]
    fn test_form_focus_cycles() {
        let mut form = AuthForm::default();
        form.next_field(false);
        assert_eq!(form.focus, FormField::Password);
        form.next_field(false);
        assert_eq!(form.focus, FormField::Email);

        form.previous_field(true);
        assert_eq!(form.focus, FormField::Confirm);
        form.push_char('x');
        assert_eq!(form.confirm, "x");
    }
}
