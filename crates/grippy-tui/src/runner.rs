// TUI event loop and terminal management
use crate::app::{App, InputMode, SearchReply};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use grippy_core::{AddOutcome, ListOutcome, RemoveOutcome, Screen, Services, Session, SessionStore, SessionSubscription};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

// Upper bound on how long the loop blocks waiting for input
const TICK: Duration = Duration::from_millis(100);

type Term = Terminal<CrosstermBackend<io::Stdout>>;

pub async fn run_tui(
    mut app: App,
    services: Services,
    session_store: Option<SessionStore>,
    mouse_enabled: bool,
) -> anyhow::Result<()> {
    // Subscribe before reading the current value so nothing slips between
    let mut sessions = services.sessions.subscribe();
    let initial = sessions.current();
    app.on_session_change(initial.as_ref());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if mouse_enabled {
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    } else {
        execute!(stdout, EnterAlternateScreen)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = event_loop(
        &mut terminal,
        &mut app,
        &services,
        session_store.as_ref(),
        &mut sessions,
        &tx,
        &mut rx,
    )
    .await;

    // Restore terminal, even when the loop failed
    disable_raw_mode()?;
    if mouse_enabled {
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    } else {
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    }
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Term,
    app: &mut App,
    services: &Services,
    session_store: Option<&SessionStore>,
    sessions: &mut SessionSubscription,
    tx: &UnboundedSender<SearchReply>,
    rx: &mut UnboundedReceiver<SearchReply>,
) -> anyhow::Result<()> {
    loop {
        // Route guard: every session change goes through the navigator
        if let Some(change) = sessions.poll_change() {
            persist_session(session_store, change.as_ref());
            if app.on_session_change(change.as_ref()) == Screen::Favorites {
                load_favorites(app, services).await;
            }
        }

        while let Ok(reply) = rx.try_recv() {
            app.apply_search_reply(reply);
        }

        if let Some(term) = app.debouncer.poll(Instant::now()) {
            dispatch_search(app, services, tx, term, 0);
        }

        terminal.draw(|f| crate::ui::render(f, app))?;

        let timeout = app
            .debouncer
            .time_until_ready(Instant::now())
            .map_or(TICK, |wait| wait.min(TICK));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, services, tx, key).await;
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn persist_session(store: Option<&SessionStore>, session: Option<&Session>) {
    let Some(store) = store else {
        return;
    };

    let result = match session {
        Some(session) => store.save(session),
        None => store.clear(),
    };
    if let Err(e) = result {
        warn!("Failed to update stored session: {}", e);
    }
}

/// Runs the search in the background; the reply is applied by the loop
fn dispatch_search(
    app: &mut App,
    services: &Services,
    tx: &UnboundedSender<SearchReply>,
    term: String,
    page: u32,
) {
    let token = app.begin_request();
    let search = services.search.clone();
    let tx = tx.clone();

    debug!("Searching '{}' page {}", term, page);
    tokio::spawn(async move {
        let page = search.search(&term, page).await;
        // Receiver is gone once the UI has quit
        let _ = tx.send(SearchReply { token, term, page });
    });
}

async fn handle_key(
    app: &mut App,
    services: &Services,
    tx: &UnboundedSender<SearchReply>,
    key: KeyEvent,
) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match app.screen() {
        Screen::Login | Screen::Signup => handle_auth_key(app, services, key).await,
        Screen::Search => handle_search_key(app, services, tx, key).await,
        Screen::Favorites => handle_favorites_key(app, services, key).await,
    }
}

async fn handle_auth_key(app: &mut App, services: &Services, key: KeyEvent) {
    let signup = app.screen() == Screen::Signup;

    match key.code {
        KeyCode::Esc => {
            if signup {
                app.clear_messages();
                app.enter_screen(Screen::Login);
            } else {
                app.quit();
            }
        }
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) && !signup => {
            app.clear_messages();
            app.enter_screen(Screen::Signup);
        }
        KeyCode::Tab | KeyCode::Down => app.form.next_field(signup),
        KeyCode::BackTab | KeyCode::Up => app.form.previous_field(signup),
        KeyCode::Backspace => app.form.pop_char(),
        KeyCode::Char(c) => app.form.push_char(c),
        KeyCode::Enter => {
            app.clear_messages();
            app.loading = true;
            let result = if signup {
                services
                    .auth
                    .signup(&app.form.email, &app.form.password, &app.form.confirm)
                    .await
            } else {
                services.auth.login(&app.form.email, &app.form.password).await
            };
            app.loading = false;

            // On success the session change moves us on next tick
            if let Err(e) = result {
                app.form.clear_passwords();
                app.set_error(e.user_message());
            }
        }
        _ => {}
    }
}

async fn handle_search_key(
    app: &mut App,
    services: &Services,
    tx: &UnboundedSender<SearchReply>,
    key: KeyEvent,
) {
    match app.input_mode {
        InputMode::Editing => match key.code {
            KeyCode::Enter => {
                if let Some((term, page)) = app.take_explicit_search() {
                    app.enter_normal_mode();
                    app.clear_messages();
                    dispatch_search(app, services, tx, term, page);
                }
            }
            KeyCode::Char(c) => app.type_search_char(c, Instant::now()),
            KeyCode::Backspace => app.backspace_search(Instant::now()),
            KeyCode::Esc | KeyCode::Tab => app.enter_normal_mode(),
            _ => {}
        },
        InputMode::PageJump => match key.code {
            KeyCode::Enter => {
                app.clear_messages();
                if let Some((term, page)) = app.take_page_jump() {
                    dispatch_search(app, services, tx, term, page);
                }
            }
            KeyCode::Char(c) => app.push_page_digit(c),
            KeyCode::Backspace => app.pop_page_digit(),
            KeyCode::Esc => app.cancel_page_jump(),
            _ => {}
        },
        InputMode::Normal => match key.code {
            KeyCode::Char('q') => app.quit(),
            KeyCode::Char('/') | KeyCode::Char('i') => app.enter_editing_mode(),
            KeyCode::Char('j') | KeyCode::Down => app.next_result(),
            KeyCode::Char('k') | KeyCode::Up => app.previous_result(),
            KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => {
                if let Some((term, page)) = app.page_request(1) {
                    dispatch_search(app, services, tx, term, page);
                }
            }
            KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => {
                if let Some((term, page)) = app.page_request(-1) {
                    dispatch_search(app, services, tx, term, page);
                }
            }
            KeyCode::Char('g') => {
                app.enter_page_jump_mode();
            }
            KeyCode::Char('s') => {
                if let Some(url) = app.selected_result().map(|r| r.preview_url.clone()) {
                    match services.favorites.add(&url).await {
                        Ok(AddOutcome::Denied) => {
                            app.on_session_change(None);
                            app.set_error(AddOutcome::Denied.message());
                        }
                        Ok(outcome) => app.set_status(outcome.message()),
                        Err(e) => app.set_error(e.user_message()),
                    }
                }
            }
            KeyCode::Char('y') => {
                if let Some(url) = app.selected_result().map(|r| r.preview_url.clone()) {
                    copy_link(app, &url);
                }
            }
            KeyCode::Char('o') | KeyCode::Enter => {
                if let Some(url) = app.selected_result().map(|r| r.preview_url.clone()) {
                    open_link(app, &url);
                }
            }
            KeyCode::Char('f') => {
                app.clear_messages();
                if app.enter_screen(Screen::Favorites) == Screen::Favorites {
                    load_favorites(app, services).await;
                }
            }
            KeyCode::Char('L') => services.auth.logout().await,
            _ => {}
        },
    }
}

async fn handle_favorites_key(app: &mut App, services: &Services, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => {
            app.clear_messages();
            app.enter_screen(Screen::Search);
        }
        KeyCode::Char('j') | KeyCode::Down => app.next_favorite(),
        KeyCode::Char('k') | KeyCode::Up => app.previous_favorite(),
        KeyCode::Char('r') => load_favorites(app, services).await,
        KeyCode::Char('d') | KeyCode::Delete => {
            let Some(id) = app.selected_favorite().map(|f| f.id.clone()) else {
                return;
            };
            match app.favorites.remove(&services.favorites, &id).await {
                Ok(RemoveOutcome::Denied) => {
                    app.on_session_change(None);
                    app.set_error(RemoveOutcome::Denied.message());
                }
                Ok(outcome) => {
                    app.fix_favorite_selection();
                    app.set_status(outcome.message());
                }
                Err(e) => app.set_error(e.user_message()),
            }
        }
        KeyCode::Char('y') => {
            if let Some(url) = app.selected_favorite().map(|f| f.url.clone()) {
                copy_link(app, &url);
            }
        }
        KeyCode::Char('o') | KeyCode::Enter => {
            if let Some(url) = app.selected_favorite().map(|f| f.url.clone()) {
                open_link(app, &url);
            }
        }
        KeyCode::Char('L') => services.auth.logout().await,
        _ => {}
    }
}

async fn load_favorites(app: &mut App, services: &Services) {
    app.loading = true;
    let result = app.favorites.refresh(&services.favorites).await;
    app.loading = false;

    match result {
        Ok(ListOutcome::Items(_)) => {
            app.fix_favorite_selection();
            if app.favorites.is_empty() {
                app.set_status("No favorites yet. Press 's' on a search result to save one.");
            }
        }
        Ok(ListOutcome::Denied) => {
            // Session lapsed underneath us
            app.on_session_change(None);
        }
        Err(e) => app.set_error(e.user_message()),
    }
}

fn copy_link(app: &mut App, url: &str) {
    let copied = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(url.to_string()));
    match copied {
        Ok(()) => app.set_status("Link copied!"),
        Err(e) => app.set_error(format!("Failed to copy link: {}", e)),
    }
}

fn open_link(app: &mut App, url: &str) {
    if let Err(e) = open::that(url) {
        app.set_error(format!("Failed to open browser: {}", e));
    }
}
