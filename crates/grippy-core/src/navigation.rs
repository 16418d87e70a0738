// Session-gated screen navigation
use crate::models::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Signup,
    Search,
    Favorites,
}

impl Screen {
    pub fn requires_session(self) -> bool {
        matches!(self, Screen::Search | Screen::Favorites)
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::Login => "Login",
            Screen::Signup => "Sign Up",
            Screen::Search => "Search",
            Screen::Favorites => "Favorites",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

/// Two-state auth machine plus the screen it allows.
///
/// Starts unauthenticated on the login screen. Every session notification
/// and every screen change goes through here, so a gated screen is never
/// shown without a session.
#[derive(Debug)]
pub struct Navigator {
    screen: Screen,
    state: AuthState,
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            screen: Screen::Login,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn auth_state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// Apply a session notification and return the screen to show
    pub fn on_session_change(&mut self, session: Option<&Session>) -> Screen {
        let signed_in = session.map(|s| !s.is_expired()).unwrap_or(false);
        self.state = if signed_in {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        };

        self.screen = match (self.state, self.screen) {
            // Fresh sign-in lands on search
            (AuthState::Authenticated, Screen::Login | Screen::Signup) => Screen::Search,
            (AuthState::Unauthenticated, screen) if screen.requires_session() => Screen::Login,
            (_, screen) => screen,
        };
        self.screen
    }

    /// Try to move to `target`; gated screens redirect to login
    pub fn enter(&mut self, target: Screen) -> Screen {
        self.screen = if target.requires_session() && !self.is_authenticated() {
            Screen::Login
        } else {
            target
        };
        self.screen
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}
