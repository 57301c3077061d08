//! Connection lifecycle commands: login, disconnect, logout, reset.

use tracing::info;

use chatterm_backend::{BackendError, BackendEvent};
use chatterm_shared::ConnectionState;

use crate::session::SessionManager;

impl SessionManager {
    pub(crate) fn login(&mut self) {
        if self.state.connection != ConnectionState::Disconnected {
            self.ui
                .print_text(&format!("already {}", self.state.connection));
            return;
        }

        let attempt = self.state.next_pairing_attempt();
        info!(attempt, "connecting");
        self.set_connection(ConnectionState::Connecting);
        self.ui.print_text("connecting..");

        self.spawn_backend("login", |backend, events| async move {
            if let Err(e) = backend.start(events.clone()).await {
                let _ = events.send(BackendEvent::ConnectFailed(e.to_string())).await;
            }
            Ok::<(), BackendError>(())
        });
    }

    pub(crate) fn disconnect(&mut self) {
        if self.state.connection == ConnectionState::Disconnected {
            self.ui.print_text("not connected");
            return;
        }

        info!("disconnecting");
        self.state.next_pairing_attempt();
        self.set_connection(ConnectionState::Disconnected);
        self.set_connected(false);
        self.spawn_backend("disconnect", |backend, _| async move { backend.stop().await });
    }

    /// Stop the backend and delete its credentials.  History stays.
    pub(crate) fn logout(&mut self) {
        info!(state = %self.state.connection, "logging out");
        self.state.next_pairing_attempt();
        self.set_connection(ConnectionState::Disconnected);
        self.set_connected(false);
        self.ui.print_text("logging out..");

        self.spawn_backend("logout", |backend, events| async move {
            if let Err(e) = backend.stop().await {
                let _ = events
                    .send(BackendEvent::CommandFailed {
                        command: "logout".into(),
                        error: format!("could not stop backend: {e}"),
                    })
                    .await;
            }
            backend.wipe_session().await
        });
    }

    pub(crate) fn reset(&mut self) {
        self.logout();
        self.state.selected_chat = None;
        self.ui.new_screen(&[]);
        self.ui
            .print_text("session reset, use /connect to pair again");
    }
}
