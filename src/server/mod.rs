//! Wayland server plumbing
//!
//! Owns the display and the listening socket and feeds client traffic into
//! the calloop event loop. Protocol globals and request decoding belong to
//! the adapter crate that embeds the engine; this module only accepts
//! connections and pumps dispatch.

use std::os::unix::io::AsFd;
use std::sync::Arc;

use calloop::generic::Generic;
use calloop::{Interest, LoopHandle, Mode, PostAction};
use log::{debug, error, info};
use wayland_server::{Display, ListeningSocket};

/// The Wayland server state
pub struct WaylandServer<State: 'static> {
    /// The Wayland display
    display: Display<State>,
    /// Listening socket for client connections
    socket: ListeningSocket,
    /// Socket name for WAYLAND_DISPLAY
    socket_name: String,
}

impl<State> WaylandServer<State> {
    /// Create a new Wayland server on the first free socket
    pub fn new() -> anyhow::Result<Self> {
        info!("creating Wayland display server");

        let display: Display<State> = Display::new()?;
        let socket = ListeningSocket::bind_auto("wayland", 0..33)?;
        let socket_name = socket
            .socket_name()
            .and_then(|n| n.to_str().map(String::from))
            .unwrap_or_else(|| "wayland-0".to_string());

        info!("Wayland socket: {}", socket_name);

        Ok(Self {
            display,
            socket,
            socket_name,
        })
    }

    /// The socket name (for WAYLAND_DISPLAY)
    pub fn socket_name(&self) -> &str {
        &self.socket_name
    }

    /// Handle for the adapter to register its globals
    pub fn display_handle(&self) -> wayland_server::DisplayHandle {
        self.display.handle()
    }

    /// Insert the listening socket and the display into the event loop.
    /// Consumes the server; both sources live until the loop stops.
    pub fn insert_into_loop(self, handle: LoopHandle<'static, State>) -> anyhow::Result<()> {
        let Self {
            mut display,
            socket,
            socket_name: _,
        } = self;

        handle.insert_source(
            Generic::new(
                socket.as_fd().try_clone_to_owned()?,
                Interest::READ,
                Mode::Level,
            ),
            {
                let mut display_handle = display.handle();
                move |_, _, _state| {
                    if let Some(stream) = socket.accept()? {
                        debug!("new Wayland client connected");
                        if let Err(e) = display_handle.insert_client(stream, Arc::new(())) {
                            error!("failed to insert client: {}", e);
                        }
                    }
                    Ok(PostAction::Continue)
                }
            },
        )?;

        handle.insert_source(
            Generic::new(
                display.backend().poll_fd().try_clone_to_owned()?,
                Interest::READ,
                Mode::Level,
            ),
            {
                let mut display = display;
                move |_, _, state| {
                    display.dispatch_clients(state)?;
                    display.flush_clients()?;
                    Ok(PostAction::Continue)
                }
            },
        )?;

        Ok(())
    }

    /// Dispatch pending events (for use without calloop)
    pub fn dispatch(&mut self, state: &mut State) -> anyhow::Result<()> {
        while let Some(stream) = self.socket.accept()? {
            debug!("new Wayland client connected");
            if let Err(e) = self.display.handle().insert_client(stream, Arc::new(())) {
                error!("failed to insert client: {}", e);
            }
        }
        self.display.dispatch_clients(state)?;
        self.display.flush_clients()?;
        Ok(())
    }
}
