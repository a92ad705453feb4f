//! window-manager extension
//!
//! Custom protocol for status bars: cycle focus, run commands, and learn
//! which window is focused. The wire definition lives in
//! `protocols/waydeck-window-manager.xml`; the opcodes here must stay in
//! sync with it.

use std::collections::VecDeque;
use std::process::{Command, Stdio};

use log::{debug, warn};

use crate::compositor::surface::ClientId;

/// Client requests, in XML declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Focus the least recently focused view
    CycleFocus,
    /// Spawn a shell command
    RunCommand { command: String },
}

impl Request {
    /// Wire opcode of the request
    pub fn opcode(&self) -> u16 {
        match self {
            Request::CycleFocus => 0,
            Request::RunCommand { .. } => 1,
        }
    }
}

/// Server events, in XML declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The focused window or its title changed
    FocusedWindowName {
        name: String,
        workspace_index: u32,
    },
}

impl Event {
    /// Wire opcode of the event
    pub fn opcode(&self) -> u16 {
        match self {
            Event::FocusedWindowName { .. } => 0,
        }
    }
}

/// Tracks bound clients and queues focused-window events
#[derive(Debug, Default)]
pub struct WindowManager {
    bound: Vec<ClientId>,
    events: VecDeque<(ClientId, Event)>,
    /// Last broadcast, repeated to newly bound clients
    last: Option<(String, u32)>,
}

impl WindowManager {
    /// Create the handler with no bound clients
    pub fn new() -> Self {
        Self::default()
    }

    /// A client bound the global; it immediately learns the focused window
    pub fn bind(&mut self, client: ClientId) {
        if !self.bound.contains(&client) {
            self.bound.push(client);
        }
        let (name, workspace_index) = self.last.clone().unwrap_or_default();
        self.events.push_back((
            client,
            Event::FocusedWindowName {
                name,
                workspace_index,
            },
        ));
    }

    /// A client went away. Erase-if-present.
    pub fn unbind(&mut self, client: ClientId) {
        self.bound.retain(|&c| c != client);
        self.events.retain(|(c, _)| *c != client);
    }

    /// Broadcast a focus or title change. Duplicate broadcasts are
    /// suppressed.
    pub fn broadcast_focus(&mut self, name: &str, workspace_index: u32) {
        if self.last.as_ref() == Some(&(name.to_string(), workspace_index)) {
            return;
        }
        self.last = Some((name.to_string(), workspace_index));
        for client in &self.bound {
            self.events.push_back((
                *client,
                Event::FocusedWindowName {
                    name: name.to_string(),
                    workspace_index,
                },
            ));
        }
    }

    /// Drain queued events for the adapter to serialize
    pub fn drain_events(&mut self) -> Vec<(ClientId, Event)> {
        self.events.drain(..).collect()
    }

    /// Number of bound clients
    pub fn bound_clients(&self) -> usize {
        self.bound.len()
    }
}

/// Spawn `command` through the shell, detached from the compositor.
/// Failure is logged and otherwise ignored; the event loop never blocks on
/// the child.
pub fn run_command(command: &str) {
    debug!("spawning command: {}", command);
    let result = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(err) = result {
        warn!("failed to spawn `{}`: {}", command, err);
    }
}
