//! workspace-manager extension
//!
//! Custom protocol for workspace pagers: switch workspaces and move
//! surfaces between them. The wire definition lives in
//! `protocols/waydeck-workspace-manager.xml`; the opcodes here must stay in
//! sync with it.

use std::collections::VecDeque;

use crate::compositor::surface::{ClientId, SurfaceId};

/// Client requests, in XML declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Show the given workspace
    SwitchTo { index: u32 },
    /// Move the toplevel owning `surface` to the workspace
    MoveSurface { surface: SurfaceId, index: u32 },
}

impl Request {
    /// Wire opcode of the request
    pub fn opcode(&self) -> u16 {
        match self {
            Request::SwitchTo { .. } => 0,
            Request::MoveSurface { .. } => 1,
        }
    }
}

/// Server events, in XML declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Current workspace broadcast
    State {
        current_index: u32,
        total_count: u32,
    },
}

impl Event {
    /// Wire opcode of the event
    pub fn opcode(&self) -> u16 {
        match self {
            Event::State { .. } => 0,
        }
    }
}

/// Tracks bound clients and queues outgoing state events
#[derive(Debug, Default)]
pub struct WorkspaceManager {
    bound: Vec<ClientId>,
    events: VecDeque<(ClientId, Event)>,
}

impl WorkspaceManager {
    /// Create the handler with no bound clients
    pub fn new() -> Self {
        Self::default()
    }

    /// A client bound the global; it immediately receives the state
    pub fn bind(&mut self, client: ClientId, current_index: u32, total_count: u32) {
        if !self.bound.contains(&client) {
            self.bound.push(client);
        }
        self.events.push_back((
            client,
            Event::State {
                current_index,
                total_count,
            },
        ));
    }

    /// A client went away. Erase-if-present.
    pub fn unbind(&mut self, client: ClientId) {
        self.bound.retain(|&c| c != client);
        self.events.retain(|(c, _)| *c != client);
    }

    /// Broadcast the workspace state to every bound client
    pub fn broadcast_state(&mut self, current_index: u32, total_count: u32) {
        for client in &self.bound {
            self.events.push_back((
                *client,
                Event::State {
                    current_index,
                    total_count,
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
