//! Shell-protocol variants
//!
//! Four client-side shell protocols can back a view: the legacy wl_shell,
//! two generations of xdg-shell, and X11-compatibility surfaces. The engine
//! sees them through one closed enum with a small capability set; the
//! differences that matter are how a size request travels (configure/ack
//! cycle, plain configure, or synchronous) and which state flags ride along.

use crate::compositor::surface::SurfaceId;
use crate::protocol::adapter::{AdapterQueue, AdapterRequest};

/// Which client-shell protocol backs a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    /// Legacy wl_shell toplevel
    WlShell,
    /// xdg-shell unstable v6
    XdgV6,
    /// xdg-shell stable
    Xdg,
    /// X11-compatibility surface
    Xwayland,
}

/// How a size request is confirmed by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureHandshake {
    /// Applies once a commit acknowledges this serial or a later one
    Acked(u32),
    /// Applies on the next commit, no acknowledgment in the protocol
    NextCommit,
    /// Applies immediately (X11 configure is synchronous)
    Immediate,
}

/// xdg-toplevel state (both generations share it)
#[derive(Debug, Default, Clone)]
pub struct XdgState {
    /// A configure was sent at least once
    pub configured: bool,
    /// Serial of the most recent configure
    pub last_serial: Option<u32>,
    pub maximized: bool,
    pub fullscreen: bool,
    pub activated: bool,
}

/// Legacy wl_shell toplevel state
#[derive(Debug, Default, Clone)]
pub struct WlShellState {
    pub maximized: bool,
    pub fullscreen: bool,
}

/// X11-compatibility surface state
#[derive(Debug, Default, Clone)]
pub struct XwaylandState {
    /// Override-redirect windows bypass normal placement
    pub override_redirect: bool,
}

/// The protocol-specific half of a view, selected by a closed tag
#[derive(Debug, Clone)]
pub enum ShellBackend {
    WlShell(WlShellState),
    XdgV6(XdgState),
    Xdg(XdgState),
    Xwayland(XwaylandState),
}

impl ShellBackend {
    /// Construct the backend for a protocol variant
    pub fn new(kind: ShellKind) -> Self {
        match kind {
            ShellKind::WlShell => ShellBackend::WlShell(WlShellState::default()),
            ShellKind::XdgV6 => ShellBackend::XdgV6(XdgState::default()),
            ShellKind::Xdg => ShellBackend::Xdg(XdgState::default()),
            ShellKind::Xwayland => ShellBackend::Xwayland(XwaylandState::default()),
        }
    }

    /// The protocol variant tag
    pub fn kind(&self) -> ShellKind {
        match self {
            ShellBackend::WlShell(_) => ShellKind::WlShell,
            ShellBackend::XdgV6(_) => ShellKind::XdgV6,
            ShellBackend::Xdg(_) => ShellKind::Xdg,
            ShellBackend::Xwayland(_) => ShellKind::Xwayland,
        }
    }

    /// Ask the client to adopt a new size. `serial` must be freshly
    /// allocated by the caller; variants that cannot acknowledge ignore it.
    pub fn request_resize(
        &mut self,
        surface: SurfaceId,
        width: i32,
        height: i32,
        serial: u32,
        queue: &mut AdapterQueue,
    ) -> ConfigureHandshake {
        queue.push(AdapterRequest::Configure {
            surface,
            width,
            height,
            serial,
        });
        match self {
            ShellBackend::XdgV6(state) | ShellBackend::Xdg(state) => {
                state.configured = true;
                state.last_serial = Some(serial);
                ConfigureHandshake::Acked(serial)
            }
            ShellBackend::WlShell(_) => ConfigureHandshake::NextCommit,
            ShellBackend::Xwayland(_) => ConfigureHandshake::Immediate,
        }
    }

    /// Record the maximized flag and send the matching configure
    pub fn request_maximize(
        &mut self,
        surface: SurfaceId,
        maximized: bool,
        width: i32,
        height: i32,
        serial: u32,
        queue: &mut AdapterQueue,
    ) -> ConfigureHandshake {
        match self {
            ShellBackend::XdgV6(state) | ShellBackend::Xdg(state) => state.maximized = maximized,
            ShellBackend::WlShell(state) => state.maximized = maximized,
            ShellBackend::Xwayland(_) => {}
        }
        self.request_resize(surface, width, height, serial, queue)
    }

    /// Record the fullscreen flag and send the matching configure
    pub fn request_fullscreen(
        &mut self,
        surface: SurfaceId,
        fullscreen: bool,
        width: i32,
        height: i32,
        serial: u32,
        queue: &mut AdapterQueue,
    ) -> ConfigureHandshake {
        match self {
            ShellBackend::XdgV6(state) | ShellBackend::Xdg(state) => state.fullscreen = fullscreen,
            ShellBackend::WlShell(state) => state.fullscreen = fullscreen,
            ShellBackend::Xwayland(_) => {}
        }
        self.request_resize(surface, width, height, serial, queue)
    }

    /// Ask the client to close the toplevel
    pub fn request_close(&self, surface: SurfaceId, queue: &mut AdapterQueue) {
        queue.push(AdapterRequest::Close { surface });
    }

    /// Tell the client whether its toplevel is the active one
    pub fn request_activate(
        &mut self,
        surface: SurfaceId,
        active: bool,
        queue: &mut AdapterQueue,
    ) {
        if let ShellBackend::XdgV6(state) | ShellBackend::Xdg(state) = self {
            state.activated = active;
        }
        queue.push(AdapterRequest::Activate { surface, active });
    }

    /// True if `acked` satisfies a handshake issued with `serial`
    pub fn serial_satisfied(handshake: ConfigureHandshake, acked: Option<u32>) -> bool {
        match handshake {
            ConfigureHandshake::Acked(serial) => {
                matches!(acked, Some(a) if a >= serial)
            }
            ConfigureHandshake::NextCommit => true,
            ConfigureHandshake::Immediate => true,
        }
    }
}

/// Shell protocol errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShellError {
    #[error("surface does not exist")]
    InvalidSurface,
    #[error("surface already has a different role")]
    RoleAlreadySet,
    #[error("parent surface is gone")]
    MissingParent,
    #[error("requested geometry is invalid")]
    InvalidGeometry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_roundtrip() {
        for kind in [
            ShellKind::WlShell,
            ShellKind::XdgV6,
            ShellKind::Xdg,
            ShellKind::Xwayland,
        ] {
            assert_eq!(ShellBackend::new(kind).kind(), kind);
        }
    }

    #[test]
    fn test_xdg_resize_requires_ack() {
        let mut queue = AdapterQueue::new();
        let mut backend = ShellBackend::new(ShellKind::Xdg);
        let handshake = backend.request_resize(SurfaceId(1), 640, 480, 5, &mut queue);

        assert_eq!(handshake, ConfigureHandshake::Acked(5));
        assert!(!ShellBackend::serial_satisfied(handshake, None));
        assert!(!ShellBackend::serial_satisfied(handshake, Some(4)));
        assert!(ShellBackend::serial_satisfied(handshake, Some(5)));
        assert!(ShellBackend::serial_satisfied(handshake, Some(9)));

        let sent = queue.drain();
        assert_eq!(
            sent[0],
            AdapterRequest::Configure {
                surface: SurfaceId(1),
                width: 640,
                height: 480,
                serial: 5,
            }
        );
    }

    #[test]
    fn test_legacy_and_x11_handshakes() {
        let mut queue = AdapterQueue::new();

        let mut legacy = ShellBackend::new(ShellKind::WlShell);
        let handshake = legacy.request_resize(SurfaceId(1), 100, 100, 1, &mut queue);
        assert_eq!(handshake, ConfigureHandshake::NextCommit);
        assert!(ShellBackend::serial_satisfied(handshake, None));

        let mut x11 = ShellBackend::new(ShellKind::Xwayland);
        let handshake = x11.request_resize(SurfaceId(2), 100, 100, 2, &mut queue);
        assert_eq!(handshake, ConfigureHandshake::Immediate);
    }

    #[test]
    fn test_state_flags_follow_requests() {
        let mut queue = AdapterQueue::new();
        let mut backend = ShellBackend::new(ShellKind::XdgV6);

        backend.request_maximize(SurfaceId(1), true, 1920, 1080, 1, &mut queue);
        backend.request_activate(SurfaceId(1), true, &mut queue);
        match &backend {
            ShellBackend::XdgV6(state) => {
                assert!(state.maximized);
                assert!(state.activated);
                assert!(state.configured);
            }
            _ => unreachable!(),
        }
    }
}
