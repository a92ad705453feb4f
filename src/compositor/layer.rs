//! Layer arrangement
//!
//! Places every layer surface of an output and computes the usable area
//! left for maximized views. Surfaces with a positive exclusive zone are
//! placed first and consume space; everything else is boxed into what
//! remains, except `-1` zones which ignore reservations entirely.

use log::{debug, warn};

use crate::compositor::geometry::Rect;
use crate::compositor::surface::SurfaceId;
use crate::protocol::adapter::{AdapterQueue, AdapterRequest, SerialCounter};
use crate::protocol::layer_shell::{
    Anchor, KeyboardInteractivity, Layer, LayerSurface, LayerSurfaceId,
};

/// Result of arranging one output
#[derive(Debug, Default)]
pub struct ArrangeOutcome {
    /// Area left for maximized views after exclusive zones
    pub usable_area: Rect,
    /// Surfaces whose computed box was invalid; already removed from the
    /// lists, the caller closes them
    pub rejected: Vec<SurfaceId>,
    /// Topmost keyboard-interactive surface in {overlay, top}, to become
    /// the seat's focused layer
    pub focus: Option<LayerSurfaceId>,
}

/// Arrange all layer surfaces of an output into `full_area`.
///
/// Runs the two passes of the placement algorithm, sends configures for
/// boxes that changed, and prunes surfaces whose placement is a protocol
/// error.
pub fn arrange_layers(
    full_area: Rect,
    layers: &mut [Vec<LayerSurface>; 4],
    serials: &mut SerialCounter,
    queue: &mut AdapterQueue,
) -> ArrangeOutcome {
    let mut outcome = ArrangeOutcome {
        usable_area: full_area,
        ..Default::default()
    };

    // Top to bottom, exclusive-zone surfaces first.
    for exclusive_pass in [true, false] {
        for layer in Layer::ALL.iter().rev() {
            let list = &mut layers[layer.index()];
            let mut rejected = Vec::new();
            for surface in list.iter_mut() {
                if surface.reserves_zone() != exclusive_pass {
                    continue;
                }
                let source = if surface.exclusive_zone == -1 {
                    full_area
                } else {
                    outcome.usable_area
                };
                match place(surface, source) {
                    Ok(geometry) => {
                        let size_changed = surface.geometry.width != geometry.width
                            || surface.geometry.height != geometry.height;
                        surface.geometry = geometry;
                        if size_changed || !surface.configured {
                            surface.configured = true;
                            queue.push(AdapterRequest::Configure {
                                surface: surface.surface,
                                width: geometry.width,
                                height: geometry.height,
                                serial: serials.next(),
                            });
                        }
                        if exclusive_pass {
                            consume_zone(surface, &mut outcome.usable_area);
                        }
                    }
                    Err(()) => {
                        warn!(
                            "layer surface {:?} ({}) requested an impossible box, closing",
                            surface.id, surface.namespace
                        );
                        rejected.push(surface.surface);
                    }
                }
            }
            if !rejected.is_empty() {
                list.retain(|s| !rejected.contains(&s.surface));
                outcome.rejected.extend(rejected);
            }
        }
    }

    outcome.focus = focused_layer_surface(layers);
    debug!("arranged layers, usable area {:?}", outcome.usable_area);
    outcome
}

/// Compute the box for one surface within `source`. `Err` means the
/// request cannot be satisfied (protocol error).
fn place(surface: &LayerSurface, source: Rect) -> Result<Rect, ()> {
    let anchor = surface.anchor;
    let margins = surface.margins;
    let (desired_w, desired_h) = surface.desired;

    let width = if desired_w > 0 {
        desired_w
    } else if anchor.spans_horizontally() {
        source.width - margins.left - margins.right
    } else {
        // A zero width without both horizontal anchors is unsatisfiable.
        return Err(());
    };
    let height = if desired_h > 0 {
        desired_h
    } else if anchor.spans_vertically() {
        source.height - margins.top - margins.bottom
    } else {
        return Err(());
    };
    if width < 0 || height < 0 {
        return Err(());
    }

    let x = if anchor.spans_horizontally() {
        source.x + margins.left + (source.width - margins.left - margins.right - width) / 2
    } else if anchor.contains(Anchor::LEFT) {
        source.x + margins.left
    } else if anchor.contains(Anchor::RIGHT) {
        source.x + source.width - width - margins.right
    } else {
        source.x + (source.width - width) / 2
    };
    let y = if anchor.spans_vertically() {
        source.y + margins.top + (source.height - margins.top - margins.bottom - height) / 2
    } else if anchor.contains(Anchor::TOP) {
        source.y + margins.top
    } else if anchor.contains(Anchor::BOTTOM) {
        source.y + source.height - height - margins.bottom
    } else {
        source.y + (source.height - height) / 2
    };

    Ok(Rect::new(x, y, width, height))
}

/// Shrink the usable area by a surface's exclusive zone plus the margin on
/// its anchored side
fn consume_zone(surface: &LayerSurface, usable: &mut Rect) {
    let Some(edge) = surface.zone_edge() else {
        return;
    };
    let zone = surface.exclusive_zone;
    let margins = surface.margins;
    match edge {
        Anchor::TOP => {
            let take = (zone + margins.top).min(usable.height);
            usable.y += take;
            usable.height -= take;
        }
        Anchor::BOTTOM => {
            let take = (zone + margins.bottom).min(usable.height);
            usable.height -= take;
        }
        Anchor::LEFT => {
            let take = (zone + margins.left).min(usable.width);
            usable.x += take;
            usable.width -= take;
        }
        Anchor::RIGHT => {
            let take = (zone + margins.right).min(usable.width);
            usable.width -= take;
        }
        _ => {}
    }
}

/// The surface that should hold keyboard focus: overlay before top, each
/// searched topmost first, exclusive interactivity only
fn focused_layer_surface(layers: &[Vec<LayerSurface>; 4]) -> Option<LayerSurfaceId> {
    for layer in [Layer::Overlay, Layer::Top] {
        for surface in layers[layer.index()].iter().rev() {
            if surface.mapped
                && surface.keyboard_interactivity == KeyboardInteractivity::Exclusive
            {
                return Some(surface.id);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::layer_shell::Margins;

    fn output() -> Rect {
        Rect::new(0, 0, 1920, 1080)
    }

    fn top_bar(zone: i32) -> LayerSurface {
        let mut surface = LayerSurface::new(SurfaceId::next(), Layer::Top, "bar".into());
        surface.anchor = Anchor::LEFT | Anchor::RIGHT | Anchor::TOP;
        surface.desired = (0, 32);
        surface.exclusive_zone = zone;
        surface
    }

    fn arrange(layers: &mut [Vec<LayerSurface>; 4]) -> ArrangeOutcome {
        let mut serials = SerialCounter::new();
        let mut queue = AdapterQueue::new();
        arrange_layers(output(), layers, &mut serials, &mut queue)
    }

    #[test]
    fn test_top_bar_scenario() {
        let mut layers: [Vec<LayerSurface>; 4] = Default::default();
        layers[Layer::Top.index()].push(top_bar(32));

        let outcome = arrange(&mut layers);
        assert_eq!(
            layers[Layer::Top.index()][0].geometry,
            Rect::new(0, 0, 1920, 32)
        );
        assert_eq!(outcome.usable_area, Rect::new(0, 32, 1920, 1048));
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_arrange_is_idempotent() {
        let mut layers: [Vec<LayerSurface>; 4] = Default::default();
        layers[Layer::Top.index()].push(top_bar(32));
        let mut side = LayerSurface::new(SurfaceId::next(), Layer::Bottom, "dock".into());
        side.anchor = Anchor::TOP | Anchor::BOTTOM | Anchor::LEFT;
        side.desired = (64, 0);
        side.exclusive_zone = 64;
        layers[Layer::Bottom.index()].push(side);

        let first = arrange(&mut layers);
        let boxes: Vec<Rect> = layers.iter().flatten().map(|s| s.geometry).collect();
        let second = arrange(&mut layers);
        let boxes_again: Vec<Rect> = layers.iter().flatten().map(|s| s.geometry).collect();

        assert_eq!(boxes, boxes_again);
        assert_eq!(first.usable_area, second.usable_area);
    }

    #[test]
    fn test_exclusive_zone_monotonicity() {
        let mut layers: [Vec<LayerSurface>; 4] = Default::default();
        let mut area = output().area();
        for zone in [32, 48, 16] {
            layers[Layer::Top.index()].push(top_bar(zone));
            let outcome = arrange(&mut layers);
            assert!(outcome.usable_area.area() <= area);
            assert!(output().contains_rect(&outcome.usable_area));
            area = outcome.usable_area.area();
        }
        // Total reservation is order independent.
        let outcome = arrange(&mut layers);
        assert_eq!(outcome.usable_area.height, 1080 - 32 - 48 - 16);
    }

    #[test]
    fn test_dont_care_zone_uses_full_area() {
        let mut layers: [Vec<LayerSurface>; 4] = Default::default();
        layers[Layer::Top.index()].push(top_bar(32));

        // A background stretching everywhere with zone -1 ignores the bar's
        // reservation.
        let mut bg = LayerSurface::new(SurfaceId::next(), Layer::Background, "wall".into());
        bg.anchor = Anchor::all();
        bg.exclusive_zone = -1;
        layers[Layer::Background.index()].push(bg);

        arrange(&mut layers);
        assert_eq!(
            layers[Layer::Background.index()][0].geometry,
            Rect::new(0, 0, 1920, 1080)
        );
    }

    #[test]
    fn test_impossible_box_is_rejected() {
        let mut layers: [Vec<LayerSurface>; 4] = Default::default();
        let mut bad = LayerSurface::new(SurfaceId::next(), Layer::Top, "bad".into());
        bad.anchor = Anchor::LEFT | Anchor::RIGHT | Anchor::TOP;
        bad.desired = (0, 32);
        bad.margins = Margins {
            left: 2000,
            right: 2000,
            ..Default::default()
        };
        let id = bad.surface;
        layers[Layer::Top.index()].push(bad);

        let outcome = arrange(&mut layers);
        assert_eq!(outcome.rejected, vec![id]);
        assert!(layers[Layer::Top.index()].is_empty());

        // Zero size without spanning anchors is unsatisfiable too.
        let mut sizeless = LayerSurface::new(SurfaceId::next(), Layer::Top, "bad2".into());
        sizeless.anchor = Anchor::TOP;
        layers[Layer::Top.index()].push(sizeless);
        let outcome = arrange(&mut layers);
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[test]
    fn test_focused_layer_prefers_overlay_topmost() {
        let mut layers: [Vec<LayerSurface>; 4] = Default::default();
        let mut prompt = LayerSurface::new(SurfaceId::next(), Layer::Top, "launcher".into());
        prompt.anchor = Anchor::all();
        prompt.desired = (400, 300);
        prompt.keyboard_interactivity = KeyboardInteractivity::Exclusive;
        prompt.mapped = true;
        let prompt_id = prompt.id;
        layers[Layer::Top.index()].push(prompt);

        let outcome = arrange(&mut layers);
        assert_eq!(outcome.focus, Some(prompt_id));

        let mut lock = LayerSurface::new(SurfaceId::next(), Layer::Overlay, "lock".into());
        lock.anchor = Anchor::all();
        lock.keyboard_interactivity = KeyboardInteractivity::Exclusive;
        lock.mapped = true;
        let lock_id = lock.id;
        layers[Layer::Overlay.index()].push(lock);

        let outcome = arrange(&mut layers);
        assert_eq!(outcome.focus, Some(lock_id));
    }

    #[test]
    fn test_centered_when_unanchored() {
        let mut layers: [Vec<LayerSurface>; 4] = Default::default();
        let mut osd = LayerSurface::new(SurfaceId::next(), Layer::Overlay, "osd".into());
        osd.desired = (200, 100);
        layers[Layer::Overlay.index()].push(osd);

        arrange(&mut layers);
        assert_eq!(
            layers[Layer::Overlay.index()][0].geometry,
            Rect::new((1920 - 200) / 2, (1080 - 100) / 2, 200, 100)
        );
    }
}
