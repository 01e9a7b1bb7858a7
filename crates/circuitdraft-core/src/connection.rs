//! Connection resolution between coincident connection points.
//!
//! Links are always symmetric: if point `i` of component A links to point
//! `j` of component B, then point `j` of B links back to point `i` of A.
//! Positions are compared exactly; two points connect only when their
//! absolute coordinates are identical.
//!
//! After any mutation of a component, call [`reset_connections`] and then
//! [`apply_connections`] for that same component. Before removing a
//! component from the document, call [`disconnect_connections`].

use crate::component::{ComponentId, ConnectionRef};
use crate::document::CircuitDocument;
use kurbo::Point;
use std::collections::BTreeSet;

/// A position where two or more connection points are linked.
#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    /// Shared position of the linked points.
    pub position: Point,
    /// Every connection point meeting here.
    pub points: BTreeSet<ConnectionRef>,
}

/// Clear all links of a component, including the reverse links held by its peers.
///
/// Idempotent; does nothing if the component is not in the document.
pub fn reset_connections(doc: &mut CircuitDocument, id: ComponentId) {
    let Some(component) = doc.get_mut(id) else {
        return;
    };

    let mut peers: Vec<(usize, ConnectionRef)> = Vec::new();
    for (index, point) in component.connection_points.iter_mut().enumerate() {
        peers.extend(point.links.iter().map(|&l| (index, l)));
        point.links.clear();
    }

    for (index, peer) in peers {
        if let Some(point) = doc
            .get_mut(peer.component)
            .and_then(|c| c.connection_points.get_mut(peer.point))
        {
            point.links.remove(&ConnectionRef { component: id, point: index });
        }
    }
}

/// Link every connection point of `id` to coincident points on other components.
///
/// Returns the number of new links created.
pub fn apply_connections(doc: &mut CircuitDocument, id: ComponentId) -> usize {
    let Some(component) = doc.get(id) else {
        return 0;
    };
    let own: Vec<(usize, Point)> = component.connection_positions().enumerate().collect();

    let mut matches: Vec<(usize, ConnectionRef)> = Vec::new();
    for other in doc.components().filter(|c| c.id() != id) {
        for (peer_index, peer_pos) in other.connection_positions().enumerate() {
            for &(index, pos) in &own {
                if pos == peer_pos {
                    let peer = ConnectionRef {
                        component: other.id(),
                        point: peer_index,
                    };
                    matches.push((index, peer));
                }
            }
        }
    }

    let mut created = 0;
    for (index, peer) in matches {
        let forward = doc
            .get_mut(id)
            .map(|c| c.connection_points[index].links.insert(peer))
            .unwrap_or(false);
        if let Some(point) = doc
            .get_mut(peer.component)
            .and_then(|c| c.connection_points.get_mut(peer.point))
        {
            point.links.insert(ConnectionRef { component: id, point: index });
        }
        if forward {
            created += 1;
        }
    }

    log::debug!("Applied {} connection(s) for component {}", created, id);
    created
}

/// Remove `id` from every other component's links and clear its own links.
///
/// Scans the whole document, so it also cleans up links that were never
/// reciprocated.
pub fn disconnect_connections(doc: &mut CircuitDocument, id: ComponentId) {
    let others: Vec<ComponentId> = doc.ids().iter().copied().filter(|&c| c != id).collect();
    for other in others {
        if let Some(component) = doc.get_mut(other) {
            for point in &mut component.connection_points {
                point.links.retain(|l| l.component != id);
            }
        }
    }
    if let Some(component) = doc.get_mut(id) {
        component.clear_links();
    }
}

/// Recompute every link in the document from scratch.
pub fn resolve_all(doc: &mut CircuitDocument) {
    let ids: Vec<ComponentId> = doc.ids().to_vec();
    for &id in &ids {
        if let Some(component) = doc.get_mut(id) {
            component.clear_links();
        }
    }
    for &id in &ids {
        apply_connections(doc, id);
    }
}

/// Collect the positions where linked connection points meet.
///
/// Junctions are returned in document order of their first participant.
pub fn junctions(doc: &CircuitDocument) -> Vec<Junction> {
    let mut result: Vec<Junction> = Vec::new();
    for component in doc.components() {
        for (index, point) in component.connection_points.iter().enumerate() {
            if point.links.is_empty() {
                continue;
            }
            let position = component.location + point.offset;
            let here = ConnectionRef { component: component.id(), point: index };
            match result.iter_mut().find(|j| j.position == position) {
                Some(junction) => {
                    junction.points.insert(here);
                    junction.points.extend(point.links.iter().copied());
                }
                None => {
                    let mut points: BTreeSet<ConnectionRef> = point.links.clone();
                    points.insert(here);
                    result.push(Junction { position, points });
                }
            }
        }
    }
    result
}

/// Find links whose peer is missing from the document or does not link back.
pub fn dangling_links(doc: &CircuitDocument) -> Vec<(ConnectionRef, ConnectionRef)> {
    let mut dangling = Vec::new();
    for component in doc.components() {
        for (index, point) in component.connection_points.iter().enumerate() {
            let here = ConnectionRef { component: component.id(), point: index };
            for &peer in &point.links {
                let reciprocated = doc
                    .get(peer.component)
                    .and_then(|c| c.connection_points.get(peer.point))
                    .is_some_and(|p| p.links.contains(&here));
                if !reciprocated {
                    dangling.push((here, peer));
                }
            }
        }
    }
    dangling
}
