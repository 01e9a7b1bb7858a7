//! Placed circuit components and their connection points.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for components.
pub type ComponentId = Uuid;

/// Ordered, string-keyed configuration of a component.
pub type ComponentData = BTreeMap<String, String>;

/// Reserved configuration key for the horizontal location.
pub const LOCATION_X_KEY: &str = "@x";
/// Reserved configuration key for the vertical location.
pub const LOCATION_Y_KEY: &str = "@y";

/// Errors raised while loading a component configuration.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Malformed component data: {0}")]
    MalformedSnapshot(String),
    #[error("Missing configuration key: {0}")]
    MissingKey(&'static str),
    #[error("Invalid number for {key}: {value}")]
    InvalidNumber { key: &'static str, value: String },
}

/// A link from one connection point to a connection point on another component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionRef {
    /// The peer component.
    pub component: ComponentId,
    /// Index of the peer's connection point.
    pub point: usize,
}

/// A coordinate on a component where another component may connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionPoint {
    /// Terminal name (e.g. "a", "b", "anode").
    pub name: String,
    /// Offset from the component location.
    pub offset: Vec2,
    /// Peers currently linked to this point. Runtime state only.
    #[serde(skip)]
    pub links: BTreeSet<ConnectionRef>,
}

impl ConnectionPoint {
    /// Create an unlinked connection point.
    pub fn new(name: impl Into<String>, offset: Vec2) -> Self {
        Self {
            name: name.into(),
            offset,
            links: BTreeSet::new(),
        }
    }

    /// Check whether this point is linked to anything.
    pub fn is_connected(&self) -> bool {
        !self.links.is_empty()
    }
}

/// A placed circuit element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub(crate) id: ComponentId,
    /// Name of the component description this was created from.
    pub kind: String,
    /// Location of the component origin in document coordinates.
    pub location: Point,
    /// Type-specific properties (e.g. "resistance").
    pub properties: BTreeMap<String, String>,
    /// Connection points, in description order.
    pub connection_points: Vec<ConnectionPoint>,
}

impl Component {
    /// Create a component with a fresh id and no connection points.
    pub fn new(kind: impl Into<String>, location: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            location,
            properties: BTreeMap::new(),
            connection_points: Vec::new(),
        }
    }

    /// Add a connection point (builder style).
    pub fn with_connection_point(mut self, name: impl Into<String>, offset: Vec2) -> Self {
        self.connection_points.push(ConnectionPoint::new(name, offset));
        self
    }

    /// Set a property (builder style).
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// A two-terminal component with terminals at the origin and at `span`.
    pub fn two_terminal(kind: impl Into<String>, location: Point, span: Vec2) -> Self {
        Self::new(kind, location)
            .with_connection_point("a", Vec2::ZERO)
            .with_connection_point("b", span)
    }

    /// Get the unique identifier.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Get a property value.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Absolute position of the connection point at `index`.
    pub fn connection_position(&self, index: usize) -> Option<Point> {
        self.connection_points
            .get(index)
            .map(|p| self.location + p.offset)
    }

    /// Absolute positions of all connection points, in order.
    pub fn connection_positions(&self) -> impl Iterator<Item = Point> + '_ {
        self.connection_points.iter().map(|p| self.location + p.offset)
    }

    /// Bounding box spanned by the location and all connection points.
    pub fn bounds(&self) -> Rect {
        self.connection_positions()
            .fold(Rect::from_points(self.location, self.location), |r, p| {
                r.union_pt(p)
            })
    }

    /// Check whether any connection point links to `other`.
    pub fn is_connected_to(&self, other: ComponentId) -> bool {
        self.connection_points
            .iter()
            .any(|p| p.links.iter().any(|l| l.component == other))
    }

    /// Ids of every component linked to this one.
    pub fn linked_components(&self) -> BTreeSet<ComponentId> {
        self.connection_points
            .iter()
            .flat_map(|p| p.links.iter().map(|l| l.component))
            .collect()
    }

    /// Drop every link held by this component's own connection points.
    pub(crate) fn clear_links(&mut self) {
        for point in &mut self.connection_points {
            point.links.clear();
        }
    }

    /// Serialize the configuration to an ordered map.
    pub fn serialize(&self) -> ComponentData {
        let mut data = self.properties.clone();
        data.insert(LOCATION_X_KEY.to_string(), self.location.x.to_string());
        data.insert(LOCATION_Y_KEY.to_string(), self.location.y.to_string());
        data
    }

    /// Serialize the configuration to its snapshot string.
    pub fn serialize_to_string(&self) -> String {
        encode_data(&self.serialize())
    }

    /// Load the configuration from a map.
    ///
    /// Either the whole configuration is applied or the component is left untouched.
    pub fn deserialize(&mut self, data: &ComponentData) -> Result<(), ComponentError> {
        let location = Point::new(
            parse_coordinate(data, LOCATION_X_KEY)?,
            parse_coordinate(data, LOCATION_Y_KEY)?,
        );
        let properties = data
            .iter()
            .filter(|(k, _)| k.as_str() != LOCATION_X_KEY && k.as_str() != LOCATION_Y_KEY)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.location = location;
        self.properties = properties;
        Ok(())
    }

    /// Load the configuration from a snapshot string.
    pub fn deserialize_str(&mut self, snapshot: &str) -> Result<(), ComponentError> {
        let data = parse_data(snapshot)?;
        self.deserialize(&data)
    }

    /// Check that a snapshot string would load into a component.
    pub fn validate_snapshot(snapshot: &str) -> Result<ComponentData, ComponentError> {
        let data = parse_data(snapshot)?;
        parse_coordinate(&data, LOCATION_X_KEY)?;
        parse_coordinate(&data, LOCATION_Y_KEY)?;
        Ok(data)
    }
}

/// Encode a configuration map as a compact JSON object.
pub fn encode_data(data: &ComponentData) -> String {
    // A map of strings always serializes.
    serde_json::to_string(data).unwrap_or_default()
}

/// Parse a snapshot string back into a configuration map.
pub fn parse_data(snapshot: &str) -> Result<ComponentData, ComponentError> {
    serde_json::from_str(snapshot).map_err(|e| ComponentError::MalformedSnapshot(e.to_string()))
}

fn parse_coordinate(data: &ComponentData, key: &'static str) -> Result<f64, ComponentError> {
    let raw = data.get(key).ok_or(ComponentError::MissingKey(key))?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ComponentError::InvalidNumber {
            key,
            value: raw.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resistor() -> Component {
        Component::two_terminal("resistor", Point::new(10.0, 20.0), Vec2::new(60.0, 0.0))
            .with_property("resistance", "100")
    }

    #[test]
    fn test_connection_positions() {
        let r = resistor();
        assert_eq!(r.connection_position(0), Some(Point::new(10.0, 20.0)));
        assert_eq!(r.connection_position(1), Some(Point::new(70.0, 20.0)));
        assert_eq!(r.connection_position(2), None);
    }

    #[test]
    fn test_serialize_includes_location() {
        let data = resistor().serialize();
        assert_eq!(data.get("resistance").map(String::as_str), Some("100"));
        assert_eq!(data.get(LOCATION_X_KEY).map(String::as_str), Some("10"));
        assert_eq!(data.get(LOCATION_Y_KEY).map(String::as_str), Some("20"));
    }

    #[test]
    fn test_snapshot_string_is_stable() {
        let r = resistor();
        let first = r.serialize_to_string();

        let mut copy = resistor();
        copy.properties.clear();
        copy.location = Point::ORIGIN;
        copy.deserialize_str(&first).unwrap();

        assert_eq!(copy.serialize_to_string(), first);
        assert_eq!(copy.location, r.location);
    }

    #[test]
    fn test_deserialize_replaces_properties() {
        let mut r = resistor().with_property("tolerance", "5%");
        let mut data = ComponentData::new();
        data.insert(LOCATION_X_KEY.into(), "0".into());
        data.insert(LOCATION_Y_KEY.into(), "0".into());
        data.insert("resistance".into(), "220".into());

        r.deserialize(&data).unwrap();

        assert_eq!(r.property("resistance"), Some("220"));
        assert_eq!(r.property("tolerance"), None);
        assert_eq!(r.location, Point::ORIGIN);
    }

    #[test]
    fn test_malformed_snapshot_leaves_component_untouched() {
        let mut r = resistor();
        let before = r.serialize_to_string();

        assert!(matches!(
            r.deserialize_str("not json"),
            Err(ComponentError::MalformedSnapshot(_))
        ));
        assert!(matches!(
            r.deserialize_str(r#"{"resistance":"1"}"#),
            Err(ComponentError::MissingKey(_))
        ));
        assert!(matches!(
            r.deserialize_str(r#"{"@x":"abc","@y":"0","resistance":"1"}"#),
            Err(ComponentError::InvalidNumber { .. })
        ));

        assert_eq!(r.serialize_to_string(), before);
    }

    #[test]
    fn test_links_are_not_persisted() {
        let mut r = resistor();
        r.connection_points[0].links.insert(ConnectionRef {
            component: Uuid::new_v4(),
            point: 0,
        });
        let json = serde_json::to_string(&r).unwrap();
        let loaded: Component = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.id(), r.id());
        assert!(!loaded.connection_points[0].is_connected());
    }
}
