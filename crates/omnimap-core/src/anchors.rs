//! User-curated search anchors.
//!
//! An anchor is created either from a pasted map link, whose first
//! `lat,lng` pair is extracted, or from a dropped map pin. Anchors are never
//! edited in place: the list only supports insert, remove, clear and dedupe.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// Matches `@53.55,10.0`, `%4053.55,10.0,12z`, `?q=53.55,10.0` and bare pairs.
const COORDINATE_PATTERN: &str =
    r"(?:@|%40)?(-?\d+\.\d+),(-?\d+\.\d+)(?:,(\d+(?:\.\d+)?z))?";

fn coordinate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(COORDINATE_PATTERN).expect("coordinate pattern is valid"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: String,
    pub url: String,
    pub lat: f64,
    pub lng: f64,
}

impl Anchor {
    /// Builds an anchor from a pasted map link.
    ///
    /// # Errors
    ///
    /// - [`CoreError::UnrecognizedMapLink`] if the link holds no decimal
    ///   `lat,lng` pair.
    /// - [`CoreError::CoordinateOutOfRange`] if the pair is not a valid
    ///   position on the globe.
    pub fn from_link(url: &str) -> Result<Self, CoreError> {
        let url = url.trim();
        let (lat, lng) = parse_coordinates(url)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            url: url.to_owned(),
            lat,
            lng,
        })
    }

    /// Builds an anchor from a map pin, synthesizing a shareable link.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CoordinateOutOfRange`] for positions off the globe.
    pub fn from_pin(lat: f64, lng: f64) -> Result<Self, CoreError> {
        check_range(lat, lng)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            url: format!("https://www.google.com/maps?q={lat},{lng}"),
            lat,
            lng,
        })
    }

    /// `"lat,lng"`, the form the places provider expects for `location`.
    #[must_use]
    pub fn location_param(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// Extracts the first `lat,lng` pair from a map link.
///
/// # Errors
///
/// See [`Anchor::from_link`].
pub fn parse_coordinates(url: &str) -> Result<(f64, f64), CoreError> {
    let caps = coordinate_regex()
        .captures(url)
        .ok_or_else(|| CoreError::UnrecognizedMapLink(url.to_owned()))?;

    let lat = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| CoreError::UnrecognizedMapLink(url.to_owned()))?;
    let lng = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| CoreError::UnrecognizedMapLink(url.to_owned()))?;

    check_range(lat, lng)?;
    Ok((lat, lng))
}

fn check_range(lat: f64, lng: f64) -> Result<(), CoreError> {
    if lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
    {
        Ok(())
    } else {
        Err(CoreError::CoordinateOutOfRange { lat, lng })
    }
}

/// Ordered anchor list. The newest anchor sits at the front.
#[derive(Debug, Clone, Default)]
pub struct AnchorList {
    anchors: Vec<Anchor>,
}

impl AnchorList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, anchor: Anchor) -> &Anchor {
        self.anchors.insert(0, anchor);
        &self.anchors[0]
    }

    /// Removes the anchor with `id`, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Anchor> {
        let pos = self.anchors.iter().position(|a| a.id == id)?;
        Some(self.anchors.remove(pos))
    }

    /// Drops anchors whose coordinate pair already appears earlier in the
    /// list. Returns how many were dropped.
    pub fn dedupe(&mut self) -> usize {
        let before = self.anchors.len();
        let mut seen: Vec<(f64, f64)> = Vec::with_capacity(before);
        self.anchors.retain(|a| {
            #[allow(clippy::float_cmp)]
            let dup = seen.iter().any(|&(lat, lng)| lat == a.lat && lng == a.lng);
            if !dup {
                seen.push((a.lat, a.lng));
            }
            !dup
        });
        before - self.anchors.len()
    }

    pub fn clear(&mut self) {
        self.anchors.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Anchor] {
        &self.anchors
    }
}
