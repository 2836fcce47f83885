//! Multi-city route sequencing.
//!
//! Orders stops with a nearest-neighbour walk from the first stop and
//! estimates driving time from great-circle distance.

use serde::Serialize;
use tracing::debug;

use crate::models::Place;

/// Assumed average road speed for duration estimates
pub const AVERAGE_SPEED_KMH: f64 = 70.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteLeg {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub stops: Vec<Place>,
    pub legs: Vec<RouteLeg>,
    pub total_distance_km: f64,
    pub total_duration_hours: f64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Visit order starting at the first stop. With `keep_last` the final stop
/// stays at the end and only the stops in between are reordered.
#[must_use]
pub fn plan_route(places: Vec<Place>, keep_last: bool) -> Route {
    let mut remaining = places;
    let end = if keep_last && remaining.len() > 2 {
        remaining.pop()
    } else {
        None
    };

    let mut stops = Vec::with_capacity(remaining.len() + 1);
    if !remaining.is_empty() {
        stops.push(remaining.remove(0));
    }
    while let Some(current) = stops.last() {
        let nearest = remaining
            .iter()
            .enumerate()
            .map(|(idx, p)| (idx, current.coordinates.distance_km(&p.coordinates)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(idx, _)| idx);
        match nearest {
            Some(idx) => stops.push(remaining.remove(idx)),
            None => break,
        }
    }
    stops.extend(end);

    let legs: Vec<RouteLeg> = stops
        .windows(2)
        .map(|pair| {
            let distance = pair[0].coordinates.distance_km(&pair[1].coordinates);
            RouteLeg {
                from: pair[0].name.clone(),
                to: pair[1].name.clone(),
                distance_km: round_to(distance, 1),
                duration_hours: round_to(distance / AVERAGE_SPEED_KMH, 2),
            }
        })
        .collect();

    let total_distance_km = round_to(legs.iter().map(|l| l.distance_km).sum(), 1);
    let total_duration_hours = round_to(total_distance_km / AVERAGE_SPEED_KMH, 2);
    debug!(
        "Planned route over {} stops, {} km",
        stops.len(),
        total_distance_km
    );

    Route {
        stops,
        legs,
        total_distance_km,
        total_duration_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;

    fn place(name: &str, lat: f64, lon: f64) -> Place {
        Place {
            name: name.to_string(),
            country: None,
            coordinates: Coordinates::new(lat, lon).unwrap(),
            code: None,
        }
    }

    fn names(route: &Route) -> Vec<&str> {
        route.stops.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_nearest_neighbour_order() {
        let route = plan_route(
            vec![
                place("Paris", 48.8566, 2.3522),
                place("Marseille", 43.2965, 5.3698),
                place("Lyon", 45.764, 4.8357),
                place("Nice", 43.7102, 7.262),
            ],
            false,
        );
        assert_eq!(names(&route), vec!["Paris", "Lyon", "Marseille", "Nice"]);
        assert_eq!(route.legs.len(), 3);
        assert_eq!(route.legs[0].from, "Paris");
        assert_eq!(route.legs[0].to, "Lyon");
        assert!((390.0..=395.0).contains(&route.legs[0].distance_km));
    }

    #[test]
    fn test_keep_last_pins_destination() {
        let route = plan_route(
            vec![
                place("Paris", 48.8566, 2.3522),
                place("Nice", 43.7102, 7.262),
                place("Lyon", 45.764, 4.8357),
                place("Dijon", 47.322, 5.0415),
            ],
            true,
        );
        assert_eq!(names(&route), vec!["Paris", "Lyon", "Nice", "Dijon"]);
    }

    #[test]
    fn test_duration_uses_average_speed() {
        let route = plan_route(
            vec![place("A", 45.0, 5.0), place("B", 45.0, 6.0)],
            false,
        );
        let leg = &route.legs[0];
        assert!((leg.duration_hours - round_to(leg.distance_km / 70.0, 2)).abs() < 0.01);
        assert_eq!(route.total_distance_km, leg.distance_km);
    }

    #[test]
    fn test_trivial_routes() {
        assert!(plan_route(vec![], false).legs.is_empty());
        let single = plan_route(vec![place("A", 1.0, 1.0)], true);
        assert_eq!(single.stops.len(), 1);
        assert_eq!(single.total_distance_km, 0.0);
    }
}
