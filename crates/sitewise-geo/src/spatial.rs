use geo::{Distance, Haversine, Point};
use sitewise_core::models::{Coordinates, DuplicateGroup, DuplicateMatch};

fn to_point(coordinates: &Coordinates) -> Point {
    Point::new(coordinates.longitude, coordinates.latitude)
}

/// Great-circle distance between two sites in kilometers
pub fn haversine_distance_km(a: &Coordinates, b: &Coordinates) -> f64 {
    Haversine.distance(to_point(a), to_point(b)) / 1000.0
}

/// Check if `candidate` lies within `radius_km` of `center` (inclusive)
pub fn within_radius(center: &Coordinates, candidate: &Coordinates, radius_km: f64) -> bool {
    haversine_distance_km(center, candidate) <= radius_km
}

/// Sites within `radius_km` of `center`, nearest first.
///
/// Ties on distance are ordered by name so results are deterministic.
pub fn find_within_radius<'a, I>(center: &Coordinates, sites: I, radius_km: f64) -> Vec<DuplicateMatch>
where
    I: IntoIterator<Item = (&'a str, Coordinates)>,
{
    let mut matches: Vec<DuplicateMatch> = sites
        .into_iter()
        .filter_map(|(name, coordinates)| {
            let distance_km = haversine_distance_km(center, &coordinates);
            (distance_km <= radius_km).then(|| DuplicateMatch {
                project_name: name.to_string(),
                coordinates,
                distance_km,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.project_name.cmp(&b.project_name))
    });
    matches
}

/// Cluster sites whose coordinates fall within `radius_km` of each other.
///
/// Each unassigned site seeds a group and collects every other unassigned
/// site within the radius of it; singletons are dropped. The seed is the
/// group center and is listed first at distance zero.
pub fn group_by_proximity(sites: &[(String, Coordinates)], radius_km: f64) -> Vec<DuplicateGroup> {
    let mut assigned = vec![false; sites.len()];
    let mut groups = Vec::new();

    for (i, (seed_name, seed)) in sites.iter().enumerate() {
        if assigned[i] {
            continue;
        }

        let mut members: Vec<(usize, DuplicateMatch)> = sites
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i && !assigned[*j])
            .filter_map(|(j, (name, coordinates))| {
                let distance_km = haversine_distance_km(seed, coordinates);
                (distance_km <= radius_km).then(|| {
                    (j, DuplicateMatch { project_name: name.clone(), coordinates: *coordinates, distance_km })
                })
            })
            .collect();

        if members.is_empty() {
            continue;
        }

        members.sort_by(|a, b| a.1.distance_km.total_cmp(&b.1.distance_km));

        assigned[i] = true;
        for (j, _) in &members {
            assigned[*j] = true;
        }

        let average_distance_km =
            members.iter().map(|(_, m)| m.distance_km).sum::<f64>() / members.len() as f64;

        let mut projects = vec![DuplicateMatch {
            project_name: seed_name.clone(),
            coordinates: *seed,
            distance_km: 0.0,
        }];
        projects.extend(members.into_iter().map(|(_, m)| m));

        groups.push(DuplicateGroup { center_coordinates: *seed, projects, average_distance_km });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn abilene() -> Coordinates {
        Coordinates::new(32.4487, -99.7331)
    }

    #[test]
    fn test_distance_accuracy() {
        // Amarillo to Lubbock is roughly 183 km
        let amarillo = Coordinates::new(35.2220, -101.8313);
        let lubbock = Coordinates::new(33.5779, -101.8552);

        let distance = haversine_distance_km(&amarillo, &lubbock);
        assert!(distance > 177.0 && distance < 188.0, "got {}", distance);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let distance = haversine_distance_km(&abilene(), &abilene());
        assert!(distance < 1e-9);
    }

    #[test]
    fn test_find_within_radius_sorted_by_distance() {
        let near = Coordinates::new(32.4520, -99.7331);
        let nearer = Coordinates::new(32.4490, -99.7331);
        let far = Coordinates::new(33.0, -99.7331);

        let matches = find_within_radius(
            &abilene(),
            [("near", near), ("far", far), ("nearer", nearer)],
            1.0,
        );

        let names: Vec<_> = matches.iter().map(|m| m.project_name.as_str()).collect();
        assert_eq!(names, vec!["nearer", "near"]);
        assert!(matches[0].distance_km < matches[1].distance_km);
    }

    #[test]
    fn test_group_by_proximity() {
        let sites = vec![
            ("abilene-wind-farm".to_string(), abilene()),
            ("abilene-wind-farm-2".to_string(), Coordinates::new(32.4520, -99.7331)),
            ("amarillo-wind-farm".to_string(), Coordinates::new(35.2220, -101.8313)),
        ];

        let groups = group_by_proximity(&sites, 1.0);
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.center_coordinates, abilene());
        assert_eq!(group.projects.len(), 2);
        assert_eq!(group.projects[0].project_name, "abilene-wind-farm");
        assert!(group.average_distance_km > 0.0 && group.average_distance_km < 1.0);
    }

    #[test]
    fn test_no_groups_for_isolated_sites() {
        let sites = vec![
            ("a".to_string(), Coordinates::new(10.0, 10.0)),
            ("b".to_string(), Coordinates::new(20.0, 20.0)),
        ];
        assert!(group_by_proximity(&sites, 1.0).is_empty());
    }

    fn coordinates() -> impl Strategy<Value = Coordinates> {
        (-89.0f64..89.0, -179.0f64..179.0).prop_map(|(lat, lon)| Coordinates::new(lat, lon))
    }

    proptest! {
        #[test]
        fn prop_distance_is_symmetric(a in coordinates(), b in coordinates()) {
            let ab = haversine_distance_km(&a, &b);
            let ba = haversine_distance_km(&b, &a);
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn prop_within_radius_is_symmetric(
            a in coordinates(),
            dlat in -0.02f64..0.02,
            dlon in -0.02f64..0.02,
            radius in 0.1f64..5.0,
        ) {
            let b = Coordinates::new(a.latitude + dlat, a.longitude + dlon);
            let forward = find_within_radius(&a, [("q", b)], radius);
            let backward = find_within_radius(&b, [("p", a)], radius);
            prop_assert_eq!(forward.len(), backward.len());
        }
    }
}
