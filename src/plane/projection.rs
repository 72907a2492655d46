use spatial_placement_geometry::{point_in_triangle, Transform};

use crate::tracking::PlaneAnchor;

/// Drops `query` straight down (or up) onto the closest horizontal plane
/// whose mesh contains it.
///
/// Only horizontal planes within `max_distance` vertically are considered.
/// Containment is tested on the floor projection of `query` in each plane's
/// local space, against every triangle of the plane mesh. Among containing
/// planes the one with the least vertical offset wins. The result keeps the
/// rotation and scale of `query`; `None` means no plane contains it.
pub fn project_onto_horizontal_plane<'a>(
    query: &Transform,
    planes: impl IntoIterator<Item = &'a PlaneAnchor>,
    max_distance: f32,
) -> Option<Transform> {
    let position = query.position;

    planes
        .into_iter()
        .filter(|plane| plane.is_horizontal())
        .map(|plane| (plane, position.vertical_distance(&plane.transform.position)))
        .filter(|(_, distance)| *distance <= max_distance)
        .filter(|(plane, _)| {
            let local = plane.transform.inverse_transform_point(position).horizontal();
            plane.mesh.triangles().any(|[a, b, c]| {
                point_in_triangle(local, a.horizontal(), b.horizontal(), c.horizontal())
            })
        })
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(plane, _)| query.with_position(position.with_y(plane.height())))
}
