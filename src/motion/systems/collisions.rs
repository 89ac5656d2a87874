//! Motion domain: contact sample acquisition via spatial queries.

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::motion::config::MotionTuning;
use crate::motion::probe::ContactSample;
use crate::motion::GameLayer;

/// One zero-displacement overlap query: a box matching the character's
/// collision shape, inflated by the probe offset, bounded to the configured
/// hit count. The querying entity is excluded, so the probe never sees its
/// own collider.
pub(crate) fn probe_contacts(
    spatial_query: &SpatialQuery,
    entity: Entity,
    transform: &Transform,
    tuning: &MotionTuning,
) -> Vec<ContactSample> {
    let shape = Collider::rectangle(
        tuning.collider_width + tuning.probe_size_offset,
        tuning.collider_height + tuning.probe_size_offset,
    );
    let origin = transform.translation.truncate();
    let rotation = transform.rotation.to_euler(EulerRot::ZYX).0;

    let filter = SpatialQueryFilter::from_mask([GameLayer::Ground, GameLayer::Wall])
        .with_excluded_entities([entity]);
    let config = ShapeCastConfig {
        max_distance: 0.0,
        ..ShapeCastConfig::default()
    };

    spatial_query
        .shape_hits(
            &shape,
            origin,
            rotation,
            Dir2::NEG_Y,
            tuning.probe_max_hits,
            &config,
            &filter,
        )
        .into_iter()
        .map(|hit| ContactSample {
            entity: hit.entity,
            normal: hit.normal2,
            point: hit.point2,
        })
        .collect()
}
