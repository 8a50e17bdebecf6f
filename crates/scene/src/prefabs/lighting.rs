use foundation::math::Vec3;

use crate::World;
use crate::components::{Light, Transform, rgb_hex};
use crate::entity::NodeId;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightingRig {
    pub ambient: NodeId,
    pub sun: NodeId,
    pub hemisphere: NodeId,
}

/// Soft ambient fill, a shadow-casting sun and a sky/ground hemisphere.
pub fn spawn_lighting_rig(world: &mut World) -> LightingRig {
    let ambient = world.spawn("ambient-light");
    world.set_light(
        ambient,
        Light::Ambient {
            color: rgb_hex(0xffffff),
            intensity: 0.6,
        },
    );

    let sun = world.spawn("sun-light");
    world.set_transform(sun, Transform::translate(Vec3::new(5.0, 10.0, 5.0)));
    world.set_light(
        sun,
        Light::Directional {
            color: rgb_hex(0xffffff),
            intensity: 0.8,
            casts_shadow: true,
        },
    );

    let hemisphere = world.spawn("hemisphere-light");
    world.set_light(
        hemisphere,
        Light::Hemisphere {
            sky: rgb_hex(0x87ceeb),
            ground: rgb_hex(0x545454),
            intensity: 0.4,
        },
    );

    LightingRig {
        ambient,
        sun,
        hemisphere,
    }
}
