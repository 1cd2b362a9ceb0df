//! Assign a material to imported objects

use kiln_core::{KilnError, MaterialHandle, MeshObject, Result};

/// Put `material` in slot 0 of every object, appending a slot where an
/// object has none. Returns the number of objects bound.
pub fn bind(material: &MaterialHandle, objects: &mut [MeshObject]) -> Result<usize> {
    if !material.is_valid() {
        return Err(KilnError::InvalidMaterialHandle(format!(
            "'{}' does not name a material",
            material
        )));
    }

    for object in objects.iter_mut() {
        match object.material_slots.first_mut() {
            Some(slot) => {
                if slot != material {
                    log::debug!("{}: replacing slot 0 ({}) with {}", object.name, slot, material);
                }
                *slot = material.clone();
            }
            None => object.material_slots.push(material.clone()),
        }
    }

    Ok(objects.len())
}
