use cgmath::{InnerSpace, Vector3};

use crate::data_structures::model::{self, ModelVertex};

/**
 * Converts the triangulated, single-index tobj models into meshes.
 *
 * OBJ files often come without normals; those are computed from the faces so
 * that the lit pipeline shades them.
 */
pub fn load_meshes(models: &[tobj::Model]) -> Vec<model::Mesh> {
    models
        .iter()
        .map(|m| {
            let has_normals = m.mesh.normals.len() == m.mesh.positions.len();
            let mut vertices = (0..m.mesh.positions.len() / 3)
                .map(|i| ModelVertex {
                    position: [
                        m.mesh.positions[i * 3],
                        m.mesh.positions[i * 3 + 1],
                        m.mesh.positions[i * 3 + 2],
                    ],
                    normal: if has_normals {
                        [
                            m.mesh.normals[i * 3],
                            m.mesh.normals[i * 3 + 1],
                            m.mesh.normals[i * 3 + 2],
                        ]
                    } else {
                        [0.0; 3]
                    },
                })
                .collect::<Vec<_>>();

            // Faces referring to missing vertices would make the index buffer unusable
            let indices = m
                .mesh
                .indices
                .chunks_exact(3)
                .filter(|c| c.iter().all(|&i| (i as usize) < vertices.len()))
                .flatten()
                .copied()
                .collect::<Vec<u32>>();
            if indices.len() != m.mesh.indices.len() {
                log::warn!(
                    "Dropped {} out of range indices from {:?}",
                    m.mesh.indices.len() - indices.len(),
                    m.name
                );
            }

            if !has_normals {
                compute_normals(&mut vertices, &indices);
            }

            model::Mesh::new(m.name.clone(), vertices, indices)
        })
        .collect::<Vec<_>>()
}

/// Area weighted average of the face normals around every vertex.
pub fn compute_normals(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks_exact(3) {
        let pos0: Vector3<f32> = vertices[c[0] as usize].position.into();
        let pos1: Vector3<f32> = vertices[c[1] as usize].position.into();
        let pos2: Vector3<f32> = vertices[c[2] as usize].position.into();

        let face_normal = (pos1 - pos0).cross(pos2 - pos0);

        for &i in c {
            let v = &mut vertices[i as usize];
            v.normal = (face_normal + Vector3::from(v.normal)).into();
            triangles_included[i as usize] += 1;
        }
    }

    for (i, n) in triangles_included.into_iter().enumerate() {
        let v = &mut vertices[i];
        let normal = Vector3::from(v.normal);
        v.normal = if n == 0 || normal.magnitude2() == 0.0 {
            [0.0, 1.0, 0.0]
        } else {
            normal.normalize().into()
        };
    }
}
