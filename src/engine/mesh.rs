use gltf;

/// Triangle mesh with interleaved vertices: position xyz, color rgb.
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u16>,
}

const VERTEX_STRIDE: usize = 6;

/// Assembles box-composite meshes (vehicles, trees, the placeholder
/// player). Face shading is baked into the vertex colors so the shader
/// stays a plain color pass.
pub struct MeshBuilder {
    vertices: Vec<f32>,
    indices: Vec<u16>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        MeshBuilder { vertices: Vec::new(), indices: Vec::new() }
    }

    /// Axis-aligned box centered at (cx, cy, cz) with extents (sx, sy, sz).
    pub fn push_box(&mut self, cx: f32, cy: f32, cz: f32, sx: f32, sy: f32, sz: f32, r: f32, g: f32, b: f32) {
        let hx = sx / 2.0;
        let hy = sy / 2.0;
        let hz = sz / 2.0;

        let mut push_face = |corners: [[f32; 3]; 4], brightness: f32| {
            let base = (self.vertices.len() / VERTEX_STRIDE) as u16;
            for [x, y, z] in corners {
                self.vertices.extend_from_slice(&[
                    cx + x,
                    cy + y,
                    cz + z,
                    r * brightness,
                    g * brightness,
                    b * brightness,
                ]);
            }
            self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        };

        // Front (+z), back, top, bottom, right (+x), left.
        push_face([[-hx, -hy, hz], [hx, -hy, hz], [hx, hy, hz], [-hx, hy, hz]], 0.9);
        push_face([[hx, -hy, -hz], [-hx, -hy, -hz], [-hx, hy, -hz], [hx, hy, -hz]], 0.7);
        push_face([[-hx, hy, hz], [hx, hy, hz], [hx, hy, -hz], [-hx, hy, -hz]], 1.1);
        push_face([[-hx, -hy, -hz], [hx, -hy, -hz], [hx, -hy, hz], [-hx, -hy, hz]], 0.4);
        push_face([[hx, -hy, hz], [hx, -hy, -hz], [hx, hy, -hz], [hx, hy, hz]], 0.8);
        push_face([[-hx, -hy, -hz], [-hx, -hy, hz], [-hx, hy, hz], [-hx, hy, -hz]], 0.6);
    }

    pub fn build(self) -> Mesh {
        Mesh { vertices: self.vertices, indices: self.indices }
    }
}

impl Mesh {
    /// White unit cube; tinted per draw with the uniform-color path.
    pub fn unit_cube() -> Self {
        let mut builder = MeshBuilder::new();
        builder.push_box(0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0);
        builder.build()
    }

    pub fn from_gltf(bytes: &[u8]) -> Result<Self, String> {
        let (document, buffers, _) = gltf::import_slice(bytes).map_err(|e| e.to_string())?;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for mesh in document.meshes() {
            for primitive in mesh.primitives() {
                let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

                let positions: Vec<[f32; 3]> = reader.read_positions().ok_or("No positions")?.collect();
                let colors: Vec<[f32; 3]> = if let Some(iter) = reader.read_colors(0) {
                    iter.into_rgb_f32().collect()
                } else {
                    vec![[1.0, 1.0, 1.0]; positions.len()]
                };

                let base_index = (vertices.len() / VERTEX_STRIDE) as u16;

                for (pos, color) in positions.iter().zip(colors.iter()) {
                    vertices.extend_from_slice(&[pos[0], pos[1], pos[2], color[0], color[1], color[2]]);
                }

                if let Some(iter) = reader.read_indices() {
                    for index in iter.into_u32() {
                        indices.push(base_index + index as u16);
                    }
                }
            }
        }

        Ok(Mesh { vertices, indices })
    }
}
