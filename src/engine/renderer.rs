use nalgebra::{Matrix4, Vector3};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, WebGlBuffer, WebGlProgram, WebGlRenderingContext, WebGlUniformLocation};

use crate::engine::mesh::Mesh;

const VERTEX_SHADER: &str = r#"
    attribute vec3 aPosition;
    attribute vec3 aColor;
    uniform mat4 uModelViewProjection;
    varying vec3 vColor;
    void main() {
        gl_Position = uModelViewProjection * vec4(aPosition, 1.0);
        vColor = aColor;
    }
"#;

const FRAGMENT_SHADER: &str = r#"
    precision mediump float;
    varying vec3 vColor;
    uniform vec3 uUniformColor;
    uniform bool uUseUniformColor;

    void main() {
        vec3 color = vColor;
        if (uUseUniformColor) {
            // Vertex colors carry the baked face shading; the uniform
            // tints it so boxes keep their depth cue.
            color = uUniformColor * vColor;
        }
        gl_FragColor = vec4(color, 1.0);
    }
"#;

pub struct Renderer {
    pub gl: WebGlRenderingContext,
    mvp_location: WebGlUniformLocation,
    uniform_color_location: WebGlUniformLocation,
    use_uniform_color_location: WebGlUniformLocation,
    position_attrib: u32,
    color_attrib: u32,
    unit_cube_vertex_buffer: WebGlBuffer,
    unit_cube_index_buffer: WebGlBuffer,
    unit_cube_index_count: i32,
    dynamic_vertex_buffer: WebGlBuffer,
    dynamic_index_buffer: WebGlBuffer,
}

impl Renderer {
    pub fn new(gl: WebGlRenderingContext) -> Result<Self, JsValue> {
        let program = create_program(&gl)?;
        gl.use_program(Some(&program));

        let mvp_location = gl
            .get_uniform_location(&program, "uModelViewProjection")
            .ok_or("Failed to get uModelViewProjection location")?;
        let uniform_color_location = gl
            .get_uniform_location(&program, "uUniformColor")
            .ok_or("Failed to get uUniformColor location")?;
        let use_uniform_color_location = gl
            .get_uniform_location(&program, "uUseUniformColor")
            .ok_or("Failed to get uUseUniformColor location")?;

        let position_attrib = gl.get_attrib_location(&program, "aPosition") as u32;
        let color_attrib = gl.get_attrib_location(&program, "aColor") as u32;

        let unit_cube_vertex_buffer = gl.create_buffer().ok_or("Failed to create buffer")?;
        let unit_cube_index_buffer = gl.create_buffer().ok_or("Failed to create buffer")?;
        let dynamic_vertex_buffer = gl.create_buffer().ok_or("Failed to create buffer")?;
        let dynamic_index_buffer = gl.create_buffer().ok_or("Failed to create buffer")?;

        let unit_cube = Mesh::unit_cube();

        gl.bind_buffer(WebGlRenderingContext::ARRAY_BUFFER, Some(&unit_cube_vertex_buffer));
        unsafe {
            let vert_array = js_sys::Float32Array::view(&unit_cube.vertices);
            gl.buffer_data_with_array_buffer_view(
                WebGlRenderingContext::ARRAY_BUFFER,
                &vert_array,
                WebGlRenderingContext::STATIC_DRAW,
            );
        }

        gl.bind_buffer(WebGlRenderingContext::ELEMENT_ARRAY_BUFFER, Some(&unit_cube_index_buffer));
        unsafe {
            let idx_array = js_sys::Uint16Array::view(&unit_cube.indices);
            gl.buffer_data_with_array_buffer_view(
                WebGlRenderingContext::ELEMENT_ARRAY_BUFFER,
                &idx_array,
                WebGlRenderingContext::STATIC_DRAW,
            );
        }
        let unit_cube_index_count = unit_cube.indices.len() as i32;

        Ok(Renderer {
            gl,
            mvp_location,
            uniform_color_location,
            use_uniform_color_location,
            position_attrib,
            color_attrib,
            unit_cube_vertex_buffer,
            unit_cube_index_buffer,
            unit_cube_index_count,
            dynamic_vertex_buffer,
            dynamic_index_buffer,
        })
    }

    pub fn clear(&self, r: f32, g: f32, b: f32) {
        self.gl.clear_color(r, g, b, 1.0);
        self.gl
            .clear(WebGlRenderingContext::COLOR_BUFFER_BIT | WebGlRenderingContext::DEPTH_BUFFER_BIT);
    }

    pub fn enable_depth_test(&self) {
        self.gl.enable(WebGlRenderingContext::DEPTH_TEST);
    }

    pub fn resize(&self, width: i32, height: i32) {
        self.gl.viewport(0, 0, width, height);
    }

    pub fn canvas(&self) -> Option<HtmlCanvasElement> {
        self.gl.canvas().and_then(|c| c.dyn_into::<HtmlCanvasElement>().ok())
    }

    fn bind_attribs(&self) {
        self.gl
            .vertex_attrib_pointer_with_i32(self.position_attrib, 3, WebGlRenderingContext::FLOAT, false, 24, 0);
        self.gl.enable_vertex_attrib_array(self.position_attrib);
        self.gl
            .vertex_attrib_pointer_with_i32(self.color_attrib, 3, WebGlRenderingContext::FLOAT, false, 24, 12);
        self.gl.enable_vertex_attrib_array(self.color_attrib);
    }

    fn upload_mvp(&self, mvp: &Matrix4<f32>) {
        let mvp_array: [f32; 16] = mvp.as_slice().try_into().unwrap_or([0.0; 16]);
        self.gl
            .uniform_matrix4fv_with_f32_array(Some(&self.mvp_location), false, &mvp_array);
    }

    /// Uniform-color box from the cached unit cube.
    pub fn draw_box(
        &self,
        x: f32,
        y: f32,
        z: f32,
        sx: f32,
        sy: f32,
        sz: f32,
        r: f32,
        g: f32,
        b: f32,
        view_proj: &Matrix4<f32>,
    ) {
        self.gl
            .bind_buffer(WebGlRenderingContext::ARRAY_BUFFER, Some(&self.unit_cube_vertex_buffer));
        self.gl
            .bind_buffer(WebGlRenderingContext::ELEMENT_ARRAY_BUFFER, Some(&self.unit_cube_index_buffer));
        self.bind_attribs();

        self.gl.uniform1i(Some(&self.use_uniform_color_location), 1);
        self.gl.uniform3f(Some(&self.uniform_color_location), r, g, b);

        let model = Matrix4::new_translation(&Vector3::new(x, y, z))
            * Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz));
        self.upload_mvp(&(view_proj * model));

        self.gl.draw_elements_with_i32(
            WebGlRenderingContext::TRIANGLES,
            self.unit_cube_index_count,
            WebGlRenderingContext::UNSIGNED_SHORT,
            0,
        );
    }

    /// Baked-color mesh (composites, imported models) with a full transform.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_mesh(
        &self,
        mesh: &Mesh,
        x: f32,
        y: f32,
        z: f32,
        sx: f32,
        sy: f32,
        sz: f32,
        rotation_x: f32,
        rotation_y: f32,
        rotation_z: f32,
        view_proj: &Matrix4<f32>,
    ) {
        self.gl
            .bind_buffer(WebGlRenderingContext::ARRAY_BUFFER, Some(&self.dynamic_vertex_buffer));
        unsafe {
            let vert_array = js_sys::Float32Array::view(&mesh.vertices);
            self.gl.buffer_data_with_array_buffer_view(
                WebGlRenderingContext::ARRAY_BUFFER,
                &vert_array,
                WebGlRenderingContext::DYNAMIC_DRAW,
            );
        }

        self.gl
            .bind_buffer(WebGlRenderingContext::ELEMENT_ARRAY_BUFFER, Some(&self.dynamic_index_buffer));
        unsafe {
            let idx_array = js_sys::Uint16Array::view(&mesh.indices);
            self.gl.buffer_data_with_array_buffer_view(
                WebGlRenderingContext::ELEMENT_ARRAY_BUFFER,
                &idx_array,
                WebGlRenderingContext::DYNAMIC_DRAW,
            );
        }

        self.bind_attribs();
        self.gl.uniform1i(Some(&self.use_uniform_color_location), 0);

        let model = Matrix4::new_translation(&Vector3::new(x, y, z))
            * Matrix4::from_euler_angles(rotation_x, rotation_y, rotation_z)
            * Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz));
        self.upload_mvp(&(view_proj * model));

        self.gl.draw_elements_with_i32(
            WebGlRenderingContext::TRIANGLES,
            mesh.indices.len() as i32,
            WebGlRenderingContext::UNSIGNED_SHORT,
            0,
        );
    }
}

fn create_program(gl: &WebGlRenderingContext) -> Result<WebGlProgram, JsValue> {
    let vert_shader = compile_shader(gl, WebGlRenderingContext::VERTEX_SHADER, VERTEX_SHADER)?;
    let frag_shader = compile_shader(gl, WebGlRenderingContext::FRAGMENT_SHADER, FRAGMENT_SHADER)?;

    let program = gl.create_program().ok_or("Unable to create program")?;
    gl.attach_shader(&program, &vert_shader);
    gl.attach_shader(&program, &frag_shader);
    gl.link_program(&program);

    if gl
        .get_program_parameter(&program, WebGlRenderingContext::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        Err(JsValue::from_str(&gl.get_program_info_log(&program).unwrap_or_default()))
    }
}

fn compile_shader(gl: &WebGlRenderingContext, shader_type: u32, source: &str) -> Result<web_sys::WebGlShader, JsValue> {
    let shader = gl.create_shader(shader_type).ok_or("Unable to create shader")?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl
        .get_shader_parameter(&shader, WebGlRenderingContext::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        Err(JsValue::from_str(&gl.get_shader_info_log(&shader).unwrap_or_default()))
    }
}
